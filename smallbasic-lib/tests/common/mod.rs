#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use smallbasic_lib::core::*;
use smallbasic_lib::vm::{Completion, Engine, Libraries, Library, RunOutcome};
use smallbasic_lib::{Compilation, CompilerOptions};

pub fn manifest() -> LibraryManifest {
    LibraryManifest::new(vec![
        LibrarySignature::new("TextWindow")
            .uses_text_window()
            .method(MethodSignature::new("WriteLine", &["data"], false))
            .method(MethodSignature::new("Read", &[], true))
            .property(PropertySignature::new("Title", true, true))
            .event("KeyDown"),
        LibrarySignature::new("Clock").property(PropertySignature::new("Hour", true, false)),
    ])
}

pub fn options() -> CompilerOptions {
    CompilerOptions::new(RunMode::Desktop, manifest())
}

pub fn compile(text: &str) -> Program {
    let compilation = Compilation::new(text, &options());
    assert!(
        compilation.diagnostics().is_empty(),
        "{:#?}",
        compilation.diagnostics().contents()
    );
    compilation.into_program().unwrap()
}

pub fn diagnostics(text: &str) -> Vec<Diagnostic> {
    Compilation::new(text, &options())
        .diagnostics()
        .contents()
        .to_vec()
}

/// Records what the program writes. `Read` never completes on its own
#[derive(Clone, Default)]
pub struct TestWindow {
    pub output: Rc<RefCell<Vec<String>>>,
    pub title: Rc<RefCell<String>>,
}

impl TestWindow {
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

impl Library for TestWindow {
    fn name(&self) -> &str {
        "TextWindow"
    }

    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion {
        match index {
            0 => {
                self.output.borrow_mut().push(args[0].to_display_string());
                Completion::done()
            }
            _ => Completion::Pending,
        }
    }

    fn get_property(&mut self, _index: usize) -> Completion {
        Completion::value(self.title.borrow().as_str())
    }

    fn set_property(&mut self, _index: usize, value: Value) -> Completion {
        *self.title.borrow_mut() = value.to_display_string();
        Completion::done()
    }
}

pub fn engine(text: &str) -> (Engine, TestWindow) {
    let window = TestWindow::default();
    let engine = Engine::new(compile(text), Libraries::new().with(window.clone())).unwrap();
    (engine, window)
}

/// runs a program that never suspends and returns what it wrote
pub fn run(text: &str) -> Vec<String> {
    let (mut engine, window) = engine(text);
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    window.lines()
}
