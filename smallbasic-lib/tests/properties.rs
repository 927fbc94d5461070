mod common;

use common::*;
use smallbasic_lib::binder::Binder;
use smallbasic_lib::core::*;
use smallbasic_lib::parser::Parser;
use smallbasic_lib::scanner::scan;
use smallbasic_lib::vm::{Engine, Libraries, RunOutcome};
use smallbasic_lib::Compilation;

const BROKEN: &[&str] = &[
    "If x Then\nWhile\nEndFor",
    "x = (1 + \ny = \"open\n$ % ^",
    "Sub A\nSub B\nEndSub\nEndSub\nEndSub",
    "For = To Step\nGoto\n:\nfoo:\nfoo:",
    "a[1 = 2\nb.c.d = 3\nTextWindow.WriteLine(\nTextWindow.Nope = 1",
    "ElseIf Else EndIf EndWhile\n))))\n\"",
    "",
    "\n\n\n",
];

#[test]
fn broken_sources_produce_diagnostics_within_the_text() {
    for text in BROKEN {
        let compilation = Compilation::new(text, &options());
        let lines: Vec<_> = text.split('\n').collect();
        for diagnostic in compilation.diagnostics().contents() {
            let TextRange { start, end } = diagnostic.range;
            assert!(start <= end, "{:?} in {:?}", diagnostic, text);
            assert!(end.line < lines.len(), "{:?} in {:?}", diagnostic, text);
            // a column may point just behind the last character, where the line ends
            assert!(
                end.column <= lines[end.line].chars().count(),
                "{:?} in {:?}",
                diagnostic,
                text
            );
        }
        assert_eq!(
            compilation.program().is_some(),
            compilation.diagnostics().is_empty()
        );
    }
}

#[test]
fn parsing_is_deterministic() {
    for text in BROKEN.iter().chain(&["x = 1\nIf x > 0 Then\nA()\nEndIf\nSub A\nEndSub"]) {
        let parse = || {
            let mut bag = DiagnosticBag::new();
            let tokens = scan(text, &mut bag);
            let tree = Parser::parse(&tokens, &mut bag);
            (tree, bag.into_iter().collect::<Vec<_>>())
        };
        assert_eq!(parse(), parse());

        let bind = || {
            let mut bag = DiagnosticBag::new();
            let tokens = scan(text, &mut bag);
            let tree = Parser::parse(&tokens, &mut bag);
            let options = options();
            let bound = Binder::bind(&tree, &options, &mut bag);
            (bound, bag.into_iter().collect::<Vec<_>>())
        };
        assert_eq!(bind(), bind());
    }
}

#[test]
fn compiled_programs_terminate_or_suspend() {
    let texts = [
        "x = 1",
        "Sub A\nx = x + 1\nIf x < 5 Then\nA()\nEndIf\nEndSub\nA()",
        "a = TextWindow.Read()",
        "For i = 1 To 3\nTextWindow.Title = i\nEndFor",
    ];
    for text in texts {
        let (mut engine, _) = engine(text);
        match engine.run().unwrap() {
            RunOutcome::Terminated => assert!(engine.snapshot().execution_stack.is_empty()),
            RunOutcome::Suspended(_) => assert!(!engine.snapshot().execution_stack.is_empty()),
            RunOutcome::Paused => panic!("paused while running to the end"),
        }
    }
}

#[test]
fn programs_survive_storage() {
    let program = compile("x = 1\nlbl:\nTextWindow.WriteLine(x)\nSub A\nEndSub");
    let bytes = program.to_bytes().unwrap();
    let loaded = Program::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, program);

    let mut engine = Engine::new(loaded, Libraries::new().with(TestWindow::default())).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
}

#[test]
fn programs_from_other_versions_are_rejected() {
    let program = compile("x = 1");
    let mut bytes = postcard::to_allocvec(&[9999u16, 0, 0]).unwrap();
    bytes.extend(postcard::to_allocvec(&program).unwrap());
    assert!(matches!(
        Program::from_bytes(&bytes),
        Err(LoadError::VersionMismatch {
            found: [9999, 0, 0],
            ..
        })
    ));
    assert!(matches!(
        Program::from_bytes(&[1, 2]),
        Err(LoadError::Decode(_))
    ));
}
