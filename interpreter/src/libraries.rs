//! The libraries `sbi` provides to scripts.
//!
//! Every library keeps its own [`LibrarySignature`] and dispatches on the names in it, so the
//! indices the engine passes in always agree with the manifest the script was compiled
//! against.

use std::cell::Cell;
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Timelike};
use once_cell::sync::Lazy;
use rust_decimal::{Decimal, MathematicalOps};

use smallbasic_lib::core::*;
use smallbasic_lib::vm::{Completion, Libraries, Library};

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// Which kind of input `TextWindow` is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRead {
    Text,
    Number,
}

/// The side of the libraries the run loop talks to
#[derive(Debug, Clone, Default)]
pub struct Host {
    pending_read: Rc<Cell<Option<PendingRead>>>,
}

impl Host {
    /// Produces the result of the call the engine is suspended on, by reading a line
    pub fn complete(&self, read_line: impl FnOnce() -> Result<Option<String>>) -> Result<Value> {
        let kind = self
            .pending_read
            .take()
            .context("The engine waits for a call no library started")?;
        let line = read_line()?.unwrap_or_default();
        let line = line.trim_end_matches(['\r', '\n']);
        Ok(match kind {
            PendingRead::Text => Value::from_text(line),
            PendingRead::Number => Value::Number(parse_number(line).unwrap_or(Decimal::ZERO)),
        })
    }
}

pub fn manifest() -> LibraryManifest {
    LibraryManifest::new(vec![
        text_window_signature(),
        clock_signature(),
        math_signature(),
        array_signature(),
        file_signature(),
    ])
}

pub fn libraries() -> (Libraries, Host) {
    Lazy::force(&STARTED);
    let host = Host::default();
    let libraries = Libraries::new()
        .with(TextWindow {
            signature: text_window_signature(),
            title: String::new(),
            pending_read: host.pending_read.clone(),
        })
        .with(Clock(clock_signature()))
        .with(Math(math_signature()))
        .with(ArrayLibrary(array_signature()))
        .with(File {
            signature: file_signature(),
            last_error: String::new(),
        });
    (libraries, host)
}

fn method_name(signature: &LibrarySignature, index: usize) -> &str {
    signature
        .methods
        .get(index)
        .map(|m| m.name.as_str())
        .unwrap_or_default()
}

fn property_name(signature: &LibrarySignature, index: usize) -> &str {
    signature
        .properties
        .get(index)
        .map(|p| p.name.as_str())
        .unwrap_or_default()
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_else(Value::empty)
}

// ==============================================================================
// TextWindow
// ==============================================================================
fn text_window_signature() -> LibrarySignature {
    LibrarySignature::new("TextWindow")
        .uses_text_window()
        .method(MethodSignature::new("WriteLine", &["data"], false))
        .method(MethodSignature::new("Write", &["data"], false))
        .method(MethodSignature::new("Read", &[], true))
        .method(MethodSignature::new("ReadNumber", &[], true))
        .property(PropertySignature::new("Title", true, true))
}

struct TextWindow {
    signature: LibrarySignature,
    title: String,
    pending_read: Rc<Cell<Option<PendingRead>>>,
}

impl Library for TextWindow {
    fn name(&self) -> &str {
        &self.signature.name
    }

    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion {
        match method_name(&self.signature, index) {
            "WriteLine" => println!("{}", arg(&args, 0)),
            "Write" => {
                print!("{}", arg(&args, 0));
                if let Err(e) = io::stdout().flush() {
                    tracing::warn!("could not flush stdout: {}", e);
                }
            }
            "Read" => {
                self.pending_read.set(Some(PendingRead::Text));
                return Completion::Pending;
            }
            "ReadNumber" => {
                self.pending_read.set(Some(PendingRead::Number));
                return Completion::Pending;
            }
            other => tracing::warn!("TextWindow.{} is not implemented", other),
        }
        Completion::done()
    }

    fn get_property(&mut self, _index: usize) -> Completion {
        Completion::value(self.title.as_str())
    }

    fn set_property(&mut self, _index: usize, value: Value) -> Completion {
        self.title = value.to_display_string();
        Completion::done()
    }
}

// ==============================================================================
// Clock
// ==============================================================================
fn clock_signature() -> LibrarySignature {
    let readonly = |name| PropertySignature::new(name, true, false);
    LibrarySignature::new("Clock")
        .property(readonly("Time"))
        .property(readonly("Date"))
        .property(readonly("Year"))
        .property(readonly("Month"))
        .property(readonly("Day"))
        .property(readonly("Hour"))
        .property(readonly("Minute"))
        .property(readonly("Second"))
        .property(readonly("ElapsedMilliseconds"))
}

struct Clock(LibrarySignature);

impl Library for Clock {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn call_method(&mut self, _index: usize, _args: Vec<Value>) -> Completion {
        Completion::done()
    }

    fn get_property(&mut self, index: usize) -> Completion {
        let now = Local::now();
        match property_name(&self.0, index) {
            "Time" => Completion::value(now.format("%H:%M:%S").to_string()),
            "Date" => Completion::value(now.format("%Y-%m-%d").to_string()),
            "Year" => Completion::value(now.year() as i64),
            "Month" => Completion::value(now.month() as i64),
            "Day" => Completion::value(now.day() as i64),
            "Hour" => Completion::value(now.hour() as i64),
            "Minute" => Completion::value(now.minute() as i64),
            "Second" => Completion::value(now.second() as i64),
            "ElapsedMilliseconds" => {
                Completion::value(STARTED.elapsed().as_millis() as i64)
            }
            _ => Completion::done(),
        }
    }

    fn set_property(&mut self, _index: usize, _value: Value) -> Completion {
        Completion::done()
    }
}

// ==============================================================================
// Math
// ==============================================================================
fn math_signature() -> LibrarySignature {
    let function = |name, params: &[&str]| MethodSignature::new(name, params, true);
    LibrarySignature::new("Math")
        .method(function("Abs", &["number"]))
        .method(function("Floor", &["number"]))
        .method(function("Ceiling", &["number"]))
        .method(function("Max", &["number1", "number2"]))
        .method(function("Min", &["number1", "number2"]))
        .method(function("Remainder", &["dividend", "divisor"]))
        .method(function("Power", &["baseNumber", "exponent"]))
        .method(function("SquareRoot", &["number"]))
}

struct Math(LibrarySignature);

impl Library for Math {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion {
        let a = arg(&args, 0).to_number();
        let b = arg(&args, 1).to_number();
        let result = match method_name(&self.0, index) {
            "Abs" => Some(a.abs()),
            "Floor" => Some(a.floor()),
            "Ceiling" => Some(a.ceil()),
            "Max" => Some(a.max(b)),
            "Min" => Some(a.min(b)),
            "Remainder" => a.checked_rem(b),
            "Power" => a.checked_powd(b),
            "SquareRoot" => a.sqrt(),
            _ => None,
        };
        Completion::value(result.unwrap_or(Decimal::ZERO))
    }

    fn get_property(&mut self, _index: usize) -> Completion {
        Completion::done()
    }

    fn set_property(&mut self, _index: usize, _value: Value) -> Completion {
        Completion::done()
    }
}

// ==============================================================================
// Array
// ==============================================================================
fn array_signature() -> LibrarySignature {
    LibrarySignature::new("Array")
        .method(MethodSignature::new("ContainsIndex", &["array", "index"], true))
        .method(MethodSignature::new("GetItemCount", &["array"], true))
        .method(MethodSignature::new("IsArray", &["array"], true))
        .method(MethodSignature::new("GetAllIndices", &["array"], true))
}

struct ArrayLibrary(LibrarySignature);

impl Library for ArrayLibrary {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion {
        let array = arg(&args, 0).to_array();
        match method_name(&self.0, index) {
            "ContainsIndex" => {
                let key = arg(&args, 1).to_display_string();
                Completion::value(array.contains_key(&key))
            }
            "GetItemCount" => Completion::value(array.len()),
            "IsArray" => Completion::value(matches!(arg(&args, 0), Value::Array(_))),
            "GetAllIndices" => Completion::value(
                array
                    .keys()
                    .enumerate()
                    .map(|(i, key)| ((i + 1).to_string(), Value::from(key)))
                    .collect::<ArrayValue>(),
            ),
            _ => Completion::done(),
        }
    }

    fn get_property(&mut self, _index: usize) -> Completion {
        Completion::done()
    }

    fn set_property(&mut self, _index: usize, _value: Value) -> Completion {
        Completion::done()
    }
}

// ==============================================================================
// File
// ==============================================================================
const SUCCESS: &str = "SUCCESS";
const FAILED: &str = "FAILED";

fn file_signature() -> LibrarySignature {
    LibrarySignature::new("File")
        .method(MethodSignature::new("ReadContents", &["filePath"], true).needs_desktop())
        .method(
            MethodSignature::new("WriteContents", &["filePath", "contents"], true).needs_desktop(),
        )
        .method(
            MethodSignature::new("AppendContents", &["filePath", "contents"], true)
                .needs_desktop(),
        )
        .property(PropertySignature::new("LastError", true, true))
}

/// Failures are reported through the return value and `LastError`, never to the engine
struct File {
    signature: LibrarySignature,
    last_error: String,
}

impl File {
    fn outcome(&mut self, result: io::Result<()>) -> Completion {
        match result {
            Ok(()) => Completion::value(SUCCESS),
            Err(e) => {
                self.last_error = e.to_string();
                Completion::value(FAILED)
            }
        }
    }
}

impl Library for File {
    fn name(&self) -> &str {
        &self.signature.name
    }

    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion {
        let path = arg(&args, 0).to_display_string();
        let contents = arg(&args, 1).to_display_string();
        match method_name(&self.signature, index) {
            "ReadContents" => match fs::read_to_string(&path) {
                Ok(text) => Completion::value(text),
                Err(e) => {
                    self.last_error = e.to_string();
                    Completion::value("")
                }
            },
            "WriteContents" => self.outcome(fs::write(&path, contents)),
            "AppendContents" => self.outcome(
                fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .and_then(|mut f| f.write_all(contents.as_bytes())),
            ),
            _ => Completion::done(),
        }
    }

    fn get_property(&mut self, _index: usize) -> Completion {
        Completion::value(self.last_error.as_str())
    }

    fn set_property(&mut self, _index: usize, value: Value) -> Completion {
        self.last_error = value.to_display_string();
        Completion::done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(library: &mut dyn Library, name: &str, args: Vec<Value>) -> Value {
        let signature = manifest();
        let lib = signature.find_library(library.name()).unwrap();
        let Some(MemberRef::Method(id)) = signature.find_member(lib, name) else {
            panic!("no method {}", name);
        };
        match library.call_method(id.index, args) {
            Completion::Ready(Some(v)) => v,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_math() {
        let mut math = Math(math_signature());
        assert_eq!(call(&mut math, "Abs", vec![(-3i64).into()]), Value::from(3i64));
        assert_eq!(call(&mut math, "Max", vec![2i64.into(), "7".into()]), Value::from(7i64));
        assert_eq!(
            call(&mut math, "Remainder", vec![7i64.into(), 0i64.into()]),
            Value::from(0i64)
        );
        assert_eq!(
            call(&mut math, "Power", vec![2i64.into(), 3i64.into()]),
            Value::from(8i64)
        );
    }

    #[test]
    fn test_array() {
        let mut arrays = ArrayLibrary(array_signature());
        let mut a = ArrayValue::new();
        a.set("x", 1i64.into());
        a.set("y", 2i64.into());
        let a = Value::Array(a);
        assert_eq!(
            call(&mut arrays, "ContainsIndex", vec![a.clone(), "X".into()]),
            Value::Boolean(true)
        );
        assert_eq!(call(&mut arrays, "GetItemCount", vec![a.clone()]), Value::from(2usize));
        assert_eq!(call(&mut arrays, "IsArray", vec!["x".into()]), Value::Boolean(false));
        assert_eq!(
            call(&mut arrays, "GetAllIndices", vec![a]).to_display_string(),
            "1=x;2=y;"
        );
    }

    #[test]
    fn test_file_failure_sets_last_error() {
        let mut file = File {
            signature: file_signature(),
            last_error: String::new(),
        };
        let dir = std::env::temp_dir().join("sbi-no-such-dir").join("nested");
        let path = dir.join("out.txt").to_string_lossy().to_string();
        assert_eq!(
            call(&mut file, "WriteContents", vec![path.as_str().into(), "x".into()]),
            Value::from(FAILED)
        );
        assert!(!file.last_error.is_empty());
    }

    #[test]
    fn test_host_completes_reads() {
        let host = Host::default();
        host.pending_read.set(Some(PendingRead::Number));
        let value = host.complete(|| Ok(Some("12abc\n".into()))).unwrap();
        assert_eq!(value, Value::from(0i64));
        host.pending_read.set(Some(PendingRead::Text));
        let value = host.complete(|| Ok(Some("42\r\n".into()))).unwrap();
        assert_eq!(value, Value::from(42i64));
        assert!(host.complete(|| Ok(None)).is_err());
    }
}
