mod common;

use common::*;
use smallbasic_lib::core::*;
use smallbasic_lib::vm::{Engine, Error, ExecutionMode, ExecutionState, Libraries, RunOutcome};

#[test]
fn control_flow_and_sub_modules() {
    let text = r#"
For i = 1 To 15
  If i / 3 = 3 Then
    Goto skip
  ElseIf i > 4 And i < 14 Then
    Goto skip
  EndIf
  Describe()
skip:
EndFor

Sub Describe
  If i = 15 Then
    result = "last "
  Else
    result = "item "
  EndIf
  TextWindow.WriteLine(result + i)
EndSub
"#;
    assert_eq!(
        run(text),
        vec!["item 1", "item 2", "item 3", "item 4", "item 14", "last 15"]
    );
}

#[test]
fn large_arrays() {
    let text = r#"
For i = 1 To 20000
  numbers[i] = i
  grid[i][i] = 1
EndFor
sum = 0
For i = 1 To 20000
  sum = sum + numbers[i] + grid[i][i]
EndFor
TextWindow.WriteLine(sum)
"#;
    assert_eq!(run(text), vec!["200030000"]);
}

#[test]
fn loops() {
    let text = r#"
For i = 3 To 1 Step -1
  TextWindow.WriteLine(i)
EndFor
For j = 1 To 0
  TextWindow.WriteLine("never")
EndFor
n = 0
While n < 2
  n = n + 1
  TextWindow.WriteLine("n" + n)
EndWhile
"#;
    assert_eq!(run(text), vec!["3", "2", "1", "n1", "n2"]);
}

#[test]
fn operators_evaluate_both_sides() {
    let text = r#"
a = -(2 * 3) + 10 / 4
TextWindow.WriteLine(a)
TextWindow.WriteLine("1" + 2 + "a" + 3)
TextWindow.WriteLine(1 + 2 * 3)
TextWindow.WriteLine(5 / 0)
TextWindow.WriteLine("abc" = "ABC")
arr[1] = 5
TextWindow.WriteLine(arr[1][2] + "!")
"#;
    assert_eq!(run(text), vec!["-3.5", "3a3", "7", "0", "True", "!"]);
}

#[test]
fn properties() {
    let (mut engine, window) = engine("TextWindow.Title = \"hi\"\nTextWindow.WriteLine(TextWindow.Title + \"!\")");
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(window.lines(), vec!["hi!"]);
    assert_eq!(*window.title.borrow(), "hi");
}

#[test]
fn suspension_and_resumption() {
    let (mut engine, window) = engine("name = TextWindow.Read()\nTextWindow.WriteLine(\"Hello \" + name)");
    let RunOutcome::Suspended(continuation) = engine.run().unwrap() else {
        panic!("expected the engine to wait for Read");
    };
    assert_eq!(continuation.member, "TextWindow.Read");
    assert_eq!(engine.state(), ExecutionState::Suspended);
    assert!(matches!(engine.run(), Err(Error::Suspended(_))));

    // the pointer stays on the call while suspended
    let before = engine.snapshot();
    assert_eq!(before.execution_stack[0].ip, 0);
    assert!(before.memory.is_empty());

    engine
        .resume(&continuation, Some(Value::from_text("World")))
        .unwrap();
    assert!(matches!(
        engine.resume(&continuation, None),
        Err(Error::InvalidContinuation)
    ));
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(window.lines(), vec!["Hello World"]);
}

#[test]
fn stale_continuation_is_rejected() {
    let (mut engine, _) = engine("a = TextWindow.Read()\nb = TextWindow.Read()");
    let RunOutcome::Suspended(first) = engine.run().unwrap() else {
        panic!("expected suspension");
    };
    engine.resume(&first, Some(1i64.into())).unwrap();
    let RunOutcome::Suspended(second) = engine.run().unwrap() else {
        panic!("expected suspension");
    };
    assert_ne!(first, second);
    assert!(matches!(
        engine.resume(&first, None),
        Err(Error::InvalidContinuation)
    ));
    // a call that returns a value but was resumed without one sees the empty string
    engine.resume(&second, None).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.variable("a"), Some(&Value::from(1i64)));
    assert_eq!(snapshot.variable("b"), Some(&Value::empty()));
}

#[test]
fn events_interrupt_and_revive() {
    let text = r#"
count = 0
TextWindow.KeyDown = OnKeyDown
TextWindow.WriteLine("registered")
x = TextWindow.Read()
TextWindow.WriteLine("done")

Sub OnKeyDown
  count = count + 1
  TextWindow.WriteLine("key " + count)
EndSub
"#;
    let (mut engine, window) = engine(text);
    let RunOutcome::Suspended(continuation) = engine.run().unwrap() else {
        panic!("expected suspension");
    };

    // not delivered while a call is pending
    engine.raise_event_by_name("textwindow", "keydown").unwrap();
    assert_eq!(engine.snapshot().execution_stack.len(), 1);

    engine.resume(&continuation, Some("x".into())).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(window.lines(), vec!["registered", "key 1", "done"]);

    // a terminated engine runs callbacks again
    engine.raise_event_by_name("TextWindow", "KeyDown").unwrap();
    assert_eq!(engine.state(), ExecutionState::Running);
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(window.lines().last().unwrap(), "key 2");

    assert!(matches!(
        engine.raise_event_by_name("TextWindow", "Nope"),
        Err(Error::UnknownEvent { .. })
    ));
}

#[test]
fn event_without_callback_is_ignored() {
    let (mut engine, _) = engine("x = 1");
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    engine.raise_event_by_name("TextWindow", "KeyDown").unwrap();
    assert_eq!(engine.state(), ExecutionState::Terminated);
}

#[test]
fn stepping_by_statement() {
    let (mut engine, _) = engine("x = 1\ny = x + 1");
    engine.set_mode(ExecutionMode::NextStatement);
    assert_eq!(engine.current_range(), Some(TextRange::new((0, 0), (0, 4))));
    assert_eq!(engine.run().unwrap(), RunOutcome::Paused);
    assert_eq!(engine.snapshot().variable("x"), Some(&Value::from(1i64)));
    assert_eq!(engine.snapshot().variable("y"), None);
    assert_eq!(engine.current_range(), Some(TextRange::new((1, 0), (1, 8))));
    // the final return belongs to the last statement
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(engine.snapshot().variable("y"), Some(&Value::from(2i64)));
}

#[test]
fn stepping_by_line_enters_sub_modules() {
    let (mut engine, _) = engine("A()\nx = 1\nSub A\n  y = 2\nEndSub");
    engine.set_mode(ExecutionMode::NextLine);
    assert_eq!(engine.run().unwrap(), RunOutcome::Paused);
    let snapshot = engine.snapshot();
    let modules: Vec<_> = snapshot
        .execution_stack
        .iter()
        .map(|f| f.module.as_str())
        .collect();
    assert_eq!(modules, vec!["Program", "A"]);
    assert_eq!(snapshot.execution_stack[1].range.start.line, 3);

    engine.set_mode(ExecutionMode::RunToEnd);
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
}

#[test]
fn stepping_pauses_on_every_loop_iteration() {
    let (mut engine, _) = engine("i = 0\nloop:\ni = i + 1\nIf i < 3 Then\nGoto loop\nEndIf");
    engine.set_mode(ExecutionMode::NextStatement);
    let mut steps = 0;
    while engine.run().unwrap() == RunOutcome::Paused {
        steps += 1;
    }
    // the first assignment, then the increment, the If and the Goto twice, and the final
    // increment. The last If runs into the end of the program
    assert_eq!(steps, 1 + 3 * 2 + 1);
}

#[test]
fn missing_library_implementation() {
    let program = compile("TextWindow.WriteLine(1)");
    assert!(matches!(
        Engine::new(program, Libraries::new()),
        Err(Error::MissingLibrary(name)) if name == "TextWindow"
    ));
    // libraries the program doesn't use may be missing
    assert!(Engine::new(compile("x = 1"), Libraries::new()).is_ok());
}

#[test]
fn empty_program_terminates_immediately() {
    let program = compile("");
    let mut engine = Engine::new(program, Libraries::new()).unwrap();
    assert_eq!(engine.state(), ExecutionState::Running);
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
    assert!(engine.snapshot().execution_stack.is_empty());
    assert!(engine.snapshot().memory.is_empty());
}
