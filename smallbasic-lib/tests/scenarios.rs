mod common;

use common::*;
use smallbasic_lib::core::*;
use smallbasic_lib::vm::{Engine, Libraries, RunOutcome};

#[test]
fn unterminated_string() {
    assert_eq!(
        diagnostics("\nx = \"name"),
        vec![Diagnostic::new(
            DiagnosticCode::UnterminatedStringLiteral,
            TextRange::new((1, 4), (1, 8)),
            Vec::<String>::new()
        )]
    );
}

#[test]
fn unrecognized_character() {
    assert_eq!(
        diagnostics("\n$"),
        vec![Diagnostic::new(
            DiagnosticCode::UnrecognizedCharacter,
            TextRange::new((1, 0), (1, 0)),
            ["$"]
        )]
    );
}

#[test]
fn duplicate_label_in_sub_module() {
    let found = diagnostics("Sub Foo\nlbl:\nx = 1\nlbl:\nEndSub");
    assert_eq!(
        found,
        vec![Diagnostic::new(
            DiagnosticCode::TwoLabelsWithTheSameName,
            TextRange::new((3, 0), (3, 2)),
            ["lbl"]
        )]
    );
    assert_eq!(
        found[0].to_display_string(),
        "Another label with the name 'lbl' is already defined."
    );
}

#[test]
fn array_display_form() {
    let lines = run("arr[\"a\"] = 1\nTextWindow.WriteLine(arr)");
    assert_eq!(lines, vec!["a=1;"]);
}

#[test]
fn unknown_library_member() {
    let found = diagnostics("TextWindow.NoMethod()");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, DiagnosticCode::LibraryMemberNotFound);
    assert_eq!(found[0].args, vec!["TextWindow", "NoMethod"]);
}

#[test]
fn snapshot_after_termination() {
    let program = compile("x = 1\nIf x = 1 Then\n  y = \"yes\"\nEndIf\nFor i = 1 To 2\nEndFor\nz[1] = x");
    let mut engine = Engine::new(program, Libraries::new()).unwrap();
    assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);

    let snapshot = engine.snapshot();
    assert!(snapshot.execution_stack.is_empty());
    let names: Vec<_> = snapshot.memory.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["x", "y", "i", "z"]);
    assert_eq!(snapshot.memory["y"], Value::from("yes"));
    assert_eq!(snapshot.memory["i"], Value::from(3i64));
    assert_eq!(snapshot.memory["z"].to_display_string(), "1=1;");
}
