//! Compile time problems. Nothing in the compiler returns an error for a malformed program,
//! instead every stage reports into the same [`DiagnosticBag`] and carries on.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

use crate::core::TextRange;

/// The stable identity of a diagnostic. `to_string()` gives the name of the variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize,
)]
pub enum DiagnosticCode {
    // scanning
    UnrecognizedCharacter,
    UnterminatedStringLiteral,

    // parsing
    UnrecognizedStatement,
    UnexpectedTokenFound,
    UnexpectedEndOfLine,
    UnexpectedStatement,
    MissingBlockTerminator,
    CannotDefineSubInsideSub,

    // binding
    UndefinedVariable,
    TwoSubModulesWithTheSameName,
    TwoLabelsWithTheSameName,
    GoToUndefinedLabel,
    LibraryMemberNotFound,
    LibraryMemberNeedsDesktop,
    LibraryMemberDeprecated,
    UnexpectedArgumentsCount,
    PropertyHasNoSetter,
    PropertyHasNoGetter,
    ExpectedExpressionWithAValue,
    AssigningNonSubModuleToEvent,
    LibraryUsedAsValue,
    UnsupportedDotBaseExpression,
    UnsupportedArrayBaseExpression,
    UnsupportedInvocationBaseExpression,
    UnsupportedInvocationWithoutParentheses,
    UnsupportedAssignmentTarget,
    InvalidExpressionStatement,
    ValueIsNotANumber,
}

impl DiagnosticCode {
    /// message template, `{0}`, `{1}`, ... are replaced by the diagnostic's arguments
    fn template(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            UnrecognizedCharacter => "I don't understand this character '{0}'.",
            UnterminatedStringLiteral => "This string is missing its right double quotes.",
            UnrecognizedStatement => "I was expecting a statement here, but found '{0}' instead.",
            UnexpectedTokenFound => "I was not expecting to see '{0}' here.",
            UnexpectedEndOfLine => "I was expecting to see {0} before the end of this line.",
            UnexpectedStatement => "I was not expecting '{0}' here, there is no block for it to close.",
            MissingBlockTerminator => "This '{0}' block is missing its closing '{1}'.",
            CannotDefineSubInsideSub => "You cannot define a sub-routine inside another one.",
            UndefinedVariable => "The variable '{0}' is used, but is never assigned a value.",
            TwoSubModulesWithTheSameName => "Another sub-routine with the name '{0}' is already defined.",
            TwoLabelsWithTheSameName => "Another label with the name '{0}' is already defined.",
            GoToUndefinedLabel => "There is no label named '{0}' in this sub-routine.",
            LibraryMemberNotFound => "The library '{0}' has no member named '{1}'.",
            LibraryMemberNeedsDesktop => "'{0}.{1}' is only available when running on the desktop.",
            LibraryMemberDeprecated => "'{0}.{1}' is no longer supported.",
            UnexpectedArgumentsCount => "I was expecting {0} arguments, but found {1} instead.",
            PropertyHasNoSetter => "The property '{0}.{1}' cannot be assigned a value.",
            PropertyHasNoGetter => "The property '{0}.{1}' cannot be read.",
            ExpectedExpressionWithAValue => "This expression must return a value to be used here.",
            AssigningNonSubModuleToEvent => "Only sub-routines can be assigned to events.",
            LibraryUsedAsValue => "The library '{0}' cannot be used as a value.",
            UnsupportedDotBaseExpression => "You can only use dot access with a library.",
            UnsupportedArrayBaseExpression => "You can only index variables.",
            UnsupportedInvocationBaseExpression => "This expression cannot be called.",
            UnsupportedInvocationWithoutParentheses => "Add parentheses to call '{0}'.",
            UnsupportedAssignmentTarget => "You cannot assign a value to this expression.",
            InvalidExpressionStatement => "This expression is not a valid statement.",
            ValueIsNotANumber => "The value '{0}' is not a valid number.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub range: TextRange,
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new<I, S>(code: DiagnosticCode, range: TextRange, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code,
            range,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// the message of this diagnostic with all arguments substituted
    pub fn to_display_string(&self) -> String {
        let mut message = self.code.template().to_string();
        for (i, arg) in self.args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), arg);
        }
        message
    }
}

/// Collects all diagnostics of a compilation in the order they were reported
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    contents: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &[Diagnostic] {
        &self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn report<I, S>(&mut self, code: DiagnosticCode, range: TextRange, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let diagnostic = Diagnostic::new(code, range, args);
        tracing::trace!(code = %diagnostic.code, range = %diagnostic.range, "diagnostic reported");
        self.contents.push(diagnostic);
    }

    /// for diagnostics without arguments
    pub fn report_plain(&mut self, code: DiagnosticCode, range: TextRange) {
        self.report(code, range, std::iter::empty::<String>());
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.contents.into_iter()
    }
}
