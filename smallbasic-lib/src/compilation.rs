//! The entry point of the compiler. [`Compilation::new`] runs every stage over a source
//! text and keeps all intermediate results around, so tools can inspect them.

use crate::binder::Binder;
use crate::compiler;
use crate::core::*;
use crate::parser::Parser;
use crate::scanner;

/// Everything that influences compilation. There is no global registry, the manifest of
/// the available libraries always travels with the options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    pub run_mode: RunMode,
    pub manifest: LibraryManifest,
}

impl CompilerOptions {
    pub fn new(run_mode: RunMode, manifest: LibraryManifest) -> Self {
        Self { run_mode, manifest }
    }
}

#[derive(Debug, Clone)]
pub struct Compilation {
    tokens: Vec<Token>,
    syntax_tree: SyntaxTree,
    bound: BoundProgram,
    diagnostics: DiagnosticBag,
    program: Option<Program>,
}

impl Compilation {
    pub fn new(text: &str, options: &CompilerOptions) -> Self {
        let mut diagnostics = DiagnosticBag::new();
        let tokens = scanner::scan(text, &mut diagnostics);
        let syntax_tree = Parser::parse(&tokens, &mut diagnostics);
        let bound = Binder::bind(&syntax_tree, options, &mut diagnostics);
        tracing::debug!(diagnostics = diagnostics.len(), "compiled source");

        let program = if diagnostics.is_empty() {
            Some(compiler::generate(&bound, &options.manifest))
        } else {
            None
        };

        Self {
            tokens,
            syntax_tree,
            bound,
            diagnostics,
            program,
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    /// only available when there are no diagnostics
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn into_program(self) -> Option<Program> {
        self.program
    }

    /// all variable and sub-routine names the program defines
    pub fn names(&self) -> &[String] {
        &self.bound.names
    }

    pub fn analysis(&self) -> RuntimeAnalysis {
        self.bound.analysis
    }

    pub fn syntax_tree(&self) -> &SyntaxTree {
        &self.syntax_tree
    }

    pub fn bound_program(&self) -> &BoundProgram {
        &self.bound
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}
