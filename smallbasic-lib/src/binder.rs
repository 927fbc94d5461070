//! Resolves the names in a syntax tree and checks everything that can be checked before
//! running the program.
//!
//! Binding happens in two steps. First all declarations are collected: sub-routines,
//! variables (a variable is declared by being assigned anywhere in the program) and the
//! labels of every module. Then the statements are bound one by one, each name is resolved
//! to a sub-routine, a library or a variable, in that order.
//!
//! Nothing in here fails. Every problem becomes a diagnostic and the node it was found in
//! turns into an `Invalid` node.

use indexmap::IndexSet;

use std::collections::HashSet;

use crate::compilation::CompilerOptions;
use crate::core::*;

/// what a plain identifier refers to
enum Symbol {
    SubModule(SubModuleId),
    Library(LibraryId),
    Variable(VariableId),
    Unknown,
}

/// the target of a call
enum Invocation {
    SubModule(SubModuleId),
    Method {
        method: MethodId,
        arguments: Vec<BoundExpression>,
        returns_value: bool,
    },
    Invalid,
}

pub struct Binder<'a> {
    options: &'a CompilerOptions,
    diagnostics: &'a mut DiagnosticBag,
    sub_modules: IndexSet<Key>,
    variables: IndexSet<Key>,
    labels: HashSet<(ModuleId, Key)>,
    analysis: RuntimeAnalysis,
    module: ModuleId,
}

impl<'a> Binder<'a> {
    pub fn bind(
        tree: &SyntaxTree,
        options: &'a CompilerOptions,
        diagnostics: &'a mut DiagnosticBag,
    ) -> BoundProgram {
        let mut binder = Binder {
            options,
            diagnostics,
            sub_modules: tree
                .sub_module_names
                .iter()
                .map(|n| Key::new(n.as_str()))
                .collect(),
            variables: IndexSet::new(),
            labels: HashSet::new(),
            analysis: RuntimeAnalysis::default(),
            module: ModuleId::Main,
        };
        binder.collect_variables(&tree.statements);

        let mut main = vec![];
        let mut sub_modules = vec![];
        let mut defined_subs = HashSet::new();

        binder.collect_labels(ModuleId::Main, &tree.statements);
        for statement in &tree.statements {
            if let Statement::SubModuleStatement(sub) = statement {
                let key = Key::new(sub.name.name.as_str());
                let id = binder.sub_modules.get_index_of(&key).map(SubModuleId);
                match id {
                    Some(id) if defined_subs.insert(id) => {
                        binder.module = ModuleId::Sub(id);
                        binder.collect_labels(binder.module, &sub.body);
                        sub_modules.push(BoundSubModule {
                            range: sub.range,
                            name: sub.name.name.clone(),
                            body: binder.bind_block(&sub.body),
                        });
                    }
                    _ => {
                        binder.diagnostics.report(
                            DiagnosticCode::TwoSubModulesWithTheSameName,
                            sub.name.range,
                            [sub.name.name.as_str()],
                        );
                    }
                }
                binder.module = ModuleId::Main;
            } else if let Some(bound) = binder.bind_statement(statement) {
                main.push(bound);
            }
        }

        let variables: Vec<String> = binder.variables.iter().map(|k| k.to_string()).collect();
        let names = variables
            .iter()
            .cloned()
            .chain(tree.sub_module_names.iter().cloned())
            .collect();
        tracing::debug!(
            variables = variables.len(),
            sub_modules = sub_modules.len(),
            diagnostics = binder.diagnostics.len(),
            "bound program"
        );
        BoundProgram {
            main,
            sub_modules,
            variables,
            names,
            analysis: binder.analysis,
        }
    }

    // ==============================================================================
    // Declarations
    // ==============================================================================

    /// every assignment target and `For` variable declares a variable
    fn collect_variables(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::SubModuleStatement(s) => self.collect_variables(&s.body),
                Statement::IfStatement(s) => {
                    for branch in &s.branches {
                        self.collect_variables(&branch.body);
                    }
                    if let Some(body) = &s.else_body {
                        self.collect_variables(body);
                    }
                }
                Statement::WhileStatement(s) => self.collect_variables(&s.body),
                Statement::ForStatement(s) => {
                    self.declare_variable(&s.variable.name);
                    self.collect_variables(&s.body);
                }
                Statement::AssignmentStatement(s) => {
                    let mut target = &s.target;
                    while let Expression::ArrayAccessExpression(access) = target {
                        target = access.base.as_ref();
                    }
                    if let Expression::IdentifierExpression(IdentifierExpression(_, name)) = target
                    {
                        self.declare_variable(name);
                    }
                }
                Statement::GotoStatement(_)
                | Statement::LabelStatement(_)
                | Statement::ExpressionStatement(_) => {}
            }
        }
    }

    fn declare_variable(&mut self, name: &str) {
        if matches!(self.resolve(name), Symbol::Unknown) {
            self.variables.insert(Key::new(name));
        }
    }

    /// labels of one module, sub bodies belong to their own module
    fn collect_labels(&mut self, module: ModuleId, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::LabelStatement(s) => {
                    if !self.labels.insert((module, Key::new(s.label.name.as_str()))) {
                        self.diagnostics.report(
                            DiagnosticCode::TwoLabelsWithTheSameName,
                            s.label.range,
                            [s.label.name.as_str()],
                        );
                    }
                }
                Statement::IfStatement(s) => {
                    for branch in &s.branches {
                        self.collect_labels(module, &branch.body);
                    }
                    if let Some(body) = &s.else_body {
                        self.collect_labels(module, body);
                    }
                }
                Statement::WhileStatement(s) => self.collect_labels(module, &s.body),
                Statement::ForStatement(s) => self.collect_labels(module, &s.body),
                Statement::SubModuleStatement(_)
                | Statement::GotoStatement(_)
                | Statement::AssignmentStatement(_)
                | Statement::ExpressionStatement(_) => {}
            }
        }
    }

    fn resolve(&self, name: &str) -> Symbol {
        let key = Key::new(name);
        if let Some(i) = self.sub_modules.get_index_of(&key) {
            Symbol::SubModule(SubModuleId(i))
        } else if let Some(id) = self.options.manifest.find_library(name) {
            Symbol::Library(id)
        } else if let Some(i) = self.variables.get_index_of(&key) {
            Symbol::Variable(VariableId(i))
        } else {
            Symbol::Unknown
        }
    }

    // ==============================================================================
    // Statements
    // ==============================================================================

    fn bind_block(&mut self, statements: &[Statement]) -> Vec<BoundStatement> {
        statements
            .iter()
            .filter_map(|s| self.bind_statement(s))
            .collect()
    }

    /// returns None for statements that don't produce anything, i.e. nested subs
    fn bind_statement(&mut self, statement: &Statement) -> Option<BoundStatement> {
        let range = statement.range();
        Some(match statement {
            Statement::SubModuleStatement(_) => return None,
            Statement::IfStatement(s) => BoundStatement::If {
                range,
                branches: s
                    .branches
                    .iter()
                    .map(|b| BoundConditionalBlock {
                        range: b.range,
                        condition: self.bind_expression(&b.condition),
                        body: self.bind_block(&b.body),
                    })
                    .collect(),
                else_body: s.else_body.as_ref().map(|b| self.bind_block(b)),
            },
            Statement::WhileStatement(s) => BoundStatement::While {
                range,
                condition: self.bind_expression(&s.condition),
                body: self.bind_block(&s.body),
            },
            Statement::ForStatement(s) => {
                let variable = match self.resolve(&s.variable.name) {
                    Symbol::Variable(id) => Some(id),
                    _ => {
                        self.diagnostics.report_plain(
                            DiagnosticCode::UnsupportedAssignmentTarget,
                            s.variable.range,
                        );
                        None
                    }
                };
                let from = self.bind_expression(&s.from);
                let to = self.bind_expression(&s.to);
                let step = s.step.as_ref().map(|e| self.bind_expression(e));
                let body = self.bind_block(&s.body);
                match variable {
                    Some(variable) => BoundStatement::For {
                        range,
                        variable,
                        from,
                        to,
                        step,
                        body,
                    },
                    None => BoundStatement::Invalid { range },
                }
            }
            Statement::GotoStatement(s) => {
                let key = Key::new(s.label.name.as_str());
                if !self.labels.contains(&(self.module, key)) {
                    self.diagnostics.report(
                        DiagnosticCode::GoToUndefinedLabel,
                        s.label.range,
                        [s.label.name.as_str()],
                    );
                }
                BoundStatement::Goto {
                    range,
                    label: s.label.name.clone(),
                }
            }
            Statement::LabelStatement(s) => BoundStatement::Label {
                range,
                label: s.label.name.clone(),
            },
            Statement::AssignmentStatement(s) => self.bind_assignment(s),
            Statement::ExpressionStatement(s) => self.bind_expression_statement(s),
        })
    }

    fn bind_assignment(&mut self, statement: &AssignmentStatement) -> BoundStatement {
        let range = statement.range;
        match &statement.target {
            Expression::IdentifierExpression(IdentifierExpression(target_range, name)) => {
                match self.resolve(name) {
                    Symbol::Variable(variable) => BoundStatement::VariableAssignment {
                        range,
                        variable,
                        value: self.bind_expression(&statement.value),
                    },
                    _ => self.unsupported_target(*target_range, &statement.value),
                }
            }
            Expression::ArrayAccessExpression(access) => {
                let (base, index_expressions) = flatten_array_access(access);
                let array = self.array_base(base);
                let indices = index_expressions
                    .into_iter()
                    .map(|e| self.bind_expression(e))
                    .collect();
                let Some(array) = array else {
                    self.bind_expression(&statement.value);
                    return BoundStatement::Invalid { range };
                };
                BoundStatement::ArrayAssignment {
                    range,
                    array,
                    indices,
                    value: self.bind_expression(&statement.value),
                }
            }
            Expression::ObjectAccessExpression(access) => {
                let Some((library, member)) = self.resolve_member(access) else {
                    self.bind_expression(&statement.value);
                    return BoundStatement::Invalid { range };
                };
                match member {
                    MemberRef::Property(property) => {
                        if !self.options.manifest.property(property).has_setter {
                            self.report_member(
                                DiagnosticCode::PropertyHasNoSetter,
                                access,
                                library,
                            );
                        }
                        BoundStatement::PropertyAssignment {
                            range,
                            property,
                            value: self.bind_expression(&statement.value),
                        }
                    }
                    MemberRef::Event(event) => {
                        let sub_module = match statement.value.unparenthesized() {
                            Expression::IdentifierExpression(IdentifierExpression(_, name)) => {
                                match self.resolve(name) {
                                    Symbol::SubModule(id) => Some(id),
                                    _ => None,
                                }
                            }
                            _ => None,
                        };
                        match sub_module {
                            Some(sub_module) => BoundStatement::EventAssignment {
                                range,
                                event,
                                sub_module,
                            },
                            None => {
                                self.diagnostics.report_plain(
                                    DiagnosticCode::AssigningNonSubModuleToEvent,
                                    statement.value.range(),
                                );
                                BoundStatement::Invalid { range }
                            }
                        }
                    }
                    MemberRef::Method(_) => self.unsupported_target(access.range, &statement.value),
                }
            }
            other => self.unsupported_target(other.range(), &statement.value),
        }
    }

    fn unsupported_target(&mut self, target: TextRange, value: &Expression) -> BoundStatement {
        self.diagnostics
            .report_plain(DiagnosticCode::UnsupportedAssignmentTarget, target);
        self.bind_expression(value);
        BoundStatement::Invalid {
            range: target.to(value.range()),
        }
    }

    fn bind_expression_statement(&mut self, statement: &ExpressionStatement) -> BoundStatement {
        let range = statement.range;
        match &statement.expression {
            Expression::CallExpression(call) => match self.bind_call(call, false) {
                Invocation::SubModule(sub_module) => {
                    BoundStatement::SubModuleInvocation { range, sub_module }
                }
                Invocation::Method {
                    method,
                    arguments,
                    returns_value,
                } => BoundStatement::MethodInvocation {
                    range,
                    method,
                    arguments,
                    returns_value,
                },
                Invocation::Invalid => BoundStatement::Invalid { range },
            },
            Expression::IdentifierExpression(IdentifierExpression(_, name))
                if matches!(self.resolve(name), Symbol::SubModule(_)) =>
            {
                self.diagnostics.report(
                    DiagnosticCode::UnsupportedInvocationWithoutParentheses,
                    range,
                    [name.as_str()],
                );
                BoundStatement::Invalid { range }
            }
            Expression::ObjectAccessExpression(access) => {
                match self.resolve_member(access) {
                    Some((library, MemberRef::Method(_))) => {
                        let name = format!(
                            "{}.{}",
                            self.options.manifest.library(library).name,
                            access.member.name
                        );
                        self.diagnostics.report(
                            DiagnosticCode::UnsupportedInvocationWithoutParentheses,
                            range,
                            [name],
                        );
                    }
                    Some(_) => self
                        .diagnostics
                        .report_plain(DiagnosticCode::InvalidExpressionStatement, range),
                    None => {}
                }
                BoundStatement::Invalid { range }
            }
            _ => {
                self.diagnostics
                    .report_plain(DiagnosticCode::InvalidExpressionStatement, range);
                BoundStatement::Invalid { range }
            }
        }
    }

    // ==============================================================================
    // Expressions
    // ==============================================================================

    /// binds an expression in a position where its value is used
    fn bind_expression(&mut self, expression: &Expression) -> BoundExpression {
        let range = expression.range();
        match expression {
            Expression::NumberLiteral(NumberLiteral(_, text)) => match parse_number(text) {
                Some(n) => BoundExpression::Literal {
                    range,
                    value: Value::Number(n),
                },
                None => {
                    self.diagnostics
                        .report(DiagnosticCode::ValueIsNotANumber, range, [text.as_str()]);
                    BoundExpression::invalid(range)
                }
            },
            Expression::StringLiteral(StringLiteral(_, text)) => BoundExpression::Literal {
                range,
                value: Value::String(text.clone()),
            },
            Expression::IdentifierExpression(IdentifierExpression(_, name)) => {
                match self.resolve(name) {
                    Symbol::Variable(variable) => BoundExpression::Variable { range, variable },
                    Symbol::SubModule(_) => {
                        self.diagnostics
                            .report_plain(DiagnosticCode::ExpectedExpressionWithAValue, range);
                        BoundExpression::invalid(range)
                    }
                    Symbol::Library(_) => {
                        self.diagnostics.report(
                            DiagnosticCode::LibraryUsedAsValue,
                            range,
                            [name.as_str()],
                        );
                        BoundExpression::invalid(range)
                    }
                    Symbol::Unknown => {
                        self.diagnostics.report(
                            DiagnosticCode::UndefinedVariable,
                            range,
                            [name.as_str()],
                        );
                        BoundExpression::invalid(range)
                    }
                }
            }
            Expression::ParenthesisExpression(p) => self.bind_expression(&p.inner),
            Expression::NegationExpression(n) => BoundExpression::Negation {
                range,
                operand: Box::new(self.bind_expression(&n.operand)),
            },
            Expression::BinaryExpression(b) => BoundExpression::Binary {
                range,
                operator: b.operator,
                left: Box::new(self.bind_expression(&b.left)),
                right: Box::new(self.bind_expression(&b.right)),
            },
            Expression::ArrayAccessExpression(access) => {
                let (base, index_expressions) = flatten_array_access(access);
                let array = self.array_base(base);
                let indices = index_expressions
                    .into_iter()
                    .map(|e| self.bind_expression(e))
                    .collect();
                match array {
                    Some(array) => BoundExpression::ArrayAccess {
                        range,
                        array,
                        indices,
                    },
                    None => BoundExpression::invalid(range),
                }
            }
            Expression::ObjectAccessExpression(access) => {
                let Some((library, member)) = self.resolve_member(access) else {
                    return BoundExpression::invalid(range);
                };
                match member {
                    MemberRef::Property(property) => {
                        if !self.options.manifest.property(property).has_getter {
                            self.report_member(
                                DiagnosticCode::PropertyHasNoGetter,
                                access,
                                library,
                            );
                        }
                        BoundExpression::PropertyRead { range, property }
                    }
                    MemberRef::Method(_) => {
                        let name = format!(
                            "{}.{}",
                            self.options.manifest.library(library).name,
                            access.member.name
                        );
                        self.diagnostics.report(
                            DiagnosticCode::UnsupportedInvocationWithoutParentheses,
                            range,
                            [name],
                        );
                        BoundExpression::invalid(range)
                    }
                    MemberRef::Event(_) => {
                        self.diagnostics
                            .report_plain(DiagnosticCode::ExpectedExpressionWithAValue, range);
                        BoundExpression::invalid(range)
                    }
                }
            }
            Expression::CallExpression(call) => match self.bind_call(call, true) {
                Invocation::Method {
                    method, arguments, ..
                } => BoundExpression::MethodCall {
                    range,
                    method,
                    arguments,
                },
                Invocation::SubModule(_) | Invocation::Invalid => BoundExpression::invalid(range),
            },
        }
    }

    fn bind_call(&mut self, call: &CallExpression, needs_value: bool) -> Invocation {
        let range = call.range;
        if let Expression::ObjectAccessExpression(access) = call.base.as_ref() {
            let member = self.resolve_member(access);
            let arguments = self.bind_arguments(call);
            return match member {
                Some((_, MemberRef::Method(method))) => {
                    let signature = self.options.manifest.method(method);
                    let (expected, returns_value) =
                        (signature.parameters.len(), signature.returns_value);
                    if !self.check_arguments_count(call, expected) {
                        Invocation::Invalid
                    } else if needs_value && !returns_value {
                        self.diagnostics
                            .report_plain(DiagnosticCode::ExpectedExpressionWithAValue, range);
                        Invocation::Invalid
                    } else {
                        Invocation::Method {
                            method,
                            arguments,
                            returns_value,
                        }
                    }
                }
                Some(_) => {
                    self.diagnostics.report_plain(
                        DiagnosticCode::UnsupportedInvocationBaseExpression,
                        access.range,
                    );
                    Invocation::Invalid
                }
                None => Invocation::Invalid,
            };
        }

        let sub_module = match call.base.as_ref() {
            Expression::IdentifierExpression(IdentifierExpression(_, name)) => {
                match self.resolve(name) {
                    Symbol::SubModule(id) => Some(id),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some(sub_module) = sub_module else {
            self.diagnostics.report_plain(
                DiagnosticCode::UnsupportedInvocationBaseExpression,
                call.base.range(),
            );
            self.bind_arguments(call);
            return Invocation::Invalid;
        };
        self.bind_arguments(call);
        if !self.check_arguments_count(call, 0) {
            Invocation::Invalid
        } else if needs_value {
            self.diagnostics
                .report_plain(DiagnosticCode::ExpectedExpressionWithAValue, range);
            Invocation::Invalid
        } else {
            Invocation::SubModule(sub_module)
        }
    }

    fn bind_arguments(&mut self, call: &CallExpression) -> Vec<BoundExpression> {
        call.arguments
            .iter()
            .map(|a| self.bind_expression(a))
            .collect()
    }

    /// reports a count mismatch, returns whether the count was right
    fn check_arguments_count(&mut self, call: &CallExpression, expected: usize) -> bool {
        let actual = call.arguments.len();
        if actual != expected {
            self.diagnostics.report(
                DiagnosticCode::UnexpectedArgumentsCount,
                call.range,
                [expected.to_string(), actual.to_string()],
            );
        }
        actual == expected
    }

    /// the variable an array access is based on
    fn array_base(&mut self, base: &Expression) -> Option<VariableId> {
        if let Expression::IdentifierExpression(IdentifierExpression(range, name)) = base {
            match self.resolve(name) {
                Symbol::Variable(id) => return Some(id),
                Symbol::Unknown => {
                    self.diagnostics.report(
                        DiagnosticCode::UndefinedVariable,
                        *range,
                        [name.as_str()],
                    );
                    return None;
                }
                Symbol::SubModule(_) | Symbol::Library(_) => {}
            }
        }
        self.diagnostics
            .report_plain(DiagnosticCode::UnsupportedArrayBaseExpression, base.range());
        None
    }

    /// resolves `Library.Member` and checks that the member may be used
    fn resolve_member(&mut self, access: &ObjectAccessExpression) -> Option<(LibraryId, MemberRef)> {
        let options = self.options;
        let library = match access.base.as_ref() {
            Expression::IdentifierExpression(IdentifierExpression(_, name)) => {
                match self.resolve(name) {
                    Symbol::Library(id) => Some(id),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some(library) = library else {
            self.diagnostics.report_plain(
                DiagnosticCode::UnsupportedDotBaseExpression,
                access.base.range(),
            );
            return None;
        };

        let manifest = &options.manifest;
        let signature = manifest.library(library);
        self.analysis.uses_text_window |= signature.uses_text_window;
        self.analysis.uses_graphics_window |= signature.uses_graphics_window;

        let Some(member) = manifest.find_member(library, &access.member.name) else {
            self.diagnostics.report(
                DiagnosticCode::LibraryMemberNotFound,
                access.range,
                [signature.name.as_str(), access.member.name.as_str()],
            );
            return None;
        };
        let (needs_desktop, is_deprecated) = match member {
            MemberRef::Method(id) => {
                let m = manifest.method(id);
                (m.needs_desktop, m.is_deprecated)
            }
            MemberRef::Property(id) => {
                let p = manifest.property(id);
                (p.needs_desktop, p.is_deprecated)
            }
            MemberRef::Event(_) => (false, false),
        };
        if is_deprecated {
            self.report_member(DiagnosticCode::LibraryMemberDeprecated, access, library);
        } else if needs_desktop && options.run_mode == RunMode::Constrained {
            self.report_member(DiagnosticCode::LibraryMemberNeedsDesktop, access, library);
        }
        Some((library, member))
    }

    /// reports a diagnostic with the library and member name as arguments
    fn report_member(&mut self, code: DiagnosticCode, access: &ObjectAccessExpression, library: LibraryId) {
        let library = self.options.manifest.library(library).name.clone();
        self.diagnostics
            .report(code, access.range, [library, access.member.name.clone()]);
    }
}

/// `a[i][j]` -> (`a`, [`i`, `j`])
fn flatten_array_access(access: &ArrayAccessExpression) -> (&Expression, Vec<&Expression>) {
    let mut indices = vec![access.index.as_ref()];
    let mut base = access.base.as_ref();
    while let Expression::ArrayAccessExpression(inner) = base {
        indices.push(inner.index.as_ref());
        base = inner.base.as_ref();
    }
    indices.reverse();
    (base, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::scan;

    fn options(run_mode: RunMode) -> CompilerOptions {
        CompilerOptions {
            run_mode,
            manifest: LibraryManifest::new(vec![
                LibrarySignature::new("TextWindow")
                    .uses_text_window()
                    .method(MethodSignature::new("WriteLine", &["data"], false))
                    .method(MethodSignature::new("Read", &[], true))
                    .property(PropertySignature::new("Title", true, true))
                    .property(PropertySignature::new("Left", false, true))
                    .property(PropertySignature::new("Size", true, false))
                    .event("KeyDown"),
                LibrarySignature::new("File")
                    .method(MethodSignature::new("ReadContents", &["path"], true).needs_desktop())
                    .method(MethodSignature::new("Old", &[], false).deprecated()),
            ]),
        }
    }

    fn bind_with(text: &str, run_mode: RunMode) -> (BoundProgram, Vec<Diagnostic>) {
        let mut bag = DiagnosticBag::new();
        let tokens = scan(text, &mut bag);
        let tree = Parser::parse(&tokens, &mut bag);
        let options = options(run_mode);
        let program = Binder::bind(&tree, &options, &mut bag);
        (program, bag.into_iter().collect())
    }

    fn codes(text: &str) -> Vec<DiagnosticCode> {
        bind_with(text, RunMode::Constrained)
            .1
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_duplicate_label_reported_at_second_definition() {
        let (_, diagnostics) = bind_with(
            "\nSub A\nlbl:\nx = 1\nlbl:\nEndSub\nlbl:",
            RunMode::Constrained,
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::new(
                DiagnosticCode::TwoLabelsWithTheSameName,
                TextRange::new((4, 0), (4, 2)),
                ["lbl"]
            )]
        );
    }

    #[test]
    fn test_goto_only_sees_labels_of_its_module() {
        assert_eq!(
            codes("Sub A\nGoto outer\nEndSub\nouter:"),
            vec![DiagnosticCode::GoToUndefinedLabel]
        );
    }

    #[test]
    fn test_unknown_member() {
        let (_, diagnostics) = bind_with("TextWindow.NoMethod()", RunMode::Constrained);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::LibraryMemberNotFound);
        assert_eq!(diagnostics[0].args, vec!["TextWindow", "NoMethod"]);
    }

    #[test]
    fn test_run_mode_gates_desktop_members() {
        let text = "x = File.ReadContents(\"a.txt\")";
        assert_eq!(
            codes(text),
            vec![DiagnosticCode::LibraryMemberNeedsDesktop]
        );
        assert!(bind_with(text, RunMode::Desktop).1.is_empty());
        assert_eq!(codes("File.Old()"), vec![DiagnosticCode::LibraryMemberDeprecated]);
    }

    #[test]
    fn test_argument_counts() {
        assert_eq!(
            codes("TextWindow.WriteLine(1, 2)\nSub A\nEndSub\nA(1)"),
            vec![
                DiagnosticCode::UnexpectedArgumentsCount,
                DiagnosticCode::UnexpectedArgumentsCount
            ]
        );
    }

    #[test]
    fn test_properties() {
        assert_eq!(
            codes("TextWindow.Size = 1\nx = TextWindow.Left\nTextWindow.Title = TextWindow.Title"),
            vec![
                DiagnosticCode::PropertyHasNoSetter,
                DiagnosticCode::PropertyHasNoGetter
            ]
        );
    }

    #[test]
    fn test_values() {
        assert_eq!(
            codes("Sub A\nEndSub\nx = A()\ny = TextWindow.WriteLine(1)\nz = TextWindow"),
            vec![
                DiagnosticCode::ExpectedExpressionWithAValue,
                DiagnosticCode::ExpectedExpressionWithAValue,
                DiagnosticCode::LibraryUsedAsValue
            ]
        );
    }

    #[test]
    fn test_events() {
        let (program, diagnostics) = bind_with(
            "Sub OnKey\nEndSub\nTextWindow.KeyDown = OnKey\nTextWindow.KeyDown = 5",
            RunMode::Constrained,
        );
        assert_eq!(
            diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(),
            vec![DiagnosticCode::AssigningNonSubModuleToEvent]
        );
        assert!(matches!(
            program.main[0],
            BoundStatement::EventAssignment {
                sub_module: SubModuleId(0),
                ..
            }
        ));
    }

    #[test]
    fn test_variables_declared_anywhere() {
        let (program, diagnostics) = bind_with(
            "Sub A\nTextWindow.WriteLine(later)\nEndSub\nlater = 1\nFor i = 1 To 2\nEndFor\narr[1][2] = 3\nx = y",
            RunMode::Constrained,
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::new(
                DiagnosticCode::UndefinedVariable,
                TextRange::new((7, 4), (7, 4)),
                ["y"]
            )]
        );
        assert_eq!(program.variables, vec!["later", "i", "arr", "x"]);
        assert_eq!(program.names, vec!["later", "i", "arr", "x", "A"]);
    }

    #[test]
    fn test_invalid_statements() {
        assert_eq!(
            codes("x = 1\nx\nSub A\nEndSub\nA\nTextWindow.WriteLine\n(x)[1] = 2\nx() "),
            vec![
                // reported by the parser, before binding starts
                DiagnosticCode::UnrecognizedStatement,
                DiagnosticCode::InvalidExpressionStatement,
                DiagnosticCode::UnsupportedInvocationWithoutParentheses,
                DiagnosticCode::UnsupportedInvocationWithoutParentheses,
                DiagnosticCode::UnsupportedInvocationBaseExpression,
            ]
        );
    }

    #[test]
    fn test_duplicate_sub() {
        assert_eq!(
            codes("Sub A\nEndSub\nSub a\nEndSub"),
            vec![DiagnosticCode::TwoSubModulesWithTheSameName]
        );
    }

    #[test]
    fn test_runtime_analysis() {
        let (program, _) = bind_with("TextWindow.WriteLine(1)", RunMode::Constrained);
        assert!(program.analysis.uses_text_window);
        assert!(!program.analysis.uses_graphics_window);
    }

    #[test]
    fn test_number_out_of_range() {
        assert_eq!(
            codes("x = 99999999999999999999999999999999999"),
            vec![DiagnosticCode::ValueIsNotANumber]
        );
    }

    #[test]
    fn test_invalid_for_variable_still_binds_the_loop() {
        assert_eq!(
            codes("Sub A\nEndSub\nFor A = 1 To z\nx = y\nGoto nowhere\nEndFor"),
            vec![
                DiagnosticCode::UnsupportedAssignmentTarget,
                DiagnosticCode::UndefinedVariable,
                DiagnosticCode::UndefinedVariable,
                DiagnosticCode::GoToUndefinedLabel,
            ]
        );
    }

    #[test]
    fn test_invalid_array_base_still_binds_the_indices() {
        let (_, diagnostics) = bind_with("Sub A\nEndSub\nA[q][r] = 1", RunMode::Constrained);
        let found: Vec<_> = diagnostics.iter().map(|d| (d.code, d.args.clone())).collect();
        assert_eq!(
            found,
            vec![
                (DiagnosticCode::UnsupportedArrayBaseExpression, vec![]),
                (DiagnosticCode::UndefinedVariable, vec!["q".to_string()]),
                (DiagnosticCode::UndefinedVariable, vec!["r".to_string()]),
            ]
        );
    }

    #[test]
    fn test_identifiers_fold_ascii_case_only() {
        assert!(codes("\u{c9}:\n\u{e9}:\nGoto \u{c9}\nGoto \u{e9}").is_empty());
        assert_eq!(
            codes("\u{c9}t\u{c9} = 1\nx = \u{e9}T\u{e9}"),
            vec![DiagnosticCode::UndefinedVariable]
        );
        assert_eq!(codes("Abc = 1\nx = aBC"), vec![]);
    }
}
