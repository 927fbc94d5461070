//! Lowers a bound program into linear instructions.
//!
//! Layout of the result: the main module, a `Return`, then every sub-routine followed by
//! its own `Return`. Control flow is lowered to jumps between labels, which are resolved
//! by [`InstructionBuilder::build`] once everything was emitted, so jumps forward and calls
//! of subs declared further down need no special treatment.

use rust_decimal::Decimal;

use crate::core::*;
use crate::utils::bug;

/// Only call this with a program that was bound without diagnostics
pub fn generate(bound: &BoundProgram, manifest: &LibraryManifest) -> Program {
    let mut generator = Generator {
        builder: InstructionBuilder::new(),
        module: ModuleId::Main,
    };

    generator.lower_block(&bound.main);
    let end_range = bound.main.last().map(|s| s.range()).unwrap_or_default();
    generator.builder.push(OpCode::Return, end_range);

    let mut sub_modules = vec![];
    for (i, sub) in bound.sub_modules.iter().enumerate() {
        generator.module = ModuleId::Sub(SubModuleId(i));
        sub_modules.push(SubModuleEntry {
            name: sub.name.clone(),
            address: generator.builder.position(),
        });
        generator.lower_block(&sub.body);
        generator.builder.push(OpCode::Return, sub.range);
    }

    let (instructions, labels) = generator.builder.build();
    tracing::debug!(instructions = instructions.len(), "generated instructions");
    Program {
        instructions,
        sub_modules,
        labels,
        variables: bound.variables.clone(),
        manifest: manifest.clone(),
    }
}

struct Generator {
    builder: InstructionBuilder,
    module: ModuleId,
}

impl Generator {
    fn lower_block(&mut self, statements: &[BoundStatement]) {
        for statement in statements {
            self.lower_statement(statement);
        }
    }

    fn lower_statement(&mut self, statement: &BoundStatement) {
        use BoundStatement::*;
        match statement {
            If {
                branches,
                else_body,
                ..
            } => {
                let end = self.builder.new_label();
                for branch in branches {
                    let next = self.builder.new_label();
                    self.lower_expression(&branch.condition, branch.range);
                    self.builder
                        .push(OpCode::JumpIfFalse(next.clone()), branch.range);
                    self.lower_block(&branch.body);
                    self.builder.push(OpCode::Jump(end.clone()), branch.range);
                    self.builder.mark(next);
                }
                if let Some(body) = else_body {
                    self.lower_block(body);
                }
                self.builder.mark(end);
            }
            While {
                range,
                condition,
                body,
            } => {
                let start = self.builder.new_label();
                let end = self.builder.new_label();
                self.builder.mark(start.clone());
                self.lower_expression(condition, *range);
                self.builder.push(OpCode::JumpIfFalse(end.clone()), *range);
                self.lower_block(body);
                self.builder.push(OpCode::Jump(start), *range);
                self.builder.mark(end);
            }
            For {
                range,
                variable,
                from,
                to,
                step,
                body,
            } => {
                let range = *range;
                let start = self.builder.new_label();
                let end = self.builder.new_label();
                self.lower_expression(from, range);
                self.builder.push(OpCode::StoreVariable(*variable), range);

                self.builder.mark(start.clone());
                self.builder.push(OpCode::LoadVariable(*variable), range);
                self.lower_expression(to, range);
                self.lower_step(step.as_ref(), range);
                self.builder.push(OpCode::ForLoopGuard(end.clone()), range);

                self.lower_block(body);

                self.builder.push(OpCode::LoadVariable(*variable), range);
                self.lower_step(step.as_ref(), range);
                self.builder
                    .push(OpCode::Binary(BinaryOperator::Add), range);
                self.builder.push(OpCode::StoreVariable(*variable), range);
                self.builder.push(OpCode::Jump(start), range);
                self.builder.mark(end);
            }
            Goto { range, label } => {
                let target = crate::core::Label::user(self.module, label);
                self.builder.push(OpCode::Jump(target), *range);
            }
            Label { label, .. } => {
                let label = crate::core::Label::user(self.module, label);
                self.builder.mark(label);
            }
            VariableAssignment {
                range,
                variable,
                value,
            } => {
                self.lower_expression(value, *range);
                self.builder.push(OpCode::StoreVariable(*variable), *range);
            }
            ArrayAssignment {
                range,
                array,
                indices,
                value,
            } => {
                for index in indices {
                    self.lower_expression(index, *range);
                }
                self.lower_expression(value, *range);
                self.builder.push(
                    OpCode::StoreArrayElement {
                        array: *array,
                        indices: indices.len(),
                    },
                    *range,
                );
            }
            PropertyAssignment {
                range,
                property,
                value,
            } => {
                self.lower_expression(value, *range);
                self.builder.push(OpCode::StoreProperty(*property), *range);
            }
            EventAssignment {
                range,
                event,
                sub_module,
            } => self.builder.push(
                OpCode::SetEventCallback {
                    event: *event,
                    sub_module: *sub_module,
                },
                *range,
            ),
            SubModuleInvocation { range, sub_module } => {
                self.builder
                    .push(OpCode::InvokeSubModule(*sub_module), *range);
            }
            MethodInvocation {
                range,
                method,
                arguments,
                returns_value,
            } => {
                for argument in arguments {
                    self.lower_expression(argument, *range);
                }
                self.builder.push(OpCode::InvokeMethod(*method), *range);
                if *returns_value {
                    self.builder.push(OpCode::Pop, *range);
                }
            }
            Invalid { range } => bug!("invalid statement at {} reached lowering", range),
        }
    }

    fn lower_step(&mut self, step: Option<&BoundExpression>, range: TextRange) {
        match step {
            Some(step) => self.lower_expression(step, range),
            None => self
                .builder
                .push(OpCode::PushValue(Value::Number(Decimal::ONE)), range),
        }
    }

    /// `range` is the one of the statement the expression belongs to
    fn lower_expression(&mut self, expression: &BoundExpression, range: TextRange) {
        use BoundExpression::*;
        match expression {
            Literal { value, .. } => self.builder.push(OpCode::PushValue(value.clone()), range),
            Variable { variable, .. } => self.builder.push(OpCode::LoadVariable(*variable), range),
            ArrayAccess { array, indices, .. } => {
                for index in indices {
                    self.lower_expression(index, range);
                }
                self.builder.push(
                    OpCode::LoadArrayElement {
                        array: *array,
                        indices: indices.len(),
                    },
                    range,
                );
            }
            Binary {
                operator,
                left,
                right,
                ..
            } => {
                // no short circuiting, both sides are always evaluated
                self.lower_expression(left, range);
                self.lower_expression(right, range);
                self.builder.push(OpCode::Binary(*operator), range);
            }
            Negation { operand, .. } => {
                self.lower_expression(operand, range);
                self.builder.push(OpCode::Negate, range);
            }
            PropertyRead { property, .. } => {
                self.builder.push(OpCode::LoadProperty(*property), range)
            }
            MethodCall {
                method, arguments, ..
            } => {
                for argument in arguments {
                    self.lower_expression(argument, range);
                }
                self.builder.push(OpCode::InvokeMethod(*method), range);
            }
            Invalid { range } => bug!("invalid expression at {} reached lowering", range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Binder;
    use crate::compilation::CompilerOptions;
    use crate::parser::Parser;
    use crate::scanner::scan;

    fn compile(text: &str) -> Program {
        let mut bag = DiagnosticBag::new();
        let tokens = scan(text, &mut bag);
        let tree = Parser::parse(&tokens, &mut bag);
        let options = CompilerOptions::default();
        let bound = Binder::bind(&tree, &options, &mut bag);
        assert!(bag.is_empty(), "{:?}", bag.contents());
        generate(&bound, &options.manifest)
    }

    fn codes(program: &Program) -> Vec<OpCode> {
        program.instructions.iter().map(|i| i.code.clone()).collect()
    }

    #[test]
    fn test_empty_program_is_a_single_return() {
        assert_eq!(codes(&compile("")), vec![OpCode::Return]);
    }

    #[test]
    fn test_while_layout() {
        let program = compile("x = 0\nWhile x < 3\nx = x + 1\nEndWhile");
        let x = VariableId(0);
        assert_eq!(
            codes(&program),
            vec![
                OpCode::PushValue(Value::from(0i64)),
                OpCode::StoreVariable(x),
                OpCode::LoadVariable(x),
                OpCode::PushValue(Value::from(3i64)),
                OpCode::Binary(BinaryOperator::LessThan),
                OpCode::JumpIfFalse(11),
                OpCode::LoadVariable(x),
                OpCode::PushValue(Value::from(1i64)),
                OpCode::Binary(BinaryOperator::Add),
                OpCode::StoreVariable(x),
                OpCode::Jump(2),
                OpCode::Return,
            ]
        );
    }

    #[test]
    fn test_for_layout() {
        let program = compile("For i = 1 To 3\nEndFor");
        let i = VariableId(0);
        let one = || OpCode::PushValue(Value::from(1i64));
        assert_eq!(
            codes(&program),
            vec![
                one(),
                OpCode::StoreVariable(i),
                OpCode::LoadVariable(i),
                OpCode::PushValue(Value::from(3i64)),
                one(),
                OpCode::ForLoopGuard(11),
                OpCode::LoadVariable(i),
                one(),
                OpCode::Binary(BinaryOperator::Add),
                OpCode::StoreVariable(i),
                OpCode::Jump(2),
                OpCode::Return,
            ]
        );
    }

    #[test]
    fn test_subs_and_labels_are_linked() {
        let program = compile("Foo()\nSub Foo\nGoto done\nx = 1\ndone:\nEndSub");
        assert_eq!(program.sub_modules[0].name, "Foo");
        assert_eq!(program.sub_modules[0].address, 2);
        let foo = ModuleId::Sub(SubModuleId(0));
        assert_eq!(program.label_address(foo, "DONE"), Some(5));
        assert_eq!(program.instructions[2].code, OpCode::Jump(5));
        assert_eq!(program.instructions[5].code, OpCode::Return);
        assert_eq!(
            program.instructions[2].range,
            TextRange::new((2, 0), (2, 8))
        );
    }

    #[test]
    fn test_if_chain() {
        let program = compile("x = 1\nIf x = 1 Then\ny = 1\nElseIf x = 2 Then\ny = 2\nElse\ny = 3\nEndIf");
        let jumps: Vec<_> = codes(&program)
            .into_iter()
            .filter(|c| matches!(c, OpCode::Jump(_) | OpCode::JumpIfFalse(_)))
            .collect();
        // first branch skips to the ElseIf, both branches jump behind the Else
        assert_eq!(
            jumps,
            vec![
                OpCode::JumpIfFalse(9),
                OpCode::Jump(18),
                OpCode::JumpIfFalse(16),
                OpCode::Jump(18),
            ]
        );
    }
}
