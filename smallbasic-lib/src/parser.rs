//! Builds the syntax tree from tokens.
//!
//! The language is line oriented: every statement, and every header of a block statement,
//! occupies exactly one line. That makes error recovery simple: when a line can't be
//! parsed, one diagnostic is reported and the rest of the line is skipped.

use crate::core::*;

/// operators by precedence, lowest first. Unary minus and postfix operators bind tighter
/// than all of them
const OPERATOR_LEVELS: &[&[(TokenKind, BinaryOperator)]] = &[
    &[(TokenKind::Keyword(Keyword::Or), BinaryOperator::Or)],
    &[(TokenKind::Keyword(Keyword::And), BinaryOperator::And)],
    &[
        (TokenKind::Equal, BinaryOperator::Equal),
        (TokenKind::NotEqual, BinaryOperator::NotEqual),
    ],
    &[
        (TokenKind::LessThan, BinaryOperator::LessThan),
        (TokenKind::GreaterThan, BinaryOperator::GreaterThan),
        (TokenKind::LessThanOrEqual, BinaryOperator::LessThanOrEqual),
        (TokenKind::GreaterThanOrEqual, BinaryOperator::GreaterThanOrEqual),
    ],
    &[
        (TokenKind::Plus, BinaryOperator::Add),
        (TokenKind::Minus, BinaryOperator::Subtract),
    ],
    &[
        (TokenKind::Multiply, BinaryOperator::Multiply),
        (TokenKind::Divide, BinaryOperator::Divide),
    ],
];

pub struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    eof: Token,
    diagnostics: &'a mut DiagnosticBag,
    /// terminators accepted by each block that is currently open, innermost last
    terminators: Vec<&'static [Keyword]>,
    in_sub: bool,
}

impl<'a> Parser<'a> {
    pub fn parse(tokens: &[Token], diagnostics: &'a mut DiagnosticBag) -> SyntaxTree {
        let tokens: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .cloned()
            .collect();
        let eof_range = tokens.last().map(|t| t.range).unwrap_or_default();
        let mut parser = Parser {
            tokens,
            index: 0,
            eof: Token {
                kind: TokenKind::EndOfFile,
                text: String::new(),
                range: eof_range,
            },
            diagnostics,
            terminators: vec![],
            in_sub: false,
        };

        let statements = parser.parse_block();
        let sub_module_names = collect_sub_module_names(&statements);
        tracing::debug!(
            statements = statements.len(),
            sub_modules = sub_module_names.len(),
            "parsed syntax tree"
        );
        SyntaxTree {
            statements,
            sub_module_names,
        }
    }

    // ==============================================================================
    // Statements
    // ==============================================================================

    /// parses statements until the end of the file or a terminator that belongs to one of
    /// the open blocks
    fn parse_block(&mut self) -> Vec<Statement> {
        let mut statements = vec![];
        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::EndOfFile => break,
                TokenKind::EndOfLine => {
                    self.advance();
                }
                TokenKind::Keyword(kw) if kw.is_block_terminator() => {
                    if self.terminators.iter().any(|set| set.contains(&kw)) {
                        break;
                    }
                    self.diagnostics.report(
                        DiagnosticCode::UnexpectedStatement,
                        token.range,
                        [token.text],
                    );
                    self.skip_line();
                }
                _ => {
                    if let Some(statement) = self.parse_statement() {
                        statements.push(statement);
                    }
                }
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Sub) => self.parse_sub(),
            TokenKind::Keyword(Keyword::Goto) => self.parse_goto(),
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::Colon => {
                self.advance();
                let colon = self.advance();
                let label = LabelStatement {
                    range: token.range.to(colon.range),
                    label: identifier(&token),
                };
                self.end_line(Some(label.into()))
            }
            TokenKind::Identifier => self.parse_expression_statement(),
            _ => {
                self.diagnostics.report(
                    DiagnosticCode::UnrecognizedStatement,
                    token.range,
                    [token.text],
                );
                self.skip_line();
                None
            }
        }
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let statement = self.parse_postfix().and_then(|target| {
            if self.at(TokenKind::Equal) {
                self.advance();
                let value = self.parse_expression()?;
                Some(
                    AssignmentStatement {
                        range: target.range().to(value.range()),
                        target,
                        value,
                    }
                    .into(),
                )
            } else {
                Some(
                    ExpressionStatement {
                        range: target.range(),
                        expression: target,
                    }
                    .into(),
                )
            }
        });
        self.end_line(statement)
    }

    fn parse_goto(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let statement = self
            .expect(TokenKind::Identifier)
            .map(|label| GotoStatement {
                range: keyword.range.to(label.range),
                label: identifier(&label),
            });
        self.end_line(statement.map(Into::into))
    }

    fn parse_if(&mut self) -> Option<Statement> {
        let if_token = self.advance();
        let mut header = self.parse_conditional_header(&if_token);
        let mut branches = vec![];
        let mut complete = true;

        self.terminators
            .push(&[Keyword::ElseIf, Keyword::Else, Keyword::EndIf]);
        loop {
            let body = self.parse_block();
            match header {
                Some((range, condition)) => branches.push(ConditionalBlock {
                    range,
                    condition,
                    body,
                }),
                None => complete = false,
            }
            if !self.at_keyword(Keyword::ElseIf) {
                break;
            }
            let else_if = self.advance();
            header = self.parse_conditional_header(&else_if);
        }
        self.terminators.pop();

        let else_body = if self.at_keyword(Keyword::Else) {
            self.advance();
            self.end_line(Some(()));
            self.terminators.push(&[Keyword::EndIf]);
            let body = self.parse_block();
            self.terminators.pop();
            Some(body)
        } else {
            None
        };

        self.close_block(&if_token, Keyword::If, Keyword::EndIf);
        if !complete {
            return None;
        }
        Some(
            IfStatement {
                range: branches[0].range,
                branches,
                else_body,
            }
            .into(),
        )
    }

    /// `If cond Then` or `ElseIf cond Then`, including the end of the line
    fn parse_conditional_header(&mut self, keyword: &Token) -> Option<(TextRange, Expression)> {
        let header = self.parse_expression().and_then(|condition| {
            let then = self.expect(TokenKind::Keyword(Keyword::Then))?;
            Some((keyword.range.to(then.range), condition))
        });
        self.end_line(header)
    }

    fn parse_while(&mut self) -> Option<Statement> {
        let while_token = self.advance();
        let condition = self.parse_expression();
        let condition = self.end_line(condition);

        self.terminators.push(&[Keyword::EndWhile]);
        let body = self.parse_block();
        self.terminators.pop();
        self.close_block(&while_token, Keyword::While, Keyword::EndWhile);

        let condition = condition?;
        Some(
            WhileStatement {
                range: while_token.range.to(condition.range()),
                condition,
                body,
            }
            .into(),
        )
    }

    fn parse_for(&mut self) -> Option<Statement> {
        let for_token = self.advance();
        let header = self.parse_for_header();
        let header = self.end_line(header);

        self.terminators.push(&[Keyword::EndFor]);
        let body = self.parse_block();
        self.terminators.pop();
        self.close_block(&for_token, Keyword::For, Keyword::EndFor);

        let (variable, from, to, step) = header?;
        let last = step.as_ref().unwrap_or(&to);
        Some(
            ForStatement {
                range: for_token.range.to(last.range()),
                variable,
                from,
                to,
                step,
                body,
            }
            .into(),
        )
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_header(&mut self) -> Option<(Identifier, Expression, Expression, Option<Expression>)> {
        let variable = identifier(&self.expect(TokenKind::Identifier)?);
        self.expect(TokenKind::Equal)?;
        let from = self.parse_expression()?;
        self.expect(TokenKind::Keyword(Keyword::To))?;
        let to = self.parse_expression()?;
        let step = if self.at_keyword(Keyword::Step) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Some((variable, from, to, step))
    }

    fn parse_sub(&mut self) -> Option<Statement> {
        let sub_token = self.advance();
        let nested = !self.terminators.is_empty();
        if self.in_sub {
            self.diagnostics
                .report_plain(DiagnosticCode::CannotDefineSubInsideSub, sub_token.range);
        } else if nested {
            self.diagnostics.report(
                DiagnosticCode::UnexpectedStatement,
                sub_token.range,
                [sub_token.text.clone()],
            );
        }
        let name = self.expect(TokenKind::Identifier);
        let name = self.end_line(name);

        let was_in_sub = std::mem::replace(&mut self.in_sub, true);
        self.terminators.push(&[Keyword::EndSub]);
        let body = self.parse_block();
        self.terminators.pop();
        self.in_sub = was_in_sub;
        self.close_block(&sub_token, Keyword::Sub, Keyword::EndSub);

        let name = name?;
        if nested {
            return None;
        }
        Some(
            SubModuleStatement {
                range: sub_token.range.to(name.range),
                name: identifier(&name),
                body,
            }
            .into(),
        )
    }

    /// consumes the terminator of a block, or reports that it's missing
    fn close_block(&mut self, opening: &Token, construct: Keyword, terminator: Keyword) {
        if self.at_keyword(terminator) {
            self.advance();
            self.end_line(Some(()));
        } else {
            self.diagnostics.report(
                DiagnosticCode::MissingBlockTerminator,
                opening.range,
                [construct.to_string(), terminator.to_string()],
            );
        }
    }

    // ==============================================================================
    // Expressions
    // ==============================================================================

    fn parse_expression(&mut self) -> Option<Expression> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: usize) -> Option<Expression> {
        if level == OPERATOR_LEVELS.len() {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        loop {
            let kind = self.current().kind;
            let Some((_, operator)) = OPERATOR_LEVELS[level].iter().find(|(k, _)| *k == kind)
            else {
                break;
            };
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = BinaryExpression {
                range: left.range().to(right.range()),
                operator: *operator,
                left: Box::new(left),
                right: Box::new(right),
            }
            .into();
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expression> {
        if self.at(TokenKind::Minus) {
            let minus = self.advance();
            let operand = self.parse_unary()?;
            return Some(
                NegationExpression {
                    range: minus.range.to(operand.range()),
                    operand: Box::new(operand),
                }
                .into(),
            );
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expression> {
        let mut expression = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let member = identifier(&self.expect(TokenKind::Identifier)?);
                    expression = ObjectAccessExpression {
                        range: expression.range().to(member.range),
                        base: Box::new(expression),
                        member,
                    }
                    .into();
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect(TokenKind::RightBracket)?;
                    expression = ArrayAccessExpression {
                        range: expression.range().to(close.range),
                        base: Box::new(expression),
                        index: Box::new(index),
                    }
                    .into();
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let mut arguments = vec![];
                    if !self.at(TokenKind::RightParen) {
                        loop {
                            arguments.push(self.parse_expression()?);
                            if !self.at(TokenKind::Comma) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    let close = self.expect(TokenKind::RightParen)?;
                    expression = CallExpression {
                        range: expression.range().to(close.range),
                        base: Box::new(expression),
                        arguments,
                    }
                    .into();
                }
                _ => return Some(expression),
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Expression> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Some(IdentifierExpression(token.range, token.text).into())
            }
            TokenKind::NumberLiteral => {
                self.advance();
                Some(NumberLiteral(token.range, token.text).into())
            }
            TokenKind::StringLiteral => {
                self.advance();
                let value = token.string_value().to_string();
                Some(StringLiteral(token.range, value).into())
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(TokenKind::RightParen)?;
                Some(
                    ParenthesisExpression {
                        range: token.range.to(close.range),
                        inner: Box::new(inner),
                    }
                    .into(),
                )
            }
            _ => {
                self.report_unexpected("an expression");
                None
            }
        }
    }

    // ==============================================================================
    // Token handling
    // ==============================================================================

    fn current(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&self.eof)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.index + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfFile)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.current().is_keyword(kw)
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::EndOfLine | TokenKind::EndOfFile
        )
    }

    /// returns the current token and moves on. Never moves past the end of the file
    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::EndOfFile {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            self.report_unexpected(kind.describe());
            None
        }
    }

    /// reports the current token as unexpected, or the end of the line if it was reached
    fn report_unexpected(&mut self, expected: &str) {
        if self.at_line_end() {
            let range = match self.index.checked_sub(1).and_then(|i| self.tokens.get(i)) {
                Some(previous) => previous.range,
                None => self.current().range,
            };
            self.diagnostics
                .report(DiagnosticCode::UnexpectedEndOfLine, range, [expected]);
        } else {
            let token = self.current().clone();
            self.diagnostics.report(
                DiagnosticCode::UnexpectedTokenFound,
                token.range,
                [token.text],
            );
        }
    }

    /// Finishes the line of a statement. If the statement was parsed, anything left on the
    /// line is reported. If not, the error was already reported and the line is skipped.
    fn end_line<T>(&mut self, parsed: Option<T>) -> Option<T> {
        if parsed.is_some() && !self.at_line_end() {
            let token = self.current().clone();
            self.diagnostics.report(
                DiagnosticCode::UnexpectedTokenFound,
                token.range,
                [token.text],
            );
        }
        self.skip_line();
        parsed
    }

    /// skips everything up to and including the next end of line
    fn skip_line(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
        if self.at(TokenKind::EndOfLine) {
            self.advance();
        }
    }
}

fn identifier(token: &Token) -> Identifier {
    Identifier {
        range: token.range,
        name: token.text.clone(),
    }
}

/// names of the top level subs, the first spelling of each name wins
fn collect_sub_module_names(statements: &[Statement]) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    for statement in statements {
        if let Statement::SubModuleStatement(sub) = statement {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&sub.name.name)) {
                names.push(sub.name.name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse(text: &str) -> (SyntaxTree, DiagnosticBag) {
        let mut bag = DiagnosticBag::new();
        let tokens = scan(text, &mut bag);
        let tree = Parser::parse(&tokens, &mut bag);
        (tree, bag)
    }

    fn codes(text: &str) -> Vec<DiagnosticCode> {
        parse(text).1.contents().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_precedence() {
        let (tree, bag) = parse("x = 1 + 2 * 3 = 7 And -a[1] < 2");
        assert!(bag.is_empty());
        let Statement::AssignmentStatement(assignment) = &tree.statements[0] else {
            panic!("expected an assignment");
        };
        let Expression::BinaryExpression(and) = &assignment.value else {
            panic!("expected a binary expression");
        };
        assert_eq!(and.operator, BinaryOperator::And);
        let Expression::BinaryExpression(eq) = and.left.as_ref() else {
            panic!("expected a binary expression");
        };
        assert_eq!(eq.operator, BinaryOperator::Equal);
        let Expression::BinaryExpression(add) = eq.left.as_ref() else {
            panic!("expected a binary expression");
        };
        assert_eq!(add.operator, BinaryOperator::Add);
        assert!(matches!(
            add.right.as_ref(),
            Expression::BinaryExpression(BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            })
        ));
        let Expression::BinaryExpression(lt) = and.right.as_ref() else {
            panic!("expected a binary expression");
        };
        assert!(matches!(
            lt.left.as_ref(),
            Expression::NegationExpression(_)
        ));
    }

    #[test]
    fn test_blocks() {
        let text = "
Sub Foo
  If a = 1 Then
    b = 2
  ElseIf a = 2 Then
    b = 3
  Else
    b = 4
  EndIf
EndSub
For i = 1 To 10 Step 2
  While i < 5
    i = i + 1
  EndWhile
EndFor
";
        let (tree, bag) = parse(text);
        assert!(bag.is_empty(), "{:?}", bag.contents());
        assert_eq!(tree.statements.len(), 2);
        assert_eq!(tree.sub_module_names, vec!["Foo".to_string()]);
        let Statement::SubModuleStatement(sub) = &tree.statements[0] else {
            panic!("expected a sub");
        };
        let Statement::IfStatement(if_statement) = &sub.body[0] else {
            panic!("expected an if");
        };
        assert_eq!(if_statement.branches.len(), 2);
        assert!(if_statement.else_body.is_some());
        assert_eq!(if_statement.range, TextRange::new((2, 2), (2, 14)));
    }

    #[test]
    fn test_missing_terminator_is_reported_at_opening_keyword() {
        let (_, bag) = parse("While x\n  If y Then\n    z = 1\nEndWhile");
        assert_eq!(
            bag.contents(),
            &[Diagnostic::new(
                DiagnosticCode::MissingBlockTerminator,
                TextRange::new((1, 2), (1, 3)),
                ["If", "EndIf"]
            )]
        );
    }

    #[test]
    fn test_missing_terminator_at_end_of_file() {
        assert_eq!(
            codes("Sub A\nx = 1"),
            vec![DiagnosticCode::MissingBlockTerminator]
        );
    }

    #[test]
    fn test_stray_terminator() {
        assert_eq!(
            codes("x = 1\nEndIf\ny = 2"),
            vec![DiagnosticCode::UnexpectedStatement]
        );
    }

    #[test]
    fn test_sub_inside_sub() {
        let (tree, bag) = parse("Sub A\nSub B\nEndSub\nEndSub");
        assert_eq!(
            bag.contents().iter().map(|d| d.code).collect::<Vec<_>>(),
            vec![DiagnosticCode::CannotDefineSubInsideSub]
        );
        assert_eq!(tree.sub_module_names, vec!["A".to_string()]);
    }

    #[test]
    fn test_recovery_continues_on_next_line() {
        let (tree, bag) = parse("x = (1 + \ny = 2 3\nz = 4");
        assert_eq!(
            bag.contents().iter().map(|d| d.code).collect::<Vec<_>>(),
            vec![
                DiagnosticCode::UnexpectedEndOfLine,
                DiagnosticCode::UnexpectedTokenFound
            ]
        );
        // `y = 2` is still kept, the trailing `3` is only reported
        assert_eq!(tree.statements.len(), 2);
    }

    #[test]
    fn test_unrecognized_statement() {
        let (_, bag) = parse("5 = x");
        assert_eq!(
            bag.contents(),
            &[Diagnostic::new(
                DiagnosticCode::UnrecognizedStatement,
                TextRange::new((0, 0), (0, 0)),
                ["5"]
            )]
        );
    }

    #[test]
    fn test_labels_and_goto() {
        let (tree, bag) = parse("start:\nGoto start ' loop forever");
        assert!(bag.is_empty());
        assert!(matches!(tree.statements[0], Statement::LabelStatement(_)));
        assert!(matches!(tree.statements[1], Statement::GotoStatement(_)));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "If x Then\ny = (\nEndIf\n$";
        let (first_tree, first_bag) = parse(text);
        let (second_tree, second_bag) = parse(text);
        assert_eq!(first_tree, second_tree);
        assert_eq!(first_bag.contents(), second_bag.contents());
    }
}
