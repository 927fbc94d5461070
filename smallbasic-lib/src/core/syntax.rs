//! Contains the syntax tree types. Every node owns the range of source text it was parsed
//! from, which is what all later diagnostics point at.

use proc_macros::SyntaxNode;
use serde::{Deserialize, Serialize};

use crate::core::syntax_macros::mk_enum_node;
use crate::core::TextRange;

/// The result of parsing a whole file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub statements: Vec<Statement>,
    /// names of all sub-routines declared anywhere in the file, in declaration order,
    /// so calls can refer to subs that are declared further down
    pub sub_module_names: Vec<String>,
}

/// a name as it appears in the source
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct Identifier {
    pub range: TextRange,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

// ==============================================================================
// Statements
// ==============================================================================
mk_enum_node!(
    Statement,
    SubModuleStatement,
    IfStatement,
    WhileStatement,
    ForStatement,
    GotoStatement,
    LabelStatement,
    AssignmentStatement,
    ExpressionStatement,
);

/// `Sub name` ... `EndSub`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct SubModuleStatement {
    pub range: TextRange,
    pub name: Identifier,
    pub body: Vec<Statement>,
}

/// `If` ... `ElseIf` ... `Else` ... `EndIf`. The first branch is the `If` itself
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct IfStatement {
    pub range: TextRange,
    pub branches: Vec<ConditionalBlock>,
    pub else_body: Option<Vec<Statement>>,
}

/// A condition and the statements guarded by it. The range is the one of the
/// `If c Then` / `ElseIf c Then` line
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ConditionalBlock {
    pub range: TextRange,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct WhileStatement {
    pub range: TextRange,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

/// `For v = from To to [Step step]` ... `EndFor`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ForStatement {
    pub range: TextRange,
    pub variable: Identifier,
    pub from: Expression,
    pub to: Expression,
    pub step: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct GotoStatement {
    pub range: TextRange,
    pub label: Identifier,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct LabelStatement {
    pub range: TextRange,
    pub label: Identifier,
}

/// `target = value`, what the target is allowed to be is decided by the binder
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct AssignmentStatement {
    pub range: TextRange,
    pub target: Expression,
    pub value: Expression,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ExpressionStatement {
    pub range: TextRange,
    pub expression: Expression,
}

// ==============================================================================
// Expressions
// ==============================================================================
mk_enum_node!(
    Expression,
    IdentifierExpression,
    NumberLiteral,
    StringLiteral,
    BinaryExpression,
    NegationExpression,
    ParenthesisExpression,
    ObjectAccessExpression,
    ArrayAccessExpression,
    CallExpression,
);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct IdentifierExpression(pub TextRange, pub String);

/// the literal text, it's only converted to a number by the binder
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct NumberLiteral(pub TextRange, pub String);

/// the contents, without the quotes
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct StringLiteral(pub TextRange, pub String);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct BinaryExpression {
    pub range: TextRange,
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// unary minus
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct NegationExpression {
    pub range: TextRange,
    pub operand: Box<Expression>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ParenthesisExpression {
    pub range: TextRange,
    pub inner: Box<Expression>,
}

/// `base.member`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ObjectAccessExpression {
    pub range: TextRange,
    pub base: Box<Expression>,
    pub member: Identifier,
}

/// `base[index]`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct ArrayAccessExpression {
    pub range: TextRange,
    pub base: Box<Expression>,
    pub index: Box<Expression>,
}

/// `base(arguments)`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
pub struct CallExpression {
    pub range: TextRange,
    pub base: Box<Expression>,
    pub arguments: Vec<Expression>,
}

impl Expression {
    /// strips any number of parentheses
    pub fn unparenthesized(&self) -> &Expression {
        match self {
            Expression::ParenthesisExpression(p) => p.inner.unparenthesized(),
            other => other,
        }
    }
}
