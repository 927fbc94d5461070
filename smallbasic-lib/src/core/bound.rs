//! The bound tree: the syntax tree with every name resolved.
//!
//! Variables, sub-routines and library members are referred to by index from here on.
//! Every node still carries the range of the syntax it was bound from. A program that
//! failed to bind still produces a complete tree, the broken parts become `Invalid` nodes,
//! which never reach the instruction generator because the diagnostics block it.

use proc_macros::SyntaxNode;
use serde::{Deserialize, Serialize};

use crate::core::{BinaryOperator, EventId, MethodId, PropertyId, TextRange, Value};

/// Index into the variable table. All variables are global
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub usize);

/// Index into the sub-routine table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubModuleId(pub usize);

/// The body a statement belongs to. Labels are scoped per module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleId {
    Main,
    Sub(SubModuleId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundProgram {
    pub main: Vec<BoundStatement>,
    pub sub_modules: Vec<BoundSubModule>,
    /// VariableId -> name, in the order the variables were first assigned
    pub variables: Vec<String>,
    /// every variable and sub-routine name defined in the program
    pub names: Vec<String>,
    pub analysis: RuntimeAnalysis,
}

/// What the program needs from its host, derived from the libraries it references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeAnalysis {
    pub uses_text_window: bool,
    pub uses_graphics_window: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SyntaxNode)]
pub struct BoundSubModule {
    pub range: TextRange,
    pub name: String,
    pub body: Vec<BoundStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SyntaxNode)]
pub struct BoundConditionalBlock {
    pub range: TextRange,
    pub condition: BoundExpression,
    pub body: Vec<BoundStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SyntaxNode)]
pub enum BoundStatement {
    If {
        range: TextRange,
        branches: Vec<BoundConditionalBlock>,
        else_body: Option<Vec<BoundStatement>>,
    },
    While {
        range: TextRange,
        condition: BoundExpression,
        body: Vec<BoundStatement>,
    },
    For {
        range: TextRange,
        variable: VariableId,
        from: BoundExpression,
        to: BoundExpression,
        step: Option<BoundExpression>,
        body: Vec<BoundStatement>,
    },
    Goto {
        range: TextRange,
        label: String,
    },
    Label {
        range: TextRange,
        label: String,
    },
    VariableAssignment {
        range: TextRange,
        variable: VariableId,
        value: BoundExpression,
    },
    /// `a[i][j] = value`, indices from the outermost array inwards
    ArrayAssignment {
        range: TextRange,
        array: VariableId,
        indices: Vec<BoundExpression>,
        value: BoundExpression,
    },
    PropertyAssignment {
        range: TextRange,
        property: PropertyId,
        value: BoundExpression,
    },
    EventAssignment {
        range: TextRange,
        event: EventId,
        sub_module: SubModuleId,
    },
    SubModuleInvocation {
        range: TextRange,
        sub_module: SubModuleId,
    },
    MethodInvocation {
        range: TextRange,
        method: MethodId,
        arguments: Vec<BoundExpression>,
        /// whether the method leaves a value that has to be discarded
        returns_value: bool,
    },
    Invalid {
        range: TextRange,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SyntaxNode)]
pub enum BoundExpression {
    Literal {
        range: TextRange,
        value: Value,
    },
    Variable {
        range: TextRange,
        variable: VariableId,
    },
    ArrayAccess {
        range: TextRange,
        array: VariableId,
        indices: Vec<BoundExpression>,
    },
    Binary {
        range: TextRange,
        operator: BinaryOperator,
        left: Box<BoundExpression>,
        right: Box<BoundExpression>,
    },
    Negation {
        range: TextRange,
        operand: Box<BoundExpression>,
    },
    PropertyRead {
        range: TextRange,
        property: PropertyId,
    },
    MethodCall {
        range: TextRange,
        method: MethodId,
        arguments: Vec<BoundExpression>,
    },
    Invalid {
        range: TextRange,
    },
}

impl BoundExpression {
    pub fn invalid(range: TextRange) -> Self {
        Self::Invalid { range }
    }
}
