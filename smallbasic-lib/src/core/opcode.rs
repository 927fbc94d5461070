use serde::{Deserialize, Serialize};

use crate::core::{
    BinaryOperator, EventId, MethodId, PropertyId, SubModuleId, TextRange, Value, VariableId,
};

/// The instruction set of the engine. `A` is the jump target: while instructions are being
/// generated it is a label, after linking it's an absolute instruction index.
///
/// All instructions operate on the temporaries of the current frame: operands are popped,
/// results are pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpCode<A = usize> {
    PushValue(Value),
    LoadVariable(VariableId),
    StoreVariable(VariableId),
    /// pops `indices` keys (outermost pushed first) and pushes the element
    LoadArrayElement {
        array: VariableId,
        indices: usize,
    },
    /// pops the value, then `indices` keys, creating nested arrays on the way
    StoreArrayElement {
        array: VariableId,
        indices: usize,
    },
    Binary(BinaryOperator),
    Negate,
    Pop,
    Jump(A),
    JumpIfTrue(A),
    JumpIfFalse(A),
    /// pops step, limit and the current value of the loop variable, jumps when the loop is done
    ForLoopGuard(A),
    InvokeSubModule(SubModuleId),
    /// pops the arguments, pushes the result if the method returns one
    InvokeMethod(MethodId),
    LoadProperty(PropertyId),
    StoreProperty(PropertyId),
    SetEventCallback {
        event: EventId,
        sub_module: SubModuleId,
    },
    Return,
}

impl<A> OpCode<A> {
    /// replaces the jump target, if there is one
    pub fn map_target<B>(self, f: impl FnOnce(A) -> B) -> OpCode<B> {
        use OpCode::*;
        match self {
            Jump(a) => Jump(f(a)),
            JumpIfTrue(a) => JumpIfTrue(f(a)),
            JumpIfFalse(a) => JumpIfFalse(f(a)),
            ForLoopGuard(a) => ForLoopGuard(f(a)),
            PushValue(v) => PushValue(v),
            LoadVariable(v) => LoadVariable(v),
            StoreVariable(v) => StoreVariable(v),
            LoadArrayElement { array, indices } => LoadArrayElement { array, indices },
            StoreArrayElement { array, indices } => StoreArrayElement { array, indices },
            Binary(op) => Binary(op),
            Negate => Negate,
            Pop => Pop,
            InvokeSubModule(s) => InvokeSubModule(s),
            InvokeMethod(m) => InvokeMethod(m),
            LoadProperty(p) => LoadProperty(p),
            StoreProperty(p) => StoreProperty(p),
            SetEventCallback { event, sub_module } => SetEventCallback { event, sub_module },
            Return => Return,
        }
    }
}

/// A linked instruction together with the range of the statement that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub code: OpCode,
    pub range: TextRange,
}
