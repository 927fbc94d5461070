use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{TextRange, Value};

/// A read-only copy of the engine's state, for debuggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerSnapshot {
    /// the innermost frame comes last
    pub execution_stack: Vec<FrameSnapshot>,
    /// variable name -> value, in the order the variables were first assigned
    pub memory: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// `Program` for the main module, otherwise the name of the sub-routine
    pub module: String,
    pub ip: usize,
    /// source of the instruction the frame will execute next
    pub range: TextRange,
}

impl DebuggerSnapshot {
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.memory
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}
