//! contains all important data structures

pub mod text;
pub use text::*;

pub mod diagnostics;
pub use diagnostics::*;

pub mod tokens;
pub use tokens::*;

pub(crate) mod syntax_macros;

pub mod syntax;
pub use syntax::*;

pub mod libraries;
pub use libraries::*;

pub mod data;
pub use data::*;

pub mod bound;
pub use bound::*;

pub mod opcode;
pub use opcode::*;

pub mod instruction_builder;
pub use instruction_builder::*;

pub mod program;
pub use program::{LabelEntry, LoadError, Program, SubModuleEntry};

pub mod operators;
