//! The boundary between the engine and the libraries a host provides.
//!
//! The compiler only knows libraries by their [`LibraryManifest`](crate::core::LibraryManifest).
//! At run time each of them needs an implementation of [`Library`], which receives members
//! by the index they have in the manifest. A member that can't answer right away (waiting
//! for user input, for example) returns [`Completion::Pending`], which suspends the engine
//! until the host hands the result back with [`Engine::resume`](crate::vm::Engine::resume).

use serde::{Deserialize, Serialize};

use crate::core::Value;

/// The result of a library call
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// the call is done. Methods that return a value and property getters must provide one,
    /// if they don't, the program sees the empty string
    Ready(Option<Value>),
    /// the result will be provided later through [`Engine::resume`](crate::vm::Engine::resume)
    Pending,
}

impl Completion {
    pub fn done() -> Self {
        Completion::Ready(None)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Completion::Ready(Some(value.into()))
    }
}

/// Implemented by the host for each library in the manifest
pub trait Library {
    /// must match the name of a library in the manifest, ignoring case
    fn name(&self) -> &str;

    /// `index` is the position of the method in the library's signature, the arguments are
    /// in declaration order
    fn call_method(&mut self, index: usize, args: Vec<Value>) -> Completion;

    fn get_property(&mut self, index: usize) -> Completion;

    fn set_property(&mut self, index: usize, value: Value) -> Completion;
}

/// The token the engine hands out when it suspends. Only the most recent one is valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub(crate) id: u64,
    /// `Library.Member` that is being waited on
    pub member: String,
}

/// The library implementations a program is run with
#[derive(Default)]
pub struct Libraries {
    pub(crate) implementations: Vec<Box<dyn Library>>,
}

impl Libraries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, library: impl Library + 'static) -> Self {
        self.add(library);
        self
    }

    pub fn add(&mut self, library: impl Library + 'static) {
        self.implementations.push(Box::new(library));
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.implementations
            .iter()
            .position(|l| l.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for Libraries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.implementations.iter().map(|l| l.name()))
            .finish()
    }
}
