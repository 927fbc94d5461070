//! The compiled artifact. It's immutable, the engine only ever reads from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::*;
use crate::utils;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// SubModuleId -> name and entry address
    pub sub_modules: Vec<SubModuleEntry>,
    pub labels: Vec<LabelEntry>,
    /// VariableId -> name
    pub variables: Vec<String>,
    /// the libraries the program was compiled against
    pub manifest: LibraryManifest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModuleEntry {
    pub name: String,
    pub address: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub module: ModuleId,
    /// lowercased
    pub name: String,
    pub address: usize,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not decode the program: {0}")]
    Decode(#[from] postcard::Error),

    #[error("The program was compiled by version {found:?}, but this is version {expected:?}")]
    VersionMismatch { found: [u16; 3], expected: [u16; 3] },
}

pub type Result<T> = std::result::Result<T, LoadError>;

impl Program {
    pub fn module_name(&self, module: ModuleId) -> &str {
        match module {
            ModuleId::Main => "Program",
            ModuleId::Sub(id) => &self.sub_modules[id.0].name,
        }
    }

    pub fn sub_module_address(&self, id: SubModuleId) -> usize {
        self.sub_modules[id.0].address
    }

    pub fn find_sub_module(&self, name: &str) -> Option<SubModuleId> {
        self.sub_modules
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .map(SubModuleId)
    }

    pub fn label_address(&self, module: ModuleId, name: &str) -> Option<usize> {
        let name = name.to_ascii_lowercase();
        self.labels
            .iter()
            .find(|l| l.module == module && l.name == name)
            .map(|l| l.address)
    }

    pub fn variable_name(&self, id: VariableId) -> &str {
        &self.variables[id.0]
    }

    /// Serializes the program, prefixed with the version of the crate that compiled it
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = postcard::to_allocvec(&utils::get_version())?;
        bytes.extend(postcard::to_allocvec(self)?);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (found, rest): ([u16; 3], _) = postcard::take_from_bytes(bytes)?;
        let expected = utils::get_version();
        if found != expected {
            return Err(LoadError::VersionMismatch { found, expected });
        }
        Ok(postcard::from_bytes(rest)?)
    }
}
