//! Module Definition
//!
//! A module is everything translated from one source unit: its functions in
//! declaration order and its global value table.

use serde::{Deserialize, Serialize};
use swirl_common::{SwirlError, SwirlResult};
use crate::function::Function;
use crate::values::{GlobalValueTable, NamedTable};
use log::debug;

/// IR Module - represents a complete translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub globals: GlobalValueTable,
    pub functions: NamedTable<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: GlobalValueTable::new(),
            functions: NamedTable::new(),
        }
    }

    /// Add a function, resolving a name clash by linkage precedence: a body
    /// replaces a stub in the stub's position, a stub never replaces anything,
    /// and two bodies are an error.
    pub fn add_function(&mut self, function: Function) -> SwirlResult<()> {
        let Some(existing) = self.functions.get(&function.name) else {
            let _ = self.functions.insert(function);
            return Ok(());
        };
        match (existing.has_body(), function.has_body()) {
            (true, true) => Err(SwirlError::duplicate(
                &function.name,
                &format!("module '{}'", self.name),
            )),
            (false, true) => {
                debug!("Body of '{}' replaces its declaration", function.name);
                self.functions.replace(function);
                Ok(())
            }
            (_, false) => {
                debug!("Ignoring redundant declaration of '{}'", function.name);
                Ok(())
            }
        }
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.get_mut(name)
    }

    pub fn functions(&self) -> std::slice::Iter<'_, Function> {
        self.functions.iter()
    }

    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(Function::instruction_count).sum()
    }
}
