//! Whole-program assembly
//!
//! Folds independently translated modules into one `ModuleGroup`. Functions
//! unify by name with body-over-stub precedence; globals unify the way a
//! single module's table does, first declaration wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use swirl_common::{ModuleFailure, SwirlError};
use crate::function::Function;
use crate::instructions::Instruction;
use crate::module::Module;
use crate::types::IrType;
use crate::values::{GlobalValueTable, NamedTable, Value};
use log::{debug, warn};

/// Read-only access used by whole-program analyses
pub trait ProgramView {
    fn lookup_function(&self, name: &str) -> Option<&Function>;
    fn all_functions(&self) -> &[Function];
    fn lookup_global(&self, name: &str) -> Option<&Value>;
}

/// The merged program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleGroup {
    pub name: String,
    pub globals: GlobalValueTable,
    pub functions: NamedTable<Function>,
    /// Names of the merged modules, in merge order
    pub modules: Vec<String>,
}

impl ModuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: GlobalValueTable::new(),
            functions: NamedTable::new(),
            modules: Vec::new(),
        }
    }

    pub fn functions(&self) -> std::slice::Iter<'_, Function> {
        self.functions.iter()
    }
}

impl ProgramView for ModuleGroup {
    fn lookup_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    fn all_functions(&self) -> &[Function] {
        self.functions.as_slice()
    }

    fn lookup_global(&self, name: &str) -> Option<&Value> {
        self.globals.lookup(name).map(|global| &global.value)
    }
}

/// Merged program plus the modules (or conflicts) that did not make it in
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub group: ModuleGroup,
    pub failures: Vec<ModuleFailure>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Single-threaded reduction over finished modules
#[derive(Debug)]
pub struct ModuleMerger {
    group: ModuleGroup,
    failures: Vec<ModuleFailure>,
}

impl ModuleMerger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            group: ModuleGroup::new(name),
            failures: Vec::new(),
        }
    }

    /// Fold one module into the group
    pub fn add(&mut self, module: Module) {
        debug!("Merging module '{}'", module.name);
        for global in module.globals.iter() {
            self.group.globals.declare(
                &global.value.name,
                global.value.ty.clone(),
                global.initializer.clone(),
            );
        }

        for mut function in module.functions.into_vec() {
            rebind_globals(&mut function, &self.group.globals);
            if let Err(error) = self.add_function(function) {
                self.failures.push(ModuleFailure::new(&module.name, error));
            }
        }
        self.group.modules.push(module.name);
    }

    /// Record a module that never reached the merge
    pub fn add_failure(&mut self, failure: ModuleFailure) {
        self.failures.push(failure);
    }

    fn add_function(&mut self, function: Function) -> Result<(), SwirlError> {
        let Some(existing) = self.group.functions.get(&function.name) else {
            let _ = self.group.functions.insert(function);
            return Ok(());
        };
        match (existing.has_body(), function.has_body()) {
            (false, true) => {
                debug!("Definition of '{}' replaces its stub", function.name);
                self.group.functions.replace(function);
                Ok(())
            }
            (true, true) if *existing == function => {
                debug!("Dropping identical copy of '{}'", function.name);
                Ok(())
            }
            (true, true) => Err(SwirlError::merge(
                &function.name,
                "conflicting definitions; keeping the first",
            )),
            (_, false) => Ok(()),
        }
    }

    /// Synthesize stubs for references no module defines, then hand over the group
    pub fn finish(mut self) -> MergeReport {
        let mut missing: Vec<(String, IrType)> = Vec::new();
        let mut seen = HashSet::new();
        for function in self.group.functions.iter() {
            for block in &function.blocks {
                for instr in block.iter() {
                    if let Instruction::FunctionRef { result, function } = instr {
                        if !self.group.functions.contains(function) && seen.insert(function.clone()) {
                            missing.push((function.clone(), result.ty.clone()));
                        }
                    }
                }
            }
        }
        for (name, ty) in missing {
            warn!("No module declares '{}'; adding a model stub", name);
            let _ = self.group.functions.insert(Function::stub(name, ty));
        }

        MergeReport {
            group: self.group,
            failures: self.failures,
        }
    }
}

/// Point every global access at the group's identity for that global
fn rebind_globals(function: &mut Function, globals: &GlobalValueTable) {
    for block in &mut function.blocks {
        for node in &mut block.instructions {
            if let Instruction::GlobalAddr { global, .. } = &mut node.instruction {
                if let Some(canonical) = globals.lookup(&global.name) {
                    *global = canonical.value.clone();
                }
            }
        }
    }
}

/// Merge per-unit translation results, forwarding failures
pub fn merge_results(
    name: &str,
    results: impl IntoIterator<Item = Result<Module, ModuleFailure>>,
) -> MergeReport {
    let mut merger = ModuleMerger::new(name);
    for result in results {
        match result {
            Ok(module) => merger.add(module),
            Err(failure) => merger.add_failure(failure),
        }
    }
    merger.finish()
}
