//! SWIRL front end - Translation Pipeline
//!
//! This crate turns source units into IR modules and assembles them into a
//! whole program:
//! - `sil`: syntax pass over the low-level (SIL-like) dialect
//! - `lower`: raw instruction to IR mapping
//! - `context`: two-phase lowering of one unit (`ProgramContext`)
//!
//! Units in the simplified dialect are parsed directly by `swirl_ir`.

pub mod context;
pub mod lower;
pub mod sil;

pub use context::ProgramContext;
pub use sil::{parse_sil, RawModule};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use swirl_common::{ModuleFailure, SwirlResult};
use swirl_ir::passes::{assign_group_line_numbers, assign_line_numbers, prune_module};
use swirl_ir::{merge_results, parse_module, MergeReport, Module, PrinterOptions};

/// Input dialect of a source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// The compiler's low-level textual dump (`.sil`)
    Sil,
    /// The simplified IR text (`.swirl`)
    Swirl,
}

impl Dialect {
    /// Pick the dialect from a file extension; anything but `.swirl` is low-level
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("swirl") => Dialect::Swirl,
            _ => Dialect::Sil,
        }
    }
}

/// One file to translate
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    /// Module name
    pub name: String,
    /// File name used in locations
    pub filename: String,
    pub text: String,
    pub dialect: Dialect,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, text: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            text: text.into(),
            dialect,
        }
    }

    /// A unit named after the file stem, dialect chosen by extension
    pub fn from_file(path: &Path, text: String) -> Self {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("module")
            .to_string();
        Self {
            name,
            filename: path.display().to_string(),
            text,
            dialect: Dialect::from_path(path),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Remove dead pure instructions after lowering
    pub prune: bool,
    /// Number instructions by their line in the printed module
    pub line_numbers: bool,
    /// Translate units on the rayon thread pool
    pub parallel: bool,
    pub printer: PrinterOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            prune: true,
            line_numbers: true,
            parallel: true,
            printer: PrinterOptions::default(),
        }
    }
}

/// High-level front end interface
pub struct Frontend;

impl Frontend {
    /// Run the syntax pass only
    pub fn parse_sil(text: &str, module_name: &str, filename: &str) -> SwirlResult<RawModule> {
        parse_sil(text, module_name, filename)
    }

    /// Translate a low-level dump into a module
    pub fn translate_sil(
        text: &str,
        module_name: &str,
        filename: &str,
        options: &PipelineOptions,
    ) -> SwirlResult<Module> {
        let raw = parse_sil(text, module_name, filename)?;
        let mut context = ProgramContext::new(raw)?;
        context.lower()?;
        if options.prune {
            let removed = context.prune_ir()?;
            debug!("Pruned {} instructions from '{}'", removed, module_name);
        }
        if options.line_numbers {
            context.generate_line_numbers();
        }
        Ok(context.into_module())
    }

    /// Translate one unit in either dialect
    pub fn translate_unit(unit: &SourceUnit, options: &PipelineOptions) -> Result<Module, ModuleFailure> {
        let translated = match unit.dialect {
            Dialect::Sil => Self::translate_sil(&unit.text, &unit.name, &unit.filename, options),
            Dialect::Swirl => parse_module(&unit.text, &unit.filename).and_then(|mut module| {
                if options.prune {
                    prune_module(&mut module)?;
                }
                if options.line_numbers {
                    assign_line_numbers(&mut module);
                }
                Ok(module)
            }),
        };
        translated.map_err(|error| ModuleFailure::new(&unit.name, error))
    }

    /// Translate every unit independently; results keep the input order
    pub fn translate_units(
        units: &[SourceUnit],
        options: &PipelineOptions,
    ) -> Vec<Result<Module, ModuleFailure>> {
        if options.parallel && units.len() > 1 {
            units
                .par_iter()
                .map(|unit| Self::translate_unit(unit, options))
                .collect()
        } else {
            units
                .iter()
                .map(|unit| Self::translate_unit(unit, options))
                .collect()
        }
    }

    /// Translate all units, then merge them into one program. Line numbers
    /// are reassigned against the printed program.
    pub fn build_program(name: &str, units: &[SourceUnit], options: &PipelineOptions) -> MergeReport {
        let results = Self::translate_units(units, options);
        let mut report = merge_results(name, results);
        if options.line_numbers {
            assign_group_line_numbers(&mut report.group);
        }
        info!(
            "Built program '{}' from {} units: {} functions, {} failures",
            name,
            units.len(),
            report.group.functions.len(),
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
mod tests;
