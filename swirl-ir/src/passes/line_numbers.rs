//! Line-number assignment
//!
//! Each instruction is numbered with the line the canonical printer writes it
//! on. Numbers therefore increase in program order across the whole module,
//! point into the printed IR, and do not change when the pass is re-run.

use crate::function::Function;
use crate::merge::ModuleGroup;
use crate::module::Module;
use crate::printer::Printer;
use log::debug;

fn apply_lines<'a>(functions: impl Iterator<Item = &'a mut Function>, lines: &[u32]) -> usize {
    let mut lines = lines.iter();
    let mut numbered = 0;
    for function in functions {
        for block in &mut function.blocks {
            for node in &mut block.instructions {
                node.metadata.line = lines.next().copied();
                numbered += 1;
            }
        }
    }
    numbered
}

/// Number every instruction of the module; returns how many were numbered
pub fn assign_line_numbers(module: &mut Module) -> usize {
    let printed = Printer::default().render_module(module);
    let numbered = apply_lines(module.functions.iter_mut(), &printed.lines);
    debug!("Assigned {} line numbers in module '{}'", numbered, module.name);
    numbered
}

/// Renumber a merged program against its own printed form
pub fn assign_group_line_numbers(group: &mut ModuleGroup) -> usize {
    let printed = Printer::default().render_group(group);
    let numbered = apply_lines(group.functions.iter_mut(), &printed.lines);
    debug!("Assigned {} line numbers in module group '{}'", numbered, group.name);
    numbered
}
