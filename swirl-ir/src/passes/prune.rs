//! Dead instruction pruning
//!
//! Fixed-point removal of pure instructions whose result has no remaining
//! use. Side-effecting instructions and terminators always stay, and block
//! arguments are never touched, so control flow is unchanged.

use std::collections::{HashMap, HashSet};
use swirl_common::{SwirlError, SwirlResult};
use crate::function::Function;
use crate::module::Module;
use crate::values::Scope;
use crate::verify::verify_function;
use log::{debug, trace};

/// Number of reads of every local in the function
fn use_counts(function: &Function) -> HashMap<String, usize> {
    let mut uses = HashMap::new();
    for block in &function.blocks {
        for instr in block.iter() {
            for operand in instr.operands() {
                if operand.scope == Scope::Local {
                    *uses.entry(operand.name.clone()).or_insert(0) += 1;
                }
            }
        }
    }
    uses
}

/// Prune one function; returns the number of removed instructions
pub fn prune_function(function: &mut Function) -> SwirlResult<usize> {
    if !function.has_body() {
        return Ok(0);
    }
    let reachable_before = function.reachable_from_entry();
    let mut removed_total = 0;

    loop {
        let uses = use_counts(function);
        let mut dead = Vec::new();
        for block in &mut function.blocks {
            block.instructions.retain(|node| {
                let instr = &node.instruction;
                let is_dead = instr.is_removable()
                    && instr
                        .result()
                        .is_some_and(|result| !uses.contains_key(&result.name));
                if is_dead {
                    if let Some(result) = instr.result() {
                        trace!("Pruning dead '{}' defining %{}", instr.opcode(), result.name);
                        dead.push(result.name.clone());
                    }
                }
                !is_dead
            });
        }
        if dead.is_empty() {
            break;
        }
        removed_total += dead.len();
        for name in &dead {
            function.values.remove(name);
        }
    }

    verify_function(function)?;
    let reachable_after: HashSet<_> = function.reachable_from_entry().into_iter().collect();
    if let Some(lost) = reachable_before.iter().find(|b| !reachable_after.contains(*b)) {
        return Err(SwirlError::invariant(
            &function.name,
            format!("pruning disconnected block {lost}"),
        ));
    }

    if removed_total > 0 {
        debug!("Pruned {} instructions from '{}'", removed_total, function.name);
    }
    Ok(removed_total)
}

/// Prune every function of the module
pub fn prune_module(module: &mut Module) -> SwirlResult<usize> {
    let mut removed = 0;
    for function in module.functions.iter_mut() {
        removed += prune_function(function)?;
    }
    debug!("Pruned {} instructions from module '{}'", removed, module.name);
    Ok(removed)
}
