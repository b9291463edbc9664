//! Function Definitions
//!
//! A function owns its blocks and the table of every local value they define.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use crate::blocks::BasicBlock;
use crate::types::{BlockId, IrType};
use crate::values::{Named, ValueTable};

/// Whether a function carries its own body or stands in for one defined elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    /// Body-defining function
    Linked,
    /// Declaration-only stub
    Model,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Linked => write!(f, "linked"),
            Linkage::Model => write!(f, "model"),
        }
    }
}

/// Function in IR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub ty: IrType,
    pub blocks: Vec<BasicBlock>,
    pub values: ValueTable,
}

impl Function {
    pub fn new(name: impl Into<String>, linkage: Linkage, ty: IrType) -> Self {
        let name = name.into();
        let values = ValueTable::new(format!("function '{name}'"));
        Self {
            name,
            linkage,
            ty,
            blocks: Vec::new(),
            values,
        }
    }

    /// Declaration-only function
    pub fn stub(name: impl Into<String>, ty: IrType) -> Self {
        Self::new(name, Linkage::Model, ty)
    }

    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn get_block(&self, id: &BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn get_block_mut(&mut self, id: &BlockId) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }

    /// Labels reachable from the entry block, in breadth-first order
    pub fn reachable_from_entry(&self) -> Vec<BlockId> {
        let Some(entry) = self.entry_block() else {
            return Vec::new();
        };
        let by_label: HashMap<&BlockId, &BasicBlock> =
            self.blocks.iter().map(|b| (&b.id, b)).collect();

        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([&entry.id]);
        seen.insert(&entry.id);
        while let Some(label) = queue.pop_front() {
            order.push(label.clone());
            let Some(block) = by_label.get(label) else {
                continue;
            };
            for successor in block.successors() {
                if seen.insert(successor) {
                    queue.push_back(successor);
                }
            }
        }
        order
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.linkage == other.linkage
            && self.ty == other.ty
            && self.blocks == other.blocks
    }
}

impl Named for Function {
    fn name(&self) -> &str {
        &self.name
    }
}
