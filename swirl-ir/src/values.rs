//! IR Value Representations and Value Tables
//!
//! A `Value` is identified by its `(scope, name)` pair and is referenced by
//! instructions, never re-created. Tables keep values in insertion order:
//! for globals the first declaration decides identity and initializer.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use swirl_common::{SwirlError, SwirlResult};
use crate::types::{quote, quote_string, IrType};
use log::debug;

/// Where a value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Scope {
    Local,
    Global,
}

/// IR Value - an operand or result of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Value {
    pub name: String,
    pub ty: IrType,
    pub scope: Scope,
}

impl Value {
    pub fn local(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: Scope::Local,
        }
    }

    pub fn global(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: Scope::Global,
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope == Scope::Global
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Local => write!(f, "%{}", self.name),
            Scope::Global => write!(f, "@{}", quote(&self.name)),
        }
    }
}

/// Constant payload of literal instructions and global initializers.
/// Booleans are integers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Int(i128),
    Float(FloatValue),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Str(value) => write!(f, "{}", quote_string(value)),
        }
    }
}

/// Shortest text that parses back to the same `f64` (`1.0`, `1e-7`, `inf`, `NaN`)
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// Floating-point constant compared by bit pattern, so that identical
/// constants (NaN included) are equal and `0.0` differs from `-0.0`.
/// Every NaN is equal to every other: the text dialect has a single `NaN`.
#[derive(Debug, Clone, Copy)]
pub struct FloatValue(pub f64);

impl PartialEq for FloatValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits() || (self.0.is_nan() && other.0.is_nan())
    }
}

impl From<f64> for FloatValue {
    fn from(value: f64) -> Self {
        FloatValue(value)
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_float(self.0))
    }
}

/// Finite values serialise as numbers, the rest as their text form
impl Serialize for FloatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_finite() {
            serializer.serialize_f64(self.0)
        } else {
            serializer.serialize_str(&format_float(self.0))
        }
    }
}

impl<'de> Deserialize<'de> for FloatValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(FloatValue(value)),
            Repr::Text(text) => text
                .parse::<f64>()
                .map(FloatValue)
                .map_err(|_| de::Error::custom(format!("invalid float '{text}'"))),
        }
    }
}

/// Anything stored in a `NamedTable`
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Value {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Insertion-ordered, name-keyed table.
///
/// Iteration order is insertion order; `replace` keeps the replaced item's
/// position and `remove` preserves the relative order of the rest.
#[derive(Debug, Clone)]
pub struct NamedTable<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Named> NamedTable<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a new item, handing it back if the name is taken
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.index.contains_key(item.name()) {
            return Err(item);
        }
        self.index.insert(item.name().to_string(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Replace the item with the same name in place, or append it
    pub fn replace(&mut self, item: T) -> Option<T> {
        match self.index.get(item.name()) {
            Some(&slot) => Some(std::mem::replace(&mut self.items[slot], item)),
            None => {
                self.index.insert(item.name().to_string(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let slot = self.index.remove(name)?;
        let item = self.items.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(item)
    }

    /// Keep only the items for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|item| keep(item));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(slot, item)| (item.name().to_string(), slot))
            .collect();
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&slot| &self.items[slot])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.index.get(name) {
            Some(&slot) => Some(&mut self.items[slot]),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Named> Default for NamedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for NamedTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Serialize> Serialize for NamedTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

impl<'de, T: Named + Deserialize<'de>> Deserialize<'de> for NamedTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut table = NamedTable::new();
        for item in items {
            if let Err(item) = table.insert(item) {
                return Err(de::Error::custom(format!("duplicate name '{}'", item.name())));
            }
        }
        Ok(table)
    }
}

/// Local values of one function
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValueTable {
    scope: String,
    values: NamedTable<Value>,
}

impl ValueTable {
    /// `scope` names the owner in diagnostics, e.g. "function 'main'"
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            values: NamedTable::new(),
        }
    }

    pub fn add(&mut self, value: Value) -> SwirlResult<()> {
        self.values
            .insert(value)
            .map_err(|value| SwirlError::duplicate(&format!("%{}", value.name), &self.scope))
    }

    pub fn get(&self, name: &str) -> SwirlResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| SwirlError::unresolved(&format!("%{name}"), &self.scope))
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Value) -> bool) {
        self.values.retain(keep);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// Module-level storage declaration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlobalVariable {
    pub value: Value,
    pub initializer: Option<Literal>,
}

impl Named for GlobalVariable {
    fn name(&self) -> &str {
        &self.value.name
    }
}

/// Global values of one module (or of the whole program after merging)
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlobalValueTable {
    globals: NamedTable<GlobalVariable>,
}

impl GlobalValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a global. A re-declaration returns the first identity and
    /// keeps the first initializer; the new type and initializer are ignored.
    pub fn declare(&mut self, name: &str, ty: IrType, initializer: Option<Literal>) -> Value {
        if let Some(existing) = self.globals.get(name) {
            if existing.value.ty != ty || existing.initializer != initializer {
                debug!("Ignoring re-declaration of global '{}'", name);
            }
            return existing.value.clone();
        }
        let value = Value::global(name, ty);
        let global = GlobalVariable {
            value: value.clone(),
            initializer,
        };
        // Cannot collide: presence was checked above.
        let _ = self.globals.insert(global);
        value
    }

    pub fn get_or_create(&mut self, name: &str, ty: IrType) -> Value {
        self.declare(name, ty, None)
    }

    /// Strict insertion used where re-declaration is malformed input
    pub fn add(&mut self, global: GlobalVariable) -> SwirlResult<()> {
        self.globals
            .insert(global)
            .map_err(|global| SwirlError::duplicate(&global.value.name, "global scope"))
    }

    pub fn get(&self, name: &str) -> SwirlResult<&Value> {
        self.globals
            .get(name)
            .map(|global| &global.value)
            .ok_or_else(|| SwirlError::unresolved(name, "global scope"))
    }

    pub fn lookup(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.get(name)
    }

    pub fn initializer(&self, name: &str) -> Option<&Literal> {
        self.globals.get(name).and_then(|global| global.initializer.as_ref())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GlobalVariable> {
        self.globals.iter()
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}
