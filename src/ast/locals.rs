//! Local variable tables.

use std::collections::BTreeMap;

/// A local variable slot with its source name and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// Slot index in the method frame
    pub slot: u16,
    /// Source name, either from debug info or synthesized
    pub name: String,
    /// Type descriptor
    pub descriptor: String,
}

impl LocalVariable {
    /// Creates a local variable.
    pub fn new(slot: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        LocalVariable {
            slot,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// The locals visible in one scope, keyed by slot.
///
/// Cloning a `Locals` table is a deep copy; a scope and its copy never share
/// bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    slots: BTreeMap<u16, LocalVariable>,
}

impl Locals {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares or replaces the binding for `local.slot`.
    pub fn declare(&mut self, local: LocalVariable) {
        self.slots.insert(local.slot, local);
    }

    /// Returns the binding of `slot`.
    #[must_use]
    pub fn get(&self, slot: u16) -> Option<&LocalVariable> {
        self.slots.get(&slot)
    }

    /// Returns `true` if `slot` is bound.
    #[must_use]
    pub fn contains(&self, slot: u16) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates bindings by ascending slot.
    pub fn iter(&self) -> impl Iterator<Item = &LocalVariable> {
        self.slots.values()
    }
}

impl FromIterator<LocalVariable> for Locals {
    fn from_iter<T: IntoIterator<Item = LocalVariable>>(iter: T) -> Self {
        let mut locals = Locals::new();
        for local in iter {
            locals.declare(local);
        }
        locals
    }
}
