//! Read-only state shared by every structuring task.

use rustc_hash::FxHashMap;

use crate::{
    bytecode::ClassEntry,
    utils::descriptor::{self, OBJECT},
    DecompilerConfig,
};

/// What the engine knows about one class of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSymbols {
    /// Internal name
    pub name: String,
    /// Internal name of the superclass
    pub super_name: Option<String>,
    /// `(name, descriptor)` of every declared method
    pub methods: Vec<(String, String)>,
}

/// Symbol table built once from the classes of a run and never mutated while
/// structuring.
#[derive(Debug, Clone, Default)]
pub struct TypeDatabase {
    classes: FxHashMap<String, ClassSymbols>,
}

impl TypeDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the database from the classes of a run.
    #[must_use]
    pub fn from_classes(classes: &[ClassEntry]) -> Self {
        let mut database = Self::new();
        for class in classes {
            database.insert(ClassSymbols {
                name: class.name.clone(),
                super_name: class.super_name.clone(),
                methods: class
                    .methods
                    .iter()
                    .map(|m| (m.name.clone(), m.descriptor.clone()))
                    .collect(),
            });
        }
        database
    }

    /// Registers a class, replacing an earlier entry with the same name.
    pub fn insert(&mut self, symbols: ClassSymbols) {
        self.classes.insert(symbols.name.clone(), symbols);
    }

    /// Looks up a class by internal name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClassSymbols> {
        self.classes.get(name)
    }

    /// Returns the number of known classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns `true` if a value of type `from` can be used where `to` is
    /// expected, as far as the known class hierarchy can tell.
    ///
    /// Equal descriptors, any reference to `Object`, and object types whose
    /// superclass chain through known classes reaches `to` are assignable.
    /// Interfaces and unknown classes are not resolved.
    #[must_use]
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        if to == OBJECT {
            return descriptor::is_reference(from);
        }
        let (Some(mut current), Some(target)) = (internal_name(from), internal_name(to)) else {
            return false;
        };

        // The chain is bounded by the class count to survive cyclic input.
        for _ in 0..=self.classes.len() {
            let Some(symbols) = self.classes.get(current) else {
                return false;
            };
            match symbols.super_name.as_deref() {
                Some(parent) if parent == target => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

fn internal_name(desc: &str) -> Option<&str> {
    desc.strip_prefix('L').and_then(|d| d.strip_suffix(';'))
}

/// The read-only context passed by reference to every structuring task.
#[derive(Debug, Clone, Default)]
pub struct StructuringContext {
    types: TypeDatabase,
    config: DecompilerConfig,
}

impl StructuringContext {
    /// Creates a context from a type database and a configuration.
    #[must_use]
    pub fn new(types: TypeDatabase, config: DecompilerConfig) -> Self {
        StructuringContext { types, config }
    }

    /// Returns the type database.
    #[must_use]
    pub fn types(&self) -> &TypeDatabase {
        &self.types
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DecompilerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, super_name: &str) -> ClassEntry {
        ClassEntry {
            name: name.to_string(),
            super_name: Some(super_name.to_string()),
            methods: Vec::new(),
        }
    }

    #[test]
    fn test_assignable_through_hierarchy() {
        let db = TypeDatabase::from_classes(&[
            class("a/Animal", "java/lang/Object"),
            class("a/Dog", "a/Animal"),
            class("a/Puppy", "a/Dog"),
        ]);

        assert_eq!(db.len(), 3);
        assert!(db.is_assignable("La/Puppy;", "La/Animal;"));
        assert!(db.is_assignable("La/Dog;", "La/Dog;"));
        assert!(!db.is_assignable("La/Animal;", "La/Dog;"));
        assert!(db.is_assignable("[I", OBJECT));
        assert!(!db.is_assignable("I", OBJECT));
        assert!(!db.is_assignable("I", "J"));
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let db = TypeDatabase::from_classes(&[class("a/A", "a/B"), class("a/B", "a/A")]);
        assert!(!db.is_assignable("La/A;", "La/C;"));
    }
}
