//! Method and class input records.

use bitflags::bitflags;

use crate::{
    ast::{LocalVariable, Locals},
    bytecode::BasicBlock,
    utils::descriptor::{self, MethodDescriptor},
    Error, Result,
};

bitflags! {
    /// Method access flags as stored in the class file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccess: u16 {
        /// `public`
        const PUBLIC = 0x0001;
        /// `private`
        const PRIVATE = 0x0002;
        /// `protected`
        const PROTECTED = 0x0004;
        /// `static`
        const STATIC = 0x0008;
        /// `final`
        const FINAL = 0x0010;
        /// `synchronized`
        const SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with variable arity
        const VARARGS = 0x0080;
        /// `native`
        const NATIVE = 0x0100;
        /// `abstract`
        const ABSTRACT = 0x0400;
        /// `strictfp`
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
    }
}

/// One decoded method: signature, debug locals and the basic block graph.
///
/// Block 0 is the entry. Every block names its successors by index through its
/// [`Terminator`](crate::bytecode::Terminator).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Declaring class internal name
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Access flags
    pub access: MethodAccess,
    /// Size of the local variable frame in slots
    pub max_locals: u16,
    /// Named locals from debug information, possibly empty
    pub local_variables: Vec<LocalVariable>,
    /// Basic blocks, entry first
    pub blocks: Vec<BasicBlock>,
}

impl MethodBody {
    /// Returns `true` if the method has no code to structure.
    #[must_use]
    pub fn is_bodyless(&self) -> bool {
        self.access
            .intersects(MethodAccess::ABSTRACT | MethodAccess::NATIVE)
            || self.blocks.is_empty()
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccess::STATIC)
    }

    /// Checks that the descriptor parses and that every branch target names an
    /// existing block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedInput`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        MethodDescriptor::parse(&self.descriptor)?;
        for (index, block) in self.blocks.iter().enumerate() {
            if let Some(target) = block
                .terminator
                .successors()
                .into_iter()
                .find(|&target| target >= self.blocks.len())
            {
                return Err(Error::UnrecognizedInput(format!(
                    "block {index} of {}{} jumps to missing block {target}",
                    self.name, self.descriptor
                )));
            }
        }
        Ok(())
    }

    /// Builds the locals table of the method scope.
    ///
    /// Debug information wins; otherwise `this` and the parameters are named
    /// from the descriptor (`arg0`, `arg1` ...), with `long` and `double`
    /// parameters occupying two slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedInput`] if the descriptor does not parse.
    pub fn parameter_locals(&self) -> Result<Locals> {
        let desc = MethodDescriptor::parse(&self.descriptor)?;
        let mut locals = Locals::new();
        let mut slot: u16 = 0;

        if !self.is_static() {
            locals.declare(LocalVariable::new(0, "this", descriptor::object(&self.owner)));
            slot = 1;
        }
        for (index, param) in desc.params.iter().enumerate() {
            locals.declare(LocalVariable::new(slot, format!("arg{index}"), param.clone()));
            slot += if descriptor::is_wide(param) { 2 } else { 1 };
        }
        for local in &self.local_variables {
            locals.declare(local.clone());
        }
        Ok(locals)
    }
}

/// A class and the methods to structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Internal name, e.g. `com/example/Foo`
    pub name: String,
    /// Internal name of the superclass; `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Methods in declaration order
    pub methods: Vec<MethodBody>,
}

impl ClassEntry {
    /// Creates a class extending `java/lang/Object` with no methods.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassEntry {
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            methods: Vec::new(),
        }
    }

    /// Replaces the superclass.
    #[must_use]
    pub fn with_super(mut self, super_name: Option<&str>) -> Self {
        self.super_name = super_name.map(str::to_string);
        self
    }

    /// Appends a method.
    #[must_use]
    pub fn with_method(mut self, method: MethodBody) -> Self {
        self.methods.push(method);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Terminator;

    fn method(access: MethodAccess, descriptor: &str) -> MethodBody {
        MethodBody {
            owner: "com/example/Foo".into(),
            name: "run".into(),
            descriptor: descriptor.into(),
            access,
            max_locals: 8,
            local_variables: Vec::new(),
            blocks: vec![BasicBlock::new(Vec::new(), Terminator::Return)],
        }
    }

    #[test]
    fn test_parameter_locals_instance() {
        let body = method(MethodAccess::PUBLIC, "(JI)V");
        let locals = body.parameter_locals().unwrap();
        assert_eq!(locals.get(0).unwrap().descriptor, "Lcom/example/Foo;");
        assert_eq!(locals.get(1).unwrap().name, "arg0");
        assert_eq!(locals.get(3).unwrap().name, "arg1");
        assert!(!locals.contains(2));
    }

    #[test]
    fn test_debug_names_override() {
        let mut body = method(MethodAccess::STATIC, "(I)V");
        body.local_variables.push(LocalVariable::new(0, "count", "I"));
        let locals = body.parameter_locals().unwrap();
        assert_eq!(locals.get(0).unwrap().name, "count");
    }

    #[test]
    fn test_validate_missing_block() {
        let mut body = method(MethodAccess::STATIC, "()V");
        assert!(body.validate().is_ok());
        body.blocks[0].terminator = Terminator::Goto(3);
        assert!(matches!(body.validate(), Err(Error::UnrecognizedInput(_))));
    }

    #[test]
    fn test_bodyless() {
        let mut body = method(MethodAccess::ABSTRACT | MethodAccess::PUBLIC, "()V");
        assert!(body.is_bodyless());
        body.access = MethodAccess::PUBLIC;
        assert!(!body.is_bodyless());
    }
}
