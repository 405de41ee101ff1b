//! Batch driver over a set of classes.
//!
//! [`Decompiler`] owns one [`StructuringContext`] built from every class of the
//! run and structures each method independently. With
//! [`DecompilerConfig::parallel`] set, methods are processed on the rayon
//! thread pool; the context is only ever read, and each task owns its graph
//! and statement tree.
//!
//! A method that fails does not stop the run: the error is recorded as a
//! [`MethodFailure`] and the method is left out of its class.
//!
//! # Examples
//!
//! ```rust,ignore
//! use classcope::{Decompiler, DecompilerConfig};
//!
//! let decompiler = Decompiler::new(DecompilerConfig::default(), &classes);
//! let report = decompiler.decompile(&classes);
//! for class in &report.classes {
//!     for method in &class.methods {
//!         println!("{}{}\n{}", method.name, method.descriptor, method.body);
//!     }
//! }
//! ```

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    ast::StatementBlock,
    bytecode::{ClassEntry, MethodBody},
    structuring::{structure_method, StructuringContext, TypeDatabase},
    DecompilerConfig, Error, Result,
};

/// One recovered method.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompiledMethod {
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// The locked method scope
    pub body: StatementBlock,
    /// `true` if any part of the body is rendered with labels and gotos
    pub fallback: bool,
}

/// The recovered methods of one class, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompiledClass {
    /// Internal class name
    pub name: String,
    /// Methods that were recovered
    pub methods: Vec<DecompiledMethod>,
}

/// A method that could not be recovered.
#[derive(Debug)]
pub struct MethodFailure {
    /// Internal name of the declaring class
    pub class: String,
    /// Method name
    pub method: String,
    /// Method descriptor
    pub descriptor: String,
    /// Why it failed
    pub error: Error,
}

/// The result of a [`Decompiler::decompile`] run.
#[derive(Debug, Default)]
pub struct DecompileReport {
    /// Classes in input order
    pub classes: Vec<DecompiledClass>,
    /// Failures sorted by class, method and descriptor
    pub failures: Vec<MethodFailure>,
    /// Number of methods recovered as structured code
    pub structured: usize,
    /// Number of methods with at least one region rendered with labels and gotos
    pub fallback: usize,
}

impl DecompileReport {
    /// Returns `true` if every method was recovered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Looks up a recovered method.
    #[must_use]
    pub fn method(&self, class: &str, name: &str, descriptor: &str) -> Option<&DecompiledMethod> {
        self.classes
            .iter()
            .find(|c| c.name == class)?
            .methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

/// Structures every method of a set of classes.
#[derive(Debug, Clone, Default)]
pub struct Decompiler {
    context: StructuringContext,
}

impl Decompiler {
    /// Creates a decompiler whose type database covers `classes`.
    #[must_use]
    pub fn new(config: DecompilerConfig, classes: &[ClassEntry]) -> Self {
        Self::with_context(StructuringContext::new(
            TypeDatabase::from_classes(classes),
            config,
        ))
    }

    /// Creates a decompiler around an existing context.
    #[must_use]
    pub fn with_context(context: StructuringContext) -> Self {
        Decompiler { context }
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &StructuringContext {
        &self.context
    }

    /// Structures a single method of `class`.
    ///
    /// # Errors
    ///
    /// Returns the error of [`structure_method`].
    pub fn decompile_method(&self, class: &ClassEntry, method: &MethodBody) -> Result<DecompiledMethod> {
        debug!("decompiling {}.{}{}", class.name, method.name, method.descriptor);
        let structured = structure_method(&self.context, method)?;
        Ok(DecompiledMethod {
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            body: structured.body,
            fallback: structured.fallback,
        })
    }

    /// Structures every method of every class.
    ///
    /// Failures are isolated per method and collected in the report.
    #[must_use]
    pub fn decompile(&self, classes: &[ClassEntry]) -> DecompileReport {
        let failures = boxcar::Vec::new();

        let run_class = |class: &ClassEntry| -> DecompiledClass {
            let attempt = |method: &MethodBody| match self.decompile_method(class, method) {
                Ok(recovered) => Some(recovered),
                Err(error) => {
                    warn!(
                        "{}.{}{} failed: {error}",
                        class.name, method.name, method.descriptor
                    );
                    failures.push(MethodFailure {
                        class: class.name.clone(),
                        method: method.name.clone(),
                        descriptor: method.descriptor.clone(),
                        error,
                    });
                    None
                }
            };
            let methods: Vec<DecompiledMethod> = if self.context.config().parallel {
                class.methods.par_iter().filter_map(attempt).collect()
            } else {
                class.methods.iter().filter_map(attempt).collect()
            };
            DecompiledClass {
                name: class.name.clone(),
                methods,
            }
        };

        let classes: Vec<DecompiledClass> = if self.context.config().parallel {
            classes.par_iter().map(run_class).collect()
        } else {
            classes.iter().map(run_class).collect()
        };

        let mut failures: Vec<MethodFailure> = failures.into_iter().collect();
        failures.sort_by(|a, b| {
            (&a.class, &a.method, &a.descriptor).cmp(&(&b.class, &b.method, &b.descriptor))
        });

        let (fallback, structured) = classes
            .iter()
            .flat_map(|class| &class.methods)
            .fold((0, 0), |(fallback, structured), method| {
                if method.fallback {
                    (fallback + 1, structured)
                } else {
                    (fallback, structured + 1)
                }
            });
        info!(
            "decompiled {} classes: {structured} structured, {fallback} fallback, {} failed",
            classes.len(),
            failures.len()
        );

        DecompileReport {
            classes,
            failures,
            structured,
            fallback,
        }
    }
}
