use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// All errors are scoped to the method being structured. The [`Decompiler`](crate::Decompiler)
/// never aborts a run because of one of them; it records a [`MethodFailure`](crate::MethodFailure)
/// and moves on to the next method.
///
/// # Error Categories
///
/// ## Structuring
/// - [`Error::Unstructurable`] - A region of the graph matches no known construct. The method
///   is rendered with labels and jumps instead.
/// - [`Error::Malformed`] - Stack simulation found inconsistent input (stack underflow,
///   mismatched stack heights at a merge).
///
/// ## Internal invariants
/// - [`Error::InvalidContainerMutation`] - A [`StatementBlock`](crate::ast::StatementBlock)
///   was mutated after it was locked, popped while empty, or locked twice.
///
/// ## Input
/// - [`Error::UnrecognizedInput`] - The method body references missing blocks, carries a
///   malformed descriptor or an instruction shape the engine has no decoder for.
/// - [`Error::GraphError`] - Control flow graph construction failed.
///
/// # Examples
///
/// ```rust,ignore
/// use classcope::{structuring::structure_method, Error};
///
/// match structure_method(&context, &method) {
///     Ok(structured) => println!("{}", structured.body),
///     Err(Error::Unstructurable(reason)) => eprintln!("needs fallback: {reason}"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed input: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A control flow region could not be expressed with structured statements.
    ///
    /// Raised for irreducible loops, blocks that would have to be emitted twice,
    /// jumps that would need a labeled break, and similar shapes.
    #[error("Unstructurable region - {0}")]
    Unstructurable(String),

    /// The input is damaged or inconsistent.
    ///
    /// The error includes the source location where it was detected to ease
    /// debugging of the engine itself.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A statement container was used against its Open/Locked state machine.
    #[error("Invalid container mutation - {0}")]
    InvalidContainerMutation(String),

    /// The method body contains something the engine cannot decode.
    #[error("Unrecognized input - {0}")]
    UnrecognizedInput(String),

    /// Graph construction or analysis failed.
    #[error("{0}")]
    GraphError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_captures_location() {
        let error = malformed_error!("stack underflow at {}", 3);
        match error {
            Error::Malformed { message, file, line } => {
                assert_eq!(message, "stack underflow at 3");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Unstructurable("labeled break".into()).to_string(),
            "Unstructurable region - labeled break"
        );
        assert_eq!(
            Error::InvalidContainerMutation("locked".into()).to_string(),
            "Invalid container mutation - locked"
        );
    }
}
