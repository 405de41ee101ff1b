//! Type descriptor helpers.
//!
//! Types are passed around as encoded descriptor strings throughout the engine:
//!
//! | Descriptor | Type |
//! |---|---|
//! | `B` `C` `D` `F` `I` `J` `S` `Z` | byte, char, double, float, int, long, short, boolean |
//! | `V` | void (method return only) |
//! | `L<internal/name>;` | object type, e.g. `Ljava/lang/String;` |
//! | `[<desc>` | array of `<desc>`, e.g. `[I` |
//!
//! Method descriptors have the form `(<params>)<ret>`, e.g. `(ILjava/lang/String;)V`.
//! Consumers of the recovered tree depend on exact conformance to this grammar, so
//! the helpers here never normalize or rewrite a descriptor beyond what they are
//! asked to do.

use crate::{Error, Result};

/// Descriptor of `int`.
pub const INT: &str = "I";
/// Descriptor of `long`.
pub const LONG: &str = "J";
/// Descriptor of `float`.
pub const FLOAT: &str = "F";
/// Descriptor of `double`.
pub const DOUBLE: &str = "D";
/// Descriptor of `boolean`.
pub const BOOLEAN: &str = "Z";
/// Descriptor of `void`.
pub const VOID: &str = "V";
/// Descriptor of `java.lang.String`.
pub const STRING: &str = "Ljava/lang/String;";
/// Descriptor of `java.lang.Class`.
pub const CLASS: &str = "Ljava/lang/Class;";
/// Descriptor of `java.lang.Object`, also used for the `null` literal.
pub const OBJECT: &str = "Ljava/lang/Object;";

/// Returns the descriptor of an array whose elements have descriptor `element`.
///
/// # Examples
///
/// ```rust
/// use classcope::utils::descriptor::array_of;
///
/// assert_eq!(array_of("I"), "[I");
/// assert_eq!(array_of("[Ljava/lang/String;"), "[[Ljava/lang/String;");
/// ```
#[must_use]
pub fn array_of(element: &str) -> String {
    format!("[{element}")
}

/// Returns the element descriptor of an array descriptor, or `None` if `desc` is
/// not an array.
#[must_use]
pub fn element_of(desc: &str) -> Option<&str> {
    desc.strip_prefix('[')
}

/// Returns the descriptor of the object type with the given internal name.
#[must_use]
pub fn object(internal_name: &str) -> String {
    format!("L{internal_name};")
}

/// Returns the descriptor named by a class operand (`new`, `checkcast`,
/// `instanceof`, `anewarray`), which is an internal name or, for arrays, already
/// a descriptor.
///
/// ```rust
/// use classcope::utils::descriptor::class_ref;
///
/// assert_eq!(class_ref("java/util/List"), "Ljava/util/List;");
/// assert_eq!(class_ref("[I"), "[I");
/// ```
#[must_use]
pub fn class_ref(operand: &str) -> String {
    if is_array(operand) {
        operand.to_string()
    } else {
        object(operand)
    }
}

/// Returns `true` for array descriptors.
#[must_use]
pub fn is_array(desc: &str) -> bool {
    desc.starts_with('[')
}

/// Returns `true` for object and array descriptors.
#[must_use]
pub fn is_reference(desc: &str) -> bool {
    desc.starts_with('L') || desc.starts_with('[')
}

/// Returns `true` for `long` and `double`, which occupy two stack slots.
#[must_use]
pub fn is_wide(desc: &str) -> bool {
    desc == LONG || desc == DOUBLE
}

/// Splits the first complete field descriptor off the front of `input`.
fn split_first(input: &str) -> Result<(&str, &str)> {
    let bytes = input.as_bytes();
    let mut end = 0;
    while bytes.get(end) == Some(&b'[') {
        end += 1;
    }
    match bytes.get(end) {
        Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => Ok(input.split_at(end + 1)),
        Some(b'L') => match input[end..].find(';') {
            Some(semi) if semi > 1 => Ok(input.split_at(end + semi + 1)),
            _ => Err(Error::UnrecognizedInput(format!(
                "unterminated object descriptor '{input}'"
            ))),
        },
        Some(other) => Err(Error::UnrecognizedInput(format!(
            "invalid descriptor character '{}' in '{input}'",
            *other as char
        ))),
        None => Err(Error::UnrecognizedInput(format!(
            "truncated descriptor '{input}'"
        ))),
    }
}

/// Checks that `desc` is exactly one well-formed field descriptor.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedInput`] for malformed or trailing input.
pub fn validate(desc: &str) -> Result<()> {
    let (_, rest) = split_first(desc)?;
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::UnrecognizedInput(format!(
            "trailing characters in descriptor '{desc}'"
        )))
    }
}

/// Renders a descriptor as a source-level type name.
///
/// Object types use their dotted binary name and arrays append `[]`.
///
/// ```rust
/// use classcope::utils::descriptor::source_name;
///
/// assert_eq!(source_name("I"), "int");
/// assert_eq!(source_name("[[Ljava/lang/String;"), "java.lang.String[][]");
/// ```
#[must_use]
pub fn source_name(desc: &str) -> String {
    if let Some(element) = element_of(desc) {
        return format!("{}[]", source_name(element));
    }
    match desc {
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "D" => "double".to_string(),
        "F" => "float".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "S" => "short".to_string(),
        "Z" => "boolean".to_string(),
        "V" => "void".to_string(),
        _ => desc
            .strip_prefix('L')
            .and_then(|d| d.strip_suffix(';'))
            .unwrap_or(desc)
            .replace('/', "."),
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Parameter descriptors in declaration order
    pub params: Vec<String>,
    /// Return descriptor, `V` for void
    pub ret: String,
}

impl MethodDescriptor {
    /// Parses a method descriptor such as `(I[JLjava/lang/String;)Z`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedInput`] when `desc` does not follow the
    /// `(<params>)<ret>` grammar.
    pub fn parse(desc: &str) -> Result<Self> {
        let inner = desc.strip_prefix('(').ok_or_else(|| {
            Error::UnrecognizedInput(format!("method descriptor '{desc}' must start with '('"))
        })?;
        let close = inner.find(')').ok_or_else(|| {
            Error::UnrecognizedInput(format!("method descriptor '{desc}' has no ')'"))
        })?;

        let mut params = Vec::new();
        let mut rest = &inner[..close];
        while !rest.is_empty() {
            let (param, tail) = split_first(rest)?;
            params.push(param.to_string());
            rest = tail;
        }

        let ret = &inner[close + 1..];
        if ret != VOID {
            validate(ret)?;
        }

        Ok(MethodDescriptor {
            params,
            ret: ret.to_string(),
        })
    }

    /// Returns `true` if the method returns nothing.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.ret == VOID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_roundtrip() {
        assert_eq!(array_of(INT), "[I");
        assert_eq!(element_of("[I"), Some("I"));
        assert_eq!(element_of("I"), None);
        assert!(is_array("[[J"));
        assert!(is_reference(STRING));
        assert!(!is_reference(INT));
        assert!(is_wide(LONG) && is_wide(DOUBLE) && !is_wide(FLOAT));
    }

    #[test]
    fn test_validate() {
        assert!(validate("I").is_ok());
        assert!(validate("[Ljava/lang/Object;").is_ok());
        assert!(validate("Ljava/lang/Object").is_err());
        assert!(validate("L;").is_err());
        assert!(validate("II").is_err());
        assert!(validate("Q").is_err());
        assert!(validate("").is_err());
    }

    #[test]
    fn test_method_descriptor() {
        let desc = MethodDescriptor::parse("(I[JLjava/lang/String;)Z").unwrap();
        assert_eq!(desc.params, vec!["I", "[J", "Ljava/lang/String;"]);
        assert_eq!(desc.ret, "Z");
        assert!(!desc.returns_void());

        let void = MethodDescriptor::parse("()V").unwrap();
        assert!(void.params.is_empty());
        assert!(void.returns_void());

        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(X)V").is_err());
    }

    #[test]
    fn test_source_name() {
        assert_eq!(source_name("Z"), "boolean");
        assert_eq!(source_name(STRING), "java.lang.String");
        assert_eq!(source_name("[I"), "int[]");
        assert_eq!(object("java/util/List"), "Ljava/util/List;");
    }
}
