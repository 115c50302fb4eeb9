//! Error types for the `finbridge` runtime and bridge.
//!
//! Every failure the bridge can detect on the Rust side is an [`Error`].
//! Errors that cross into host code are converted into host exceptions by
//! [`crate::bridge::exception`]; native error objects thrown by the runtime
//! travel separately as [`crate::runtime::Thrown`].

use std::fmt;

/// Errors that can occur in the `finbridge` runtime and bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A type name was never registered.
    UnknownType {
        /// The name that failed to resolve.
        name: String,
    },

    /// A handle's reference was released more than once.
    DoubleRelease {
        /// Class of the object the handle pointed at.
        class: String,
    },

    /// A handle no longer owns a reference and cannot reach its object.
    ReleasedHandle,

    /// Host supplied a value of the wrong kind for a parameter.
    ArgumentType {
        /// Parameter name.
        param: String,
        /// Kind the parameter accepts.
        expected: String,
        /// Kind that was supplied.
        found: String,
    },

    /// Host supplied `None` for a parameter that is not nullable.
    MissingValue {
        /// Parameter name.
        param: String,
    },

    /// Wrong number of arguments for a call.
    ArgumentCount {
        /// Number of parameters the callee declares.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// A keyword argument does not name any parameter.
    UnknownArgument {
        /// The unmatched keyword.
        name: String,
    },

    /// A parameter received both a positional and a keyword value.
    DuplicateArgument {
        /// Parameter name.
        name: String,
    },

    /// An integer does not fit the parameter's native width.
    Overflow {
        /// Parameter name.
        param: String,
        /// The rejected value.
        value: i64,
        /// Native type name, e.g. `i32`.
        width: &'static str,
    },

    /// Generic native-side failure.
    NativeRuntime {
        /// The native error message.
        message: String,
    },

    /// Class name already exists in registry.
    ClassAlreadyExists {
        /// The duplicate name.
        name: String,
    },

    /// Registry no longer accepts registrations.
    RegistryFrozen,

    /// Class name already appears in its own ancestry.
    InheritanceCycle {
        /// The offending class name.
        name: String,
    },

    /// Invalid signature encoding string.
    InvalidEncoding {
        /// The rejected encoding.
        encoding: String,
    },

    /// No bound entry with this name is reachable from the class.
    MethodNotFound {
        /// Class the lookup started from.
        class: String,
        /// Host-side method name.
        method: String,
    },

    /// A method cannot be expressed across the boundary.
    Unbindable {
        /// Native method name.
        method: String,
    },

    /// The class is not an error class.
    NotAnErrorClass {
        /// The class name.
        name: String,
    },

    /// A binding for this class was already registered.
    BindingAlreadyRegistered {
        /// The class name.
        class: String,
    },

    /// A binding excludes a method the class does not declare.
    UnknownMethod {
        /// The class name.
        class: String,
        /// The excluded native method name.
        method: String,
    },

    /// Two binding entries target the same host name.
    BindingConflict {
        /// The class name.
        class: String,
        /// The contested host entry name.
        name: String,
    },

    /// A binding names a class the registry does not know.
    UnknownClassBinding {
        /// The class name.
        class: String,
    },

    /// Reference count overflow detected.
    RefCountOverflow,

    /// A configuration value could not be parsed.
    InvalidConfig {
        /// The configuration key.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownType { name } => write!(f, "Unknown type: {name}"),
            Error::DoubleRelease { class } => {
                write!(f, "Handle to {class} object released twice")
            }
            Error::ReleasedHandle => {
                write!(f, "Handle no longer owns a native reference")
            }
            Error::ArgumentType {
                param,
                expected,
                found,
            } => write!(
                f,
                "Invalid argument type for '{param}': expected {expected}, got {found}"
            ),
            Error::MissingValue { param } => {
                write!(f, "Required argument '{param}' cannot be None")
            }
            Error::ArgumentCount { expected, got } => {
                write!(f, "Expected {expected} arguments, got {got}")
            }
            Error::UnknownArgument { name } => {
                write!(f, "Unexpected keyword argument '{name}'")
            }
            Error::DuplicateArgument { name } => {
                write!(f, "Multiple values for argument '{name}'")
            }
            Error::Overflow {
                param,
                value,
                width,
            } => write!(f, "Value {value} for '{param}' does not fit in {width}"),
            Error::NativeRuntime { message } => f.write_str(message),
            Error::ClassAlreadyExists { name } => {
                write!(f, "Class {name} already exists in registry")
            }
            Error::RegistryFrozen => {
                write!(f, "Class registry is frozen")
            }
            Error::InheritanceCycle { name } => {
                write!(f, "Inheritance cycle detected at {name}")
            }
            Error::InvalidEncoding { encoding } => {
                write!(f, "Invalid signature encoding: {encoding:?}")
            }
            Error::MethodNotFound { class, method } => {
                write!(f, "{class} has no method '{method}'")
            }
            Error::Unbindable { method } => {
                write!(f, "Method {method} cannot be bound")
            }
            Error::NotAnErrorClass { name } => {
                write!(f, "{name} is not an error class")
            }
            Error::BindingAlreadyRegistered { class } => {
                write!(f, "Binding for {class} already registered")
            }
            Error::UnknownMethod { class, method } => {
                write!(f, "Can't exclude {method}: {class} declares no such method")
            }
            Error::BindingConflict { class, name } => {
                write!(f, "Conflicting binding entries for {class}.{name}")
            }
            Error::UnknownClassBinding { class } => {
                write!(f, "Binding names unregistered class {class}")
            }
            Error::RefCountOverflow => {
                write!(f, "Reference count overflow detected")
            }
            Error::InvalidConfig { key, value } => {
                write!(f, "Invalid value {value:?} for {key}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `finbridge` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::UnknownType {
                name: "Clownfish::Nope".into()
            }
            .to_string(),
            "Unknown type: Clownfish::Nope"
        );
        assert_eq!(
            Error::Overflow {
                param: "code_point".into(),
                value: 1 << 40,
                width: "i32"
            }
            .to_string(),
            "Value 1099511627776 for 'code_point' does not fit in i32"
        );
        assert_eq!(
            Error::MissingValue { param: "key".into() }.to_string(),
            "Required argument 'key' cannot be None"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::RegistryFrozen, Error::RegistryFrozen);
        assert_ne!(
            Error::ArgumentCount { expected: 1, got: 2 },
            Error::ArgumentCount { expected: 1, got: 3 }
        );
    }
}
