//! Host exceptions and native error translation.
//!
//! Host exceptions form a class hierarchy rooted at [`EXCEPTION`]:
//!
//! ```text
//! Exception
//! ├── RuntimeError
//! │   └── DoubleReleaseError
//! ├── TypeError
//! ├── OverflowError
//! ├── AttributeError
//! └── LookupError
//!     └── UnknownTypeError
//! ```
//!
//! Host code can add subclasses at run time with [`ExceptionClass::subclass`].
//!
//! # Translation
//!
//! [`ExceptionMap::translate`] turns a thrown native error into a
//! [`HostException`]: it copies the message, releases the native reference
//! and picks an exception class. Mappings registered with
//! [`ExceptionMap::register_exception_mapping`] are keyed by native class;
//! the most specific mapping along the error's ancestry wins, and anything
//! unmapped becomes a `RuntimeError`.

use crate::error::{Error, Result};
use crate::runtime::registry::ClassRegistry;
use crate::runtime::{ClassDescriptor, Thrown, bootstrap, read, write};
use finbridge_log::trace;
use fxhash::FxHashMap;
use std::fmt;
use std::ptr;
use std::sync::{Arc, RwLock};

/// A class in the host exception hierarchy.
#[derive(Debug)]
pub struct ExceptionClass {
    name: &'static str,
    parent: Option<&'static ExceptionClass>,
}

/// Base of every host exception.
pub static EXCEPTION: ExceptionClass = ExceptionClass {
    name: "Exception",
    parent: None,
};

/// Generic translation target for native errors.
pub static RUNTIME_ERROR: ExceptionClass = ExceptionClass {
    name: "RuntimeError",
    parent: Some(&EXCEPTION),
};

/// Wrong kind of argument, wrong argument count or a missing value.
pub static TYPE_ERROR: ExceptionClass = ExceptionClass {
    name: "TypeError",
    parent: Some(&EXCEPTION),
};

/// Integer does not fit its native width.
pub static OVERFLOW_ERROR: ExceptionClass = ExceptionClass {
    name: "OverflowError",
    parent: Some(&EXCEPTION),
};

/// No such method on the object.
pub static ATTRIBUTE_ERROR: ExceptionClass = ExceptionClass {
    name: "AttributeError",
    parent: Some(&EXCEPTION),
};

pub static LOOKUP_ERROR: ExceptionClass = ExceptionClass {
    name: "LookupError",
    parent: Some(&EXCEPTION),
};

/// A type name was never registered.
pub static UNKNOWN_TYPE_ERROR: ExceptionClass = ExceptionClass {
    name: "UnknownTypeError",
    parent: Some(&LOOKUP_ERROR),
};

/// A handle was released twice under the strict policy.
pub static DOUBLE_RELEASE_ERROR: ExceptionClass = ExceptionClass {
    name: "DoubleReleaseError",
    parent: Some(&RUNTIME_ERROR),
};

impl ExceptionClass {
    /// Defines a new exception class under `parent`.
    ///
    /// Classes live for the rest of the process.
    #[must_use]
    pub fn subclass(name: &str, parent: &'static ExceptionClass) -> &'static ExceptionClass {
        Box::leak(Box::new(ExceptionClass {
            name: Box::leak(name.to_string().into_boxed_str()),
            parent: Some(parent),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'static ExceptionClass> {
        self.parent
    }

    /// Returns true if `self` is `other` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, other: &ExceptionClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if ptr::eq(class, other) {
                return true;
            }
            current = class.parent;
        }
        false
    }
}

/// An exception as the host sees it.
#[derive(Debug, Clone)]
pub struct HostException {
    class: &'static ExceptionClass,
    message: String,
    native_class: Option<String>,
    frames: Vec<String>,
}

impl HostException {
    #[must_use]
    pub fn new(class: &'static ExceptionClass, message: impl Into<String>) -> Self {
        HostException {
            class,
            message: message.into(),
            native_class: None,
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn class(&self) -> &'static ExceptionClass {
        self.class
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the native error class this exception was translated from.
    #[must_use]
    pub fn native_class(&self) -> Option<&str> {
        self.native_class.as_deref()
    }

    /// Call frames the exception unwound through, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Returns true if the exception would be caught by an `except class`.
    #[must_use]
    pub fn is_instance(&self, class: &ExceptionClass) -> bool {
        self.class.is_subclass_of(class)
    }

    /// Records a frame the exception is unwinding through.
    pub fn add_frame(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.add_frame(frame);
        self
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class.name, self.message)
    }
}

impl std::error::Error for HostException {}

impl From<Error> for HostException {
    fn from(err: Error) -> Self {
        let class = match &err {
            Error::ArgumentType { .. }
            | Error::MissingValue { .. }
            | Error::ArgumentCount { .. }
            | Error::UnknownArgument { .. }
            | Error::DuplicateArgument { .. } => &TYPE_ERROR,
            Error::Overflow { .. } => &OVERFLOW_ERROR,
            Error::UnknownType { .. } => &UNKNOWN_TYPE_ERROR,
            Error::DoubleRelease { .. } => &DOUBLE_RELEASE_ERROR,
            Error::MethodNotFound { .. } => &ATTRIBUTE_ERROR,
            _ => &RUNTIME_ERROR,
        };
        HostException::new(class, err.to_string())
    }
}

/// Result of a host-facing call.
pub type HostResult<T> = std::result::Result<T, HostException>;

/// Builds a host exception from a native error message.
pub type ExceptionCtor = Arc<dyn Fn(String) -> HostException + Send + Sync>;

/// Native error class to host exception constructor.
#[derive(Default)]
pub struct ExceptionMap {
    mappings: RwLock<FxHashMap<usize, ExceptionCtor>>,
}

fn class_key(class: &'static ClassDescriptor) -> usize {
    ptr::from_ref(class) as usize
}

impl ExceptionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes native errors of `native_type_name`, and of its subclasses
    /// without a closer mapping, to `ctor`.
    ///
    /// Registering the same class again replaces its mapping.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownType`] if the name does not resolve in `registry`
    /// - [`Error::NotAnErrorClass`] if the class does not descend from
    ///   `Clownfish::Err`
    pub fn register_exception_mapping<F>(
        &self,
        registry: &ClassRegistry,
        native_type_name: &str,
        ctor: F,
    ) -> Result<()>
    where
        F: Fn(String) -> HostException + Send + Sync + 'static,
    {
        let class = registry.fetch_singleton(native_type_name)?;
        if !class.is_subclass_of(bootstrap::core().err) {
            return Err(Error::NotAnErrorClass {
                name: class.name().to_string(),
            });
        }
        write(&self.mappings).insert(class_key(class), Arc::new(ctor));
        trace!("mapped native {} to a host exception", class.name());
        Ok(())
    }

    /// Converts a thrown native error into a host exception.
    ///
    /// The message is copied out first, then the native reference is
    /// released.
    pub fn translate(&self, thrown: Thrown) -> HostException {
        let class = thrown.object().class();
        let message = thrown.message();
        drop(thrown);

        let ctor = {
            let mappings = read(&self.mappings);
            class
                .ancestry()
                .find_map(|ancestor| mappings.get(&class_key(ancestor)).cloned())
        };

        let mut exception = match ctor {
            Some(ctor) => ctor(message),
            None => HostException::new(&RUNTIME_ERROR, message),
        };
        exception.native_class = Some(class.name().to_string());
        trace!("translated native {} into {}", class.name(), exception.class.name);
        exception
    }

    /// Translates `thrown` and returns it as an `Err`, ready for `?`.
    ///
    /// # Errors
    ///
    /// Always.
    pub fn raise_from<T>(&self, thrown: Thrown) -> HostResult<T> {
        Err(self.translate(thrown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registry;

    #[test]
    fn test_hierarchy() {
        assert!(DOUBLE_RELEASE_ERROR.is_subclass_of(&RUNTIME_ERROR));
        assert!(UNKNOWN_TYPE_ERROR.is_subclass_of(&EXCEPTION));
        assert!(!TYPE_ERROR.is_subclass_of(&RUNTIME_ERROR));

        let custom = ExceptionClass::subclass("MyError", &RUNTIME_ERROR);
        let exception = HostException::new(custom, "custom");
        assert!(exception.is_instance(&EXCEPTION));
        assert!(exception.is_instance(&RUNTIME_ERROR));
        assert!(!exception.is_instance(&TYPE_ERROR));
        assert_eq!(exception.to_string(), "MyError: custom");
    }

    #[test]
    fn test_unmapped_error_is_runtime_error() {
        let map = ExceptionMap::new();
        let thrown = Thrown::msg("oops");
        let exception = map.translate(thrown);
        assert!(ptr::eq(exception.class(), &RUNTIME_ERROR));
        assert_eq!(exception.message(), "oops");
        assert_eq!(exception.native_class(), Some("Clownfish::Err"));
    }

    #[test]
    fn test_error_conversion_classes() {
        let cases: [(Error, &ExceptionClass); 4] = [
            (Error::MissingValue { param: "key".into() }, &TYPE_ERROR),
            (
                Error::Overflow {
                    param: "x".into(),
                    value: 300,
                    width: "u8",
                },
                &OVERFLOW_ERROR,
            ),
            (Error::UnknownType { name: "X".into() }, &UNKNOWN_TYPE_ERROR),
            (Error::DoubleRelease { class: "X".into() }, &DOUBLE_RELEASE_ERROR),
        ];
        for (err, class) in cases {
            let exception = HostException::from(err);
            assert!(ptr::eq(exception.class(), class));
        }
    }

    #[test]
    fn test_mapping_rejects_non_errors() {
        let map = ExceptionMap::new();
        let err = map
            .register_exception_mapping(registry::global(), "Clownfish::Hash", |m| {
                HostException::new(&RUNTIME_ERROR, m)
            })
            .unwrap_err();
        assert_eq!(err, Error::NotAnErrorClass { name: "Clownfish::Hash".into() });

        assert!(
            map.register_exception_mapping(registry::global(), "Clownfish::Nope", |m| {
                HostException::new(&RUNTIME_ERROR, m)
            })
            .is_err()
        );
    }

    #[test]
    fn test_raise_from_propagates() {
        fn failing(map: &ExceptionMap) -> HostResult<i64> {
            map.raise_from::<()>(Thrown::msg("deep"))?;
            Ok(1)
        }

        let map = ExceptionMap::new();
        let exception = failing(&map).unwrap_err();
        assert_eq!(exception.message(), "deep");
    }
}
