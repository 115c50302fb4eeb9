//! Host-side wrappers: objects and call arguments.

use crate::bridge::handle::NativeHandle;
use crate::bridge::identity;
use crate::bridge::marshal::HostValue;
use crate::error::{Error, Result};
use crate::runtime::{ClassDescriptor, ObjPtr};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A native object as seen from host code.
///
/// Clones share one [`NativeHandle`]; the native reference is released when
/// the last clone is dropped, or earlier through [`HostObject::release`].
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<Mutex<NativeHandle>>,
    class: &'static ClassDescriptor,
}

impl HostObject {
    #[must_use]
    pub fn new(handle: NativeHandle) -> Self {
        let class = handle.class();
        HostObject {
            inner: Arc::new(Mutex::new(handle)),
            class,
        }
    }

    /// The object's dynamic class.
    #[must_use]
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    /// Runs `f` with exclusive access to the handle.
    pub fn with_handle<R>(&self, f: impl FnOnce(&mut NativeHandle) -> R) -> R {
        let mut handle = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut handle)
    }

    /// # Errors
    ///
    /// Returns [`Error::ReleasedHandle`] after release.
    pub fn refcount(&self) -> Result<u32> {
        self.with_handle(|handle| handle.refcount())
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.with_handle(|handle| !handle.is_owned())
    }

    /// Releases the native reference now instead of on drop.
    ///
    /// # Errors
    ///
    /// See [`NativeHandle::release`].
    pub fn release(&self) -> Result<()> {
        self.with_handle(NativeHandle::release)
    }

    /// Identity query against the global registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] for unregistered names.
    pub fn is_a(&self, type_name: &str) -> Result<bool> {
        self.with_handle(|handle| identity::is_a(handle, type_name))
    }

    /// Takes a reference for the duration of a native call.
    pub(crate) fn retain(&self) -> Result<ObjPtr> {
        self.with_handle(|handle| handle.object()?.inc_ref())
    }

    /// Returns true if both wrap the same native object. Released wrappers
    /// only equal their own clones.
    #[must_use]
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        let live = |handle: &mut NativeHandle| handle.is_owned().then(|| handle.ptr());
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        match (self.with_handle(live), other.with_handle(live)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class.name())
            .field("ptr", &self.with_handle(|handle| handle.ptr()))
            .finish()
    }
}

static NO_VALUE: HostValue = HostValue::None;

/// Positional and keyword arguments of a host call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<HostValue>,
    keyword: Vec<(String, HostValue)>,
}

impl CallArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<HostValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: &str, value: impl Into<HostValue>) -> Self {
        self.keyword.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matches arguments to `params` by position, then by keyword.
    ///
    /// Parameters left unmatched are `None` in the result.
    ///
    /// # Errors
    ///
    /// - [`Error::ArgumentCount`] for surplus positional arguments
    /// - [`Error::UnknownArgument`] for a keyword matching no parameter
    /// - [`Error::DuplicateArgument`] for a parameter given twice
    pub fn bind(&self, params: &[&str]) -> Result<Vec<Option<&HostValue>>> {
        if self.positional.len() > params.len() {
            return Err(Error::ArgumentCount {
                expected: params.len(),
                got: self.len(),
            });
        }

        let mut bound: Vec<Option<&HostValue>> = vec![None; params.len()];
        for (slot, value) in bound.iter_mut().zip(&self.positional) {
            *slot = Some(value);
        }
        for (name, value) in &self.keyword {
            let index = params
                .iter()
                .position(|param| param == name)
                .ok_or_else(|| Error::UnknownArgument { name: name.clone() })?;
            if bound[index].is_some() {
                return Err(Error::DuplicateArgument { name: name.clone() });
            }
            bound[index] = Some(value);
        }
        Ok(bound)
    }

    /// Binds a single required string parameter.
    ///
    /// # Errors
    ///
    /// Binding errors, [`Error::ArgumentCount`] if the argument is missing,
    /// and [`Error::ArgumentType`] if it is not a string.
    pub fn single_str(&self, param: &str) -> Result<&str> {
        let bound = self.bind(&[param])?;
        match bound[0].unwrap_or(&NO_VALUE) {
            HostValue::Str(text) => Ok(text),
            HostValue::None if bound[0].is_none() => Err(Error::ArgumentCount {
                expected: 1,
                got: 0,
            }),
            other => Err(Error::ArgumentType {
                param: param.to_string(),
                expected: "str".to_string(),
                found: other.kind_name(),
            }),
        }
    }
}
