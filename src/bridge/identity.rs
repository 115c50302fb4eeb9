//! Dynamic type identity queries.
//!
//! `is_a` resolves the type name through a class registry, then walks the
//! handle's class ancestry comparing descriptors by address. An unknown name
//! is an error, never a `false`.
//!
//! Registry membership is all that matters: a class whose methods are hidden
//! from the host, or that has no binding at all, still answers identity
//! queries.

use crate::bridge::handle::NativeHandle;
use crate::error::Result;
use crate::runtime::registry::{self, ClassRegistry};
use std::ptr;

/// Returns true if the handle's dynamic class is `type_name` or descends
/// from it, resolving names through the global registry.
///
/// # Errors
///
/// Returns [`crate::Error::UnknownType`] if `type_name` is not registered.
///
/// # Example
///
/// ```
/// use finbridge::bridge::{NativeHandle, is_a};
/// use finbridge::runtime::string;
///
/// let handle = unsafe { NativeHandle::acquire(string::new_string("hi")) };
/// assert!(is_a(&handle, "Clownfish::Obj").unwrap());
/// assert!(!is_a(&handle, "Clownfish::Hash").unwrap());
/// assert!(is_a(&handle, "Clownfish::Nope").is_err());
/// ```
pub fn is_a(handle: &NativeHandle, type_name: &str) -> Result<bool> {
    is_a_in(registry::global(), handle, type_name)
}

/// [`is_a`] against an explicit registry.
///
/// The name is resolved before the handle is inspected, so an unknown name
/// is reported even for a released handle. The class itself is recorded in
/// the handle and stays valid after release.
///
/// # Errors
///
/// Returns [`crate::Error::UnknownType`] if `type_name` is not registered in
/// `registry`.
pub fn is_a_in(
    registry: &ClassRegistry,
    handle: &NativeHandle,
    type_name: &str,
) -> Result<bool> {
    let target = registry.fetch_singleton(type_name)?;
    Ok(handle.class().ancestry().any(|class| ptr::eq(class, target)))
}
