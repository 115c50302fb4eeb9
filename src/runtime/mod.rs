//! The native object runtime the bridge exposes.
//!
//! This module models a manually reference-counted object system:
//!
//! - [`class`]: immutable class descriptors, methods and vtables
//! - [`registry`]: name to descriptor lookup, single-writer-then-frozen
//! - [`object`]: refcounted objects, native arguments, thrown errors
//! - [`encoding`]: method signature encodings
//! - [`bootstrap`]: the core `Clownfish` parcel
//!
//! The core classes live in [`string`], [`number`], [`hash`], [`vector`]
//! and [`err`], rooted at `Clownfish::Obj`.

mod base;
pub mod bootstrap;
pub mod class;
pub mod encoding;
pub mod err;
pub mod hash;
pub mod number;
pub mod object;
pub mod registry;
pub mod string;
pub mod vector;

pub use bootstrap::{CoreClasses, core};
pub use class::{ClassBuilder, ClassDescriptor, Imp, Method, MethodKind};
pub use encoding::{Signature, TypeKind, TypeSpec};
pub use object::{
    Arg, NativeResult, Obj, ObjPtr, Payload, Ret, Thrown, live_objects,
};
pub use registry::ClassRegistry;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read-locks `lock`, ignoring poisoning.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-locks `lock`, ignoring poisoning.
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
