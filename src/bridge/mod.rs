//! The host side of the boundary.
//!
//! - [`handle`]: ownership of one native reference
//! - [`identity`]: `is_a` queries by registered type name
//! - [`exception`]: host exceptions and native error translation
//! - [`marshal`]: host value conversion and argument validation
//! - [`host`]: host objects and call arguments
//! - [`module`]: the bound module host code calls into
//!
//! Native calls run inside a trap that owns the call's temporaries.

pub mod exception;
pub mod handle;
pub mod host;
pub mod identity;
pub mod marshal;
pub mod module;
mod trap;

pub use exception::{
    ExceptionClass, ExceptionCtor, ExceptionMap, HostException, HostResult,
};
pub use handle::NativeHandle;
pub use host::{CallArgs, HostObject};
pub use identity::{is_a, is_a_in};
pub use marshal::HostValue;
pub use module::{BoundClass, BoundModule, CustomMethod, EntryKind};
