//! `finbridge`: a foreign object bridge
//!
//! `finbridge` exposes a manually reference-counted native object runtime to
//! a garbage-collected host. It provides:
//!
//! - **Ownership at the boundary**: every host wrapper owns exactly one
//!   native reference, released once, with double releases detected
//! - **Dynamic identity**: `is_a` checks by registered type name, compared
//!   by descriptor identity
//! - **Error translation**: native error objects become host exceptions,
//!   with user-registered mappings
//! - **Declarative bindings**: class bindings compiled into fixed dispatch
//!   tables when the module is emitted
//!
//! # Architecture
//!
//! - [`runtime`]: the native object model, class registry and core parcel
//! - [`bridge`]: handles, identity, exceptions, marshaling and the host
//!   module surface
//! - [`binding`]: binding declarations and the emitter
//! - [`config`]: release policy and log level
//!
//! # Example
//!
//! ```rust
//! use finbridge::binding::clownfish_module;
//! use finbridge::bridge::{CallArgs, HostValue};
//!
//! let module = clownfish_module().unwrap();
//! let int = module
//!     .construct("Clownfish::Integer", &CallArgs::new().arg(42_i64))
//!     .unwrap();
//!
//! let value = module.call_method(&int, "get_value", &CallArgs::new()).unwrap();
//! assert_eq!(value, HostValue::Int(42));
//!
//! let is_obj = module
//!     .call_method(&int, "is_a", &CallArgs::new().arg("Clownfish::Obj"))
//!     .unwrap();
//! assert_eq!(is_obj, HostValue::Bool(true));
//! ```

pub mod binding;
pub mod bridge;
pub mod config;
pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use binding::{BindingRegistry, ClassBinding, MethodDef, clownfish_module};
pub use bridge::{
    BoundModule, CallArgs, HostException, HostObject, HostResult, HostValue, NativeHandle,
    is_a,
};
pub use config::{BridgeConfig, ReleasePolicy};
pub use error::{Error, Result};
pub use runtime::{ClassDescriptor, ClassRegistry};
