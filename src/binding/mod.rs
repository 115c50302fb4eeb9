//! Binding declarations and the emitter that turns them into host tables.
//!
//! A [`ClassBinding`] says how one native class is exposed: which of its
//! methods to hide, an optional extension hook, and extra entries. The
//! [`BindingRegistry`] collects them and [`BindingRegistry::emit`] compiles
//! them into a [`crate::bridge::BoundModule`].
//!
//! # Example
//!
//! ```
//! use finbridge::binding::{BindingRegistry, ClassBinding};
//! use finbridge::bridge::{CallArgs, HostValue};
//! use finbridge::runtime::registry;
//!
//! let mut bindings = BindingRegistry::new();
//! bindings
//!     .register(ClassBinding::new("Clownfish", "Clownfish::Hash"))
//!     .unwrap();
//! let module = bindings.emit("demo", registry::global()).unwrap();
//!
//! let hash = module.construct("Clownfish::Hash", &CallArgs::new()).unwrap();
//! module
//!     .call_method(&hash, "store", &CallArgs::new().arg("answer").arg(42_i64))
//!     .unwrap();
//! let value = module
//!     .call_method(&hash, "fetch", &CallArgs::new().arg("answer"))
//!     .unwrap();
//! assert_eq!(value, HostValue::Int(42));
//! ```

pub mod class_binding;
pub mod clownfish;
mod emit;

pub use class_binding::{BindingExtension, BindingRegistry, ClassBinding, MethodDef};
pub use clownfish::{clownfish_module, core_bindings};
