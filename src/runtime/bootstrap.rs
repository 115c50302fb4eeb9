//! The core `Clownfish` parcel.
//!
//! Builds the core class descriptors once per process and registers them
//! into any registry that needs them.

use crate::error::Result;
use crate::runtime::class::ClassDescriptor;
use crate::runtime::object::{ObjPtr, Payload};
use crate::runtime::registry::ClassRegistry;
use crate::runtime::{base, err, hash, number, string, vector};
use std::sync::OnceLock;

/// Descriptors of the core parcel, plus the Boolean singletons.
pub struct CoreClasses {
    pub obj: &'static ClassDescriptor,
    pub string: &'static ClassDescriptor,
    pub integer: &'static ClassDescriptor,
    pub float: &'static ClassDescriptor,
    pub boolean: &'static ClassDescriptor,
    pub hash: &'static ClassDescriptor,
    pub vector: &'static ClassDescriptor,
    pub err: &'static ClassDescriptor,
    pub string_helper: &'static ClassDescriptor,
    pub true_obj: ObjPtr,
    pub false_obj: ObjPtr,
}

impl CoreClasses {
    fn build() -> Result<Self> {
        let obj = base::build()?;
        let boolean = number::build_boolean(obj)?;
        Ok(CoreClasses {
            obj,
            string: string::build(obj)?,
            integer: number::build_integer(obj)?,
            float: number::build_float(obj)?,
            boolean,
            hash: hash::build(obj)?,
            vector: vector::build(obj)?,
            err: err::build(obj)?,
            string_helper: string::build_helper()?,
            true_obj: ObjPtr::new(boolean, Payload::Boolean(true)),
            false_obj: ObjPtr::new(boolean, Payload::Boolean(false)),
        })
    }

    /// Core descriptors in registration order, parents first.
    #[must_use]
    pub fn all(&self) -> [&'static ClassDescriptor; 9] {
        [
            self.obj,
            self.string,
            self.integer,
            self.float,
            self.boolean,
            self.hash,
            self.vector,
            self.err,
            self.string_helper,
        ]
    }

    /// The immortal Boolean object for `value`.
    #[must_use]
    pub fn boolean_obj(&self, value: bool) -> ObjPtr {
        if value { self.true_obj } else { self.false_obj }
    }
}

static CORE: OnceLock<CoreClasses> = OnceLock::new();

/// Returns the core parcel, building it on first use.
///
/// # Panics
///
/// Panics if a core method signature is malformed, which is a defect in
/// this crate rather than a runtime condition.
pub fn core() -> &'static CoreClasses {
    CORE.get_or_init(|| match CoreClasses::build() {
        Ok(core) => core,
        Err(e) => panic!("core class table is malformed: {e}"),
    })
}

/// Registers the core parcel and its aliases into `registry`.
///
/// # Errors
///
/// Fails if any core name is already taken or the registry is frozen.
pub fn register_core(registry: &ClassRegistry) -> Result<()> {
    let core = core();
    for class in core.all() {
        registry.register(class)?;
    }
    registry.register_alias("Clownfish::Integer32", "Clownfish::Integer")?;
    registry.register_alias("Clownfish::Integer64", "Clownfish::Integer")?;
    registry.register_alias("Clownfish::Float64", "Clownfish::Float")?;
    Ok(())
}
