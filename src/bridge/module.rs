//! The host module surface.
//!
//! A [`BoundModule`] is what the binding emitter produces: one
//! [`BoundClass`] per bound native class, each a fixed table from host entry
//! name to what the entry runs. Tables are built once and never change.
//!
//! # Lookup
//!
//! A class's table only holds the entries it declares. Looking up a name
//! walks the receiver's ancestry and stops at the first bound class that
//! has it. A generated entry then dispatches through the receiver's own
//! vtable, so an override in an unbound subclass still wins.

use crate::bridge::exception::{ExceptionMap, HostResult};
use crate::bridge::host::{CallArgs, HostObject};
use crate::bridge::marshal::{self, HostValue};
use crate::bridge::trap::{self, ArgFrame};
use crate::error::{Error, Result};
use crate::runtime::registry::ClassRegistry;
use crate::runtime::{ClassDescriptor, Imp, Method, Ret};
use fxhash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A host-level method implemented in Rust.
pub type CustomMethod =
    Arc<dyn Fn(&BoundModule, &HostObject, &CallArgs) -> HostResult<HostValue> + Send + Sync>;

/// What a bound entry runs.
#[derive(Clone)]
pub enum EntryKind {
    /// Native instance method, resolved again on the receiver's vtable.
    Method(&'static Method),
    /// Native inert function.
    Function(&'static Method),
    /// Extension or extra entry.
    Custom(CustomMethod),
}

impl fmt::Debug for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Method(method) => write!(f, "Method({})", method.name()),
            EntryKind::Function(method) => write!(f, "Function({})", method.name()),
            EntryKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Dispatch table of one bound class.
#[derive(Debug)]
pub struct BoundClass {
    class: &'static ClassDescriptor,
    constructor: Option<&'static Method>,
    entries: Vec<(String, EntryKind)>,
    index: FxHashMap<String, usize>,
}

impl BoundClass {
    pub(crate) fn new(
        class: &'static ClassDescriptor,
        constructor: Option<&'static Method>,
    ) -> Self {
        BoundClass {
            class,
            constructor,
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Appends an entry. Returns false if the name is taken.
    pub(crate) fn insert(&mut self, name: String, kind: EntryKind) -> bool {
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, kind));
        true
    }

    #[must_use]
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    #[must_use]
    pub fn constructor(&self) -> Option<&'static Method> {
        self.constructor
    }

    /// Entry names in table order.
    #[must_use]
    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&EntryKind> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }
}

/// Classes and exception mappings reachable from host code.
pub struct BoundModule {
    name: String,
    registry: &'static ClassRegistry,
    exceptions: ExceptionMap,
    classes: FxHashMap<usize, BoundClass>,
    order: Vec<&'static ClassDescriptor>,
}

fn class_key(class: &ClassDescriptor) -> usize {
    std::ptr::from_ref(class) as usize
}

impl BoundModule {
    pub(crate) fn new(name: &str, registry: &'static ClassRegistry) -> Self {
        BoundModule {
            name: name.to_string(),
            registry,
            exceptions: ExceptionMap::new(),
            classes: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub(crate) fn add_class(&mut self, bound: BoundClass) {
        self.order.push(bound.class);
        self.classes.insert(class_key(bound.class), bound);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry used to resolve class names.
    #[must_use]
    pub fn registry(&self) -> &'static ClassRegistry {
        self.registry
    }

    /// Native error to host exception mappings of this module.
    #[must_use]
    pub fn exceptions(&self) -> &ExceptionMap {
        &self.exceptions
    }

    /// Bound classes in binding order.
    pub fn classes(&self) -> impl Iterator<Item = &BoundClass> {
        self.order
            .iter()
            .filter_map(|class| self.classes.get(&class_key(class)))
    }

    /// The table bound for exactly this class, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the name is not registered.
    pub fn bound_class(&self, class_name: &str) -> Result<Option<&BoundClass>> {
        let class = self.registry.fetch_singleton(class_name)?;
        Ok(self.classes.get(&class_key(class)))
    }

    fn is_bound(&self, class: &'static ClassDescriptor) -> bool {
        class
            .ancestry()
            .any(|ancestor| self.classes.contains_key(&class_key(ancestor)))
    }

    /// Finds `name` on the nearest bound class in `class`'s ancestry.
    fn resolve(&self, class: &'static ClassDescriptor, name: &str) -> Result<&EntryKind> {
        class
            .ancestry()
            .filter_map(|ancestor| self.classes.get(&class_key(ancestor)))
            .find_map(|bound| bound.entry(name))
            .ok_or_else(|| Error::MethodNotFound {
                class: class.name().to_string(),
                method: name.to_string(),
            })
    }

    /// Instantiates `class_name`.
    ///
    /// Classes without a constructor of their own use their nearest
    /// ancestor's, which then builds an instance of `class_name`. The result
    /// is always an object, even for value classes like `Clownfish::Integer`.
    ///
    /// # Errors
    ///
    /// - `UnknownTypeError` if the class is not registered
    /// - `AttributeError` if neither the class nor an ancestor is bound, or
    ///   no constructor is reachable
    /// - `TypeError` / `OverflowError` for bad arguments
    /// - the translated native error if the constructor throws
    pub fn construct(&self, class_name: &str, args: &CallArgs) -> HostResult<HostObject> {
        let class = self.registry.fetch_singleton(class_name)?;
        let not_found = || Error::MethodNotFound {
            class: class.name().to_string(),
            method: "init".to_string(),
        };
        if !self.is_bound(class) {
            return Err(not_found().into());
        }

        let ctor = class
            .ancestry()
            .find_map(|ancestor| self.constructor_of(ancestor))
            .ok_or_else(not_found)?;

        let value = self
            .invoke(ctor, class, None, args, marshal::to_host_object)
            .map_err(|e| e.with_frame(format!("{}.__init__", class.short_name())))?;
        match value {
            HostValue::Object(obj) => Ok(obj),
            other => Err(Error::NativeRuntime {
                message: format!("Constructor of {} returned {}", class.name(), other.kind_name()),
            }
            .into()),
        }
    }

    /// A bound class's constructor, or a native one on an unbound class.
    fn constructor_of(&self, class: &'static ClassDescriptor) -> Option<&'static Method> {
        match self.classes.get(&class_key(class)) {
            Some(bound) => bound.constructor,
            None => class.constructor().filter(|ctor| ctor.can_be_bound()),
        }
    }

    /// Calls the host entry `name` on `obj`.
    ///
    /// # Errors
    ///
    /// - `AttributeError` if no bound class in the ancestry has the entry
    /// - `RuntimeError` if the handle was released
    /// - argument errors and translated native errors
    pub fn call_method(
        &self,
        obj: &HostObject,
        name: &str,
        args: &CallArgs,
    ) -> HostResult<HostValue> {
        let class = obj.class();
        let frame = format!("{}.{name}", class.short_name());

        let result = match self.resolve(class, name) {
            Ok(EntryKind::Custom(entry)) => entry(self, obj, args),
            Ok(EntryKind::Method(method)) => {
                let method = class.method(method.name()).unwrap_or(*method);
                self.invoke(method, class, Some(obj), args, marshal::to_host)
            }
            Ok(EntryKind::Function(function)) => {
                self.invoke(function, class, None, args, marshal::to_host)
            }
            Err(e) => Err(e.into()),
        };
        result.map_err(|e| e.with_frame(frame))
    }

    /// Calls the inert function `name` of `class_name`.
    ///
    /// # Errors
    ///
    /// - `UnknownTypeError` if the class is not registered
    /// - `AttributeError` if the entry is missing or needs a receiver
    /// - argument errors and translated native errors
    pub fn call_static(
        &self,
        class_name: &str,
        name: &str,
        args: &CallArgs,
    ) -> HostResult<HostValue> {
        let class = self.registry.fetch_singleton(class_name)?;
        let frame = format!("{}.{name}", class.short_name());

        let result = match self.resolve(class, name) {
            Ok(EntryKind::Function(function)) => {
                self.invoke(function, class, None, args, marshal::to_host)
            }
            Ok(_) | Err(_) => Err(Error::MethodNotFound {
                class: class.name().to_string(),
                method: name.to_string(),
            }
            .into()),
        };
        result.map_err(|e| e.with_frame(frame))
    }

    fn invoke(
        &self,
        method: &'static Method,
        class: &'static ClassDescriptor,
        receiver: Option<&HostObject>,
        args: &CallArgs,
        convert: fn(Ret) -> Result<HostValue>,
    ) -> HostResult<HostValue> {
        if !method.can_be_bound() {
            return Err(Error::Unbindable {
                method: method.name().to_string(),
            }
            .into());
        }

        let mut frame = ArgFrame::new();
        if let (Some(obj), Imp::Instance(_)) = (receiver, method.imp()) {
            frame.set_receiver(obj.retain()?);
        }
        marshal::marshal_args(&mut frame, self.registry, method, args)?;
        trap::run_trapped(frame, method.imp(), class, &self.exceptions, convert)
    }
}

impl fmt::Debug for BoundModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundModule")
            .field("name", &self.name)
            .field(
                "classes",
                &self.order.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
