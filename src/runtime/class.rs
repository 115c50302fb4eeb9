//! Class descriptors and native methods.
//!
//! A [`ClassDescriptor`] is the immutable, process-lifetime record of a
//! native class: its fully qualified name, parent link, parcel, flags and
//! methods. Descriptors are built once with [`ClassBuilder`], leaked to get a
//! `'static` address, and compared by identity from then on.
//!
//! # Method resolution
//!
//! Each descriptor carries a flattened vtable of instance methods computed at
//! build time: the parent's vtable, with overrides replacing the inherited
//! slot in place and novel methods appended. Lookups never walk the ancestry
//! at call time.
//!
//! Constructors and inert functions are per class and are not inherited.

use crate::error::{Error, Result};
use crate::runtime::encoding::Signature;
use crate::runtime::object::{Arg, NativeResult, Obj, Ret};
use fxhash::FxHashMap;
use std::fmt;
use std::ptr;

/// Class flags.
pub mod flags {
    /// Class has no instances, only inert functions.
    pub const INERT: u32 = 1 << 0;
    /// Instances of this class are never freed.
    pub const IMMORTAL: u32 = 1 << 1;
}

/// Native implementation of a method.
#[derive(Clone, Copy)]
pub enum Imp {
    /// Invoked on a live receiver.
    Instance(fn(&Obj, &[Arg<'_>]) -> NativeResult<Ret>),
    /// Creates an instance of the given class and returns it incremented.
    Constructor(fn(&'static ClassDescriptor, &[Arg<'_>]) -> NativeResult<Ret>),
    /// Class-level function without a receiver.
    Inert(fn(&[Arg<'_>]) -> NativeResult<Ret>),
}

/// Where a method sits in its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Constructor,
    Inert,
}

/// A native method: name, signature, parameter names and implementation.
pub struct Method {
    name: String,
    signature: Signature,
    params: Vec<String>,
    imp: Imp,
    private: bool,
}

impl Method {
    fn with_imp(
        name: &str,
        encoding: &str,
        params: &[&str],
        imp: Imp,
    ) -> Result<Self> {
        let signature = Signature::parse(encoding)?;
        if signature.params().len() != params.len() {
            return Err(Error::InvalidEncoding {
                encoding: encoding.to_string(),
            });
        }
        Ok(Method {
            name: name.to_string(),
            signature,
            params: params.iter().map(|p| (*p).to_string()).collect(),
            imp,
            private: false,
        })
    }

    /// Creates an instance method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if `encoding` does not parse or its
    /// parameter count differs from `params`.
    pub fn instance(
        name: &str,
        encoding: &str,
        params: &[&str],
        imp: fn(&Obj, &[Arg<'_>]) -> NativeResult<Ret>,
    ) -> Result<Self> {
        Self::with_imp(name, encoding, params, Imp::Instance(imp))
    }

    /// Creates a constructor. Its encoding must return an object.
    ///
    /// # Errors
    ///
    /// Same as [`Method::instance`].
    pub fn constructor(
        encoding: &str,
        params: &[&str],
        imp: fn(&'static ClassDescriptor, &[Arg<'_>]) -> NativeResult<Ret>,
    ) -> Result<Self> {
        Self::with_imp("init", encoding, params, Imp::Constructor(imp))
    }

    /// Creates an inert function.
    ///
    /// # Errors
    ///
    /// Same as [`Method::instance`].
    pub fn inert(
        name: &str,
        encoding: &str,
        params: &[&str],
        imp: fn(&[Arg<'_>]) -> NativeResult<Ret>,
    ) -> Result<Self> {
        Self::with_imp(name, encoding, params, Imp::Inert(imp))
    }

    /// Marks the method private. Private methods are never bound.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Native name, e.g. `Get_Value`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host-side name: the native name lowercased, e.g. `get_value`.
    #[must_use]
    pub fn host_name(&self) -> String {
        self.name.to_lowercase()
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn imp(&self) -> Imp {
        self.imp
    }

    #[must_use]
    pub fn kind(&self) -> MethodKind {
        match self.imp {
            Imp::Instance(_) => MethodKind::Instance,
            Imp::Constructor(_) => MethodKind::Constructor,
            Imp::Inert(_) => MethodKind::Inert,
        }
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Returns true if the method is public and its signature can cross the
    /// boundary.
    #[must_use]
    pub fn can_be_bound(&self) -> bool {
        !self.private && self.signature.is_bindable()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("signature", &self.signature.encoding())
            .field("params", &self.params)
            .field("private", &self.private)
            .finish()
    }
}

/// Immutable singleton describing one native class.
pub struct ClassDescriptor {
    name: String,
    parcel: String,
    parent: Option<&'static ClassDescriptor>,
    flags: u32,
    /// Methods this class declares itself, novel or overriding.
    declared: Vec<&'static Method>,
    constructor: Option<&'static Method>,
    functions: Vec<&'static Method>,
    vtable: Vec<&'static Method>,
    slots: FxHashMap<String, usize>,
}

impl ClassDescriptor {
    /// Starts building a root class.
    #[must_use]
    pub fn builder(name: &str, parcel: &str) -> ClassBuilder {
        ClassBuilder {
            name: name.to_string(),
            parcel: parcel.to_string(),
            parent: None,
            flags: 0,
            methods: Vec::new(),
        }
    }

    /// Fully qualified name, e.g. `Clownfish::Hash`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the name, e.g. `Hash`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn parcel(&self) -> &str {
        &self.parcel
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'static ClassDescriptor> {
        self.parent
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.flags & flags::INERT != 0
    }

    /// Iterates this class and its ancestors, most derived first.
    pub fn ancestry(&'static self) -> impl Iterator<Item = &'static ClassDescriptor> {
        std::iter::successors(Some(self), |class| class.parent)
    }

    /// Returns true if `self` is `other` or descends from it.
    ///
    /// Compares descriptors by address, never by name.
    #[must_use]
    pub fn is_subclass_of(&'static self, other: &ClassDescriptor) -> bool {
        self.ancestry().any(|class| ptr::eq(class, other))
    }

    /// Methods this class declares itself, in declaration order.
    #[must_use]
    pub fn declared_methods(&self) -> &[&'static Method] {
        &self.declared
    }

    /// Flattened instance-method table, inherited slots first.
    #[must_use]
    pub fn vtable(&self) -> &[&'static Method] {
        &self.vtable
    }

    /// Resolves an instance method by native name, most derived wins.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&'static Method> {
        self.slots.get(name).map(|&slot| self.vtable[slot])
    }

    #[must_use]
    pub fn constructor(&self) -> Option<&'static Method> {
        self.constructor
    }

    /// Inert functions declared by this class.
    #[must_use]
    pub fn functions(&self) -> &[&'static Method] {
        &self.functions
    }

    /// Returns the method this class declares under `name`, of any kind.
    #[must_use]
    pub fn declared(&self, name: &str) -> Option<&'static Method> {
        self.declared
            .iter()
            .chain(self.constructor.iter())
            .chain(self.functions.iter())
            .copied()
            .find(|m| m.name() == name)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("parcel", &self.parcel)
            .field("parent", &self.parent.map(ClassDescriptor::name))
            .field("flags", &self.flags)
            .field("vtable_len", &self.vtable.len())
            .finish()
    }
}

impl PartialEq for ClassDescriptor {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ClassDescriptor {}

/// Builder for [`ClassDescriptor`].
pub struct ClassBuilder {
    name: String,
    parcel: String,
    parent: Option<&'static ClassDescriptor>,
    flags: u32,
    methods: Vec<Result<Method>>,
}

impl ClassBuilder {
    #[must_use]
    pub fn parent(mut self, parent: &'static ClassDescriptor) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }

    /// Adds a method. Construction errors surface from [`ClassBuilder::build`].
    #[must_use]
    pub fn method(mut self, method: Result<Method>) -> Self {
        self.methods.push(method);
        self
    }

    /// Validates the class, computes its vtable and leaks it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEncoding`] if any method failed to construct
    /// - [`Error::InheritanceCycle`] if an ancestor has the same name
    /// - [`Error::ClassAlreadyExists`] if two methods share a native name or
    ///   the class declares more than one constructor
    pub fn build(self) -> Result<&'static ClassDescriptor> {
        if let Some(parent) = self.parent {
            if parent.ancestry().any(|a| a.name == self.name) {
                return Err(Error::InheritanceCycle { name: self.name });
            }
        }

        let mut declared = Vec::new();
        let mut constructor = None;
        let mut functions = Vec::new();
        let mut vtable: Vec<&'static Method> = self
            .parent
            .map(|p| p.vtable.clone())
            .unwrap_or_default();
        let mut slots: FxHashMap<String, usize> = self
            .parent
            .map(|p| p.slots.clone())
            .unwrap_or_default();
        let mut seen: Vec<String> = Vec::new();

        for method in self.methods {
            let method: &'static Method = Box::leak(Box::new(method?));

            if seen.iter().any(|n| n == method.name()) {
                return Err(Error::ClassAlreadyExists {
                    name: format!("{}::{}", self.name, method.name()),
                });
            }
            seen.push(method.name().to_string());

            match method.kind() {
                MethodKind::Instance => {
                    match slots.get(method.name()) {
                        Some(&slot) => vtable[slot] = method,
                        None => {
                            slots.insert(method.name().to_string(), vtable.len());
                            vtable.push(method);
                        }
                    }
                    declared.push(method);
                }
                MethodKind::Constructor => constructor = Some(method),
                MethodKind::Inert => functions.push(method),
            }
        }

        Ok(Box::leak(Box::new(ClassDescriptor {
            name: self.name,
            parcel: self.parcel,
            parent: self.parent,
            flags: self.flags,
            declared,
            constructor,
            functions,
            vtable,
            slots,
        })))
    }
}
