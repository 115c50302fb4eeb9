//! Declarative class bindings.

use crate::bridge::exception::HostResult;
use crate::bridge::host::{CallArgs, HostObject};
use crate::bridge::marshal::HostValue;
use crate::bridge::module::{BoundModule, CustomMethod};
use crate::error::{Error, Result};
use crate::runtime::ClassDescriptor;
use std::fmt;
use std::sync::Arc;

/// A host entry implemented in Rust rather than generated from a native
/// method.
#[derive(Clone)]
pub struct MethodDef {
    name: String,
    imp: CustomMethod,
}

impl MethodDef {
    pub fn new<F>(name: &str, imp: F) -> Self
    where
        F: Fn(&BoundModule, &HostObject, &CallArgs) -> HostResult<HostValue>
            + Send
            + Sync
            + 'static,
    {
        MethodDef {
            name: name.to_string(),
            imp: Arc::new(imp),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn imp(&self) -> CustomMethod {
        Arc::clone(&self.imp)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Hook that contributes entries to a class's table when it is emitted.
///
/// Closures taking the class descriptor implement it directly.
pub trait BindingExtension: Send + Sync {
    fn entries(&self, class: &'static ClassDescriptor) -> Vec<MethodDef>;
}

impl<F> BindingExtension for F
where
    F: Fn(&'static ClassDescriptor) -> Vec<MethodDef> + Send + Sync,
{
    fn entries(&self, class: &'static ClassDescriptor) -> Vec<MethodDef> {
        self(class)
    }
}

/// How one native class is exposed to host code.
#[derive(Clone)]
pub struct ClassBinding {
    parcel: String,
    class_name: String,
    excluded: Vec<String>,
    pre_code: Option<Arc<dyn BindingExtension>>,
    method_defs: Vec<MethodDef>,
}

impl ClassBinding {
    #[must_use]
    pub fn new(parcel: &str, class_name: &str) -> Self {
        ClassBinding {
            parcel: parcel.to_string(),
            class_name: class_name.to_string(),
            excluded: Vec::new(),
            pre_code: None,
            method_defs: Vec::new(),
        }
    }

    /// Hides a method the class declares, by native name.
    #[must_use]
    pub fn exclude_method(mut self, name: &str) -> Self {
        self.excluded.push(name.to_string());
        self
    }

    /// Installs the extension hook, replacing any previous one.
    #[must_use]
    pub fn set_pre_code(mut self, extension: impl BindingExtension + 'static) -> Self {
        self.pre_code = Some(Arc::new(extension));
        self
    }

    /// Adds an extra entry after the generated and extension entries.
    #[must_use]
    pub fn add_method_def(mut self, def: MethodDef) -> Self {
        self.method_defs.push(def);
        self
    }

    #[must_use]
    pub fn parcel(&self) -> &str {
        &self.parcel
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|excluded| excluded == name)
    }

    pub(crate) fn pre_code(&self) -> Option<&dyn BindingExtension> {
        self.pre_code.as_deref()
    }

    #[must_use]
    pub fn method_defs(&self) -> &[MethodDef] {
        &self.method_defs
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("parcel", &self.parcel)
            .field("class_name", &self.class_name)
            .field("excluded", &self.excluded)
            .field("pre_code", &self.pre_code.is_some())
            .field("method_defs", &self.method_defs)
            .finish()
    }
}

/// Bindings waiting to be emitted, in registration order.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: Vec<ClassBinding>,
}

impl BindingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindingAlreadyRegistered`] if the class already has
    /// one.
    pub fn register(&mut self, binding: ClassBinding) -> Result<()> {
        if self
            .bindings
            .iter()
            .any(|b| b.class_name == binding.class_name)
        {
            return Err(Error::BindingAlreadyRegistered {
                class: binding.class_name,
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassBinding> {
        self.bindings.iter()
    }
}
