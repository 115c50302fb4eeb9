//! Compiles registered bindings into a [`BoundModule`].
//!
//! Each class table gets, in order:
//!
//! 1. one entry per public, bindable instance method the class declares
//!    (novel or overriding), then one per inert function, all under their
//!    lowercased names and minus exclusions
//! 2. the entries of the extension hook
//! 3. the extra entries
//!
//! Every directive problem is reported here, so a module that emits
//! cleanly never fails a lookup because of its bindings.

use crate::binding::class_binding::{BindingRegistry, ClassBinding, MethodDef};
use crate::bridge::module::{BoundClass, BoundModule, EntryKind};
use crate::error::{Error, Result};
use crate::runtime::registry::ClassRegistry;
use crate::runtime::{ClassDescriptor, Method, MethodKind};
use finbridge_log::{debug, trace};

impl BindingRegistry {
    /// Builds the host module `module_name` from every registered binding.
    ///
    /// Emission does not consume the bindings; emitting twice yields
    /// identical tables.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownClassBinding`] if a binding names an unregistered
    ///   class
    /// - [`Error::UnknownMethod`] if an exclusion names a method the class
    ///   does not declare
    /// - [`Error::BindingConflict`] if two entries end up with one name
    pub fn emit(&self, module_name: &str, classes: &'static ClassRegistry) -> Result<BoundModule> {
        let mut module = BoundModule::new(module_name, classes);
        for binding in self.iter() {
            let bound = emit_class(binding, classes)?;
            debug!(
                "bound {} with {} entries",
                bound.class().name(),
                bound.entry_names().len()
            );
            module.add_class(bound);
        }
        debug!("emitted module {module_name}");
        Ok(module)
    }
}

fn emit_class(binding: &ClassBinding, classes: &ClassRegistry) -> Result<BoundClass> {
    let class = classes
        .fetch_singleton(binding.class_name())
        .map_err(|_| Error::UnknownClassBinding {
            class: binding.class_name().to_string(),
        })?;

    for excluded in binding.excluded() {
        if class.declared(excluded).is_none() {
            return Err(Error::UnknownMethod {
                class: class.name().to_string(),
                method: excluded.clone(),
            });
        }
    }

    let exposed = |method: &&'static Method| {
        if !method.can_be_bound() {
            trace!("skipping unbindable {}::{}", class.name(), method.name());
            return false;
        }
        !binding.is_excluded(method.name())
    };

    let constructor = class.constructor().filter(|ctor| exposed(ctor));
    let mut bound = BoundClass::new(class, constructor);

    let generated = class
        .declared_methods()
        .iter()
        .chain(class.functions())
        .filter(|method| exposed(method));
    for &method in generated {
        let kind = match method.kind() {
            MethodKind::Inert => EntryKind::Function(method),
            _ => EntryKind::Method(method),
        };
        insert(&mut bound, class, method.host_name(), kind)?;
    }

    let extension = binding
        .pre_code()
        .map(|hook| hook.entries(class))
        .unwrap_or_default();
    for def in extension.iter().chain(binding.method_defs()) {
        add_def(&mut bound, class, def)?;
    }
    Ok(bound)
}

fn add_def(bound: &mut BoundClass, class: &ClassDescriptor, def: &MethodDef) -> Result<()> {
    insert(bound, class, def.name().to_string(), EntryKind::Custom(def.imp()))
}

fn insert(
    bound: &mut BoundClass,
    class: &ClassDescriptor,
    name: String,
    kind: EntryKind,
) -> Result<()> {
    if bound.insert(name.clone(), kind) {
        Ok(())
    } else {
        Err(Error::BindingConflict {
            class: class.name().to_string(),
            name,
        })
    }
}
