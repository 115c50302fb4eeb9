//! Class registry: fully qualified type name to descriptor.
//!
//! # Lifecycle
//!
//! A registry is single-writer-then-frozen. While open, registrations take a
//! write lock and lookups a read lock. [`ClassRegistry::freeze`] moves the
//! table into a `OnceLock`; from then on lookups are lock-free and every
//! registration fails with [`Error::RegistryFrozen`].
//!
//! Names are matched exactly and case-sensitively. Aliases resolve to the
//! same descriptor as the canonical name, so identity checks through either
//! spelling agree.
//!
//! # Global registry
//!
//! [`global`] returns the process-wide registry, bootstrapped with the core
//! `Clownfish` parcel on first use. It stays open so host code can register
//! subclasses at startup, then freeze it.

use crate::error::{Error, Result};
use crate::runtime::class::ClassDescriptor;
use crate::runtime::{bootstrap, read, write};
use finbridge_log::{debug, error, trace};
use fxhash::FxHashMap;
use std::sync::{OnceLock, RwLock};

type ClassTable = FxHashMap<String, &'static ClassDescriptor>;

/// Registry of class descriptors keyed by fully qualified name.
pub struct ClassRegistry {
    open: RwLock<ClassTable>,
    frozen: OnceLock<ClassTable>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        ClassRegistry {
            open: RwLock::new(FxHashMap::default()),
            frozen: OnceLock::new(),
        }
    }

    /// Registers a descriptor under its own name.
    ///
    /// # Errors
    ///
    /// - [`Error::RegistryFrozen`] after [`ClassRegistry::freeze`]
    /// - [`Error::ClassAlreadyExists`] if the name is taken
    /// - [`Error::UnknownType`] if the parent is not registered here
    ///
    /// # Example
    ///
    /// ```
    /// use finbridge::runtime::{ClassDescriptor, ClassRegistry};
    ///
    /// let registry = ClassRegistry::new();
    /// let root = ClassDescriptor::builder("Demo::Root", "Demo").build().unwrap();
    /// registry.register(root).unwrap();
    ///
    /// assert!(registry.register(root).is_err());
    /// assert!(std::ptr::eq(registry.fetch_singleton("Demo::Root").unwrap(), root));
    /// ```
    pub fn register(&self, class: &'static ClassDescriptor) -> Result<()> {
        let mut table = write(&self.open);
        if self.frozen.get().is_some() {
            return Err(Error::RegistryFrozen);
        }

        if table.contains_key(class.name()) {
            return Err(Error::ClassAlreadyExists {
                name: class.name().to_string(),
            });
        }

        if let Some(parent) = class.parent() {
            match table.get(parent.name()) {
                Some(registered) if std::ptr::eq(*registered, parent) => {}
                _ => {
                    return Err(Error::UnknownType {
                        name: parent.name().to_string(),
                    });
                }
            }
        }

        table.insert(class.name().to_string(), class);
        trace!("registered {}", class.name());
        Ok(())
    }

    /// Makes `alias` resolve to the descriptor registered as `target`.
    ///
    /// # Errors
    ///
    /// - [`Error::RegistryFrozen`] after [`ClassRegistry::freeze`]
    /// - [`Error::UnknownType`] if `target` is not registered
    /// - [`Error::ClassAlreadyExists`] if `alias` is already taken
    pub fn register_alias(&self, alias: &str, target: &str) -> Result<()> {
        let mut table = write(&self.open);
        if self.frozen.get().is_some() {
            return Err(Error::RegistryFrozen);
        }

        let class = *table.get(target).ok_or_else(|| Error::UnknownType {
            name: target.to_string(),
        })?;

        if table.contains_key(alias) {
            return Err(Error::ClassAlreadyExists {
                name: alias.to_string(),
            });
        }

        table.insert(alias.to_string(), class);
        trace!("registered alias {alias} -> {}", class.name());
        Ok(())
    }

    /// Stops accepting registrations. Idempotent.
    pub fn freeze(&self) {
        let mut table = write(&self.open);
        if self.frozen.get().is_some() {
            return;
        }
        let classes = std::mem::take(&mut *table);
        let count = classes.len();
        let _ = self.frozen.set(classes);
        debug!("class registry frozen with {count} names");
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Resolves a fully qualified type name or alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the name was never registered.
    pub fn fetch_singleton(&self, name: &str) -> Result<&'static ClassDescriptor> {
        if let Some(table) = self.frozen.get() {
            return lookup(table, name);
        }

        let found = read(&self.open).get(name).copied();
        match found {
            Some(class) => Ok(class),
            // Frozen between the two checks; the table has moved.
            None => match self.frozen.get() {
                Some(table) => lookup(table, name),
                None => Err(Error::UnknownType {
                    name: name.to_string(),
                }),
            },
        }
    }

    /// Returns true if `name` resolves.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fetch_singleton(name).is_ok()
    }

    /// All registered names, aliases included, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.frozen.get() {
            Some(table) => table.keys().cloned().collect(),
            None => read(&self.open).keys().cloned().collect(),
        };
        names.sort_unstable();
        names
    }
}

fn lookup(table: &ClassTable, name: &str) -> Result<&'static ClassDescriptor> {
    table.get(name).copied().ok_or_else(|| Error::UnknownType {
        name: name.to_string(),
    })
}

static GLOBAL: OnceLock<ClassRegistry> = OnceLock::new();

/// Returns the process-wide registry holding the core parcel.
pub fn global() -> &'static ClassRegistry {
    GLOBAL.get_or_init(|| {
        let registry = ClassRegistry::new();
        match bootstrap::register_core(&registry) {
            Ok(()) => debug!(
                "global class registry bootstrapped with {} names",
                registry.names().len()
            ),
            Err(e) => error!("failed to bootstrap core classes: {e}"),
        }
        registry
    })
}
