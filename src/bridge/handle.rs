//! Native object handles.
//!
//! A [`NativeHandle`] is the host-side owner of exactly one reference to a
//! native object. It is created either by adopting a fresh reference
//! ([`NativeHandle::acquire`]) or by taking a new one
//! ([`NativeHandle::wrap`]), and gives its reference back exactly once:
//! through [`NativeHandle::release`] or when dropped.
//!
//! # Double release
//!
//! A second release never touches the object, which may already be gone.
//! What it does instead depends on the handle's [`ReleasePolicy`]:
//!
//! - `Strict`: fails with [`Error::DoubleRelease`]
//! - `Lenient`: logs a warning and returns `Ok(())`
//!
//! # Teardown
//!
//! `Drop` performs the single outstanding decrement and nothing else. It
//! neither logs nor allocates, so it is safe on host finalizer paths.

use crate::config::{self, ReleasePolicy};
use crate::error::{Error, Result};
use crate::runtime::{ClassDescriptor, Obj, ObjPtr};
use finbridge_log::{error, warn};
use std::fmt;

/// Owner of one reference to a native object.
pub struct NativeHandle {
    ptr: ObjPtr,
    class: &'static ClassDescriptor,
    owned: bool,
    policy: ReleasePolicy,
    #[cfg(feature = "release-backtrace")]
    released_at: Option<backtrace::Backtrace>,
}

impl NativeHandle {
    /// Adopts a reference the caller already owns, without incrementing.
    ///
    /// The handle uses the process [`ReleasePolicy`].
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object and the caller must own one
    /// reference to it, which passes to the handle.
    #[must_use]
    pub unsafe fn acquire(ptr: ObjPtr) -> Self {
        // SAFETY: the caller owns a reference, so the object is alive
        let class = unsafe { ptr.get() }.class();
        NativeHandle {
            ptr,
            class,
            owned: true,
            policy: config::current().release_policy,
            #[cfg(feature = "release-backtrace")]
            released_at: None,
        }
    }

    /// Takes a new reference to `ptr` and adopts it.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object for the duration of the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefCountOverflow`] if the count is saturated.
    pub unsafe fn wrap(ptr: ObjPtr) -> Result<Self> {
        // SAFETY: the caller guarantees the object is alive
        let owned = unsafe { ptr.get() }.inc_ref()?;
        // SAFETY: `owned` is the reference taken just above
        Ok(unsafe { Self::acquire(owned) })
    }

    /// Overrides the release policy for this handle.
    #[must_use]
    pub fn with_policy(mut self, policy: ReleasePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: ReleasePolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Returns true while the handle still owns its reference.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// The object's class. Available even after release.
    #[must_use]
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    /// The raw pointer, whether or not the handle still owns it.
    #[must_use]
    pub fn ptr(&self) -> ObjPtr {
        self.ptr
    }

    /// Borrows the object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReleasedHandle`] once the reference is released.
    pub fn object(&self) -> Result<&Obj> {
        if !self.owned {
            return Err(Error::ReleasedHandle);
        }
        // SAFETY: the handle owns a reference for as long as `owned` is set
        Ok(unsafe { self.ptr.get() })
    }

    /// The object's current reference count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReleasedHandle`] once the reference is released.
    pub fn refcount(&self) -> Result<u32> {
        Ok(self.object()?.refcount())
    }

    /// Returns a second handle with its own reference and the same policy.
    ///
    /// # Errors
    ///
    /// - [`Error::ReleasedHandle`] once this handle is released
    /// - [`Error::RefCountOverflow`] if the count is saturated
    pub fn try_clone(&self) -> Result<Self> {
        let owned = self.object()?.inc_ref()?;
        // SAFETY: `owned` is the reference taken just above
        Ok(unsafe { Self::acquire(owned) }.with_policy(self.policy))
    }

    /// Gives the owned reference to the caller without releasing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReleasedHandle`] once the reference is released.
    pub fn into_raw(mut self) -> Result<ObjPtr> {
        if !self.owned {
            return Err(Error::ReleasedHandle);
        }
        self.owned = false;
        Ok(self.ptr)
    }

    /// Releases the owned reference exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DoubleRelease`] on a repeated release under
    /// [`ReleasePolicy::Strict`].
    pub fn release(&mut self) -> Result<()> {
        if !self.owned {
            return self.double_release();
        }

        self.owned = false;
        #[cfg(feature = "release-backtrace")]
        {
            self.released_at = Some(backtrace::Backtrace::new());
        }
        // SAFETY: `owned` was set, so this handle held one reference
        unsafe {
            self.ptr.dec_ref();
        }
        Ok(())
    }

    fn double_release(&self) -> Result<()> {
        let class = self.class.name();
        let origin = self.release_origin();
        match self.policy {
            ReleasePolicy::Strict => {
                error!("double release of {class} handle{origin}");
                Err(Error::DoubleRelease {
                    class: class.to_string(),
                })
            }
            ReleasePolicy::Lenient => {
                warn!("ignoring double release of {class} handle{origin}");
                Ok(())
            }
        }
    }

    #[cfg(feature = "release-backtrace")]
    fn release_origin(&self) -> String {
        match &self.released_at {
            Some(trace) => format!(", first released at:\n{trace:?}"),
            None => String::new(),
        }
    }

    #[cfg(not(feature = "release-backtrace"))]
    #[allow(clippy::unused_self)]
    fn release_origin(&self) -> &'static str {
        ""
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if self.owned {
            self.owned = false;
            // SAFETY: `owned` was set, so this handle held one reference
            unsafe {
                self.ptr.dec_ref();
            }
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("ptr", &self.ptr)
            .field("class", &self.class.name())
            .field("owned", &self.owned)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
