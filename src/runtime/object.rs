//! Reference-counted native objects.
//!
//! This module implements the native object model the bridge exposes:
//! - Heap-allocated [`Obj`] records with an atomic reference count
//! - [`ObjPtr`], the raw pointer native code passes around
//! - Manual `inc_ref`/`dec_ref` with destruction at zero
//! - Immortal objects that ignore refcount traffic
//! - [`Thrown`], the owned native error travelling up a failed call
//!
//! # Ownership
//!
//! `ObjPtr` is `Copy` and carries no ownership by itself. Whoever holds a
//! pointer either owns one reference (it came from [`ObjPtr::new`], from
//! [`Obj::inc_ref`] or from a method returning [`Ret::Incremented`]) or
//! borrows it from an owner that outlives the use. The bridge wraps owned
//! references in handles so they are released exactly once.
//!
//! # Destruction
//!
//! When the count reaches zero the class's private `Destroy` method runs,
//! releasing any references the object holds, and the record is freed. The
//! path performs no logging and no allocation so it can run from host
//! finalizers during teardown.

use crate::error::{Error, Result};
use crate::runtime::bootstrap;
use crate::runtime::class::{ClassDescriptor, Imp, flags};
use fxhash::FxHashMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Number of mortal objects currently allocated.
static LIVE_OBJECTS: AtomicUsize = AtomicUsize::new(0);

/// Returns the number of mortal objects currently alive.
///
/// Intended for leak checks in tests and benchmarks.
#[must_use]
pub fn live_objects() -> usize {
    LIVE_OBJECTS.load(Ordering::Acquire)
}

/// Instance data of a native object.
pub enum Payload {
    Empty,
    Str(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// String keys to owned value references.
    Hash(RwLock<FxHashMap<String, ObjPtr>>),
    /// Owned element references; `None` is a null slot.
    Vector(RwLock<Vec<Option<ObjPtr>>>),
    /// Error message.
    Err(RwLock<String>),
}

/// A native object record.
pub struct Obj {
    class: &'static ClassDescriptor,
    immortal: bool,
    refcount: AtomicU32,
    payload: Payload,
}

impl Obj {
    /// The object's dynamic class.
    #[must_use]
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    /// Current reference count. Immortal objects always report 1.
    #[must_use]
    pub fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_immortal(&self) -> bool {
        self.immortal
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Pointer to this object, without touching the count.
    #[must_use]
    pub fn as_ptr(&self) -> ObjPtr {
        ObjPtr(NonNull::from(self))
    }

    /// Adds a reference and returns the pointer that now owns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefCountOverflow`] if the count is saturated; the
    /// count is left unchanged.
    pub fn inc_ref(&self) -> Result<ObjPtr> {
        if !self.immortal {
            self.refcount
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                    count.checked_add(1)
                })
                .map_err(|_| Error::RefCountOverflow)?;
        }
        Ok(self.as_ptr())
    }

    /// Returns true if the object's class is `class` or descends from it.
    #[must_use]
    pub fn is_a(&self, class: &ClassDescriptor) -> bool {
        self.class.is_subclass_of(class)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self.payload {
            Payload::Integer(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self.payload {
            Payload::Float(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Copy of the message if this is an error object.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match &self.payload {
            Payload::Err(mess) => Some(
                mess.read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .clone(),
            ),
            _ => None,
        }
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obj")
            .field("class", &self.class.name())
            .field("refcount", &self.refcount())
            .field("immortal", &self.immortal)
            .finish_non_exhaustive()
    }
}

/// Raw pointer to a native object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjPtr(NonNull<Obj>);

impl ObjPtr {
    /// Allocates an object with a refcount of 1, owned by the caller.
    ///
    /// Instances of classes flagged `IMMORTAL` are never freed.
    #[must_use]
    pub fn new(class: &'static ClassDescriptor, payload: Payload) -> ObjPtr {
        let immortal = class.flags() & flags::IMMORTAL != 0;
        if !immortal {
            LIVE_OBJECTS.fetch_add(1, Ordering::AcqRel);
        }
        let boxed = Box::new(Obj {
            class,
            immortal,
            refcount: AtomicU32::new(1),
            payload,
        });
        ObjPtr(NonNull::from(Box::leak(boxed)))
    }

    /// Raw address, for identity checks and diagnostics.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Dereferences the pointer.
    ///
    /// # Safety
    ///
    /// The object must stay alive for `'a`: the caller owns a reference, or
    /// borrows from an owner that outlives `'a`.
    #[must_use]
    pub unsafe fn get<'a>(self) -> &'a Obj {
        // SAFETY: liveness is guaranteed by the caller
        unsafe { &*self.0.as_ptr() }
    }

    /// Gives up one reference, destroying the object when none remain.
    ///
    /// Returns the count left afterwards. Immortal objects are untouched and
    /// report 1.
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released, and must not use
    /// the pointer afterwards unless it owns another reference.
    pub unsafe fn dec_ref(self) -> u32 {
        // SAFETY: the caller owns a reference, so the object is alive
        let obj = unsafe { self.get() };
        if obj.immortal {
            return 1;
        }

        let old = obj.refcount.fetch_sub(1, Ordering::AcqRel);
        if old == 1 {
            // SAFETY: last reference, nobody else can observe the object
            unsafe { destroy(self) };
            0
        } else {
            old - 1
        }
    }
}

impl fmt::Debug for ObjPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjPtr({:#x})", self.addr())
    }
}

// SAFETY: ObjPtr is Send because:
// - the pointee lives on the heap and never moves
// - refcounts are atomic and payload mutation goes through RwLock
unsafe impl Send for ObjPtr {}

// SAFETY: ObjPtr is Sync because:
// - copying a pointer across threads does not touch the pointee
// - every shared access path on Obj is atomic or lock-protected
unsafe impl Sync for ObjPtr {}

/// Runs `Destroy` and frees the record.
///
/// # Safety
///
/// `ptr` must be the last reference to a mortal object created by
/// [`ObjPtr::new`].
unsafe fn destroy(ptr: ObjPtr) {
    // SAFETY: the object is still allocated until the Box below is dropped
    let obj = unsafe { ptr.get() };
    if let Some(method) = obj.class.method("Destroy") {
        if let Imp::Instance(imp) = method.imp() {
            // Nothing can catch a throw during teardown and this path does
            // not log, so the error is dropped. The record is freed anyway.
            if let Err(thrown) = imp(obj, &[]) {
                drop(thrown);
            }
        }
    }
    LIVE_OBJECTS.fetch_sub(1, Ordering::AcqRel);
    // SAFETY: allocated with Box in ObjPtr::new; no references remain
    drop(unsafe { Box::from_raw(ptr.0.as_ptr()) });
}

/// A validated argument handed to a native implementation.
///
/// Object arguments are borrowed; the caller keeps them alive for the
/// duration of the call.
#[derive(Clone, Copy, Debug)]
pub enum Arg<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Obj(&'a Obj),
}

impl<'a> Arg<'a> {
    /// Fetches argument `index` from `args`.
    ///
    /// # Errors
    ///
    /// Throws if the argument is missing.
    pub fn at(args: &[Arg<'a>], index: usize) -> NativeResult<Arg<'a>> {
        args.get(index)
            .copied()
            .ok_or_else(|| Thrown::msg(format!("Missing argument {index}")))
    }

    /// # Errors
    ///
    /// Throws if the argument is not an integer.
    pub fn int(self) -> NativeResult<i64> {
        match self {
            Arg::Int(value) => Ok(value),
            other => Err(Thrown::msg(format!("Expected integer, got {other:?}"))),
        }
    }

    /// # Errors
    ///
    /// Throws if the argument is not numeric.
    pub fn float(self) -> NativeResult<f64> {
        match self {
            Arg::Float(value) => Ok(value),
            #[allow(clippy::cast_precision_loss)]
            Arg::Int(value) => Ok(value as f64),
            other => Err(Thrown::msg(format!("Expected float, got {other:?}"))),
        }
    }

    /// # Errors
    ///
    /// Throws if the argument is not a boolean.
    pub fn bool(self) -> NativeResult<bool> {
        match self {
            Arg::Bool(value) => Ok(value),
            other => Err(Thrown::msg(format!("Expected bool, got {other:?}"))),
        }
    }

    /// Object argument, `None` for null.
    ///
    /// # Errors
    ///
    /// Throws if the argument is neither an object nor null.
    pub fn obj(self) -> NativeResult<Option<&'a Obj>> {
        match self {
            Arg::Obj(obj) => Ok(Some(obj)),
            Arg::Null => Ok(None),
            other => Err(Thrown::msg(format!("Expected object, got {other:?}"))),
        }
    }

    /// # Errors
    ///
    /// Throws if the argument is not a string object.
    pub fn text(self) -> NativeResult<&'a str> {
        match self {
            Arg::Obj(obj) => obj.as_text().ok_or_else(|| {
                Thrown::msg(format!("Expected string, got {}", obj.class().name()))
            }),
            other => Err(Thrown::msg(format!("Expected string, got {other:?}"))),
        }
    }
}

/// Value returned by a native implementation.
#[derive(Debug)]
pub enum Ret {
    Void,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// The caller receives ownership of one reference.
    Incremented(ObjPtr),
    /// The object is owned elsewhere and outlives the call.
    Borrowed(ObjPtr),
    Pointer(*const u8),
}

/// Result of a native call: a value, or a thrown error object.
pub type NativeResult<T> = std::result::Result<T, Thrown>;

/// A native error object in flight, owning one reference to it.
pub struct Thrown {
    err: ObjPtr,
}

impl Thrown {
    /// Creates an error object of `class` carrying `message`.
    ///
    /// `class` should be `Clownfish::Err` or one of its subclasses.
    #[must_use]
    pub fn new(class: &'static ClassDescriptor, message: impl Into<String>) -> Self {
        Thrown {
            err: ObjPtr::new(class, Payload::Err(RwLock::new(message.into()))),
        }
    }

    /// Creates a plain `Clownfish::Err`.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(bootstrap::core().err, message)
    }

    /// Takes ownership of an existing error reference.
    ///
    /// # Safety
    ///
    /// The caller must own one reference to `err`, which passes to the
    /// returned value.
    #[must_use]
    pub unsafe fn from_raw(err: ObjPtr) -> Self {
        Thrown { err }
    }

    /// The error object.
    #[must_use]
    pub fn object(&self) -> &Obj {
        // SAFETY: self owns a reference for as long as it exists
        unsafe { self.err.get() }
    }

    /// Copy of the error message. Non-error objects yield their class name.
    #[must_use]
    pub fn message(&self) -> String {
        let obj = self.object();
        obj.error_message()
            .unwrap_or_else(|| obj.class().name().to_string())
    }

    /// Hands the owned reference to the caller.
    #[must_use]
    pub fn into_raw(self) -> ObjPtr {
        let err = self.err;
        std::mem::forget(self);
        err
    }
}

impl Drop for Thrown {
    fn drop(&mut self) {
        // SAFETY: self owns exactly one reference
        unsafe {
            self.err.dec_ref();
        }
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thrown")
            .field("class", &self.object().class().name())
            .field("message", &self.message())
            .finish()
    }
}

impl From<Error> for Thrown {
    fn from(err: Error) -> Self {
        Thrown::msg(err.to_string())
    }
}
