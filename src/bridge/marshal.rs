//! Conversion between host values and native objects.
//!
//! Native to host: strings, numbers and booleans are copied out, vectors
//! become lists and hashes become dicts, element by element. Anything else
//! is wrapped in a [`HostObject`] that owns one reference.
//!
//! Host to native: every argument is checked against its parameter's
//! [`TypeSpec`] before any native code runs. Values that need a native
//! object, like a host string passed as `T`, get a temporary one owned by
//! the call's [`ArgFrame`] and released when the frame is dropped.

use crate::bridge::handle::NativeHandle;
use crate::bridge::host::{CallArgs, HostObject};
use crate::bridge::trap::{ArgFrame, Slot};
use crate::error::{Error, Result};
use crate::runtime::encoding::{TypeKind, TypeSpec};
use crate::runtime::registry::ClassRegistry;
use crate::runtime::{Method, Obj, ObjPtr, Payload, Ret, core, read, string, vector};
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A value on the host side of the boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<HostValue>),
    Dict(BTreeMap<String, HostValue>),
    Object(HostObject),
}

impl HostValue {
    /// Host type name, as shown in argument errors.
    #[must_use]
    pub fn kind_name(&self) -> String {
        match self {
            HostValue::None => "NoneType".to_string(),
            HostValue::Bool(_) => "bool".to_string(),
            HostValue::Int(_) => "int".to_string(),
            HostValue::Float(_) => "float".to_string(),
            HostValue::Str(_) => "str".to_string(),
            HostValue::List(_) => "list".to_string(),
            HostValue::Dict(_) => "dict".to_string(),
            HostValue::Object(obj) => obj.class().name().to_string(),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, HostValue::None)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(i64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(value: Vec<HostValue>) -> Self {
        HostValue::List(value)
    }
}

impl From<HostObject> for HostValue {
    fn from(value: HostObject) -> Self {
        HostValue::Object(value)
    }
}

// ============================================================================
// Native to host
// ============================================================================

/// Converts a native return value into a host value.
///
/// An incremented object is released once its contents are copied or
/// wrapped.
///
/// # Errors
///
/// - [`Error::Unbindable`] for raw pointers
/// - [`Error::RefCountOverflow`] if wrapping an object fails
pub fn to_host(ret: Ret) -> Result<HostValue> {
    match ret {
        Ret::Void | Ret::Null => Ok(HostValue::None),
        Ret::Bool(value) => Ok(HostValue::Bool(value)),
        Ret::Int(value) => Ok(HostValue::Int(value)),
        Ret::Float(value) => Ok(HostValue::Float(value)),
        Ret::Borrowed(ptr) => {
            // SAFETY: borrowed results stay alive until the call frame drops
            object_to_host(unsafe { ptr.get() }, &mut Vec::new())
        }
        Ret::Incremented(ptr) => {
            // SAFETY: the returned reference passes to the handle
            let handle = unsafe { NativeHandle::acquire(ptr) };
            object_to_host(handle.object()?, &mut Vec::new())
        }
        Ret::Pointer(_) => Err(Error::Unbindable {
            method: "raw pointer return".to_string(),
        }),
    }
}

/// Converts a constructor's return value, always keeping the object.
///
/// # Errors
///
/// Returns [`Error::NativeRuntime`] if the constructor produced no object.
pub(crate) fn to_host_object(ret: Ret) -> Result<HostValue> {
    match ret {
        // SAFETY: the constructor handed over one reference
        Ret::Incremented(ptr) => Ok(HostValue::Object(HostObject::new(unsafe {
            NativeHandle::acquire(ptr)
        }))),
        // SAFETY: borrowed results stay alive until the call frame drops
        Ret::Borrowed(ptr) => wrap(unsafe { ptr.get() }),
        other => Err(Error::NativeRuntime {
            message: format!("Constructor returned {other:?} instead of an object"),
        }),
    }
}

fn wrap(obj: &Obj) -> Result<HostValue> {
    // SAFETY: `obj` is borrowed from a live owner for the whole call
    let handle = unsafe { NativeHandle::wrap(obj.as_ptr()) }?;
    Ok(HostValue::Object(HostObject::new(handle)))
}

/// `seen` holds the containers being converted; a container that contains
/// itself is wrapped instead of copied.
fn object_to_host(obj: &Obj, seen: &mut Vec<usize>) -> Result<HostValue> {
    let addr = obj.as_ptr().addr();
    match obj.payload() {
        Payload::Str(text) => Ok(HostValue::Str(text.clone())),
        Payload::Integer(value) => Ok(HostValue::Int(*value)),
        Payload::Float(value) => Ok(HostValue::Float(*value)),
        Payload::Boolean(value) => Ok(HostValue::Bool(*value)),
        Payload::Vector(elems) if !seen.contains(&addr) => {
            seen.push(addr);
            let list = read(elems)
                .iter()
                .map(|element| match element {
                    // SAFETY: the vector owns its elements while the read lock is held
                    Some(ptr) => object_to_host(unsafe { ptr.get() }, seen),
                    None => Ok(HostValue::None),
                })
                .collect::<Result<Vec<_>>>();
            seen.pop();
            Ok(HostValue::List(list?))
        }
        Payload::Hash(map) if !seen.contains(&addr) => {
            seen.push(addr);
            let dict = read(map)
                .iter()
                // SAFETY: the hash owns its values while the read lock is held
                .map(|(key, ptr)| Ok((key.clone(), object_to_host(unsafe { ptr.get() }, seen)?)))
                .collect::<Result<BTreeMap<_, _>>>();
            seen.pop();
            Ok(HostValue::Dict(dict?))
        }
        _ => wrap(obj),
    }
}

// ============================================================================
// Host to native
// ============================================================================

/// Validates `args` against `method` and pushes them onto `frame`.
///
/// Parameters the caller left out are null when nullable.
///
/// # Errors
///
/// Any argument binding or conversion error. Temporaries already pushed
/// stay owned by `frame`.
pub(crate) fn marshal_args(
    frame: &mut ArgFrame,
    registry: &ClassRegistry,
    method: &Method,
    args: &CallArgs,
) -> Result<()> {
    let names: Vec<&str> = method.params().iter().map(String::as_str).collect();
    let bound = args.bind(&names)?;
    let supplied = bound.iter().filter(|value| value.is_some()).count();

    for ((name, spec), value) in names.iter().zip(method.signature().params()).zip(bound) {
        match value {
            Some(value) => push_arg(frame, registry, name, spec, value)?,
            None if spec.nullable => frame.push(Slot::Null),
            None => {
                return Err(Error::ArgumentCount {
                    expected: names.len(),
                    got: supplied,
                });
            }
        }
    }
    Ok(())
}

fn mismatch(param: &str, spec: &TypeSpec, value: &HostValue) -> Error {
    Error::ArgumentType {
        param: param.to_string(),
        expected: spec.describe(),
        found: value.kind_name(),
    }
}

/// Converts one argument.
///
/// # Errors
///
/// - [`Error::MissingValue`] for `None` on a non-nullable parameter
/// - [`Error::Overflow`] for integers outside the parameter's width
/// - [`Error::ArgumentType`] for any other mismatch
/// - [`Error::UnknownType`] if an object constraint names no class
pub(crate) fn push_arg(
    frame: &mut ArgFrame,
    registry: &ClassRegistry,
    param: &str,
    spec: &TypeSpec,
    value: &HostValue,
) -> Result<()> {
    if value.is_none() {
        if spec.nullable {
            frame.push(Slot::Null);
            return Ok(());
        }
        return Err(Error::MissingValue {
            param: param.to_string(),
        });
    }

    match (&spec.kind, value) {
        (TypeKind::Bool, HostValue::Bool(b)) => frame.push(Slot::Bool(*b)),
        (TypeKind::Int(width), HostValue::Int(n)) => {
            if !width.contains(*n) {
                return Err(Error::Overflow {
                    param: param.to_string(),
                    value: *n,
                    width: width.name(),
                });
            }
            frame.push(Slot::Int(*n));
        }
        (TypeKind::Float, HostValue::Float(x)) => frame.push(Slot::Float(*x)),
        #[allow(clippy::cast_precision_loss)]
        (TypeKind::Float, HostValue::Int(n)) => frame.push(Slot::Float(*n as f64)),
        (TypeKind::Text, HostValue::Str(text)) => {
            let ptr = frame.adopt(string::new_string(text.as_str()));
            frame.push(Slot::Obj(ptr));
        }
        (TypeKind::Text, HostValue::Object(obj)) => {
            let ptr = frame.adopt(obj.retain()?);
            // SAFETY: the frame owns a reference to `ptr`
            if unsafe { ptr.get() }.as_text().is_none() {
                return Err(mismatch(param, spec, value));
            }
            frame.push(Slot::Obj(ptr));
        }
        (TypeKind::Object(constraint), _) => {
            let Some(owned) = new_native(param, value)? else {
                return Err(mismatch(param, spec, value));
            };
            let ptr = frame.adopt(owned);
            if let Some(name) = constraint {
                let class = registry.fetch_singleton(name)?;
                // SAFETY: the frame owns a reference to `ptr`
                if !unsafe { ptr.get() }.is_a(class) {
                    return Err(mismatch(param, spec, value));
                }
            }
            frame.push(Slot::Obj(ptr));
        }
        (TypeKind::Pointer, _) => {
            return Err(Error::Unbindable {
                method: param.to_string(),
            });
        }
        _ => return Err(mismatch(param, spec, value)),
    }
    Ok(())
}

/// Builds a native object for `value` and returns the caller's reference.
/// `None` maps to a null slot.
fn new_native(param: &str, value: &HostValue) -> Result<Option<ObjPtr>> {
    let core = core();
    let ptr = match value {
        HostValue::None => return Ok(None),
        HostValue::Object(obj) => obj.retain()?,
        HostValue::Bool(b) => core.boolean_obj(*b),
        HostValue::Int(n) => ObjPtr::new(core.integer, Payload::Integer(*n)),
        HostValue::Float(x) => ObjPtr::new(core.float, Payload::Float(*x)),
        HostValue::Str(text) => string::new_string(text.as_str()),
        HostValue::List(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                match new_native(param, item) {
                    Ok(element) => elements.push(element),
                    Err(e) => {
                        release_all(elements.into_iter().flatten());
                        return Err(e);
                    }
                }
            }
            vector::new_vector(elements)
        }
        HostValue::Dict(entries) => {
            let mut map = FxHashMap::default();
            for (key, item) in entries {
                match new_native(param, item) {
                    Ok(Some(element)) => {
                        map.insert(key.clone(), element);
                    }
                    Ok(None) => {
                        release_all(map.into_values());
                        return Err(Error::MissingValue {
                            param: format!("{param}[{key:?}]"),
                        });
                    }
                    Err(e) => {
                        release_all(map.into_values());
                        return Err(e);
                    }
                }
            }
            ObjPtr::new(core.hash, Payload::Hash(RwLock::new(map)))
        }
    };
    Ok(Some(ptr))
}

fn release_all(owned: impl IntoIterator<Item = ObjPtr>) {
    for ptr in owned {
        // SAFETY: every pointer here carries a reference built by new_native
        unsafe { ptr.dec_ref() };
    }
}
