//! `Clownfish::Vector`: an ordered list of owned, nullable references.

use crate::error::Result;
use crate::runtime::bootstrap;
use crate::runtime::class::{ClassDescriptor, Method};
use crate::runtime::object::{Arg, NativeResult, Obj, ObjPtr, Payload, Ret, Thrown};
use crate::runtime::{read, write};
use std::sync::RwLock;

/// Wraps already-owned element references in a new vector owned by the
/// caller.
#[must_use]
pub fn new_vector(elements: Vec<Option<ObjPtr>>) -> ObjPtr {
    ObjPtr::new(bootstrap::core().vector, Payload::Vector(RwLock::new(elements)))
}

pub(crate) fn build(parent: &'static ClassDescriptor) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Vector", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@?z", &["capacity"], init))
        .method(Method::instance("Push", "v?@", &["element"], push))
        .method(Method::instance("Push_All", "v@<Clownfish::Vector>", &["other"], push_all))
        .method(Method::instance("Insert", "vz?@", &["tick", "element"], insert))
        .method(Method::instance("Fetch", "?@z", &["tick"], fetch))
        .method(Method::instance("Pop", "?@", &[], pop))
        .method(Method::instance("Get_Size", "q", &[], get_size))
        .method(Method::instance("Destroy", "v", &[], destroy).map(Method::private))
        .build()
}

fn elements(obj: &Obj) -> NativeResult<&RwLock<Vec<Option<ObjPtr>>>> {
    match obj.payload() {
        Payload::Vector(elems) => Ok(elems),
        _ => Err(Thrown::msg(format!("{} is not a vector", obj.class().name()))),
    }
}

fn tick(arg: Arg<'_>) -> NativeResult<usize> {
    usize::try_from(arg.int()?).map_err(|_| Thrown::msg("Tick cannot be negative"))
}

/// Takes a new reference to a nullable element.
fn retain(element: Option<&Obj>) -> NativeResult<Option<ObjPtr>> {
    Ok(match element {
        Some(obj) => Some(obj.inc_ref()?),
        None => None,
    })
}

fn init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let capacity = match Arg::at(args, 0)? {
        Arg::Null => 0,
        arg => tick(arg)?,
    };
    let mut elems = Vec::new();
    elems
        .try_reserve(capacity)
        .map_err(|_| Thrown::msg(format!("Cannot allocate a vector of capacity {capacity}")))?;
    Ok(Ret::Incremented(ObjPtr::new(class, Payload::Vector(RwLock::new(elems)))))
}

fn push(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let element = retain(Arg::at(args, 0)?.obj()?)?;
    write(elements(obj)?).push(element);
    Ok(Ret::Void)
}

fn push_all(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let other = Arg::at(args, 0)?
        .obj()?
        .ok_or_else(|| Thrown::msg("Push_All requires a vector"))?;

    // Retain under the read lock, then append: `other` may be `obj` itself.
    let retained = {
        let source = read(elements(other)?);
        let mut retained = Vec::with_capacity(source.len());
        for element in source.iter() {
            // SAFETY: `other` owns each element while its lock is held
            match retain(element.map(|ptr| unsafe { ptr.get() })) {
                Ok(element) => retained.push(element),
                Err(thrown) => {
                    for element in retained.into_iter().flatten() {
                        // SAFETY: taken by `retain` above
                        unsafe { element.dec_ref() };
                    }
                    return Err(thrown);
                }
            }
        }
        retained
    };

    write(elements(obj)?).extend(retained);
    Ok(Ret::Void)
}

fn insert(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let at = tick(Arg::at(args, 0)?)?;
    let element = Arg::at(args, 1)?.obj()?;

    let mut elems = write(elements(obj)?);
    if at > elems.len() {
        return Err(Thrown::msg(format!(
            "Tick {at} out of bounds for vector of size {}",
            elems.len()
        )));
    }
    elems.insert(at, retain(element)?);
    Ok(Ret::Void)
}

fn fetch(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let at = tick(Arg::at(args, 0)?)?;
    // Retained under the lock: a concurrent pop may release the element.
    let elems = read(elements(obj)?);
    Ok(match elems.get(at) {
        // SAFETY: the vector owns the element while its lock is held
        Some(Some(element)) => Ret::Incremented(unsafe { element.get() }.inc_ref()?),
        _ => Ret::Null,
    })
}

fn pop(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(match write(elements(obj)?).pop() {
        Some(Some(element)) => Ret::Incremented(element),
        _ => Ret::Null,
    })
}

fn get_size(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let size = read(elements(obj)?).len();
    Ok(Ret::Int(i64::try_from(size).unwrap_or(i64::MAX)))
}

fn destroy(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    if let Payload::Vector(elems) = obj.payload() {
        for element in write(elems).drain(..).flatten() {
            // SAFETY: the vector owned one reference per element
            unsafe { element.dec_ref() };
        }
    }
    Ok(Ret::Void)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::string;

    #[test]
    fn test_push_all_from_itself() {
        let vec = new_vector(vec![Some(string::new_string("a")), None]);
        let obj = unsafe { vec.get() };

        push_all(obj, &[Arg::Obj(obj)]).unwrap();
        assert!(matches!(get_size(obj, &[]).unwrap(), Ret::Int(4)));

        let Ret::Incremented(first) = fetch(obj, &[Arg::Int(0)]).unwrap() else {
            panic!("expected an element");
        };
        assert_eq!(unsafe { first.get() }.refcount(), 3);
        unsafe { first.dec_ref() };
        assert!(matches!(fetch(obj, &[Arg::Int(1)]).unwrap(), Ret::Null));

        unsafe { vec.dec_ref() };
    }

    #[test]
    fn test_insert_out_of_bounds_throws() {
        let vec = new_vector(Vec::new());
        let obj = unsafe { vec.get() };

        let thrown = insert(obj, &[Arg::Int(3), Arg::Null]).unwrap_err();
        assert_eq!(thrown.message(), "Tick 3 out of bounds for vector of size 0");

        insert(obj, &[Arg::Int(0), Arg::Null]).unwrap();
        assert!(matches!(get_size(obj, &[]).unwrap(), Ret::Int(1)));

        unsafe { vec.dec_ref() };
    }

    #[test]
    fn test_huge_capacity_throws() {
        let class = bootstrap::core().vector;
        let thrown = init(class, &[Arg::Int(i64::MAX)]).unwrap_err();
        assert!(thrown.message().starts_with("Cannot allocate a vector"));
    }
}
