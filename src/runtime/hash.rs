//! `Clownfish::Hash`: string keys mapped to owned object references.

use crate::error::Result;
use crate::runtime::class::{ClassDescriptor, Method};
use crate::runtime::object::{Arg, NativeResult, Obj, ObjPtr, Payload, Ret, Thrown};
use crate::runtime::{read, string, vector, write};
use fxhash::FxHashMap;
use std::sync::RwLock;

pub(crate) fn build(parent: &'static ClassDescriptor) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Hash", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@?z", &["capacity"], init))
        .method(Method::instance("Store", "vT@", &["key", "value"], store))
        .method(Method::instance("Fetch", "?@T", &["key"], fetch))
        .method(Method::instance("Delete", "?@T", &["key"], delete))
        .method(Method::instance("Has_Key", "BT", &["key"], has_key))
        .method(Method::instance("Get_Size", "q", &[], get_size))
        .method(Method::instance("Keys", "@", &[], keys))
        .method(Method::instance("Destroy", "v", &[], destroy).map(Method::private))
        .build()
}

fn entries(obj: &Obj) -> NativeResult<&RwLock<FxHashMap<String, ObjPtr>>> {
    match obj.payload() {
        Payload::Hash(map) => Ok(map),
        _ => Err(Thrown::msg(format!("{} is not a hash", obj.class().name()))),
    }
}

fn init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let capacity = match Arg::at(args, 0)? {
        Arg::Null => 0,
        arg => usize::try_from(arg.int()?).unwrap_or(0),
    };
    let mut map = FxHashMap::default();
    map.try_reserve(capacity)
        .map_err(|_| Thrown::msg(format!("Cannot allocate a hash of capacity {capacity}")))?;
    Ok(Ret::Incremented(ObjPtr::new(class, Payload::Hash(RwLock::new(map)))))
}

fn store(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let key = Arg::at(args, 0)?.text()?;
    let value = Arg::at(args, 1)?
        .obj()?
        .ok_or_else(|| Thrown::msg("Hash values cannot be null"))?;

    let value = value.inc_ref()?;
    let replaced = write(entries(obj)?).insert(key.to_string(), value);
    if let Some(old) = replaced {
        // SAFETY: the hash owned the replaced value's reference
        unsafe { old.dec_ref() };
    }
    Ok(Ret::Void)
}

fn fetch(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let key = Arg::at(args, 0)?.text()?;
    // Retained under the lock: a concurrent store may release the old value.
    let map = read(entries(obj)?);
    Ok(match map.get(key) {
        // SAFETY: the hash owns the value while its lock is held
        Some(value) => Ret::Incremented(unsafe { value.get() }.inc_ref()?),
        None => Ret::Null,
    })
}

fn delete(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let key = Arg::at(args, 0)?.text()?;
    Ok(match write(entries(obj)?).remove(key) {
        Some(value) => Ret::Incremented(value),
        None => Ret::Null,
    })
}

fn has_key(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let key = Arg::at(args, 0)?.text()?;
    Ok(Ret::Bool(read(entries(obj)?).contains_key(key)))
}

fn get_size(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let size = read(entries(obj)?).len();
    Ok(Ret::Int(i64::try_from(size).unwrap_or(i64::MAX)))
}

/// New vector of the keys, sorted.
fn keys(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let mut names: Vec<String> = read(entries(obj)?).keys().cloned().collect();
    names.sort_unstable();
    let elements = names
        .into_iter()
        .map(|name| Some(string::new_string(name)))
        .collect();
    Ok(Ret::Incremented(vector::new_vector(elements)))
}

fn destroy(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    if let Payload::Hash(map) = obj.payload() {
        for (_, value) in write(map).drain() {
            // SAFETY: the hash owned one reference per value
            unsafe { value.dec_ref() };
        }
    }
    Ok(Ret::Void)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::bootstrap;

    fn new_hash() -> ObjPtr {
        let core = bootstrap::core();
        match init(core.hash, &[Arg::Int(4)]).unwrap() {
            Ret::Incremented(ptr) => ptr,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_store_takes_its_own_reference() {
        let hash = new_hash();
        let key = string::new_string("foo");
        let value = string::new_string("bar");
        let (hash_obj, key_obj, value_obj) =
            unsafe { (hash.get(), key.get(), value.get()) };

        store(hash_obj, &[Arg::Obj(key_obj), Arg::Obj(value_obj)]).unwrap();
        assert_eq!(value_obj.refcount(), 2);

        match fetch(hash_obj, &[Arg::Obj(key_obj)]).unwrap() {
            Ret::Incremented(found) => {
                assert_eq!(found, value);
                assert_eq!(value_obj.refcount(), 3);
                unsafe { found.dec_ref() };
            }
            other => panic!("unexpected {other:?}"),
        }

        unsafe { hash.dec_ref() };
        assert_eq!(value_obj.refcount(), 1);
        unsafe {
            key.dec_ref();
            value.dec_ref();
        }
    }

    #[test]
    fn test_replace_releases_old_value() {
        let hash = new_hash();
        let key = string::new_string("k");
        let first = string::new_string("1");
        let second = string::new_string("2");
        let (hash_obj, key_obj) = unsafe { (hash.get(), key.get()) };
        let (first_obj, second_obj) = unsafe { (first.get(), second.get()) };

        store(hash_obj, &[Arg::Obj(key_obj), Arg::Obj(first_obj)]).unwrap();
        store(hash_obj, &[Arg::Obj(key_obj), Arg::Obj(second_obj)]).unwrap();
        assert_eq!(first_obj.refcount(), 1);
        assert_eq!(second_obj.refcount(), 2);

        unsafe {
            hash.dec_ref();
            key.dec_ref();
            first.dec_ref();
            second.dec_ref();
        }
    }

    #[test]
    fn test_huge_capacity_throws() {
        let core = bootstrap::core();
        let thrown = init(core.hash, &[Arg::Int(i64::MAX)]).unwrap_err();
        assert!(thrown.message().starts_with("Cannot allocate a hash"));
    }

    #[test]
    fn test_fetch_missing_is_null() {
        let hash = new_hash();
        let key = string::new_string("missing");
        let (hash_obj, key_obj) = unsafe { (hash.get(), key.get()) };

        assert!(matches!(fetch(hash_obj, &[Arg::Obj(key_obj)]).unwrap(), Ret::Null));
        assert!(matches!(delete(hash_obj, &[Arg::Obj(key_obj)]).unwrap(), Ret::Null));

        unsafe {
            hash.dec_ref();
            key.dec_ref();
        }
    }
}
