//! `Clownfish::Err`, the native error object.

use crate::error::Result;
use crate::runtime::class::{ClassDescriptor, Method};
use crate::runtime::object::{Arg, NativeResult, Obj, ObjPtr, Payload, Ret, Thrown};
use crate::runtime::{string, write};
use std::sync::RwLock;

pub(crate) fn build(parent: &'static ClassDescriptor) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Err", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@T", &["mess"], init))
        .method(Method::instance("Get_Mess", "T", &[], get_mess))
        .method(Method::instance("Cat_Mess", "vT", &["mess"], cat_mess))
        .method(Method::instance("To_String", "T", &[], get_mess))
        .method(Method::inert("rethrow", "v@<Clownfish::Err>", &["error"], rethrow))
        .build()
}

fn init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let mess = Arg::at(args, 0)?.text()?;
    let err = ObjPtr::new(class, Payload::Err(RwLock::new(mess.to_string())));
    Ok(Ret::Incremented(err))
}

fn get_mess(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let mess = obj
        .error_message()
        .ok_or_else(|| Thrown::msg(format!("{} is not an error", obj.class().name())))?;
    Ok(Ret::Incremented(string::new_string(mess)))
}

fn cat_mess(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let extra = Arg::at(args, 0)?.text()?;
    match obj.payload() {
        Payload::Err(mess) => write(mess).push_str(extra),
        _ => return Err(Thrown::msg(format!("{} is not an error", obj.class().name()))),
    }
    Ok(Ret::Void)
}

/// Throws the given error object again.
fn rethrow(args: &[Arg<'_>]) -> NativeResult<Ret> {
    let err = Arg::at(args, 0)?
        .obj()?
        .ok_or_else(|| Thrown::msg("Can't rethrow a null error"))?;
    let owned = err.inc_ref()?;
    // SAFETY: `owned` carries the reference taken just above
    Err(unsafe { Thrown::from_raw(owned) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::bootstrap;

    #[test]
    fn test_cat_mess_appends() {
        let core = bootstrap::core();
        let mess = string::new_string("oops");
        let suffix = string::new_string(" again");
        let (mess_obj, suffix_obj) = unsafe { (mess.get(), suffix.get()) };

        let Ret::Incremented(err) = init(core.err, &[Arg::Obj(mess_obj)]).unwrap() else {
            panic!("expected an error object");
        };
        let obj = unsafe { err.get() };

        cat_mess(obj, &[Arg::Obj(suffix_obj)]).unwrap();
        assert_eq!(obj.error_message().as_deref(), Some("oops again"));

        unsafe {
            mess.dec_ref();
            suffix.dec_ref();
            err.dec_ref();
        }
    }

    #[test]
    fn test_rethrow_takes_a_reference() {
        let thrown = Thrown::msg("boom");
        let obj = thrown.object();

        let again = rethrow(&[Arg::Obj(obj)]).unwrap_err();
        assert_eq!(obj.refcount(), 2);
        assert_eq!(again.message(), "boom");
        drop(again);
        assert_eq!(obj.refcount(), 1);
    }
}
