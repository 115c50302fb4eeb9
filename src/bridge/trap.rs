//! Trapped native calls.
//!
//! A call's receiver and temporary arguments are owned by an [`ArgFrame`].
//! [`run_trapped`] invokes the native implementation, converts the result
//! while the frame is still alive, then drops the frame, so temporaries are
//! released on success, on a thrown error and on unwinding alike.

use crate::bridge::exception::{ExceptionMap, HostException, HostResult};
use crate::bridge::marshal::HostValue;
use crate::error::{Error, Result};
use crate::runtime::{Arg, ClassDescriptor, Imp, Obj, ObjPtr, Ret};

/// Owned references released together on drop.
#[derive(Debug, Default)]
pub(crate) struct DecrefList {
    owned: Vec<ObjPtr>,
}

impl DecrefList {
    /// Takes ownership of one reference and returns the pointer.
    pub(crate) fn push(&mut self, owned: ObjPtr) -> ObjPtr {
        self.owned.push(owned);
        owned
    }

    pub(crate) fn len(&self) -> usize {
        self.owned.len()
    }
}

impl Drop for DecrefList {
    fn drop(&mut self) {
        for ptr in self.owned.drain(..) {
            // SAFETY: every pointer in the list carries a reference it owns
            unsafe {
                ptr.dec_ref();
            }
        }
    }
}

/// One validated argument. Objects are owned by the frame's temporaries.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Obj(ObjPtr),
}

/// Receiver and arguments of one native call.
#[derive(Debug, Default)]
pub(crate) struct ArgFrame {
    receiver: Option<ObjPtr>,
    slots: Vec<Slot>,
    temps: DecrefList,
}

impl ArgFrame {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs the receiver, taking ownership of one reference to it.
    pub(crate) fn set_receiver(&mut self, owned: ObjPtr) {
        self.receiver = Some(self.temps.push(owned));
    }

    /// Keeps `owned` alive until the frame is dropped.
    pub(crate) fn adopt(&mut self, owned: ObjPtr) -> ObjPtr {
        self.temps.push(owned)
    }

    /// Appends an argument. Object slots must point at adopted references.
    pub(crate) fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    /// References held by the frame, receiver included.
    #[cfg(test)]
    pub(crate) fn temp_count(&self) -> usize {
        self.temps.len()
    }

    fn receiver(&self) -> Option<&Obj> {
        // SAFETY: the receiver's reference is held in `temps`
        self.receiver.map(|ptr| unsafe { ptr.get() })
    }

    pub(crate) fn args(&self) -> Vec<Arg<'_>> {
        self.slots
            .iter()
            .map(|slot| match *slot {
                Slot::Null => Arg::Null,
                Slot::Bool(b) => Arg::Bool(b),
                Slot::Int(n) => Arg::Int(n),
                Slot::Float(x) => Arg::Float(x),
                // SAFETY: object slots are adopted into `temps`
                Slot::Obj(ptr) => Arg::Obj(unsafe { ptr.get() }),
            })
            .collect()
    }
}

/// Invokes `imp` with the frame's receiver and arguments.
///
/// `class` is the class being instantiated and only matters for
/// constructors. `convert` runs before the frame is released; a thrown
/// native error is translated through `exceptions`.
///
/// # Errors
///
/// The translated native error, or the conversion error.
pub(crate) fn run_trapped<F>(
    frame: ArgFrame,
    imp: Imp,
    class: &'static ClassDescriptor,
    exceptions: &ExceptionMap,
    convert: F,
) -> HostResult<HostValue>
where
    F: FnOnce(Ret) -> Result<HostValue>,
{
    let outcome = {
        let args = frame.args();
        match imp {
            Imp::Instance(f) => match frame.receiver() {
                Some(receiver) => f(receiver, &args),
                None => {
                    return Err(Error::NativeRuntime {
                        message: format!("{} method called without a receiver", class.name()),
                    }
                    .into());
                }
            },
            Imp::Constructor(f) => f(class, &args),
            Imp::Inert(f) => f(&args),
        }
    };

    let result = match outcome {
        Ok(ret) => convert(ret).map_err(HostException::from),
        Err(thrown) => Err(exceptions.translate(thrown)),
    };
    drop(frame);
    result
}
