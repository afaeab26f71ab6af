use std::{marker::PhantomData, ptr::NonNull};

use crate::{errors::*, sys};

/// An opaque handle to the JNI environment (`JNIEnv`) of the thread that obtained it.
///
/// The handle is only valid on its own thread and only while that thread remains attached to the
/// Java VM, so it is neither `Send` nor `Sync`.
///
/// This crate never dereferences the handle; pass [`EnvHandle::as_raw`] to your JNI bindings of
/// choice to make calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EnvHandle {
    raw: NonNull<sys::JNIEnv>,
    _not_send_sync: PhantomData<*const ()>,
}

impl EnvHandle {
    /// Wraps a raw `JNIEnv` pointer.
    ///
    /// # Safety
    ///
    /// `raw` must be the `JNIEnv` pointer of the current thread. Only does a null check.
    pub unsafe fn from_raw(raw: *mut sys::JNIEnv) -> Result<Self> {
        let raw = NonNull::new(raw).ok_or(Error::NullPtr("EnvHandle::from_raw"))?;
        Ok(Self::from_non_null(raw))
    }

    pub(crate) fn from_non_null(raw: NonNull<sys::JNIEnv>) -> Self {
        Self {
            raw,
            _not_send_sync: PhantomData,
        }
    }

    /// Returns the raw `JNIEnv` pointer.
    pub fn as_raw(&self) -> *mut sys::JNIEnv {
        self.raw.as_ptr()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static_assertions::assert_not_impl_any!(EnvHandle: Send);
    static_assertions::assert_not_impl_any!(EnvHandle: Sync);

    #[test]
    fn null_env_is_rejected() {
        let res = unsafe { EnvHandle::from_raw(std::ptr::null_mut()) };
        assert!(matches!(res, Err(Error::NullPtr(_))));
    }

    #[test]
    fn raw_pointer_round_trips() {
        let mut fake: usize = 0;
        let raw = &mut fake as *mut usize as *mut sys::JNIEnv;
        let handle = unsafe { EnvHandle::from_raw(raw) }.unwrap();
        assert_eq!(handle.as_raw(), raw);
    }
}
