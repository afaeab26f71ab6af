//! Macros for making raw invocation interface calls
//!
//! Note: `java_vm_call_unchecked!` must avoid hidden control flow like `return`
//! or `?`. `non_null!` exists only to return early.

/// Calls a `JavaVM` invocation interface function, nothing else
///
/// # Safety
///
/// The `JavaVM` pointer must be valid (it's only null-checked in `from_raw()`)
/// and the arguments must be valid for the particular function being called.
///
/// When calling any function added after JNI 1.1 you must know that it's valid
/// for the VM's JNI version.
macro_rules! java_vm_call_unchecked {
    ( $jvm:expr, $version:tt, $name:ident $(, $args:expr )*) => {{
        let jvm: *mut jni_sys::JavaVM = $jvm.get_raw();
        ((*(*jvm)).$version.$name)(jvm $(, $args)*)
    }};
}

/// Returns `Err(Error::NullPtr)` from the enclosing function if the pointer is null
macro_rules! non_null {
    ( $obj:expr, $ctx:expr ) => {
        if $obj.is_null() {
            return Err($crate::errors::Error::NullPtr($ctx));
        }
    };
}
