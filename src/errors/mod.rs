use thiserror::Error;

use crate::sys;

mod policy;
pub use self::policy::*;
pub(crate) use self::policy::report_detach_failure;

/// Result type where the error is [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can be returned by the environment cache
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A JNI invocation interface call returned an error code
    #[error("JNI call failed: {0}")]
    JniCall(#[source] JniError),
    /// A null pointer was passed where a valid pointer is required
    #[error("Null pointer in {0}")]
    NullPtr(&'static str),
    /// The cache was used before the library's load hook ran
    #[error("The environment cache has not been installed")]
    Uninitialized,
    /// The load hook ran while the cache was already installed and loaded
    #[error("The environment cache is already installed")]
    AlreadyInstalled,
    /// The library's unload hook has run
    #[error("The environment cache has been unloaded")]
    Unloaded,
    /// The per-thread slot could not be allocated or is already destroyed
    #[error("Thread local storage for the JNI environment is unavailable")]
    SlotUnavailable,
}

/// Raw JNI invocation interface errors, one per `JNI_E*` return code
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum JniError {
    /// `JNI_ERR`
    #[error("Unknown error")]
    Unknown,
    /// `JNI_EDETACHED`
    #[error("Current thread is not attached to the Java VM")]
    ThreadDetached,
    /// `JNI_EVERSION`
    #[error("JNI version error")]
    WrongVersion,
    /// `JNI_ENOMEM`
    #[error("Not enough memory")]
    NoMemory,
    /// `JNI_EEXIST`
    #[error("VM already created")]
    AlreadyCreated,
    /// `JNI_EINVAL`
    #[error("Invalid arguments")]
    InvalidArguments,
    /// Any other non-zero code
    #[error("Error code {0}")]
    Other(sys::jint),
}

impl Error {
    /// Returns `true` if this error means the calling thread isn't attached
    pub fn is_thread_detached(&self) -> bool {
        matches!(self, Error::JniCall(JniError::ThreadDetached))
    }
}

/// Converts a JNI invocation interface return code into a `Result`
pub fn jni_error_code_to_result(code: sys::jint) -> Result<()> {
    match code {
        sys::JNI_OK => Ok(()),
        sys::JNI_ERR => Err(JniError::Unknown),
        sys::JNI_EDETACHED => Err(JniError::ThreadDetached),
        sys::JNI_EVERSION => Err(JniError::WrongVersion),
        sys::JNI_ENOMEM => Err(JniError::NoMemory),
        sys::JNI_EEXIST => Err(JniError::AlreadyCreated),
        sys::JNI_EINVAL => Err(JniError::InvalidArguments),
        _ => Err(JniError::Other(code)),
    }
    .map_err(Error::JniCall)
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn return_codes_map_to_errors() {
        assert!(jni_error_code_to_result(sys::JNI_OK).is_ok());
        assert_matches!(
            jni_error_code_to_result(sys::JNI_EDETACHED),
            Err(Error::JniCall(JniError::ThreadDetached))
        );
        assert_matches!(
            jni_error_code_to_result(sys::JNI_EVERSION),
            Err(Error::JniCall(JniError::WrongVersion))
        );
        assert_matches!(
            jni_error_code_to_result(sys::JNI_ENOMEM),
            Err(Error::JniCall(JniError::NoMemory))
        );
        assert_matches!(
            jni_error_code_to_result(-42),
            Err(Error::JniCall(JniError::Other(-42)))
        );
    }

    #[test]
    fn detached_is_recognized() {
        let err = jni_error_code_to_result(sys::JNI_EDETACHED).unwrap_err();
        assert!(err.is_thread_detached());
        assert!(!Error::Unloaded.is_thread_detached());
        assert_eq!(
            err.to_string(),
            "JNI call failed: Current thread is not attached to the Java VM"
        );
    }
}
