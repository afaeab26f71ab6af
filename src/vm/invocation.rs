use std::{borrow::Cow, ffi::CString, ptr::NonNull, thread::Thread};

use crate::{errors::*, sys, JNIVersion};

/// How a native thread is attached to the Java VM.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ThreadKind {
    /// `AttachCurrentThread`: the VM won't finish shutting down while the thread is attached.
    Normal,
    /// `AttachCurrentThreadAsDaemon`: the thread doesn't hold up VM shutdown.
    #[default]
    Daemon,
}

/// Arguments passed to the VM when attaching a thread.
#[derive(Debug, Clone)]
pub struct AttachArgs {
    version: JNIVersion,
    name: Option<CString>,
}

impl AttachArgs {
    /// Attach arguments for the given JNI version, without a thread name.
    pub fn new(version: JNIVersion) -> Self {
        Self {
            version,
            name: None,
        }
    }

    /// Attach arguments that carry the name of the given Rust thread, if it has one.
    ///
    /// The name is converted to modified UTF-8, as expected by the VM.
    pub fn for_thread(version: JNIVersion, thread: &Thread) -> Self {
        let name = thread.name().and_then(|name| {
            let bytes: Cow<[u8]> = cesu8::to_java_cesu8(name);
            CString::new(bytes.into_owned()).ok()
        });
        Self { version, name }
    }

    /// The JNI version requested for the attached environment.
    pub fn version(&self) -> JNIVersion {
        self.version
    }

    /// The thread name in modified UTF-8, if any.
    pub fn name(&self) -> Option<&CString> {
        self.name.as_ref()
    }
}

/// The four invocation interface functions that are needed to manage thread attachments.
///
/// [`JavaVM`](crate::JavaVM) implements this for a real VM. Other implementations are useful to
/// simulate a VM, e.g. in tests.
///
/// # Safety
///
/// Any `JNIEnv` pointer returned must be valid for the calling thread until that thread is
/// detached. `get_env` must return `Err(Error::JniCall(JniError::ThreadDetached))` when the
/// calling thread is not attached, and must not attach it.
pub unsafe trait InvocationApi: Send + Sync + 'static {
    /// `GetEnv`: the environment of the calling thread, if it's attached.
    fn get_env(&self, version: JNIVersion) -> Result<NonNull<sys::JNIEnv>>;

    /// `AttachCurrentThread` or `AttachCurrentThreadAsDaemon`, depending on `kind`.
    ///
    /// Attaching a thread that is already attached returns its existing environment.
    fn attach_current_thread(
        &self,
        kind: ThreadKind,
        args: &AttachArgs,
    ) -> Result<NonNull<sys::JNIEnv>>;

    /// `DetachCurrentThread`.
    fn detach_current_thread(&self) -> Result<()>;
}
