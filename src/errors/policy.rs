use std::{
    io::{self, Write},
    thread::Thread,
};

use log::{error, warn};

use super::Error;

/// Diagnostic printed to stderr before the process terminates on an attachment failure.
pub const ATTACH_FAILURE_DIAGNOSTIC: &str = "[jni-env-cache] Failed to attach native thread to the JVM.";

/// Diagnostic printed to stderr when a thread fails to detach.
pub const DETACH_FAILURE_DIAGNOSTIC: &str =
    "[jni-env-cache] Failed to detach native thread from the JVM.";

/// What to do when the JVM refuses to attach a thread.
///
/// A thread that can't reach the JVM has no way to report the problem to Java and can't make
/// progress, so the terminating APIs ([`EnvCache::get_cached`], [`EnvCache::attach`] and
/// [`EnvCache::attach_daemon`]) end the process. Use the `try_` variants to handle the error
/// instead.
///
/// [`EnvCache::get_cached`]: crate::EnvCache::get_cached
/// [`EnvCache::attach`]: crate::EnvCache::attach
/// [`EnvCache::attach_daemon`]: crate::EnvCache::attach_daemon
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachFailurePolicy {
    /// Call [`std::process::exit`] with the given status code
    Exit(i32),
    /// Call [`std::process::abort`]
    Abort,
}

impl Default for AttachFailurePolicy {
    fn default() -> Self {
        AttachFailurePolicy::Exit(1)
    }
}

impl AttachFailurePolicy {
    /// Reports the failure on stderr and terminates the process.
    pub fn terminate(self, err: &Error, thread: &Thread) -> ! {
        error!(
            "Failed to attach thread {} ({:?}) to the JVM: {}",
            thread.name().unwrap_or_default(),
            thread.id(),
            err
        );

        // Written straight to the stderr handle so that the message survives output capturing
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{ATTACH_FAILURE_DIAGNOSTIC} ({err})");
        let _ = stderr.flush();
        drop(stderr);

        match self {
            AttachFailurePolicy::Exit(code) => std::process::exit(code),
            AttachFailurePolicy::Abort => std::process::abort(),
        }
    }
}

/// Reports a failed detachment. The thread carries on, possibly still attached.
pub(crate) fn report_detach_failure(err: &Error, thread: &Thread) {
    warn!(
        "Error detaching thread {} ({:?}) from the JVM: {}",
        thread.name().unwrap_or_default(),
        thread.id(),
        err
    );

    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{DETACH_FAILURE_DIAGNOSTIC} ({err})");
    let _ = stderr.flush();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_policy_exits_with_status_one() {
        assert_eq!(AttachFailurePolicy::default(), AttachFailurePolicy::Exit(1));
    }
}
