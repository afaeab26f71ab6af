use crate::{errors::AttachFailurePolicy, JNIVersion, ThreadKind};

/// Configuration for the process-wide [`EnvCache`](crate::EnvCache).
///
/// ```rust
/// # use jni_env_cache::{errors::AttachFailurePolicy, CacheConfig, JNIVersion, ThreadKind};
/// let config = CacheConfig::new()
///     .version(JNIVersion::V1_8)
///     .cached_kind(ThreadKind::Normal)
///     .thread_names(false)
///     .on_attach_failure(AttachFailurePolicy::Abort);
/// assert_eq!(config.get_version(), JNIVersion::V1_8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    version: JNIVersion,
    cached_kind: ThreadKind,
    thread_names: bool,
    attach_failure: AttachFailurePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: JNIVersion::V1_6,
            cached_kind: ThreadKind::Daemon,
            thread_names: true,
            attach_failure: AttachFailurePolicy::default(),
        }
    }
}

impl CacheConfig {
    /// The default configuration: JNI 1.6, daemon attachment, named threads, exit(1) on failure.
    pub fn new() -> Self {
        Self::default()
    }

    /// The JNI version passed to `GetEnv` and requested when attaching.
    ///
    /// This is also the version `JNI_OnLoad` reports to the VM.
    pub fn version(mut self, version: JNIVersion) -> Self {
        self.version = version;
        self
    }

    /// How [`EnvCache::get_cached`](crate::EnvCache::get_cached) attaches a thread that isn't
    /// attached yet.
    pub fn cached_kind(mut self, kind: ThreadKind) -> Self {
        self.cached_kind = kind;
        self
    }

    /// Whether to give the VM the Rust thread's name when attaching.
    pub fn thread_names(mut self, enabled: bool) -> Self {
        self.thread_names = enabled;
        self
    }

    /// What to do when the VM refuses to attach a thread.
    pub fn on_attach_failure(mut self, policy: AttachFailurePolicy) -> Self {
        self.attach_failure = policy;
        self
    }

    /// See [`CacheConfig::version`]
    pub fn get_version(&self) -> JNIVersion {
        self.version
    }

    /// See [`CacheConfig::cached_kind`]
    pub fn get_cached_kind(&self) -> ThreadKind {
        self.cached_kind
    }

    /// See [`CacheConfig::thread_names`]
    pub fn get_thread_names(&self) -> bool {
        self.thread_names
    }

    /// See [`CacheConfig::on_attach_failure`]
    pub fn get_attach_failure(&self) -> AttachFailurePolicy {
        self.attach_failure
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_jni_onload() {
        let config = CacheConfig::default();
        assert_eq!(config.get_version(), JNIVersion::V1_6);
        assert_eq!(config.get_cached_kind(), ThreadKind::Daemon);
        assert!(config.get_thread_names());
        assert_eq!(config.get_attach_failure(), AttachFailurePolicy::Exit(1));
    }

    #[test]
    fn builder_overrides() {
        let config = CacheConfig::new()
            .version(JNIVersion::V10)
            .cached_kind(ThreadKind::Normal)
            .thread_names(false)
            .on_attach_failure(AttachFailurePolicy::Exit(3));
        assert_eq!(config.get_version(), JNIVersion::V10);
        assert_eq!(config.get_cached_kind(), ThreadKind::Normal);
        assert!(!config.get_thread_names());
        assert_eq!(config.get_attach_failure(), AttachFailurePolicy::Exit(3));
    }
}
