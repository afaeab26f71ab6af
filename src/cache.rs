use std::{
    ptr::NonNull,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread::{self, Thread},
};

use log::{debug, warn};
use once_cell::sync::OnceCell;

use crate::{
    errors::*,
    slot::{Slot, SlotEntry, ThreadSlot},
    sys, AttachArgs, CacheConfig, EnvHandle, InvocationApi, ThreadKind,
};

/// There is at most one Java VM per process, and the library is loaded into it once, so the cache
/// is a process-wide singleton that's set by the load hook and never replaced.
static ENV_CACHE: OnceCell<EnvCache> = OnceCell::new();

/// The process-wide cache of per-thread JNI environments.
///
/// Installed once by the library's load hook (see [`on_load`](crate::on_load)), after which
/// [`EnvCache::singleton`] returns it from any thread.
///
/// ## Attaching Native Threads
///
/// Each thread goes through `DETACHED -> ATTACHED -> DETACHED`:
///
/// * [`get_cached`](Self::get_cached), [`attach`](Self::attach) and
///   [`attach_daemon`](Self::attach_daemon) attach the thread if needed and remember its
///   `JNIEnv` in thread local storage.
/// * The thread is detached again when it exits, or earlier with [`detach`](Self::detach).
///
/// Once the library is unloaded every operation fails with [`Error::Unloaded`], including on
/// threads that already have a cached environment. Those keep their entry, so if the library is
/// loaded again they carry on where they left off and are still detached when they exit.
///
/// Attachments made by other code (e.g. a Java thread calling a native method) are cached too, and
/// are treated the same way on thread exit: if the VM still reports the thread as attached, it's
/// detached.
///
/// ## Failures
///
/// A thread that the VM refuses to attach can't do anything useful, so the non-`try_` methods
/// report the failure on stderr and terminate the process, according to the configured
/// [`AttachFailurePolicy`]. Failing to detach is only reported as a warning.
pub struct EnvCache {
    api: Box<dyn InvocationApi>,
    config: CacheConfig,
    loaded: AtomicBool,
    /// Attachments made by this cache that haven't been released yet.
    attached: AtomicUsize,
}

impl std::fmt::Debug for EnvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCache")
            .field("config", &self.config)
            .field("loaded", &self.loaded)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

impl EnvCache {
    /// Installs the process-wide cache for the given VM interface.
    ///
    /// This is normally done by [`on_load`](crate::on_load). Fails with
    /// [`Error::AlreadyInstalled`] if a cache is installed and loaded.
    ///
    /// If the library was unloaded and is now loaded again, the existing cache is re-activated:
    /// the VM interface and configuration from the first installation are kept and `api` is
    /// dropped.
    pub fn install<A: InvocationApi>(api: A, config: CacheConfig) -> Result<&'static EnvCache> {
        let mut created = false;
        let cache = ENV_CACHE.get_or_init(|| {
            created = true;
            EnvCache {
                api: Box::new(api),
                config,
                loaded: AtomicBool::new(true),
                attached: AtomicUsize::new(0),
            }
        });

        if !created {
            if cache.loaded.swap(true, Ordering::SeqCst) {
                return Err(Error::AlreadyInstalled);
            }
            debug!("Environment cache re-activated after unload");
        }

        if let Err(err) = Slot::init() {
            warn!("Failed to allocate thread local storage for JNIEnv, will retry on first use: {err}");
        }

        debug!(
            "Environment cache installed for JNI {}: {:?}",
            cache.config.get_version(),
            cache.config
        );
        Ok(cache)
    }

    /// Returns the installed cache.
    ///
    /// Fails with [`Error::Uninitialized`] before the load hook has run, and with
    /// [`Error::Unloaded`] after the unload hook.
    pub fn singleton() -> Result<&'static EnvCache> {
        let cache = ENV_CACHE.get().ok_or(Error::Uninitialized)?;
        cache.check_loaded()?;
        Ok(cache)
    }

    pub(crate) fn loaded() -> Option<&'static EnvCache> {
        Self::singleton().ok()
    }

    /// Runs the unload hook for the installed cache, if any.
    pub(crate) fn unload_singleton() {
        if let Some(cache) = ENV_CACHE.get() {
            cache.unload();
        }
    }

    /// Returns `false` once the library's unload hook has run.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// The configuration the cache was installed with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the `JNIEnv` of the current thread, attaching the thread if necessary.
    ///
    /// After the first call on a thread this only reads thread local storage. If the thread has to
    /// be attached, it's attached as configured by [`CacheConfig::cached_kind`] (a daemon by
    /// default) and will be detached automatically when it exits.
    ///
    /// Terminates the process if the thread can't be attached. See
    /// [`try_get_cached`](Self::try_get_cached) to handle the error instead.
    pub fn get_cached(&self) -> EnvHandle {
        self.try_get_cached()
            .unwrap_or_else(|err| self.attach_failed(&err))
    }

    /// Like [`get_cached`](Self::get_cached) but returns an error if the thread can't be attached.
    pub fn try_get_cached(&self) -> Result<EnvHandle> {
        self.check_loaded()?;
        match Slot::get() {
            Some(env) => Ok(EnvHandle::from_non_null(env)),
            None => self.attach_and_cache(self.config.get_cached_kind()),
        }
    }

    /// Asks the VM for the `JNIEnv` of the current thread, without consulting or filling the cache.
    ///
    /// Returns `None` if the thread isn't attached. This always calls into the VM, so it's slower
    /// than [`get_cached`](Self::get_cached).
    pub fn get_uncached(&self) -> Option<EnvHandle> {
        match self.api.get_env(self.config.get_version()) {
            Ok(env) => Some(EnvHandle::from_non_null(env)),
            Err(err) if err.is_thread_detached() => None,
            Err(err) => {
                warn!("GetEnv failed: {err}");
                None
            }
        }
    }

    /// Returns `true` if the VM reports the current thread as attached.
    pub fn is_thread_attached(&self) -> Result<bool> {
        match self.api.get_env(self.config.get_version()) {
            Ok(_) => Ok(true),
            Err(err) if err.is_thread_detached() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Attaches the current thread. Attached threads block VM shutdown; see
    /// [`attach_daemon`](Self::attach_daemon) if that's not desirable.
    ///
    /// Calling this for a thread that is already attached returns its existing environment and
    /// does not change its daemon status. The thread is detached automatically when it exits.
    ///
    /// Terminates the process if the thread can't be attached.
    pub fn attach(&self) -> EnvHandle {
        self.try_attach(ThreadKind::Normal)
            .unwrap_or_else(|err| self.attach_failed(&err))
    }

    /// Attaches the current thread as a daemon, which doesn't block VM shutdown.
    ///
    /// Otherwise the same as [`attach`](Self::attach).
    pub fn attach_daemon(&self) -> EnvHandle {
        self.try_attach(ThreadKind::Daemon)
            .unwrap_or_else(|err| self.attach_failed(&err))
    }

    /// Attaches the current thread with the given kind, returning an error if the VM refuses.
    pub fn try_attach(&self, kind: ThreadKind) -> Result<EnvHandle> {
        self.check_loaded()?;
        match Slot::get() {
            Some(env) => Ok(EnvHandle::from_non_null(env)),
            None => self.attach_and_cache(kind),
        }
    }

    /// Detaches the current thread and clears its cached environment.
    ///
    /// Detaching a thread that isn't attached is a no-op. A failure is reported as a warning on
    /// stderr and the thread carries on, possibly still attached.
    ///
    /// __Any `EnvHandle` obtained on this thread is invalid afterwards.__
    pub fn detach(&self) {
        if let Err(err) = self.try_detach() {
            report_detach_failure(&err, &thread::current());
        }
    }

    /// Like [`detach`](Self::detach) but returns the error instead of reporting it.
    ///
    /// Fails with [`Error::Unloaded`] without calling into the VM once the cache is unloaded.
    pub fn try_detach(&self) -> Result<()> {
        self.check_loaded()?;
        let entry = Slot::take();
        let res = self.sys_detach_if_attached();

        if let Some(entry) = entry {
            if entry.owned {
                self.release_count(&entry.thread);
            }
        }

        res.map(|_| ())
    }

    /// Returns the number of threads this cache attached that are still attached.
    ///
    /// This is provided mostly for diagnostic purposes.
    pub fn threads_attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// Cleanup for a thread that is exiting with an entry in its slot.
    pub(crate) fn release_exiting_thread(&self, entry: &SlotEntry) {
        match self.sys_detach_if_attached() {
            Ok(true) => debug!(
                "Detached exiting thread {} ({:?})",
                entry.thread.name().unwrap_or_default(),
                entry.thread.id()
            ),
            Ok(false) => debug!(
                "Exiting thread {} ({:?}) already detached",
                entry.thread.name().unwrap_or_default(),
                entry.thread.id()
            ),
            Err(err) => report_detach_failure(&err, &entry.thread),
        }

        if entry.owned {
            self.release_count(&entry.thread);
        }
    }

    fn unload(&self) {
        if self.loaded.swap(false, Ordering::SeqCst) {
            Slot::release();
            debug!(
                "Environment cache unloaded with {} threads still attached",
                self.threads_attached()
            );
        }
    }

    /// Stops counting an attachment whose slot entry was dropped, without detaching, while the
    /// storage was released at unload.
    #[cfg_attr(not(use_fls_slot), allow(dead_code))]
    pub(crate) fn forget_released_entry(entry: &SlotEntry) {
        if let (Some(cache), true) = (ENV_CACHE.get(), entry.owned) {
            cache.release_count(&entry.thread);
        }
    }

    fn check_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(Error::Unloaded)
        }
    }

    fn attach_failed(&self, err: &Error) -> ! {
        self.config
            .get_attach_failure()
            .terminate(err, &thread::current())
    }

    /// Finds or makes an attachment for the current thread and stores it in the slot.
    fn attach_and_cache(&self, kind: ThreadKind) -> Result<EnvHandle> {
        let thread = thread::current();
        let (env, owned) = match self.api.get_env(self.config.get_version()) {
            Ok(env) => (env, false),
            Err(err) if err.is_thread_detached() => (self.sys_attach(kind, &thread)?, true),
            Err(err) => return Err(err),
        };

        let entry = SlotEntry {
            env,
            owned,
            thread: thread.clone(),
        };
        if let Err(err) = Slot::store(entry) {
            warn!(
                "Thread {} ({:?}) won't be detached automatically: {err}",
                thread.name().unwrap_or_default(),
                thread.id()
            );
        }

        Ok(EnvHandle::from_non_null(env))
    }

    fn sys_attach(&self, kind: ThreadKind, thread: &Thread) -> Result<NonNull<sys::JNIEnv>> {
        let version = self.config.get_version();
        let args = if self.config.get_thread_names() {
            AttachArgs::for_thread(version, thread)
        } else {
            AttachArgs::new(version)
        };

        let env = self.api.attach_current_thread(kind, &args)?;
        let attached = self.attached.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(
            "Attached {} thread {} ({:?}). {} threads attached",
            match kind {
                ThreadKind::Normal => "normal",
                ThreadKind::Daemon => "daemon",
            },
            thread.name().unwrap_or_default(),
            thread.id(),
            attached
        );

        Ok(env)
    }

    /// Detaches the current thread if the VM reports it as attached.
    ///
    /// Returns whether `DetachCurrentThread` was called.
    fn sys_detach_if_attached(&self) -> Result<bool> {
        if !self.is_thread_attached()? {
            return Ok(false);
        }
        self.api.detach_current_thread()?;
        Ok(true)
    }

    fn release_count(&self, thread: &Thread) {
        let remaining = self.attached.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(
            "Released thread {} ({:?}). {} threads remain attached",
            thread.name().unwrap_or_default(),
            thread.id(),
            remaining
        );
    }
}
