use std::{
    cell::Cell,
    ptr::NonNull,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use jni_env_cache::{
    errors::{Error, JniError, Result},
    sys, AttachArgs, CacheConfig, EnvCache, InvocationApi, JNIVersion, ThreadKind,
};

thread_local! {
    // Address of the current thread's fake JNIEnv, 0 while detached. No destructor, so it stays
    // usable while other thread locals are torn down.
    static MOCK_ENV: Cell<usize> = const { Cell::new(0) };
}

/// Counters and switches shared between a test and its [`MockVm`].
#[derive(Debug, Default)]
pub struct MockState {
    get_env_calls: AtomicUsize,
    normal_attaches: AtomicUsize,
    daemon_attaches: AtomicUsize,
    detaches: AtomicUsize,
    fail_attach: AtomicBool,
    fail_detach: AtomicBool,
    attach_names: Mutex<Vec<Option<String>>>,
    attach_versions: Mutex<Vec<JNIVersion>>,
}

#[allow(dead_code)]
impl MockState {
    pub fn get_env_calls(&self) -> usize {
        self.get_env_calls.load(Ordering::SeqCst)
    }

    pub fn normal_attaches(&self) -> usize {
        self.normal_attaches.load(Ordering::SeqCst)
    }

    pub fn daemon_attaches(&self) -> usize {
        self.daemon_attaches.load(Ordering::SeqCst)
    }

    pub fn attaches(&self) -> usize {
        self.normal_attaches() + self.daemon_attaches()
    }

    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }

    pub fn set_fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_detach(&self, fail: bool) {
        self.fail_detach.store(fail, Ordering::SeqCst);
    }

    pub fn attach_names(&self) -> Vec<Option<String>> {
        self.attach_names.lock().unwrap().clone()
    }

    pub fn attach_versions(&self) -> Vec<JNIVersion> {
        self.attach_versions.lock().unwrap().clone()
    }
}

/// Simulates the invocation interface of a Java VM.
///
/// Every attachment gets a fresh (leaked) allocation as its `JNIEnv`, so two attachments never
/// share an address.
#[derive(Debug)]
pub struct MockVm {
    state: Arc<MockState>,
}

impl MockVm {
    pub fn new() -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

fn new_fake_env() -> usize {
    Box::into_raw(Box::new(0u64)) as usize
}

fn current_env() -> Option<NonNull<sys::JNIEnv>> {
    NonNull::new(MOCK_ENV.with(Cell::get) as *mut sys::JNIEnv)
}

unsafe impl InvocationApi for MockVm {
    fn get_env(&self, _version: JNIVersion) -> Result<NonNull<sys::JNIEnv>> {
        self.state.get_env_calls.fetch_add(1, Ordering::SeqCst);
        current_env().ok_or(Error::JniCall(JniError::ThreadDetached))
    }

    fn attach_current_thread(
        &self,
        kind: ThreadKind,
        args: &AttachArgs,
    ) -> Result<NonNull<sys::JNIEnv>> {
        if let Some(env) = current_env() {
            return Ok(env);
        }
        if self.state.fail_attach.load(Ordering::SeqCst) {
            return Err(Error::JniCall(JniError::NoMemory));
        }

        match kind {
            ThreadKind::Normal => self.state.normal_attaches.fetch_add(1, Ordering::SeqCst),
            ThreadKind::Daemon => self.state.daemon_attaches.fetch_add(1, Ordering::SeqCst),
        };
        self.state
            .attach_names
            .lock()
            .unwrap()
            .push(args.name().map(|name| name.to_string_lossy().into_owned()));
        self.state
            .attach_versions
            .lock()
            .unwrap()
            .push(args.version());

        MOCK_ENV.with(|env| env.set(new_fake_env()));
        Ok(current_env().expect("fake env was just set"))
    }

    fn detach_current_thread(&self) -> Result<()> {
        self.state.detaches.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_detach.load(Ordering::SeqCst) {
            return Err(Error::JniCall(JniError::Unknown));
        }
        MOCK_ENV.with(|env| env.set(0));
        Ok(())
    }
}

/// Installs a [`MockVm`] with the default configuration.
#[allow(dead_code)]
pub fn install() -> (&'static EnvCache, Arc<MockState>) {
    install_with(CacheConfig::default())
}

#[allow(dead_code)]
pub fn install_with(config: CacheConfig) -> (&'static EnvCache, Arc<MockState>) {
    let (vm, state) = MockVm::new();
    let cache = EnvCache::install(vm, config).unwrap_or_else(|e| panic!("{:#?}", e));
    (cache, state)
}

/// Attaches the current thread behind the cache's back, the way a Java thread calling a native
/// method is already attached.
#[allow(dead_code)]
pub fn simulate_foreign_attachment() -> usize {
    let env = new_fake_env();
    MOCK_ENV.with(|cell| cell.set(env));
    env
}
