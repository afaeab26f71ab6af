//! Cached vs. uncached `JNIEnv` lookup.
//!
//! The VM here is simulated, so the uncached numbers only show the cost of going through the
//! invocation interface (dynamic dispatch plus a thread local lookup); with a real JVM `GetEnv` is
//! more expensive still.

use std::{cell::Cell, hint::black_box, ptr::NonNull};

use criterion::{criterion_group, criterion_main, Criterion};
use jni_env_cache::{
    errors::{Error, JniError, Result},
    sys, AttachArgs, CacheConfig, EnvCache, InvocationApi, JNIVersion, ThreadKind,
};

thread_local! {
    static BENCH_ENV: Cell<usize> = const { Cell::new(0) };
}

struct BenchVm;

fn current_env() -> Option<NonNull<sys::JNIEnv>> {
    NonNull::new(BENCH_ENV.with(Cell::get) as *mut sys::JNIEnv)
}

unsafe impl InvocationApi for BenchVm {
    #[inline(never)]
    fn get_env(&self, _version: JNIVersion) -> Result<NonNull<sys::JNIEnv>> {
        current_env().ok_or(Error::JniCall(JniError::ThreadDetached))
    }

    fn attach_current_thread(
        &self,
        _kind: ThreadKind,
        _args: &AttachArgs,
    ) -> Result<NonNull<sys::JNIEnv>> {
        if current_env().is_none() {
            BENCH_ENV.with(|env| env.set(Box::into_raw(Box::new(0u64)) as usize));
        }
        current_env().ok_or(Error::JniCall(JniError::Unknown))
    }

    fn detach_current_thread(&self) -> Result<()> {
        BENCH_ENV.with(|env| env.set(0));
        Ok(())
    }
}

fn bench_env_lookup(c: &mut Criterion) {
    let cache = EnvCache::install(BenchVm, CacheConfig::default()).unwrap();
    cache.get_cached();

    let mut group = c.benchmark_group("env_lookup");
    group.bench_function("get_cached", |b| b.iter(|| black_box(cache.get_cached())));
    group.bench_function("get_uncached", |b| b.iter(|| black_box(cache.get_uncached())));
    group.finish();
}

criterion_group!(benches, bench_env_lookup);
criterion_main!(benches);
