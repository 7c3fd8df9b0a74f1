use std::sync::{Mutex, MutexGuard, OnceLock};

/// Global lock to serialize tests that mutate process-wide state (the
/// interruption flag, environment variables).
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct EnvLockGuard(#[allow(dead_code)] MutexGuard<'static, ()>);

pub fn lock() -> EnvLockGuard {
    let guard = match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    EnvLockGuard(guard)
}
