use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, taking the data back out of a poisoned lock.
///
/// Poisoning is logged and the inner value is used as-is.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            crate::log_debug(&format!("mutex poisoned in {context}; recovering"));
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn recovers_value_from_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(7u32));
        let poisoner = Arc::clone(&shared);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        let guard = lock_or_recover(&shared, "test");
        assert_eq!(*guard, 7);
    }
}
