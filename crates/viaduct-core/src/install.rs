//! One-time singleton resource installation
//!
//! Some resources (a debug panel, a profiling hook) must be installed at
//! most once per process, the first time any request needs them. The
//! registry is a process-wide check-and-set: the first caller for a key
//! runs the installer, every later caller is a no-op. Concurrent callers
//! for the same key block until the first install completes, so the
//! installed resource is visible before either returns.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

static INSTALLED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<String>> {
    INSTALLED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Run `install` if `key` has not been installed in this process yet.
/// Returns whether the installer ran.
pub fn install_once<F: FnOnce()>(key: &str, install: F) -> bool {
    let mut installed = match registry().lock() {
        Ok(guard) => guard,
        // A poisoned lock means an installer panicked; the key set is
        // still valid, so keep going.
        Err(poisoned) => poisoned.into_inner(),
    };
    if installed.contains(key) {
        return false;
    }
    installed.insert(key.to_string());
    install();
    true
}

/// Whether a key has already been installed.
pub fn is_installed(key: &str) -> bool {
    match registry().lock() {
        Ok(guard) => guard.contains(key),
        Err(poisoned) => poisoned.into_inner().contains(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn second_install_is_a_no_op() {
        let count = AtomicUsize::new(0);
        assert!(install_once("test.no_op", || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!install_once("test.no_op", || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(is_installed("test.no_op"));
    }

    #[test]
    fn concurrent_installs_run_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let count = count.clone();
            handles.push(std::thread::spawn(move || {
                install_once("test.concurrent", move || {
                    count.fetch_add(1, Ordering::SeqCst);
                });
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
