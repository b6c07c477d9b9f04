use std::sync::atomic::{AtomicBool, Ordering};

/// Global readiness flag, set once the legacy mappings are loaded.
///
/// Read by the readiness probe endpoint to decide whether legacy calls can be served.
static MAPPINGS_LOADED: AtomicBool = AtomicBool::new(false);

/// Mark the service as ready after the mappings were loaded.
pub fn mark_ready(mapping_count: usize) {
    MAPPINGS_LOADED.store(true, Ordering::SeqCst);
    log::info!("Loaded {mapping_count} legacy mappings, service is ready");
}

/// Check if the service is ready to handle legacy calls.
pub fn is_ready() -> bool {
    MAPPINGS_LOADED.load(Ordering::SeqCst)
}

/// Reset readiness status (useful for testing)
#[cfg(test)]
pub fn reset() {
    MAPPINGS_LOADED.store(false, Ordering::SeqCst);
    log::debug!("Readiness status reset");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Readiness is process-wide; tests flipping it must not interleave.
    pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_initial_state_not_ready() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        assert!(!is_ready());
    }

    #[test]
    fn test_mark_ready() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        mark_ready(2);
        assert!(is_ready());
        mark_ready(3);
        assert!(is_ready());
    }
}
