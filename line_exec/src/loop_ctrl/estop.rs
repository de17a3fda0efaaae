//! Emergency stop request flag

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc
};

/// A handle which can request an emergency stop of the loop from anywhere.
///
/// Triggering only sets a flag, so it is safe from other threads and from
/// signal context. The loop checks the flag at the start of every tick and
/// again just before writing to the motors. Once triggered it cannot be
/// cleared.
#[derive(Debug, Clone, Default)]
pub struct EStopHandle {
    flag: Arc<AtomicBool>
}

impl EStopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an emergency stop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true if an emergency stop has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trigger_from_thread() {
        let handle = EStopHandle::new();
        let remote = handle.clone();

        assert!(!handle.is_triggered());

        std::thread::spawn(move || remote.trigger())
            .join()
            .unwrap();

        assert!(handle.is_triggered());
    }
}
