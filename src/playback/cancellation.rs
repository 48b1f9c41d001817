use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// One-shot stop signal shared between the controller and a playback worker.
///
/// Each run gets a fresh token, so "clearing" the signal means replacing it.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
