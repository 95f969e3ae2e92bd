use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative control signal shared between the run controller and its
/// worker.
///
/// The controller is the only writer; the worker polls once per loop
/// iteration and once per pause-sleep tick, so cancellation latency is
/// bounded by the current gateway call plus one poll interval.
#[derive(Debug, Clone, Default)]
pub struct RunSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug, Default)]
struct SignalInner {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl RunSignal {
    pub fn new() -> Self {
        RunSignal::default()
    }

    /// Request cooperative shutdown. Irreversible for this run.
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    /// Request a pause. Returns false if already paused.
    pub fn pause(&self) -> bool {
        !self.inner.pause.swap(true, Ordering::SeqCst)
    }

    /// Clear a pause. Returns false if not paused.
    pub fn resume(&self) -> bool {
        self.inner.pause.swap(false, Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.pause.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume_report_state_changes() {
        let signal = RunSignal::new();
        assert!(!signal.is_paused());

        assert!(signal.pause());
        assert!(signal.is_paused());
        assert!(!signal.pause(), "second pause is a no-op");

        assert!(signal.resume());
        assert!(!signal.is_paused());
        assert!(!signal.resume(), "second resume is a no-op");
    }

    #[test]
    fn stop_is_visible_through_clones() {
        let signal = RunSignal::new();
        let worker_view = signal.clone();
        assert!(!worker_view.stop_requested());

        signal.request_stop();
        assert!(worker_view.stop_requested());
    }
}
