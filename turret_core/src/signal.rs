use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Start/stop edge carried from an interrupt or input thread to the loop.
///
/// Producers `raise()`; the loop `take()`s once per pass, which reads and
/// clears in one step. Several raises between two passes collapse into one
/// edge.
#[derive(Debug, Clone, Default)]
pub struct StartStopSignal(Arc<AtomicBool>);

impl StartStopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears() {
        let s = StartStopSignal::new();
        let producer = s.clone();
        producer.raise();
        producer.raise();
        assert!(s.is_raised());
        assert!(s.take());
        assert!(!s.take());
    }

    #[test]
    fn raise_from_another_thread() {
        let s = StartStopSignal::new();
        let p = s.clone();
        std::thread::spawn(move || p.raise()).join().unwrap();
        assert!(s.take());
    }
}
