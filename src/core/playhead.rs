//! Read-only content playhead shared with the ad provider.
//!
//! The coordinator is the only writer. It stops writing while an ad owns the
//! renderer, so providers see the position content was paused at.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bit pattern stored while the position is unknown.
const UNKNOWN: u64 = u64::MAX;

/// Lock-free content time handle (seconds, stored as f64 bits).
#[derive(Debug, Clone)]
pub struct ContentPlayhead {
    bits: Arc<AtomicU64>,
}

impl Default for ContentPlayhead {
    fn default() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(UNKNOWN)),
        }
    }
}

impl ContentPlayhead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last content time reported before now. `None` before the stream is ready.
    pub fn current_time(&self) -> Option<f64> {
        match self.bits.load(Ordering::Acquire) {
            UNKNOWN => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub(crate) fn set(&self, t: Option<f64>) {
        let bits = t.filter(|t| t.is_finite()).map(f64::to_bits).unwrap_or(UNKNOWN);
        self.bits.store(bits, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_position() {
        let writer = ContentPlayhead::new();
        let reader = writer.clone();
        assert_eq!(reader.current_time(), None);

        writer.set(Some(12.5));
        assert_eq!(reader.current_time(), Some(12.5));

        writer.set(None);
        assert_eq!(reader.current_time(), None);
    }

    #[test]
    fn non_finite_is_unknown() {
        let p = ContentPlayhead::new();
        p.set(Some(f64::NAN));
        assert_eq!(p.current_time(), None);
    }
}
