//! Ambient cancellation token (spec §5).
//!
//! Plain OS threads and blocking collaborator calls are the concurrency
//! model here, so there is no async runtime backing this — it is a
//! shared flag plus an optional deadline, checked cooperatively at
//! traversal/worker expansion points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that never cancels and never times out.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token that auto-expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// A background token derived from this one, sharing nothing —
    /// used for the final status write in C5 so a caller cancelling
    /// mid-enrichment can't corrupt the memory row (spec §5/§4.5).
    pub fn background() -> Self {
        Self::new()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns `Err` if cancelled or expired, `Ok(())` otherwise.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_observed_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn deadline_expires() {
        let token = CancellationToken::with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(token.check(), Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn background_is_independent() {
        let token = CancellationToken::new();
        token.cancel();
        let bg = CancellationToken::background();
        assert!(bg.check().is_ok());
    }
}
