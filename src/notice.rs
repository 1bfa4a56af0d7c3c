//! User-visible notices and the observer that receives them.
//!
//! Inject an [`Arc<dyn SessionObserver>`] into
//! [`crate::session::ExtractionSession::with_observer`] to receive every
//! toast-style notice the session raises and every status transition.
//! The terminal front end prints them; tests count them.
//!
//! # Example
//!
//! ```rust
//! use pdf_augmenter::{Notice, SessionObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<Notice>>);
//!
//! impl SessionObserver for Collect {
//!     fn on_notice(&self, notice: &Notice) {
//!         self.0.lock().unwrap().push(notice.clone());
//!     }
//! }
//!
//! let observer: Arc<dyn SessionObserver> = Arc::new(Collect::default());
//! ```

use crate::session::SessionStatus;
use std::fmt;
use std::sync::Arc;

/// Whether a notice reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short message meant for the user, never a raw backend payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives session events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; the session
/// may be moved across tasks.
pub trait SessionObserver: Send + Sync {
    /// Called once for every notice the session raises.
    fn on_notice(&self, notice: &Notice) {
        let _ = notice;
    }

    /// Called after every extraction status change.
    fn on_status_change(&self, from: SessionStatus, to: SessionStatus) {
        let _ = (from, to);
    }
}

/// An observer that ignores everything. The default.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type stored in the session.
pub type SharedObserver = Arc<dyn SessionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingObserver {
        successes: AtomicUsize,
        errors: AtomicUsize,
        transitions: AtomicUsize,
    }

    impl SessionObserver for TrackingObserver {
        fn on_notice(&self, notice: &Notice) {
            match notice.level {
                NoticeLevel::Success => self.successes.fetch_add(1, Ordering::SeqCst),
                NoticeLevel::Error => self.errors.fetch_add(1, Ordering::SeqCst),
            };
        }

        fn on_status_change(&self, _from: SessionStatus, _to: SessionStatus) {
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_notice(&Notice::success("report.pdf selected!"));
        obs.on_status_change(SessionStatus::Idle, SessionStatus::InFlight);
    }

    #[test]
    fn tracking_observer_receives_events() {
        let obs = TrackingObserver {
            successes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            transitions: AtomicUsize::new(0),
        };
        obs.on_notice(&Notice::success("ok"));
        obs.on_notice(&Notice::error("Processing failed."));
        obs.on_notice(&Notice::error("No tables found."));
        obs.on_status_change(SessionStatus::Idle, SessionStatus::InFlight);

        assert_eq!(obs.successes.load(Ordering::SeqCst), 1);
        assert_eq!(obs.errors.load(Ordering::SeqCst), 2);
        assert_eq!(obs.transitions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notice_constructors() {
        let n = Notice::error("Please upload a valid PDF file.");
        assert!(n.is_error());
        assert_eq!(n.to_string(), "Please upload a valid PDF file.");
        assert!(!Notice::success("x").is_error());
    }
}
