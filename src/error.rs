//! Error types for the pdf-augmenter library.
//!
//! Every failure the client can hit is an [`AugmenterError`]. The variants
//! fall into three categories, reported by [`AugmenterError::category`]:
//!
//! * [`ErrorCategory::InvalidInput`]: the user asked for something the
//!   current state does not allow (a non-PDF file, processing without a
//!   mode, asking an empty question). These are refused locally and never
//!   reach the network.
//!
//! * [`ErrorCategory::Transport`]: the backend could not be reached,
//!   answered with a non-2xx status, or sent a body that does not decode
//!   into the expected items. The session turns these into a generic
//!   notice and logs the detail.
//!
//! * [`ErrorCategory::Internal`]: configuration and local I/O problems.
//!
//! An empty extraction result is not an error: it is the `Empty` session
//! status.

use crate::mode::ExtractionMode;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the session to pick a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Refused locally; nothing was sent.
    InvalidInput,
    /// Network, HTTP status or response decoding failure.
    Transport,
    /// Configuration or local I/O.
    Internal,
}

/// All errors returned by the pdf-augmenter library.
#[derive(Debug, Error)]
pub enum AugmenterError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The offered file does not declare `application/pdf`.
    #[error("'{name}' is not a PDF (declared type: {mime_type})")]
    NotAPdf { name: String, mime_type: String },

    /// Local file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Precondition errors ───────────────────────────────────────────────
    /// An action needs a selected file.
    #[error("No PDF selected")]
    NoFileSelected,

    /// `process` without an extraction mode.
    #[error("Select what to extract first")]
    ModeNotSelected,

    /// `process` in table mode without a table case.
    #[error("Please select a case.")]
    TableCaseRequired,

    /// Another extraction request is still outstanding.
    #[error("A request is already in flight")]
    RequestInFlight,

    /// The viewer is closed or holds no item.
    #[error("No item is being displayed")]
    NoItemDisplayed,

    /// The question-answer panel is not open.
    #[error("The question panel is not open")]
    ChatClosed,

    /// A question was submitted while the previous one is unanswered.
    #[error("Still waiting for the previous answer")]
    AnswerPending,

    /// Blank question.
    #[error("Question must not be empty")]
    EmptyQuestion,

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or the connection dropped.
    #[error("Request to '{endpoint}' failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    /// The request exceeded its connect or whole-request timeout.
    #[error("Request to '{endpoint}' timed out after {secs}s")]
    RequestTimeout { endpoint: String, secs: u64 },

    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status} for '{endpoint}'")]
    HttpStatus { endpoint: String, status: u16 },

    /// The response body is not the JSON shape the endpoint promises.
    #[error("Could not decode response from '{endpoint}': {detail}")]
    DecodeFailed { endpoint: String, detail: String },

    /// The backend returned items of another kind than the requested mode.
    #[error("Expected {expected} but the response contained {found}")]
    KindMismatch {
        expected: ExtractionMode,
        found: ExtractionMode,
    },

    // ── Local errors ──────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not write an extracted image or other output file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AugmenterError {
    /// Which of the three failure families this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        use AugmenterError::*;
        match self {
            NotAPdf { .. }
            | FileNotFound { .. }
            | PermissionDenied { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | NoFileSelected
            | ModeNotSelected
            | TableCaseRequired
            | RequestInFlight
            | NoItemDisplayed
            | ChatClosed
            | AnswerPending
            | EmptyQuestion => ErrorCategory::InvalidInput,
            RequestFailed { .. }
            | RequestTimeout { .. }
            | HttpStatus { .. }
            | DecodeFailed { .. }
            | KindMismatch { .. } => ErrorCategory::Transport,
            InvalidConfig(_) | OutputWriteFailed { .. } | Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Shorthand for `category() == Transport`.
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// Map a `reqwest` error raised while talking to `endpoint`.
    ///
    /// A timeout reports the limit that actually fired: the connect timeout
    /// while connecting or when no request timeout is set, else the request
    /// timeout.
    pub(crate) fn from_reqwest(
        endpoint: &str,
        err: reqwest::Error,
        request_timeout_secs: Option<u64>,
        connect_timeout_secs: u64,
    ) -> Self {
        if err.is_timeout() {
            AugmenterError::RequestTimeout {
                endpoint: endpoint.to_string(),
                secs: expired_limit(err.is_connect(), request_timeout_secs, connect_timeout_secs),
            }
        } else if err.is_decode() {
            AugmenterError::DecodeFailed {
                endpoint: endpoint.to_string(),
                detail: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            AugmenterError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
        } else {
            AugmenterError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

fn expired_limit(connecting: bool, request_timeout_secs: Option<u64>, connect_timeout_secs: u64) -> u64 {
    match request_timeout_secs {
        Some(secs) if !connecting => secs,
        _ => connect_timeout_secs,
    }
}
