//! # pdf-augmenter
//!
//! Client and session logic for a PDF augmentation backend: upload a PDF,
//! get back its tables, images or formulas with a generated description for
//! each, page through them, and ask questions about the one on screen.
//!
//! ## Workflow
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Select   local path or URL → FileCandidate → SelectedFile (PDF only)
//!  ├─ 2. Mode     tables (case 1/2/3) | images | formulas
//!  ├─ 3. Process  one multipart POST to the matching /extract-description/* endpoint
//!  ├─ 4. View     paginated viewer over the returned items
//!  └─ 5. Ask      POST /ask-question with the displayed item's description
//! ```
//!
//! All of it is driven through one [`ExtractionSession`], which owns every
//! piece of state and changes it atomically. The network sits behind the
//! [`AugmenterBackend`] trait; [`HttpBackend`] is the `reqwest`
//! implementation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_augmenter::{
//!     load_candidate, ClientConfig, ExtractionMode, ExtractionSession, HttpBackend, TableCase,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let backend = Arc::new(HttpBackend::new(config)?);
//!     let mut session = ExtractionSession::new(backend);
//!
//!     session.select(Some(load_candidate("report.pdf", 120).await?))?;
//!     session.set_mode(ExtractionMode::Tables)?;
//!     session.set_table_case(TableCase::Case2)?;
//!     session.process().await?;
//!
//!     if let Some(text) = session.viewer().render_current() {
//!         println!("{text}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-augment` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-augmenter = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod mode;
pub mod model;
pub mod notice;
pub mod sanitize;
pub mod session;
pub mod viewer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{suggested_questions, ChatPanel, Exchange};
pub use client::{AugmenterBackend, HttpBackend};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{AugmenterError, ErrorCategory};
pub use input::{load_candidate, FileCandidate, SelectedFile};
pub use mode::{Endpoint, ExtractionMode, TableCase};
pub use model::{AskRequest, ExtractedItem, FormulaItem, ImageItem, PageRef, TableItem};
pub use notice::{NoopObserver, Notice, NoticeLevel, SessionObserver};
pub use sanitize::sanitize;
pub use session::{ExtractionSession, PendingAnswer, PendingExtraction, SessionStatus};
pub use viewer::ResultViewer;
