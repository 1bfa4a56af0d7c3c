//! The extraction session: one object owning every piece of UI state.
//!
//! File, mode, table case, request status, results, viewer position and
//! the open question panel all live in [`ExtractionSession`] and change
//! together inside a single `&mut self` method, so no observer ever sees a
//! mode paired with results of another kind or an index past the end.
//!
//! ## Request lifecycle
//!
//! ```text
//! idle ──begin_process──▶ in_flight ──complete_process──▶ results | empty | error
//!   ▲                         │                                   │
//!   └──── abandon_process ────┘◀────── close_viewer / select ─────┘
//! ```
//!
//! [`ExtractionSession::process`] runs both halves back to back. Front ends
//! that keep reading input while a request runs call `begin_process`, hand
//! the [`PendingExtraction`] ticket to the backend themselves and feed the
//! outcome to `complete_process`. While a request is in flight every other
//! mutation is refused with [`AugmenterError::RequestInFlight`].
//!
//! Questions about the displayed item follow the same split
//! (`begin_ask` / `complete_ask` / `ask`).

use crate::chat::{ChatPanel, Exchange};
use crate::client::AugmenterBackend;
use crate::error::AugmenterError;
use crate::input::{FileCandidate, SelectedFile};
use crate::mode::{Endpoint, ExtractionMode, TableCase};
use crate::model::{AskRequest, ExtractedItem};
use crate::notice::{NoopObserver, Notice, SharedObserver};
use crate::viewer::ResultViewer;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Notice raised when a selection is not a PDF.
pub const SELECT_PDF_NOTICE: &str = "Please select a PDF.";
/// Notice raised when an extraction request fails.
pub const PROCESSING_FAILED_NOTICE: &str = "Processing failed.";
/// Notice raised when a question could not be answered.
pub const ANSWER_FAILED_NOTICE: &str = "Error generating the answer.";

/// Where the extraction request cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    InFlight,
    Results,
    Empty,
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::InFlight => "in_flight",
            SessionStatus::Results => "results",
            SessionStatus::Empty => "empty",
            SessionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket for the one outstanding extraction request.
///
/// Not `Clone`: exactly one completion (or abandonment) per request.
#[derive(Debug)]
#[must_use = "pass the ticket to complete_process or abandon_process"]
pub struct PendingExtraction {
    endpoint: Endpoint,
    mode: ExtractionMode,
    file: Arc<SelectedFile>,
}

impl PendingExtraction {
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

/// Ticket for an outstanding question.
#[derive(Debug)]
#[must_use = "pass the ticket to complete_ask"]
pub struct PendingAnswer {
    panel_id: u64,
    question: String,
    request: AskRequest,
}

impl PendingAnswer {
    pub fn request(&self) -> &AskRequest {
        &self.request
    }
}

/// State of one user's extraction workflow.
pub struct ExtractionSession {
    backend: Arc<dyn AugmenterBackend>,
    observer: SharedObserver,
    file: Option<Arc<SelectedFile>>,
    mode: Option<ExtractionMode>,
    table_case: Option<TableCase>,
    status: SessionStatus,
    viewer: ResultViewer,
    chat: Option<ChatPanel>,
    next_panel_id: u64,
}

impl fmt::Debug for ExtractionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionSession")
            .field("file", &self.file.as_ref().map(|f| f.name().to_string()))
            .field("mode", &self.mode)
            .field("table_case", &self.table_case)
            .field("status", &self.status)
            .field("results", &self.viewer.len())
            .field("index", &self.viewer.index())
            .field("viewer_open", &self.viewer.is_open())
            .field("chat_open", &self.chat.is_some())
            .finish()
    }
}

impl ExtractionSession {
    pub fn new(backend: Arc<dyn AugmenterBackend>) -> Self {
        Self::with_observer(backend, Arc::new(NoopObserver))
    }

    pub fn with_observer(backend: Arc<dyn AugmenterBackend>, observer: SharedObserver) -> Self {
        Self {
            backend,
            observer,
            file: None,
            mode: None,
            table_case: None,
            status: SessionStatus::Idle,
            viewer: ResultViewer::default(),
            chat: None,
            next_panel_id: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// The backend tickets should be sent to.
    pub fn backend(&self) -> &Arc<dyn AugmenterBackend> {
        &self.backend
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == SessionStatus::InFlight
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_deref()
    }

    pub fn mode(&self) -> Option<ExtractionMode> {
        self.mode
    }

    pub fn table_case(&self) -> Option<TableCase> {
        self.table_case
    }

    /// Results of the last successful extraction, empty otherwise.
    pub fn results(&self) -> &[ExtractedItem] {
        self.viewer.items()
    }

    pub fn viewer(&self) -> &ResultViewer {
        &self.viewer
    }

    pub fn chat(&self) -> Option<&ChatPanel> {
        self.chat.as_ref()
    }

    /// Mutable panel access, for editing the draft.
    pub fn chat_mut(&mut self) -> Option<&mut ChatPanel> {
        self.chat.as_mut()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn notify(&self, notice: Notice) {
        self.observer.on_notice(&notice);
    }

    fn set_status(&mut self, to: SessionStatus) {
        let from = self.status;
        if from != to {
            debug!("Session status {} -> {}", from, to);
            self.status = to;
            self.observer.on_status_change(from, to);
        }
    }

    /// Refuse an action: one error notice, no state change.
    fn refuse<T>(&self, err: AugmenterError) -> Result<T, AugmenterError> {
        warn!("Refused: {}", err);
        self.notify(Notice::error(err.to_string()));
        Err(err)
    }

    fn guard_idle(&self) -> Result<(), AugmenterError> {
        if self.is_in_flight() {
            return self.refuse(AugmenterError::RequestInFlight);
        }
        Ok(())
    }

    /// Drop results, viewer and chat; status back to idle.
    fn drop_results(&mut self) {
        self.viewer.clear();
        self.chat = None;
        self.set_status(SessionStatus::Idle);
    }

    /// Drop the file and everything derived from it.
    fn reset(&mut self) {
        self.file = None;
        self.mode = None;
        self.table_case = None;
        self.drop_results();
    }

    // ── File selection ────────────────────────────────────────────────────

    /// Offer a file (or nothing) as the session's PDF.
    ///
    /// A PDF replaces the held file and resets mode, case and results. Any
    /// other candidate, or `None`, clears the held file. Either way exactly
    /// one notice is raised.
    pub fn select(&mut self, candidate: Option<FileCandidate>) -> Result<&SelectedFile, AugmenterError> {
        self.guard_idle()?;

        let Some(candidate) = candidate else {
            self.reset();
            self.notify(Notice::error(SELECT_PDF_NOTICE));
            return Err(AugmenterError::NoFileSelected);
        };

        match SelectedFile::try_from(candidate) {
            Ok(file) => {
                self.reset();
                info!("Selected {} ({} bytes)", file.name(), file.content().len());
                self.notify(Notice::success(format!("{} selected!", file.name())));
                Ok(&**self.file.insert(Arc::new(file)))
            }
            Err(err) => {
                warn!("Rejected selection: {}", err);
                self.reset();
                self.notify(Notice::error(SELECT_PDF_NOTICE));
                Err(err)
            }
        }
    }

    /// Empty the file and all dependent state.
    pub fn clear(&mut self) -> Result<(), AugmenterError> {
        self.guard_idle()?;
        self.reset();
        Ok(())
    }

    // ── Mode selection ────────────────────────────────────────────────────

    /// Choose what to extract. Resets the table case and drops results.
    pub fn set_mode(&mut self, mode: ExtractionMode) -> Result<(), AugmenterError> {
        self.guard_idle()?;
        if self.mode == Some(mode) {
            debug!("Mode already {}", mode);
            return Ok(());
        }
        self.mode = Some(mode);
        self.table_case = None;
        self.drop_results();
        Ok(())
    }

    /// Choose the table case. Returns `false` (and changes nothing) unless
    /// the mode is tables.
    pub fn set_table_case(&mut self, case: TableCase) -> Result<bool, AugmenterError> {
        self.guard_idle()?;
        if self.mode != Some(ExtractionMode::Tables) {
            debug!("Ignoring table case {} while mode is {:?}", case, self.mode);
            return Ok(false);
        }
        self.table_case = Some(case);
        Ok(true)
    }

    fn check_process(&self) -> Result<(Endpoint, ExtractionMode), AugmenterError> {
        if self.is_in_flight() {
            return Err(AugmenterError::RequestInFlight);
        }
        if self.file.is_none() {
            return Err(AugmenterError::NoFileSelected);
        }
        let mode = self.mode.ok_or(AugmenterError::ModeNotSelected)?;
        let endpoint =
            Endpoint::for_extraction(mode, self.table_case).ok_or(AugmenterError::TableCaseRequired)?;
        Ok((endpoint, mode))
    }

    /// The process action is enabled.
    pub fn can_process(&self) -> bool {
        self.check_process().is_ok()
    }

    // ── Extraction ────────────────────────────────────────────────────────

    /// Start an extraction request and return its ticket.
    ///
    /// Drops previous results and closes the viewer. On a failed
    /// precondition nothing changes and no request may be issued.
    pub fn begin_process(&mut self) -> Result<PendingExtraction, AugmenterError> {
        let (endpoint, mode) = match self.check_process() {
            Ok(v) => v,
            Err(err) => return self.refuse(err),
        };
        let file = match &self.file {
            Some(file) => Arc::clone(file),
            None => return self.refuse(AugmenterError::NoFileSelected),
        };

        self.viewer.clear();
        self.chat = None;
        self.set_status(SessionStatus::InFlight);
        info!("Extracting {} from {} via {}", mode, file.name(), endpoint);

        Ok(PendingExtraction {
            endpoint,
            mode,
            file,
        })
    }

    /// Apply the outcome of the request `pending` stands for.
    pub fn complete_process(
        &mut self,
        pending: PendingExtraction,
        result: Result<Vec<ExtractedItem>, AugmenterError>,
    ) -> SessionStatus {
        if !self.is_in_flight() {
            warn!("Discarding {} response: no request in flight", pending.endpoint);
            return self.status;
        }

        let result = result.and_then(|items| {
            match items.iter().find(|item| item.mode() != pending.mode) {
                Some(other) => Err(AugmenterError::KindMismatch {
                    expected: pending.mode,
                    found: other.mode(),
                }),
                None => Ok(items),
            }
        });

        match result {
            Ok(items) if items.is_empty() => {
                info!("{} returned no {}", pending.endpoint, pending.mode);
                self.set_status(SessionStatus::Empty);
                self.notify(Notice::error(format!("No {} found.", pending.mode)));
            }
            Ok(items) => {
                info!("{} returned {} {}", pending.endpoint, items.len(), pending.mode);
                self.viewer.load(items);
                self.set_status(SessionStatus::Results);
            }
            Err(err) => {
                error!("Extraction via {} failed: {}", pending.endpoint, err);
                self.set_status(SessionStatus::Error);
                self.notify(Notice::error(PROCESSING_FAILED_NOTICE));
            }
        }
        self.status
    }

    /// Give up on an outstanding request; the session returns to idle.
    pub fn abandon_process(&mut self, pending: PendingExtraction) {
        if self.is_in_flight() {
            info!("Abandoned request to {}", pending.endpoint);
            self.set_status(SessionStatus::Idle);
        }
    }

    /// Run one extraction request end to end.
    ///
    /// Precondition failures come back as `Err`; transport failures are
    /// absorbed into [`SessionStatus::Error`].
    pub async fn process(&mut self) -> Result<SessionStatus, AugmenterError> {
        let pending = self.begin_process()?;
        let backend = Arc::clone(&self.backend);
        let result = backend.extract(pending.endpoint, pending.file()).await;
        Ok(self.complete_process(pending, result))
    }

    // ── Viewer ────────────────────────────────────────────────────────────

    fn guard_viewer(&self) -> Result<(), AugmenterError> {
        self.guard_idle()?;
        if !self.viewer.is_open() {
            return self.refuse(AugmenterError::NoItemDisplayed);
        }
        Ok(())
    }

    /// Show the next item. Closes the question panel when the index moves.
    pub fn next(&mut self) -> Result<bool, AugmenterError> {
        self.guard_viewer()?;
        let moved = self.viewer.next();
        if moved {
            self.chat = None;
        }
        Ok(moved)
    }

    /// Show the previous item. Closes the question panel when the index moves.
    pub fn previous(&mut self) -> Result<bool, AugmenterError> {
        self.guard_viewer()?;
        let moved = self.viewer.previous();
        if moved {
            self.chat = None;
        }
        Ok(moved)
    }

    /// Hide the viewer. Results are kept and can be reopened.
    pub fn close_viewer(&mut self) -> Result<(), AugmenterError> {
        self.guard_idle()?;
        self.chat = None;
        self.viewer.close();
        if self.status == SessionStatus::Results {
            self.set_status(SessionStatus::Idle);
        }
        Ok(())
    }

    /// Re-open the viewer over kept results, at the first item.
    pub fn open_viewer(&mut self) -> Result<(), AugmenterError> {
        self.guard_idle()?;
        if !self.viewer.reopen() {
            return self.refuse(AugmenterError::NoItemDisplayed);
        }
        self.chat = None;
        self.set_status(SessionStatus::Results);
        Ok(())
    }

    // ── Questions ─────────────────────────────────────────────────────────

    /// Open a fresh question panel for the displayed item.
    pub fn open_chat(&mut self) -> Result<&mut ChatPanel, AugmenterError> {
        self.guard_viewer()?;
        let kind = match self.viewer.current() {
            Some(item) => item.mode(),
            None => return self.refuse(AugmenterError::NoItemDisplayed),
        };
        self.next_panel_id += 1;
        let panel = ChatPanel::new(self.next_panel_id, self.viewer.index(), kind);
        Ok(self.chat.insert(panel))
    }

    /// Close the question panel, discarding its transcript.
    pub fn close_chat(&mut self) {
        if self.chat.take().is_some() {
            debug!("Question panel closed");
        }
    }

    /// Validate a question and return the request to send.
    pub fn begin_ask(&mut self, question: &str) -> Result<PendingAnswer, AugmenterError> {
        let description = match self.viewer.current() {
            Some(item) => item.description().to_string(),
            None => return self.refuse(AugmenterError::NoItemDisplayed),
        };
        let (panel_id, begun) = match self.chat.as_mut() {
            Some(chat) => (chat.id(), chat.begin(question)),
            None => return self.refuse(AugmenterError::ChatClosed),
        };
        let question = match begun {
            Ok(q) => q,
            Err(err) => return self.refuse(err),
        };
        Ok(PendingAnswer {
            panel_id,
            request: AskRequest {
                question: question.clone(),
                table_description: description,
            },
            question,
        })
    }

    /// Apply the outcome of a question. Returns the new transcript entry on
    /// success; `None` on failure or when the panel it belonged to is gone.
    pub fn complete_ask(
        &mut self,
        pending: PendingAnswer,
        result: Result<String, AugmenterError>,
    ) -> Option<&Exchange> {
        let panel = match self.chat.as_mut() {
            Some(chat) if chat.id() == pending.panel_id => chat,
            _ => {
                match result {
                    Ok(_) => debug!("Discarding answer for a closed question panel"),
                    Err(err) => error!("Question failed after its panel closed: {}", err),
                }
                return None;
            }
        };
        match result {
            Ok(answer) => panel.finish(pending.question, Some(answer)),
            Err(err) => {
                panel.finish(pending.question, None);
                error!("Question failed: {}", err);
                self.observer.on_notice(&Notice::error(ANSWER_FAILED_NOTICE));
                None
            }
        }
    }

    /// Ask a question about the displayed item end to end.
    pub async fn ask(&mut self, question: &str) -> Result<Option<&Exchange>, AugmenterError> {
        let pending = self.begin_ask(question)?;
        let backend = Arc::clone(&self.backend);
        let result = backend.ask(pending.request()).await;
        Ok(self.complete_ask(pending, result))
    }

    /// Ask whatever is in the panel's draft input.
    pub async fn ask_draft(&mut self) -> Result<Option<&Exchange>, AugmenterError> {
        let draft = match &self.chat {
            Some(chat) => chat.draft().to_string(),
            None => return self.refuse(AugmenterError::ChatClosed),
        };
        self.ask(&draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PDF_MIME;
    use crate::model::TableItem;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixed(Mutex<Vec<Endpoint>>);

    #[async_trait]
    impl AugmenterBackend for Fixed {
        async fn extract(
            &self,
            endpoint: Endpoint,
            _file: &SelectedFile,
        ) -> Result<Vec<ExtractedItem>, AugmenterError> {
            self.0.lock().unwrap().push(endpoint);
            Ok(vec![ExtractedItem::Table(TableItem {
                preview_data: vec![vec!["A".into()]],
                description: "t".into(),
                page: None,
                table_index: Some(0),
            })])
        }

        async fn ask(&self, _request: &AskRequest) -> Result<String, AugmenterError> {
            Ok("42".into())
        }
    }

    fn pdf() -> FileCandidate {
        FileCandidate::new("report.pdf", PDF_MIME, b"%PDF-1.4".to_vec())
    }

    #[test]
    fn status_display() {
        assert_eq!(SessionStatus::InFlight.to_string(), "in_flight");
        assert_eq!(SessionStatus::default(), SessionStatus::Idle);
    }

    #[test]
    fn in_flight_blocks_other_actions() {
        let mut s = ExtractionSession::new(Arc::new(Fixed(Mutex::new(vec![]))));
        s.select(Some(pdf())).unwrap();
        s.set_mode(ExtractionMode::Images).unwrap();
        let ticket = s.begin_process().unwrap();
        assert!(s.is_in_flight());
        assert!(!s.can_process());

        assert!(matches!(s.select(Some(pdf())), Err(AugmenterError::RequestInFlight)));
        assert!(matches!(s.clear(), Err(AugmenterError::RequestInFlight)));
        assert!(matches!(
            s.set_mode(ExtractionMode::Tables),
            Err(AugmenterError::RequestInFlight)
        ));
        assert!(matches!(s.begin_process(), Err(AugmenterError::RequestInFlight)));
        assert_eq!(s.mode(), Some(ExtractionMode::Images));

        s.abandon_process(ticket);
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.can_process());
    }

    #[test]
    fn mismatched_kinds_are_a_failure() {
        let mut s = ExtractionSession::new(Arc::new(Fixed(Mutex::new(vec![]))));
        s.select(Some(pdf())).unwrap();
        s.set_mode(ExtractionMode::Formulas).unwrap();
        let ticket = s.begin_process().unwrap();
        let table = ExtractedItem::Table(TableItem {
            preview_data: vec![],
            description: String::new(),
            page: None,
            table_index: None,
        });
        assert_eq!(s.complete_process(ticket, Ok(vec![table])), SessionStatus::Error);
        assert!(s.results().is_empty());
    }

    #[tokio::test]
    async fn process_uses_case_endpoint() {
        let backend = Arc::new(Fixed(Mutex::new(vec![])));
        let mut s = ExtractionSession::new(backend.clone());
        s.select(Some(pdf())).unwrap();
        s.set_mode(ExtractionMode::Tables).unwrap();
        assert!(!s.can_process());
        assert!(s.set_table_case(TableCase::Case1).unwrap());
        assert_eq!(s.process().await.unwrap(), SessionStatus::Results);
        assert_eq!(
            backend.0.lock().unwrap().as_slice(),
            &[Endpoint::Tables(TableCase::Case1)]
        );
        assert!(s.viewer().is_open());
    }

    #[tokio::test]
    async fn stale_answer_is_discarded() {
        let mut s = ExtractionSession::new(Arc::new(Fixed(Mutex::new(vec![]))));
        s.select(Some(pdf())).unwrap();
        s.set_mode(ExtractionMode::Tables).unwrap();
        s.set_table_case(TableCase::Case3).unwrap();
        s.process().await.unwrap();

        s.open_chat().unwrap();
        let ticket = s.begin_ask("What?").unwrap();
        s.close_chat();
        s.open_chat().unwrap();
        assert!(s.complete_ask(ticket, Ok("late".into())).is_none());
        assert!(s.chat().unwrap().transcript().is_empty());
        assert!(!s.chat().unwrap().is_pending());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failure_for_closed_panel_is_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut s = ExtractionSession::new(Arc::new(Fixed(Mutex::new(vec![]))));
        s.select(Some(pdf())).unwrap();
        s.set_mode(ExtractionMode::Tables).unwrap();
        s.set_table_case(TableCase::Case1).unwrap();
        s.process().await.unwrap();

        s.open_chat().unwrap();
        let ticket = s.begin_ask("What?").unwrap();
        s.close_chat();
        let failure = AugmenterError::RequestFailed {
            endpoint: "/ask-question".into(),
            reason: "connection reset".into(),
        };
        assert!(s.complete_ask(ticket, Err(failure)).is_none());
        assert!(s.chat().is_none());

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("Question failed after its panel closed"), "{out}");
        assert!(out.contains("connection reset"), "{out}");
    }
}
