//! Question-and-answer panel scoped to one displayed item.
//!
//! A [`ChatPanel`] lives only as long as its item stays on screen. The
//! session drops it when the panel or viewer closes or the index moves, so
//! a transcript never outlives the item it talks about.

use crate::error::AugmenterError;
use crate::mode::ExtractionMode;

const TABLE_QUESTIONS: &[&str] = &[
    "What is the main purpose of this table?",
    "What do the columns of this table represent?",
    "Which row stands out the most, and why?",
    "What trends or patterns are visible in the table?",
    "Are there any missing or inconsistent values?",
    "What are the largest and smallest values shown?",
    "What conclusions can be drawn from this table?",
    "How does this table relate to the document's content?",
];

const IMAGE_QUESTIONS: &[&str] = &[
    "What is the main purpose of this image?",
    "What are the key elements shown in the image?",
    "What type of image is this (e.g., chart, diagram, photo)?",
    "What trends or patterns are evident in the image?",
    "What is the most prominent feature in the image?",
    "Are there any notable details or anomalies in the image?",
    "What insights can be drawn from the image?",
    "How does this image relate to the document's content?",
];

const FORMULA_QUESTIONS: &[&str] = &[
    "What is the main purpose of this formula?",
    "What are the key variables in the formula?",
    "What type of formula is this (e.g., algebraic, differential)?",
    "What physical or mathematical concept does this formula represent?",
    "Can you explain the derivation of this formula?",
    "What are the implications or applications of this formula?",
    "Are there any notable assumptions in this formula?",
    "How does this formula relate to the document's content?",
];

/// Canned questions offered for an item kind.
pub fn suggested_questions(kind: ExtractionMode) -> &'static [&'static str] {
    match kind {
        ExtractionMode::Tables => TABLE_QUESTIONS,
        ExtractionMode::Images => IMAGE_QUESTIONS,
        ExtractionMode::Formulas => FORMULA_QUESTIONS,
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Transcript, draft input and pending flag for one open panel.
#[derive(Debug, Clone)]
pub struct ChatPanel {
    id: u64,
    item_index: usize,
    kind: ExtractionMode,
    transcript: Vec<Exchange>,
    draft: String,
    pending: bool,
    suggestions_visible: bool,
}

impl ChatPanel {
    pub(crate) fn new(id: u64, item_index: usize, kind: ExtractionMode) -> Self {
        Self {
            id,
            item_index,
            kind,
            transcript: Vec::new(),
            draft: String::new(),
            pending: false,
            suggestions_visible: true,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Index of the item this panel asks about.
    pub fn item_index(&self) -> usize {
        self.item_index
    }

    pub fn kind(&self) -> ExtractionMode {
        self.kind
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the text in the input box.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// An answer is outstanding; submitting is disabled.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Submitting `question` would be accepted.
    pub fn can_ask(&self, question: &str) -> bool {
        !self.pending && !question.trim().is_empty()
    }

    /// Suggestions to show; empty once the first question was asked.
    pub fn suggestions(&self) -> &'static [&'static str] {
        if self.suggestions_visible {
            suggested_questions(self.kind)
        } else {
            &[]
        }
    }

    /// Validate and mark a question as sent. Returns the trimmed question.
    pub(crate) fn begin(&mut self, question: &str) -> Result<String, AugmenterError> {
        if self.pending {
            return Err(AugmenterError::AnswerPending);
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(AugmenterError::EmptyQuestion);
        }
        self.pending = true;
        self.suggestions_visible = false;
        Ok(question.to_string())
    }

    /// Record the outcome of the question sent by `begin`.
    pub(crate) fn finish(&mut self, question: String, answer: Option<String>) -> Option<&Exchange> {
        self.pending = false;
        let answer = answer?;
        self.draft.clear();
        self.transcript.push(Exchange { question, answer });
        self.transcript.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_suggestions() {
        for kind in ExtractionMode::ALL {
            assert_eq!(suggested_questions(kind).len(), 8);
        }
        assert!(suggested_questions(ExtractionMode::Images)[0].contains("image"));
    }

    #[test]
    fn blank_questions_are_refused() {
        let mut p = ChatPanel::new(1, 0, ExtractionMode::Tables);
        assert!(!p.can_ask("   "));
        assert!(matches!(p.begin("  \n"), Err(AugmenterError::EmptyQuestion)));
        assert!(!p.is_pending());
        assert_eq!(p.suggestions().len(), 8);
    }

    #[test]
    fn one_question_at_a_time() {
        let mut p = ChatPanel::new(1, 0, ExtractionMode::Formulas);
        assert_eq!(p.begin("  What is x? ").unwrap(), "What is x?");
        assert!(p.is_pending());
        assert!(p.suggestions().is_empty());
        assert!(matches!(p.begin("again"), Err(AugmenterError::AnswerPending)));
    }

    #[test]
    fn success_appends_and_clears_draft() {
        let mut p = ChatPanel::new(1, 2, ExtractionMode::Tables);
        p.set_draft("What is x?");
        let draft = p.draft().to_string();
        let q = p.begin(&draft).unwrap();
        let ex = p.finish(q, Some(String::new())).cloned().unwrap();
        assert_eq!(ex.question, "What is x?");
        assert_eq!(ex.answer, "");
        assert_eq!(p.transcript().len(), 1);
        assert!(p.draft().is_empty());
        assert!(!p.is_pending());
    }

    #[test]
    fn failure_leaves_no_trace() {
        let mut p = ChatPanel::new(1, 0, ExtractionMode::Images);
        p.set_draft("why?");
        let q = p.begin("why?").unwrap();
        assert!(p.finish(q, None).is_none());
        assert!(p.transcript().is_empty());
        assert_eq!(p.draft(), "why?");
        assert!(!p.is_pending());
    }
}
