//! Extraction mode, table case and the endpoint each combination maps to.
//!
//! The backend exposes one endpoint per content kind, and three for tables:
//! the table case decides how much of the surrounding document the backend
//! feeds into the description it generates.
//!
//! | Mode     | Case  | Endpoint                                   |
//! |----------|-------|--------------------------------------------|
//! | tables   | case1 | `/extract-description/first-case/tables`   |
//! | tables   | case2 | `/extract-description/second-case/tables`  |
//! | tables   | case3 | `/extract-description/tables`              |
//! | images   | -     | `/extract-description/images`              |
//! | formulas | -     | `/extract-description/formulas`            |
//!
//! The pre-case `/extract-description` endpoint is still served and is
//! available as [`Endpoint::LegacyTables`], but no mode/case pair selects it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the backend is asked to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Tables,
    Images,
    Formulas,
}

impl ExtractionMode {
    /// All modes in menu order.
    pub const ALL: [ExtractionMode; 3] = [Self::Tables, Self::Images, Self::Formulas];

    /// Lower-case plural name, as used in notices ("No tables found.").
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Images => "images",
            Self::Formulas => "formulas",
        }
    }

    /// Singular label for viewer headers ("Table 2 of 5").
    pub fn item_label(self) -> &'static str {
        match self {
            Self::Tables => "Table",
            Self::Images => "Image",
            Self::Formulas => "Formula",
        }
    }

    /// Whether this mode needs a [`TableCase`] before it can be processed.
    pub fn requires_case(self) -> bool {
        matches!(self, Self::Tables)
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tables" | "table" => Ok(Self::Tables),
            "images" | "image" => Ok(Self::Images),
            "formulas" | "formula" | "equations" => Ok(Self::Formulas),
            other => Err(format!(
                "unknown extraction mode '{other}' (expected tables, images or formulas)"
            )),
        }
    }
}

/// Description strategy for extracted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableCase {
    /// Describe the table from its own cells only.
    Case1,
    /// Add the text chunks before and after the table.
    Case2,
    /// Full context: surrounding text, references to the table, document title.
    Case3,
}

impl TableCase {
    pub const ALL: [TableCase; 3] = [Self::Case1, Self::Case2, Self::Case3];

    /// Short human label shown next to the case selector.
    pub fn label(self) -> &'static str {
        match self {
            Self::Case1 => "Table Data Only",
            Self::Case2 => "Before and after context",
            Self::Case3 => "References + Title",
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Case1 => 1,
            Self::Case2 => 2,
            Self::Case3 => 3,
        }
    }
}

impl fmt::Display for TableCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case{}", self.number())
    }
}

impl FromStr for TableCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().trim_start_matches("case") {
            "1" => Ok(Self::Case1),
            "2" => Ok(Self::Case2),
            "3" => Ok(Self::Case3),
            _ => Err(format!("unknown table case '{s}' (expected 1, 2 or 3)")),
        }
    }
}

/// A backend route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `POST /extract-description`, tables without a case.
    LegacyTables,
    /// Table extraction with the given description strategy.
    Tables(TableCase),
    Images,
    Formulas,
    /// `POST /ask-question`.
    AskQuestion,
}

impl Endpoint {
    /// Path relative to the configured base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::LegacyTables => "/extract-description",
            Self::Tables(TableCase::Case1) => "/extract-description/first-case/tables",
            Self::Tables(TableCase::Case2) => "/extract-description/second-case/tables",
            Self::Tables(TableCase::Case3) => "/extract-description/tables",
            Self::Images => "/extract-description/images",
            Self::Formulas => "/extract-description/formulas",
            Self::AskQuestion => "/ask-question",
        }
    }

    /// The extraction endpoint for a mode, or `None` when tables lack a case.
    pub fn for_extraction(mode: ExtractionMode, case: Option<TableCase>) -> Option<Self> {
        match mode {
            ExtractionMode::Tables => case.map(Self::Tables),
            ExtractionMode::Images => Some(Self::Images),
            ExtractionMode::Formulas => Some(Self::Formulas),
        }
    }

    /// Kind of items an extraction endpoint returns.
    pub fn extraction_mode(self) -> Option<ExtractionMode> {
        match self {
            Self::LegacyTables | Self::Tables(_) => Some(ExtractionMode::Tables),
            Self::Images => Some(ExtractionMode::Images),
            Self::Formulas => Some(ExtractionMode::Formulas),
            Self::AskQuestion => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
