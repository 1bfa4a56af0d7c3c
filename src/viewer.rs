//! Paginated, read-only view over an extraction result.
//!
//! [`ResultViewer`] owns the result collection and the current index. The
//! session decides when it opens and closes; the viewer only guarantees
//! its own invariants:
//!
//! - `index < len` whenever the collection is non-empty, `0` otherwise;
//! - `next`/`previous` never leave `[0, len - 1]` and are no-ops at the
//!   boundaries;
//! - closing resets the index to `0` but keeps the items.

use crate::error::AugmenterError;
use crate::input::image_output_path;
use crate::model::{image_format, ExtractedItem, FormulaItem, ImageItem, TableItem};
use crate::sanitize::sanitize_str;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Cells wider than this are cut with an ellipsis when drawn.
pub const MAX_CELL_WIDTH: usize = 28;

/// Result collection plus cursor.
#[derive(Debug, Clone, Default)]
pub struct ResultViewer {
    items: Vec<ExtractedItem>,
    index: usize,
    open: bool,
}

impl ResultViewer {
    /// Replace the collection and open at the first item.
    pub(crate) fn load(&mut self, items: Vec<ExtractedItem>) {
        self.open = !items.is_empty();
        self.items = items;
        self.index = 0;
    }

    /// Drop the collection and close.
    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.index = 0;
        self.open = false;
    }

    /// Hide the viewer. Items are kept; position returns to the first item.
    pub(crate) fn close(&mut self) {
        self.open = false;
        self.index = 0;
    }

    /// Re-open over the kept items at the first one. `false` if there are none.
    pub(crate) fn reopen(&mut self) -> bool {
        self.index = 0;
        self.open = !self.items.is_empty();
        self.open
    }

    /// Advance one item. Returns whether the index moved.
    pub(crate) fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Go back one item. Returns whether the index moved.
    pub(crate) fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn items(&self) -> &[ExtractedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The "next" control is enabled.
    pub fn has_next(&self) -> bool {
        self.open && self.index + 1 < self.items.len()
    }

    /// The "previous" control is enabled.
    pub fn has_previous(&self) -> bool {
        self.open && self.index > 0
    }

    /// The displayed item, if the viewer is open.
    pub fn current(&self) -> Option<&ExtractedItem> {
        if self.open {
            self.items.get(self.index)
        } else {
            None
        }
    }

    /// Render the displayed item, header included.
    pub fn render_current(&self) -> Option<String> {
        self.current()
            .map(|item| render_item(item, self.index, self.items.len()))
    }
}

/// Header line, e.g. `Table 2 of 5 (Pages 3-4)`.
pub fn header(item: &ExtractedItem, index: usize, total: usize) -> String {
    let mut s = format!("{} {} of {}", item.mode().item_label(), index + 1, total);
    if let Some(page) = item.page() {
        let _ = write!(s, " ({page})");
    }
    s
}

/// Render one item as plain text.
pub fn render_item(item: &ExtractedItem, index: usize, total: usize) -> String {
    let body = match item {
        ExtractedItem::Table(t) => render_table(t),
        ExtractedItem::Image(i) => render_image(i),
        ExtractedItem::Formula(f) => render_formula(f),
    };
    format!(
        "{}\n\n{}\n\n{}\n",
        header(item, index, total),
        body,
        item.description().trim_end()
    )
}

/// Draw every row and column of a table as a text grid.
pub fn render_table(table: &TableItem) -> String {
    let columns = table.column_count();
    if columns == 0 {
        return "(empty table)".to_string();
    }

    let cell = |row: &[String], c: usize| -> String {
        truncate_cell(row.get(c).map(String::as_str).unwrap_or(""), MAX_CELL_WIDTH)
    };

    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            table
                .preview_data
                .iter()
                .map(|row| cell(row, c).chars().count())
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let border = {
        let mut s = String::from("+");
        for w in &widths {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
        }
        s
    };

    let mut out = String::with_capacity((border.len() + 1) * (table.preview_data.len() + 2));
    out.push_str(&border);
    out.push('\n');
    for row in &table.preview_data {
        out.push('|');
        for (c, w) in widths.iter().enumerate() {
            let text = cell(row, c);
            let pad = w - text.chars().count();
            let _ = write!(out, " {}{} |", text, " ".repeat(pad));
        }
        out.push('\n');
    }
    out.push_str(&border);
    out
}

/// Cut text to `max` characters, marking the cut with `…`.
///
/// Newlines inside a cell are flattened so the grid stays aligned.
pub fn truncate_cell(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() > max {
        let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        flat
    }
}

fn render_image(image: &ImageItem) -> String {
    match image.decode() {
        Ok(Some(bytes)) => {
            let format = image_format(&bytes)
                .or_else(|| image.declared_mime().and_then(|m| m.strip_prefix("image/")))
                .unwrap_or("unknown");
            format!("[{} image, {} bytes]", format, bytes.len())
        }
        Ok(None) => "[no image data]".to_string(),
        Err(_) => "[image payload could not be decoded]".to_string(),
    }
}

/// Decode an image item and write it under `dir`.
///
/// The file is named `{stem}-image-{index + 1}.{ext}`, the extension taken
/// from the decoded bytes.
pub async fn save_image(
    image: &ImageItem,
    dir: &Path,
    stem: &str,
    index: usize,
) -> Result<PathBuf, AugmenterError> {
    let bytes = image
        .decode()?
        .ok_or_else(|| AugmenterError::Internal(format!("image {} has no data", index + 1)))?;
    let path = image_output_path(dir, stem, index, image_format(&bytes));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| AugmenterError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| AugmenterError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

fn render_formula(formula: &FormulaItem) -> String {
    format!("    {}", sanitize_str(&formula.preview_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageRef;
    use crate::sanitize::NO_FORMULA_PLACEHOLDER;

    fn table(rows: &[&[&str]]) -> ExtractedItem {
        ExtractedItem::Table(TableItem {
            preview_data: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            description: "d".into(),
            page: Some(PageRef::Label("Pages 3-4".into())),
            table_index: None,
        })
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut v = ResultViewer::default();
        v.load(vec![table(&[&["a"]]), table(&[&["b"]]), table(&[&["c"]])]);
        assert!(v.is_open());
        assert_eq!(v.index(), 0);
        assert!(!v.has_previous());
        assert!(!v.previous());
        assert_eq!(v.index(), 0);

        assert!(v.next());
        assert!(v.next());
        assert_eq!(v.index(), 2);
        assert!(!v.has_next());
        assert!(!v.next());
        assert_eq!(v.index(), 2);
    }

    #[test]
    fn close_resets_index_but_keeps_items() {
        let mut v = ResultViewer::default();
        v.load(vec![table(&[&["a"]]), table(&[&["b"]])]);
        v.next();
        v.close();
        assert!(!v.is_open());
        assert_eq!(v.index(), 0);
        assert_eq!(v.len(), 2);
        assert!(v.current().is_none());
        assert!(!v.has_next());

        assert!(v.reopen());
        assert_eq!(v.index(), 0);
    }

    #[test]
    fn empty_load_stays_closed() {
        let mut v = ResultViewer::default();
        v.load(vec![]);
        assert!(!v.is_open());
        assert!(!v.reopen());
    }

    #[test]
    fn table_grid_keeps_every_row_and_column() {
        let item = table(&[&["A", "B", "C"], &["1", "2"], &["x", "y", "z"]]);
        let ExtractedItem::Table(t) = &item else { unreachable!() };
        let grid = render_table(t);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 5, "{grid}");
        assert_eq!(lines[1], "| A | B | C |");
        assert_eq!(lines[2], "| 1 | 2 |   |");
        assert_eq!(lines[0], lines[4]);
    }

    #[test]
    fn long_cells_are_cut_visually() {
        assert_eq!(truncate_cell("abcdef", 4), "abc…");
        assert_eq!(truncate_cell("abc", 4), "abc");
        assert_eq!(truncate_cell("a\nb", 4), "a b");
    }

    #[test]
    fn header_includes_page() {
        let item = table(&[&["A"]]);
        assert_eq!(header(&item, 1, 5), "Table 2 of 5 (Pages 3-4)");
    }

    #[test]
    fn formula_is_sanitised_before_rendering() {
        let item = ExtractedItem::Formula(FormulaItem {
            preview_data: "Â²".into(),
            description: "squared".into(),
            page: Some(PageRef::Number(7)),
            equation_index: Some(1),
        });
        let out = render_item(&item, 0, 1);
        assert!(out.starts_with("Formula 1 of 1 (Page 7)"));
        assert!(out.contains(NO_FORMULA_PLACEHOLDER));
        assert!(out.is_ascii());
    }

    #[test]
    fn image_summary() {
        let item = ExtractedItem::Image(ImageItem {
            base64: "iVBORw0KGgo=".into(),
            description: "chart".into(),
            page: None,
            image_index: None,
        });
        let out = render_item(&item, 0, 2);
        assert!(out.contains("[png image, 8 bytes]"), "{out}");
    }

    #[tokio::test]
    async fn saves_decoded_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageItem {
            base64: "data:image/png;base64,iVBORw0KGgo=".into(),
            description: String::new(),
            page: None,
            image_index: None,
        };
        let path = save_image(&image, dir.path(), "report", 1).await.unwrap();
        assert!(path.ends_with("report-image-2.png"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 8);
    }

    #[test]
    fn empty_image_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageItem {
            base64: String::new(),
            description: String::new(),
            page: None,
            image_index: None,
        };
        let result = tokio_test::block_on(save_image(&image, dir.path(), "report", 0));
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
