use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{Document, Page};
use crate::flow_layout::{
    estimate_lines_in_height, CapacityError, FormattingSpan, LineBreakEngine, ReflowError,
    StyleFlags, TextLine, TextMeasurer,
};
use crate::margins::{MarginError, Margins};

/// Summary emitted after a pagination pass completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowSummary {
    /// Total pages produced.
    pub page_count: usize,
    /// Total laid-out lines across all pages.
    pub line_count: usize,
}

/// Orchestration failure during pagination or a margin-driven reflow.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowError {
    /// Margin validation failed; the document was left untouched.
    Margin(MarginError),
    /// Line breaking failed during re-layout.
    Reflow(ReflowError),
    /// Page-capacity estimation failed.
    Capacity(CapacityError),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Margin(err) => write!(f, "margin update rejected: {}", err),
            Self::Reflow(err) => write!(f, "{}", err),
            Self::Capacity(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Margin(err) => Some(err),
            Self::Reflow(err) => Some(err),
            Self::Capacity(err) => Some(err),
        }
    }
}

impl From<ReflowError> for FlowError {
    fn from(value: ReflowError) -> Self {
        Self::Reflow(value)
    }
}

impl From<CapacityError> for FlowError {
    fn from(value: CapacityError) -> Self {
        Self::Capacity(value)
    }
}

/// Glue between the line-break engine and the document/page model.
///
/// Owns the measurement hook and the font line height supplied by the
/// rendering layer, and re-derives the page list whenever content or
/// available width change. Pagination is a pure re-derivation over the
/// current buffer; nothing is cached between passes.
#[derive(Clone, Debug)]
pub struct FlowEngine {
    line_break: LineBreakEngine,
    line_height: f32,
}

impl FlowEngine {
    /// Create an engine with the rendering layer's font line height.
    ///
    /// The line height is validated on use by the capacity estimator.
    pub fn new(line_height: f32) -> Self {
        Self {
            line_break: LineBreakEngine::new(),
            line_height,
        }
    }

    /// Install a shared text measurer.
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.line_break = self.line_break.with_measurer(measurer);
        self
    }

    /// Underlying line-break engine.
    pub fn line_break(&self) -> &LineBreakEngine {
        &self.line_break
    }

    /// Font line height in use.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Re-run line breaking over the document buffer and rebuild its pages.
    ///
    /// Lines are broken at the document's current available width, then
    /// grouped by the capacity estimate for the available height. The page
    /// list always ends up non-empty and contiguously numbered; the cursor
    /// is clamped by the document.
    pub fn paginate(&self, doc: &mut Document) -> Result<FlowSummary, FlowError> {
        let lines = self
            .line_break
            .reflow(doc.content(), doc.available_width())?;
        let capacity = estimate_lines_in_height(doc.available_height(), self.line_height)?;
        // The estimator may legitimately report zero lines per page; page
        // assembly still advances by at least one line per page.
        let lines_per_page = capacity.max(1);

        let line_count = lines.len();
        let mut pages = Vec::with_capacity(line_count / lines_per_page + 1);
        let mut chunk = lines.into_iter().peekable();
        while chunk.peek().is_some() {
            let page_lines: Vec<TextLine> = chunk.by_ref().take(lines_per_page).collect();
            let mut page = Page::with_content(pages.len() + 1, join_page_content(&page_lines));
            page.lines = page_lines;
            pages.push(page);
        }

        let summary = FlowSummary {
            page_count: pages.len().max(1),
            line_count,
        };
        doc.set_pages(pages);
        log::debug!(
            "paginated {} lines into {} pages ({} per page)",
            summary.line_count,
            summary.page_count,
            lines_per_page
        );
        Ok(summary)
    }

    /// Apply new margins, then repaginate at the new available width.
    ///
    /// A rejected margin update leaves the document completely untouched.
    pub fn reflow_margins(
        &self,
        doc: &mut Document,
        margins: Margins,
    ) -> Result<FlowSummary, FlowError> {
        doc.update_margins(margins).map_err(FlowError::Margin)?;
        self.paginate(doc)
    }
}

/// Rebuild page text from its lines: space at wrap points, newline at hard
/// breaks.
fn join_page_content(lines: &[TextLine]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|line| line.len() + 1).sum());
    for (position, line) in lines.iter().enumerate() {
        out.push_str(&line.content);
        if position + 1 < lines.len() {
            out.push(if line.is_hard_break { '\n' } else { ' ' });
        }
    }
    out
}

/// Persisted-snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// Snapshot restore failure.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotError {
    /// Snapshot was written by an unsupported schema version.
    UnsupportedVersion { found: u8 },
    /// JSON payload could not be decoded.
    Decode { detail: String },
    /// Persisted margins were invalid.
    Margin(MarginError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found } => write!(
                f,
                "unsupported snapshot version {} (expected {})",
                found, SNAPSHOT_SCHEMA_VERSION
            ),
            Self::Decode { detail } => write!(f, "snapshot decode failed: {}", detail),
            Self::Margin(err) => write!(f, "snapshot margins invalid: {}", err),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Margin(err) => Some(err),
            _ => None,
        }
    }
}

/// Versioned persisted form of a [`Document`].
///
/// This is the shape the serializer collaborator reads and writes. A
/// restored document is never dirty, and its structural invariants
/// (non-empty page list, contiguous numbering, in-range cursor) are
/// repaired against malformed input rather than trusted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    version: u8,
    content: String,
    margins: PersistedMargins,
    pages: Vec<PersistedPage>,
    current_page_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    formatting_spans: Vec<PersistedSpan>,
}

impl DocumentSnapshot {
    /// Capture the persisted form of a document.
    pub fn capture(doc: &Document) -> Self {
        Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            content: doc.content().to_string(),
            margins: doc.margins().into(),
            pages: doc.pages().iter().map(PersistedPage::from).collect(),
            current_page_index: doc.current_page_index(),
            formatting_spans: doc
                .formatting_spans()
                .iter()
                .copied()
                .map(PersistedSpan::from)
                .collect(),
        }
    }

    /// Rebuild a live document; the result is not dirty.
    pub fn restore(self) -> Result<Document, SnapshotError> {
        if self.version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
            });
        }
        let margins = Margins::try_from(self.margins).map_err(SnapshotError::Margin)?;

        let mut pages: Vec<Page> = self.pages.into_iter().map(Page::from).collect();
        if pages.is_empty() {
            log::warn!("snapshot had no pages; inserting an empty page");
            pages.push(Page::new(1));
        }
        let mut renumbered = false;
        for (position, page) in pages.iter_mut().enumerate() {
            if page.page_number != position + 1 {
                page.page_number = position + 1;
                renumbered = true;
            }
        }
        if renumbered {
            log::warn!("snapshot page numbering was not contiguous; renumbered");
        }
        let current_page_index = self.current_page_index.min(pages.len() - 1);

        Ok(Document::from_parts(
            self.content,
            margins,
            pages,
            current_page_index,
            self.formatting_spans
                .into_iter()
                .map(FormattingSpan::from)
                .collect(),
        ))
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|err| SnapshotError::Decode {
            detail: err.to_string(),
        })
    }

    /// Decode from JSON.
    pub fn from_json(payload: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(payload).map_err(|err| SnapshotError::Decode {
            detail: err.to_string(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct PersistedMargins {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl From<Margins> for PersistedMargins {
    fn from(value: Margins) -> Self {
        Self {
            left: value.left(),
            right: value.right(),
            top: value.top(),
            bottom: value.bottom(),
        }
    }
}

impl TryFrom<PersistedMargins> for Margins {
    type Error = MarginError;

    fn try_from(value: PersistedMargins) -> Result<Self, Self::Error> {
        Margins::new(value.left, value.right, value.top, value.bottom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct PersistedPage {
    page_number: usize,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    lines: Vec<PersistedTextLine>,
}

impl From<&Page> for PersistedPage {
    fn from(page: &Page) -> Self {
        Self {
            page_number: page.page_number,
            content: page.content.clone(),
            lines: page.lines.iter().map(PersistedTextLine::from).collect(),
        }
    }
}

impl From<PersistedPage> for Page {
    fn from(value: PersistedPage) -> Self {
        Self {
            page_number: value.page_number,
            content: value.content,
            lines: value.lines.into_iter().map(TextLine::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct PersistedTextLine {
    content: String,
    start_index: usize,
    width: f32,
    is_hard_break: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    spans: Vec<PersistedSpan>,
}

impl From<&TextLine> for PersistedTextLine {
    fn from(line: &TextLine) -> Self {
        Self {
            content: line.content.clone(),
            start_index: line.start_index,
            width: line.width,
            is_hard_break: line.is_hard_break,
            spans: line.spans.iter().copied().map(PersistedSpan::from).collect(),
        }
    }
}

impl From<PersistedTextLine> for TextLine {
    fn from(value: PersistedTextLine) -> Self {
        Self {
            content: value.content,
            start_index: value.start_index,
            width: value.width,
            is_hard_break: value.is_hard_break,
            spans: value.spans.into_iter().map(FormattingSpan::from).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct PersistedSpan {
    start: usize,
    len: usize,
    flags: u8,
}

impl From<FormattingSpan> for PersistedSpan {
    fn from(value: FormattingSpan) -> Self {
        Self {
            start: value.start,
            len: value.len,
            flags: value.flags.bits(),
        }
    }
}

impl From<PersistedSpan> for FormattingSpan {
    fn from(value: PersistedSpan) -> Self {
        Self {
            start: value.start,
            len: value.len,
            flags: StyleFlags::from_bits(value.flags),
        }
    }
}
