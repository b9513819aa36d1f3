use core::fmt;

use crate::flow_layout::{FormattingSpan, TextLine};
use crate::margins::{MarginError, Margins};

/// Paper width in pixels at the reference DPI (A4 at 96 dpi).
pub const PAPER_WIDTH_PX: f32 = 794.0;
/// Paper height in pixels at the reference DPI (A4 at 96 dpi).
pub const PAPER_HEIGHT_PX: f32 = 1123.0;
/// Default inset on all sides (one inch at 96 dpi).
pub const DEFAULT_MARGIN_PX: f32 = 96.0;

/// One page of a multi-page document.
///
/// Pages are owned exclusively by [`Document`]; after any structural
/// mutation `page_number` is the contiguous sequence `1..=N` matching list
/// position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub page_number: usize,
    /// Raw page text.
    pub content: String,
    /// Laid-out lines attached to this page.
    pub lines: Vec<TextLine>,
}

impl Page {
    /// Create an empty page.
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            content: String::new(),
            lines: Vec::new(),
        }
    }

    /// Create a page with initial content and no lines.
    pub fn with_content(page_number: usize, content: impl Into<String>) -> Self {
        Self {
            page_number,
            content: content.into(),
            lines: Vec::new(),
        }
    }

    /// True when the page carries text or laid-out lines.
    pub fn has_content(&self) -> bool {
        !self.content.is_empty() || !self.lines.is_empty()
    }
}

/// Change notification emitted by [`Document`] mutations.
///
/// Delivery is synchronous on the mutating call, in mutation order. Only
/// effective mutations emit; setting a property to its current value is a
/// no-op and emits nothing.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentEvent {
    /// The editable content buffer changed.
    ContentChanged,
    /// Margins were replaced.
    MarginsChanged { old: Margins, new: Margins },
    /// The page list length changed.
    PageCountChanged { page_count: usize },
    /// The current page cursor moved.
    CurrentPageChanged { page_index: usize },
}

type Observer = Box<dyn FnMut(&DocumentEvent)>;

/// Multi-page document aggregate.
///
/// Holds the flat editable buffer, margins, the owned page list (never
/// empty), the current-page cursor, and the dirty flag. Single-writer:
/// all mutating calls are expected to originate from one logical thread
/// (the host's event loop); observers run synchronously on that thread.
pub struct Document {
    content: String,
    margins: Margins,
    pages: Vec<Page>,
    current_page_index: usize,
    dirty: bool,
    formatting_spans: Vec<FormattingSpan>,
    observers: Vec<Observer>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("content_len", &self.content.len())
            .field("margins", &self.margins)
            .field("page_count", &self.pages.len())
            .field("current_page_index", &self.current_page_index)
            .field("dirty", &self.dirty)
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with one empty page, default margins, not dirty.
    pub fn new() -> Self {
        Self {
            content: String::new(),
            margins: Margins::uniform_const(DEFAULT_MARGIN_PX),
            pages: vec![Page::new(1)],
            current_page_index: 0,
            dirty: false,
            formatting_spans: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Rebuild a document from persisted parts, ending not dirty.
    ///
    /// Callers must pass an already-repaired page list (non-empty,
    /// contiguously numbered) and an in-range cursor.
    pub(crate) fn from_parts(
        content: String,
        margins: Margins,
        pages: Vec<Page>,
        current_page_index: usize,
        formatting_spans: Vec<FormattingSpan>,
    ) -> Self {
        Self {
            content,
            margins,
            pages,
            current_page_index,
            dirty: false,
            formatting_spans,
            observers: Vec::new(),
        }
    }

    /// Register a change observer.
    pub fn subscribe(&mut self, observer: impl FnMut(&DocumentEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: DocumentEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    /// Current editable buffer.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the editable buffer.
    ///
    /// Setting the current value is a no-op: no event, no dirty flag.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content == self.content {
            return;
        }
        self.content = content;
        self.dirty = true;
        self.emit(DocumentEvent::ContentChanged);
    }

    /// Current margins.
    pub fn margins(&self) -> Margins {
        self.margins
    }

    /// Replace margins after validating them against the paper size.
    ///
    /// Rejects totals that meet or exceed the paper dimension (strict `<`
    /// is required to leave any content area at all). On failure the
    /// margins, dirty flag, and observers are completely untouched. This
    /// does not re-run line breaking; the orchestration layer reflows
    /// afterwards with the new available width.
    pub fn update_margins(&mut self, margins: Margins) -> Result<(), MarginError> {
        let total_horizontal = margins.total_horizontal();
        if total_horizontal >= PAPER_WIDTH_PX {
            return Err(MarginError::ExceedsPaperWidth {
                total: total_horizontal,
                paper: PAPER_WIDTH_PX,
            });
        }
        let total_vertical = margins.total_vertical();
        if total_vertical >= PAPER_HEIGHT_PX {
            return Err(MarginError::ExceedsPaperHeight {
                total: total_vertical,
                paper: PAPER_HEIGHT_PX,
            });
        }
        if margins == self.margins {
            return Ok(());
        }
        let old = self.margins;
        self.margins = margins;
        self.dirty = true;
        self.emit(DocumentEvent::MarginsChanged { old, new: margins });
        Ok(())
    }

    /// Paper width minus horizontal margins.
    pub fn available_width(&self) -> f32 {
        PAPER_WIDTH_PX - self.margins.total_horizontal()
    }

    /// Paper height minus vertical margins.
    pub fn available_height(&self) -> f32 {
        PAPER_HEIGHT_PX - self.margins.total_vertical()
    }

    /// Number of pages; always at least one.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Owned pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page at `index`, or `None` when out of range. Never panics.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Page under the cursor.
    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current_page_index)
    }

    /// 0-based cursor into the page list.
    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    /// 1-based page number under the cursor.
    pub fn current_page_number(&self) -> usize {
        self.current_page_index + 1
    }

    /// Append an empty page.
    pub fn add_page(&mut self) {
        self.add_page_with_content(String::new());
    }

    /// Append a page with initial content.
    pub fn add_page_with_content(&mut self, content: impl Into<String>) {
        let page_number = self.pages.len() + 1;
        self.pages.push(Page::with_content(page_number, content));
        self.dirty = true;
        self.emit(DocumentEvent::PageCountChanged {
            page_count: self.pages.len(),
        });
    }

    /// Remove the page at `index`.
    ///
    /// Returns false without touching state when `index` is out of range or
    /// only one page remains; the last page can never be removed. On
    /// success remaining pages are renumbered `1..=N` and the cursor is
    /// clamped back into range.
    pub fn remove_page(&mut self, index: usize) -> bool {
        if index >= self.pages.len() || self.pages.len() == 1 {
            return false;
        }
        self.pages.remove(index);
        self.renumber_pages();
        log::debug!("removed page {}, {} remain", index + 1, self.pages.len());
        self.dirty = true;
        self.emit(DocumentEvent::PageCountChanged {
            page_count: self.pages.len(),
        });
        let clamped = self.current_page_index.min(self.pages.len() - 1);
        if clamped != self.current_page_index {
            self.current_page_index = clamped;
            self.emit(DocumentEvent::CurrentPageChanged {
                page_index: clamped,
            });
        }
        true
    }

    /// Replace the whole page list.
    ///
    /// Used by the orchestration layer after repagination. An empty list is
    /// replaced by a single fresh page; pages are renumbered `1..=N` and
    /// the cursor is clamped. Marks the document dirty.
    pub fn set_pages(&mut self, pages: Vec<Page>) {
        let old_count = self.pages.len();
        self.pages = if pages.is_empty() {
            vec![Page::new(1)]
        } else {
            pages
        };
        self.renumber_pages();
        self.dirty = true;
        if self.pages.len() != old_count {
            self.emit(DocumentEvent::PageCountChanged {
                page_count: self.pages.len(),
            });
        }
        let clamped = self.current_page_index.min(self.pages.len() - 1);
        if clamped != self.current_page_index {
            self.current_page_index = clamped;
            self.emit(DocumentEvent::CurrentPageChanged {
                page_index: clamped,
            });
        }
    }

    /// Move the cursor to `index`.
    ///
    /// Returns false without change for an out-of-range index. Moving to
    /// the current index succeeds as a no-op (no event, no dirty flag).
    pub fn go_to_page(&mut self, index: usize) -> bool {
        if index >= self.pages.len() {
            return false;
        }
        if index == self.current_page_index {
            return true;
        }
        self.current_page_index = index;
        self.dirty = true;
        self.emit(DocumentEvent::CurrentPageChanged { page_index: index });
        true
    }

    /// Move to the next page; false at the last page.
    pub fn go_to_next_page(&mut self) -> bool {
        if self.current_page_index + 1 >= self.pages.len() {
            return false;
        }
        self.go_to_page(self.current_page_index + 1)
    }

    /// Move to the previous page; false at the first page.
    pub fn go_to_previous_page(&mut self) -> bool {
        if self.current_page_index == 0 {
            return false;
        }
        self.go_to_page(self.current_page_index - 1)
    }

    /// Unconditional jump to the first page.
    pub fn go_to_first_page(&mut self) {
        let _ = self.go_to_page(0);
    }

    /// Unconditional jump to the last page.
    pub fn go_to_last_page(&mut self) {
        let _ = self.go_to_page(self.pages.len() - 1);
    }

    /// Remove all pages and insert one fresh empty page, cursor at 0.
    pub fn clear_pages(&mut self) {
        let old_count = self.pages.len();
        let old_index = self.current_page_index;
        self.pages = vec![Page::new(1)];
        self.current_page_index = 0;
        self.dirty = true;
        if old_count != 1 {
            self.emit(DocumentEvent::PageCountChanged { page_count: 1 });
        }
        if old_index != 0 {
            self.emit(DocumentEvent::CurrentPageChanged { page_index: 0 });
        }
    }

    /// Document-absolute formatting spans.
    pub fn formatting_spans(&self) -> &[FormattingSpan] {
        &self.formatting_spans
    }

    /// Replace the document-absolute formatting spans.
    pub fn set_formatting_spans(&mut self, spans: Vec<FormattingSpan>) {
        if spans == self.formatting_spans {
            return;
        }
        self.formatting_spans = spans;
        self.dirty = true;
    }

    /// Unsaved-mutation flag.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag; touches nothing else.
    pub fn mark_as_saved(&mut self) {
        self.dirty = false;
    }

    fn renumber_pages(&mut self) {
        for (position, page) in self.pages.iter_mut().enumerate() {
            page.page_number = position + 1;
        }
    }
}
