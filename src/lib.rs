//! Text flow and pagination engine for a paged document editor.
//!
//! `docflow` breaks a document buffer into width-constrained lines using an
//! injected text-measurement callback, estimates how many lines fit between
//! the vertical margins of a fixed-size page, and maintains a multi-page
//! [`Document`] aggregate with dirty tracking and change notifications.
//! [`FlowEngine`] ties the pieces together: it repaginates the buffer after
//! content edits and reflows it when margins change.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod document;
mod flow_engine;
mod flow_layout;
mod margins;

pub use document::{
    Document, DocumentEvent, Page, DEFAULT_MARGIN_PX, PAPER_HEIGHT_PX, PAPER_WIDTH_PX,
};
pub use flow_engine::{
    DocumentSnapshot, FlowEngine, FlowError, FlowSummary, SnapshotError, SNAPSHOT_SCHEMA_VERSION,
};
pub use flow_layout::{
    estimate_lines_in_height, project_spans, CapacityError, FormattingSpan, LineBreakEngine,
    LineBreakError, ReflowError, StyleFlags, TextLine, TextMeasurer,
};
pub use margins::{MarginError, Margins};
