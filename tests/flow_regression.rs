use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use docflow::{
    estimate_lines_in_height, Document, DocumentEvent, DocumentSnapshot, FlowEngine, FlowError,
    LineBreakEngine, LineBreakError, Margins, DEFAULT_MARGIN_PX, PAPER_HEIGHT_PX, PAPER_WIDTH_PX,
};

/// Measurer that charges a fixed width per character, like a monospace font.
fn char_cell_measurer(cell_width: f32) -> Arc<dyn docflow::TextMeasurer> {
    Arc::new(move |text: &str| text.chars().count() as f32 * cell_width)
}

fn char_cell_breaker(cell_width: f32) -> LineBreakEngine {
    LineBreakEngine::new().with_measurer(char_cell_measurer(cell_width))
}

fn recording_document() -> (Document, Rc<RefCell<Vec<DocumentEvent>>>) {
    let mut doc = Document::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    doc.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    (doc, events)
}

#[test]
fn default_document_geometry() {
    let doc = Document::new();
    assert_eq!(doc.margins(), Margins::uniform(DEFAULT_MARGIN_PX).unwrap());
    assert_eq!(doc.available_width(), PAPER_WIDTH_PX - 2.0 * DEFAULT_MARGIN_PX);
    assert_eq!(
        doc.available_height(),
        PAPER_HEIGHT_PX - 2.0 * DEFAULT_MARGIN_PX
    );
    assert_eq!(doc.page_count(), 1);
    assert!(!doc.is_dirty());
}

#[test]
fn single_short_line_keeps_measured_width() {
    let lines = char_cell_breaker(8.0)
        .break_lines("Hello World", 602.0)
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].content, "Hello World");
    assert_eq!(lines[0].start_index, 0);
    assert_eq!(lines[0].width, 88.0);
    assert!(lines[0].is_hard_break);
}

#[test]
fn newlines_always_produce_hard_breaks() {
    let lines = char_cell_breaker(8.0)
        .break_lines("first\nsecond\nthird", 602.0)
        .unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.is_hard_break));
    let contents: Vec<&str> = lines.iter().map(|line| line.content.as_str()).collect();
    assert_eq!(contents, ["first", "second", "third"]);
}

#[test]
fn wrapped_lines_never_exceed_available_width() {
    let breaker = char_cell_breaker(10.0);
    let text = "the quick brown fox jumps over the lazy dog and keeps on running \
                until the page runs out of horizontal room entirely";
    let lines = breaker.break_lines(text, 200.0).unwrap();
    assert!(lines.len() > 1, "text must wrap at this width");
    for line in &lines {
        let single_word = !line.content.contains(' ');
        assert!(
            line.width <= 200.0 || single_word,
            "line {:?} is {}px wide",
            line.content,
            line.width
        );
    }
}

#[test]
fn oversized_word_is_placed_alone_and_overflows() {
    let lines = char_cell_breaker(10.0)
        .break_lines("a incomprehensibilities b", 100.0)
        .unwrap();
    let contents: Vec<&str> = lines.iter().map(|line| line.content.as_str()).collect();
    assert_eq!(contents, ["a", "incomprehensibilities", "b"]);
    assert!(lines[1].width > 100.0);
}

#[test]
fn capacity_estimate_floors_fractional_lines() {
    assert_eq!(estimate_lines_in_height(1000.0, 20.0).unwrap(), 50);
    assert_eq!(estimate_lines_in_height(1000.0, 30.0).unwrap(), 33);
    assert_eq!(estimate_lines_in_height(0.0, 20.0).unwrap(), 0);
    assert_eq!(estimate_lines_in_height(-5.0, 20.0).unwrap(), 0);
    assert!(estimate_lines_in_height(1000.0, 0.0).is_err());
}

#[test]
fn missing_measurer_is_an_error_for_non_empty_text() {
    let breaker = LineBreakEngine::new();
    assert!(matches!(
        breaker.break_lines("text", 100.0),
        Err(LineBreakError::MissingMeasurer)
    ));
    // Empty text produces no lines once the preconditions pass.
    assert_eq!(
        char_cell_breaker(8.0).break_lines("", 100.0).unwrap(),
        Vec::new()
    );
}

#[test]
fn margins_consuming_paper_width_are_rejected() {
    let mut doc = Document::new();
    let margins = Margins::new(397.0, 397.0, 50.0, 50.0).unwrap();
    let err = doc.update_margins(margins).unwrap_err();
    assert!(matches!(err, docflow::MarginError::ExceedsPaperWidth { .. }));
    assert_eq!(doc.margins(), Margins::uniform(DEFAULT_MARGIN_PX).unwrap());
    assert!(!doc.is_dirty(), "rejected update must not touch the document");
}

#[test]
fn removing_a_middle_page_renumbers_contiguously() {
    let mut doc = Document::new();
    doc.add_page();
    doc.add_page();
    assert_eq!(doc.page_count(), 3);

    assert!(doc.remove_page(1));
    let numbers: Vec<usize> = doc.pages().iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, [1, 2]);
}

#[test]
fn last_page_cannot_be_removed() {
    let mut doc = Document::new();
    assert!(!doc.remove_page(0));
    assert_eq!(doc.page_count(), 1);
}

#[test]
fn navigation_is_clamped_at_document_edges() {
    let mut doc = Document::new();
    doc.add_page();
    doc.add_page();

    assert!(!doc.go_to_previous_page(), "already on the first page");
    assert!(doc.go_to_next_page());
    assert!(doc.go_to_next_page());
    assert!(!doc.go_to_next_page(), "already on the last page");
    assert_eq!(doc.current_page_number(), 3);

    doc.go_to_first_page();
    assert_eq!(doc.current_page_index(), 0);
    doc.go_to_last_page();
    assert_eq!(doc.current_page_index(), 2);
    assert!(!doc.go_to_page(99));
}

#[test]
fn equal_value_updates_are_silent_no_ops() {
    let (mut doc, events) = recording_document();
    doc.set_content("stable");
    doc.mark_as_saved();
    events.borrow_mut().clear();

    doc.set_content("stable");
    let margins = doc.margins();
    doc.update_margins(margins).unwrap();
    assert!(doc.go_to_page(0));

    assert!(!doc.is_dirty());
    assert!(
        events.borrow().is_empty(),
        "no-op updates must not notify: {:?}",
        events.borrow()
    );
}

#[test]
fn mutations_raise_events_and_set_dirty() {
    let (mut doc, events) = recording_document();
    doc.set_content("hello");
    doc.update_margins(Margins::uniform(50.0).unwrap()).unwrap();
    doc.add_page();
    assert!(doc.go_to_next_page());

    assert!(doc.is_dirty());
    let seen = events.borrow();
    assert!(seen.iter().any(|e| matches!(e, DocumentEvent::ContentChanged)));
    assert!(seen
        .iter()
        .any(|e| matches!(e, DocumentEvent::MarginsChanged { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, DocumentEvent::PageCountChanged { page_count: 2 })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, DocumentEvent::CurrentPageChanged { page_index: 1 })));
}

#[test]
fn pagination_is_deterministic() {
    let engine = FlowEngine::new(20.0).with_measurer(char_cell_measurer(8.0));
    let text = "alpha beta gamma delta\nepsilon zeta eta theta iota kappa lambda mu \
                nu xi omicron pi rho sigma tau upsilon phi chi psi omega";

    let mut first = Document::new();
    first.set_content(text);
    engine.paginate(&mut first).unwrap();

    let mut second = Document::new();
    second.set_content(text);
    engine.paginate(&mut second).unwrap();

    assert_eq!(first.pages(), second.pages());
}

#[test]
fn narrower_margins_reflow_to_fewer_lines() {
    let engine = FlowEngine::new(20.0).with_measurer(char_cell_measurer(8.0));
    let mut doc = Document::new();
    doc.set_content(
        "one two three four five six seven eight nine ten eleven twelve thirteen \
         fourteen fifteen sixteen seventeen eighteen nineteen twenty",
    );
    engine.paginate(&mut doc).unwrap();
    let default_lines: usize = doc.pages().iter().map(|p| p.lines.len()).sum();

    engine
        .reflow_margins(&mut doc, Margins::new(10.0, 10.0, 96.0, 96.0).unwrap())
        .unwrap();
    let wide_lines: usize = doc.pages().iter().map(|p| p.lines.len()).sum();
    assert!(
        wide_lines < default_lines,
        "wider text area must need fewer lines ({} vs {})",
        wide_lines,
        default_lines
    );
}

#[test]
fn reflow_without_measurer_reports_missing_measurer() {
    let engine = FlowEngine::new(20.0);
    let mut doc = Document::new();
    doc.set_content("needs measuring");
    let err = engine.paginate(&mut doc).unwrap_err();
    assert!(matches!(
        err,
        FlowError::Reflow(ref reflow) if reflow.0 == LineBreakError::MissingMeasurer
    ));
}

#[test]
fn snapshot_round_trip_preserves_state_and_clears_dirty() {
    let engine = FlowEngine::new(20.0).with_measurer(char_cell_measurer(8.0));
    let mut doc = Document::new();
    doc.set_content("persisted body text\nwith a second paragraph");
    engine.paginate(&mut doc).unwrap();
    assert!(doc.is_dirty());

    let json = DocumentSnapshot::capture(&doc).to_json().unwrap();
    let restored = DocumentSnapshot::from_json(&json).unwrap().restore().unwrap();

    assert_eq!(restored.content(), doc.content());
    assert_eq!(restored.pages(), doc.pages());
    assert_eq!(restored.margins(), doc.margins());
    assert!(!restored.is_dirty(), "a freshly restored document is clean");
}
