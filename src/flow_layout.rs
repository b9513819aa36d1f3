use core::fmt;
use std::sync::Arc;

/// Longest prefix of measured text echoed back in measurement errors.
const MEASUREMENT_SAMPLE_CHARS: usize = 32;

/// Text measurement hook supplied by the rendering layer.
///
/// Implementations map a string to its rendered width in the same linear
/// unit as margins and paper size. Results must be deterministic for
/// identical input within one layout pass; the engine does not cache, so
/// callers wanting performance should cache inside the measurer.
pub trait TextMeasurer: Send + Sync {
    /// Measure rendered text width.
    fn measure_width(&self, text: &str) -> f32;
}

impl<F> TextMeasurer for F
where
    F: Fn(&str) -> f32 + Send + Sync,
{
    fn measure_width(&self, text: &str) -> f32 {
        self(text)
    }
}

/// Inline style bitmask carried by formatting spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleFlags(u8);

impl StyleFlags {
    pub const NONE: Self = Self(0);
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(1 << 1);
    pub const UNDERLINE: Self = Self(1 << 2);

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild from raw bits, ignoring unknown bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::BOLD.0 | Self::ITALIC.0 | Self::UNDERLINE.0))
    }

    /// True when every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for StyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for StyleFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Opaque inline formatting metadata.
///
/// Span offsets are line-local on [`TextLine`] and document-absolute on
/// `Document`; [`project_spans`] converts between the two. The engine
/// carries spans but never renders them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormattingSpan {
    /// Start offset in the owning coordinate system.
    pub start: usize,
    /// Span length in characters.
    pub len: usize,
    /// Style flags for the span.
    pub flags: StyleFlags,
}

/// One laid-out visual line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLine {
    /// Line text, words rejoined with single spaces at wrap points.
    pub content: String,
    /// Offset of the line start in the source text.
    ///
    /// Wrapped-line offsets accumulate `previous content length + 1` and so
    /// assume single spaces between words; runs of spaces in the source are
    /// not recovered exactly.
    pub start_index: usize,
    /// Measured width of `content`, the last value the measurer returned
    /// for this exact text.
    pub width: f32,
    /// True when the line ends its paragraph (explicit newline or the
    /// paragraph's final wrapped segment), false at wrap points.
    pub is_hard_break: bool,
    /// Line-local formatting spans.
    pub spans: Vec<FormattingSpan>,
}

impl TextLine {
    /// Line length in characters.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True for an empty line (blank paragraph).
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Project document-absolute spans onto a line, clipping to line bounds.
///
/// Returns line-local spans for every absolute span that overlaps
/// `[line.start_index, line.start_index + line.len())`. Zero-length
/// intersections are dropped.
pub fn project_spans(document_spans: &[FormattingSpan], line: &TextLine) -> Vec<FormattingSpan> {
    let line_start = line.start_index;
    let line_end = line_start.saturating_add(line.len());
    let mut out = Vec::new();
    for span in document_spans {
        let span_end = span.start.saturating_add(span.len);
        let start = span.start.max(line_start);
        let end = span_end.min(line_end);
        if start < end {
            out.push(FormattingSpan {
                start: start - line_start,
                len: end - start,
                flags: span.flags,
            });
        }
    }
    out
}

/// Line-break failure.
#[derive(Clone, Debug, PartialEq)]
pub enum LineBreakError {
    /// Available width was zero, negative, or non-finite.
    InvalidWidth(f32),
    /// No measurement hook is installed on the engine.
    MissingMeasurer,
    /// The measurer returned a non-finite or negative width.
    Measurement {
        /// Offending width value.
        value: f32,
        /// Bounded prefix of the text that was being measured.
        sample: String,
    },
}

impl fmt::Display for LineBreakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWidth(width) => {
                write!(f, "available width must be positive, got {}", width)
            }
            Self::MissingMeasurer => write!(f, "no text measurer installed"),
            Self::Measurement { value, sample } => write!(
                f,
                "measurer returned invalid width {} for {:?}",
                value, sample
            ),
        }
    }
}

impl std::error::Error for LineBreakError {}

/// Line-break failure raised during a width-change re-layout.
///
/// Wraps the underlying [`LineBreakError`]; the cause is preserved and
/// reachable through [`std::error::Error::source`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReflowError(pub LineBreakError);

impl fmt::Display for ReflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reflow failed: {}", self.0)
    }
}

impl std::error::Error for ReflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<LineBreakError> for ReflowError {
    fn from(value: LineBreakError) -> Self {
        Self(value)
    }
}

/// Page-capacity estimation failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CapacityError {
    /// Line height was zero, negative, or non-finite.
    InvalidLineHeight(f32),
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLineHeight(height) => {
                write!(f, "line height must be positive, got {}", height)
            }
        }
    }
}

impl std::error::Error for CapacityError {}

/// Whole lines that fit in `available_height` at `line_height`.
///
/// Plain `floor(height / line_height)`: no rounding up and no minimum of
/// one, so an available height smaller than one line yields zero. Negative
/// or non-finite heights also yield zero.
pub fn estimate_lines_in_height(
    available_height: f32,
    line_height: f32,
) -> Result<usize, CapacityError> {
    if !(line_height > 0.0) || !line_height.is_finite() {
        return Err(CapacityError::InvalidLineHeight(line_height));
    }
    if !available_height.is_finite() || available_height <= 0.0 {
        return Ok(0);
    }
    Ok((available_height / line_height).floor() as usize)
}

/// Deterministic greedy line-break engine.
///
/// Pure and side-effect free: every call derives its output from the input
/// text, the available width, and the installed measurer alone, so the
/// engine is safe to share across threads.
#[derive(Clone, Default)]
pub struct LineBreakEngine {
    measurer: Option<Arc<dyn TextMeasurer>>,
}

impl fmt::Debug for LineBreakEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineBreakEngine")
            .field("has_measurer", &self.measurer.is_some())
            .finish()
    }
}

impl LineBreakEngine {
    /// Create an engine without a measurer installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a shared text measurer.
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = Some(measurer);
        self
    }

    /// True when a measurer is installed.
    pub fn has_measurer(&self) -> bool {
        self.measurer.is_some()
    }

    /// Break `text` into visual lines constrained by `available_width`.
    ///
    /// Hard-break markers (`\r\n` or `\n`) separate paragraphs; within a
    /// paragraph words accumulate greedily while the measured candidate
    /// stays within `available_width`. An empty current line always accepts
    /// its first word regardless of width, so a single word wider than the
    /// line is placed alone rather than dropped and the loop always makes
    /// forward progress.
    pub fn break_lines(
        &self,
        text: &str,
        available_width: f32,
    ) -> Result<Vec<TextLine>, LineBreakError> {
        if !(available_width > 0.0) || !available_width.is_finite() {
            return Err(LineBreakError::InvalidWidth(available_width));
        }
        let measurer = self
            .measurer
            .as_deref()
            .ok_or(LineBreakError::MissingMeasurer)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines = Vec::new();
        let mut offset = 0usize;
        let mut rest = text;
        loop {
            let (paragraph, separator_len) = split_paragraph(rest);
            break_paragraph(paragraph, offset, available_width, measurer, &mut lines)?;
            offset += paragraph.len() + separator_len;
            if separator_len == 0 {
                break;
            }
            rest = &rest[paragraph.len() + separator_len..];
        }
        Ok(lines)
    }

    /// Re-derive lines for a new available width.
    ///
    /// Pure re-derivation over the same text: no caching, no diffing.
    pub fn reflow(
        &self,
        text: &str,
        new_available_width: f32,
    ) -> Result<Vec<TextLine>, ReflowError> {
        self.break_lines(text, new_available_width)
            .map_err(ReflowError)
    }
}

/// Split off the first paragraph, returning it plus the separator length.
///
/// Separator length is 2 for `\r\n`, 1 for `\n`, 0 when no hard break
/// remains.
fn split_paragraph(text: &str) -> (&str, usize) {
    match text.find('\n') {
        Some(newline) => {
            if newline > 0 && text.as_bytes()[newline - 1] == b'\r' {
                (&text[..newline - 1], 2)
            } else {
                (&text[..newline], 1)
            }
        }
        None => (text, 0),
    }
}

fn break_paragraph(
    paragraph: &str,
    paragraph_start: usize,
    available_width: f32,
    measurer: &dyn TextMeasurer,
    out: &mut Vec<TextLine>,
) -> Result<(), LineBreakError> {
    if paragraph.is_empty() {
        out.push(TextLine {
            content: String::new(),
            start_index: paragraph_start,
            width: 0.0,
            is_hard_break: true,
            spans: Vec::new(),
        });
        return Ok(());
    }

    let mut line = String::new();
    let mut line_start = paragraph_start;
    let mut line_width = 0.0f32;
    for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
        if line.is_empty() {
            line.push_str(word);
            line_width = checked_measure(measurer, &line)?;
            continue;
        }

        let mut candidate = String::with_capacity(line.len() + 1 + word.len());
        candidate.push_str(&line);
        candidate.push(' ');
        candidate.push_str(word);
        let measured = checked_measure(measurer, &candidate)?;
        if measured <= available_width {
            line = candidate;
            line_width = measured;
        } else {
            let consumed = line.len();
            out.push(TextLine {
                content: line,
                start_index: line_start,
                width: line_width,
                is_hard_break: false,
                spans: Vec::new(),
            });
            line_start += consumed + 1;
            line = word.to_string();
            line_width = checked_measure(measurer, &line)?;
        }
    }

    out.push(TextLine {
        content: line,
        start_index: line_start,
        width: line_width,
        is_hard_break: true,
        spans: Vec::new(),
    });
    Ok(())
}

fn checked_measure(measurer: &dyn TextMeasurer, text: &str) -> Result<f32, LineBreakError> {
    let value = measurer.measure_width(text);
    if !value.is_finite() || value < 0.0 {
        let sample: String = text.chars().take(MEASUREMENT_SAMPLE_CHARS).collect();
        return Err(LineBreakError::Measurement { value, sample });
    }
    Ok(value)
}
