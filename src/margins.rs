use core::fmt;

/// Validated page margins in pixels at the reference DPI.
///
/// All four insets are finite and non-negative. The type is an immutable
/// value: changing margins means constructing a replacement via
/// [`Margins::new`]. Validation against the paper size happens at the
/// consumer (`Document::update_margins`), not here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Margins {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl Margins {
    /// Construct margins, rejecting any negative or non-finite component.
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Result<Self, MarginError> {
        for (component, value) in [
            ("left", left),
            ("right", right),
            ("top", top),
            ("bottom", bottom),
        ] {
            // `!(value >= 0.0)` also rejects NaN.
            if !(value >= 0.0) || !value.is_finite() {
                return Err(MarginError::Negative { component, value });
            }
        }
        Ok(Self {
            left,
            right,
            top,
            bottom,
        })
    }

    /// Construct uniform margins with the same inset on all sides.
    pub fn uniform(inset: f32) -> Result<Self, MarginError> {
        Self::new(inset, inset, inset, inset)
    }

    /// Uniform margins from a compile-time non-negative inset.
    pub(crate) const fn uniform_const(inset: f32) -> Self {
        Self {
            left: inset,
            right: inset,
            top: inset,
            bottom: inset,
        }
    }

    /// Left inset.
    pub fn left(&self) -> f32 {
        self.left
    }

    /// Right inset.
    pub fn right(&self) -> f32 {
        self.right
    }

    /// Top inset.
    pub fn top(&self) -> f32 {
        self.top
    }

    /// Bottom inset.
    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    /// Combined horizontal inset (`left + right`).
    pub fn total_horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Combined vertical inset (`top + bottom`).
    pub fn total_vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl fmt::Display for Margins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} right={} top={} bottom={}",
            self.left, self.right, self.top, self.bottom
        )
    }
}

/// Margin validation failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarginError {
    /// A component was negative (or non-finite).
    Negative {
        component: &'static str,
        value: f32,
    },
    /// Horizontal insets meet or exceed the paper width.
    ExceedsPaperWidth { total: f32, paper: f32 },
    /// Vertical insets meet or exceed the paper height.
    ExceedsPaperHeight { total: f32, paper: f32 },
}

impl fmt::Display for MarginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { component, value } => {
                write!(f, "margin component {} is invalid: {}", component, value)
            }
            Self::ExceedsPaperWidth { total, paper } => write!(
                f,
                "horizontal margins {} meet or exceed paper width {}",
                total, paper
            ),
            Self::ExceedsPaperHeight { total, paper } => write!(
                f,
                "vertical margins {} meet or exceed paper height {}",
                total, paper
            ),
        }
    }
}

impl std::error::Error for MarginError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_non_negative_components() {
        let margins = Margins::new(96.0, 96.0, 48.0, 0.0).unwrap();
        assert_eq!(margins.left(), 96.0);
        assert_eq!(margins.right(), 96.0);
        assert_eq!(margins.top(), 48.0);
        assert_eq!(margins.bottom(), 0.0);
    }

    #[test]
    fn new_rejects_negative_component() {
        let err = Margins::new(10.0, -1.0, 10.0, 10.0).unwrap_err();
        assert_eq!(
            err,
            MarginError::Negative {
                component: "right",
                value: -1.0
            }
        );
    }

    #[test]
    fn new_rejects_non_finite_component() {
        assert!(Margins::new(f32::NAN, 0.0, 0.0, 0.0).is_err());
        assert!(Margins::new(0.0, 0.0, f32::INFINITY, 0.0).is_err());
    }

    #[test]
    fn totals_are_component_sums() {
        let margins = Margins::new(10.0, 20.0, 30.0, 40.0).unwrap();
        assert_eq!(margins.total_horizontal(), 30.0);
        assert_eq!(margins.total_vertical(), 70.0);
    }

    #[test]
    fn uniform_applies_same_inset_on_all_sides() {
        let margins = Margins::uniform(25.0).unwrap();
        assert_eq!(margins.total_horizontal(), 50.0);
        assert_eq!(margins.total_vertical(), 50.0);
    }
}
