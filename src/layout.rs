//! Page geometry for rendered body pages

/// Length in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f32);

impl Length {
    /// Create a length from points
    pub fn from_pt(pt: f32) -> Self {
        Length(pt)
    }

    /// Create a length from millimeters
    pub fn from_mm(mm: f32) -> Self {
        Length(mm * 72.0 / 25.4)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f32) -> Self {
        Length(inches * 72.0)
    }

    /// Get the value in points
    pub fn pt(&self) -> f32 {
        self.0
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f32 {
        self.0 * 25.4 / 72.0
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_inches(8.5),
            height: Length::from_inches(11.0),
        }
    }

    /// MediaBox array for a page of this size
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width.pt(), self.height.pt()]
    }
}

/// Margins for page content
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Length,
    pub bottom: Length,
    pub left: Length,
    pub right: Length,
}

impl Margins {
    /// Report margins: narrow sides, a tall top band left free for the
    /// overlay template's letterhead
    pub fn report() -> Self {
        Self {
            left: Length::from_pt(30.0),
            right: Length::from_pt(15.0),
            top: Length::from_pt(70.0),
            bottom: Length::from_pt(30.0),
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::report()
    }
}

/// Rectangle available to body text, in PDF coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentArea {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl ContentArea {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// Calculate the area inside the margins
pub fn content_area(page: &PageDimensions, margins: &Margins) -> ContentArea {
    ContentArea {
        left: margins.left.pt(),
        bottom: margins.bottom.pt(),
        right: page.width.pt() - margins.right.pt(),
        top: page.height.pt() - margins.top.pt(),
    }
}
