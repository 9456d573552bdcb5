use serde::Serialize;

use super::metrics::text_width;

/// A4 portrait, millimetres
pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 20.0;
pub const LINE_HEIGHT: f64 = 6.0;

/// Space kept free at the bottom of every page before breaking
const BOTTOM_RESERVE: f64 = 30.0;
/// Cursor position at the top of a fresh page
const TOP_OFFSET: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One drawing instruction, positioned in page coordinates.
///
/// Text `y` is the baseline, as in PDF text placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        text: String,
    },
    Rule {
        x1: f64,
        x2: f64,
        y: f64,
        thickness: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text runs on this page, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Rule { .. } => None,
        })
    }
}

/// A laid-out report, ready for a PDF backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text run of the document, page after page
    pub fn lines(&self) -> Vec<&str> {
        self.pages.iter().flat_map(Page::texts).collect()
    }
}

/// Writing cursor over a growing document.
///
/// Each call draws at the current offset and moves it down; nothing is ever
/// drawn above the cursor.
#[derive(Debug)]
pub struct Canvas {
    y: f64,
    pages: Vec<Page>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            y: TOP_OFFSET,
            pages: vec![Page::default()],
        }
    }

    /// Current vertical offset in millimetres
    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Move the cursor without drawing. Used for the closing marker, which
    /// sits at a fixed distance from the bottom edge.
    pub fn move_to(&mut self, y: f64) {
        self.y = y;
    }

    fn current_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn push_text(&mut self, text: &str, x: f64, size: f64, bold: bool) {
        let y = self.y;
        self.current_page().ops.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            text: text.to_string(),
        });
    }

    /// Centered heading; advances by `font_size / 2 + 5`
    pub fn add_title(&mut self, text: &str, font_size: f64, bold: bool) {
        let width = text_width(text, font_size, bold);
        let x = (PAGE_WIDTH - width) / 2.0;
        self.push_text(text, x, font_size, bold);
        self.y += font_size / 2.0 + 5.0;
    }

    /// Single line of text; advances by one line height
    pub fn add_line(&mut self, text: &str, font_size: f64, align: Align, bold: bool) {
        let width = text_width(text, font_size, bold);
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => (PAGE_WIDTH - width) / 2.0,
            Align::Right => PAGE_WIDTH - width - MARGIN,
        };
        self.push_text(text, x, font_size, bold);
        self.y += LINE_HEIGHT;
    }

    /// Horizontal rule across the content width; advances by 5
    pub fn add_separator(&mut self, thickness: f64) {
        let y = self.y;
        self.current_page().ops.push(DrawOp::Rule {
            x1: MARGIN,
            x2: PAGE_WIDTH - MARGIN,
            y,
            thickness,
        });
        self.y += 5.0;
    }

    pub fn add_space(&mut self, height: f64) {
        self.y += height;
    }

    /// Start a new page when `extra_lines` more lines would run into the
    /// bottom reserve. Returns whether a page was added.
    pub fn check_page_break(&mut self, extra_lines: usize) -> bool {
        if self.y + extra_lines as f64 * LINE_HEIGHT > PAGE_HEIGHT - BOTTOM_RESERVE {
            self.pages.push(Page::default());
            self.y = TOP_OFFSET;
            return true;
        }
        false
    }

    pub fn finish(self) -> Document {
        Document { pages: self.pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_text(canvas: Canvas) -> (f64, f64) {
        let doc = canvas.finish();
        match &doc.pages[0].ops[0] {
            DrawOp::Text { x, y, .. } => (*x, *y),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn title_is_centered_and_advances_by_half_size_plus_five() {
        let mut canvas = Canvas::new();
        canvas.add_title("RAPPORT", 16.0, true);
        assert_eq!(canvas.y(), 20.0 + 8.0 + 5.0);

        let width = text_width("RAPPORT", 16.0, true);
        let (x, y) = only_text(canvas);
        assert!((x - (PAGE_WIDTH - width) / 2.0).abs() < 1e-9);
        assert_eq!(y, 20.0);
    }

    #[test]
    fn line_alignment() {
        let text = "Montant: 1 500,00 FCFA";
        let width = text_width(text, 10.0, false);

        let mut left = Canvas::new();
        left.add_line(text, 10.0, Align::Left, false);
        assert_eq!(left.y(), 26.0);
        assert_eq!(only_text(left).0, MARGIN);

        let mut right = Canvas::new();
        right.add_line(text, 10.0, Align::Right, false);
        assert!((only_text(right).0 - (PAGE_WIDTH - width - MARGIN)).abs() < 1e-9);

        let mut center = Canvas::new();
        center.add_line(text, 10.0, Align::Center, false);
        assert!((only_text(center).0 - (PAGE_WIDTH - width) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn separator_spans_content_width() {
        let mut canvas = Canvas::new();
        canvas.add_separator(0.3);
        assert_eq!(canvas.y(), 25.0);
        let doc = canvas.finish();
        assert_eq!(
            doc.pages[0].ops[0],
            DrawOp::Rule {
                x1: 20.0,
                x2: 190.0,
                y: 20.0,
                thickness: 0.3
            }
        );
    }

    #[test]
    fn space_only_moves_cursor() {
        let mut canvas = Canvas::new();
        canvas.add_space(10.0);
        assert_eq!(canvas.y(), 30.0);
        assert!(canvas.finish().pages[0].ops.is_empty());
    }

    #[test]
    fn page_break_when_block_would_overflow() {
        let mut canvas = Canvas::new();
        canvas.move_to(250.0);
        // 250 + 2 * 6 = 262 fits under 267
        assert!(!canvas.check_page_break(2));
        // 250 + 3 * 6 = 268 does not
        assert!(canvas.check_page_break(3));
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(canvas.y(), 20.0);
    }

    #[test]
    fn break_lands_on_exact_limit_without_new_page() {
        let mut canvas = Canvas::new();
        canvas.move_to(261.0);
        assert!(!canvas.check_page_break(1));
        assert_eq!(canvas.page_count(), 1);
    }
}
