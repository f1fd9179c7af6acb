use crate::canvas::Canvas;
use crate::font::{Base14, measure_text_width, split_text_to_size};
use crate::types::{Color, Pt, Rect, Size};
use problemdeck_catalog::ContentRecord;

pub const ACCENT: Color = Color {
    r: 96.0 / 255.0,
    g: 165.0 / 255.0,
    b: 250.0 / 255.0,
};
const CALLOUT_FILL: (u8, u8, u8) = (25, 35, 55);
const CALLOUT_TEXT: (u8, u8, u8) = (220, 220, 220);
const CARD_FILL: (u8, u8, u8) = (25, 25, 25);
const CARD_BORDER: (u8, u8, u8) = (64, 64, 64);
const CARD_ID: (u8, u8, u8) = (150, 150, 150);
const CARD_BODY: (u8, u8, u8) = (200, 200, 200);
const CARD_TAGS: (u8, u8, u8) = (140, 140, 140);

const CORNER_RADIUS_MM: f32 = 4.0;
const BORDER_WIDTH_MM: f32 = 0.4;

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::from_rgb8(r, g, b)
}

/// How the frame treats the gap in front of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    /// Dropped when the block opens a fresh frame.
    pub space_before: Pt,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            space_before: Pt::ZERO,
        }
    }
}

/// A block that can be measured and then drawn at a position. Blocks are
/// never split; a block that does not fit moves to the next page whole.
pub trait Flowable: Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn pagination(&self) -> Pagination {
        Pagination::default()
    }

    fn is_card(&self) -> bool {
        false
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// Draws `text` so that its baseline sits at `baseline`.
fn text_at_baseline(canvas: &mut Canvas, x: Pt, baseline: Pt, size: Pt, text: &str) {
    canvas.draw_string(x, baseline - size, text);
}

fn draw_lines(canvas: &mut Canvas, x: Pt, first_baseline: Pt, size: Pt, pitch: Pt, lines: &[String]) {
    let mut baseline = first_baseline;
    for line in lines {
        text_at_baseline(canvas, x, baseline, size, line);
        baseline += pitch;
    }
}

/// Centred document heading. Its baseline sits on the block's top edge, so
/// the glyphs rise into the top margin and the block only reserves the gap
/// below the baseline.
#[derive(Debug, Clone)]
pub struct TitleBlock {
    text: String,
    font_size: Pt,
    height: Pt,
}

impl TitleBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: Pt::from_f32(32.0),
            height: Pt::from_mm(12.0),
        }
    }
}

impl Flowable for TitleBlock {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height,
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let width = measure_text_width(Base14::HelveticaBold, self.font_size, &self.text);
        let left = x + ((avail_width - width) / 2).max(Pt::ZERO);
        canvas.set_fill_color(ACCENT);
        canvas.set_font(Base14::HelveticaBold, self.font_size);
        text_at_baseline(canvas, left, y, self.font_size, &self.text);
    }

    fn debug_name(&self) -> &'static str {
        "TitleBlock"
    }
}

/// Rounded highlight box with a bold heading and a wrapped description.
#[derive(Debug, Clone)]
pub struct CalloutBox {
    title: String,
    body: String,
    padding: Pt,
}

impl CalloutBox {
    pub fn new(title: impl Into<String>, body: impl Into<String>, padding: Pt) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            padding,
        }
    }

    fn body_lines(&self, avail_width: Pt) -> Vec<String> {
        let inner = (avail_width - self.padding * 2).max(Pt::ZERO);
        split_text_to_size(&self.body, Base14::Helvetica, Pt::from_f32(9.0), inner)
    }

    fn height_for(line_count: usize) -> Pt {
        Pt::from_mm(6.0) + Pt::from_mm(4.5) * line_count as i32 + Pt::from_mm(4.0)
    }
}

impl Flowable for CalloutBox {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: Self::height_for(self.body_lines(avail_width).len()),
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.body_lines(avail_width);
        let rect = Rect {
            x,
            y,
            width: avail_width,
            height: Self::height_for(lines.len()),
        };
        canvas.set_fill_color(rgb(CALLOUT_FILL));
        canvas.set_stroke_color(ACCENT);
        canvas.set_line_width(Pt::from_mm(BORDER_WIDTH_MM));
        canvas.rounded_rect_path(rect, Pt::from_mm(CORNER_RADIUS_MM));
        canvas.fill_stroke();

        let text_x = x + self.padding;
        let heading_size = Pt::from_f32(10.0);
        canvas.set_fill_color(ACCENT);
        canvas.set_font(Base14::HelveticaBold, heading_size);
        text_at_baseline(canvas, text_x, y + Pt::from_mm(5.0), heading_size, &self.title);

        let body_size = Pt::from_f32(9.0);
        canvas.set_fill_color(rgb(CALLOUT_TEXT));
        canvas.set_font(Base14::Helvetica, body_size);
        draw_lines(
            canvas,
            text_x,
            y + Pt::from_mm(9.5),
            body_size,
            Pt::from_mm(4.5),
            &lines,
        );
    }

    fn debug_name(&self) -> &'static str {
        "CalloutBox"
    }
}

/// Faint accent rule across the frame. The rule is drawn at the block's top
/// edge and the block height is the gap that follows it.
#[derive(Debug, Clone)]
pub struct Divider {
    space_before: Pt,
    gap_after: Pt,
}

impl Divider {
    pub fn new(space_before: Pt, gap_after: Pt) -> Self {
        Self {
            space_before,
            gap_after,
        }
    }
}

impl Flowable for Divider {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.gap_after,
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        canvas.save_state();
        canvas.set_opacity(1.0, 0.25);
        canvas.set_stroke_color(ACCENT);
        canvas.set_line_width(Pt::from_mm(0.3));
        canvas.line(x, y, x + avail_width, y);
        canvas.restore_state();
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            space_before: self.space_before,
        }
    }

    fn debug_name(&self) -> &'static str {
        "Divider"
    }
}

/// Wrapped text of a card, measured once per width.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub title_lines: Vec<String>,
    pub body_lines: Vec<String>,
    pub tag_lines: Vec<String>,
    pub height: Pt,
}

/// One bordered record card: category badge and `#id` on the first row,
/// then title, body and tags.
#[derive(Debug, Clone)]
pub struct ProblemCard {
    record: ContentRecord,
    padding: Pt,
    space_before: Pt,
}

impl ProblemCard {
    pub const TITLE_SIZE: f32 = 10.5;
    pub const BODY_SIZE: f32 = 9.0;
    pub const TAG_SIZE: f32 = 8.0;
    pub const BADGE_SIZE: f32 = 8.0;

    pub fn new(record: ContentRecord, padding: Pt, space_before: Pt) -> Self {
        Self {
            record,
            padding,
            space_before,
        }
    }

    pub fn record(&self) -> &ContentRecord {
        &self.record
    }

    pub fn layout(&self, avail_width: Pt) -> CardLayout {
        let inner = (avail_width - self.padding * 2).max(Pt::ZERO);
        let title_lines = split_text_to_size(
            &self.record.title,
            Base14::HelveticaBold,
            Pt::from_f32(Self::TITLE_SIZE),
            inner,
        );
        let body_lines = split_text_to_size(
            &self.record.body,
            Base14::Helvetica,
            Pt::from_f32(Self::BODY_SIZE),
            inner,
        );
        let tag_lines = split_text_to_size(
            &format!("Tags: {}", self.record.tag_line()),
            Base14::Helvetica,
            Pt::from_f32(Self::TAG_SIZE),
            inner,
        );
        let height = card_height(
            self.padding,
            title_lines.len(),
            body_lines.len(),
            tag_lines.len(),
        );
        CardLayout {
            title_lines,
            body_lines,
            tag_lines,
            height,
        }
    }
}

/// `2*pad + badge(5) + 3 + title*6 + 4 + body*4.5 + 5 + (tags*3.5 + 2)` in mm.
pub fn card_height(padding: Pt, title_lines: usize, body_lines: usize, tag_lines: usize) -> Pt {
    padding * 2
        + Pt::from_mm(5.0 + 3.0)
        + Pt::from_mm(6.0) * title_lines as i32
        + Pt::from_mm(4.0)
        + Pt::from_mm(4.5) * body_lines as i32
        + Pt::from_mm(5.0)
        + Pt::from_mm(3.5) * tag_lines as i32
        + Pt::from_mm(2.0)
}

impl Flowable for ProblemCard {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.layout(avail_width).height,
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let layout = self.layout(avail_width);
        let rect = Rect {
            x,
            y,
            width: avail_width,
            height: layout.height,
        };
        canvas.set_fill_color(rgb(CARD_FILL));
        canvas.set_stroke_color(rgb(CARD_BORDER));
        canvas.set_line_width(Pt::from_mm(BORDER_WIDTH_MM));
        canvas.rounded_rect_path(rect, Pt::from_mm(CORNER_RADIUS_MM));
        canvas.fill_stroke();

        let left = x + self.padding;
        let right = rect.right() - self.padding;
        let top = y + self.padding;

        let badge_size = Pt::from_f32(Self::BADGE_SIZE);
        let badge_baseline = top + Pt::from_mm(3.5);
        canvas.set_fill_color(ACCENT);
        canvas.set_font(Base14::HelveticaBold, badge_size);
        text_at_baseline(
            canvas,
            left,
            badge_baseline,
            badge_size,
            &self.record.category.to_uppercase(),
        );

        let id_text = format!("#{}", self.record.id);
        let id_width = measure_text_width(Base14::Courier, badge_size, &id_text);
        canvas.set_fill_color(rgb(CARD_ID));
        canvas.set_font(Base14::Courier, badge_size);
        text_at_baseline(canvas, right - id_width, badge_baseline, badge_size, &id_text);

        let title_size = Pt::from_f32(Self::TITLE_SIZE);
        let title_baseline = top + Pt::from_mm(5.0 + 3.0);
        canvas.set_fill_color(Color::rgb(1.0, 1.0, 1.0));
        canvas.set_font(Base14::HelveticaBold, title_size);
        draw_lines(
            canvas,
            left,
            title_baseline,
            title_size,
            Pt::from_mm(6.0),
            &layout.title_lines,
        );

        let body_size = Pt::from_f32(Self::BODY_SIZE);
        let body_baseline =
            title_baseline + Pt::from_mm(6.0) * layout.title_lines.len() as i32 + Pt::from_mm(4.0);
        canvas.set_fill_color(rgb(CARD_BODY));
        canvas.set_font(Base14::Helvetica, body_size);
        draw_lines(
            canvas,
            left,
            body_baseline,
            body_size,
            Pt::from_mm(4.5),
            &layout.body_lines,
        );

        let tag_size = Pt::from_f32(Self::TAG_SIZE);
        let tag_baseline =
            body_baseline + Pt::from_mm(4.5) * layout.body_lines.len() as i32 + Pt::from_mm(5.0);
        canvas.set_fill_color(rgb(CARD_TAGS));
        canvas.set_font(Base14::Helvetica, tag_size);
        draw_lines(
            canvas,
            left,
            tag_baseline,
            tag_size,
            Pt::from_mm(3.5),
            &layout.tag_lines,
        );
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            space_before: self.space_before,
        }
    }

    fn is_card(&self) -> bool {
        true
    }

    fn debug_name(&self) -> &'static str {
        "ProblemCard"
    }
}
