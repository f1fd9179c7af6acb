use crate::canvas::{Command, Document};
use crate::font::{Base14, measure_text_width};
use crate::types::{Color, Pt};

/// Footer drawn on every page once the total page count is known.
/// `{page}` and `{pages}` in `template` are replaced per page.
#[derive(Debug, Clone)]
pub struct PageFooterSpec {
    pub template: String,
    pub font: Base14,
    pub font_size: Pt,
    pub color: Color,
    /// Distance from the bottom edge to the text baseline.
    pub baseline_from_bottom: Pt,
}

impl PageFooterSpec {
    pub fn for_title(title: &str) -> Self {
        Self {
            template: format!("Page {{page}} of {{pages}} \u{2022} {title}"),
            font: Base14::Helvetica,
            font_size: Pt::from_f32(7.0),
            color: Color::from_rgb8(120, 120, 120),
            baseline_from_bottom: Pt::from_mm(8.0),
        }
    }
}

pub fn substitute_placeholders(template: &str, page_number: usize, page_count: usize) -> String {
    template
        .replace("{page}", &page_number.to_string())
        .replace("{pages}", &page_count.to_string())
}

/// Appends the centred footer to every page. Runs after layout so the
/// total is final.
pub fn apply_page_footer(doc: &mut Document, spec: &PageFooterSpec) {
    let total_pages = doc.pages.len();
    let page_width = doc.page_size.width;
    let y = (doc.page_size.height - spec.baseline_from_bottom - spec.font_size).max(Pt::ZERO);

    for (idx0, page) in doc.pages.iter_mut().enumerate() {
        let text = substitute_placeholders(&spec.template, idx0 + 1, total_pages);
        let width = measure_text_width(spec.font, spec.font_size, &text);
        let x = ((page_width - width) / 2).max(Pt::ZERO);

        page.commands.push(Command::SaveState);
        page.commands.push(Command::SetFillColor(spec.color));
        page.commands.push(Command::SetFont(spec.font));
        page.commands.push(Command::SetFontSize(spec.font_size));
        page.commands.push(Command::DrawString { x, y, text });
        page.commands.push(Command::RestoreState);
    }
}
