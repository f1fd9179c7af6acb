use crate::types::Pt;

/// The standard Type1 faces the deck uses. They are never embedded, so the
/// layout relies on the published AFM advance widths below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Base14 {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl Base14 {
    pub const ALL: [Base14; 3] = [Base14::Helvetica, Base14::HelveticaBold, Base14::Courier];

    pub fn base_font(self) -> &'static str {
        match self {
            Base14::Helvetica => "Helvetica",
            Base14::HelveticaBold => "Helvetica-Bold",
            Base14::Courier => "Courier",
        }
    }

    /// Name under the page's /Font resource dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            Base14::Helvetica => "F1",
            Base14::HelveticaBold => "F2",
            Base14::Courier => "F3",
        }
    }

    fn advance(self, ch: char) -> u32 {
        match self {
            Base14::Courier => 600,
            Base14::Helvetica => ascii_or_extra(&HELVETICA_ASCII, ch, false),
            Base14::HelveticaBold => ascii_or_extra(&HELVETICA_BOLD_ASCII, ch, true),
        }
    }
}

// Advance widths in 1/1000 em for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, //
    278, 278, 584, 584, 584, 556, 1015, //
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, //
    278, 278, 278, 469, 556, 333, //
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, //
    334, 260, 334, 584,
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, //
    333, 333, 584, 584, 584, 611, 975, //
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, //
    333, 278, 333, 584, 556, 333, //
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, //
    389, 280, 389, 584,
];

// Glyphs outside the table fall back to the width of a digit.
const FALLBACK_ADVANCE: u32 = 556;

fn ascii_or_extra(table: &[u16; 95], ch: char, bold: bool) -> u32 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        return table[(code - 0x20) as usize] as u32;
    }
    match ch {
        '\u{00A0}' => 278,
        '\u{2022}' => 350,
        '\u{2013}' => 556,
        '\u{2014}' | '\u{2026}' => 1000,
        '\u{2018}' | '\u{2019}' if bold => 278,
        '\u{2018}' | '\u{2019}' => 222,
        '\u{201C}' | '\u{201D}' if bold => 500,
        '\u{201C}' | '\u{201D}' => 333,
        _ => FALLBACK_ADVANCE,
    }
}

pub fn measure_text_width(font: Base14, font_size: Pt, text: &str) -> Pt {
    let units: i64 = text.chars().map(|ch| font.advance(ch) as i64).sum();
    let milli = units.saturating_mul(font_size.to_milli_i64()) / 1000;
    Pt::from_milli_i64(milli)
}

/// Greedy word wrap to `max_width`. Words wider than a line are broken between
/// characters. Explicit newlines start a new line. Always returns at least one
/// line so an empty field still occupies a row.
pub fn split_text_to_size(text: &str, font: Base14, font_size: Pt, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph, font, font_size, max_width, &mut lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn wrap_paragraph(
    paragraph: &str,
    font: Base14,
    font_size: Pt,
    max_width: Pt,
    out: &mut Vec<String>,
) {
    let fits = |candidate: &str| measure_text_width(font, font_size, candidate) <= max_width;
    let mut line = String::new();
    let mut produced = false;

    for word in paragraph.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if fits(&candidate) {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            out.push(std::mem::take(&mut line));
            produced = true;
        }
        if fits(word) {
            line = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let mut next = line.clone();
            next.push(ch);
            if !line.is_empty() && !fits(&next) {
                out.push(std::mem::take(&mut line));
                produced = true;
                line.push(ch);
            } else {
                line = next;
            }
        }
    }

    if !line.is_empty() || !produced {
        out.push(line);
    }
}
