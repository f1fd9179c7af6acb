use crate::assets::AssetBundle;
use crate::canvas::{Command, Document};
use crate::font::Base14;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use image::GenericImageView;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Flate-compress page content streams.
    pub compress: bool,
    pub title: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            compress: true,
            title: None,
        }
    }
}

pub const PDF_VERSION: &str = "1.7";

struct ObjectTable {
    objects: Vec<Vec<u8>>,
}

impl ObjectTable {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    fn reserve(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len()
    }

    fn set(&mut self, id: usize, body: Vec<u8>) {
        if let Some(slot) = self.objects.get_mut(id - 1) {
            *slot = body;
        }
    }

    fn push(&mut self, body: Vec<u8>) -> usize {
        self.objects.push(body);
        self.objects.len()
    }
}

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Names each page's content stream refers to.
struct ResourceNames {
    fonts: BTreeMap<Base14, (String, usize)>,
    ext_gstates: BTreeMap<(u16, u16), (String, usize)>,
    images: BTreeMap<String, (String, usize)>,
}

impl ResourceNames {
    fn dictionary(&self) -> String {
        let mut out = String::from("<< /ProcSet [/PDF /Text /ImageC]");
        if !self.fonts.is_empty() {
            out.push_str(" /Font <<");
            for (name, id) in self.fonts.values() {
                out.push_str(&format!(" /{name} {id} 0 R"));
            }
            out.push_str(" >>");
        }
        if !self.ext_gstates.is_empty() {
            out.push_str(" /ExtGState <<");
            for (name, id) in self.ext_gstates.values() {
                out.push_str(&format!(" /{name} {id} 0 R"));
            }
            out.push_str(" >>");
        }
        if !self.images.is_empty() {
            out.push_str(" /XObject <<");
            for (name, id) in self.images.values() {
                out.push_str(&format!(" /{name} {id} 0 R"));
            }
            out.push_str(" >>");
        }
        out.push_str(" >>");
        out
    }
}

/// Serializes a laid-out document. Images are resolved by name from
/// `assets`; a `DrawImage` whose asset is missing or undecodable is skipped.
pub fn document_to_pdf(
    document: &Document,
    assets: &AssetBundle,
    options: &PdfOptions,
) -> io::Result<Vec<u8>> {
    let mut table = ObjectTable::new();
    let catalog_id = table.reserve();
    let pages_id = table.reserve();
    let info_id = table.push(info_object(options.title.as_deref()).into_bytes());

    let mut fonts = BTreeMap::new();
    for font in used_fonts(document) {
        let id = table.push(font_object(font).into_bytes());
        fonts.insert(font, (font.resource_name().to_string(), id));
    }

    let mut ext_gstates = BTreeMap::new();
    for (index, (fill, stroke)) in opacity_pairs(document).into_iter().enumerate() {
        let id = table.push(
            format!(
                "<< /Type /ExtGState /ca {} /CA {} >>",
                fmt(fill as f32 / 1000.0),
                fmt(stroke as f32 / 1000.0)
            )
            .into_bytes(),
        );
        ext_gstates.insert((fill, stroke), (format!("GS{}", index + 1), id));
    }

    let mut images = BTreeMap::new();
    for resource_id in image_references(document) {
        let Some(asset) = assets.get(&resource_id) else {
            tracing::debug!(resource_id, "image asset not in bundle; draws skipped");
            continue;
        };
        let Some(image) = decode_image_bytes(&asset.data)? else {
            tracing::warn!(resource_id, source = %asset.source, "image asset could not be decoded");
            continue;
        };
        let smask_id = match &image.alpha {
            Some(alpha) => Some(table.push(smask_object(image.width, image.height, alpha))),
            None => None,
        };
        let id = table.push(image_object(&image, smask_id));
        images.insert(resource_id, (format!("Im{}", images.len() + 1), id));
    }

    let names = ResourceNames {
        fonts,
        ext_gstates,
        images,
    };
    let resources = names.dictionary();

    let mut kids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_commands(&page.commands, document.page_size.height, &names);
        let content_id = table.push(stream_object(content.as_bytes(), options.compress)?);
        let page_id = table.push(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
                pages_id,
                fmt_pt(document.page_size.width),
                fmt_pt(document.page_size.height),
                resources,
                content_id
            )
            .into_bytes(),
        );
        kids.push(format!("{page_id} 0 R"));
    }

    table.set(
        pages_id,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            kids.len()
        )
        .into_bytes(),
    );
    table.set(
        catalog_id,
        format!("<< /Type /Catalog /Pages {pages_id} 0 R >>").into_bytes(),
    );

    Ok(build_pdf(&table.objects, catalog_id, info_id))
}

fn used_fonts(document: &Document) -> BTreeSet<Base14> {
    let mut fonts = BTreeSet::new();
    for page in &document.pages {
        let mut current = Base14::Helvetica;
        for cmd in &page.commands {
            match cmd {
                Command::SetFont(font) => current = *font,
                Command::DrawString { .. } => {
                    fonts.insert(current);
                }
                _ => {}
            }
        }
    }
    fonts
}

fn quantize_alpha(value: f32) -> u16 {
    ((value * 1000.0).round() as i32).clamp(0, 1000) as u16
}

fn opacity_pairs(document: &Document) -> BTreeSet<(u16, u16)> {
    document
        .pages
        .iter()
        .flat_map(|page| page.commands.iter())
        .filter_map(|cmd| match cmd {
            Command::SetOpacity { fill, stroke } => {
                Some((quantize_alpha(*fill), quantize_alpha(*stroke)))
            }
            _ => None,
        })
        .collect()
}

fn image_references(document: &Document) -> BTreeSet<String> {
    document
        .pages
        .iter()
        .flat_map(|page| page.commands.iter())
        .filter_map(|cmd| match cmd {
            Command::DrawImage { resource_id, .. } => Some(resource_id.clone()),
            _ => None,
        })
        .collect()
}

fn render_commands(commands: &[Command], page_height: Pt, names: &ResourceNames) -> String {
    let mut out = String::new();
    let mut font = Base14::Helvetica;
    let mut font_size = Pt::from_f32(12.0);
    let mut font_stack: Vec<(Base14, Pt)> = Vec::new();

    for cmd in commands {
        match cmd {
            Command::SaveState => {
                font_stack.push((font, font_size));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((f, s)) = font_stack.pop() {
                    font = f;
                    font_size = s;
                }
                out.push_str("Q\n");
            }
            Command::SetFillColor(color) => out.push_str(&color_op(*color, "rg")),
            Command::SetStrokeColor(color) => out.push_str(&color_op(*color, "RG")),
            Command::SetLineWidth(width) => out.push_str(&format!("{} w\n", fmt_pt(*width))),
            Command::SetOpacity { fill, stroke } => {
                let key = (quantize_alpha(*fill), quantize_alpha(*stroke));
                if let Some((name, _)) = names.ext_gstates.get(&key) {
                    out.push_str(&format!("/{name} gs\n"));
                }
            }
            Command::SetFont(f) => font = *f,
            Command::SetFontSize(size) => font_size = *size,
            Command::ClipRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nW\nn\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y),
                ));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::FillStroke => out.push_str("B\n"),
            Command::DrawString { x, y, text } => {
                let Some((resource, _)) = names.fonts.get(&font) else {
                    continue;
                };
                let encoded = encode_winansi_pdf_string(text);
                if encoded.replaced > 0 {
                    tracing::debug!(
                        replaced = encoded.replaced,
                        font = font.base_font(),
                        "characters outside WinAnsi replaced"
                    );
                }
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encoded.text));
                out.push_str("ET\n");
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                let Some((name, _)) = names.images.get(resource_id) else {
                    continue;
                };
                out.push_str("q\n");
                out.push_str(&format!(
                    "{} 0 0 {} {} {} cm\n",
                    fmt_pt(*width),
                    fmt_pt(*height),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height)
                ));
                out.push_str(&format!("/{name} Do\n"));
                out.push_str("Q\n");
            }
        }
    }
    out
}

fn color_op(color: Color, op: &str) -> String {
    format!(
        "{} {} {} {}\n",
        fmt(color.r.clamp(0.0, 1.0)),
        fmt(color.g.clamp(0.0, 1.0)),
        fmt(color.b.clamp(0.0, 1.0)),
        op
    )
}

fn decode_image_bytes(data: &[u8]) -> io::Result<Option<ImageData>> {
    let format = image::guess_format(data).ok();
    let Ok(decoded) = image::load_from_memory(data) else {
        return Ok(None);
    };
    let (width, height) = decoded.dimensions();

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(Some(ImageData {
            width,
            height,
            color_space,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        }));
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        has_alpha |= a != 255;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(Some(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        filter: "/FlateDecode",
        data: flate_compress(&rgb)?,
        alpha: if has_alpha {
            Some(flate_compress(&alpha)?)
        } else {
            None
        },
    }))
}

fn flate_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn binary_stream(dict: String, data: &[u8]) -> Vec<u8> {
    let mut out = dict.into_bytes();
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> Vec<u8> {
    let smask = smask_id
        .map(|id| format!(" /SMask {id} 0 R"))
        .unwrap_or_default();
    binary_stream(
        format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Filter {} /Length {}{} >>",
            image.width,
            image.height,
            image.color_space,
            image.filter,
            image.data.len(),
            smask
        ),
        &image.data,
    )
}

fn smask_object(width: u32, height: u32, alpha: &[u8]) -> Vec<u8> {
    binary_stream(
        format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>",
            width,
            height,
            alpha.len()
        ),
        alpha,
    )
}

fn font_object(font: Base14) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_font()
    )
}

fn stream_object(content: &[u8], compress: bool) -> io::Result<Vec<u8>> {
    if compress {
        let packed = flate_compress(content)?;
        return Ok(binary_stream(
            format!("<< /Length {} /Filter /FlateDecode >>", packed.len()),
            &packed,
        ));
    }
    Ok(binary_stream(
        format!("<< /Length {} >>", content.len()),
        content,
    ))
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (problemdeck)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title {}", text_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

/// PDF text string: a literal for plain ASCII, otherwise UTF-16BE with a
/// byte order mark as a hex string.
fn text_string(text: &str) -> String {
    if text.is_ascii() {
        return format!("({})", encode_winansi_pdf_string(text).text);
    }
    let mut out = String::with_capacity(6 + text.len() * 4);
    out.push_str("<FEFF");
    for unit in text.encode_utf16() {
        out.push_str(&format!("{unit:04X}"));
    }
    out.push('>');
    out
}

fn build_pdf(objects: &[Vec<u8>], catalog_id: usize, info_id: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(format!("%PDF-{PDF_VERSION}\n").as_bytes());
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            catalog_id,
            info_id,
            xref_start
        )
        .as_bytes(),
    );
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{b:03o}")),
            b => out.push(b as char),
        }
    }
    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let milli: i64 = (fixed * I32F32::from_num(1000)).round().to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let (int_part, frac_part) = (abs / 1000, abs % 1000);
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let frac = format!("{frac_part:03}");
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}
