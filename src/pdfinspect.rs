use crate::error::DeckError;
use lopdf::{Document as LoDocument, Object as LoObject};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub title: Option<String>,
    /// `[width, height]` of the first page in points.
    pub first_page_size: Option<[f32; 2]>,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, DeckError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| DeckError::Inspect(err.to_string()))?;
    let pages = pdf.get_pages();
    if pages.is_empty() {
        return Err(DeckError::Inspect("document has no pages".to_string()));
    }
    let first_page_size = pages
        .values()
        .next()
        .and_then(|id| pdf.get_dictionary(*id).ok())
        .and_then(|dict| dict.get(b"MediaBox").ok())
        .and_then(media_box_size);

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        title: info_title(&pdf),
        first_page_size,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, DeckError> {
    let data = std::fs::read(path)?;
    inspect_pdf_bytes(&data)
}

fn info_title(pdf: &LoDocument) -> Option<String> {
    let info_id = pdf.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = pdf.get_dictionary(info_id).ok()?;
    match info.get(b"Title").ok()? {
        LoObject::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn media_box_size(object: &LoObject) -> Option<[f32; 2]> {
    let LoObject::Array(items) = object else {
        return None;
    };
    let nums: Vec<f32> = items.iter().filter_map(number).collect();
    if nums.len() != 4 {
        return None;
    }
    Some([nums[2] - nums[0], nums[3] - nums[1]])
}

fn number(object: &LoObject) -> Option<f32> {
    match object {
        LoObject::Integer(v) => Some(*v as f32),
        LoObject::Real(v) => Some(*v as f32),
        _ => None,
    }
}
