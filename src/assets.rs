use crate::error::AssetLoadError;
use base64::Engine;
use std::path::{Path, PathBuf};
use tiny_skia::{Color as SkColor, Paint, PathBuilder, Pixmap, Rect as SkRect, Stroke, Transform};

pub const BACKGROUND_ASSET: &str = "page-background";

const RIPPLE_TILE_PX: u32 = 400;
const RIPPLE_CELL_PX: u32 = 20;

#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub data: Vec<u8>,
    /// Where the bytes came from, for logs.
    pub source: String,
}

impl Asset {
    pub fn image(name: impl Into<String>, data: Vec<u8>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data,
            source: source.into(),
        }
    }

    pub fn bytes_len(&self) -> usize {
        self.data.len()
    }
}

/// Named binary resources handed to the PDF writer; `DrawImage` commands
/// refer to them by name.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub assets: Vec<Asset>,
}

impl AssetBundle {
    pub fn add(&mut self, asset: Asset) {
        self.assets.retain(|existing| existing.name != asset.name);
        self.assets.push(asset);
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Where the page background pattern comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    /// Generated grid pattern.
    Ripple,
    File(PathBuf),
    DataUri(String),
    None,
}

impl BackgroundSource {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "ripple" => BackgroundSource::Ripple,
            "none" | "" => BackgroundSource::None,
            _ if trimmed.starts_with("data:") => BackgroundSource::DataUri(trimmed.to_string()),
            _ => BackgroundSource::File(PathBuf::from(trimmed)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            BackgroundSource::Ripple => "ripple".to_string(),
            BackgroundSource::File(path) => path.display().to_string(),
            BackgroundSource::DataUri(_) => "data-uri".to_string(),
            BackgroundSource::None => "none".to_string(),
        }
    }
}

/// Loads and validates the background image. `Ok(None)` means the
/// background is switched off.
pub fn load_background_asset(source: &BackgroundSource) -> Result<Option<Asset>, AssetLoadError> {
    let data = match source {
        BackgroundSource::None => return Ok(None),
        BackgroundSource::Ripple => render_ripple_png()?,
        BackgroundSource::File(path) => read_image_file(path)?,
        BackgroundSource::DataUri(uri) => {
            let (_mime, data) = parse_data_uri(uri)
                .ok_or_else(|| AssetLoadError::Decode("malformed data URI".to_string()))?;
            data
        }
    };
    image::load_from_memory(&data).map_err(|e| AssetLoadError::Decode(e.to_string()))?;
    Ok(Some(Asset::image(BACKGROUND_ASSET, data, source.describe())))
}

fn read_image_file(path: &Path) -> Result<Vec<u8>, AssetLoadError> {
    Ok(std::fs::read(path)?)
}

pub fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, data_part) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part.trim())
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}

/// Dark 400px tile with a 20px cell grid and a faint blue fill on every
/// other diagonal cell, encoded as PNG.
pub fn render_ripple_png() -> Result<Vec<u8>, AssetLoadError> {
    let size = RIPPLE_TILE_PX;
    let mut pixmap = Pixmap::new(size, size)
        .ok_or_else(|| AssetLoadError::Render(format!("invalid tile size {size}x{size}")))?;
    pixmap.fill(SkColor::from_rgba8(0x0a, 0x0a, 0x0a, 255));

    let mut grid = PathBuilder::new();
    for x in (0..size).step_by(RIPPLE_CELL_PX as usize) {
        for y in (0..size).step_by(RIPPLE_CELL_PX as usize) {
            if let Some(cell) = cell_rect(x, y) {
                grid.push_rect(cell);
            }
        }
    }
    let grid = grid
        .finish()
        .ok_or_else(|| AssetLoadError::Render("empty grid path".to_string()))?;
    let mut line = Paint::default();
    line.set_color(SkColor::from_rgba8(0x26, 0x26, 0x26, 255));
    line.anti_alias = true;
    let stroke = Stroke {
        width: 0.5,
        ..Stroke::default()
    };
    pixmap.stroke_path(&grid, &line, &stroke, Transform::identity(), None);

    let mut highlight = Paint::default();
    highlight.set_color(SkColor::from_rgba8(59, 130, 246, 8));
    let step = RIPPLE_CELL_PX * 4;
    for x in (0..size).step_by(step as usize) {
        for y in (0..size).step_by(step as usize) {
            if (x + y) % (RIPPLE_CELL_PX * 8) != 0 {
                continue;
            }
            if let Some(cell) = cell_rect(x, y) {
                pixmap.fill_rect(cell, &highlight, Transform::identity(), None);
            }
        }
    }

    pixmap
        .encode_png()
        .map_err(|e| AssetLoadError::Render(format!("png encode failed: {e}")))
}

fn cell_rect(x: u32, y: u32) -> Option<SkRect> {
    SkRect::from_xywh(
        x as f32,
        y as f32,
        RIPPLE_CELL_PX as f32,
        RIPPLE_CELL_PX as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::GenericImageView;

    #[test]
    fn ripple_tile_is_a_dark_png() {
        let png = render_ripple_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (RIPPLE_TILE_PX, RIPPLE_TILE_PX));
        let center = decoded.get_pixel(10, 10).0;
        assert!(center[0] < 20 && center[1] < 20 && center[2] < 30);
    }

    #[test]
    fn source_parsing() {
        assert_eq!(BackgroundSource::parse("ripple"), BackgroundSource::Ripple);
        assert_eq!(BackgroundSource::parse(" NONE "), BackgroundSource::None);
        assert!(matches!(
            BackgroundSource::parse("data:image/png;base64,AAAA"),
            BackgroundSource::DataUri(_)
        ));
        assert_eq!(
            BackgroundSource::parse("assets/bg.png"),
            BackgroundSource::File(PathBuf::from("assets/bg.png"))
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = BackgroundSource::File(PathBuf::from("/nonexistent/background.png"));
        assert!(matches!(
            load_background_asset(&source),
            Err(AssetLoadError::Io(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"not an image")
        );
        assert!(matches!(
            load_background_asset(&BackgroundSource::DataUri(uri)),
            Err(AssetLoadError::Decode(_))
        ));
    }

    #[test]
    fn data_uri_round_trips_a_real_png() {
        let png = render_ripple_png().unwrap();
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        );
        let asset = load_background_asset(&BackgroundSource::DataUri(uri))
            .unwrap()
            .unwrap();
        assert_eq!(asset.name, BACKGROUND_ASSET);
        assert_eq!(asset.data, png);
    }

    #[test]
    fn disabled_background_loads_nothing() {
        assert!(load_background_asset(&BackgroundSource::None).unwrap().is_none());
    }

    #[test]
    fn bundle_replaces_by_name() {
        let mut bundle = AssetBundle::default();
        bundle.add(Asset::image("a", vec![1], "x"));
        bundle.add(Asset::image("a", vec![2, 3], "y"));
        assert_eq!(bundle.assets.len(), 1);
        assert_eq!(bundle.get("a").map(Asset::bytes_len), Some(2));
    }
}
