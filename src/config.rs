use crate::assets::BackgroundSource;
use crate::error::DeckError;
use crate::scroll::{SectionId, TrackerSettings};
use crate::types::{Margins, Pt, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use toml::value::{Date, Datetime, Time};

/// Smallest accepted background tile edge.
const MIN_TILE_MM: f32 = 1.0;

/// Everything tunable about a render and the page-side timers. Every field
/// has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DeckConfig {
    pub document: DocumentConfig,
    pub page: PageConfig,
    pub background: BackgroundConfig,
    pub tracker: TrackerConfig,
    pub countdown: CountdownConfig,
    /// JSON-lines layout trace destination.
    pub debug_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    pub title: String,
    pub file_name: String,
    pub heading: String,
    pub callout_title: String,
    pub callout_body: String,
    pub compress: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "Fantastic 4 - Problem Statements".to_string(),
            file_name: "Fantastic-4-Problem-Statements.pdf".to_string(),
            heading: "Problem Statements".to_string(),
            callout_title: "Open Innovation".to_string(),
            callout_body:
                "Participants can modify problems or create their own as per MVP requirements"
                    .to_string(),
            compress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub top_mm: f32,
    /// Band above the bottom edge kept free of cards; the footer sits in it.
    pub footer_reserve_mm: f32,
    pub card_padding_mm: f32,
    pub card_spacing_mm: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 20.0,
            top_mm: 15.0,
            footer_reserve_mm: 25.0,
            card_padding_mm: 6.0,
            card_spacing_mm: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// `ripple`, `none`, a file path or a `data:` URI.
    pub source: String,
    pub opacity: f32,
    pub tile_mm: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            source: "ripple".to_string(),
            opacity: 0.1,
            tile_mm: 35.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub lookahead: f64,
    pub tracked_section: SectionId,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            lookahead: 150.0,
            tracked_section: SectionId::Timeline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CountdownConfig {
    /// Offset-less datetimes are read as UTC.
    pub deadline: Datetime,
    pub carousel_period_ms: u64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            deadline: Datetime {
                date: Some(Date {
                    year: 2026,
                    month: 2,
                    day: 6,
                }),
                time: Some(Time {
                    hour: 9,
                    minute: 0,
                    second: 0,
                    nanosecond: 0,
                }),
                offset: None,
            },
            carousel_period_ms: 5_000,
        }
    }
}

impl DeckConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, DeckError> {
        let config: DeckConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), DeckError> {
        let invalid = |msg: String| Err(DeckError::InvalidConfiguration(msg));
        let page = &self.page;
        let lengths = [
            ("page.width_mm", page.width_mm),
            ("page.height_mm", page.height_mm),
            ("page.margin_mm", page.margin_mm),
            ("page.top_mm", page.top_mm),
            ("page.footer_reserve_mm", page.footer_reserve_mm),
            ("page.card_padding_mm", page.card_padding_mm),
            ("page.card_spacing_mm", page.card_spacing_mm),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if page.width_mm <= 0.0 || page.height_mm <= 0.0 {
            return invalid(format!(
                "page size must be positive, got {}x{} mm",
                page.width_mm, page.height_mm
            ));
        }
        let content_width = page.width_mm - 2.0 * page.margin_mm - 2.0 * page.card_padding_mm;
        if content_width <= 0.0 {
            return invalid("side margins and card padding leave no room for text".to_string());
        }
        if page.height_mm - page.top_mm - page.footer_reserve_mm <= 0.0 {
            return invalid("top margin and footer band leave no room for content".to_string());
        }
        let background = &self.background;
        if !(0.0..=1.0).contains(&background.opacity) {
            return invalid(format!(
                "background.opacity must be within 0..=1, got {}",
                background.opacity
            ));
        }
        if !background.tile_mm.is_finite() || background.tile_mm < MIN_TILE_MM {
            return invalid(format!(
                "background.tile_mm must be at least {MIN_TILE_MM} mm, got {}",
                background.tile_mm
            ));
        }
        if self.document.file_name.trim().is_empty() {
            return invalid("document.file_name must not be empty".to_string());
        }
        if !self.tracker.lookahead.is_finite() || self.tracker.lookahead < 0.0 {
            return invalid(format!(
                "tracker.lookahead must be a non-negative number, got {}",
                self.tracker.lookahead
            ));
        }
        if self.countdown.carousel_period_ms == 0 {
            return invalid("countdown.carousel_period_ms must be positive".to_string());
        }
        self.deadline()?;
        Ok(())
    }

    pub fn page_size(&self) -> Size {
        Size::from_mm(self.page.width_mm, self.page.height_mm)
    }

    pub fn margins(&self) -> Margins {
        let page = &self.page;
        Margins::from_mm(
            page.top_mm,
            page.margin_mm,
            page.footer_reserve_mm,
            page.margin_mm,
        )
    }

    pub fn card_padding(&self) -> Pt {
        Pt::from_mm(self.page.card_padding_mm)
    }

    pub fn card_spacing(&self) -> Pt {
        Pt::from_mm(self.page.card_spacing_mm)
    }

    pub fn background_source(&self) -> BackgroundSource {
        BackgroundSource::parse(&self.background.source)
    }

    pub fn deadline(&self) -> Result<SystemTime, DeckError> {
        datetime_to_system_time(&self.countdown.deadline)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings::from(&self.tracker)
    }

    pub fn carousel_period(&self) -> Duration {
        Duration::from_millis(self.countdown.carousel_period_ms)
    }
}

fn datetime_to_system_time(value: &Datetime) -> Result<SystemTime, DeckError> {
    let Some(date) = value.date else {
        return Err(DeckError::InvalidConfiguration(format!(
            "countdown.deadline needs a date, got {value}"
        )));
    };
    let time = value.time.unwrap_or(Time {
        hour: 0,
        minute: 0,
        second: 0,
        nanosecond: 0,
    });
    let offset_minutes: i64 = match value.offset {
        None | Some(toml::value::Offset::Z) => 0,
        Some(toml::value::Offset::Custom { minutes }) => minutes as i64,
    };
    let days = days_from_civil(date.year as i64, date.month as i64, date.day as i64);
    let seconds = days * 86_400
        + time.hour as i64 * 3_600
        + time.minute as i64 * 60
        + time.second as i64
        - offset_minutes * 60;
    if seconds < 0 {
        return Err(DeckError::InvalidConfiguration(format!(
            "countdown.deadline before 1970 is not supported: {value}"
        )));
    }
    Ok(UNIX_EPOCH + Duration::new(seconds as u64, time.nanosecond))
}

// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default_deck() {
        let config = DeckConfig::from_toml_str("").unwrap();
        assert_eq!(config, DeckConfig::default());
        assert_eq!(config.document.file_name, "Fantastic-4-Problem-Statements.pdf");
        assert_eq!(config.tracker.tracked_section, SectionId::Timeline);
        assert_eq!(config.background_source(), BackgroundSource::Ripple);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DeckConfig::from_toml_str(
            r#"
            debug_log = "layout.jsonl"

            [page]
            card_spacing_mm = 4.0

            [tracker]
            lookahead = 120.0
            tracked_section = "rules"

            [background]
            source = "none"
            "#,
        )
        .unwrap();
        assert_eq!(config.page.card_spacing_mm, 4.0);
        assert_eq!(config.page.margin_mm, 20.0);
        assert_eq!(config.tracker.tracked_section, SectionId::Rules);
        assert_eq!(config.background_source(), BackgroundSource::None);
        assert_eq!(config.debug_log, Some(PathBuf::from("layout.jsonl")));
    }

    #[test]
    fn default_deadline_is_the_submission_time() {
        let deadline = DeckConfig::default().deadline().unwrap();
        let secs = deadline.duration_since(UNIX_EPOCH).unwrap().as_secs();
        // 2026-02-06T09:00:00Z
        assert_eq!(secs, 1_770_368_400);
    }

    #[test]
    fn offsets_shift_the_deadline() {
        let config = DeckConfig::from_toml_str(
            "[countdown]\ndeadline = 2026-02-06T09:00:00+05:30\n",
        )
        .unwrap();
        let secs = config
            .deadline()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(secs, 1_770_368_400 - 330 * 60);
    }

    #[test]
    fn bad_values_are_rejected() {
        for raw in [
            "[page]\nwidth_mm = 0.0\n",
            "[page]\nmargin_mm = 120.0\n",
            "[page]\ntop_mm = 200.0\nfooter_reserve_mm = 100.0\n",
            "[background]\nopacity = 1.5\n",
            "[background]\ntile_mm = 0.001\n",
            "[background]\ntile_mm = 0.0\n",
            "[countdown]\ncarousel_period_ms = 0\n",
            "[document]\nfile_name = \"  \"\n",
        ] {
            assert!(
                matches!(
                    DeckConfig::from_toml_str(raw),
                    Err(DeckError::InvalidConfiguration(_))
                ),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn one_millimetre_tiles_are_accepted() {
        let config = DeckConfig::from_toml_str("[background]\ntile_mm = 1.0\n").unwrap();
        assert_eq!(config.background.tile_mm, 1.0);
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(matches!(
            DeckConfig::from_toml_str("[page]\nwidht_mm = 1.0\n"),
            Err(DeckError::ConfigParse(_))
        ));
    }

    #[test]
    fn epoch_arithmetic() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
    }
}
