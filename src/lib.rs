mod assets;
mod canvas;
mod config;
mod debug;
mod doc_template;
mod error;
mod finalize;
mod flowable;
mod font;
mod frame;
mod metrics;
mod nav;
mod page_template;
mod pdf;
mod pdfinspect;
mod scroll;
mod timers;
mod types;

pub use assets::{
    Asset, AssetBundle, BACKGROUND_ASSET, BackgroundSource, load_background_asset,
    render_ripple_png,
};
pub use canvas::{Canvas, Command, Document, Page};
pub use config::{
    BackgroundConfig, CountdownConfig, DeckConfig, DocumentConfig, PageConfig, TrackerConfig,
};
pub use debug::LayoutTrace;
pub use doc_template::DocTemplate;
pub use error::{AssetLoadError, DeckError};
pub use finalize::{PageFooterSpec, apply_page_footer, substitute_placeholders};
pub use flowable::{CalloutBox, CardLayout, Divider, Flowable, Pagination, ProblemCard, TitleBlock};
pub use font::{Base14, measure_text_width, split_text_to_size};
pub use frame::{AddResult, Frame, Placement};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use nav::{MobileMenu, NAV_ITEMS, NAVBAR_HEIGHT, NavItem, nav_item, scroll_target};
pub use page_template::{DocContext, PageTemplate};
pub use pdf::{PDF_VERSION, PdfOptions, document_to_pdf};
pub use pdfinspect::{PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path};
pub use problemdeck_catalog::{ContentRecord, problem_statements};
pub use scroll::{
    AnchorRegion, DIRECTION_HOLD, DirectionTracker, FrameHandle, FrameScheduler, ScrollDirection,
    ScrollGeometry, ScrollSnapshot, ScrollState, ScrollTracker, SectionId, TrackerPhase,
    TrackerSettings, UnknownSection, active_section, fill_percent, past_hero,
};
pub use timers::{
    Carousel, Countdown, IntervalHandle, IntervalScheduler, IntervalTimer, TimeLeft,
    start_carousel, start_countdown,
};
pub use types::{Color, Margins, Pt, Rect, Size};

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

const PAGE_BASE_FILL: (u8, u8, u8) = (10, 10, 10);

/// Renders the problem-statement handout: heading, open-innovation callout,
/// divider, then one card per record, paginated with page footers over a
/// tiled background.
pub struct ProblemDeck {
    config: DeckConfig,
    records: Vec<ContentRecord>,
    background: bool,
    trace: Option<LayoutTrace>,
}

pub struct ProblemDeckBuilder {
    config: DeckConfig,
    records: Option<Vec<ContentRecord>>,
    background: bool,
    trace: Option<LayoutTrace>,
}

impl Default for ProblemDeckBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemDeck {
    pub fn builder() -> ProblemDeckBuilder {
        ProblemDeckBuilder::new()
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    /// Background image for this render, if any. A source that cannot be
    /// loaded is logged and the deck renders on the plain base fill.
    pub fn load_assets(&self) -> AssetBundle {
        let mut bundle = AssetBundle::default();
        if !self.background {
            return bundle;
        }
        let source = self.config.background_source();
        match load_background_asset(&source) {
            Ok(Some(asset)) => {
                tracing::debug!(source = %asset.source, bytes = asset.bytes_len(), "background loaded");
                bundle.add(asset);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    source = %source.describe(),
                    error = %err,
                    "background unavailable; rendering without it"
                );
                if let Some(trace) = self.trace.as_ref() {
                    trace.event(
                        "assets.background_failed",
                        serde_json::json!({
                            "source": source.describe(),
                            "error": err.to_string(),
                        }),
                    );
                }
            }
        }
        bundle
    }

    fn page_template(&self, with_background: bool) -> PageTemplate {
        let page_size = self.config.page_size();
        let opacity = self.config.background.opacity;
        let tile = Pt::from_mm(self.config.background.tile_mm);
        PageTemplate::new("deck", page_size, self.config.margins()).set_on_page(
            move |canvas, ctx| {
                let (r, g, b) = PAGE_BASE_FILL;
                canvas.set_fill_color(Color::from_rgb8(r, g, b));
                canvas.draw_rect(Pt::ZERO, Pt::ZERO, ctx.page_size.width, ctx.page_size.height);
                if with_background && tile > Pt::ZERO {
                    draw_tiled_background(canvas, ctx.page_size, tile, opacity);
                }
            },
        )
    }

    fn story(&self) -> Vec<Box<dyn Flowable>> {
        let document = &self.config.document;
        let padding = self.config.card_padding();
        let mut story: Vec<Box<dyn Flowable>> = vec![
            Box::new(TitleBlock::new(document.heading.clone())),
            Box::new(CalloutBox::new(
                document.callout_title.clone(),
                document.callout_body.clone(),
                padding,
            )),
            Box::new(Divider::new(Pt::from_mm(10.0), Pt::from_mm(8.0))),
        ];
        for (idx, record) in self.records.iter().enumerate() {
            let space_before = if idx == 0 {
                Pt::ZERO
            } else {
                self.config.card_spacing()
            };
            story.push(Box::new(ProblemCard::new(
                record.clone(),
                padding,
                space_before,
            )));
        }
        story
    }

    fn layout_with_assets(
        &self,
        assets: &AssetBundle,
    ) -> Result<(Document, DocumentMetrics), DeckError> {
        let with_background = assets.get(BACKGROUND_ASSET).is_some();
        let mut template = DocTemplate::new(vec![self.page_template(with_background)]);
        if let Some(trace) = self.trace.clone() {
            template = template.with_trace(trace);
        }
        for flowable in self.story() {
            template.add_flowable(flowable);
        }
        let (mut document, metrics) = template.build_with_metrics()?;
        apply_page_footer(
            &mut document,
            &PageFooterSpec::for_title(&self.config.document.title),
        );
        Ok((document, metrics))
    }

    /// Laid-out pages with footers, before PDF serialization.
    pub fn layout(&self) -> Result<(Document, DocumentMetrics), DeckError> {
        let assets = self.load_assets();
        self.layout_with_assets(&assets)
    }

    pub fn render_with_metrics(&self) -> Result<(Vec<u8>, DocumentMetrics), DeckError> {
        let started = Instant::now();
        let assets = self.load_assets();
        let (document, mut metrics) = self.layout_with_assets(&assets)?;
        let options = PdfOptions {
            compress: self.config.document.compress,
            title: Some(self.config.document.title.clone()),
        };
        let bytes = document_to_pdf(&document, &assets, &options)?;
        metrics.total_bytes = bytes.len();
        metrics.total_render_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            pages = metrics.pages.len(),
            cards = metrics.card_count(),
            bytes = bytes.len(),
            "rendered problem deck"
        );
        if let Some(trace) = self.trace.as_ref() {
            trace.increment("render.pages", metrics.pages.len() as u64);
            trace.increment("render.cards", metrics.card_count() as u64);
            trace.emit_summary("render_pdf");
            trace.flush();
        }
        Ok((bytes, metrics))
    }

    pub fn render_pdf(&self) -> Result<Vec<u8>, DeckError> {
        Ok(self.render_with_metrics()?.0)
    }

    /// Renders and writes `<out_dir>/<file_name>`. The bytes go to a sibling
    /// temporary file that is renamed into place, so a failure at any point
    /// leaves no file under the final name.
    pub fn export(&self, out_dir: impl AsRef<Path>) -> Result<PathBuf, DeckError> {
        let bytes = self.render_pdf()?;
        let out_dir = out_dir.as_ref();
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(&self.config.document.file_name);
        let mut staged = tempfile::NamedTempFile::new_in(out_dir)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|err| err.error)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "exported");
        Ok(path)
    }
}

fn draw_tiled_background(canvas: &mut Canvas, page_size: Size, tile: Pt, opacity: f32) {
    canvas.save_state();
    canvas.set_opacity(opacity, opacity);
    let mut y = Pt::ZERO;
    while y < page_size.height {
        let mut x = Pt::ZERO;
        while x < page_size.width {
            canvas.draw_image(x, y, tile, tile, BACKGROUND_ASSET);
            x += tile;
        }
        y += tile;
    }
    canvas.restore_state();
}

impl ProblemDeckBuilder {
    pub fn new() -> Self {
        Self {
            config: DeckConfig::default(),
            records: None,
            background: true,
            trace: None,
        }
    }

    pub fn config(mut self, config: DeckConfig) -> Self {
        self.config = config;
        self
    }

    /// Records to render instead of the bundled catalog.
    pub fn records(mut self, records: Vec<ContentRecord>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn background(mut self, enabled: bool) -> Self {
        self.background = enabled;
        self
    }

    pub fn trace(mut self, trace: LayoutTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn build(self) -> Result<ProblemDeck, DeckError> {
        self.config.validate()?;
        let records = self
            .records
            .unwrap_or_else(|| problem_statements().to_vec());
        problemdeck_catalog::validate_records(&records)?;
        let trace = match (self.trace, self.config.debug_log.as_ref()) {
            (Some(trace), _) => Some(trace),
            (None, Some(path)) => Some(LayoutTrace::create(path)?),
            (None, None) => None,
        };
        Ok(ProblemDeck {
            config: self.config,
            records,
            background: self.background,
            trace,
        })
    }
}
