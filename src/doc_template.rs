use crate::canvas::{Canvas, Document};
use crate::debug::LayoutTrace;
use crate::error::DeckError;
use crate::flowable::Flowable;
use crate::frame::{AddResult, Placement};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::PageTemplate;
use serde_json::json;
use std::time::Instant;

/// Pagination driver: pours the story into page frames, starting a new page
/// whenever the next block would cross the frame bottom.
pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    story: Vec<Box<dyn Flowable>>,
    trace: Option<LayoutTrace>,
}

struct OpenPage {
    number: usize,
    started: Instant,
    placements: Vec<Placement>,
    // Set when an oversized block filled the frame.
    overfull: bool,
}

impl OpenPage {
    fn new(number: usize) -> Self {
        Self {
            number,
            started: Instant::now(),
            placements: Vec::new(),
            overfull: false,
        }
    }
}

// Page 1 uses templates[0], page n uses templates[min(n-1, len-1)].
fn select_template(page_templates: &[PageTemplate], page_number: usize) -> &PageTemplate {
    let idx = page_number
        .saturating_sub(1)
        .min(page_templates.len().saturating_sub(1));
    &page_templates[idx]
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            story: Vec::new(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: LayoutTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn add_flowable(&mut self, flowable: Box<dyn Flowable>) {
        self.story.push(flowable);
    }

    pub fn build(self) -> Result<Document, DeckError> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> Result<(Document, DocumentMetrics), DeckError> {
        let Some(first) = self.page_templates.first() else {
            return Err(DeckError::MissingPageTemplate);
        };
        if self
            .page_templates
            .iter()
            .any(|template| template.page_size != first.page_size)
        {
            return Err(DeckError::InvalidConfiguration(
                "page templates must share one page size".to_string(),
            ));
        }

        let trace = self.trace.clone();
        let log_page_break = |from_page: usize, reason: &str, flowable: &str| {
            tracing::debug!(from_page, reason, flowable, "page break");
            let Some(trace) = trace.as_ref() else {
                return;
            };
            trace.event(
                "layout.page_break",
                json!({
                    "reason": reason,
                    "from_page": from_page,
                    "to_page": from_page + 1,
                    "flowable": flowable,
                }),
            );
            trace.increment(&format!("layout.page_break.{reason}"), 1);
        };

        let mut canvas = Canvas::new(first.page_size);
        let mut metrics = DocumentMetrics::default();
        let mut template = select_template(&self.page_templates, 1);
        let mut frame = template.begin_page(&mut canvas, 1);
        let mut page = OpenPage::new(1);

        for flowable in self.story {
            let mut current = flowable;
            loop {
                let name = current.debug_name();
                match frame.add(current, &mut canvas) {
                    AddResult::Placed(placement) => {
                        if placement.oversized {
                            tracing::warn!(
                                page = page.number,
                                flowable = name,
                                "block taller than a page; drawn clipped on its own page"
                            );
                            if let Some(trace) = trace.as_ref() {
                                trace.event(
                                    "layout.oversized_card",
                                    json!({
                                        "page": page.number,
                                        "flowable": name,
                                        "frame_height_pt": frame.rect().height.to_f32(),
                                    }),
                                );
                                trace.increment("layout.oversized_card", 1);
                            }
                            page.overfull = true;
                        }
                        page.placements.push(placement);
                        break;
                    }
                    AddResult::Overflow(rest) => {
                        let reason = if page.overfull {
                            "oversized_card"
                        } else {
                            "frame_overflow"
                        };
                        log_page_break(page.number, reason, name);
                        let next_number = page.number + 1;
                        finish_page(&mut canvas, &mut metrics, page, frame.rect());
                        template = select_template(&self.page_templates, next_number);
                        frame = template.begin_page(&mut canvas, next_number);
                        page = OpenPage::new(next_number);
                        current = rest;
                    }
                }
            }
        }

        finish_page(&mut canvas, &mut metrics, page, frame.rect());
        if let Some(trace) = trace.as_ref() {
            trace.increment("layout.pages", metrics.pages.len() as u64);
        }
        Ok((canvas.finish(), metrics))
    }
}

fn finish_page(
    canvas: &mut Canvas,
    metrics: &mut DocumentMetrics,
    page: OpenPage,
    frame: crate::types::Rect,
) {
    let elapsed = page.started.elapsed().as_secs_f64() * 1000.0;
    metrics.total_render_ms += elapsed;
    metrics.pages.push(PageMetrics {
        page_number: page.number,
        render_ms: elapsed,
        command_count: canvas.current_command_count(),
        frame,
        placements: page.placements,
    });
    canvas.show_page();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::flowable::Pagination;
    use crate::types::{Margins, Pt, Size};
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Block {
        height: Pt,
        space_before: Pt,
    }

    impl Flowable for Block {
        fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
            Size {
                width: avail_width,
                height: self.height,
            }
        }

        fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _h: Pt) {
            canvas.draw_rect(x, y, avail_width, self.height);
        }

        fn pagination(&self) -> Pagination {
            Pagination {
                space_before: self.space_before,
            }
        }

        fn is_card(&self) -> bool {
            true
        }
    }

    fn template() -> PageTemplate {
        // 100pt-tall frame.
        PageTemplate::new(
            "test",
            Size {
                width: Pt::from_f32(200.0),
                height: Pt::from_f32(140.0),
            },
            Margins {
                top: Pt::from_f32(10.0),
                right: Pt::from_f32(10.0),
                bottom: Pt::from_f32(30.0),
                left: Pt::from_f32(10.0),
            },
        )
        .set_on_page(|canvas, ctx| {
            canvas.draw_string(Pt::ZERO, Pt::ZERO, format!("bg{}", ctx.page_number));
        })
    }

    fn story(count: usize, height: f32, gap: f32) -> DocTemplate {
        let mut doc = DocTemplate::new(vec![template()]);
        for _ in 0..count {
            doc.add_flowable(Box::new(Block {
                height: Pt::from_f32(height),
                space_before: Pt::from_f32(gap),
            }));
        }
        doc
    }

    #[test]
    fn missing_template_is_an_error() {
        let result = DocTemplate::new(Vec::new()).build();
        assert!(matches!(result, Err(DeckError::MissingPageTemplate)));
    }

    #[test]
    fn uniform_blocks_fill_pages_greedily() {
        // 30 + (10 + 30) * 1 = 70 fits, a third needs 110 > 100.
        let (doc, metrics) = story(5, 30.0, 10.0).build_with_metrics().unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(metrics.cards_per_page(), vec![2, 2, 1]);
    }

    #[test]
    fn every_page_gets_the_background_hook() {
        let doc = story(5, 30.0, 10.0).build().unwrap();
        for (idx, page) in doc.pages.iter().enumerate() {
            assert!(page.contains_text(&format!("bg{}", idx + 1)));
        }
    }

    #[test]
    fn placements_never_cross_the_frame_bottom() {
        let (_, metrics) = story(9, 45.0, 6.0).build_with_metrics().unwrap();
        for page in &metrics.pages {
            for placement in &page.placements {
                assert!(page.frame.contains_rect(&placement.rect));
            }
        }
        assert_eq!(metrics.card_count(), 9);
    }

    #[test]
    fn empty_story_yields_one_background_page() {
        let (doc, metrics) = story(0, 10.0, 0.0).build_with_metrics().unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages[0].contains_text("bg1"));
        assert_eq!(metrics.card_count(), 0);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn oversized_block_gets_its_own_page_and_pagination_continues() {
        let buf = SharedBuf::default();
        let trace = LayoutTrace::from_writer(buf.clone());
        let mut doc = DocTemplate::new(vec![template()]).with_trace(trace.clone());
        for height in [30.0, 250.0, 30.0] {
            doc.add_flowable(Box::new(Block {
                height: Pt::from_f32(height),
                space_before: Pt::from_f32(6.0),
            }));
        }
        let (pdf_doc, metrics) = doc.build_with_metrics().unwrap();
        trace.flush();

        assert_eq!(pdf_doc.pages.len(), 3);
        assert_eq!(metrics.cards_per_page(), vec![1, 1, 1]);
        assert_eq!(metrics.oversized_count(), 1);
        assert!(metrics.pages[1].placements[0].oversized);

        let log = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let events: Vec<serde_json::Value> = log
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let reasons: Vec<&str> = events
            .iter()
            .filter(|e| e["type"] == "layout.page_break")
            .map(|e| e["reason"].as_str().unwrap())
            .collect();
        assert_eq!(reasons, vec!["frame_overflow", "oversized_card"]);
        assert!(events.iter().any(|e| e["type"] == "layout.oversized_card"));
    }
}
