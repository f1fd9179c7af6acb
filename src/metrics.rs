use crate::frame::Placement;
use crate::types::Rect;

#[derive(Debug, Clone)]
pub struct PageMetrics {
    pub page_number: usize,
    pub render_ms: f64,
    pub command_count: usize,
    pub frame: Rect,
    pub placements: Vec<Placement>,
}

impl PageMetrics {
    pub fn card_count(&self) -> usize {
        self.placements.iter().filter(|p| p.is_card).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_render_ms: f64,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn card_count(&self) -> usize {
        self.pages.iter().map(PageMetrics::card_count).sum()
    }

    pub fn oversized_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| page.placements.iter())
            .filter(|p| p.oversized)
            .count()
    }

    pub fn cards_per_page(&self) -> Vec<usize> {
        self.pages.iter().map(PageMetrics::card_count).collect()
    }
}
