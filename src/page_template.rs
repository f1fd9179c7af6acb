use crate::canvas::Canvas;
use crate::frame::Frame;
use crate::types::{Margins, Rect, Size};
use std::sync::Arc;

/// What an `on_page` hook learns about the page it decorates.
#[derive(Debug, Clone)]
pub struct DocContext {
    pub page_number: usize,
    pub template_name: String,
    pub page_size: Size,
}

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

/// Page geometry with a single content frame. The hook runs before any
/// content on each new page, so it paints underneath the cards.
#[derive(Clone)]
pub struct PageTemplate {
    pub name: String,
    pub page_size: Size,
    frame: Rect,
    on_page: Option<OnPageCallback>,
}

impl PageTemplate {
    pub fn new(name: impl Into<String>, page_size: Size, margins: Margins) -> Self {
        let frame = Rect {
            x: margins.left,
            y: margins.top,
            width: page_size.width - margins.left - margins.right,
            height: page_size.height - margins.top - margins.bottom,
        };
        Self {
            name: name.into(),
            page_size,
            frame,
            on_page: None,
        }
    }

    pub fn set_on_page<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page = Some(Arc::new(callback));
        self
    }

    pub fn frame_rect(&self) -> Rect {
        self.frame
    }

    pub fn begin_page(&self, canvas: &mut Canvas, page_number: usize) -> Frame {
        if let Some(callback) = self.on_page.as_ref() {
            callback(
                canvas,
                &DocContext {
                    page_number,
                    template_name: self.name.clone(),
                    page_size: self.page_size,
                },
            );
        }
        Frame::new(self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pt;

    #[test]
    fn frame_is_page_minus_margins() {
        let template = PageTemplate::new("deck", Size::a4(), Margins::from_mm(15.0, 20.0, 25.0, 20.0));
        let frame = template.frame_rect();
        assert_eq!(frame.x, Pt::from_mm(20.0));
        assert_eq!(frame.y, Pt::from_mm(15.0));
        assert!((frame.width.to_mm() - 170.0).abs() < 0.01);
        assert!((frame.bottom().to_mm() - 272.0).abs() < 0.01);
    }

    #[test]
    fn on_page_hook_sees_page_number() {
        let template = PageTemplate::new("deck", Size::a4(), Margins::from_mm(15.0, 20.0, 25.0, 20.0))
            .set_on_page(|canvas, ctx| {
                canvas.draw_string(Pt::ZERO, Pt::ZERO, format!("p{}", ctx.page_number));
            });
        let mut canvas = Canvas::new(Size::a4());
        let frame = template.begin_page(&mut canvas, 3);
        assert!(frame.is_empty());
        let doc = canvas.finish();
        assert!(doc.pages[0].contains_text("p3"));
    }
}
