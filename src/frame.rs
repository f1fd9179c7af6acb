use crate::canvas::Canvas;
use crate::flowable::Flowable;
use crate::types::{Pt, Rect};

/// Where a block ended up on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: &'static str,
    pub rect: Rect,
    pub is_card: bool,
    /// Taller than an empty frame; drawn clipped to the frame.
    pub oversized: bool,
}

pub enum AddResult {
    Placed(Placement),
    Overflow(Box<dyn Flowable>),
}

/// Content rectangle of a page plus the vertical cursor into it.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn cursor_y(&self) -> Pt {
        self.cursor_y
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let gap = if self.is_empty() {
            Pt::ZERO
        } else {
            flowable.pagination().space_before
        };
        let avail_height = (self.remaining_height() - gap).max(Pt::ZERO);
        let size = flowable.wrap(avail_width, avail_height);

        if size.height <= avail_height {
            let top = self.rect.y + self.cursor_y + gap;
            flowable.draw(canvas, self.rect.x, top, avail_width, avail_height);
            self.cursor_y = self.cursor_y + gap + size.height;
            return AddResult::Placed(Placement {
                name: flowable.debug_name(),
                rect: Rect {
                    x: self.rect.x,
                    y: top,
                    width: size.width,
                    height: size.height,
                },
                is_card: flowable.is_card(),
                oversized: false,
            });
        }

        if !self.is_empty() {
            return AddResult::Overflow(flowable);
        }

        // Taller than a whole frame: place it alone and clip so nothing
        // spills into the footer band. The frame is full afterwards.
        canvas.save_state();
        canvas.clip_rect(self.rect);
        flowable.draw(canvas, self.rect.x, self.rect.y, avail_width, self.rect.height);
        canvas.restore_state();
        self.cursor_y = self.rect.height;
        AddResult::Placed(Placement {
            name: flowable.debug_name(),
            rect: self.rect,
            is_card: flowable.is_card(),
            oversized: true,
        })
    }
}
