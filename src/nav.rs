use crate::scroll::SectionId;

/// Height of the fixed navbar; jumps land just below it.
pub const NAVBAR_HEIGHT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub id: SectionId,
    pub label: &'static str,
    pub show_badge: bool,
    pub is_live: bool,
}

const fn item(id: SectionId, label: &'static str) -> NavItem {
    NavItem {
        id,
        label,
        show_badge: false,
        is_live: false,
    }
}

pub const NAV_ITEMS: [NavItem; 9] = [
    NavItem {
        show_badge: true,
        ..item(SectionId::Hero, "Home")
    },
    item(SectionId::Overview, "Overview"),
    NavItem {
        is_live: true,
        ..item(SectionId::Timeline, "Timeline")
    },
    item(SectionId::Problems, "Problems"),
    item(SectionId::Rules, "Rules"),
    item(SectionId::Registration, "Stage 1"),
    item(SectionId::Hackathon, "Stage 2"),
    item(SectionId::Faq, "FAQ"),
    item(SectionId::Contact, "Contact"),
];

pub fn nav_item(id: SectionId) -> Option<&'static NavItem> {
    NAV_ITEMS.iter().find(|item| item.id == id)
}

/// Scroll offset that puts a section's top just under the navbar.
pub fn scroll_target(offset_top: f64) -> f64 {
    (offset_top - NAVBAR_HEIGHT).max(0.0)
}

/// Overlay navigation for narrow screens. Opening it locks body scrolling at
/// the current offset; closing it hands that offset back for restoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MobileMenu {
    open: bool,
    locked_offset: Option<f64>,
}

impl MobileMenu {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Opens or closes the overlay. `scroll_offset` is the page offset at the
    /// time of the toggle. Returns the offset to restore when this closes it.
    pub fn toggle(&mut self, scroll_offset: f64) -> Option<f64> {
        if self.open {
            self.close()
        } else {
            self.open = true;
            self.locked_offset = Some(scroll_offset);
            None
        }
    }

    /// Closes the overlay and returns the offset saved when it opened.
    pub fn close(&mut self) -> Option<f64> {
        self.open = false;
        self.locked_offset.take()
    }

    /// Closes the menu and returns where to scroll for `section`, whose top
    /// sits at `offset_top`. The saved offset is discarded since the page
    /// jumps to the section instead.
    pub fn select(&mut self, section: SectionId, offset_top: f64) -> f64 {
        tracing::debug!(section = section.as_str(), "mobile menu selection");
        self.close();
        scroll_target(offset_top)
    }

    /// Body scrolling is locked while the overlay is open.
    pub fn scroll_locked(&self) -> bool {
        self.open
    }

    pub fn locked_offset(&self) -> Option<f64> {
        self.locked_offset
    }
}
