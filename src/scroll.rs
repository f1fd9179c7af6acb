//! Frame-coalesced scroll tracking: which page section is active and how far
//! the reader has progressed through the tracked section.
//!
//! The host forwards raw scroll events to [`ScrollTracker::on_scroll_event`]
//! and fires scheduled frames through [`ScrollTracker::on_frame`]. Any burst of
//! events between two frames costs one recomputation, and subscribers only hear
//! about changes.

use crate::config::TrackerConfig;
use crate::nav::NAVBAR_HEIGHT;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Fixed set of page sections, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Hero,
    Overview,
    Timeline,
    Problems,
    Rules,
    Registration,
    Hackathon,
    Faq,
    Contact,
}

impl SectionId {
    pub const ALL: [SectionId; 9] = [
        SectionId::Hero,
        SectionId::Overview,
        SectionId::Timeline,
        SectionId::Problems,
        SectionId::Rules,
        SectionId::Registration,
        SectionId::Hackathon,
        SectionId::Faq,
        SectionId::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Hero => "hero",
            SectionId::Overview => "overview",
            SectionId::Timeline => "timeline",
            SectionId::Problems => "problems",
            SectionId::Rules => "rules",
            SectionId::Registration => "registration",
            SectionId::Hackathon => "hackathon",
            SectionId::Faq => "faq",
            SectionId::Contact => "contact",
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section: {0}")]
pub struct UnknownSection(pub String);

impl FromStr for SectionId {
    type Err = UnknownSection;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| UnknownSection(raw.to_string()))
    }
}

/// Vertical extent of one section in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRegion {
    pub id: SectionId,
    pub start: f64,
    pub height: f64,
}

impl AnchorRegion {
    pub fn contains(&self, y: f64) -> bool {
        y >= self.start && y < self.start + self.height
    }
}

/// Synchronous view of the page layout at the moment of the call.
pub trait ScrollGeometry {
    fn scroll_offset(&self) -> f64;
    fn viewport_height(&self) -> f64;
    /// Registered sections in document order. Unmounted sections are absent.
    fn anchors(&self) -> Vec<AnchorRegion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Next-frame callback source (the browser's animation frame, a test clock).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Scheduled,
    Computing,
    TornDown,
}

/// What subscribers receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSnapshot {
    pub active: SectionId,
    pub fill_percent: u8,
    /// Hero top has scrolled under the navbar.
    pub past_hero: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollState {
    pub fill_percent: u8,
    pub active: SectionId,
    pub past_hero: bool,
    pub last_offset: f64,
    pub phase: TrackerPhase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Added to the scroll offset before hit-testing sections.
    pub lookahead: f64,
    /// Section whose progress drives the fill percentage.
    pub tracked: SectionId,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for TrackerSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            lookahead: config.lookahead,
            tracked: config.tracked_section,
        }
    }
}

/// First anchor containing `offset + lookahead`, or the first registered
/// anchor when none does. `Hero` when nothing is registered.
pub fn active_section(anchors: &[AnchorRegion], offset: f64, lookahead: f64) -> SectionId {
    let probe = offset + lookahead;
    anchors
        .iter()
        .find(|anchor| anchor.contains(probe))
        .or_else(|| anchors.first())
        .map(|anchor| anchor.id)
        .unwrap_or(SectionId::Hero)
}

/// Progress of the viewport centre through `tracked`, as a whole percentage.
/// A missing region reads as 0.
pub fn fill_percent(tracked: Option<&AnchorRegion>, offset: f64, viewport_height: f64) -> u8 {
    let Some(region) = tracked else {
        return 0;
    };
    let centre = offset + viewport_height * 0.5;
    let height = if region.height > 0.0 {
        region.height
    } else {
        1.0
    };
    let progress = ((centre - region.start) / height).clamp(0.0, 1.0);
    if progress.is_nan() {
        return 0;
    }
    (progress * 100.0).round() as u8
}

/// Whether the hero's top edge sits more than a navbar height above the
/// viewport top. False while the hero is not registered.
pub fn past_hero(anchors: &[AnchorRegion], offset: f64) -> bool {
    anchors
        .iter()
        .find(|anchor| anchor.id == SectionId::Hero)
        .is_some_and(|hero| hero.start - offset < -NAVBAR_HEIGHT)
}

pub type Publisher = Box<dyn FnMut(&ScrollSnapshot)>;

pub struct ScrollTracker<G: ScrollGeometry, S: FrameScheduler> {
    geometry: G,
    scheduler: S,
    settings: TrackerSettings,
    state: ScrollState,
    pending: Option<FrameHandle>,
    last_published: Option<ScrollSnapshot>,
    publisher: Publisher,
}

impl<G: ScrollGeometry, S: FrameScheduler> ScrollTracker<G, S> {
    pub fn new(geometry: G, scheduler: S, settings: TrackerSettings, publisher: Publisher) -> Self {
        Self {
            geometry,
            scheduler,
            settings,
            state: ScrollState {
                fill_percent: 0,
                active: SectionId::Hero,
                past_hero: false,
                last_offset: 0.0,
                phase: TrackerPhase::Idle,
            },
            pending: None,
            last_published: None,
            publisher,
        }
    }

    /// Initial synchronous pass, run once the page is laid out.
    pub fn mount(&mut self) {
        if self.state.phase != TrackerPhase::Idle {
            return;
        }
        self.run_computation();
    }

    pub fn on_scroll_event(&mut self) {
        match self.state.phase {
            TrackerPhase::TornDown | TrackerPhase::Scheduled | TrackerPhase::Computing => {}
            TrackerPhase::Idle => {
                let handle = self.scheduler.request_frame();
                self.pending = Some(handle);
                self.state.phase = TrackerPhase::Scheduled;
            }
        }
    }

    /// Frame callback. Frames that are not the one currently pending (stale or
    /// cancelled) are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle) {
        if self.state.phase == TrackerPhase::TornDown || self.pending != Some(handle) {
            tracing::trace!(frame = handle.0, "ignoring stale frame");
            return;
        }
        self.pending = None;
        self.run_computation();
    }

    fn run_computation(&mut self) {
        self.state.phase = TrackerPhase::Computing;
        let snapshot = self.recompute();
        self.publish_if_changed(snapshot);
        self.state.phase = TrackerPhase::Idle;
    }

    pub fn recompute(&mut self) -> ScrollSnapshot {
        let offset = self.geometry.scroll_offset();
        let viewport = self.geometry.viewport_height();
        let anchors = self.geometry.anchors();
        let active = active_section(&anchors, offset, self.settings.lookahead);
        let tracked = anchors
            .iter()
            .find(|anchor| anchor.id == self.settings.tracked);
        let fill = fill_percent(tracked, offset, viewport);
        let past_hero = past_hero(&anchors, offset);

        self.state.active = active;
        self.state.fill_percent = fill;
        self.state.past_hero = past_hero;
        self.state.last_offset = offset;
        ScrollSnapshot {
            active,
            fill_percent: fill,
            past_hero,
        }
    }

    /// Returns whether the subscriber was called.
    pub fn publish_if_changed(&mut self, snapshot: ScrollSnapshot) -> bool {
        if self.state.phase == TrackerPhase::TornDown || self.last_published == Some(snapshot) {
            return false;
        }
        tracing::debug!(
            active = snapshot.active.as_str(),
            fill = snapshot.fill_percent,
            "scroll state changed"
        );
        self.last_published = Some(snapshot);
        (self.publisher)(&snapshot);
        true
    }

    pub fn teardown(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.state.phase = TrackerPhase::TornDown;
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn geometry_mut(&mut self) -> &mut G {
        &mut self.geometry
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<G: ScrollGeometry, S: FrameScheduler> Drop for ScrollTracker<G, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// How long a direction stays reported after the last movement.
pub const DIRECTION_HOLD: Duration = Duration::from_secs(1);

/// Scroll direction while a region is on screen, used for the timeline's
/// mobile arrows. Cleared when the region leaves the viewport or after
/// [`DIRECTION_HOLD`] without movement.
#[derive(Debug, Clone)]
pub struct DirectionTracker {
    last_offset: f64,
    direction: Option<ScrollDirection>,
    expires: Option<Instant>,
}

impl DirectionTracker {
    pub fn new(offset: f64) -> Self {
        Self {
            last_offset: offset,
            direction: None,
            expires: None,
        }
    }

    pub fn observe(
        &mut self,
        region: Option<&AnchorRegion>,
        offset: f64,
        viewport_height: f64,
        now: Instant,
    ) -> Option<ScrollDirection> {
        let visible = region.is_some_and(|region| {
            region.start - offset < viewport_height && region.start + region.height - offset > 0.0
        });
        if !visible {
            self.direction = None;
            self.expires = None;
            return None;
        }
        if offset > self.last_offset {
            self.direction = Some(ScrollDirection::Forward);
        } else if offset < self.last_offset {
            self.direction = Some(ScrollDirection::Backward);
        }
        self.last_offset = offset;
        self.expires = Some(now + DIRECTION_HOLD);
        self.direction
    }

    pub fn direction(&self, now: Instant) -> Option<ScrollDirection> {
        match self.expires {
            Some(deadline) if now < deadline => self.direction,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Page {
        offset: f64,
        viewport: f64,
        anchors: Vec<AnchorRegion>,
    }

    impl ScrollGeometry for Page {
        fn scroll_offset(&self) -> f64 {
            self.offset
        }

        fn viewport_height(&self) -> f64 {
            self.viewport
        }

        fn anchors(&self) -> Vec<AnchorRegion> {
            self.anchors.clone()
        }
    }

    #[derive(Default, Clone)]
    struct ManualFrames {
        log: Rc<RefCell<FrameLog>>,
    }

    #[derive(Default)]
    struct FrameLog {
        next: u64,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
    }

    impl FrameScheduler for ManualFrames {
        fn request_frame(&mut self) -> FrameHandle {
            let mut log = self.log.borrow_mut();
            log.next += 1;
            let handle = FrameHandle(log.next);
            log.requested.push(handle);
            handle
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.log.borrow_mut().cancelled.push(handle);
        }
    }

    fn layout() -> Vec<AnchorRegion> {
        let mut start = 0.0;
        SectionId::ALL
            .into_iter()
            .map(|id| {
                let region = AnchorRegion {
                    id,
                    start,
                    height: 1000.0,
                };
                start += 1000.0;
                region
            })
            .collect()
    }

    type Seen = Rc<RefCell<Vec<ScrollSnapshot>>>;

    fn tracker(offset: f64) -> (ScrollTracker<Page, ManualFrames>, ManualFrames, Seen) {
        let frames = ManualFrames::default();
        let seen: Seen = Rc::default();
        let sink = Rc::clone(&seen);
        let page = Page {
            offset,
            viewport: 800.0,
            anchors: layout(),
        };
        let tracker = ScrollTracker::new(
            page,
            frames.clone(),
            TrackerSettings::default(),
            Box::new(move |snap| sink.borrow_mut().push(*snap)),
        );
        (tracker, frames, seen)
    }

    #[test]
    fn section_names_round_trip() {
        for id in SectionId::ALL {
            assert_eq!(id.as_str().parse::<SectionId>(), Ok(id));
        }
        assert_eq!("FAQ".parse::<SectionId>(), Ok(SectionId::Faq));
        assert_eq!(
            "nowhere".parse::<SectionId>(),
            Err(UnknownSection("nowhere".to_string()))
        );
    }

    #[test]
    fn active_uses_lookahead_and_falls_back_to_first() {
        let anchors = layout();
        assert_eq!(active_section(&anchors, 0.0, 150.0), SectionId::Hero);
        assert_eq!(active_section(&anchors, 860.0, 150.0), SectionId::Overview);
        assert_eq!(active_section(&anchors, 849.0, 150.0), SectionId::Hero);
        assert_eq!(active_section(&anchors, 50_000.0, 150.0), SectionId::Hero);
        assert_eq!(active_section(&[], 0.0, 150.0), SectionId::Hero);

        let gapped = vec![AnchorRegion {
            id: SectionId::Problems,
            start: 500.0,
            height: 100.0,
        }];
        assert_eq!(active_section(&gapped, 0.0, 150.0), SectionId::Problems);
    }

    #[test]
    fn fill_is_clamped_and_rounded() {
        let region = AnchorRegion {
            id: SectionId::Timeline,
            start: 2000.0,
            height: 1000.0,
        };
        assert_eq!(fill_percent(Some(&region), 0.0, 800.0), 0);
        assert_eq!(fill_percent(Some(&region), 1600.0, 800.0), 0);
        assert_eq!(fill_percent(Some(&region), 1606.0, 800.0), 1);
        assert_eq!(fill_percent(Some(&region), 2100.0, 800.0), 50);
        assert_eq!(fill_percent(Some(&region), 99_999.0, 800.0), 100);
        assert_eq!(fill_percent(None, 2100.0, 800.0), 0);

        let flat = AnchorRegion { height: 0.0, ..region };
        assert_eq!(fill_percent(Some(&flat), 1601.0, 800.0), 100);
    }

    #[test]
    fn mount_publishes_initial_state() {
        let (mut tracker, frames, seen) = tracker(0.0);
        tracker.mount();
        assert_eq!(
            *seen.borrow(),
            vec![ScrollSnapshot {
                active: SectionId::Hero,
                fill_percent: 0,
                past_hero: false,
            }]
        );
        assert!(frames.log.borrow().requested.is_empty());
        assert_eq!(tracker.state().phase, TrackerPhase::Idle);
    }

    #[test]
    fn burst_of_events_costs_one_frame() {
        let (mut tracker, frames, seen) = tracker(0.0);
        for _ in 0..50 {
            tracker.on_scroll_event();
        }
        assert_eq!(frames.log.borrow().requested.len(), 1);
        assert_eq!(tracker.state().phase, TrackerPhase::Scheduled);
        assert!(seen.borrow().is_empty());

        tracker.geometry_mut().offset = 2100.0;
        let handle = tracker.pending_frame().unwrap();
        tracker.on_frame(handle);
        assert_eq!(tracker.state().phase, TrackerPhase::Idle);
        assert_eq!(
            *seen.borrow(),
            vec![ScrollSnapshot {
                active: SectionId::Timeline,
                fill_percent: 50,
                past_hero: true,
            }]
        );
        assert_eq!(tracker.state().last_offset, 2100.0);

        tracker.on_scroll_event();
        assert_eq!(frames.log.borrow().requested.len(), 2);
    }

    #[test]
    fn unchanged_values_are_not_republished() {
        let (mut tracker, _frames, seen) = tracker(2100.0);
        tracker.mount();
        for _ in 0..3 {
            tracker.on_scroll_event();
            let handle = tracker.pending_frame().unwrap();
            tracker.on_frame(handle);
        }
        assert_eq!(seen.borrow().len(), 1);

        // Moves inside the same section but changes the fill.
        tracker.geometry_mut().offset = 2200.0;
        tracker.on_scroll_event();
        let handle = tracker.pending_frame().unwrap();
        tracker.on_frame(handle);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1].fill_percent, 60);
    }

    #[test]
    fn stale_frames_are_ignored() {
        let (mut tracker, _frames, seen) = tracker(0.0);
        tracker.on_scroll_event();
        tracker.on_frame(FrameHandle(999));
        assert!(seen.borrow().is_empty());
        assert_eq!(tracker.state().phase, TrackerPhase::Scheduled);
    }

    #[test]
    fn teardown_cancels_and_silences() {
        let (mut tracker, frames, seen) = tracker(0.0);
        tracker.on_scroll_event();
        let handle = tracker.pending_frame().unwrap();
        tracker.teardown();
        assert_eq!(frames.log.borrow().cancelled, vec![handle]);
        assert_eq!(tracker.state().phase, TrackerPhase::TornDown);

        tracker.on_frame(handle);
        tracker.on_scroll_event();
        tracker.mount();
        assert!(seen.borrow().is_empty());
        assert_eq!(frames.log.borrow().requested.len(), 1);
    }

    #[test]
    fn drop_cancels_pending_frame() {
        let (mut tracker, frames, _seen) = tracker(0.0);
        tracker.on_scroll_event();
        drop(tracker);
        assert_eq!(frames.log.borrow().cancelled.len(), 1);
    }

    #[test]
    fn missing_tracked_section_reads_zero() {
        let frames = ManualFrames::default();
        let seen: Seen = Rc::default();
        let sink = Rc::clone(&seen);
        let page = Page {
            offset: 500.0,
            viewport: 800.0,
            anchors: layout()
                .into_iter()
                .filter(|a| a.id != SectionId::Timeline)
                .collect(),
        };
        let mut tracker = ScrollTracker::new(
            page,
            frames,
            TrackerSettings::default(),
            Box::new(move |snap| sink.borrow_mut().push(*snap)),
        );
        tracker.mount();
        assert_eq!(seen.borrow()[0].fill_percent, 0);
    }

    #[test]
    fn configured_lookahead_and_section_take_effect() {
        let config = crate::config::DeckConfig::from_toml_str(
            "[tracker]\nlookahead = 8500.0\ntracked_section = \"rules\"\n",
        )
        .unwrap();
        let settings = config.tracker_settings();
        assert_eq!(settings.lookahead, 8500.0);
        assert_eq!(settings.tracked, SectionId::Rules);
        assert_eq!(active_section(&layout(), 0.0, settings.lookahead), SectionId::Contact);
        assert_eq!(
            active_section(&layout(), 0.0, TrackerSettings::default().lookahead),
            SectionId::Hero
        );

        let seen: Seen = Rc::default();
        let sink = Rc::clone(&seen);
        let page = Page {
            offset: 4100.0,
            viewport: 800.0,
            anchors: layout(),
        };
        let mut tracker = ScrollTracker::new(
            page,
            ManualFrames::default(),
            settings,
            Box::new(move |snap| sink.borrow_mut().push(*snap)),
        );
        tracker.mount();
        // Rules spans 4000..5000; the viewport centre sits at 4500.
        assert_eq!(seen.borrow()[0].fill_percent, 50);
    }

    #[test]
    fn past_hero_flips_under_the_navbar() {
        let anchors = layout();
        assert!(!past_hero(&anchors, 80.0));
        assert!(past_hero(&anchors, 81.0));
        assert!(!past_hero(&[], 5000.0));
    }

    #[test]
    fn past_hero_change_alone_is_published() {
        let (mut tracker, _frames, seen) = tracker(70.0);
        tracker.mount();
        tracker.geometry_mut().offset = 90.0;
        tracker.on_scroll_event();
        let handle = tracker.pending_frame().unwrap();
        tracker.on_frame(handle);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].active, seen[1].active);
        assert_eq!(seen[0].fill_percent, seen[1].fill_percent);
        assert!(!seen[0].past_hero && seen[1].past_hero);
        assert!(tracker.state().past_hero);
    }

    #[test]
    fn direction_follows_movement_and_expires() {
        let timeline = layout()[2];
        let start = Instant::now();
        let mut direction = DirectionTracker::new(1800.0);
        assert_eq!(
            direction.observe(Some(&timeline), 1900.0, 800.0, start),
            Some(ScrollDirection::Forward)
        );
        assert_eq!(
            direction.observe(Some(&timeline), 1850.0, 800.0, start),
            Some(ScrollDirection::Backward)
        );
        // Same offset keeps the last direction and re-arms the hold.
        let later = start + Duration::from_millis(600);
        assert_eq!(
            direction.observe(Some(&timeline), 1850.0, 800.0, later),
            Some(ScrollDirection::Backward)
        );
        assert_eq!(
            direction.direction(later + Duration::from_millis(999)),
            Some(ScrollDirection::Backward)
        );
        assert_eq!(direction.direction(later + DIRECTION_HOLD), None);
    }

    #[test]
    fn direction_clears_when_region_leaves_view() {
        let timeline = layout()[2];
        let now = Instant::now();
        let mut direction = DirectionTracker::new(1500.0);
        assert!(direction.observe(Some(&timeline), 1600.0, 800.0, now).is_some());
        // Timeline starts at 2000; a viewport ending at 1900 does not reach it.
        assert_eq!(direction.observe(Some(&timeline), 1100.0, 800.0, now), None);
        assert_eq!(direction.direction(now), None);
        assert_eq!(direction.observe(None, 2100.0, 800.0, now), None);
    }
}
