//! Page-side clocks: the submission countdown and the rotating carousel.

use crate::config::DeckConfig;
use crate::error::DeckError;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeLeft {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeLeft {
    pub fn is_zero(&self) -> bool {
        *self == TimeLeft::default()
    }
}

impl std::fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    deadline: SystemTime,
}

impl Countdown {
    pub const TICK: Duration = Duration::from_secs(1);

    pub fn new(deadline: SystemTime) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }

    pub fn time_left(&self, now: SystemTime) -> TimeLeft {
        let Ok(remaining) = self.deadline.duration_since(now) else {
            return TimeLeft::default();
        };
        let total = remaining.as_secs();
        TimeLeft {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn advance(&mut self) -> usize {
        self.index = if self.len == 0 {
            0
        } else {
            (self.index + 1) % self.len
        };
        self.index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalHandle(pub u64);

/// Host interval source (`setInterval` in a page, a test clock here).
pub trait IntervalScheduler {
    fn set_interval(&mut self, period: Duration) -> IntervalHandle;
    fn clear_interval(&mut self, handle: IntervalHandle);
}

/// Runs `on_tick` for every host tick until stopped.
pub struct IntervalTimer<S: IntervalScheduler> {
    scheduler: S,
    handle: Option<IntervalHandle>,
    on_tick: Box<dyn FnMut()>,
}

impl<S: IntervalScheduler> IntervalTimer<S> {
    pub fn start(mut scheduler: S, period: Duration, on_tick: Box<dyn FnMut()>) -> Self {
        let handle = scheduler.set_interval(period);
        tracing::debug!(interval = handle.0, period_ms = period.as_millis() as u64, "interval started");
        Self {
            scheduler,
            handle: Some(handle),
            on_tick,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn tick(&mut self, handle: IntervalHandle) {
        if self.handle == Some(handle) {
            (self.on_tick)();
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.scheduler.clear_interval(handle);
        }
    }
}

impl<S: IntervalScheduler> Drop for IntervalTimer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Rotates a carousel of `slides` on the configured period. `on_advance`
/// receives each new index.
pub fn start_carousel<S: IntervalScheduler>(
    scheduler: S,
    config: &DeckConfig,
    slides: usize,
    mut on_advance: Box<dyn FnMut(usize)>,
) -> IntervalTimer<S> {
    let mut carousel = Carousel::new(slides);
    IntervalTimer::start(
        scheduler,
        config.carousel_period(),
        Box::new(move || on_advance(carousel.advance())),
    )
}

/// Re-reads the wall clock every second against the configured deadline.
pub fn start_countdown<S: IntervalScheduler>(
    scheduler: S,
    config: &DeckConfig,
    mut on_tick: Box<dyn FnMut(TimeLeft)>,
) -> Result<IntervalTimer<S>, DeckError> {
    let countdown = Countdown::new(config.deadline()?);
    Ok(IntervalTimer::start(
        scheduler,
        Countdown::TICK,
        Box::new(move || on_tick(countdown.time_left(SystemTime::now()))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::UNIX_EPOCH;

    #[derive(Default, Clone)]
    struct TestClock {
        log: Rc<RefCell<(u64, Vec<Duration>, Vec<IntervalHandle>)>>,
    }

    impl IntervalScheduler for TestClock {
        fn set_interval(&mut self, period: Duration) -> IntervalHandle {
            let mut log = self.log.borrow_mut();
            log.0 += 1;
            log.1.push(period);
            IntervalHandle(log.0)
        }

        fn clear_interval(&mut self, handle: IntervalHandle) {
            self.log.borrow_mut().2.push(handle);
        }
    }

    #[test]
    fn countdown_splits_remaining_time() {
        let deadline = UNIX_EPOCH + Duration::from_secs(1_770_368_400);
        let countdown = Countdown::new(deadline);
        let now = deadline - Duration::from_secs(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
        let left = countdown.time_left(now);
        assert_eq!(
            left,
            TimeLeft {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5
            }
        );
        assert_eq!(left.to_string(), "2d 03h 04m 05s");
    }

    #[test]
    fn countdown_is_zero_after_deadline() {
        let deadline = UNIX_EPOCH + Duration::from_secs(1_000);
        let countdown = Countdown::new(deadline);
        assert!(countdown.time_left(deadline).is_zero());
        assert!(countdown.time_left(deadline + Duration::from_secs(90)).is_zero());
    }

    #[test]
    fn carousel_wraps_and_tolerates_empty() {
        let mut carousel = Carousel::new(3);
        assert_eq!(
            [carousel.advance(), carousel.advance(), carousel.advance()],
            [1, 2, 0]
        );
        let mut empty = Carousel::new(0);
        assert_eq!(empty.advance(), 0);
        assert_eq!(empty.index(), 0);
    }

    #[test]
    fn interval_stops_on_drop_and_ignores_late_ticks() {
        let clock = TestClock::default();
        let ticks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ticks);
        let mut timer = IntervalTimer::start(
            clock.clone(),
            Countdown::TICK,
            Box::new(move || *counter.borrow_mut() += 1),
        );
        let handle = IntervalHandle(1);
        timer.tick(handle);
        timer.tick(handle);
        timer.tick(IntervalHandle(42));
        assert_eq!(*ticks.borrow(), 2);

        timer.stop();
        assert!(!timer.is_running());
        timer.tick(handle);
        assert_eq!(*ticks.borrow(), 2);
        drop(timer);
        // Already cleared by stop, so drop does not clear twice.
        assert_eq!(clock.log.borrow().2, vec![handle]);

        let _second = IntervalTimer::start(clock.clone(), Duration::from_secs(5), Box::new(|| {}));
        drop(_second);
        assert_eq!(clock.log.borrow().2.len(), 2);
        assert_eq!(clock.log.borrow().1[1], Duration::from_secs(5));
    }

    #[test]
    fn carousel_runs_on_the_configured_period() {
        let config =
            DeckConfig::from_toml_str("[countdown]\ncarousel_period_ms = 7000\n").unwrap();
        let clock = TestClock::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut timer = start_carousel(
            clock.clone(),
            &config,
            3,
            Box::new(move |index| sink.borrow_mut().push(index)),
        );
        assert_eq!(clock.log.borrow().1, vec![Duration::from_millis(7000)]);
        for _ in 0..4 {
            timer.tick(IntervalHandle(1));
        }
        assert_eq!(*seen.borrow(), vec![1, 2, 0, 1]);
    }

    #[test]
    fn countdown_ticks_every_second_toward_the_deadline() {
        let config =
            DeckConfig::from_toml_str("[countdown]\ndeadline = 2999-01-01T00:00:00\n").unwrap();
        let clock = TestClock::default();
        let last = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&last);
        let mut timer = start_countdown(
            clock.clone(),
            &config,
            Box::new(move |left| *sink.borrow_mut() = Some(left)),
        )
        .unwrap();
        assert_eq!(clock.log.borrow().1, vec![Countdown::TICK]);
        timer.tick(IntervalHandle(1));
        let left = last.borrow().unwrap();
        assert!(left.days > 300);
    }
}
