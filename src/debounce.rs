//! One-shot resetting timers
//!
//! Show/hide transitions fire only after a light's own quiet period.
//! Each timer is armed by `trigger`, re-arming pushes the deadline out,
//! and `fire` reports expiry exactly once. Time is passed in by the
//! caller so the engine tick drives every timer from a single clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Arm the timer, or push an armed deadline out to `now + delay`
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Disarm without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once when an armed deadline has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Earliest instant at which `fire` could report true
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut d = Debounce::new(ms(90));
        d.trigger(start);
        assert!(!d.fire(start + ms(50)));
        assert!(d.fire(start + ms(90)));
        // Already fired; stays quiet until re-triggered
        assert!(!d.fire(start + ms(200)));
    }

    #[test]
    fn test_retrigger_resets_deadline() {
        let start = Instant::now();
        let mut d = Debounce::new(ms(90));
        d.trigger(start);
        d.trigger(start + ms(60));
        // Original deadline passed but the reset pushed it out
        assert!(!d.fire(start + ms(100)));
        assert!(d.fire(start + ms(150)));
    }

    #[test]
    fn test_unarmed_never_fires() {
        let start = Instant::now();
        let mut d = Debounce::new(ms(10));
        assert!(!d.fire(start + ms(1000)));
    }

    #[test]
    fn test_cancel_disarms() {
        let start = Instant::now();
        let mut d = Debounce::new(ms(10));
        d.trigger(start);
        d.cancel();
        assert!(!d.pending());
        assert!(!d.fire(start + ms(20)));
    }

    #[test]
    fn test_zero_delay_fires_on_same_tick() {
        let start = Instant::now();
        let mut d = Debounce::new(ms(0));
        d.trigger(start);
        assert!(d.fire(start));
    }

    #[test]
    fn test_timers_are_independent() {
        let start = Instant::now();
        let mut a = Debounce::new(ms(400));
        let mut b = Debounce::new(ms(425));
        a.trigger(start);
        b.trigger(start);
        assert!(a.fire(start + ms(410)));
        assert!(!b.fire(start + ms(410)));
        assert!(b.fire(start + ms(425)));
    }
}
