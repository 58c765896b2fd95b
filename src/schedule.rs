//! Tick scheduling.
//!
//! The viewer never loops on its own: at the end of every tick it asks a
//! `TickScheduler` for the next one. At most one tick is pending at a time;
//! repeated requests before the tick fires collapse into one.

use std::time::{Duration, Instant};

/// Arranges for the viewer's next tick.
pub trait TickScheduler {
    fn request_tick(&mut self);
}

/// Scheduler driven by hand. Tests call `take_tick` and then `Viewer::tick`.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: bool,
    requests: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending tick, if any.
    pub fn take_tick(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total `request_tick` calls, including collapsed ones.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl TickScheduler for ManualScheduler {
    fn request_tick(&mut self) {
        self.requests += 1;
        self.pending = true;
    }
}

/// Paces ticks at a fixed rate, like a display refresh signal.
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    next_deadline: Instant,
    pending: bool,
}

impl FrameClock {
    /// `fps` of 0 is treated as 1.
    pub fn new(fps: u32) -> Self {
        let interval = Duration::from_secs(1) / fps.max(1);
        Self {
            interval,
            next_deadline: Instant::now(),
            pending: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Block until the next refresh if a tick is pending.
    ///
    /// Returns `true` when the caller should run a tick now. When nothing is
    /// pending this returns `false` immediately.
    pub fn wait_for_tick(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
        }
        // Skip missed refreshes instead of bursting to catch up.
        self.next_deadline = Instant::now().max(self.next_deadline) + self.interval;
        self.pending = false;
        true
    }
}

impl TickScheduler for FrameClock {
    fn request_tick(&mut self) {
        self.pending = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_collapses_requests() {
        let mut scheduler = ManualScheduler::new();
        scheduler.request_tick();
        scheduler.request_tick();
        assert_eq!(scheduler.requests(), 2);
        assert!(scheduler.take_tick());
        assert!(!scheduler.take_tick());
    }

    #[test]
    fn frame_clock_only_fires_when_pending() {
        let mut clock = FrameClock::new(1000);
        assert!(!clock.wait_for_tick());
        clock.request_tick();
        assert!(clock.wait_for_tick());
        assert!(!clock.is_pending());
    }

    #[test]
    fn frame_clock_paces_consecutive_ticks() {
        let mut clock = FrameClock::new(100);
        assert_eq!(clock.interval(), Duration::from_millis(10));
        let start = Instant::now();
        for _ in 0..3 {
            clock.request_tick();
            assert!(clock.wait_for_tick());
        }
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
