use std::time::{Duration, Instant};

/// Minimum-interval frame throttle. Ticks closer together than
/// `min_interval` are skipped; long gaps are clamped to `max_delta`.
#[derive(Debug, Clone)]
pub struct FrameGovernor {
    last_tick: Instant,
    min_interval: Duration,
    max_delta: Duration,
}

impl FrameGovernor {
    pub fn new(now: Instant, min_interval: Duration, max_delta: Duration) -> Self {
        Self {
            last_tick: now,
            min_interval,
            max_delta,
        }
    }

    /// Elapsed time to simulate, or `None` if it is too early for a new frame.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed <= self.min_interval {
            return None;
        }
        self.last_tick = now;
        Some(elapsed.min(self.max_delta))
    }

    /// Forget accumulated time, e.g. after the window was suspended.
    pub fn reset(&mut self, now: Instant) {
        self.last_tick = now;
    }
}

/// Frame counter reporting a rate roughly once per second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { frames: 0, since: now }
    }

    pub fn frame(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let secs = now.saturating_duration_since(self.since).as_secs_f64();
        if secs < 1.0 {
            return None;
        }
        let fps = self.frames as f64 / secs;
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}
