use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(1000);

/// Frame counter that publishes its count once per second.
///
/// Readings step once per window; this is not a moving average.
#[derive(Debug, Default)]
pub struct FpsMeter {
    frames: u32,
    window_start: Option<Instant>,
    fps: u32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a rendered frame at `now`.
    pub fn tick(&mut self, now: Instant) {
        self.frames += 1;
        let start = *self.window_start.get_or_insert(now);
        if now.saturating_duration_since(start) >= WINDOW {
            self.fps = self.frames;
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_count_at_window_boundary() {
        let start = Instant::now();
        let mut meter = FpsMeter::new();
        for i in 0..25u64 {
            meter.tick(start + Duration::from_millis(i * 40));
        }
        // 24 * 40ms = 960ms: window not closed yet
        assert_eq!(meter.fps(), 0);
        meter.tick(start + Duration::from_millis(1000));
        assert_eq!(meter.fps(), 26);
    }

    #[test]
    fn reading_holds_between_windows() {
        let start = Instant::now();
        let mut meter = FpsMeter::new();
        meter.tick(start);
        meter.tick(start + Duration::from_millis(1000));
        assert_eq!(meter.fps(), 2);
        for i in 1..10u64 {
            meter.tick(start + Duration::from_millis(1000 + i * 10));
        }
        assert_eq!(meter.fps(), 2);
    }
}
