use std::time::{Duration, Instant};

/// Source of frame ticks. Each call blocks until the next frame is due and
/// returns its timestamp; `None` ends the loop.
pub trait FrameDriver {
    fn next_frame(&mut self) -> Option<Instant>;
}

/// Wall-clock driver at a fixed target rate, optionally limited to a frame count.
pub struct IntervalDriver {
    period: Duration,
    next_due: Option<Instant>,
    remaining: Option<u64>,
}

impl IntervalDriver {
    pub fn new(target_fps: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / target_fps.max(1),
            next_due: None,
            remaining: None,
        }
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameDriver for IntervalDriver {
    fn next_frame(&mut self) -> Option<Instant> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
        }
        let tick = Instant::now();
        // Skip missed slots instead of bursting to catch up.
        self.next_due = Some((due + self.period).max(tick));
        Some(tick)
    }
}

/// Virtual clock advancing a fixed step per frame without sleeping.
pub struct ManualDriver {
    now: Instant,
    step: Duration,
    remaining: u64,
}

impl ManualDriver {
    pub fn new(step: Duration, frames: u64) -> Self {
        Self {
            now: Instant::now(),
            step,
            remaining: frames,
        }
    }

    /// Frames at `fps` per virtual second.
    pub fn at_fps(fps: u32, frames: u64) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1), frames)
    }
}

impl FrameDriver for ManualDriver {
    fn next_frame(&mut self) -> Option<Instant> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.now += self.step;
        Some(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_driver_advances_virtual_time() {
        let mut driver = ManualDriver::at_fps(10, 3);
        let first = driver.next_frame().unwrap();
        let second = driver.next_frame().unwrap();
        assert_eq!(second - first, Duration::from_millis(100));
        assert!(driver.next_frame().is_some());
        assert!(driver.next_frame().is_none());
    }

    #[test]
    fn interval_driver_honours_frame_limit() {
        let mut driver = IntervalDriver::new(1000).with_frame_limit(2);
        assert!(driver.next_frame().is_some());
        assert!(driver.next_frame().is_some());
        assert!(driver.next_frame().is_none());
    }
}
