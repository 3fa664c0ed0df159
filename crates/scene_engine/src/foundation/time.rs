//! Frame timing utilities

use std::time::{Duration, Instant};

/// Frame clock owned by the frame driver
///
/// Tracks the wall-clock time between consecutive frames and the time spent
/// inside scene traversal for the most recent frame.
#[derive(Debug)]
pub struct FrameClock {
    created: Instant,
    last_frame: Option<Instant>,
    delta_time: Duration,
    last_traversal: Duration,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a new clock with no frames recorded
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            last_frame: None,
            delta_time: Duration::ZERO,
            last_traversal: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Mark the start of a frame and return its start instant
    pub fn begin_frame(&mut self) -> Instant {
        let now = Instant::now();
        self.delta_time = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_frame = Some(now);
        now
    }

    /// Mark the end of a frame that started at `started`
    pub fn end_frame(&mut self, started: Instant) {
        self.last_traversal = started.elapsed();
        self.frame_count += 1;
    }

    /// Time between the starts of the two most recent frames
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Time spent inside the most recent frame
    pub fn last_traversal(&self) -> Duration {
        self.last_traversal
    }

    /// Number of completed frames
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since the clock was created
    pub fn average_fps(&self) -> f32 {
        let total = self.created.elapsed().as_secs_f32();
        if total > 0.0 {
            self.frame_count as f32 / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_advances_on_end_frame() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.frame_count(), 0);

        let started = clock.begin_frame();
        assert_eq!(clock.delta_time(), Duration::ZERO);
        clock.end_frame(started);

        let started = clock.begin_frame();
        clock.end_frame(started);
        assert_eq!(clock.frame_count(), 2);
    }
}
