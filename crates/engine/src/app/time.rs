/// Timing for one simulation tick: `time_seconds` is the scene time at the
/// start of the tick, `delta_seconds` the length of the tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    pub time_seconds: f32,
    pub delta_seconds: f32,
}

impl FrameTime {
    pub fn new(time_seconds: f32, delta_seconds: f32) -> Self {
        Self {
            time_seconds,
            delta_seconds,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    elapsed_seconds: f64,
    tick_count: u64,
}

impl FrameClock {
    pub fn advance(&mut self, delta_seconds: f32) -> FrameTime {
        let frame = FrameTime {
            time_seconds: self.elapsed_seconds as f32,
            delta_seconds,
        };
        self.elapsed_seconds += f64::from(delta_seconds);
        self.tick_count = self.tick_count.saturating_add(1);
        frame
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_starts_at_zero() {
        let mut clock = FrameClock::default();
        let frame = clock.advance(0.25);
        assert_eq!(frame.time_seconds, 0.0);
        assert_eq!(frame.delta_seconds, 0.25);
    }

    #[test]
    fn time_accumulates_previous_deltas() {
        let mut clock = FrameClock::default();
        clock.advance(0.25);
        clock.advance(0.5);
        let frame = clock.advance(0.25);
        assert!((frame.time_seconds - 0.75).abs() < 1e-6);
        assert_eq!(clock.tick_count(), 3);
    }

    #[test]
    fn reset_rewinds_to_zero() {
        let mut clock = FrameClock::default();
        clock.advance(1.0);
        clock.reset();
        assert_eq!(clock.advance(0.1).time_seconds, 0.0);
    }
}
