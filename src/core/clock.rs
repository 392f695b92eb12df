use std::time::Instant;

/// Source of frame time for the loop
///
/// Implementations must return elapsed seconds that never go backwards
/// between calls unless explicitly reset.
pub trait FrameClock {
    /// Seconds elapsed since the clock started (or was last reset)
    fn elapsed(&mut self) -> f32;

    /// Restart elapsed time from zero
    fn reset(&mut self);
}

/// Monotonic wall clock used by the windowed loop
#[derive(Debug)]
pub struct ElapsedClock {
    start: Instant,
    last_elapsed: f32,
}

impl ElapsedClock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_elapsed: 0.0,
        }
    }
}

impl FrameClock for ElapsedClock {
    fn elapsed(&mut self) -> f32 {
        // Instant is monotonic, but f32 rounding of a long-running session can
        // still wobble by an ulp; pin it to the last value handed out.
        let elapsed = self.start.elapsed().as_secs_f32().max(self.last_elapsed);
        self.last_elapsed = elapsed;
        elapsed
    }

    fn reset(&mut self) {
        self.start = Instant::now();
        self.last_elapsed = 0.0;
    }
}

impl Default for ElapsedClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn clock_measures_elapsed() {
        let mut clock = ElapsedClock::new();

        thread::sleep(Duration::from_millis(10));
        let elapsed = clock.elapsed();

        // Should be roughly 10ms = 0.01s
        assert!(elapsed >= 0.009 && elapsed <= 0.050);
    }

    #[test]
    fn elapsed_never_decreases() {
        let mut clock = ElapsedClock::new();
        let mut previous = clock.elapsed();

        for _ in 0..100 {
            let now = clock.elapsed();
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn clock_resets() {
        let mut clock = ElapsedClock::new();

        thread::sleep(Duration::from_millis(10));
        assert!(clock.elapsed() >= 0.009);

        clock.reset();

        // Should be very small since we just reset
        assert!(clock.elapsed() < 0.005);
    }
}
