use std::time::{Duration, Instant};

/// Timing snapshot for one drawn frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous drawn frame, clamped.
    pub dt: f32,

    /// Monotonic timestamp taken when the frame was started.
    pub now: Instant,

    /// Number of frames drawn before this one by the same render thread.
    pub frame_index: u64,
}

/// Per-render-thread frame clock.
///
/// Delta time is clamped so that a long pause, a surface wait, or a debugger stop
/// does not show up as one enormous step in the renderer.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: None,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Forgets the previous frame so the next tick reports the minimum delta.
    ///
    /// Called when the render thread resumes from pause.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Number of frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock and returns the timing for the frame about to be drawn.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = match self.last {
            Some(last) => now
                .saturating_duration_since(last)
                .clamp(self.dt_min, self.dt_max),
            None => self.dt_min,
        };

        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
