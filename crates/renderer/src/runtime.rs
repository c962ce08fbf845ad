use std::time::Instant;

/// Longest delta handed to the sequence after a stall.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Snapshot of the clock for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Measures the delta between consecutive frames.
///
/// The first frame reports zero so setup work never counts as elapsed time.
pub struct FrameClock {
    source: BoxedTimeSource,
    last: Option<f32>,
}

impl FrameClock {
    pub fn new(source: BoxedTimeSource) -> Self {
        Self { source, last: None }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemTimeSource::new()))
    }

    /// Samples the source and returns the clamped delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = self.source.sample().seconds;
        let delta = match self.last {
            Some(previous) => (now - previous).clamp(0.0, MAX_FRAME_DELTA),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }

    pub fn reset(&mut self) {
        self.source.reset();
        self.last = None;
    }
}
