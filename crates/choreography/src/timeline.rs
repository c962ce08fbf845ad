use tracing::debug;

use crate::ease::Ease;
use crate::tween::{Action, Call};

/// Where an entry starts, relative to what is already on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Placement {
    /// At the current end of the timeline.
    #[default]
    Append,
    /// At an absolute time in seconds.
    At(f32),
    /// Together with the previously added entry (`"<"`).
    WithPrevious,
    /// Previous entry's start plus a delta in seconds (`"<0.5"`).
    AfterPreviousStart(f32),
    /// A percentage of the way through the previous entry (`"<30%"`).
    ThroughPrevious(f32),
}

impl Placement {
    fn resolve(self, timeline_end: f32, previous: Option<(f32, f32)>) -> f32 {
        let (prev_start, prev_duration) = previous.unwrap_or((0.0, 0.0));
        let start = match self {
            Placement::Append => timeline_end,
            Placement::At(time) => time,
            Placement::WithPrevious => prev_start,
            Placement::AfterPreviousStart(delta) => prev_start + delta,
            Placement::ThroughPrevious(percent) => prev_start + prev_duration * percent / 100.0,
        };
        start.max(0.0)
    }
}

/// Duration, easing and placement for one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub duration: f32,
    pub ease: Option<Ease>,
    pub placement: Placement,
    pub delay: f32,
}

impl Timing {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            ease: None,
            placement: Placement::Append,
            delay: 0.0,
        }
    }

    pub fn instant() -> Self {
        Self::new(0.0)
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = Some(ease);
        self
    }

    pub fn at(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_previous(self) -> Self {
        self.at(Placement::WithPrevious)
    }

    pub fn after_previous_start(self, delta: f32) -> Self {
        self.at(Placement::AfterPreviousStart(delta))
    }

    pub fn through_previous(self, percent: f32) -> Self {
        self.at(Placement::ThroughPrevious(percent))
    }

    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Running,
    Done,
}

struct Entry<C> {
    start: f32,
    duration: f32,
    ease: Ease,
    action: Box<dyn Action<C>>,
    phase: Phase,
}

impl<C> Entry<C> {
    fn end(&self) -> f32 {
        self.start + self.duration
    }

    fn step(&mut self, ctx: &mut C, elapsed: f32) {
        if self.phase == Phase::Done || elapsed < self.start {
            return;
        }
        if self.phase == Phase::Pending {
            self.action.begin(ctx);
            self.phase = Phase::Running;
        }
        let local = if self.duration <= 0.0 {
            1.0
        } else {
            ((elapsed - self.start) / self.duration).clamp(0.0, 1.0)
        };
        self.action.apply(ctx, self.ease.sample(local));
        if local >= 1.0 {
            self.phase = Phase::Done;
        }
    }
}

/// Ordered, offset-addressable property animations over a context `C`.
///
/// Entries are kept sorted by start time; entries sharing a start run in the
/// order they were added.
pub struct Timeline<C> {
    entries: Vec<Entry<C>>,
    /// Start and duration of the most recently added entry.
    previous: Option<(f32, f32)>,
    default_ease: Ease,
    elapsed: f32,
    cancelled: bool,
}

impl<C: 'static> Timeline<C> {
    pub fn new(default_ease: Ease) -> Self {
        Self {
            entries: Vec::new(),
            previous: None,
            default_ease,
            elapsed: 0.0,
            cancelled: false,
        }
    }

    /// Adds an entry and returns its resolved start time.
    pub fn add(&mut self, timing: Timing, action: impl Action<C> + 'static) -> f32 {
        let start = timing.placement.resolve(self.total_duration(), self.previous) + timing.delay;
        self.previous = Some((start, timing.duration));
        let index = self.entries.partition_point(|entry| entry.start <= start);
        self.entries.insert(
            index,
            Entry {
                start,
                duration: timing.duration,
                ease: timing.ease.unwrap_or(self.default_ease),
                action: Box::new(action),
                phase: Phase::Pending,
            },
        );
        start
    }

    pub fn call(&mut self, placement: Placement, callback: impl FnOnce(&mut C) + 'static) -> f32 {
        self.add(Timing::instant().at(placement), Call::new(callback))
    }

    /// Moves the playhead forward by `dt` seconds and applies every active
    /// entry in start order.
    pub fn advance(&mut self, ctx: &mut C, dt: f32) {
        if self.cancelled {
            debug!(elapsed = self.elapsed, "ignoring advance on a cancelled timeline");
            return;
        }
        self.elapsed += dt.max(0.0);
        let elapsed = self.elapsed;
        for entry in &mut self.entries {
            entry.step(ctx, elapsed);
        }
    }

    pub fn total_duration(&self) -> f32 {
        self.entries.iter().map(Entry::end).fold(0.0, f32::max)
    }

    /// Fraction of the total duration that has elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let total = self.total_duration();
        if total <= 0.0 {
            return 1.0;
        }
        (self.elapsed / total).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|entry| entry.phase == Phase::Done)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stops the timeline; later calls to `advance` change nothing.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::{ArrayTween, Property, Tween};

    #[derive(Default)]
    struct Ctx {
        a: f32,
        b: f32,
        samples: Vec<f32>,
        calls: u32,
    }

    fn a() -> Property<Ctx, f32> {
        Property::new(|ctx: &Ctx| ctx.a, |ctx: &mut Ctx, v| ctx.a = v)
    }

    fn b() -> Property<Ctx, f32> {
        Property::new(|ctx: &Ctx| ctx.b, |ctx: &mut Ctx, v| ctx.b = v)
    }

    #[test]
    fn append_places_after_timeline_end_plus_delay() {
        let mut tl = Timeline::<Ctx>::new(Ease::Linear);
        assert_eq!(tl.add(Timing::new(1.5), Tween::to(a(), 1.0)), 0.0);
        assert_eq!(tl.add(Timing::new(0.5).delay(0.5), Tween::to(a(), 2.0)), 2.0);
        let start = tl.add(Timing::new(0.5).delay(0.3), Tween::to(b(), 1.0));
        assert!((start - 2.8).abs() < 1e-6);
        assert!((tl.total_duration() - 3.3).abs() < 1e-6);
    }

    #[test]
    fn relative_placements_anchor_on_previous_entry() {
        let mut tl = Timeline::<Ctx>::new(Ease::Linear);
        tl.add(Timing::new(2.0), Tween::to(a(), 1.0));
        assert_eq!(tl.add(Timing::new(1.0).with_previous(), Tween::to(b(), 1.0)), 0.0);
        let start = tl.add(Timing::new(2.0).through_previous(90.0), Tween::to(a(), 0.0));
        assert!((start - 0.9).abs() < 1e-6);
        let start = tl.add(Timing::new(1.0).after_previous_start(0.5), Tween::to(b(), 0.0));
        assert!((start - 1.4).abs() < 1e-6);
        assert_eq!(tl.add(Timing::new(1.0).at(Placement::At(7.0)), Tween::to(b(), 3.0)), 7.0);
        assert_eq!(tl.total_duration(), 8.0);
    }

    #[test]
    fn first_entry_relative_placement_starts_at_zero() {
        let mut tl = Timeline::<Ctx>::new(Ease::Linear);
        assert_eq!(tl.add(Timing::new(1.0).through_previous(50.0), Tween::to(a(), 1.0)), 0.0);
    }

    #[test]
    fn progress_tracks_elapsed_over_total() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(4.0), Tween::to(a(), 8.0));
        tl.advance(&mut ctx, 1.0);
        assert!((tl.progress() - 0.25).abs() < 1e-6);
        assert!((ctx.a - 2.0).abs() < 1e-6);
        tl.advance(&mut ctx, 10.0);
        assert_eq!(tl.progress(), 1.0);
        assert_eq!(ctx.a, 8.0);
        assert!(tl.is_complete());
    }

    #[test]
    fn entry_uses_default_ease_unless_overridden() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Power3InOut);
        tl.add(Timing::new(1.0), Tween::to(a(), 1.0));
        tl.add(Timing::new(1.0).with_previous().ease(Ease::Linear), Tween::to(b(), 1.0));
        tl.advance(&mut ctx, 0.25);
        assert!((ctx.a - Ease::Power3InOut.sample(0.25)).abs() < 1e-6);
        assert!((ctx.b - 0.25).abs() < 1e-6);
    }

    #[test]
    fn later_entry_captures_value_left_by_earlier_one() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(1.0), Tween::to(a(), 10.0));
        tl.add(Timing::new(1.0), Tween::by(a(), 1.5));
        tl.advance(&mut ctx, 1.0);
        assert_eq!(ctx.a, 10.0);
        tl.advance(&mut ctx, 1.0);
        assert!((ctx.a - 11.5).abs() < 1e-6);
    }

    #[test]
    fn entries_added_out_of_order_run_by_start_time() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(0.0).at(Placement::At(1.0)), Tween::to(a(), 5.0));
        tl.call(Placement::At(0.5), |ctx: &mut Ctx| ctx.a = 1.0);
        tl.advance(&mut ctx, 2.0);
        assert_eq!(ctx.a, 5.0);
    }

    #[test]
    fn relative_placement_follows_the_last_added_entry() {
        let mut tl = Timeline::<Ctx>::new(Ease::Linear);
        tl.add(Timing::new(1.0).at(Placement::At(4.0)), Tween::to(a(), 1.0));
        tl.add(Timing::new(1.0).at(Placement::At(1.0)), Tween::to(b(), 1.0));
        let start = tl.add(Timing::new(1.0).with_previous(), Tween::to(a(), 2.0));
        assert_eq!(start, 1.0);
    }

    #[test]
    fn large_step_finishes_entries_it_jumps_over() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Power1InOut);
        tl.add(Timing::new(0.5), Tween::to(a(), 3.0));
        tl.add(Timing::new(0.5), Tween::to(b(), 4.0));
        tl.advance(&mut ctx, 5.0);
        assert_eq!((ctx.a, ctx.b), (3.0, 4.0));
    }

    #[test]
    fn cancellation_stops_updates() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(2.0), Tween::to(a(), 2.0));
        tl.advance(&mut ctx, 0.5);
        tl.cancel();
        tl.advance(&mut ctx, 1.0);
        assert!((ctx.a - 0.5).abs() < 1e-6);
        assert_eq!(tl.elapsed(), 0.5);
        assert!(!tl.is_complete());
    }

    #[test]
    fn cancelled_timeline_never_starts_pending_entries() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(1.0), Tween::to(a(), 1.0));
        tl.call(Placement::Append, |ctx: &mut Ctx| ctx.calls += 1);
        tl.advance(&mut ctx, 0.5);
        tl.cancel();
        tl.advance(&mut ctx, 5.0);
        assert_eq!(ctx.calls, 0);
        assert!((ctx.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn calls_fire_once_when_playhead_passes() {
        let mut ctx = Ctx::default();
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(Timing::new(1.0), Tween::to(a(), 1.0));
        tl.call(Placement::At(0.5), |ctx: &mut Ctx| ctx.calls += 1);
        tl.advance(&mut ctx, 0.25);
        assert_eq!(ctx.calls, 0);
        tl.advance(&mut ctx, 0.5);
        tl.advance(&mut ctx, 0.5);
        assert_eq!(ctx.calls, 1);
    }

    #[test]
    fn array_tween_shares_one_progress_value() {
        let mut ctx = Ctx {
            samples: vec![0.0, 10.0, -4.0, 99.0],
            ..Ctx::default()
        };
        let mut tl = Timeline::new(Ease::Linear);
        tl.add(
            Timing::new(2.0),
            ArrayTween::new(|ctx: &mut Ctx| &mut ctx.samples[..3], vec![4.0, 0.0, 4.0]),
        );
        tl.advance(&mut ctx, 0.5);
        assert_eq!(ctx.samples, vec![1.0, 7.5, -2.0, 99.0]);
        tl.advance(&mut ctx, 1.5);
        assert_eq!(ctx.samples, vec![4.0, 0.0, 4.0, 99.0]);
    }

    #[test]
    fn empty_timeline_reports_complete() {
        let tl = Timeline::<Ctx>::new(Ease::Linear);
        assert_eq!(tl.progress(), 1.0);
        assert!(tl.is_complete());
        assert!(tl.is_empty());
    }
}
