//! Time-driven property animation in the style of tween timelines: entries are
//! placed relative to each other, eased, and applied against a caller-owned
//! context every frame.

mod ease;
mod timeline;
mod tween;

pub use ease::Ease;
pub use timeline::{Placement, Timeline, Timing};
pub use tween::{Action, ArrayTween, Call, Property, Target, Tween, Tweenable};
