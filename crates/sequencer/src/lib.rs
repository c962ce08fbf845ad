//! Stage state machine for the particle sequence.
//!
//! The [`Sequencer`] owns the [`Scene`] and advances it one tick at a time:
//! it waits for each stage's prerequisites, runs the stage's setup once, plays
//! its choreography and hands over to the next stage when the exit rule
//! fires. Nothing in this crate touches the GPU; the renderer reads the scene
//! between ticks.

mod particles;
mod program;
mod readiness;
mod scene;
mod sequencer;
mod stage;
pub mod simulation;
pub mod stages;
mod uniforms;

use thiserror::Error;

pub use particles::{Attribute, ParticleSet, ParticleSlicesMut, CAPACITY};
pub use program::{BlendMode, ProgramId, ShaderProgram};
pub use readiness::ReadinessGate;
pub use scene::{format_thousands, Camera, Overlay, Scene, Transform};
pub use sequencer::Sequencer;
pub use simulation::{GravityParams, PingPong, SimulationSeed, SIM_HEIGHT, SIM_WIDTH};
pub use stage::Stage;
pub use stages::{ExitRule, Resources};
pub use uniforms::{UniformKind, UniformSet, UniformSpec, UniformValue, MAX_FLOAT_UNIFORMS};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("draw count {requested} exceeds particle capacity {capacity}")]
    DrawCountExceedsCapacity { requested: usize, capacity: usize },
    #[error("cannot advance from {from} to {to}; stages run in a fixed order")]
    OutOfOrder { from: Stage, to: Stage },
    #[error("stage {0} is the last stage")]
    NoNextStage(Stage),
    #[error("program {program} has no uniform named {name}")]
    UnknownUniform { name: String, program: ProgramId },
    #[error("uniform {name} is a {kind:?} uniform")]
    UniformKindMismatch { name: String, kind: UniformKind },
}
