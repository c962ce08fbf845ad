//! GPU side of the particle renderer.
//!
//! - `context` owns the wgpu instance, device and surface and rebuilds the
//!   swapchain when the window resizes.
//! - `pipeline` compiles one render pipeline per particle program.
//! - `particles` mirrors the particle set into instance buffers, uploading
//!   only dirty ranges.
//! - `simulation` runs the ping-pong gravity passes on float textures.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `state` glues everything together behind `GpuState`.

mod context;
mod particles;
mod pipeline;
mod simulation;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
