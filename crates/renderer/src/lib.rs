//! Windowed particle renderer for the Morphosis sequence.
//!
//! ```text
//!   morphosis CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ redraw()
//!                          │                                   │
//!                          ├─ AssetLoader (worker threads)     ├─▶ Sequencer::tick
//!                          └─ GpuState                         └─▶ GpuState::render
//! ```
//!
//! `GpuState` owns the surface, one pipeline per particle program, the
//! instance buffers and the ping-pong simulator. Program bodies come from the
//! `sequencer` crate and are wrapped in a GLSL prelude at startup.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use runtime::{BoxedTimeSource, FrameClock, SystemTimeSource, TimeSample, TimeSource};
pub use types::{Antialiasing, RendererConfig};
pub use window::window_title;

/// Entry point that owns the configuration until the window opens.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it closes or a fatal error occurs.
    pub fn run(self) -> Result<()> {
        window::run(self.config)
    }
}
