use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use assets::AssetLoader;
use sequencer::{Overlay, Resources, Sequencer, CAPACITY};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::FrameClock;
use crate::types::RendererConfig;

/// Why a redraw did not present.
enum FrameError {
    Surface(wgpu::SurfaceError),
    Fatal(anyhow::Error),
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(err: wgpu::SurfaceError) -> Self {
        FrameError::Surface(err)
    }
}

impl From<anyhow::Error> for FrameError {
    fn from(err: anyhow::Error) -> Self {
        FrameError::Fatal(err)
    }
}

/// Window title with the overlay caption appended while it is visible.
pub fn window_title(base: &str, overlay: &Overlay) -> String {
    match overlay.caption() {
        Some(caption) => format!("{base} | {caption}"),
        None => base.to_string(),
    }
}

/// Everything one window needs per frame: the GPU, the sequence it plays and
/// the assets the sequence waits on.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    sequencer: Sequencer,
    loader: AssetLoader,
    clock: FrameClock,
    base_title: String,
    title: String,
    vsync: bool,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let mut sequencer = Sequencer::new(&config.scene);
        let gpu = GpuState::new(
            window.as_ref(),
            window.inner_size(),
            window.scale_factor() as f32,
            config,
            &mut sequencer.scene_mut().particles,
        )?;

        let assets = &config.scene.assets;
        let mut loader = AssetLoader::new(assets.image.clone(), assets.model.clone(), CAPACITY);
        loader.request_all();

        Ok(Self {
            window,
            gpu,
            sequencer,
            loader,
            clock: FrameClock::system(),
            base_title: config.title.clone(),
            title: config.title.clone(),
            vsync: config.vsync,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn toggle_vsync(&mut self) {
        self.vsync = !self.vsync;
        self.gpu.set_vsync(self.vsync);
        info!(vsync = self.vsync, "toggled vsync");
    }

    /// Advances the sequence by the measured delta and draws the result.
    fn redraw(&mut self) -> Result<(), FrameError> {
        let dt = self.clock.tick();
        self.gpu.poll_simulator()?;

        let resources = Resources {
            image: self.loader.image(),
            model: self.loader.model(),
            simulation_ready: self.gpu.simulation_ready(),
        };
        self.sequencer
            .tick(dt, &resources)
            .context("sequence tick failed")?;

        let scene = self.sequencer.scene_mut();
        if let Some(seed) = scene.take_simulation_seed() {
            if !self.gpu.seed_simulation(&seed) {
                // try again next frame
                scene.request_simulation(seed);
            }
        }

        self.gpu.render(scene, dt)?;
        self.refresh_title();
        Ok(())
    }

    fn refresh_title(&mut self) {
        let title = window_title(&self.base_title, &self.sequencer.scene().overlay);
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

fn is_escape(event: &KeyEvent) -> bool {
    matches!(event.logical_key, Key::Named(NamedKey::Escape))
}

fn is_vsync_toggle(event: &KeyEvent) -> bool {
    matches!(&event.logical_key, Key::Character(value) if value.eq_ignore_ascii_case("v"))
}

/// Opens a window and plays the sequence until it is closed.
pub fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)
        .context("failed to initialise window renderer")?;
    info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        seed = config.scene.sequence.seed,
        "starting sequence"
    );
    state.window().request_redraw();

    let mut fatal: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        if is_escape(&event) {
                            elwt.exit();
                        } else if is_vsync_toggle(&event) {
                            state.toggle_vsync();
                        }
                    }
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::ScaleFactorChanged {
                    scale_factor,
                    mut inner_size_writer,
                } => {
                    state.gpu.set_scale_factor(scale_factor as f32);
                    let _ = inner_size_writer.request_inner_size(state.size());
                }
                WindowEvent::RedrawRequested => match state.redraw() {
                    Ok(()) => {}
                    Err(FrameError::Surface(surface_err)) => match surface_err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            debug!(error = ?surface_err, "reconfiguring surface");
                            state.gpu.reconfigure();
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            error!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        wgpu::SurfaceError::Timeout => {
                            warn!("surface timeout; retrying next frame");
                        }
                        other => {
                            warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    Err(FrameError::Fatal(err)) => {
                        error!(error = %err, "stopping sequence");
                        fatal = Some(err);
                        elwt.exit();
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    if let Some(err) = fatal {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
