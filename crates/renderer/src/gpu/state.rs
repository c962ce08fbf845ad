use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use sequencer::{GravityParams, ParticleSet, ProgramId, Scene, SimulationSeed, SIM_HEIGHT, SIM_WIDTH};
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::types::RendererConfig;

use super::context::GpuContext;
use super::particles::ParticleBuffers;
use super::pipeline::{ParticlePipeline, PipelineLayouts};
use super::simulation::{GpuSimulator, SIMULATION_FORMAT};
use super::uniforms::ParticleUniforms;

/// Quad corners per particle instance.
const VERTICES_PER_PARTICLE: u32 = 6;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Simulator built on a worker thread so its programs compile off the
/// redraw path.
enum SimulatorFuture {
    Threaded {
        receiver: Receiver<Result<GpuSimulator>>,
        started: Instant,
    },
    Ready,
}

impl SimulatorFuture {
    fn spawn(device: wgpu::Device, params: GravityParams) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = GpuSimulator::new(&device, params, SIM_WIDTH, SIM_HEIGHT);
            let _ = sender.send(result);
        });
        SimulatorFuture::Threaded {
            receiver,
            started: Instant::now(),
        }
    }

    fn poll(&mut self) -> Result<Option<GpuSimulator>> {
        let SimulatorFuture::Threaded { receiver, started } = self else {
            return Ok(None);
        };
        match receiver.try_recv() {
            Ok(result) => {
                let simulator = result?;
                debug!(
                    elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "simulator built"
                );
                *self = SimulatorFuture::Ready;
                Ok(Some(simulator))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(anyhow!(
                "simulator build worker disconnected before returning a result"
            )),
        }
    }
}

/// Where the particle programs read `uPositionsTexture` from.
enum PositionSource {
    /// 1x1 stand-in bound until the simulator exists.
    Placeholder {
        _texture: wgpu::Texture,
        bind_group: wgpu::BindGroup,
    },
    /// One bind group per position front index.
    Simulation {
        simulator: Box<GpuSimulator>,
        bind_groups: [wgpu::BindGroup; 2],
    },
}

/// Frame counter that reports a rate about once a second.
#[derive(Debug)]
pub(crate) struct FrameStats {
    window_start: Instant,
    frames: u32,
    total_frames: u64,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            total_frames: 0,
        }
    }

    /// Counts a frame; returns the rate once a full second has elapsed.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        self.total_frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipelines: HashMap<ProgramId, ParticlePipeline>,
    particles: ParticleBuffers,
    uniforms: ParticleUniforms,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    positions: PositionSource,
    simulator_future: SimulatorFuture,
    multisample_target: Option<MultisampleTarget>,
    clear_color: wgpu::Color,
    stats: FrameStats,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        scale_factor: f32,
        config: &RendererConfig,
        particles: &mut ParticleSet,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, config.antialiasing, config.vsync)?;
        let device = &context.device;
        let layouts = PipelineLayouts::new(device);

        let started = Instant::now();
        let mut pipelines = HashMap::new();
        for id in ProgramId::ALL {
            let pipeline = ParticlePipeline::new(
                device,
                &layouts,
                id.program(),
                context.surface_format,
                context.sample_count,
            )?;
            pipelines.insert(pipeline.id, pipeline);
        }
        debug!(
            programs = pipelines.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "particle programs compiled"
        );

        let particle_buffers = ParticleBuffers::new(device, particles);
        let uniforms = ParticleUniforms::new(context.size.width, context.size.height, scale_factor);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("positions sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let placeholder = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("positions placeholder"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SIMULATION_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = particle_bind_group(
            device,
            &layouts.uniform_layout,
            &uniform_buffer,
            &placeholder_view,
            &sampler,
        );

        let simulator_future =
            SimulatorFuture::spawn(device.clone(), GravityParams::from(&config.scene.simulation));

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        info!(
            width = context.size.width,
            height = context.size.height,
            sample_count = context.sample_count,
            format = ?context.surface_format,
            "renderer ready"
        );

        Ok(Self {
            clear_color: config.clear_color(),
            layouts,
            pipelines,
            particles: particle_buffers,
            uniforms,
            uniform_buffer,
            sampler,
            positions: PositionSource::Placeholder {
                _texture: placeholder,
                bind_group,
            },
            simulator_future,
            multisample_target,
            stats: FrameStats::new(Instant::now()),
            context,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.uniforms
            .set_surface(new_size.width, new_size.height, self.uniforms.viewport[3]);
        if self.context.sample_count > 1 {
            self.multisample_target = Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                new_size,
                self.context.sample_count,
            ));
        }
    }

    pub(crate) fn set_scale_factor(&mut self, scale: f32) {
        let size = self.context.size;
        self.uniforms.set_surface(size.width, size.height, scale);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn set_vsync(&mut self, enabled: bool) {
        self.context.set_vsync(enabled);
    }

    /// Adopts the simulator once its worker finishes. Build failures are fatal.
    pub(crate) fn poll_simulator(&mut self) -> Result<()> {
        let Some(simulator) = self.simulator_future.poll()? else {
            return Ok(());
        };
        let device = &self.context.device;
        let [first, second] = simulator.position_views().map(|view| {
            particle_bind_group(
                device,
                &self.layouts.uniform_layout,
                &self.uniform_buffer,
                view,
                &self.sampler,
            )
        });
        self.positions = PositionSource::Simulation {
            simulator: Box::new(simulator),
            bind_groups: [first, second],
        };
        Ok(())
    }

    pub(crate) fn simulation_ready(&self) -> bool {
        matches!(self.positions, PositionSource::Simulation { .. })
    }

    /// Uploads the initial simulation textures. Returns false while the
    /// simulator is still being built.
    pub(crate) fn seed_simulation(&mut self, seed: &SimulationSeed) -> bool {
        match &mut self.positions {
            PositionSource::Simulation { simulator, .. } => {
                simulator.seed(&self.context.queue, seed);
                true
            }
            PositionSource::Placeholder { .. } => false,
        }
    }

    /// Steps the simulator, uploads changed particles and draws the scene's
    /// draw range with its installed program.
    pub(crate) fn render(&mut self, scene: &mut Scene, dt: f32) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let queue = &self.context.queue;
        let uploaded = self.particles.upload(queue, &mut scene.particles);
        if uploaded > 0 {
            tracing::trace!(bytes = uploaded, "particle attributes uploaded");
        }
        self.uniforms.update_from_scene(scene);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        let bind_group = match &mut self.positions {
            PositionSource::Placeholder { bind_group, .. } => &*bind_group,
            PositionSource::Simulation {
                simulator,
                bind_groups,
            } => {
                simulator.step(queue, &mut encoder, dt);
                &bind_groups[simulator.positions_front_index()]
            }
        };

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("particle pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let draw_count = scene.particles.draw_count() as u32;
            if let Some(pipeline) = self.pipelines.get(&scene.program()) {
                if draw_count > 0 {
                    pass.set_pipeline(&pipeline.pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    self.particles.bind(&mut pass);
                    pass.draw(0..VERTICES_PER_PARTICLE, 0..draw_count);
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                frame_count = self.stats.total_frames,
                time = scene.time,
                program = %scene.program(),
                draw_count = scene.particles.draw_count(),
                "render stats"
            );
        }
        Ok(())
    }
}

fn particle_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    positions: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("particle bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(positions),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
