//! Ping-pong gravity integrator on float textures.
//!
//! Positions and velocities each live in a front/back texture pair. A tick runs
//! the velocity pass (reads both fronts, writes the velocity back, swaps) and
//! then the position pass (reads the position front and the fresh velocity
//! front, writes the position back, swaps). The particle programs sample the
//! position front after the tick.

use anyhow::Result;
use sequencer::{GravityParams, PingPong, SimulationSeed};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::compile::{compile_fullscreen_vertex, compile_position_pass, compile_velocity_pass};

use super::uniforms::SimulationUniforms;

pub(crate) const SIMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const TEXEL_BYTES: u32 = 16;

pub(crate) struct SimulationTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl SimulationTarget {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SIMULATION_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    fn write(&self, queue: &wgpu::Queue, texels: &[[f32; 4]], width: u32, height: u32) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * TEXEL_BYTES),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Which buffers a pass reads, given each pair's front index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassInputs {
    pub positions: usize,
    pub velocities: usize,
}

/// Front indices read by the velocity and position passes of one tick, and the
/// fronts left behind for rendering.
pub(crate) fn tick_schedule(
    positions_front: usize,
    velocities_front: usize,
) -> (PassInputs, PassInputs, PassInputs) {
    let velocity_pass = PassInputs {
        positions: positions_front,
        velocities: velocities_front,
    };
    let position_pass = PassInputs {
        positions: positions_front,
        velocities: 1 - velocities_front,
    };
    let after = PassInputs {
        positions: 1 - positions_front,
        velocities: 1 - velocities_front,
    };
    (velocity_pass, position_pass, after)
}

pub(crate) struct GpuSimulator {
    width: u32,
    height: u32,
    params: GravityParams,
    positions: PingPong<SimulationTarget>,
    velocities: PingPong<SimulationTarget>,
    velocity_pipeline: wgpu::RenderPipeline,
    position_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    /// Indexed by `[positions front][velocities front]`.
    bind_groups: [[wgpu::BindGroup; 2]; 2],
    seeded: bool,
    ticks: u64,
}

impl GpuSimulator {
    pub fn new(
        device: &wgpu::Device,
        params: GravityParams,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let target = |label| SimulationTarget::new(device, label, width, height);
        let positions = PingPong::new(target("positions a"), target("positions b"));
        let velocities = PingPong::new(target("velocities a"), target("velocities b"));

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("simulation uniforms"),
            contents: bytemuck::bytes_of(&SimulationUniforms::new(&params, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("simulation sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("simulation layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let bind_group = |p: usize, v: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("simulation bind group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view_at(&positions, p)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(view_at(&velocities, v)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        };
        let bind_groups = [
            [bind_group(0, 0), bind_group(0, 1)],
            [bind_group(1, 0), bind_group(1, 1)],
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("simulation pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let vertex_module = compile_fullscreen_vertex(device)?;
        let pass_pipeline = |label: &str, fragment: &wgpu::ShaderModule| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some("main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: SIMULATION_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        };
        let velocity_pipeline = pass_pipeline("velocity pass", &compile_velocity_pass(device)?);
        let position_pipeline = pass_pipeline("position pass", &compile_position_pass(device)?);

        debug!(width, height, "simulation textures allocated");
        Ok(Self {
            width,
            height,
            params,
            positions,
            velocities,
            velocity_pipeline,
            position_pipeline,
            uniform_buffer,
            bind_groups,
            seeded: false,
            ticks: 0,
        })
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Uploads the initial textures into both fronts.
    pub fn seed(&mut self, queue: &wgpu::Queue, seed: &SimulationSeed) {
        let expected = (self.width * self.height) as usize;
        if (seed.width, seed.height) != (self.width, self.height)
            || seed.positions.len() != expected
            || seed.velocities.len() != expected
        {
            warn!(
                seed_width = seed.width,
                seed_height = seed.height,
                width = self.width,
                height = self.height,
                "simulation seed does not match the texture size; ignoring it"
            );
            return;
        }
        self.positions
            .front()
            .write(queue, &seed.positions, self.width, self.height);
        self.velocities
            .front()
            .write(queue, &seed.velocities, self.width, self.height);
        self.seeded = true;
        self.ticks = 0;
        debug!(texels = expected, "simulation seeded");
    }

    /// Encodes one integration tick; a no-op until seeded.
    pub fn step(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, dt: f32) {
        if !self.seeded {
            return;
        }
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&SimulationUniforms::new(&self.params, dt)),
        );

        let (velocity_inputs, position_inputs, _) =
            tick_schedule(self.positions.front_index(), self.velocities.front_index());

        let bind_group = &self.bind_groups[velocity_inputs.positions][velocity_inputs.velocities];
        encode_pass(
            encoder,
            "velocity pass",
            &self.velocity_pipeline,
            bind_group,
            &self.velocities.back().view,
        );
        self.velocities.swap();

        let bind_group = &self.bind_groups[position_inputs.positions][position_inputs.velocities];
        encode_pass(
            encoder,
            "position pass",
            &self.position_pipeline,
            bind_group,
            &self.positions.back().view,
        );
        self.positions.swap();
        self.ticks += 1;
    }

    /// Index of the position buffer the particle programs should sample.
    pub fn positions_front_index(&self) -> usize {
        self.positions.front_index()
    }

    /// Position views by buffer index, for prebuilt bind groups.
    pub fn position_views(&self) -> [&wgpu::TextureView; 2] {
        [view_at(&self.positions, 0), view_at(&self.positions, 1)]
    }
}

fn view_at(pair: &PingPong<SimulationTarget>, index: usize) -> &wgpu::TextureView {
    if pair.front_index() == index {
        &pair.front().view
    } else {
        &pair.back().view
    }
}

impl Drop for GpuSimulator {
    fn drop(&mut self) {
        debug!(ticks = self.ticks, "releasing simulation textures");
        for pair in [&self.positions, &self.velocities] {
            pair.front().texture.destroy();
            pair.back().texture.destroy();
        }
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}
