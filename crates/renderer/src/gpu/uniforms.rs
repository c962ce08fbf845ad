use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use sequencer::{GravityParams, Scene, MAX_FLOAT_UNIFORMS};

/// std140 mirror of the particle prelude's `ParticleParams` block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ParticleUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Surface width, height, scene time, device scale.
    pub viewport: [f32; 4],
    pub params: [[f32; 4]; MAX_FLOAT_UNIFORMS / 4],
}

unsafe impl Zeroable for ParticleUniforms {}
unsafe impl Pod for ParticleUniforms {}

impl ParticleUniforms {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            viewport: [width.max(1) as f32, height.max(1) as f32, 0.0, scale],
            params: [[0.0; 4]; MAX_FLOAT_UNIFORMS / 4],
        }
    }

    pub fn set_surface(&mut self, width: u32, height: u32, scale: f32) {
        self.viewport[0] = width.max(1) as f32;
        self.viewport[1] = height.max(1) as f32;
        self.viewport[3] = scale;
    }

    /// Pulls matrices, time and the installed program's float uniforms from
    /// the scene.
    pub fn update_from_scene(&mut self, scene: &Scene) {
        let aspect = self.viewport[0] / self.viewport[1];
        self.projection = scene.camera.projection_matrix(aspect).to_cols_array_2d();
        self.view = scene.camera.view_matrix().to_cols_array_2d();
        self.model = scene.group.matrix().to_cols_array_2d();
        self.viewport[2] = scene.time;

        let packed = scene.uniforms().pack_floats();
        for (slot, chunk) in self.params.iter_mut().zip(packed.chunks_exact(4)) {
            slot.copy_from_slice(chunk);
        }
    }
}

/// std140 mirror of the simulation passes' `SimulationParams` block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SimulationUniforms {
    pub gravity: f32,
    pub particle_mass: f32,
    pub attractor_mass: f32,
    pub dt: f32,
    pub distance_floor: f32,
    pub distance_ceiling: f32,
    pub padding: [f32; 2],
}

unsafe impl Zeroable for SimulationUniforms {}
unsafe impl Pod for SimulationUniforms {}

impl SimulationUniforms {
    pub fn new(params: &GravityParams, dt: f32) -> Self {
        Self {
            gravity: params.gravity,
            particle_mass: params.particle_mass,
            attractor_mass: params.attractor_mass,
            dt,
            distance_floor: params.distance_floor,
            distance_ceiling: params.distance_ceiling,
            padding: [0.0; 2],
        }
    }
}
