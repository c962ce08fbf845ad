use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::debug;

use crate::particles::ParticleSet;
use crate::program::ProgramId;
use crate::simulation::SimulationSeed;
use crate::uniforms::UniformSet;
use crate::SequencerError;

/// Position and XYZ Euler rotation of an object.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.quat(), self.position)
    }

    pub fn reset(&mut self) {
        *self = Transform::default();
    }
}

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub transform: Transform,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform {
                position: Vec3::new(0.0, 0.0, 10.0),
                rotation: Vec3::ZERO,
            },
            fov_y_degrees: 45.0,
            near: 0.0001,
            far: 500.0,
        }
    }
}

impl Camera {
    /// Turns the camera to face `target`, keeping +Y up.
    pub fn look_at(&mut self, target: Vec3) {
        let eye = self.transform.position;
        if (target - eye).length_squared() <= f32::EPSILON {
            return;
        }
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let orientation = Quat::from_mat4(&view).inverse();
        let (x, y, z) = orientation.to_euler(EulerRot::XYZ);
        self.transform.rotation = Vec3::new(x, y, z);
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.quat() * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform.matrix().inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }
}

/// Text shown over the scene: the particle counter, its caption and the
/// closing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub count: f32,
    pub name: &'static str,
    pub opacity: f32,
    pub offset: f32,
    pub message_visible: bool,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            count: 1.0,
            name: "Particle",
            opacity: 0.0,
            offset: 100.0,
            message_visible: false,
        }
    }
}

impl Overlay {
    pub fn displayed_count(&self) -> u64 {
        self.count.max(0.0).floor() as u64
    }

    pub fn formatted_count(&self) -> String {
        format_thousands(self.displayed_count())
    }

    /// Caption for a window title, empty while the text is faded out.
    pub fn caption(&self) -> Option<String> {
        if self.message_visible {
            return Some("thanks for watching".to_string());
        }
        if self.opacity <= 0.01 {
            return None;
        }
        Some(format!("{} {}", self.formatted_count(), self.name))
    }
}

pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

/// Everything a stage may animate. The sequencer holds the only `&mut Scene`
/// during a tick; the renderer reads it between ticks.
pub struct Scene {
    pub particles: ParticleSet,
    pub group: Transform,
    pub camera: Camera,
    pub overlay: Overlay,
    pub time: f32,
    uniforms: UniformSet,
    pending_seed: Option<Arc<SimulationSeed>>,
}

impl Scene {
    pub fn new(particles: ParticleSet) -> Self {
        Self {
            particles,
            group: Transform::default(),
            camera: Camera::default(),
            overlay: Overlay::default(),
            time: 0.0,
            uniforms: UniformSet::for_program(ProgramId::Point),
            pending_seed: None,
        }
    }

    pub fn program(&self) -> ProgramId {
        self.uniforms.program()
    }

    /// Switches programs; uniforms are rebuilt from the new schema's defaults.
    pub fn install_program(&mut self, program: ProgramId) {
        debug!(%program, "installing shader program");
        self.uniforms = UniformSet::for_program(program);
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<f32> {
        self.uniforms.float(name)
    }

    pub fn set_uniform(&mut self, name: &str, value: f32) -> Result<(), SequencerError> {
        self.uniforms.set_float(name, value)
    }

    /// Hands initial textures to the GPU simulator.
    pub fn request_simulation(&mut self, seed: Arc<SimulationSeed>) {
        self.pending_seed = Some(seed);
    }

    pub fn take_simulation_seed(&mut self) -> Option<Arc<SimulationSeed>> {
        self.pending_seed.take()
    }
}
