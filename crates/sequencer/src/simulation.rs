//! CPU mirror of the GPU ping-pong integrator, plus the disk seeding that
//! produces the simulator's initial textures.

use glam::Vec3;
use rand::Rng;
use sceneconfig::SimulationSettings;

use crate::particles::CAPACITY;

/// Simulation texture width; `SIM_WIDTH * SIM_HEIGHT == CAPACITY`.
pub const SIM_WIDTH: u32 = 1000;
pub const SIM_HEIGHT: u32 = 1000;

pub type Texel = [f32; 4];

/// Front/back pair: passes read the front and write the back, then swap.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    buffers: [T; 2],
    front: usize,
}

impl<T> PingPong<T> {
    pub fn new(front: T, back: T) -> Self {
        Self {
            buffers: [front, back],
            front: 0,
        }
    }

    pub fn front(&self) -> &T {
        &self.buffers[self.front]
    }

    pub fn back(&self) -> &T {
        &self.buffers[1 - self.front]
    }

    /// Front for reading and back for writing; never the same buffer.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [first, second] = &mut self.buffers;
        if self.front == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    pub fn front_index(&self) -> usize {
        self.front
    }

    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }
}

/// Constants of the attractor integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityParams {
    pub gravity: f32,
    pub particle_mass: f32,
    pub attractor_mass: f32,
    pub distance_floor: f32,
    pub distance_ceiling: f32,
}

impl Default for GravityParams {
    fn default() -> Self {
        Self::from(&SimulationSettings::default())
    }
}

impl From<&SimulationSettings> for GravityParams {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            gravity: settings.gravity,
            particle_mass: settings.particle_mass,
            attractor_mass: settings.attractor_mass,
            distance_floor: settings.distance_floor,
            distance_ceiling: settings.distance_ceiling,
        }
    }
}

impl GravityParams {
    /// Squared distance to the attractor, clamped into the configured range.
    pub fn clamped_distance_squared(&self, displacement: Vec3) -> f32 {
        displacement
            .length_squared()
            .clamp(self.distance_floor, self.distance_ceiling)
    }

    pub fn acceleration(&self, position: Vec3) -> Vec3 {
        let displacement = Vec3::ZERO - position;
        let distance_squared = self.clamped_distance_squared(displacement);
        let force = self.gravity
            * displacement.normalize_or_zero()
            * (self.attractor_mass * self.particle_mass)
            / distance_squared;
        force / self.particle_mass
    }
}

/// Velocity pass for one texel.
pub fn velocity_texel(params: &GravityParams, position: Texel, velocity: Texel, dt: f32) -> Texel {
    let position = Vec3::from_slice(&position[..3]);
    let velocity = Vec3::from_slice(&velocity[..3]) + params.acceleration(position) * dt;
    [velocity.x, velocity.y, velocity.z, 1.0]
}

/// Position pass for one texel, reading the freshly written velocity.
pub fn position_texel(position: Texel, velocity: Texel, dt: f32) -> Texel {
    let position = Vec3::from_slice(&position[..3]) + Vec3::from_slice(&velocity[..3]) * dt;
    [position.x, position.y, position.z, 1.0]
}

/// Initial simulator contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSeed {
    pub width: u32,
    pub height: u32,
    pub positions: Vec<Texel>,
    pub velocities: Vec<Texel>,
}

/// Folds `u` in `[0, 2]` into `[0, 1]` as a triangle wave.
pub fn tri(u: f32) -> f32 {
    if u > 1.0 {
        2.0 - u
    } else {
        u
    }
}

/// Radius whose density grows towards the rim, keeping the disk centre sparse.
pub fn stratified_radius(rng: &mut impl Rng, radius: f32) -> f32 {
    let u = rng.gen::<f32>() + rng.gen::<f32>();
    radius * tri(u)
}

/// Scatters `width * height` particles over a flat disk with a gentle
/// counter-clockwise push.
pub fn seed_disk(
    width: u32,
    height: u32,
    radius: f32,
    speed: f32,
    rng: &mut impl Rng,
) -> SimulationSeed {
    let count = width as usize * height as usize;
    let mut positions = Vec::with_capacity(count);
    let mut velocities = Vec::with_capacity(count);
    for _ in 0..count {
        let r = stratified_radius(rng, radius);
        let x = (rng.gen::<f32>() - 0.5) * r;
        let y = (rng.gen::<f32>() - 0.5) * r;
        positions.push([x, y, 0.0, 0.0]);

        let radial = Vec3::new(x, y, 0.0).normalize_or_zero();
        let tangent = Vec3::new(-radial.y, radial.x, 0.0) * speed;
        velocities.push([tangent.x, tangent.y, 0.0, 0.0]);
    }
    SimulationSeed {
        width,
        height,
        positions,
        velocities,
    }
}

pub fn seed_full_disk(settings: &SimulationSettings, rng: &mut impl Rng) -> SimulationSeed {
    debug_assert_eq!((SIM_WIDTH * SIM_HEIGHT) as usize, CAPACITY);
    seed_disk(
        SIM_WIDTH,
        SIM_HEIGHT,
        settings.seed_radius,
        settings.seed_speed,
        rng,
    )
}

/// Reference integrator over ping-ponged texel arrays.
pub struct CpuSimulator {
    params: GravityParams,
    positions: PingPong<Vec<Texel>>,
    velocities: PingPong<Vec<Texel>>,
}

impl CpuSimulator {
    pub fn new(params: GravityParams, seed: &SimulationSeed) -> Self {
        let len = seed.positions.len();
        Self {
            params,
            positions: PingPong::new(seed.positions.clone(), vec![[0.0; 4]; len]),
            velocities: PingPong::new(seed.velocities.clone(), vec![[0.0; 4]; len]),
        }
    }

    pub fn positions(&self) -> &[Texel] {
        self.positions.front()
    }

    pub fn velocities(&self) -> &[Texel] {
        self.velocities.front()
    }

    pub fn front_indices(&self) -> (usize, usize) {
        (self.positions.front_index(), self.velocities.front_index())
    }

    /// Velocity pass, swap, position pass, swap.
    pub fn step(&mut self, dt: f32) {
        let params = self.params;
        {
            let positions = self.positions.front();
            let (read, write) = self.velocities.split();
            for ((out, velocity), position) in write.iter_mut().zip(read.iter()).zip(positions) {
                *out = velocity_texel(&params, *position, *velocity, dt);
            }
        }
        self.velocities.swap();

        {
            let velocities = self.velocities.front();
            let (read, write) = self.positions.split();
            for ((out, position), velocity) in write.iter_mut().zip(read.iter()).zip(velocities) {
                *out = position_texel(*position, *velocity, dt);
            }
        }
        self.positions.swap();
    }
}
