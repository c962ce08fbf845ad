use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use assets::AssetSlot;
use choreography::{Ease, Placement, Timeline, Timing, Tween};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sceneconfig::SimulationSettings;
use tracing::info;

use super::{
    axes, overlay_count, overlay_opacity, ExitRule, Resources, StageScript, Vector, Z,
};
use crate::particles::{Attribute, CAPACITY};
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::simulation::{seed_full_disk, SimulationSeed, SIM_HEIGHT, SIM_WIDTH};
use crate::stage::Stage;
use crate::SequencerError;

/// Hands the particles to the GPU integrator and flies through the result.
pub struct GalaxyScript {
    simulation: SimulationSettings,
    message_delay: Duration,
    /// The million-particle disk, scattered on a worker thread.
    seed_build: AssetSlot<SimulationSeed>,
    seed: Option<Arc<SimulationSeed>>,
}

impl GalaxyScript {
    pub fn new(simulation: SimulationSettings, message_delay: Duration) -> Self {
        Self {
            simulation,
            message_delay,
            seed_build: AssetSlot::default(),
            seed: None,
        }
    }
}

/// Texel-centre coordinates of particle `index` in the simulation textures.
pub(crate) fn texel_uv(index: usize, width: u32, height: u32) -> [f32; 3] {
    let (w, h) = (width as usize, height as usize);
    [
        ((index % w) as f32 + 0.5) / w as f32,
        ((index / w) as f32 + 0.5) / h as f32,
        0.0,
    ]
}

impl StageScript for GalaxyScript {
    fn stage(&self) -> Stage {
        Stage::Galaxy
    }

    fn prepare(&mut self, rng: &mut StdRng) {
        if matches!(self.seed_build, AssetSlot::Idle) {
            // drawn here so the disk follows the sequence seed
            let disk_seed = rng.gen::<u64>();
            let settings = self.simulation.clone();
            self.seed_build.request("simulation-seed", move || {
                let mut rng = StdRng::seed_from_u64(disk_seed);
                Ok(seed_full_disk(&settings, &mut rng))
            });
        }
        if self.seed.is_none() {
            self.seed = self.seed_build.poll();
        }
    }

    fn is_ready(&self, resources: &Resources) -> bool {
        resources.simulation_ready && self.seed.is_some()
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        _resources: &Resources,
        _rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        scene.particles.set_draw_count(CAPACITY)?;
        scene.install_program(ProgramId::Galaxy);

        let positions = scene.particles.attribute_mut(Attribute::Position, 0..CAPACITY);
        for (index, uv) in positions.chunks_exact_mut(3).enumerate() {
            uv.copy_from_slice(&texel_uv(index, SIM_WIDTH, SIM_HEIGHT));
        }
        scene
            .particles
            .attribute_mut(Attribute::Velocity, 0..CAPACITY)
            .fill(0.0);
        if let Some(seed) = self.seed.take() {
            scene.request_simulation(seed);
        }

        scene.group.reset();
        scene.camera.transform.rotation = Vec3::ZERO;
        scene.camera.transform.position = Vec3::new(0.0, 0.0, -2.0);
        scene.overlay.count = 250_000.0;

        let mut timeline = Timeline::new(Ease::Power1InOut);
        timeline.add(Timing::new(3.0), Tween::to(overlay_count(), CAPACITY as f32));
        timeline.add(
            Timing::new(4.0).with_previous().ease(Ease::Linear),
            Tween::to(axes(Vector::CameraPosition, Z), Vec3::new(0.0, 0.0, 380.0)),
        );
        timeline.add(
            Timing::new(5.0).ease(Ease::Linear),
            Tween::to(axes(Vector::CameraPosition, Z), Vec3::ZERO),
        );
        timeline.add(
            Timing::new(15.0).with_previous().ease(Ease::Linear),
            Tween::to(axes(Vector::CameraRotation, Z), Vec3::new(0.0, 0.0, -TAU)),
        );
        let fade_start = timeline.add(
            Timing::new(1.5).after_previous_start(3.0),
            Tween::to(overlay_opacity(), 0.0),
        );
        let message_at = fade_start + 1.5 + self.message_delay.as_secs_f32();
        timeline.call(Placement::At(message_at), |scene: &mut Scene| {
            info!("sequence finished");
            scene.overlay.message_visible = true;
        });
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::Terminal
    }
}
