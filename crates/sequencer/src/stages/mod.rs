//! Per-stage setup and choreography.

mod face;
mod galaxy;
mod image;
mod lattice;
mod point;
mod spinning_top;

use std::sync::Arc;
use std::time::Duration;

use assets::{ImageData, ModelData};
use choreography::{Property, Timeline};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use sceneconfig::SceneConfig;
use tracing::warn;

use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

pub use face::FaceScript;
pub use galaxy::GalaxyScript;
pub use image::ImageScript;
pub use lattice::LatticeScript;
pub use point::PointScript;
pub use spinning_top::SpinningTopScript;

/// Prerequisites produced outside the sequencer, sampled every tick.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub image: Option<Arc<ImageData>>,
    pub model: Option<Arc<ModelData>>,
    /// The GPU simulator has its programs and can accept a seed.
    pub simulation_ready: bool,
}

/// When a stage hands over to the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitRule {
    /// As soon as timeline progress reaches the fraction.
    Progress(f32),
    /// After the timeline completes, plus a wait.
    CompleteThenWait(Duration),
    /// Never; the last stage plays out.
    Terminal,
}

pub trait StageScript {
    fn stage(&self) -> Stage;

    /// Starts or polls background work the stage waits on. Runs every tick
    /// while the stage is pending, before the readiness check.
    fn prepare(&mut self, _rng: &mut StdRng) {}

    fn is_ready(&self, _resources: &Resources) -> bool {
        true
    }

    /// Installs the stage into the scene and builds its timeline. Runs once,
    /// on the first tick [`is_ready`](Self::is_ready) holds.
    fn setup(
        &mut self,
        scene: &mut Scene,
        resources: &Resources,
        rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError>;

    fn exit(&self) -> ExitRule;

    /// Per-frame work outside the timeline, run before it advances.
    fn frame(&mut self, _scene: &mut Scene, _dt: f32, _rng: &mut StdRng) {}
}

pub fn script_for(stage: Stage, config: &SceneConfig) -> Box<dyn StageScript> {
    match stage {
        Stage::Point => Box::new(PointScript::new(config.sequence.point_exit_delay)),
        Stage::LinePlaneCube => Box::new(LatticeScript),
        Stage::SphereSpinningTop => Box::new(SpinningTopScript),
        Stage::Image => Box::new(ImageScript),
        Stage::Face => Box::new(FaceScript::default()),
        Stage::Galaxy => Box::new(GalaxyScript::new(
            config.simulation.clone(),
            config.sequence.message_delay,
        )),
    }
}

pub(crate) const X: [bool; 3] = [true, false, false];
pub(crate) const Y: [bool; 3] = [false, true, false];
pub(crate) const Z: [bool; 3] = [false, false, true];
pub(crate) const XY: [bool; 3] = [true, true, false];
pub(crate) const YZ: [bool; 3] = [false, true, true];
pub(crate) const XYZ: [bool; 3] = [true, true, true];

/// Scene vectors a timeline may animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Vector {
    GroupPosition,
    GroupRotation,
    CameraPosition,
    CameraRotation,
}

impl Vector {
    fn get(self, scene: &Scene) -> Vec3 {
        match self {
            Vector::GroupPosition => scene.group.position,
            Vector::GroupRotation => scene.group.rotation,
            Vector::CameraPosition => scene.camera.transform.position,
            Vector::CameraRotation => scene.camera.transform.rotation,
        }
    }

    fn get_mut(self, scene: &mut Scene) -> &mut Vec3 {
        match self {
            Vector::GroupPosition => &mut scene.group.position,
            Vector::GroupRotation => &mut scene.group.rotation,
            Vector::CameraPosition => &mut scene.camera.transform.position,
            Vector::CameraRotation => &mut scene.camera.transform.rotation,
        }
    }
}

/// A vector property that only writes the masked components; the others keep
/// whatever value they hold when the write happens.
pub(crate) fn axes(vector: Vector, mask: [bool; 3]) -> Property<Scene, Vec3> {
    Property::new(
        move |scene: &Scene| vector.get(scene),
        move |scene: &mut Scene, value: Vec3| {
            let slot = vector.get_mut(scene);
            for (axis, enabled) in mask.into_iter().enumerate() {
                if enabled {
                    slot[axis] = value[axis];
                }
            }
        },
    )
}

pub(crate) fn uniform(name: &'static str) -> Property<Scene, f32> {
    Property::new(
        move |scene: &Scene| scene.uniform(name).unwrap_or_default(),
        move |scene: &mut Scene, value: f32| {
            if let Err(err) = scene.set_uniform(name, value) {
                warn!(%err, "dropping uniform write");
            }
        },
    )
}

pub(crate) fn overlay_count() -> Property<Scene, f32> {
    Property::new(
        |scene: &Scene| scene.overlay.count,
        |scene: &mut Scene, value: f32| scene.overlay.count = value,
    )
}

/// Overlay text as `(offset, opacity)`.
pub(crate) fn overlay_text() -> Property<Scene, Vec2> {
    Property::new(
        |scene: &Scene| Vec2::new(scene.overlay.offset, scene.overlay.opacity),
        |scene: &mut Scene, value: Vec2| {
            scene.overlay.offset = value.x;
            scene.overlay.opacity = value.y;
        },
    )
}

pub(crate) fn overlay_opacity() -> Property<Scene, f32> {
    Property::new(
        |scene: &Scene| scene.overlay.opacity,
        |scene: &mut Scene, value: f32| scene.overlay.opacity = value,
    )
}

/// Draw count change issued from inside a timeline, where there is no caller
/// to hand an error back to.
pub(crate) fn set_draw_count_logged(scene: &mut Scene, count: usize) {
    if let Err(err) = scene.particles.set_draw_count(count) {
        warn!(%err, "keeping previous draw range");
    }
}

pub(crate) fn look_at_origin(scene: &mut Scene) {
    scene.camera.look_at(Vec3::ZERO);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::particles::ParticleSet;
    use rand::SeedableRng;

    pub fn scene() -> Scene {
        Scene::new(ParticleSet::default())
    }

    pub fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    pub fn image(width: u32, height: u32) -> Arc<ImageData> {
        let rgba = (0..width * height)
            .flat_map(|i| [(i * 20 % 256) as u8, 128, 255, 255])
            .collect();
        Arc::new(ImageData {
            width,
            height,
            rgba,
        })
    }

    pub fn model() -> Arc<ModelData> {
        Arc::new(ModelData {
            positions: vec![[-1.0, -2.0, 0.0], [1.0, 2.0, 0.5], [0.0, 0.0, 1.0]],
            colors: vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        })
    }

    pub fn ready() -> Resources {
        Resources {
            image: Some(image(4, 3)),
            model: Some(model()),
            simulation_ready: true,
        }
    }

    /// Plays a timeline to the end in fixed steps.
    pub fn play(timeline: &mut Timeline<Scene>, scene: &mut Scene) {
        let step = 1.0 / 30.0;
        let mut guard = 0;
        while !timeline.is_complete() && guard < 10_000 {
            timeline.advance(scene, step);
            guard += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_axes_leave_other_components_alone() {
        let mut scene = test_support::scene();
        scene.group.rotation = Vec3::new(1.0, 2.0, 3.0);
        let mut timeline = Timeline::new(choreography::Ease::Linear);
        timeline.add(
            choreography::Timing::new(1.0),
            choreography::Tween::to(axes(Vector::GroupRotation, Y), Vec3::new(9.0, -1.0, 9.0)),
        );
        timeline.advance(&mut scene, 0.5);
        assert_eq!(scene.group.rotation, Vec3::new(1.0, 0.5, 3.0));
        timeline.advance(&mut scene, 0.5);
        assert_eq!(scene.group.rotation, Vec3::new(1.0, -1.0, 3.0));
    }

    #[test]
    fn every_script_reports_its_own_stage() {
        let config = SceneConfig::default();
        for stage in Stage::ALL {
            assert_eq!(script_for(stage, &config).stage(), stage);
        }
    }
}
