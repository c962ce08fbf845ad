use assets::ModelData;
use choreography::{Ease, Timeline, Timing, Tween};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use super::{
    axes, look_at_origin, overlay_count, uniform, ExitRule, Resources, StageScript, Vector, X,
    XYZ, Y, YZ,
};
use crate::particles::Attribute;
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

const COUNT: usize = 250_000;
const MOUTH: Vec3 = Vec3::new(0.0, -0.232, 0.24);
const REACH_DISTANCE: f32 = 0.01;
const PULL: f32 = 0.5;
const BLOW_LERP: f32 = 0.001;
const BLOW_CURL: f32 = 2.5;
const CURL_LERP: f32 = 0.0025;
const RESTING_CURL: f32 = 0.1;

/// A head model that breathes its particles out through the mouth.
#[derive(Default)]
pub struct FaceScript {
    reached: Vec<bool>,
    targets: Vec<Vec3>,
    /// Slots outside the head, shuffled; each particle reaching the mouth
    /// recruits the next one still waiting.
    recruits: Vec<usize>,
}

/// Fits the model into a unit box: y and z span `[-0.5, 0.5]` scaled by the
/// longest side, x is centred by the x/y aspect.
pub(crate) fn normalize_model(model: &ModelData) -> Vec<Vec3> {
    let points: Vec<Vec3> = model.positions.iter().map(|p| Vec3::from_array(*p)).collect();
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
    let extent = max - min;
    let longest = extent.max_element();
    let scale = if longest > 0.0 { longest } else { 1.0 };
    let aspect = if extent.y > 0.0 { extent.x / extent.y } else { 1.0 };
    points
        .iter()
        .map(|p| {
            let unit = (*p - min) / scale;
            Vec3::new(unit.x - 0.5 * aspect, unit.y - 0.5, unit.z - 0.5)
        })
        .collect()
}

fn blow_target(index: usize, rng: &mut StdRng) -> Vec3 {
    let i = index as f32;
    Vec3::new(
        (rng.gen::<f32>() - 0.5) * 5.0,
        MOUTH.y * 2.5 + i.cos() * 7.0,
        MOUTH.z * 2.5 + 12.0 + i.sin() * 4.0,
    )
}

impl FaceScript {
    fn recruit(&mut self) {
        while let Some(index) = self.recruits.pop() {
            if !self.reached[index] {
                self.reached[index] = true;
                return;
            }
        }
    }
}

impl StageScript for FaceScript {
    fn stage(&self) -> Stage {
        Stage::Face
    }

    fn is_ready(&self, resources: &Resources) -> bool {
        resources.model.is_some()
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        resources: &Resources,
        rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        let Some(model) = resources.model.as_deref() else {
            return Ok(Timeline::new(Ease::Power1InOut));
        };
        scene.particles.set_draw_count(COUNT)?;
        scene.install_program(ProgramId::Face);

        let mut head = normalize_model(model);
        if head.len() > COUNT {
            warn!(
                vertices = head.len(),
                kept = COUNT,
                "model has more vertices than face particles"
            );
            head.truncate(COUNT);
        }
        let head_count = head.len();
        debug!(head_count, "placing face particles");

        let slices = scene.particles.split_mut(0..COUNT);
        for (i, position) in slices.positions.chunks_exact_mut(3).enumerate() {
            head.get(i).copied().unwrap_or(MOUTH).write_to_slice(position);
        }
        for (color, source) in slices.colors.chunks_exact_mut(3).zip(&model.colors) {
            color.copy_from_slice(source);
        }
        slices.velocities.fill(0.0);
        slices.curls.fill(RESTING_CURL);

        self.reached = vec![false; COUNT];
        self.targets = (0..COUNT).map(|i| blow_target(i, rng)).collect();
        self.recruits = (head_count..COUNT).collect();
        self.recruits.shuffle(rng);

        scene.group.reset();
        scene.camera.transform.position = Vec3::new(0.0, 0.0, 13.0);
        look_at_origin(scene);
        scene.overlay.count = 50_000.0;

        let mut timeline = Timeline::new(Ease::Power1InOut);
        timeline.add(Timing::new(6.0), Tween::to(uniform("uProgressZ"), 2.0));
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(overlay_count(), COUNT as f32),
        );
        timeline.add(
            Timing::new(10.0).with_previous(),
            Tween::to(axes(Vector::CameraPosition, YZ), Vec3::new(0.0, -0.2, 4.0)),
        );

        let rotations = [
            (Y, -0.6, 1.1, Some(0.9)),
            (X, -0.5, 1.1, Some(0.2)),
            (Y, 0.2, 1.1, Some(0.9)),
            (X, 0.3, 1.2, Some(0.2)),
            (X, -0.56, 2.2, Some(0.9)),
            (Y, 0.64, 3.0, None),
        ];
        for (mask, angle, duration, delta) in rotations {
            let timing = match delta {
                Some(delta) => Timing::new(duration).after_previous_start(delta),
                None => Timing::new(duration).with_previous(),
            };
            let target = Vec3::from_array(mask.map(|on| if on { angle } else { 0.0 }));
            timeline.add(timing, Tween::to(axes(Vector::GroupRotation, mask), target));
        }
        timeline.add(
            Timing::new(8.0).with_previous(),
            Tween::to(axes(Vector::GroupRotation, YZ), Vec3::new(0.0, 1.0, 0.85)),
        );

        timeline.add(
            Timing::new(5.0).with_previous(),
            Tween::to(uniform("uBlow"), 1.0),
        );
        timeline.add(
            Timing::new(7.0).after_previous_start(1.0),
            Tween::to(axes(Vector::CameraPosition, XYZ), Vec3::new(6.0, 1.0, 2.0)),
        );
        timeline.add(
            Timing::new(2.0).after_previous_start(2.5),
            Tween::to(uniform("uAlpha"), 0.0),
        );
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::Progress(0.75)
    }

    fn frame(&mut self, scene: &mut Scene, dt: f32, rng: &mut StdRng) {
        let blow = scene.uniform("uBlow").unwrap_or_default();
        if blow <= 0.0 || self.reached.is_empty() {
            return;
        }
        let count = self.reached.len().min(scene.particles.capacity());
        let slices = scene.particles.split_mut(0..count);

        for i in 0..count {
            let span = i * 3..i * 3 + 3;
            let position = Vec3::from_slice(&slices.positions[span.clone()]);

            if self.reached[i] {
                position
                    .lerp(self.targets[i], BLOW_LERP)
                    .write_to_slice(&mut slices.positions[span]);
                slices.curls[i] += (BLOW_CURL - slices.curls[i]) * CURL_LERP;
                continue;
            }

            // particles in front of the blow front stay put
            if position.z + 0.5 > blow {
                continue;
            }

            let to_mouth = MOUTH - position;
            if to_mouth.length() < REACH_DISTANCE {
                self.reached[i] = true;
                self.recruit();
                if rng.gen::<f32>() > 0.95 {
                    let tint = if rng.gen::<f32>() > 0.5 { Vec3::X } else { Vec3::Z };
                    tint.write_to_slice(&mut slices.colors[span]);
                }
                continue;
            }

            let acceleration = to_mouth.normalize() * PULL / to_mouth.length_squared().max(0.5);
            let velocity = Vec3::from_slice(&slices.velocities[span.clone()]) + acceleration * dt;
            velocity.write_to_slice(&mut slices.velocities[span.clone()]);
            (position + velocity * dt).write_to_slice(&mut slices.positions[span]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::{model, ready, rng, scene};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn model_is_normalized_by_its_bounding_box() {
        let points = normalize_model(&model());
        assert!(close(points[0], Vec3::new(-0.25, -0.5, -0.5)));
        assert!(close(points[1], Vec3::new(0.25, 0.5, -0.375)));
        assert!(close(points[2], Vec3::new(0.0, 0.0, -0.25)));
    }

    #[test]
    fn empty_model_normalizes_to_nothing() {
        let empty = ModelData {
            positions: Vec::new(),
            colors: Vec::new(),
        };
        assert!(normalize_model(&empty).is_empty());
    }

    #[test]
    fn unused_slots_wait_at_the_mouth() {
        let mut scene = scene();
        let mut script = FaceScript::default();
        let timeline = script.setup(&mut scene, &ready(), &mut rng()).unwrap();
        assert_eq!(scene.particles.draw_count(), COUNT);
        assert_eq!(scene.particles.color(1), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(scene.particles.position(3), MOUTH);
        assert_eq!(scene.particles.position(COUNT - 1), MOUTH);
        assert_eq!(scene.particles.curl(COUNT - 1), RESTING_CURL);
        assert_eq!(script.recruits.len(), COUNT - 3);
        assert!((timeline.total_duration() - 11.1).abs() < 1e-3);
        assert!(close(scene.camera.forward(), Vec3::NEG_Z));
    }

    #[test]
    fn blow_pulls_particles_to_the_mouth_and_sends_them_out() {
        let mut scene = scene();
        let mut rng = rng();
        let mut script = FaceScript::default();
        script.setup(&mut scene, &ready(), &mut rng).unwrap();

        // nothing moves before the blow starts
        let before = scene.particles.position(0);
        script.frame(&mut scene, 1.0 / 60.0, &mut rng);
        assert_eq!(scene.particles.position(0), before);

        scene.set_uniform("uBlow", 1.0).unwrap();
        scene.particles.set_position(0, MOUTH + Vec3::new(0.005, 0.0, 0.0));
        scene.particles.set_position(1, Vec3::new(0.0, -0.232, -0.4));
        // beyond the blow front
        scene.particles.set_position(2, Vec3::new(0.0, 0.0, 0.9));

        let waiting = script.recruits.len();
        script.frame(&mut scene, 1.0 / 60.0, &mut rng);
        assert!(script.reached[0]);
        assert!(script.recruits.len() < waiting);
        assert!(scene.particles.velocity(1).z > 0.0);
        assert_eq!(scene.particles.position(2), Vec3::new(0.0, 0.0, 0.9));

        let at_mouth = scene.particles.position(0);
        script.frame(&mut scene, 1.0 / 60.0, &mut rng);
        let moved = scene.particles.position(0);
        let target = script.targets[0];
        assert!(moved.distance(target) < at_mouth.distance(target));
        assert!(scene.particles.curl(0) > RESTING_CURL);
    }

    #[test]
    fn recruits_are_never_assigned_twice() {
        let mut scene = scene();
        let mut rng = rng();
        let mut script = FaceScript::default();
        script.setup(&mut scene, &ready(), &mut rng).unwrap();
        let waiting = script.recruits.len();
        for _ in 0..waiting + 5 {
            script.recruit();
        }
        assert!(script.recruits.is_empty());
        assert_eq!(script.reached.iter().filter(|r| **r).count(), waiting);
    }
}
