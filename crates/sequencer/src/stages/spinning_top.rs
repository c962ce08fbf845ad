use std::f32::consts::PI;

use choreography::{ArrayTween, Ease, Timeline, Timing, Tween};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

use super::{
    axes, overlay_count, set_draw_count_logged, uniform, ExitRule, Resources, StageScript, Vector,
    XYZ, Y,
};
use crate::particles::Attribute;
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

const COUNT: usize = 10_000;
const SPHERE_COUNT: usize = 2_000;
const SPHERE_RADIUS: f32 = 1.3;
const TOP_RADIUS: f32 = 1.1;

/// A random sphere that drops and spins into a superformula "spinning top".
pub struct SpinningTopScript;

/// Superformula radius for angle `theta`.
pub(crate) fn superformula(m: f32, n1: f32, n2: f32, n3: f32, a: f32, b: f32, theta: f32) -> f32 {
    let cos = ((m * theta / 4.0).cos() / a).abs().powf(n2);
    let sin = ((m * theta / 4.0).sin() / b).abs().powf(n3);
    (cos + sin).powf(-1.0 / n1)
}

fn sphere(rng: &mut StdRng) -> Vec<f32> {
    let mut positions = Vec::with_capacity(SPHERE_COUNT * 3);
    for _ in 0..SPHERE_COUNT {
        let theta = rng.gen::<f32>() * PI * 2.0;
        let phi = (rng.gen::<f32>() - 0.5) * PI;
        positions.extend_from_slice(&[
            SPHERE_RADIUS * phi.cos() * theta.cos(),
            SPHERE_RADIUS * phi.cos() * theta.sin(),
            SPHERE_RADIUS * phi.sin(),
        ]);
    }
    positions
}

fn spinning_top(rng: &mut StdRng) -> Vec<f32> {
    let mut positions = Vec::with_capacity(COUNT * 3);
    for _ in 0..COUNT {
        let theta = (rng.gen::<f32>() - 0.5) * 2.0 * PI;
        let phi = (rng.gen::<f32>() - 0.5) * PI;
        let r1 = superformula(4.0, 2.0, 1.0, 1.0, 1.5, 1.5, theta);
        let r2 = superformula(4.0, 0.4, 0.8, 0.9, 1.0, 1.0, phi);
        positions.extend_from_slice(&[
            TOP_RADIUS * r1 * theta.cos() * r2 * phi.cos(),
            TOP_RADIUS * r1 * theta.sin() * r2 * phi.cos(),
            TOP_RADIUS * r2 * phi.sin(),
        ]);
    }
    positions
}

impl StageScript for SpinningTopScript {
    fn stage(&self) -> Stage {
        Stage::SphereSpinningTop
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        _resources: &Resources,
        rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        scene.particles.set_draw_count(COUNT)?;
        // only the sphere's prefix is visible until the top takes over
        scene.particles.set_draw_count(SPHERE_COUNT)?;
        scene.install_program(ProgramId::Surface);
        scene.overlay.count = 512.0;

        let mut timeline = Timeline::new(Ease::Power3InOut);
        timeline.add(
            Timing::new(1.0),
            ArrayTween::new(
                |scene: &mut Scene| {
                    scene
                        .particles
                        .attribute_mut(Attribute::Position, 0..SPHERE_COUNT)
                },
                sphere(rng),
            ),
        );
        timeline.add(
            Timing::new(0.75).with_previous(),
            Tween::to(overlay_count(), SPHERE_COUNT as f32),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uPointSize"), 4.0),
        );
        timeline.add(
            Timing::new(2.0).with_previous(),
            Tween::to(axes(Vector::GroupRotation, XYZ), Vec3::new(-2.5, -0.5, -1.0)),
        );
        timeline.add(
            Timing::new(1.0).through_previous(50.0),
            Tween::to(axes(Vector::GroupPosition, Y), Vec3::Y),
        );

        timeline.add(
            Timing::new(1.0).through_previous(20.0),
            ArrayTween::new(
                |scene: &mut Scene| scene.particles.attribute_mut(Attribute::Position, 0..COUNT),
                spinning_top(rng),
            )
            .on_update(|scene: &mut Scene| {
                if scene.particles.draw_count() != COUNT {
                    set_draw_count_logged(scene, COUNT);
                }
            }),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(overlay_count(), COUNT as f32),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uPointSize"), 2.0),
        );
        timeline.add(
            Timing::new(1.0).through_previous(10.0).ease(Ease::BounceOut),
            Tween::to(axes(Vector::GroupPosition, Y), Vec3::ZERO),
        );
        timeline.add(
            Timing::new(0.5).with_previous(),
            Tween::to(axes(Vector::GroupRotation, XYZ), Vec3::new(-2.5, -1.0, -2.87)),
        );
        timeline.add(
            Timing::new(2.0).through_previous(55.0),
            Tween::to(axes(Vector::GroupRotation, XYZ), Vec3::new(-1.27, 0.35, 17.8)),
        );
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::Progress(0.75)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::{ready, rng, scene};

    #[test]
    fn superformula_with_unit_parameters_is_a_circle() {
        for theta in [0.0, 0.3, 1.2, 2.9] {
            let r = superformula(4.0, 2.0, 2.0, 2.0, 1.0, 1.0, theta);
            assert!((r - 1.0).abs() < 1e-5, "theta {theta} gave {r}");
        }
    }

    #[test]
    fn sphere_points_lie_on_the_radius() {
        let points = sphere(&mut rng());
        assert_eq!(points.len(), SPHERE_COUNT * 3);
        for p in points.chunks(3) {
            let r = Vec3::from_slice(p).length();
            assert!((r - SPHERE_RADIUS).abs() < 1e-4);
        }
    }

    #[test]
    fn draw_range_narrows_for_the_sphere_then_widens_for_the_top() {
        let mut scene = scene();
        let mut rng = rng();
        let mut timeline = SpinningTopScript
            .setup(&mut scene, &ready(), &mut rng)
            .unwrap();
        // narrowed before the first frame renders
        assert_eq!(scene.particles.draw_count(), SPHERE_COUNT);
        assert_eq!(scene.program(), ProgramId::Surface);

        timeline.advance(&mut scene, 0.1);
        assert_eq!(scene.particles.draw_count(), SPHERE_COUNT);

        // the top morph starts at 1.2 s
        timeline.advance(&mut scene, 1.2);
        assert_eq!(scene.particles.draw_count(), COUNT);

        timeline.advance(&mut scene, 10.0);
        assert!(timeline.is_complete());
        assert_eq!(scene.uniform("uPointSize"), Some(2.0));
        assert!((scene.group.rotation.z - 17.8).abs() < 1e-3);
        assert!(scene.group.position.y.abs() < 1e-5);
    }
}
