use choreography::{ArrayTween, Ease, Timeline, Timing, Tween};
use glam::Vec3;
use rand::rngs::StdRng;

use super::{axes, overlay_count, uniform, ExitRule, Resources, StageScript, Vector, XY};
use crate::particles::Attribute;
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

const SIDE: usize = 8;
const COUNT: usize = SIDE * SIDE * SIDE;

/// 512 particles spread into a line, a plane, then a cube.
pub struct LatticeScript;

/// Grid positions scaled per axis; a zero extent collapses that axis.
pub(crate) fn grid(extent: [f32; 3]) -> Vec<f32> {
    let mut positions = vec![0.0; COUNT * 3];
    for x in 0..SIDE {
        for y in 0..SIDE {
            for z in 0..SIDE {
                let i = ((z * SIDE * SIDE) + (y * SIDE) + x) * 3;
                for (axis, cell) in [x, y, z].into_iter().enumerate() {
                    positions[i + axis] = (cell as f32 / SIDE as f32 - 0.5) * extent[axis];
                }
            }
        }
    }
    positions
}

fn morph(target: Vec<f32>) -> ArrayTween<Scene> {
    ArrayTween::new(
        |scene: &mut Scene| scene.particles.attribute_mut(Attribute::Position, 0..COUNT),
        target,
    )
}

impl StageScript for LatticeScript {
    fn stage(&self) -> Stage {
        Stage::LinePlaneCube
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        _resources: &Resources,
        _rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        scene.particles.set_draw_count(COUNT)?;
        scene.install_program(ProgramId::Lattice);
        scene.overlay.count = 1.0;

        let mut timeline = Timeline::new(Ease::Power3InOut);

        timeline.add(Timing::new(1.0), morph(grid([6.0, 0.0, 0.0])));
        timeline.add(
            Timing::new(0.5).with_previous(),
            Tween::to(overlay_count(), SIDE as f32).on_update(|scene: &mut Scene| {
                if scene.overlay.displayed_count() >= 2 {
                    scene.overlay.name = "Particles";
                }
            }),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uPointSize"), 32.0),
        );

        timeline.add(Timing::new(0.75).delay(0.25), morph(grid([4.0, 4.0, 0.0])));
        timeline.add(
            Timing::new(0.5).with_previous(),
            Tween::to(overlay_count(), (SIDE * SIDE) as f32),
        );
        timeline.add(
            Timing::new(0.75).with_previous(),
            Tween::to(uniform("uPointSize"), 16.0),
        );

        timeline.add(Timing::new(1.0).delay(0.25), morph(grid([3.0, 3.0, 3.0])));
        timeline.add(
            Timing::new(0.75).with_previous(),
            Tween::to(overlay_count(), COUNT as f32),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uPointSize"), 8.0),
        );

        timeline.add(
            Timing::new(1.25).with_previous(),
            Tween::to(axes(Vector::GroupRotation, XY), Vec3::new(0.55, -0.9, 0.0)),
        );
        timeline.add(
            Timing::new(5.0).through_previous(30.0),
            Tween::to(axes(Vector::GroupRotation, XY), Vec3::new(0.65, -1.75, 0.0)),
        );
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::Progress(0.5)
    }
}
