use std::time::Duration;

use choreography::{ArrayTween, Ease, Timeline, Timing, Tween};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;

use super::{overlay_text, uniform, ExitRule, Resources, StageScript};
use crate::particles::Attribute;
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

/// A single sprite rises into view and morphs circle, triangle, square.
pub struct PointScript {
    exit_delay: Duration,
}

impl PointScript {
    pub fn new(exit_delay: Duration) -> Self {
        Self { exit_delay }
    }
}

impl StageScript for PointScript {
    fn stage(&self) -> Stage {
        Stage::Point
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        _resources: &Resources,
        _rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        scene.particles.set_draw_count(1)?;
        scene.particles.set_position(0, Vec3::new(0.0, -5.0, 0.0));
        scene.install_program(ProgramId::Point);
        scene.overlay.count = 1.0;
        scene.overlay.name = "Particle";
        scene.overlay.offset = 100.0;
        scene.overlay.opacity = 0.0;

        let mut timeline = Timeline::new(Ease::Power3InOut);
        timeline.add(
            Timing::new(1.5),
            ArrayTween::new(
                |scene: &mut Scene| scene.particles.attribute_mut(Attribute::Position, 0..1),
                vec![0.0; 3],
            ),
        );
        timeline.add(
            Timing::new(1.0).after_previous_start(0.5),
            Tween::to(overlay_text(), Vec2::new(0.0, 0.9)),
        );
        timeline.add(
            Timing::new(0.5).delay(0.5),
            Tween::to(uniform("uCircle"), 1.0),
        );
        timeline.add(
            Timing::new(0.5).delay(0.3),
            Tween::to(uniform("uTriangle"), 1.0),
        );
        timeline.add(
            Timing::new(0.4).delay(0.3),
            Tween::to(uniform("uCircle"), 0.0),
        );
        timeline.add(
            Timing::new(0.4).with_previous(),
            Tween::to(uniform("uTriangle"), 0.0),
        );
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::CompleteThenWait(self.exit_delay)
    }
}
