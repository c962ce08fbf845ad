use assets::ImageData;
use choreography::{ArrayTween, Ease, Timeline, Timing, Tween};
use glam::Vec3;
use rand::rngs::StdRng;

use super::{
    axes, look_at_origin, overlay_count, uniform, ExitRule, Resources, StageScript, Vector, X,
    XYZ, Y, Z,
};
use crate::particles::Attribute;
use crate::program::ProgramId;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::SequencerError;

/// World-space height of the image plane.
const IMAGE_HEIGHT: f32 = 3.0;

/// Curl-noise dissolve of the previous shape into the picture's pixels.
pub struct ImageScript;

/// One particle per pixel: row-major positions centred on the origin with the
/// image's aspect ratio, and the pixel colors in `[0, 1]`.
pub(crate) fn pixel_grid(image: &ImageData) -> (Vec<f32>, Vec<f32>) {
    let count = image.pixel_count();
    let (width, height) = (image.width as f32, image.height as f32);
    let aspect = width / height;
    let mut positions = Vec::with_capacity(count * 3);
    let mut colors = Vec::with_capacity(count * 3);
    for i in 0..count {
        let column = (i % image.width as usize) as f32;
        let row = (i / image.width as usize) as f32;
        positions.extend_from_slice(&[
            (column / width - 0.5) * IMAGE_HEIGHT * aspect,
            (1.0 - row / height - 0.5) * IMAGE_HEIGHT,
            0.0,
        ]);
        let [r, g, b, _] = image.pixel(i);
        colors.extend_from_slice(&[r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
    }
    (positions, colors)
}

impl StageScript for ImageScript {
    fn stage(&self) -> Stage {
        Stage::Image
    }

    fn is_ready(&self, resources: &Resources) -> bool {
        resources.image.is_some()
    }

    fn setup(
        &mut self,
        scene: &mut Scene,
        resources: &Resources,
        _rng: &mut StdRng,
    ) -> Result<Timeline<Scene>, SequencerError> {
        let Some(image) = resources.image.as_deref() else {
            return Ok(Timeline::new(Ease::Power3InOut));
        };
        let count = image.pixel_count();
        scene.particles.set_draw_count(count)?;
        scene.install_program(ProgramId::Image);
        scene.overlay.count = 10_000.0;
        let (positions, colors) = pixel_grid(image);

        let mut timeline = Timeline::new(Ease::Power3InOut);
        timeline.add(Timing::new(2.0), Tween::to(uniform("uDistortion"), 1.5));
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(overlay_count(), count as f32),
        );
        timeline.add(
            Timing::new(1.5).with_previous(),
            Tween::to(axes(Vector::GroupRotation, XYZ), Vec3::ZERO),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::by(axes(Vector::CameraPosition, Z), Vec3::new(0.0, 0.0, 1.5))
                .on_update(look_at_origin),
        );
        timeline.add(
            Timing::new(2.0).through_previous(90.0),
            Tween::to(uniform("uDistortion"), 0.0),
        );

        timeline.add(
            Timing::new(1.0).through_previous(10.0),
            ArrayTween::new(
                move |scene: &mut Scene| scene.particles.attribute_mut(Attribute::Position, 0..count),
                positions,
            ),
        );
        timeline.add(
            Timing::new(1.0).through_previous(30.0),
            ArrayTween::new(
                move |scene: &mut Scene| scene.particles.attribute_mut(Attribute::Color, 0..count),
                colors,
            ),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uPointSize"), 2.0),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uDepthByLuminance"), 0.2),
        );
        timeline.add(
            Timing::new(1.0).with_previous(),
            Tween::to(uniform("uNoiseWaveAmplitude"), 0.1),
        );

        timeline.add(
            Timing::new(0.5).through_previous(90.0),
            Tween::by(axes(Vector::CameraPosition, Z), Vec3::new(0.0, 0.0, -2.0))
                .on_update(look_at_origin),
        );
        timeline.add(
            Timing::new(1.5).through_previous(80.0).ease(Ease::Power4Out),
            Tween::to(axes(Vector::CameraPosition, XYZ), Vec3::new(2.42, 0.14, 2.5))
                .on_update(look_at_origin),
        );
        timeline.add(
            Timing::new(2.0).with_previous(),
            Tween::to(axes(Vector::GroupPosition, X), Vec3::ZERO),
        );
        timeline.add(
            Timing::new(2.0).with_previous(),
            Tween::to(axes(Vector::GroupRotation, Y), Vec3::new(0.0, -0.5, 0.0)),
        );
        timeline.add(
            Timing::new(3.0).through_previous(65.0).ease(Ease::Linear),
            Tween::to(axes(Vector::GroupRotation, Y), Vec3::new(0.0, -1.0, 0.0)),
        );
        // behind the picture; the camera keeps its last heading
        timeline.add(
            Timing::new(2.0).with_previous().ease(Ease::Linear),
            Tween::to(axes(Vector::CameraPosition, XYZ), Vec3::new(1.5, 0.1, 1.6)),
        );
        timeline.add(
            Timing::new(4.0).after_previous_start(0.1).ease(Ease::Linear),
            Tween::to(uniform("uDepthByLuminance"), 30.0),
        );
        timeline.add(
            Timing::new(1.5).with_previous(),
            Tween::to(uniform("uAlpha"), 0.0),
        );
        Ok(timeline)
    }

    fn exit(&self) -> ExitRule {
        ExitRule::Progress(0.6)
    }
}
