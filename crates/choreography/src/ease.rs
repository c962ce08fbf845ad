/// Easing curves applied to a tween's normalized local progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    #[default]
    Power1Out,
    Power1InOut,
    Power3InOut,
    Power4Out,
    BounceOut,
}

impl Ease {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => clamped,
            Ease::Power1Out => 1.0 - (1.0 - clamped).powi(2),
            Ease::Power1InOut => in_out(clamped, 2),
            Ease::Power3InOut => in_out(clamped, 4),
            Ease::Power4Out => 1.0 - (1.0 - clamped).powi(5),
            Ease::BounceOut => bounce_out(clamped),
        }
    }
}

fn in_out(t: f32, power: i32) -> f32 {
    if t < 0.5 {
        2f32.powi(power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) / 2.0
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 6] = [
        Ease::Linear,
        Ease::Power1Out,
        Ease::Power1InOut,
        Ease::Power3InOut,
        Ease::Power4Out,
        Ease::BounceOut,
    ];

    #[test]
    fn every_curve_hits_its_endpoints() {
        for ease in ALL {
            assert!(ease.sample(0.0).abs() < 1e-6, "{ease:?} at 0");
            assert!((ease.sample(1.0) - 1.0).abs() < 1e-5, "{ease:?} at 1");
        }
    }

    #[test]
    fn samples_clamp_outside_unit_range() {
        for ease in ALL {
            assert_eq!(ease.sample(-3.0), ease.sample(0.0));
            assert_eq!(ease.sample(7.0), ease.sample(1.0));
        }
    }

    #[test]
    fn linear_curve_increases_monotonically() {
        let mut last = 0.0;
        for step in 0..=10 {
            let sample = Ease::Linear.sample(step as f32 / 10.0);
            assert!(sample >= last - f32::EPSILON);
            last = sample;
        }
    }

    #[test]
    fn in_out_curves_are_symmetric_about_midpoint() {
        for ease in [Ease::Power1InOut, Ease::Power3InOut] {
            assert!((ease.sample(0.5) - 0.5).abs() < 1e-6);
            let early = ease.sample(0.2);
            let late = ease.sample(0.8);
            assert!((early + late - 1.0).abs() < 1e-5);
            assert!(early < 0.2);
        }
    }

    #[test]
    fn out_curves_front_load_progress() {
        assert!(Ease::Power4Out.sample(0.25) > 0.7);
        assert!(Ease::Power1Out.sample(0.5) > 0.5);
    }

    #[test]
    fn bounce_out_never_overshoots() {
        for step in 0..=100 {
            let sample = Ease::BounceOut.sample(step as f32 / 100.0);
            assert!((0.0..=1.0 + 1e-6).contains(&sample));
        }
    }
}
