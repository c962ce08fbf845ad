use std::fmt;

/// One phase of the fixed sequence, in playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Point,
    LinePlaneCube,
    SphereSpinningTop,
    Image,
    Face,
    Galaxy,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Point,
        Stage::LinePlaneCube,
        Stage::SphereSpinningTop,
        Stage::Image,
        Stage::Face,
        Stage::Galaxy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Point => "point",
            Stage::LinePlaneCube => "line-plane-cube",
            Stage::SphereSpinningTop => "sphere-spinning-top",
            Stage::Image => "image",
            Stage::Face => "face",
            Stage::Galaxy => "galaxy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
