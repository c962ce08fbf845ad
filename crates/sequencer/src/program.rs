//! Shader program descriptors, one per stage.
//!
//! Sources are GLSL 450 bodies. The renderer prepends a prelude that declares
//! the instance attributes (`position`, `aColor`, `aCurl`), the camera and model
//! matrices (`projectionMatrix`, `viewMatrix`, `modelMatrix`), `uTime`, one
//! macro per schema uniform, `uPositionsTexture`, the `emit_point` helper for
//! vertex shaders, and `point_coord` / `fragColor` for fragment shaders. User
//! varyings start at location 1.

use std::fmt;

use crate::uniforms::UniformSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    Point,
    Lattice,
    Surface,
    Image,
    Face,
    Galaxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Alpha,
    Additive,
}

#[derive(Debug)]
pub struct ShaderProgram {
    pub id: ProgramId,
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub uniforms: &'static [UniformSpec],
    pub blend: BlendMode,
}

impl ShaderProgram {
    pub fn float_uniforms(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.uniforms
            .iter()
            .filter(|spec| matches!(spec.default, crate::UniformValue::Float(_)))
            .map(|spec| spec.name)
    }
}

impl ProgramId {
    pub const ALL: [ProgramId; 6] = [
        ProgramId::Point,
        ProgramId::Lattice,
        ProgramId::Surface,
        ProgramId::Image,
        ProgramId::Face,
        ProgramId::Galaxy,
    ];

    pub fn program(self) -> &'static ShaderProgram {
        match self {
            ProgramId::Point => &POINT,
            ProgramId::Lattice => &LATTICE,
            ProgramId::Surface => &SURFACE,
            ProgramId::Image => &IMAGE,
            ProgramId::Face => &FACE,
            ProgramId::Galaxy => &GALAXY,
        }
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program().label)
    }
}

static POINT: ShaderProgram = ShaderProgram {
    id: ProgramId::Point,
    label: "point",
    vertex: include_str!("../shaders/point.vert"),
    fragment: include_str!("../shaders/point.frag"),
    uniforms: &[
        UniformSpec::float("uPointSize", 64.0),
        UniformSpec::float("uCircle", 0.0),
        UniformSpec::float("uTriangle", 0.0),
    ],
    blend: BlendMode::Alpha,
};

static LATTICE: ShaderProgram = ShaderProgram {
    id: ProgramId::Lattice,
    label: "lattice",
    vertex: include_str!("../shaders/lattice.vert"),
    fragment: include_str!("../shaders/lattice.frag"),
    uniforms: &[UniformSpec::float("uPointSize", 64.0)],
    blend: BlendMode::Alpha,
};

static SURFACE: ShaderProgram = ShaderProgram {
    id: ProgramId::Surface,
    label: "surface",
    vertex: include_str!("../shaders/lattice.vert"),
    fragment: include_str!("../shaders/lattice.frag"),
    uniforms: &[UniformSpec::float("uPointSize", 8.0)],
    blend: BlendMode::Alpha,
};

static IMAGE: ShaderProgram = ShaderProgram {
    id: ProgramId::Image,
    label: "image",
    vertex: concat!(
        include_str!("../shaders/noise.glsl"),
        include_str!("../shaders/image.vert")
    ),
    fragment: include_str!("../shaders/image.frag"),
    uniforms: &[
        UniformSpec::float("uPointSize", 2.0),
        UniformSpec::float("uDistortion", 0.0),
        UniformSpec::float("uDepthByLuminance", 0.0),
        UniformSpec::float("uNoiseWaveAmplitude", 0.0),
        UniformSpec::float("uAlpha", 1.0),
    ],
    blend: BlendMode::Alpha,
};

static FACE: ShaderProgram = ShaderProgram {
    id: ProgramId::Face,
    label: "face",
    vertex: concat!(
        include_str!("../shaders/noise.glsl"),
        include_str!("../shaders/face.vert")
    ),
    fragment: include_str!("../shaders/face.frag"),
    uniforms: &[
        UniformSpec::float("uScale", 2.5),
        UniformSpec::float("uAlpha", 0.8),
        UniformSpec::float("uPointSize", 1.0),
        UniformSpec::float("uProgressZ", -0.5),
        UniformSpec::float("uBlow", 0.0),
    ],
    blend: BlendMode::Alpha,
};

static GALAXY: ShaderProgram = ShaderProgram {
    id: ProgramId::Galaxy,
    label: "galaxy",
    vertex: include_str!("../shaders/galaxy.vert"),
    fragment: include_str!("../shaders/galaxy.frag"),
    uniforms: &[
        UniformSpec::texture("uPositionsTexture"),
        UniformSpec::float("uPointSize", 1.0),
    ],
    blend: BlendMode::Additive,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::MAX_FLOAT_UNIFORMS;
    use std::collections::HashSet;

    #[test]
    fn ids_resolve_to_their_own_program() {
        for id in ProgramId::ALL {
            assert_eq!(id.program().id, id);
        }
    }

    #[test]
    fn schemas_fit_the_uniform_block() {
        for id in ProgramId::ALL {
            let program = id.program();
            assert!(program.float_uniforms().count() <= MAX_FLOAT_UNIFORMS, "{id}");
            let unique: HashSet<_> = program.uniforms.iter().map(|spec| spec.name).collect();
            assert_eq!(unique.len(), program.uniforms.len(), "{id} repeats a uniform");
        }
    }

    #[test]
    fn every_uniform_is_referenced_by_a_stage_source() {
        for id in ProgramId::ALL {
            let program = id.program();
            for spec in program.uniforms {
                assert!(
                    program.vertex.contains(spec.name) || program.fragment.contains(spec.name),
                    "{} never reads {}",
                    id,
                    spec.name
                );
            }
        }
    }

    #[test]
    fn sources_define_entry_points_without_redeclaring_uniforms() {
        for id in ProgramId::ALL {
            let program = id.program();
            for source in [program.vertex, program.fragment] {
                assert!(source.contains("void main()"));
                assert!(!source.contains("uniform float"));
                assert!(!source.contains("#version"));
            }
        }
    }

    #[test]
    fn only_the_galaxy_blends_additively() {
        for id in ProgramId::ALL {
            let additive = id.program().blend == BlendMode::Additive;
            assert_eq!(additive, id == ProgramId::Galaxy);
        }
    }
}
