use crate::program::ProgramId;
use crate::SequencerError;

/// Float uniforms a program may declare; they pack into two vec4 slots.
pub const MAX_FLOAT_UNIFORMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    /// Bound by the renderer (the simulation's position texture).
    Texture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Texture,
}

impl UniformValue {
    pub fn kind(self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Texture => UniformKind::Texture,
        }
    }
}

/// A schema entry: uniform name and the value it starts from on install.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSpec {
    pub name: &'static str,
    pub default: UniformValue,
}

impl UniformSpec {
    pub const fn float(name: &'static str, default: f32) -> Self {
        Self {
            name,
            default: UniformValue::Float(default),
        }
    }

    pub const fn texture(name: &'static str) -> Self {
        Self {
            name,
            default: UniformValue::Texture,
        }
    }
}

/// Live uniform values of the installed program, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSet {
    program: ProgramId,
    values: Vec<(&'static str, UniformValue)>,
}

impl UniformSet {
    pub fn for_program(program: ProgramId) -> Self {
        let values = program
            .program()
            .uniforms
            .iter()
            .map(|spec| (spec.name, spec.default))
            .collect();
        Self { program, values }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(value) => Some(value),
            UniformValue::Texture => None,
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), SequencerError> {
        let program = self.program;
        let slot = self
            .values
            .iter_mut()
            .find(|(candidate, _)| *candidate == name)
            .ok_or_else(|| SequencerError::UnknownUniform {
                name: name.to_string(),
                program,
            })?;
        match slot.1 {
            UniformValue::Float(_) => {
                slot.1 = UniformValue::Float(value);
                Ok(())
            }
            UniformValue::Texture => Err(SequencerError::UniformKindMismatch {
                name: name.to_string(),
                kind: UniformKind::Texture,
            }),
        }
    }

    /// Float uniforms in schema order, laid out the way the GLSL prelude
    /// addresses them.
    pub fn pack_floats(&self) -> [f32; MAX_FLOAT_UNIFORMS] {
        let mut packed = [0.0; MAX_FLOAT_UNIFORMS];
        let floats = self.values.iter().filter_map(|(_, value)| match value {
            UniformValue::Float(v) => Some(*v),
            UniformValue::Texture => None,
        });
        for (slot, value) in packed.iter_mut().zip(floats) {
            *slot = value;
        }
        packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuilt_from_schema_defaults() {
        let mut set = UniformSet::for_program(ProgramId::Point);
        set.set_float("uCircle", 1.0).unwrap();
        let fresh = UniformSet::for_program(ProgramId::Point);
        assert_eq!(fresh.float("uCircle"), Some(0.0));
        assert_eq!(set.float("uCircle"), Some(1.0));
    }

    #[test]
    fn unknown_uniform_write_is_rejected() {
        let mut set = UniformSet::for_program(ProgramId::Lattice);
        let err = set.set_float("uCircle", 1.0).unwrap_err();
        assert!(matches!(
            err,
            SequencerError::UnknownUniform { ref name, program: ProgramId::Lattice } if name == "uCircle"
        ));
    }

    #[test]
    fn texture_uniforms_refuse_float_writes() {
        let mut set = UniformSet::for_program(ProgramId::Galaxy);
        assert!(set.get("uPositionsTexture").is_some());
        assert!(set.float("uPositionsTexture").is_none());
        assert!(set.set_float("uPositionsTexture", 2.0).is_err());
    }

    #[test]
    fn floats_pack_in_schema_order_skipping_textures() {
        let mut set = UniformSet::for_program(ProgramId::Face);
        set.set_float("uBlow", 0.5).unwrap();
        let packed = set.pack_floats();
        let blow_slot = set
            .values
            .iter()
            .position(|(name, _)| *name == "uBlow")
            .unwrap();
        assert_eq!(packed[blow_slot], 0.5);

        let galaxy = UniformSet::for_program(ProgramId::Galaxy).pack_floats();
        assert_eq!(galaxy[0], 1.0);
    }
}
