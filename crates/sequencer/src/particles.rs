use std::ops::Range;

use glam::Vec3;

use crate::SequencerError;

/// Fixed particle budget shared by every stage.
pub const CAPACITY: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Velocity,
    Color,
    Curl,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Position,
        Attribute::Velocity,
        Attribute::Color,
        Attribute::Curl,
    ];

    /// Floats per particle.
    pub fn components(self) -> usize {
        match self {
            Attribute::Curl => 1,
            _ => 3,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Mutable views over every attribute of a particle range, as returned by
/// [`ParticleSet::split_mut`].
pub struct ParticleSlicesMut<'a> {
    pub positions: &'a mut [f32],
    pub velocities: &'a mut [f32],
    pub colors: &'a mut [f32],
    pub curls: &'a mut [f32],
}

/// Fixed-capacity particle storage.
///
/// Arrays are allocated once and mutated in place. Every mutable access widens
/// the attribute's dirty range, which the renderer drains to upload only what
/// changed.
pub struct ParticleSet {
    capacity: usize,
    draw_count: usize,
    positions: Vec<f32>,
    velocities: Vec<f32>,
    colors: Vec<f32>,
    curls: Vec<f32>,
    dirty: [Option<Range<usize>>; 4],
}

impl Default for ParticleSet {
    fn default() -> Self {
        Self::with_capacity(CAPACITY)
    }
}

impl ParticleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            draw_count: 0,
            positions: vec![0.0; capacity * 3],
            velocities: vec![0.0; capacity * 3],
            colors: vec![1.0; capacity * 3],
            curls: vec![0.0; capacity],
            dirty: [None, None, None, None],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    pub fn set_draw_count(&mut self, count: usize) -> Result<(), SequencerError> {
        if count > self.capacity {
            return Err(SequencerError::DrawCountExceedsCapacity {
                requested: count,
                capacity: self.capacity,
            });
        }
        self.draw_count = count;
        Ok(())
    }

    pub fn attribute(&self, attribute: Attribute) -> &[f32] {
        match attribute {
            Attribute::Position => &self.positions,
            Attribute::Velocity => &self.velocities,
            Attribute::Color => &self.colors,
            Attribute::Curl => &self.curls,
        }
    }

    /// Floats backing particles `range`, marked dirty.
    ///
    /// Panics if the range reaches past the capacity, like slice indexing.
    pub fn attribute_mut(&mut self, attribute: Attribute, range: Range<usize>) -> &mut [f32] {
        self.mark_dirty(attribute, range.clone());
        let n = attribute.components();
        let data = match attribute {
            Attribute::Position => &mut self.positions,
            Attribute::Velocity => &mut self.velocities,
            Attribute::Color => &mut self.colors,
            Attribute::Curl => &mut self.curls,
        };
        &mut data[range.start * n..range.end * n]
    }

    pub fn split_mut(&mut self, range: Range<usize>) -> ParticleSlicesMut<'_> {
        for attribute in Attribute::ALL {
            self.mark_dirty(attribute, range.clone());
        }
        let (start3, end3) = (range.start * 3, range.end * 3);
        ParticleSlicesMut {
            positions: &mut self.positions[start3..end3],
            velocities: &mut self.velocities[start3..end3],
            colors: &mut self.colors[start3..end3],
            curls: &mut self.curls[range],
        }
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[index * 3..index * 3 + 3])
    }

    pub fn set_position(&mut self, index: usize, value: Vec3) {
        value.write_to_slice(self.attribute_mut(Attribute::Position, index..index + 1));
    }

    pub fn velocity(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.velocities[index * 3..index * 3 + 3])
    }

    pub fn color(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.colors[index * 3..index * 3 + 3])
    }

    pub fn curl(&self, index: usize) -> f32 {
        self.curls[index]
    }

    /// Returns and clears the particle range touched since the last call.
    pub fn take_dirty(&mut self, attribute: Attribute) -> Option<Range<usize>> {
        self.dirty[attribute.slot()].take()
    }

    pub fn dirty(&self, attribute: Attribute) -> Option<Range<usize>> {
        self.dirty[attribute.slot()].clone()
    }

    fn mark_dirty(&mut self, attribute: Attribute, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let slot = &mut self.dirty[attribute.slot()];
        *slot = Some(match slot.take() {
            Some(existing) => existing.start.min(range.start)..existing.end.max(range.end),
            None => range,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_with_white_colors() {
        let set = ParticleSet::with_capacity(4);
        assert_eq!(set.position(3), Vec3::ZERO);
        assert_eq!(set.color(2), Vec3::ONE);
        assert_eq!(set.curl(1), 0.0);
        assert_eq!(set.draw_count(), 0);
        assert!(set.dirty(Attribute::Position).is_none());
    }

    #[test]
    fn draw_count_above_capacity_is_rejected() {
        let mut set = ParticleSet::with_capacity(8);
        assert!(set.set_draw_count(8).is_ok());
        let err = set.set_draw_count(9).unwrap_err();
        assert!(matches!(
            err,
            SequencerError::DrawCountExceedsCapacity {
                requested: 9,
                capacity: 8
            }
        ));
        assert_eq!(set.draw_count(), 8);
    }

    #[test]
    fn writes_widen_dirty_range() {
        let mut set = ParticleSet::with_capacity(16);
        set.set_position(5, Vec3::X);
        set.attribute_mut(Attribute::Position, 2..4)[0] = 1.0;
        assert_eq!(set.take_dirty(Attribute::Position), Some(2..6));
        assert_eq!(set.take_dirty(Attribute::Position), None);
        assert!(set.dirty(Attribute::Color).is_none());
    }

    #[test]
    fn attribute_slices_are_component_strided() {
        let mut set = ParticleSet::with_capacity(4);
        assert_eq!(set.attribute_mut(Attribute::Color, 1..3).len(), 6);
        assert_eq!(set.attribute_mut(Attribute::Curl, 1..3).len(), 2);
    }

    #[test]
    fn split_marks_every_attribute() {
        let mut set = ParticleSet::with_capacity(10);
        let slices = set.split_mut(0..4);
        slices.curls[3] = 2.5;
        slices.velocities[0] = 1.0;
        for attribute in Attribute::ALL {
            assert_eq!(set.dirty(attribute), Some(0..4));
        }
        assert_eq!(set.curl(3), 2.5);
        assert_eq!(set.velocity(0), Vec3::X);
    }
}
