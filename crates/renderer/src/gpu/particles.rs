use std::ops::Range;

use sequencer::{Attribute, ParticleSet};
use wgpu::util::DeviceExt;

/// Attributes the vertex stage reads, in shader location order.
pub(crate) const INSTANCE_ATTRIBUTES: [Attribute; 3] =
    [Attribute::Position, Attribute::Color, Attribute::Curl];

const POSITION_LAYOUT: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const COLOR_LAYOUT: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const CURL_LAYOUT: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32];

/// One per-instance buffer per attribute.
pub(crate) fn instance_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    let layout = |attribute: Attribute, attributes: &'static [wgpu::VertexAttribute]| {
        wgpu::VertexBufferLayout {
            array_stride: stride(attribute),
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    };
    [
        layout(Attribute::Position, &POSITION_LAYOUT),
        layout(Attribute::Color, &COLOR_LAYOUT),
        layout(Attribute::Curl, &CURL_LAYOUT),
    ]
}

fn stride(attribute: Attribute) -> wgpu::BufferAddress {
    (attribute.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress
}

/// Byte offset and float span covering particles `range` of `attribute`.
pub(crate) fn upload_span(
    attribute: Attribute,
    range: &Range<usize>,
) -> (wgpu::BufferAddress, Range<usize>) {
    let components = attribute.components();
    let floats = range.start * components..range.end * components;
    (range.start as wgpu::BufferAddress * stride(attribute), floats)
}

/// GPU copies of the instance attributes, sized for the whole capacity.
pub(crate) struct ParticleBuffers {
    buffers: [wgpu::Buffer; 3],
    capacity: usize,
}

impl ParticleBuffers {
    pub fn new(device: &wgpu::Device, particles: &mut ParticleSet) -> Self {
        let buffers = INSTANCE_ATTRIBUTES.map(|attribute| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particle instance buffer"),
                contents: bytemuck::cast_slice(particles.attribute(attribute)),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
        });
        for attribute in Attribute::ALL {
            particles.take_dirty(attribute);
        }
        Self {
            buffers,
            capacity: particles.capacity(),
        }
    }

    /// Uploads what changed since the last call and returns the bytes written.
    pub fn upload(&self, queue: &wgpu::Queue, particles: &mut ParticleSet) -> u64 {
        let mut written = 0;
        for (buffer, attribute) in self.buffers.iter().zip(INSTANCE_ATTRIBUTES) {
            let Some(range) = particles.take_dirty(attribute) else {
                continue;
            };
            let range = range.start.min(self.capacity)..range.end.min(self.capacity);
            if range.is_empty() {
                continue;
            }
            let (offset, floats) = upload_span(attribute, &range);
            let data: &[u8] = bytemuck::cast_slice(&particles.attribute(attribute)[floats]);
            queue.write_buffer(buffer, offset, data);
            written += data.len() as u64;
        }
        // velocities never leave the CPU
        particles.take_dirty(Attribute::Velocity);
        written
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, buffer) in self.buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_cover_whole_particles() {
        let (offset, floats) = upload_span(Attribute::Position, &(2..5));
        assert_eq!(offset, 24);
        assert_eq!(floats, 6..15);

        let (offset, floats) = upload_span(Attribute::Curl, &(2..5));
        assert_eq!(offset, 8);
        assert_eq!(floats, 2..5);
    }

    #[test]
    fn layouts_follow_shader_locations() {
        let layouts = instance_layouts();
        assert_eq!(layouts[0].array_stride, 12);
        assert_eq!(layouts[1].attributes[0].shader_location, 1);
        assert_eq!(layouts[2].array_stride, 4);
        assert_eq!(layouts[2].attributes[0].format, wgpu::VertexFormat::Float32);
        assert!(layouts
            .iter()
            .all(|layout| layout.step_mode == wgpu::VertexStepMode::Instance));
    }
}
