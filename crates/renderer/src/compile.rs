use std::borrow::Cow;

use anyhow::{bail, Result};
use sequencer::ShaderProgram;
use wgpu::naga::ShaderStage;

/// Compiles a program's vertex body wrapped in the particle prelude.
pub(crate) fn compile_particle_vertex(
    device: &wgpu::Device,
    program: &ShaderProgram,
) -> Result<wgpu::ShaderModule> {
    create_glsl_module(
        device,
        &format!("{} vertex", program.label),
        wrap_particle_vertex(program),
        ShaderStage::Vertex,
    )
}

/// Compiles a program's fragment body wrapped in the particle prelude.
pub(crate) fn compile_particle_fragment(
    device: &wgpu::Device,
    program: &ShaderProgram,
) -> Result<wgpu::ShaderModule> {
    create_glsl_module(
        device,
        &format!("{} fragment", program.label),
        wrap_particle_fragment(program),
        ShaderStage::Fragment,
    )
}

/// Compiles the static full-screen triangle used by the simulation passes.
pub(crate) fn compile_fullscreen_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    create_glsl_module(
        device,
        "fullscreen triangle vertex",
        FULLSCREEN_VERTEX_GLSL.to_string(),
        ShaderStage::Vertex,
    )
}

pub(crate) fn compile_velocity_pass(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    create_glsl_module(
        device,
        "velocity pass",
        simulation_fragment(VELOCITY_BODY),
        ShaderStage::Fragment,
    )
}

pub(crate) fn compile_position_pass(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    create_glsl_module(
        device,
        "position pass",
        simulation_fragment(POSITION_BODY),
        ShaderStage::Fragment,
    )
}

/// Compiles GLSL inside a validation scope so front-end errors come back as
/// `Err` instead of reaching the device's uncaptured error handler.
fn create_glsl_module(
    device: &wgpu::Device,
    label: &str,
    source: String,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    tracing::trace!(label, bytes = source.len(), "compiling GLSL module");
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        bail!("failed to compile {label}: {err}");
    }
    Ok(module)
}

/// Drops any `#version` line; the prelude supplies its own.
fn strip_version(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len());
    let mut skipped_version = false;
    for line in source.lines() {
        if !skipped_version && line.trim_start().starts_with("#version") {
            skipped_version = true;
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }
    sanitized
}

/// Declarations shared by both stages: the uniform block, one macro per
/// float uniform in schema order, and the position texture.
fn shared_prelude(program: &ShaderProgram) -> String {
    let mut prelude = String::from(UNIFORM_BLOCK);
    for (index, name) in program.float_uniforms().enumerate() {
        prelude.push_str(&format!(
            "#define {name} ubo._params[{}][{}]\n",
            index / 4,
            index % 4
        ));
    }
    prelude.push_str(POSITIONS_TEXTURE);
    prelude
}

pub(crate) fn wrap_particle_vertex(program: &ShaderProgram) -> String {
    format!(
        "{shared}{VERTEX_PRELUDE}\n#line 1\n{body}",
        shared = shared_prelude(program),
        body = strip_version(program.vertex),
    )
}

pub(crate) fn wrap_particle_fragment(program: &ShaderProgram) -> String {
    format!(
        "{shared}{FRAGMENT_PRELUDE}\n#line 1\n{body}",
        shared = shared_prelude(program),
        body = strip_version(program.fragment),
    )
}

fn simulation_fragment(body: &str) -> String {
    format!("{SIMULATION_PRELUDE}{body}")
}

/// Must match [`ParticleUniforms`](crate::gpu::uniforms::ParticleUniforms).
const UNIFORM_BLOCK: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform ParticleParams {
    mat4 _projection;
    mat4 _view;
    mat4 _model;
    vec4 _viewport;
    vec4 _params[2];
} ubo;

#define projectionMatrix ubo._projection
#define viewMatrix ubo._view
#define modelMatrix ubo._model
#define uTime ubo._viewport.z
";

const POSITIONS_TEXTURE: &str = r"
layout(set = 0, binding = 1) uniform texture2D morphosis_positions_texture;
layout(set = 0, binding = 2) uniform sampler morphosis_positions_sampler;
#define uPositionsTexture sampler2D(morphosis_positions_texture, morphosis_positions_sampler)
";

/// Instance attributes and the quad expansion that stands in for
/// `gl_PointSize`: `size` is the sprite diameter in pixels before the
/// device scale.
const VERTEX_PRELUDE: &str = r"
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 aColor;
layout(location = 2) in float aCurl;

layout(location = 0) out vec2 v_point_coord;

const vec2 morphosis_corners[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void emit_point(vec4 world, float size) {
    vec2 corner = morphosis_corners[gl_VertexIndex % 6];
    vec4 clip = projectionMatrix * viewMatrix * world;
    clip.xy += corner * size * ubo._viewport.w / ubo._viewport.xy * clip.w;
    gl_Position = clip;
    // top-left origin, like gl_PointCoord
    v_point_coord = vec2(corner.x, -corner.y) * 0.5 + 0.5;
}
";

const FRAGMENT_PRELUDE: &str = r"
layout(location = 0) in vec2 v_point_coord;
#define point_coord v_point_coord

layout(location = 0) out vec4 fragColor;
";

/// Must match [`SimulationUniforms`](crate::gpu::uniforms::SimulationUniforms).
const SIMULATION_PRELUDE: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SimulationParams {
    float gravity;
    float particle_mass;
    float attractor_mass;
    float dt;
    float distance_floor;
    float distance_ceiling;
    vec2 _padding;
} params;

layout(set = 0, binding = 1) uniform texture2D positions_texture;
layout(set = 0, binding = 2) uniform texture2D velocities_texture;
layout(set = 0, binding = 3) uniform sampler texel_sampler;

vec3 fetch_position() {
    return texelFetch(sampler2D(positions_texture, texel_sampler), ivec2(gl_FragCoord.xy), 0).xyz;
}

vec3 fetch_velocity() {
    return texelFetch(sampler2D(velocities_texture, texel_sampler), ivec2(gl_FragCoord.xy), 0).xyz;
}
";

const VELOCITY_BODY: &str = r"
void main() {
    vec3 position = fetch_position();
    vec3 velocity = fetch_velocity();

    vec3 displacement = vec3(0.0) - position;
    float distance_squared = clamp(
        dot(displacement, displacement),
        params.distance_floor,
        params.distance_ceiling
    );
    vec3 direction = length(displacement) > 0.0 ? normalize(displacement) : vec3(0.0);
    vec3 force = params.gravity * direction
        * (params.attractor_mass * params.particle_mass) / distance_squared;
    vec3 acceleration = force / params.particle_mass;

    outColor = vec4(velocity + acceleration * params.dt, 1.0);
}
";

const POSITION_BODY: &str = r"
void main() {
    outColor = vec4(fetch_position() + fetch_velocity() * params.dt, 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const FULLSCREEN_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
