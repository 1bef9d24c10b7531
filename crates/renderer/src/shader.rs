use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Noise octaves summed by the vertex displacement.
pub const DISTORTION_OCTAVES: u32 = 3;

/// Compiles the displacement vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("distortion vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(vertex_source()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the displacement shading fragment shader.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("distortion fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(fragment_source()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Full vertex stage source: prelude, noise, then the body.
pub fn vertex_source() -> String {
    assemble(VERTEX_BODY)
}

/// Full fragment stage source: prelude, noise, then the body.
pub fn fragment_source() -> String {
    assemble(FRAGMENT_BODY)
}

/// `#version` has to stay on the first line, so the octave count is injected
/// as a define right after it instead of through naga's define table.
fn assemble(body: &str) -> String {
    format!(
        "#version 450\n#define DISTORTION_OCTAVES {DISTORTION_OCTAVES}\n{UNIFORM_BLOCK}\n{SIMPLEX_NOISE}\n{body}"
    )
}

/// Layout must match `MeshUniforms` in `gpu/uniforms.rs` (std140, 160 bytes).
const UNIFORM_BLOCK: &str = r"
layout(std140, set = 0, binding = 0) uniform MeshUniforms {
    mat4 u_viewProjection;
    mat4 u_model;
    vec2 u_mouse;
    float u_time;
    float u_aspect;
    float u_mouseIntensity;
} mesh;
";

/// 3D simplex noise (Ashima Arts / Stefan Gustavson, MIT licensed).
/// `snoise(vec3) -> float` in roughly `[-1, 1]`.
const SIMPLEX_NOISE: &str = r"
vec3 mod289_3(vec3 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 mod289_4(vec4 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 permute(vec4 x) { return mod289_4(((x * 34.0) + 1.0) * x); }
vec4 taylorInvSqrt(vec4 r) { return 1.79284291400159 - 0.85373472095314 * r; }

float snoise(vec3 v) {
    vec2 C = vec2(1.0 / 6.0, 1.0 / 3.0);
    vec4 D = vec4(0.0, 0.5, 1.0, 2.0);

    vec3 i = floor(v + dot(v, C.yyy));
    vec3 x0 = v - i + dot(i, C.xxx);

    vec3 g = step(x0.yzx, x0.xyz);
    vec3 l = 1.0 - g;
    vec3 i1 = min(g.xyz, l.zxy);
    vec3 i2 = max(g.xyz, l.zxy);

    vec3 x1 = x0 - i1 + C.xxx;
    vec3 x2 = x0 - i2 + C.yyy;
    vec3 x3 = x0 - D.yyy;

    i = mod289_3(i);
    vec4 p = permute(permute(permute(
                i.z + vec4(0.0, i1.z, i2.z, 1.0))
              + i.y + vec4(0.0, i1.y, i2.y, 1.0))
              + i.x + vec4(0.0, i1.x, i2.x, 1.0));

    float n_ = 0.142857142857;
    vec3 ns = n_ * D.wyz - D.xzx;

    vec4 j = p - 49.0 * floor(p * ns.z * ns.z);
    vec4 x_ = floor(j * ns.z);
    vec4 y_ = floor(j - 7.0 * x_);

    vec4 x = x_ * ns.x + ns.yyyy;
    vec4 y = y_ * ns.x + ns.yyyy;
    vec4 h = 1.0 - abs(x) - abs(y);

    vec4 b0 = vec4(x.xy, y.xy);
    vec4 b1 = vec4(x.zw, y.zw);
    vec4 s0 = floor(b0) * 2.0 + 1.0;
    vec4 s1 = floor(b1) * 2.0 + 1.0;
    vec4 sh = -step(h, vec4(0.0));

    vec4 a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    vec4 a1 = b1.xzyw + s1.xzyw * sh.zzww;

    vec3 p0 = vec3(a0.xy, h.x);
    vec3 p1 = vec3(a0.zw, h.y);
    vec3 p2 = vec3(a1.xy, h.z);
    vec3 p3 = vec3(a1.zw, h.w);

    vec4 norm = taylorInvSqrt(vec4(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    vec4 m = max(0.6 - vec4(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), 0.0);
    m = m * m;
    return 42.0 * dot(m * m, vec4(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}
";

const VERTEX_BODY: &str = r"
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_uv;

layout(location = 0) out vec2 v_uv;
layout(location = 1) out float v_displacement;

float distortion(vec3 p) {
    float value = 0.0;
    float amplitude = 0.5;
    float frequency = 1.0;
    for (int octave = 0; octave < DISTORTION_OCTAVES; octave++) {
        value += amplitude * snoise(p * frequency);
        frequency *= 2.0;
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    vec2 st = vec2(a_uv.x * mesh.u_aspect, a_uv.y);
    vec2 pointer = vec2(mesh.u_mouse.x * mesh.u_aspect, mesh.u_mouse.y);
    float falloff = 1.0 - smoothstep(0.0, 0.6, distance(st, pointer));

    float noise = distortion(vec3(st * 1.5, mesh.u_time));
    float amplitude = 30.0 + 120.0 * mesh.u_mouseIntensity * falloff;

    vec4 world = mesh.u_model * vec4(a_position, 1.0);
    world.z += noise * amplitude;

    v_uv = a_uv;
    v_displacement = noise;
    gl_Position = mesh.u_viewProjection * world;
}
";

const FRAGMENT_BODY: &str = r"
layout(location = 0) in vec2 v_uv;
layout(location = 1) in float v_displacement;

layout(location = 0) out vec4 outColor;

void main() {
    float shade = clamp(0.5 + 0.5 * v_displacement, 0.0, 1.0);
    vec3 base = mix(vec3(0.05, 0.06, 0.11), vec3(0.42, 0.52, 0.96), shade);

    vec2 st = vec2(v_uv.x * mesh.u_aspect, v_uv.y);
    vec2 pointer = vec2(mesh.u_mouse.x * mesh.u_aspect, mesh.u_mouse.y);
    float glow = mesh.u_mouseIntensity * (1.0 - smoothstep(0.0, 0.35, distance(st, pointer)));

    float grain = snoise(vec3(v_uv * 240.0, mesh.u_time * 8.0)) * 0.015;
    outColor = vec4(base + glow * vec3(0.35, 0.22, 0.5) + grain, 1.0);
}
";
