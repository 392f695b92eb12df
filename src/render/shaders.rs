/// Shared frame uniforms, tone mapping and equirectangular lookup.
/// Prepended to both the mesh and background shaders.
const COMMON: &str = r#"
const PI: f32 = 3.14159265359;
const MAX_LIGHTS: u32 = 8u;

const LIGHT_AMBIENT: f32 = 0.0;
const LIGHT_DIRECTIONAL: f32 = 1.0;

struct Light {
    // xyz position, w kind
    position: vec4<f32>,
    // rgb color * intensity
    color: vec4<f32>,
    // x cutoff distance, y decay
    params: vec4<f32>,
};

struct Frame {
    view_proj: mat4x4<f32>,
    inv_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    // rgb mean radiance, w lighting enabled
    env_ambient: vec4<f32>,
    // x exposure, y tone mapping, z light count, w background enabled
    params: vec4<f32>,
    lights: array<Light, 8>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;
@group(0) @binding(1)
var env_map: texture_2d<f32>;
@group(0) @binding(2)
var env_sampler: sampler;

fn rrt_and_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color: vec3<f32>, exposure: f32) -> vec3<f32> {
    let input_mat = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let output_mat = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var c = color * exposure / 0.6;
    c = input_mat * c;
    c = rrt_and_odt_fit(c);
    c = output_mat * c;
    return clamp(c, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn tone_map(color: vec3<f32>) -> vec3<f32> {
    if (frame.params.y > 0.5) {
        return aces_filmic(color, frame.params.x);
    }
    return color;
}

// Texture row 0 is the top of the panorama
fn equirect_uv(dir: vec3<f32>) -> vec2<f32> {
    let u = atan2(dir.z, dir.x) / (2.0 * PI) + 0.5;
    let v = 0.5 - asin(clamp(dir.y, -1.0, 1.0)) / PI;
    return vec2<f32>(u, v);
}

fn sample_env(dir: vec3<f32>) -> vec3<f32> {
    return textureSampleLevel(env_map, env_sampler, equirect_uv(dir), 0.0).rgb;
}
"#;

const MESH: &str = r#"
struct Part {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    // rgb linear color, a opacity
    color: vec4<f32>,
    // rgb emissive * intensity
    emissive: vec4<f32>,
    // x roughness, y metalness, z normal map bound, w blended
    pbr: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> part: Part;
@group(1) @binding(1)
var color_map: texture_2d<f32>;
@group(1) @binding(2)
var roughness_map: texture_2d<f32>;
@group(1) @binding(3)
var normal_map: texture_2d<f32>;
@group(1) @binding(4)
var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = part.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = frame.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (part.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    return out;
}

// Cotangent frame from screen-space derivatives; no vertex tangents needed.
// Map green points towards decreasing v.
fn perturb_normal(
    n: vec3<f32>,
    q0: vec3<f32>,
    q1: vec3<f32>,
    st0: vec2<f32>,
    st1: vec2<f32>,
    map_n: vec3<f32>,
) -> vec3<f32> {
    let q1perp = cross(q1, n);
    let q0perp = cross(n, q0);
    let t = q1perp * st0.x + q0perp * st1.x;
    let b = q1perp * st0.y + q0perp * st1.y;
    let det = max(dot(t, t), dot(b, b));
    let scale = select(inverseSqrt(det), 0.0, det == 0.0);
    return normalize(t * (map_n.x * scale) - b * (map_n.y * scale) + n * map_n.z);
}

fn distribution_ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

fn visibility_smith(n_dot_l: f32, n_dot_v: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let gv = n_dot_l * sqrt(a2 + (1.0 - a2) * n_dot_v * n_dot_v);
    let gl = n_dot_v * sqrt(a2 + (1.0 - a2) * n_dot_l * n_dot_l);
    return 0.5 / max(gv + gl, 1e-6);
}

fn fresnel_schlick(f0: vec3<f32>, v_dot_h: f32) -> vec3<f32> {
    return f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - v_dot_h, 5.0);
}

fn env_brdf_approx(f0: vec3<f32>, roughness: f32, n_dot_v: f32) -> vec3<f32> {
    let c0 = vec4<f32>(-1.0, -0.0275, -0.572, 0.022);
    let c1 = vec4<f32>(1.0, 0.0425, 1.04, -0.04);
    let r = roughness * c0 + c1;
    let a004 = min(r.x * r.x, exp2(-9.28 * n_dot_v)) * r.x + r.y;
    let ab = vec2<f32>(-1.04, 1.04) * a004 + r.zw;
    return f0 * ab.x + ab.y;
}

fn distance_attenuation(distance: f32, cutoff: f32, decay: f32) -> f32 {
    var falloff = 1.0 / max(pow(distance, decay), 0.01);
    if (cutoff > 0.0) {
        let ratio = clamp(1.0 - pow(distance / cutoff, 4.0), 0.0, 1.0);
        falloff = falloff * ratio * ratio;
    }
    return falloff;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    let base = textureSample(color_map, material_sampler, in.uv);
    let rough_texel = textureSample(roughness_map, material_sampler, in.uv);
    let map_n = textureSample(normal_map, material_sampler, in.uv).xyz * 2.0 - 1.0;
    let q0 = dpdx(in.world_position);
    let q1 = dpdy(in.world_position);
    let st0 = dpdx(in.uv);
    let st1 = dpdy(in.uv);

    var n = normalize(in.world_normal);
    if (!front_facing) {
        n = -n;
    }
    if (part.pbr.z > 0.5) {
        n = perturb_normal(n, q0, q1, st0, st1, map_n);
    }

    let albedo = part.color.rgb * base.rgb;
    let alpha = part.color.a * base.a;
    let roughness = clamp(part.pbr.x * rough_texel.g, 0.0525, 1.0);
    let metalness = clamp(part.pbr.y, 0.0, 1.0);
    let diffuse_color = albedo * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), albedo, metalness);
    let a = roughness * roughness;

    let v = normalize(frame.camera_position.xyz - in.world_position);
    let n_dot_v = clamp(abs(dot(n, v)), 1e-4, 1.0);

    var diffuse = vec3<f32>(0.0);
    var specular = vec3<f32>(0.0);

    let count = min(u32(frame.params.z), MAX_LIGHTS);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = frame.lights[i];
        if (light.position.w == LIGHT_AMBIENT) {
            diffuse += light.color.rgb * diffuse_color / PI;
            continue;
        }

        var l: vec3<f32>;
        var radiance = light.color.rgb;
        if (light.position.w == LIGHT_DIRECTIONAL) {
            l = normalize(light.position.xyz);
        } else {
            let to_light = light.position.xyz - in.world_position;
            let distance = length(to_light);
            l = to_light / max(distance, 1e-4);
            radiance *= distance_attenuation(distance, light.params.x, light.params.y);
        }

        let n_dot_l = clamp(dot(n, l), 0.0, 1.0);
        let h = normalize(l + v);
        let n_dot_h = clamp(dot(n, h), 0.0, 1.0);
        let v_dot_h = clamp(dot(v, h), 0.0, 1.0);
        let irradiance = radiance * n_dot_l;

        diffuse += irradiance * diffuse_color / PI;
        specular += irradiance * fresnel_schlick(f0, v_dot_h)
            * distribution_ggx(n_dot_h, a)
            * visibility_smith(n_dot_l, n_dot_v, a);
    }

    if (frame.env_ambient.w > 0.5) {
        diffuse += frame.env_ambient.rgb * diffuse_color;
        let r = reflect(-v, n);
        let reflected = mix(sample_env(r), frame.env_ambient.rgb, roughness);
        specular += reflected * env_brdf_approx(f0, roughness, n_dot_v);
    }

    let color = tone_map(diffuse + specular + part.emissive.rgb);
    if (part.pbr.w > 0.5) {
        return vec4<f32>(color, alpha);
    }
    return vec4<f32>(color, 1.0);
}
"#;

const BACKGROUND: &str = r#"
struct BackgroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

// Fullscreen triangle on the far plane
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> BackgroundOutput {
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index >> 1u) * 4 - 1);
    var out: BackgroundOutput;
    out.clip_position = vec4<f32>(x, y, 1.0, 1.0);
    out.ndc = vec2<f32>(x, y);
    return out;
}

@fragment
fn fs_main(in: BackgroundOutput) -> @location(0) vec4<f32> {
    let far = frame.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w - frame.camera_position.xyz);
    return vec4<f32>(tone_map(sample_env(dir)), 1.0);
}
"#;

/// Fullscreen chromatic split: red and blue sampled at opposite offsets
pub const RGB_SHIFT_SHADER: &str = r#"
struct Shift {
    // x amount, y angle
    params: vec4<f32>,
};

@group(0) @binding(0)
var source: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
@group(0) @binding(2)
var<uniform> shift: Shift;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index >> 1u) * 4 - 1);
    var out: VertexOutput;
    out.clip_position = vec4<f32>(x, y, 0.0, 1.0);
    out.uv = vec2<f32>((x + 1.0) * 0.5, (1.0 - y) * 0.5);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let offset = shift.params.x * vec2<f32>(cos(shift.params.y), sin(shift.params.y));
    let cr = textureSample(source, source_sampler, in.uv + offset);
    let cga = textureSample(source, source_sampler, in.uv);
    let cb = textureSample(source, source_sampler, in.uv - offset);
    return vec4<f32>(cr.r, cga.g, cb.b, cga.a);
}
"#;

/// Lit, textured mesh shader (group 0: frame, group 1: part)
pub fn mesh_shader() -> String {
    format!("{}{}", COMMON, MESH)
}

/// Equirectangular environment background (group 0 only)
pub fn background_shader() -> String {
    format!("{}{}", COMMON, BACKGROUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_expose_entry_points() {
        for source in [mesh_shader(), background_shader(), RGB_SHIFT_SHADER.to_string()] {
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
    }

    #[test]
    fn light_array_matches_uniform_capacity() {
        assert!(COMMON.contains("array<Light, 8>"));
        assert_eq!(super::super::gpu::MAX_LIGHTS, 8);
    }
}
