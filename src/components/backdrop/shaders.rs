//! GLSL programs and WebGL helpers shared by the WebGL tier and the benchmark.

use web_sys::{WebGlProgram, WebGlRenderingContext as GL, WebGlShader};

use crate::error::BackdropError;

/// Camera distance from the origin along +z, in world units.
pub const CAMERA_Z: f32 = 1000.0;
/// Vertical field of view in degrees.
pub const FOV_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 3000.0;

/// Star points: perspective-sized discs with two-frequency twinkle.
/// Attributes: position(3) color(3) size(1) random(1).
pub const STAR_VERT: &str = r#"
precision mediump float;
attribute vec3 a_position;
attribute vec3 a_color;
attribute float a_size;
attribute float a_random;
uniform mat4 u_projection;
uniform vec2 u_offset;
uniform float u_camera_z;
uniform float u_size_scale;
varying vec3 v_color;
varying float v_random;
void main() {
	v_color = a_color;
	v_random = a_random;
	vec4 mv = vec4(a_position.xy + u_offset, a_position.z - u_camera_z, 1.0);
	gl_PointSize = a_size * u_size_scale * (600.0 / -mv.z);
	gl_Position = u_projection * mv;
}
"#;

pub const STAR_FRAG: &str = r#"
precision mediump float;
uniform float u_time;
varying vec3 v_color;
varying float v_random;
void main() {
	float d = distance(gl_PointCoord, vec2(0.5, 0.5));
	if (d > 0.5) discard;
	float t1 = sin(u_time * 1.5 * v_random + v_random * 6.28);
	float t2 = sin(u_time * 0.8 * v_random + v_random * 3.14);
	float twinkle = 0.8 + 0.15 * t1 + 0.05 * t2;
	float alpha = (1.0 - smoothstep(0.3, 0.5, d)) * twinkle;
	gl_FragColor = vec4(v_color, alpha);
}
"#;

/// Nebula quads: unit square scaled and placed by uniforms.
/// Attributes: corner(2) in [0, 1].
pub const NEBULA_VERT: &str = r#"
precision mediump float;
attribute vec2 a_corner;
uniform mat4 u_projection;
uniform vec3 u_center;
uniform float u_size;
uniform float u_rotation;
uniform float u_camera_z;
varying vec2 v_uv;
void main() {
	v_uv = a_corner;
	vec2 local = (a_corner - 0.5) * u_size;
	float c = cos(u_rotation);
	float s = sin(u_rotation);
	vec2 p = vec2(c * local.x - s * local.y, s * local.x + c * local.y);
	gl_Position = u_projection * vec4(u_center.xy + p, u_center.z - u_camera_z, 1.0);
}
"#;

/// Seven-octave fBm with domain warping and an edge fade that hides the quad.
pub const NEBULA_FRAG: &str = r#"
precision mediump float;
uniform float u_time;
uniform vec3 u_color;
uniform vec2 u_seed;
uniform float u_intensity;
varying vec2 v_uv;
float random(vec2 st) { return fract(sin(dot(st, vec2(12.9898, 78.233))) * 43758.5453123); }
float noise(vec2 st) {
	vec2 i = floor(st);
	vec2 f = fract(st);
	float a = random(i);
	float b = random(i + vec2(1.0, 0.0));
	float c = random(i + vec2(0.0, 1.0));
	float d = random(i + vec2(1.0, 1.0));
	vec2 u = f * f * (3.0 - 2.0 * f);
	return mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.y * u.x;
}
float fbm(vec2 st) {
	float value = 0.0;
	float amplitude = 0.5;
	for (int i = 0; i < 7; i++) {
		value += amplitude * noise(st);
		st *= 2.1;
		amplitude *= 0.45;
	}
	return value;
}
void main() {
	vec2 st = v_uv * 3.0 + u_seed;
	vec2 q = vec2(fbm(st + 0.05 * u_time), fbm(st + vec2(1.0)));
	vec2 r = vec2(
		fbm(st + q + vec2(1.7, 9.2) + 0.08 * u_time),
		fbm(st + q + vec2(8.3, 2.8) + 0.063 * u_time));
	float f = fbm(st + r);
	vec3 color = mix(vec3(0.035, 0.0, 0.115), u_color, f * f * 1.5);
	float edge = smoothstep(0.0, 0.3, v_uv.x) * smoothstep(1.0, 0.7, v_uv.x)
		* smoothstep(0.0, 0.3, v_uv.y) * smoothstep(1.0, 0.7, v_uv.y);
	float alpha = smoothstep(0.4, 0.7, f) * 0.25 * edge * u_intensity;
	gl_FragColor = vec4(color, alpha);
}
"#;

/// Trail points grow as they fade. Attributes: position(3) alpha(1).
pub const TRAIL_VERT: &str = r#"
precision mediump float;
attribute vec3 a_position;
attribute float a_alpha;
uniform mat4 u_projection;
uniform float u_camera_z;
varying float v_alpha;
void main() {
	v_alpha = a_alpha;
	gl_PointSize = (1.0 - a_alpha) * 4.0 + 1.0;
	gl_Position = u_projection * vec4(a_position.xy, a_position.z - u_camera_z, 1.0);
}
"#;

pub const TRAIL_FRAG: &str = r#"
precision mediump float;
uniform vec3 u_color;
varying float v_alpha;
void main() {
	float d = distance(gl_PointCoord, vec2(0.5, 0.5));
	if (d > 0.5) discard;
	gl_FragColor = vec4(u_color, v_alpha * (1.0 - d * 2.0));
}
"#;

/// Compile one shader stage, surfacing the driver log on failure.
pub fn compile_shader(gl: &GL, src: &str, shader_type: u32) -> Result<WebGlShader, BackdropError> {
	let shader = gl
		.create_shader(shader_type)
		.ok_or_else(|| BackdropError::BenchmarkFailure("could not create shader".into()))?;
	gl.shader_source(&shader, src);
	gl.compile_shader(&shader);
	if !gl
		.get_shader_parameter(&shader, GL::COMPILE_STATUS)
		.as_bool()
		.unwrap_or(false)
	{
		let log = gl.get_shader_info_log(&shader).unwrap_or_default();
		gl.delete_shader(Some(&shader));
		return Err(BackdropError::BenchmarkFailure(format!("shader compile: {log}")));
	}
	Ok(shader)
}

/// Compile and link a vertex/fragment pair.
pub fn link_program(gl: &GL, vert_src: &str, frag_src: &str) -> Result<WebGlProgram, BackdropError> {
	let vert = compile_shader(gl, vert_src, GL::VERTEX_SHADER)?;
	let frag = compile_shader(gl, frag_src, GL::FRAGMENT_SHADER)?;
	let program = gl
		.create_program()
		.ok_or_else(|| BackdropError::BenchmarkFailure("could not create program".into()))?;
	gl.attach_shader(&program, &vert);
	gl.attach_shader(&program, &frag);
	gl.link_program(&program);
	if !gl
		.get_program_parameter(&program, GL::LINK_STATUS)
		.as_bool()
		.unwrap_or(false)
	{
		let log = gl.get_program_info_log(&program).unwrap_or_default();
		return Err(BackdropError::BenchmarkFailure(format!("program link: {log}")));
	}
	Ok(program)
}

/// Column-major perspective projection.
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> [f32; 16] {
	let f = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
	let range = 1.0 / (near - far);
	[
		f / aspect,
		0.0,
		0.0,
		0.0,
		0.0,
		f,
		0.0,
		0.0,
		0.0,
		0.0,
		(far + near) * range,
		-1.0,
		0.0,
		0.0,
		2.0 * far * near * range,
		0.0,
	]
}

/// Half-height of the visible plane at the origin, in world units.
pub fn visible_half_height() -> f32 {
	CAMERA_Z * (FOV_DEGREES.to_radians() / 2.0).tan()
}
