//! WebGL renderer for the High tier.
//!
//! Stars are split into one point buffer per depth bucket so each bucket can
//! take its own parallax offset as a single uniform. Buffers are uploaded
//! when the simulation generation changes; the trail buffer is rewritten
//! every frame. The benchmark drives the same programs through [`Programs`],
//! [`PointBuffer`] and the `draw_*` functions.
//!
//! Simulation positions are in pixels. A point at depth `z` is placed so it
//! projects back onto its pixel position, which keeps both tiers' layouts
//! identical while the camera supplies perspective sizing.

use js_sys::Float32Array;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as GL};

use super::parallax::DepthBucket;
use super::particles::{NebulaCloud, Star};
use super::shaders::{self, CAMERA_Z, FAR_PLANE, FOV_DEGREES, NEAR_PLANE};
use super::simulation::SimulationContext;
use super::theme;
use crate::error::{BackdropError, js_message};

/// Floats per star vertex: position(3) color(3) size(1) random(1).
pub const STAR_STRIDE: usize = 8;
/// Floats per trail vertex: position(3) alpha(1).
pub const TRAIL_STRIDE: usize = 4;
/// World z of the nearest and farthest stars.
const NEAREST_Z: f32 = 400.0;
const FARTHEST_Z: f32 = -1000.0;
/// Nebula planes sit behind every star.
const NEBULA_Z: f32 = -1400.0;

/// WebGL 1 context for `canvas`, trying the prefixed name as a fallback.
pub fn context(canvas: &HtmlCanvasElement) -> Result<GL, BackdropError> {
	for name in ["webgl", "experimental-webgl"] {
		match canvas.get_context(name) {
			Ok(Some(ctx)) => {
				if let Ok(gl) = ctx.dyn_into::<GL>() {
					return Ok(gl);
				}
			}
			Ok(None) => {}
			Err(e) => return Err(BackdropError::UnsupportedCapability(js_message(&e))),
		}
	}
	Err(BackdropError::UnsupportedCapability("no webgl context".into()))
}

fn gl_fault(what: &str) -> BackdropError {
	BackdropError::PerFrameFault(format!("webgl: {what}"))
}

/// World z for a normalized depth.
pub fn depth_to_z(depth: f64) -> f32 {
	NEAREST_Z + (FARTHEST_Z - NEAREST_Z) * depth.clamp(0.0, 1.0) as f32
}

/// World units per screen pixel on the plane at `z`.
pub fn world_per_pixel(z: f32, viewport_height: f64) -> f32 {
	let half = (CAMERA_Z - z) * (FOV_DEGREES.to_radians() / 2.0).tan();
	half / (viewport_height.max(1.0) as f32 / 2.0)
}

/// World position of a pixel on the plane at `z`.
pub fn pixel_to_world(x: f64, y: f64, z: f32, viewport: (f64, f64)) -> [f32; 3] {
	let s = world_per_pixel(z, viewport.1);
	[
		(x - viewport.0 / 2.0) as f32 * s,
		-(y - viewport.1 / 2.0) as f32 * s,
		z,
	]
}

/// Depth of the middle of a bucket, used for its parallax scale.
fn bucket_z(bucket: DepthBucket) -> f32 {
	match bucket {
		DepthBucket::Near => depth_to_z(0.165),
		DepthBucket::Mid => depth_to_z(0.495),
		DepthBucket::Far => depth_to_z(0.83),
	}
}

/// Interleaved vertex data for the given stars.
pub fn star_vertices<'a>(stars: impl Iterator<Item = &'a Star>, viewport: (f64, f64)) -> Vec<f32> {
	let mut out = Vec::new();
	for star in stars {
		let z = depth_to_z(star.depth);
		let [x, y, z] = pixel_to_world(star.x, star.y, z, viewport);
		let [r, g, b] = star.color.to_gl();
		out.extend_from_slice(&[x, y, z, r, g, b, star.size as f32 * 2.0, star.seed as f32]);
	}
	out
}

/// Compiled programs for every High-tier layer.
pub struct Programs {
	pub star: WebGlProgram,
	pub nebula: WebGlProgram,
	pub trail: WebGlProgram,
}

impl Programs {
	pub fn new(gl: &GL) -> Result<Self, BackdropError> {
		Ok(Self {
			star: shaders::link_program(gl, shaders::STAR_VERT, shaders::STAR_FRAG)?,
			nebula: shaders::link_program(gl, shaders::NEBULA_VERT, shaders::NEBULA_FRAG)?,
			trail: shaders::link_program(gl, shaders::TRAIL_VERT, shaders::TRAIL_FRAG)?,
		})
	}
}

/// A vertex buffer and how many vertices it holds.
pub struct PointBuffer {
	buffer: WebGlBuffer,
	stride: usize,
	count: i32,
}

impl PointBuffer {
	pub fn new(gl: &GL, stride: usize) -> Result<Self, BackdropError> {
		let buffer = gl
			.create_buffer()
			.ok_or_else(|| BackdropError::BenchmarkFailure("could not create buffer".into()))?;
		Ok(Self { buffer, stride, count: 0 })
	}

	pub fn upload(&mut self, gl: &GL, data: &[f32], usage: u32) {
		gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.buffer));
		let array = Float32Array::from(data);
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, usage);
		self.count = (data.len() / self.stride) as i32;
	}

	pub fn count(&self) -> i32 {
		self.count
	}
}

/// Enable `(name, size)` attributes laid out back to back; returns the
/// enabled locations for [`disable`].
fn bind_attributes(gl: &GL, program: &WebGlProgram, stride: usize, layout: &[(&str, i32)]) -> Vec<u32> {
	let mut enabled = Vec::with_capacity(layout.len());
	let mut offset = 0;
	for (name, size) in layout {
		let loc = gl.get_attrib_location(program, name);
		if loc >= 0 {
			let loc = loc as u32;
			gl.enable_vertex_attrib_array(loc);
			gl.vertex_attrib_pointer_with_i32(loc, *size, GL::FLOAT, false, (stride * 4) as i32, offset * 4);
			enabled.push(loc);
		}
		offset += size;
	}
	enabled
}

fn disable(gl: &GL, locations: &[u32]) {
	for loc in locations {
		gl.disable_vertex_attrib_array(*loc);
	}
}

fn set_f32(gl: &GL, program: &WebGlProgram, name: &str, value: f32) {
	gl.uniform1f(gl.get_uniform_location(program, name).as_ref(), value);
}

/// Per-layer star uniforms.
#[derive(Clone, Copy, Debug)]
pub struct StarUniforms {
	pub offset: [f32; 2],
	pub size_scale: f32,
	pub time: f32,
}

pub fn draw_stars(gl: &GL, programs: &Programs, points: &PointBuffer, projection: &[f32; 16], u: StarUniforms) {
	if points.count == 0 {
		return;
	}
	let p = &programs.star;
	gl.use_program(Some(p));
	gl.bind_buffer(GL::ARRAY_BUFFER, Some(&points.buffer));
	let enabled = bind_attributes(
		gl,
		p,
		STAR_STRIDE,
		&[("a_position", 3), ("a_color", 3), ("a_size", 1), ("a_random", 1)],
	);
	gl.uniform_matrix4fv_with_f32_array(gl.get_uniform_location(p, "u_projection").as_ref(), false, projection);
	gl.uniform2f(gl.get_uniform_location(p, "u_offset").as_ref(), u.offset[0], u.offset[1]);
	set_f32(gl, p, "u_camera_z", CAMERA_Z);
	set_f32(gl, p, "u_size_scale", u.size_scale);
	set_f32(gl, p, "u_time", u.time);
	gl.draw_arrays(GL::POINTS, 0, points.count);
	disable(gl, &enabled);
}

/// Placement and look of one nebula quad.
#[derive(Clone, Copy, Debug)]
pub struct NebulaUniforms {
	pub center: [f32; 3],
	pub size: f32,
	pub rotation: f32,
	pub color: [f32; 3],
	pub seed: [f32; 2],
	pub intensity: f32,
}

impl NebulaUniforms {
	pub fn from_cloud(cloud: &NebulaCloud, viewport: (f64, f64)) -> Self {
		let z = NEBULA_Z - 300.0 * cloud.depth as f32;
		let s = world_per_pixel(z, viewport.1);
		Self {
			center: pixel_to_world(cloud.x, cloud.y, z, viewport),
			size: cloud.radius as f32 * 2.0 * s,
			rotation: cloud.rotation as f32,
			color: cloud.color.to_gl(),
			seed: [cloud.seed.0 as f32, cloud.seed.1 as f32],
			intensity: (cloud.max_opacity / 0.15) as f32,
		}
	}
}

/// Unit quad as a triangle strip.
pub const QUAD: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

pub fn draw_nebula(
	gl: &GL,
	programs: &Programs,
	quad: &PointBuffer,
	projection: &[f32; 16],
	u: &NebulaUniforms,
	time: f32,
) {
	let p = &programs.nebula;
	gl.use_program(Some(p));
	gl.bind_buffer(GL::ARRAY_BUFFER, Some(&quad.buffer));
	let enabled = bind_attributes(gl, p, 2, &[("a_corner", 2)]);
	gl.uniform_matrix4fv_with_f32_array(gl.get_uniform_location(p, "u_projection").as_ref(), false, projection);
	gl.uniform3f(
		gl.get_uniform_location(p, "u_center").as_ref(),
		u.center[0],
		u.center[1],
		u.center[2],
	);
	set_f32(gl, p, "u_size", u.size);
	set_f32(gl, p, "u_rotation", u.rotation);
	set_f32(gl, p, "u_camera_z", CAMERA_Z);
	set_f32(gl, p, "u_time", time);
	set_f32(gl, p, "u_intensity", u.intensity);
	gl.uniform3f(gl.get_uniform_location(p, "u_color").as_ref(), u.color[0], u.color[1], u.color[2]);
	gl.uniform2f(gl.get_uniform_location(p, "u_seed").as_ref(), u.seed[0], u.seed[1]);
	gl.draw_arrays(GL::TRIANGLE_STRIP, 0, quad.count);
	disable(gl, &enabled);
}

fn draw_trail(gl: &GL, programs: &Programs, points: &PointBuffer, projection: &[f32; 16]) {
	if points.count == 0 {
		return;
	}
	let p = &programs.trail;
	gl.use_program(Some(p));
	gl.bind_buffer(GL::ARRAY_BUFFER, Some(&points.buffer));
	let enabled = bind_attributes(gl, p, TRAIL_STRIDE, &[("a_position", 3), ("a_alpha", 1)]);
	gl.uniform_matrix4fv_with_f32_array(gl.get_uniform_location(p, "u_projection").as_ref(), false, projection);
	set_f32(gl, p, "u_camera_z", CAMERA_Z);
	let [r, g, b] = theme::TRAIL.to_gl();
	gl.uniform3f(gl.get_uniform_location(p, "u_color").as_ref(), r, g, b);
	gl.draw_arrays(GL::POINTS, 0, points.count);
	disable(gl, &enabled);
}

/// Transparent clear and additive blending for glowing layers.
pub fn prepare_frame(gl: &GL, width: i32, height: i32) {
	gl.viewport(0, 0, width, height);
	gl.clear_color(0.0, 0.0, 0.0, 0.0);
	gl.clear(GL::COLOR_BUFFER_BIT);
	gl.disable(GL::DEPTH_TEST);
	gl.enable(GL::BLEND);
	gl.blend_func(GL::SRC_ALPHA, GL::ONE);
}

pub fn projection_for(width: f64, height: f64) -> [f32; 16] {
	let aspect = (width / height.max(1.0)) as f32;
	shaders::perspective(FOV_DEGREES, aspect, NEAR_PLANE, FAR_PLANE)
}

/// Draws a [`SimulationContext`] through WebGL.
pub struct GlRenderer {
	gl: GL,
	programs: Programs,
	layers: [PointBuffer; 3],
	quad: PointBuffer,
	trail: PointBuffer,
	uploaded: Option<u64>,
}

impl GlRenderer {
	pub fn new(gl: GL) -> Result<Self, BackdropError> {
		let programs = Programs::new(&gl)?;
		let layers = [
			PointBuffer::new(&gl, STAR_STRIDE)?,
			PointBuffer::new(&gl, STAR_STRIDE)?,
			PointBuffer::new(&gl, STAR_STRIDE)?,
		];
		let mut quad = PointBuffer::new(&gl, 2)?;
		quad.upload(&gl, &QUAD, GL::STATIC_DRAW);
		let trail = PointBuffer::new(&gl, TRAIL_STRIDE)?;
		log::info!("starfield-backdrop: webgl renderer ready");
		Ok(Self {
			gl,
			programs,
			layers,
			quad,
			trail,
			uploaded: None,
		})
	}

	fn upload_stars(&mut self, sim: &SimulationContext) {
		let viewport = sim.viewport();
		for bucket in DepthBucket::ALL {
			let stars = sim
				.stars()
				.iter()
				.filter_map(|p| p.as_star())
				.filter(|s| s.bucket == bucket);
			let data = star_vertices(stars, viewport);
			self.layers[bucket.index()].upload(&self.gl, &data, GL::STATIC_DRAW);
		}
		self.uploaded = Some(sim.generation());
		log::debug!(
			"starfield-backdrop: uploaded star layers {:?}",
			self.layers.iter().map(PointBuffer::count).collect::<Vec<_>>()
		);
	}

	/// Draw one frame. `time` is in seconds since mount.
	pub fn render(&mut self, sim: &SimulationContext, time: f64) -> Result<(), BackdropError> {
		if self.gl.is_context_lost() {
			return Err(gl_fault("context lost"));
		}
		if self.uploaded != Some(sim.generation()) {
			self.upload_stars(sim);
		}

		let (w, h) = sim.viewport();
		let projection = projection_for(w, h);
		prepare_frame(&self.gl, w as i32, h as i32);

		for cloud in sim.nebulae().iter().filter_map(|p| p.as_nebula()) {
			let u = NebulaUniforms::from_cloud(cloud, (w, h));
			draw_nebula(&self.gl, &self.programs, &self.quad, &projection, &u, time as f32);
		}

		let view = sim.view();
		for bucket in DepthBucket::ALL {
			let (dx, dy) = view.of(bucket);
			let s = world_per_pixel(bucket_z(bucket), h);
			let uniforms = StarUniforms {
				offset: [dx as f32 * s, -dy as f32 * s],
				size_scale: 1.0,
				time: time as f32,
			};
			draw_stars(&self.gl, &self.programs, &self.layers[bucket.index()], &projection, uniforms);
		}

		let mut data = Vec::with_capacity(sim.trail().capacity() * TRAIL_STRIDE);
		for spark in sim.trail().iter().filter_map(|p| p.as_trail()) {
			let [x, y, z] = pixel_to_world(spark.x, spark.y, 0.0, (w, h));
			data.extend_from_slice(&[x, y, z, spark.alpha.clamp(0.0, 1.0) as f32]);
		}
		self.trail.upload(&self.gl, &data, GL::DYNAMIC_DRAW);
		draw_trail(&self.gl, &self.programs, &self.trail, &projection);

		match self.gl.get_error() {
			GL::NO_ERROR => Ok(()),
			code => Err(gl_fault(&format!("error 0x{code:04x}"))),
		}
	}
}
