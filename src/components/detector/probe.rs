//! Hardware support probe and the synthetic WebGL benchmark.
//!
//! The benchmark renders the High tier's own star and nebula programs on an
//! offscreen canvas, sized by [`DetectorConfig::particle_count`], and counts
//! frames delivered by `requestAnimationFrame` over a fixed window.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlCanvasElement, WebGlRenderingContext as GL};

use super::meter::ProgressObserver;
use super::sampler::{FpsSampler, SampleStep};
use crate::components::backdrop::gl::{self, NebulaUniforms, PointBuffer, Programs, STAR_STRIDE, StarUniforms};
use crate::components::backdrop::particles::{NebulaCloud, Star};
use crate::config::{DetectorConfig, TierProfile};
use crate::error::{BackdropError, js_message};

/// `UNMASKED_RENDERER_WEBGL` from `WEBGL_debug_renderer_info`.
const UNMASKED_RENDERER: u32 = 0x9246;

/// Coarse GPU classification from the renderer string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuClass {
	Discrete,
	Integrated,
	Unknown,
}

impl GpuClass {
	pub fn label(self) -> &'static str {
		match self {
			GpuClass::Discrete => "discrete",
			GpuClass::Integrated => "integrated",
			GpuClass::Unknown => "unknown",
		}
	}
}

/// Classify a WebGL renderer string. Software and virtual adapters count as
/// integrated.
pub fn classify_renderer(renderer: &str) -> GpuClass {
	let r = renderer.to_lowercase();
	let integrated = [
		"intel hd",
		"intel uhd",
		"intel(r) hd",
		"intel(r) uhd",
		"iris",
		"integrated",
		"radeon vega",
		"amd vega",
		"apple m",
		"apple gpu",
		"mali",
		"adreno",
		"powervr",
		"swiftshader",
		"llvmpipe",
		"microsoft basic",
		"vmware",
		"virtualbox",
		"qemu",
	];
	let discrete = ["nvidia", "geforce", "quadro", "rtx", "gtx", "radeon", "amd", "ati "];
	if integrated.iter().any(|k| r.contains(k)) {
		GpuClass::Integrated
	} else if discrete.iter().any(|k| r.contains(k)) {
		GpuClass::Discrete
	} else {
		GpuClass::Unknown
	}
}

/// Offscreen surface with a live WebGL context.
pub struct ProbeSurface {
	pub canvas: HtmlCanvasElement,
	pub gl: GL,
	/// Renderer string, unmasked when the browser allows it.
	pub renderer: Option<String>,
}

fn renderer_string(gl: &GL) -> Option<String> {
	let unmasked = gl
		.get_extension("WEBGL_debug_renderer_info")
		.ok()
		.flatten()
		.and_then(|_| gl.get_parameter(UNMASKED_RENDERER).ok())
		.and_then(|v| v.as_string());
	unmasked.or_else(|| gl.get_parameter(GL::RENDERER).ok().and_then(|v| v.as_string()))
}

/// Try to obtain a WebGL context on a detached canvas.
pub fn check_support(config: &DetectorConfig) -> Result<ProbeSurface, BackdropError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| BackdropError::UnsupportedCapability("no document".into()))?;
	let canvas: HtmlCanvasElement = document
		.create_element("canvas")
		.map_err(|e| BackdropError::UnsupportedCapability(js_message(&e)))?
		.dyn_into()
		.map_err(|_| BackdropError::UnsupportedCapability("canvas element has unexpected type".into()))?;
	canvas.set_width(config.surface_width);
	canvas.set_height(config.surface_height);

	let gl = gl::context(&canvas)?;
	let renderer = renderer_string(&gl);
	match &renderer {
		Some(r) => log::info!("starfield-backdrop: webgl renderer {r} ({})", classify_renderer(r).label()),
		None => log::info!("starfield-backdrop: webgl renderer hidden"),
	}
	Ok(ProbeSurface { canvas, gl, renderer })
}

/// GPU work for one benchmark frame.
struct BenchScene {
	gl: GL,
	programs: Programs,
	stars: PointBuffer,
	quad: PointBuffer,
	clouds: Vec<NebulaUniforms>,
	projection: [f32; 16],
	size: (i32, i32),
}

impl BenchScene {
	fn new(probe: &ProbeSurface, config: &DetectorConfig) -> Result<Self, BackdropError> {
		let gl = probe.gl.clone();
		let viewport = (config.surface_width as f64, config.surface_height as f64);
		let mut rng = crate::page_rng();
		let profile = TierProfile::high();

		let programs = Programs::new(&gl)?;
		let stars: Vec<Star> = (0..config.particle_count())
			.map(|_| Star::new(viewport, &profile, 1.0, &mut rng))
			.collect();
		let mut points = PointBuffer::new(&gl, STAR_STRIDE)?;
		points.upload(&gl, &gl::star_vertices(stars.iter(), viewport), GL::STATIC_DRAW);
		let mut quad = PointBuffer::new(&gl, 2)?;
		quad.upload(&gl, &gl::QUAD, GL::STATIC_DRAW);
		let clouds = (0..profile.nebula_count)
			.map(|_| NebulaUniforms::from_cloud(&NebulaCloud::new(viewport, &mut rng), viewport))
			.collect();

		Ok(Self {
			projection: gl::projection_for(viewport.0, viewport.1),
			size: (config.surface_width as i32, config.surface_height as i32),
			gl,
			programs,
			stars: points,
			quad,
			clouds,
		})
	}

	fn draw(&self, time: f32) -> Result<(), BackdropError> {
		gl::prepare_frame(&self.gl, self.size.0, self.size.1);
		for cloud in &self.clouds {
			gl::draw_nebula(&self.gl, &self.programs, &self.quad, &self.projection, cloud, time);
		}
		let uniforms = StarUniforms {
			offset: [0.0, 0.0],
			size_scale: 1.0,
			time,
		};
		gl::draw_stars(&self.gl, &self.programs, &self.stars, &self.projection, uniforms);
		match self.gl.get_error() {
			GL::NO_ERROR => Ok(()),
			code => Err(BackdropError::BenchmarkFailure(format!("webgl error 0x{code:04x}"))),
		}
	}
}

type Outcome = Rc<RefCell<Option<Result<f64, BackdropError>>>>;

/// Render the benchmark scene until the sampling window closes and return the
/// measured frames per second.
pub async fn run_benchmark(
	probe: &ProbeSurface,
	config: &DetectorConfig,
	observer: Option<Rc<dyn ProgressObserver>>,
) -> Result<f64, BackdropError> {
	let scene = BenchScene::new(probe, config)?;
	log::info!(
		"starfield-backdrop: benchmarking {} points for {:.0} ms",
		config.particle_count(),
		config.duration_ms
	);

	let window = web_sys::window().ok_or_else(|| BackdropError::BenchmarkFailure("no window".into()))?;
	let outcome: Outcome = Rc::new(RefCell::new(None));
	let resolver: Rc<RefCell<Option<Function>>> = Rc::new(RefCell::new(None));
	let done = Promise::new(&mut |resolve, _reject| {
		*resolver.borrow_mut() = Some(resolve);
	});

	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let (animate_inner, outcome_inner, config) = (animate.clone(), outcome.clone(), config.clone());
	let mut sampler: Option<FpsSampler> = None;
	*animate.borrow_mut() = Some(Closure::new(move |now: f64| {
		let sampler = sampler.get_or_insert_with(|| FpsSampler::new(&config, now));
		let finished = match sampler.frame(now) {
			SampleStep::Complete { fps } => Some(Ok(fps)),
			SampleStep::Running { report } => {
				if let (Some(progress), Some(obs)) = (report, observer.as_ref()) {
					obs.on_progress(progress);
				}
				scene.draw((now / 1000.0) as f32).err().map(Err)
			}
		};

		if let Some(result) = finished {
			*outcome_inner.borrow_mut() = Some(result);
			if let Some(resolve) = resolver.borrow_mut().take() {
				let _ = resolve.call0(&JsValue::NULL);
			}
			return;
		}
		if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
			let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	}));

	if let Some(cb) = animate.borrow().as_ref() {
		window
			.request_animation_frame(cb.as_ref().unchecked_ref())
			.map_err(|e| BackdropError::BenchmarkFailure(js_message(&e)))?;
	}
	JsFuture::from(done)
		.await
		.map_err(|e| BackdropError::BenchmarkFailure(js_message(&e)))?;
	animate.borrow_mut().take();

	outcome
		.borrow_mut()
		.take()
		.unwrap_or_else(|| Err(BackdropError::BenchmarkFailure("benchmark ended without a result".into())))
}
