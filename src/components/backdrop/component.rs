//! Leptos component hosting the animated backdrop.
//!
//! The Low tier renders on two stacked 2D canvases (nebula below, stars
//! above); the High tier renders on a single WebGL canvas. Both tiers share
//! the flythrough sprite images and the logo. An animation loop runs via
//! `requestAnimationFrame`, stepping the simulation and the active renderer
//! each frame. Pointer, leave, resize and orientation events are wired on the
//! window.

use std::cell::RefCell;
use std::rc::Rc;

use fastrand::Rng;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, DeviceOrientationEvent, Event, EventTarget, HtmlCanvasElement, HtmlElement,
	PointerEvent, Window,
};

use super::flythrough::{SpriteKind, SpritePose};
use super::gl::{self, GlRenderer};
use super::orientation::{self, OrientationAccess};
use super::parallax;
use super::render;
use super::simulation::SimulationContext;
use super::surface::CanvasSurface;
use crate::components::detector::Tier;
use crate::config::{BackdropConfig, TierAssets};
use crate::error::{BackdropError, js_message};

enum Renderer {
	Canvas { stars: CanvasSurface, nebula: CanvasSurface },
	WebGl(GlRenderer),
}

/// Everything the frame loop mutates.
struct BackdropContext {
	sim: SimulationContext,
	rng: Rng,
	renderer: Renderer,
	canvases: Vec<HtmlCanvasElement>,
	sprites: Vec<(SpriteKind, HtmlElement)>,
	shown: Option<SpriteKind>,
	sprite_container: Option<HtmlElement>,
	logo: Option<HtmlElement>,
	fallback_size: f64,
	started_ms: f64,
	last_frame_ms: Option<f64>,
}

type Listener = Closure<dyn FnMut(Event)>;

fn viewport_size(window: &Window) -> (f64, f64) {
	let read = |v: Result<JsValue, JsValue>, default: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(default);
	(read(window.inner_width(), 800.0), read(window.inner_height(), 600.0))
}

fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map(|p| p.now())
		.unwrap_or_default()
}

fn set_style(el: &HtmlElement, name: &str, value: &str) {
	if let Err(e) = el.style().set_property(name, value) {
		log::debug!("starfield-backdrop: style {name}: {}", js_message(&e));
	}
}

fn canvas_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, BackdropError> {
	canvas
		.get_context("2d")
		.map_err(|e| BackdropError::UnsupportedCapability(js_message(&e)))?
		.ok_or_else(|| BackdropError::UnsupportedCapability("no 2d context".into()))?
		.dyn_into()
		.map_err(|_| BackdropError::UnsupportedCapability("2d context has unexpected type".into()))
}

fn sprite_width(sprites: &[(SpriteKind, HtmlElement)], kind: SpriteKind) -> f64 {
	sprites
		.iter()
		.find(|(k, _)| *k == kind)
		.map(|(_, el)| el.offset_width() as f64)
		.unwrap_or_default()
}

impl BackdropContext {
	fn resize(&mut self, width: f64, height: f64) {
		for canvas in &self.canvases {
			canvas.set_width(width as u32);
			canvas.set_height(height as u32);
		}
		if let Renderer::Canvas { stars, nebula } = &mut self.renderer {
			stars.resize(width, height);
			nebula.resize(width, height);
		}
		self.sim.request_resize(width, height, now_ms());
	}

	fn frame(&mut self, now: f64) {
		let dt = self.last_frame_ms.map_or(0.0, |last| (now - last) / 1000.0);
		self.last_frame_ms = Some(now);

		self.sim.poll_rebuild(now, &mut self.rng);
		let sprites = &self.sprites;
		self.sim.step(dt, now, |kind| sprite_width(sprites, kind), &mut self.rng);

		let drawn = match &mut self.renderer {
			Renderer::Canvas { stars, nebula } => {
				let nebula_result = if self.sim.take_nebula_dirty() {
					render::draw_nebula_layer(nebula, &self.sim)
				} else {
					Ok(0)
				};
				nebula_result.and_then(|a| render::draw_stars_layer(stars, &self.sim).map(|b| a + b))
			}
			Renderer::WebGl(webgl) => webgl.render(&self.sim, (now - self.started_ms) / 1000.0).map(|_| 0),
		};
		match drawn {
			Ok(0) => {}
			Ok(skipped) => log::debug!("starfield-backdrop: skipped {skipped} particle draw(s)"),
			Err(e) => log::debug!("starfield-backdrop: frame skipped: {e}"),
		}

		self.place_sprite(self.sim.sprite());
		if let Some(logo) = &self.logo {
			let (x, y) = self.sim.parallax().logo_offset();
			set_style(logo, "transform", &format!("translate({x:.2}px, {y:.2}px)"));
		}
	}

	fn place_sprite(&mut self, pose: Option<SpritePose>) {
		let kind = pose.map(|p| p.kind);
		if kind != self.shown {
			for (k, el) in &self.sprites {
				set_style(el, "display", if Some(*k) == kind { "block" } else { "none" });
			}
			self.shown = kind;
		}
		let (Some(pose), Some(container)) = (pose, &self.sprite_container) else {
			return;
		};
		let width = sprite_width(&self.sprites, pose.kind);
		let size = if width > 0.0 { width } else { self.fallback_size };
		let half = size / 2.0;
		set_style(
			container,
			"transform",
			&format!(
				"translate({:.2}px, {:.2}px) rotate({:.2}deg)",
				pose.center.0 - half,
				pose.center.1 - half,
				pose.rotation
			),
		);
	}
}

fn element_by_id(id: &str) -> Option<HtmlElement> {
	web_sys::window()?
		.document()?
		.get_element_by_id(id)?
		.dyn_into()
		.ok()
}

fn listen(
	target: &EventTarget,
	name: &str,
	listeners: &Rc<RefCell<Vec<Listener>>>,
	handler: impl FnMut(Event) + 'static,
) {
	let cb: Listener = Closure::new(handler);
	if let Err(e) = target.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref()) {
		log::warn!("starfield-backdrop: cannot listen for {name}: {}", js_message(&e));
		return;
	}
	listeners.borrow_mut().push(cb);
}

/// Subscribe to device tilt once access is granted.
fn listen_orientation(context: Rc<RefCell<Option<BackdropContext>>>, listeners: Rc<RefCell<Vec<Listener>>>) {
	leptos::task::spawn_local(async move {
		match orientation::request_access().await {
			OrientationAccess::Granted => {
				let Some(window) = web_sys::window() else {
					return;
				};
				listen(&window, "deviceorientation", &listeners, move |ev: Event| {
					let Ok(ev) = ev.dyn_into::<DeviceOrientationEvent>() else {
						return;
					};
					let (Some(beta), Some(gamma)) = (ev.beta(), ev.gamma()) else {
						return;
					};
					if let Some(c) = context.borrow_mut().as_mut() {
						c.sim.orientation(beta, gamma, now_ms());
					}
				});
			}
			access => log::debug!("starfield-backdrop: tilt parallax off ({access:?})"),
		}
	});
}

/// Renders the animated backdrop for `tier`.
///
/// If a tier with a fallback cannot create its renderer, `on_gl_failure` is
/// called with the reason and nothing is animated; the caller is expected to
/// remount with the fallback tier. A failing canvas tier leaves the page static.
/// Only mouse pointers drive parallax; touch and pen rely on device tilt.
#[component]
pub fn Backdrop(
	tier: Tier,
	config: BackdropConfig,
	assets: TierAssets,
	#[prop(into)] logo: String,
	#[prop(optional)] on_gl_failure: Option<Callback<String>>,
) -> impl IntoView {
	let stars_ref = NodeRef::<leptos::html::Canvas>::new();
	let nebula_ref = NodeRef::<leptos::html::Canvas>::new();
	let webgl_ref = NodeRef::<leptos::html::Canvas>::new();
	let sprite_ref = NodeRef::<leptos::html::Div>::new();
	let logo_ref = NodeRef::<leptos::html::Div>::new();

	let context: Rc<RefCell<Option<BackdropContext>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let listeners: Rc<RefCell<Vec<Listener>>> = Rc::new(RefCell::new(Vec::new()));
	let setup = config;

	Effect::new(move |_| {
		let canvases: Vec<HtmlCanvasElement> = match tier {
			Tier::Low => match (stars_ref.get(), nebula_ref.get()) {
				(Some(s), Some(n)) => vec![s.into(), n.into()],
				_ => return,
			},
			Tier::High => match webgl_ref.get() {
				Some(c) => vec![c.into()],
				None => return,
			},
		};
		if context.borrow().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = viewport_size(&window);
		for canvas in &canvases {
			canvas.set_width(w as u32);
			canvas.set_height(h as u32);
		}

		let renderer = match tier {
			Tier::Low => canvas_2d(&canvases[0]).and_then(|stars| {
				let nebula = canvas_2d(&canvases[1])?;
				Ok(Renderer::Canvas {
					stars: CanvasSurface::new(stars, w, h),
					nebula: CanvasSurface::new(nebula, w, h),
				})
			}),
			Tier::High => gl::context(&canvases[0]).and_then(GlRenderer::new).map(Renderer::WebGl),
		};
		let renderer = match renderer {
			Ok(r) => r,
			Err(e) => {
				match (tier.fallback(), on_gl_failure) {
					(Some(_), Some(cb)) => {
						log::warn!("starfield-backdrop: {tier:?} renderer unavailable: {e}");
						cb.run(e.to_string());
					}
					_ => log::error!("starfield-backdrop: {tier:?} renderer unavailable, backdrop stays static: {e}"),
				}
				return;
			}
		};

		let mut rng = crate::page_rng();
		let profile = match tier {
			Tier::Low => &setup.tiers.low,
			Tier::High => &setup.tiers.high,
		};
		let now = now_ms();
		let sim = SimulationContext::new(profile, &setup, (w, h), now, &mut rng);
		let sprites = SpriteKind::ALL
			.iter()
			.filter_map(|k| element_by_id(k.id()).map(|el| (*k, el)))
			.collect();
		*context.borrow_mut() = Some(BackdropContext {
			sim,
			rng,
			renderer,
			canvases,
			sprites,
			shown: None,
			sprite_container: sprite_ref.get().map(Into::into),
			logo: logo_ref.get().map(Into::into),
			fallback_size: setup.flythrough.fallback_size,
			started_ms: now,
			last_frame_ms: None,
		});

		let ctx = context.clone();
		listen(&window, "pointermove", &listeners, move |ev: Event| {
			let Ok(ev) = ev.dyn_into::<PointerEvent>() else {
				return;
			};
			if !parallax::accepts_pointer(&ev.pointer_type()) {
				return;
			}
			if let Some(c) = ctx.borrow_mut().as_mut() {
				c.sim.pointer_move(ev.client_x() as f64, ev.client_y() as f64, now_ms());
			}
		});
		if let Some(document) = window.document() {
			let ctx = context.clone();
			listen(&document, "mouseleave", &listeners, move |_| {
				if let Some(c) = ctx.borrow_mut().as_mut() {
					c.sim.pointer_leave();
				}
			});
		}
		let ctx = context.clone();
		listen(&window, "resize", &listeners, move |_| {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = viewport_size(&win);
			if let Some(c) = ctx.borrow_mut().as_mut() {
				c.resize(nw, nh);
			}
		});

		if orientation::needs_gesture() {
			let (ctx, subs) = (context.clone(), listeners.clone());
			let asked = Rc::new(std::cell::Cell::new(false));
			listen(&window, "click", &listeners, move |_| {
				if !asked.replace(true) {
					listen_orientation(ctx.clone(), subs.clone());
				}
			});
		} else {
			listen_orientation(context.clone(), listeners.clone());
		}

		let (ctx, animate_inner) = (context.clone(), animate.clone());
		*animate.borrow_mut() = Some(Closure::new(move |now: f64| {
			if let Some(c) = ctx.borrow_mut().as_mut() {
				c.frame(now);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(cb) = animate.borrow().as_ref() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let layers = match tier {
		Tier::Low => view! {
			<canvas id="nebula-canvas" class="backdrop-layer" node_ref=nebula_ref />
			<canvas id="stars-canvas" class="backdrop-layer" node_ref=stars_ref />
		}
		.into_any(),
		Tier::High => view! { <canvas id="webgl-canvas" class="backdrop-layer" node_ref=webgl_ref /> }.into_any(),
	};
	let sprites = SpriteKind::ALL
		.iter()
		.map(|k| {
			view! {
				<img id=k.id() class="space-object" src=assets.image(&k.file()) alt="" style="display: none;" />
			}
		})
		.collect_view();

	view! {
		<div class="backdrop" data-tier=format!("{tier:?}").to_lowercase()>
			{layers}
			<div id="space-object-container" node_ref=sprite_ref>
				{sprites}
			</div>
			<div id="logo-container" node_ref=logo_ref>
				<img src=assets.image(&logo) alt="logo" class="logo" />
			</div>
		</div>
	}
}
