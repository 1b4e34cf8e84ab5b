//! Star, shooting star, nebula and trail particles.
//!
//! All kinds share one capability set through [`Particle`]: `update` advances
//! the lifecycle by `dt` seconds, `draw` renders through a [`Surface`] with the
//! frame's parallax applied, and `is_expired` tells the owner to drop or reuse
//! the slot. Positions are in viewport pixels; depth is normalized to [0, 1).

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use fastrand::Rng;

use super::parallax::{DepthBucket, ParallaxView};
use super::surface::Surface;
use super::theme::{self, Color, StreakColors};
use crate::config::{EffectsConfig, TierProfile, TrailConfig};
use crate::error::BackdropError;

/// Reference rate for per-frame probabilities.
const REFERENCE_FPS: f64 = 60.0;
/// Twinkle amplitude around a star's base opacity.
const TWINKLE_AMPLITUDE: f64 = 0.3;
/// Flare cross rotation speed, radians per second.
const FLARE_SPIN: f64 = 0.3;
/// Channel boost for flare rays.
const FLARE_BRIGHTEN: u8 = 70;

/// Probability that an event with per-frame `chance` (at 60 FPS) fires during `dt`.
pub fn chance_in(chance: f64, dt: f64) -> f64 {
	1.0 - (1.0 - chance.clamp(0.0, 1.0)).powf(dt * REFERENCE_FPS)
}

fn range(rng: &mut Rng, min: f64, max: f64) -> f64 {
	min + rng.f64() * (max - min)
}

fn finite(kind: &str, values: &[f64]) -> Result<(), BackdropError> {
	if values.iter().all(|v| v.is_finite()) {
		Ok(())
	} else {
		Err(BackdropError::PerFrameFault(format!("{kind} state is not finite")))
	}
}

/// Per-frame inputs shared by every particle update.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
	/// Seconds since the previous frame.
	pub dt: f64,
	pub viewport: (f64, f64),
	pub effects: &'a EffectsConfig,
	/// Chance that an idle star starts a flare this frame.
	pub flare_probability: f64,
}

impl<'a> FrameContext<'a> {
	pub fn new(dt: f64, viewport: (f64, f64), effects: &'a EffectsConfig) -> Self {
		Self {
			dt,
			viewport,
			effects,
			flare_probability: chance_in(effects.flare_chance, dt),
		}
	}
}

/// Transient brightening with radiating rays.
#[derive(Clone, Debug, PartialEq)]
pub struct Flare {
	pub elapsed: f64,
	pub duration: f64,
	pub angle: f64,
}

impl Flare {
	/// `sin(pi * progress)`: rises, peaks halfway, returns to zero.
	pub fn envelope(&self) -> f64 {
		(PI * (self.elapsed / self.duration).clamp(0.0, 1.0)).sin()
	}
}

/// Opacity ping-pong used by red giants instead of twinkling.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
	pub direction: f64,
	/// Opacity change per second.
	pub speed: f64,
}

/// A background star.
#[derive(Clone, Debug)]
pub struct Star {
	pub x: f64,
	pub y: f64,
	/// Normalized depth, 0 closest.
	pub depth: f64,
	pub bucket: DepthBucket,
	/// Radius before viewport scaling.
	pub base_size: f64,
	pub size: f64,
	pub color: Color,
	pub base_opacity: f64,
	pub opacity: f64,
	/// Twinkle angular speed in radians per second.
	pub twinkle_speed: f64,
	pub twinkle_phase: f64,
	/// Per-star value in [0, 1) used by shader twinkle.
	pub seed: f64,
	pub pulse: Option<Pulse>,
	pub flare: Option<Flare>,
}

impl Star {
	pub fn new(viewport: (f64, f64), profile: &TierProfile, size_scale: f64, rng: &mut Rng) -> Self {
		let depth = rng.f64();
		let base_opacity = range(rng, 0.3, 0.8);
		let red_giant = rng.f64() < profile.red_giant_fraction;
		let (color, base_size, pulse) = if red_giant {
			(
				theme::RED_GIANT,
				range(rng, profile.star_size_max * 0.66, profile.star_size_max * 1.33),
				Some(Pulse {
					direction: 1.0,
					speed: range(rng, 0.1, 1.2),
				}),
			)
		} else {
			(
				theme::star_color(rng),
				range(rng, profile.star_size_min, profile.star_size_max),
				None,
			)
		};
		Self {
			x: rng.f64() * viewport.0,
			y: rng.f64() * viewport.1,
			depth,
			bucket: DepthBucket::from_depth(depth),
			base_size,
			size: base_size * size_scale,
			color,
			base_opacity,
			opacity: base_opacity,
			twinkle_speed: range(rng, 0.5, 3.0),
			twinkle_phase: rng.f64() * TAU,
			seed: rng.f64(),
			pulse,
			flare: None,
		}
	}

	pub fn is_red_giant(&self) -> bool {
		self.pulse.is_some()
	}

	/// Opacity after twinkle or pulse, clamped to [0, 1].
	pub fn current_opacity(&self) -> f64 {
		let raw = if self.is_red_giant() {
			self.opacity
		} else {
			self.base_opacity + self.twinkle_phase.sin() * TWINKLE_AMPLITUDE
		};
		raw.clamp(0.0, 1.0)
	}

	/// Scale position with the viewport and re-apply the size multiplier.
	pub fn rescale(&mut self, sx: f64, sy: f64, size_scale: f64) {
		self.x *= sx;
		self.y *= sy;
		self.size = self.base_size * size_scale;
	}

	fn update(&mut self, frame: &FrameContext, rng: &mut Rng) -> Result<(), BackdropError> {
		self.twinkle_phase = (self.twinkle_phase + self.twinkle_speed * frame.dt) % TAU;

		if let Some(pulse) = &mut self.pulse {
			self.opacity += pulse.speed * pulse.direction * frame.dt;
			if self.opacity > 1.0 || self.opacity < 0.3 {
				pulse.direction = -pulse.direction;
				self.opacity = self.opacity.clamp(0.3, 1.0);
			}
		}

		match &mut self.flare {
			Some(flare) => {
				flare.elapsed += frame.dt;
				flare.angle += FLARE_SPIN * frame.dt;
				if flare.elapsed >= flare.duration {
					self.flare = None;
				}
			}
			None => {
				if rng.f64() < frame.flare_probability {
					self.flare = Some(Flare {
						elapsed: 0.0,
						duration: frame.effects.flare_duration.max(0.1),
						angle: rng.f64() * TAU,
					});
				}
			}
		}

		finite("star", &[self.x, self.y, self.size, self.opacity, self.twinkle_phase])
	}

	fn draw(&self, surface: &mut dyn Surface, view: &ParallaxView) -> Result<(), BackdropError> {
		let (dx, dy) = view.of(self.bucket);
		let (x, y) = (self.x + dx, self.y + dy);

		if let Some(flare) = &self.flare {
			let env = flare.envelope();
			let long = self.size * 5.0 * env;
			let short = long * 0.6;
			let x_ray = self.color.brighten(FLARE_BRIGHTEN).with_alpha(env * 0.6);
			let plus_ray = self.color.brighten(FLARE_BRIGHTEN).with_alpha(env * 0.4);
			for i in 0..4 {
				let quarter = i as f64 / 4.0 * TAU;
				let a = quarter + FRAC_PI_4 + flare.angle;
				surface.line((x, y), (x + a.cos() * long, y + a.sin() * long), 1.5, x_ray)?;
				let b = quarter + flare.angle;
				surface.line((x, y), (x + b.cos() * short, y + b.sin() * short), 1.5, plus_ray)?;
			}
		}

		surface.fill_circle(x, y, self.size, self.color.with_alpha(self.current_opacity()))
	}
}

/// Streak crossing the sky down and to the left.
#[derive(Clone, Debug)]
pub struct ShootingStar {
	pub x: f64,
	pub y: f64,
	pub len: f64,
	pub vx: f64,
	pub vy: f64,
	pub angle: f64,
	pub opacity: f64,
	/// Below this y the streak is fully off-screen.
	floor: f64,
	pub colors: StreakColors,
}

impl ShootingStar {
	/// Heading in radians; down-left in screen coordinates.
	pub const HEADING: f64 = 3.0 * FRAC_PI_4;

	pub fn new(viewport: (f64, f64), rng: &mut Rng) -> Self {
		let len = range(rng, 30.0, 150.0);
		let speed = range(rng, 7.0, 15.0) * REFERENCE_FPS;
		let angle = Self::HEADING;
		Self {
			x: rng.f64() * viewport.0 * 1.5,
			y: rng.f64() * viewport.1 * 0.5,
			len,
			vx: angle.cos() * speed,
			vy: angle.sin() * speed,
			angle,
			opacity: 1.0,
			floor: viewport.1 + len,
			colors: theme::streak_colors(rng),
		}
	}

	fn tail(&self) -> (f64, f64) {
		(
			self.x - self.len * self.angle.cos(),
			self.y - self.len * self.angle.sin(),
		)
	}

	fn update(&mut self, frame: &FrameContext) -> Result<(), BackdropError> {
		self.x += self.vx * frame.dt;
		self.y += self.vy * frame.dt;
		self.opacity -= frame.effects.shooting_star_decay * frame.dt;
		finite("shooting star", &[self.x, self.y, self.opacity])
	}

	fn draw(&self, surface: &mut dyn Surface) -> Result<(), BackdropError> {
		surface.gradient_line(
			(self.x, self.y),
			self.tail(),
			3.0,
			self.colors.head.with_alpha(self.opacity),
			self.colors.tail,
		)
	}

	fn is_expired(&self) -> bool {
		self.x < -self.len || self.y > self.floor || self.opacity <= 0.0
	}
}

/// Large soft cloud drifting slowly and wrapping around the viewport.
#[derive(Clone, Debug)]
pub struct NebulaCloud {
	pub x: f64,
	pub y: f64,
	pub radius: f64,
	pub max_opacity: f64,
	pub color: Color,
	pub vx: f64,
	pub vy: f64,
	/// Quad rotation for the WebGL tier.
	pub rotation: f64,
	/// Noise-space offset for the WebGL tier.
	pub seed: (f64, f64),
	/// Normalized depth for the WebGL tier.
	pub depth: f64,
}

impl NebulaCloud {
	/// Drift speed bound per axis, pixels per second.
	pub const DRIFT: f64 = 1.5;

	pub fn new(viewport: (f64, f64), rng: &mut Rng) -> Self {
		let half = viewport.0 / 2.0;
		Self {
			x: rng.f64() * viewport.0,
			y: rng.f64() * viewport.1,
			radius: half + rng.f64() * half,
			max_opacity: range(rng, 0.05, 0.15),
			color: theme::nebula_color(rng),
			vx: range(rng, -Self::DRIFT, Self::DRIFT),
			vy: range(rng, -Self::DRIFT, Self::DRIFT),
			rotation: rng.f64() * TAU,
			seed: (rng.f64() * 100.0, rng.f64() * 100.0),
			depth: rng.f64(),
		}
	}

	pub fn rescale(&mut self, sx: f64, sy: f64) {
		self.x *= sx;
		self.y *= sy;
		self.radius *= sx;
	}

	fn update(&mut self, frame: &FrameContext) -> Result<(), BackdropError> {
		let (w, h) = frame.viewport;
		self.x += self.vx * frame.dt;
		self.y += self.vy * frame.dt;
		if self.x - self.radius > w {
			self.x = -self.radius;
		}
		if self.x + self.radius < 0.0 {
			self.x = w + self.radius;
		}
		if self.y - self.radius > h {
			self.y = -self.radius;
		}
		if self.y + self.radius < 0.0 {
			self.y = h + self.radius;
		}
		finite("nebula", &[self.x, self.y, self.radius])
	}

	fn draw(&self, surface: &mut dyn Surface) -> Result<(), BackdropError> {
		surface.radial_glow(
			(self.x, self.y),
			self.radius,
			&[
				(0.1, self.color.with_alpha(self.max_opacity)),
				(0.5, self.color.with_alpha(self.max_opacity * 0.3)),
				(1.0, self.color.with_alpha(0.0)),
			],
		)
	}

	fn is_expired(&self) -> bool {
		self.radius < 1.0
	}
}

/// Short-lived spark emitted behind a flying sprite.
#[derive(Clone, Debug, Default)]
pub struct TrailParticle {
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Remaining life in seconds.
	pub life: f64,
	pub alpha: f64,
	fade_rate: f64,
}

impl TrailParticle {
	pub fn emit(at: (f64, f64), config: &TrailConfig, rng: &mut Rng) -> Self {
		Self {
			x: at.0,
			y: at.1,
			vx: range(rng, -config.spread, config.spread),
			vy: range(rng, -config.spread, config.spread),
			life: range(rng, 0.5, 2.0),
			alpha: 1.0,
			fade_rate: config.fade_rate,
		}
	}

	/// Radius grows as the spark fades.
	pub fn radius(&self) -> f64 {
		(1.0 - self.alpha.clamp(0.0, 1.0)) * 2.0 + 0.5
	}

	fn update(&mut self, frame: &FrameContext) -> Result<(), BackdropError> {
		self.life -= frame.dt;
		self.alpha -= self.fade_rate * frame.dt;
		self.x += self.vx * frame.dt;
		self.y += self.vy * frame.dt;
		finite("trail", &[self.x, self.y, self.alpha, self.life])
	}

	fn draw(&self, surface: &mut dyn Surface) -> Result<(), BackdropError> {
		surface.fill_circle(self.x, self.y, self.radius(), theme::TRAIL.with_alpha(self.alpha))
	}

	fn is_expired(&self) -> bool {
		self.life <= 0.0 || self.alpha <= 0.0
	}
}

/// Discriminant used for logging and fault accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleKind {
	Star,
	ShootingStar,
	Nebula,
	Trail,
}

/// Any simulated particle.
#[derive(Clone, Debug)]
pub enum Particle {
	Star(Star),
	ShootingStar(ShootingStar),
	Nebula(NebulaCloud),
	Trail(TrailParticle),
}

impl Particle {
	pub fn kind(&self) -> ParticleKind {
		match self {
			Particle::Star(_) => ParticleKind::Star,
			Particle::ShootingStar(_) => ParticleKind::ShootingStar,
			Particle::Nebula(_) => ParticleKind::Nebula,
			Particle::Trail(_) => ParticleKind::Trail,
		}
	}

	pub fn update(&mut self, frame: &FrameContext, rng: &mut Rng) -> Result<(), BackdropError> {
		match self {
			Particle::Star(p) => p.update(frame, rng),
			Particle::ShootingStar(p) => p.update(frame),
			Particle::Nebula(p) => p.update(frame),
			Particle::Trail(p) => p.update(frame),
		}
	}

	pub fn draw(&self, surface: &mut dyn Surface, view: &ParallaxView) -> Result<(), BackdropError> {
		match self {
			Particle::Star(p) => p.draw(surface, view),
			Particle::ShootingStar(p) => p.draw(surface),
			Particle::Nebula(p) => p.draw(surface),
			Particle::Trail(p) => p.draw(surface),
		}
	}

	pub fn is_expired(&self) -> bool {
		match self {
			Particle::Star(_) => false,
			Particle::ShootingStar(p) => p.is_expired(),
			Particle::Nebula(p) => p.is_expired(),
			Particle::Trail(p) => p.is_expired(),
		}
	}

	pub fn as_star(&self) -> Option<&Star> {
		match self {
			Particle::Star(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_nebula(&self) -> Option<&NebulaCloud> {
		match self {
			Particle::Nebula(n) => Some(n),
			_ => None,
		}
	}

	pub fn as_trail(&self) -> Option<&TrailParticle> {
		match self {
			Particle::Trail(t) => Some(t),
			_ => None,
		}
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	/// Records draw calls; optionally fails every call.
	#[derive(Default)]
	pub(crate) struct RecordingSurface {
		pub circles: Vec<(f64, f64, f64, Color)>,
		pub lines: usize,
		pub glows: usize,
		pub fail: bool,
	}

	impl RecordingSurface {
		fn check(&self) -> Result<(), BackdropError> {
			if self.fail {
				Err(BackdropError::PerFrameFault("surface lost".into()))
			} else {
				Ok(())
			}
		}
	}

	impl Surface for RecordingSurface {
		fn clear(&mut self) -> Result<(), BackdropError> {
			self.check()
		}
		fn fill_circle(&mut self, x: f64, y: f64, r: f64, c: Color) -> Result<(), BackdropError> {
			self.check()?;
			self.circles.push((x, y, r, c));
			Ok(())
		}
		fn line(&mut self, _: (f64, f64), _: (f64, f64), _: f64, _: Color) -> Result<(), BackdropError> {
			self.check()?;
			self.lines += 1;
			Ok(())
		}
		fn gradient_line(
			&mut self,
			_: (f64, f64),
			_: (f64, f64),
			_: f64,
			_: Color,
			_: Color,
		) -> Result<(), BackdropError> {
			self.check()?;
			self.lines += 1;
			Ok(())
		}
		fn radial_glow(&mut self, _: (f64, f64), _: f64, _: &[(f64, Color)]) -> Result<(), BackdropError> {
			self.check()?;
			self.glows += 1;
			Ok(())
		}
	}

	fn frame(effects: &EffectsConfig) -> FrameContext<'_> {
		FrameContext::new(1.0 / 60.0, (800.0, 600.0), effects)
	}

	fn star(rng: &mut Rng) -> Star {
		let profile = TierProfile {
			red_giant_fraction: 0.0,
			..TierProfile::low()
		};
		Star::new((800.0, 600.0), &profile, 1.0, rng)
	}

	#[test]
	fn chance_scales_with_frame_time() {
		assert!((chance_in(0.015, 1.0 / 60.0) - 0.015).abs() < 1e-9);
		assert!(chance_in(0.015, 1.0 / 30.0) > 0.015);
		assert_eq!(chance_in(0.0, 1.0), 0.0);
	}

	#[test]
	fn frame_resolves_flare_probability_once() {
		let effects = EffectsConfig {
			flare_chance: 0.01,
			..EffectsConfig::default()
		};
		let f = FrameContext::new(1.0 / 30.0, (800.0, 600.0), &effects);
		assert_eq!(f.flare_probability, chance_in(0.01, 1.0 / 30.0));
		assert!(f.flare_probability > 0.01);
	}

	#[test]
	fn star_twinkle_stays_in_range() {
		let mut rng = Rng::with_seed(1);
		let effects = EffectsConfig {
			flare_chance: 0.0,
			..EffectsConfig::default()
		};
		let mut p = Particle::Star(star(&mut rng));
		let mut seen = Vec::new();
		for _ in 0..600 {
			p.update(&frame(&effects), &mut rng).unwrap();
			let s = p.as_star().unwrap();
			let o = s.current_opacity();
			assert!((0.0..=1.0).contains(&o));
			seen.push(o);
		}
		let min = seen.iter().cloned().fold(f64::MAX, f64::min);
		let max = seen.iter().cloned().fold(f64::MIN, f64::max);
		assert!(max - min > 0.1, "star should visibly twinkle");
		assert!(!p.is_expired());
	}

	#[test]
	fn red_giant_pulses_between_bounds() {
		let mut rng = Rng::with_seed(2);
		let profile = TierProfile {
			red_giant_fraction: 1.0,
			..TierProfile::low()
		};
		let effects = EffectsConfig::default();
		let mut s = Star::new((800.0, 600.0), &profile, 1.0, &mut rng);
		assert!(s.is_red_giant());
		assert_eq!(s.color, theme::RED_GIANT);
		let mut flips = 0;
		let mut dir = s.pulse.as_ref().unwrap().direction;
		for _ in 0..6000 {
			s.update(&frame(&effects), &mut rng).unwrap();
			assert!((0.3..=1.0).contains(&s.opacity));
			let d = s.pulse.as_ref().unwrap().direction;
			if d != dir {
				flips += 1;
				dir = d;
			}
		}
		assert!(flips >= 2);
	}

	#[test]
	fn flare_triggers_draws_rays_and_expires() {
		let mut rng = Rng::with_seed(3);
		let mut effects = EffectsConfig {
			flare_chance: 1.0,
			flare_duration: 0.5,
			..EffectsConfig::default()
		};
		let mut s = star(&mut rng);
		s.update(&frame(&effects), &mut rng).unwrap();
		assert!(s.flare.is_some());

		s.update(&frame(&effects), &mut rng).unwrap();
		let mut surface = RecordingSurface::default();
		s.draw(&mut surface, &ParallaxView::default()).unwrap();
		assert_eq!(surface.lines, 8);
		assert_eq!(surface.circles.len(), 1);

		effects.flare_chance = 0.0;
		for _ in 0..40 {
			s.update(&frame(&effects), &mut rng).unwrap();
		}
		assert!(s.flare.is_none());
	}

	#[test]
	fn flare_envelope_peaks_midway() {
		let mut f = Flare {
			elapsed: 0.0,
			duration: 2.0,
			angle: 0.0,
		};
		assert!(f.envelope().abs() < 1e-9);
		f.elapsed = 1.0;
		assert!((f.envelope() - 1.0).abs() < 1e-9);
		f.elapsed = 2.0;
		assert!(f.envelope().abs() < 1e-9);
	}

	#[test]
	fn star_draw_applies_bucket_displacement() {
		let mut rng = Rng::with_seed(4);
		let mut s = star(&mut rng);
		s.bucket = DepthBucket::Near;
		let view = ParallaxView {
			displacement: [(-7.2, 2.4), (0.0, 0.0), (0.0, 0.0)],
		};
		let mut surface = RecordingSurface::default();
		Particle::Star(s.clone()).draw(&mut surface, &view).unwrap();
		let (x, y, _, _) = surface.circles[0];
		assert!((x - (s.x - 7.2)).abs() < 1e-9);
		assert!((y - (s.y + 2.4)).abs() < 1e-9);
	}

	#[test]
	fn shooting_star_expires_by_fading() {
		let mut rng = Rng::with_seed(5);
		let effects = EffectsConfig::default();
		let mut p = Particle::ShootingStar(ShootingStar::new((800.0, 600.0), &mut rng));
		let mut frames = 0;
		while !p.is_expired() {
			p.update(&frame(&effects), &mut rng).unwrap();
			frames += 1;
			assert!(frames < 200);
		}
		assert_eq!(p.kind(), ParticleKind::ShootingStar);
	}

	#[test]
	fn shooting_star_heads_down_left() {
		let mut rng = Rng::with_seed(6);
		let s = ShootingStar::new((800.0, 600.0), &mut rng);
		assert!(s.vx < 0.0 && s.vy > 0.0);
		assert!(s.x <= 1200.0 && s.y <= 300.0);
	}

	#[test]
	fn nebula_wraps_instead_of_expiring() {
		let mut rng = Rng::with_seed(7);
		let effects = EffectsConfig::default();
		let mut n = NebulaCloud::new((800.0, 600.0), &mut rng);
		n.x = 800.0 + n.radius + 0.5;
		n.vx = 60.0;
		let mut p = Particle::Nebula(n);
		p.update(&frame(&effects), &mut rng).unwrap();
		let n = p.as_nebula().unwrap();
		assert_eq!(n.x, -n.radius);
		assert!(!p.is_expired());
	}

	#[test]
	fn trail_particle_fades_and_grows() {
		let mut rng = Rng::with_seed(8);
		let effects = EffectsConfig::default();
		let mut t = TrailParticle::emit((10.0, 10.0), &TrailConfig::default(), &mut rng);
		let r0 = t.radius();
		t.update(&frame(&effects)).unwrap();
		assert!(t.radius() > r0);
		assert!(t.alpha < 1.0);
		for _ in 0..200 {
			t.update(&frame(&effects)).unwrap();
		}
		assert!(t.is_expired());
	}

	#[test]
	fn non_finite_state_is_a_frame_fault() {
		let mut rng = Rng::with_seed(9);
		let effects = EffectsConfig::default();
		let mut s = star(&mut rng);
		s.x = f64::NAN;
		let err = Particle::Star(s).update(&frame(&effects), &mut rng).unwrap_err();
		assert!(matches!(err, BackdropError::PerFrameFault(_)));
	}
}
