//! Simulation context shared by both renderers.
//!
//! Owns every particle group, the parallax state, the flythrough sprite and the
//! debounced resize. Nothing here touches the DOM; the component feeds it input
//! events and frame timestamps, and renderers read it back.

use std::collections::HashMap;

use fastrand::Rng;

use super::density::Density;
use super::flythrough::{Flythrough, SpriteKind, SpritePose};
use super::parallax::{ParallaxState, ParallaxView};
use super::particles::{
	FrameContext, NebulaCloud, Particle, ParticleKind, ShootingStar, Star, TrailParticle, chance_in,
};
use super::pool::TrailPool;
use super::schedule::Debouncer;
use crate::config::{BackdropConfig, TierProfile};

/// Longest frame step simulated; longer gaps (background tabs) are clamped.
const MAX_DT: f64 = 0.1;
/// Minimum spacing between fault log lines for one particle kind.
const FAULT_LOG_INTERVAL_MS: f64 = 1000.0;

/// Rate-limits per-frame fault logging.
#[derive(Clone, Debug, Default)]
struct FaultLog {
	last: HashMap<ParticleKind, f64>,
	total: u64,
}

impl FaultLog {
	fn record(&mut self, kind: ParticleKind, count: usize, now_ms: f64) {
		if count == 0 {
			return;
		}
		self.total += count as u64;
		let due = self
			.last
			.get(&kind)
			.is_none_or(|at| now_ms - at >= FAULT_LOG_INTERVAL_MS);
		if due {
			self.last.insert(kind, now_ms);
			log::debug!(
				"starfield-backdrop: skipped {count} faulty {kind:?} particle(s), {} total",
				self.total
			);
		}
	}
}

/// Owned state of one running backdrop.
///
/// Holds every particle group, parallax, the flythrough and the pending
/// resize. `step` advances it by one frame; renderers only read it.
pub struct SimulationContext {
	profile: TierProfile,
	config: BackdropConfig,
	viewport: (f64, f64),
	density: Density,
	stars: Vec<Particle>,
	shooting_stars: Vec<Particle>,
	nebulae: Vec<Particle>,
	trail: TrailPool,
	parallax: ParallaxState,
	flythrough: Flythrough,
	sprite: Option<SpritePose>,
	resize: Debouncer<(f64, f64)>,
	/// Time accumulated toward the next nebula tick.
	nebula_clock: f64,
	nebula_dirty: bool,
	generation: u64,
	faults: FaultLog,
}

impl SimulationContext {
	pub fn new(
		profile: &TierProfile,
		config: &BackdropConfig,
		viewport: (f64, f64),
		now_ms: f64,
		rng: &mut Rng,
	) -> Self {
		let density = Density::new(viewport.0, viewport.1, &config.density);
		let mut sim = Self {
			profile: profile.clone(),
			config: config.clone(),
			viewport,
			density,
			stars: Vec::new(),
			shooting_stars: Vec::new(),
			nebulae: Vec::new(),
			trail: TrailPool::new(config.trail.capacity),
			parallax: ParallaxState::new(&config.parallax),
			flythrough: Flythrough::new(&config.flythrough, now_ms),
			sprite: None,
			resize: Debouncer::new(config.density.resize_debounce_ms),
			nebula_clock: 0.0,
			nebula_dirty: true,
			generation: 0,
			faults: FaultLog::default(),
		};
		sim.populate(rng);
		log::info!(
			"starfield-backdrop: simulation ready with {} stars, {} clouds ({:?})",
			sim.stars.len(),
			sim.nebulae.len(),
			sim.density.bucket
		);
		sim
	}

	fn populate(&mut self, rng: &mut Rng) {
		let target = self.density.target_count(self.profile.base_star_count);
		self.stars = (0..target)
			.map(|_| Particle::Star(Star::new(self.viewport, &self.profile, self.density.size_scale, rng)))
			.collect();
		self.nebulae = (0..self.profile.nebula_count)
			.map(|_| Particle::Nebula(NebulaCloud::new(self.viewport, rng)))
			.collect();
	}

	/// Advance one frame. `measure` reports a sprite element's layout width.
	pub fn step(&mut self, dt: f64, now_ms: f64, measure: impl Fn(SpriteKind) -> f64, rng: &mut Rng) {
		let dt = dt.clamp(0.0, MAX_DT);
		self.parallax.step(dt, now_ms);

		let effects = self.config.effects.clone();
		let frame = FrameContext::new(dt, self.viewport, &effects);

		if self.profile.animate_stars {
			for star in &mut self.stars {
				if star.update(&frame, rng).is_err() {
					self.faults.record(star.kind(), 1, now_ms);
					*star = Particle::Star(Star::new(self.viewport, &self.profile, self.density.size_scale, rng));
				}
			}

			if rng.f64() < chance_in(effects.shooting_star_chance, dt) {
				self.shooting_stars
					.push(Particle::ShootingStar(ShootingStar::new(self.viewport, rng)));
			}
			let faults = &mut self.faults;
			self.shooting_stars.retain_mut(|p| match p.update(&frame, rng) {
				Ok(()) => !p.is_expired(),
				Err(_) => {
					faults.record(p.kind(), 1, now_ms);
					false
				}
			});
		}

		self.nebula_clock += dt;
		let period = 1.0 / effects.nebula_hz.max(1.0);
		if self.nebula_clock >= period {
			let tick = FrameContext::new(self.nebula_clock, self.viewport, &effects);
			self.nebula_clock = 0.0;
			for cloud in &mut self.nebulae {
				if cloud.update(&tick, rng).is_err() {
					self.faults.record(cloud.kind(), 1, now_ms);
					*cloud = Particle::Nebula(NebulaCloud::new(self.viewport, rng));
				}
			}
			self.nebulae.retain(|p| !p.is_expired());
			self.nebula_dirty = true;
		}

		self.sprite = self.flythrough.step(now_ms, self.viewport, measure, rng);
		if let Some(pose) = self.sprite {
			for _ in 0..self.config.trail.emit_per_frame {
				let spark = TrailParticle::emit(pose.center, &self.config.trail, rng);
				if !self.trail.spawn(Particle::Trail(spark)) {
					break;
				}
			}
		}
		let faults = self.trail.update(&frame, rng);
		self.faults.record(ParticleKind::Trail, faults, now_ms);
	}

	/// Viewport changed. The rebuild waits for the resize burst to settle.
	pub fn request_resize(&mut self, width: f64, height: f64, now_ms: f64) {
		self.resize.trigger((width, height), now_ms);
	}

	/// Rebuild if a debounced resize is due. Returns true when it ran.
	pub fn poll_rebuild(&mut self, now_ms: f64, rng: &mut Rng) -> bool {
		match self.resize.poll(now_ms) {
			Some((w, h)) => {
				self.rebuild(w, h, rng);
				true
			}
			None => false,
		}
	}

	/// Match the population to a new viewport: existing particles are
	/// rescaled, then stars are added or removed to reach the target count.
	pub fn rebuild(&mut self, width: f64, height: f64, rng: &mut Rng) {
		let (old_w, old_h) = self.viewport;
		let sx = if old_w > 0.0 { width / old_w } else { 1.0 };
		let sy = if old_h > 0.0 { height / old_h } else { 1.0 };
		self.viewport = (width, height);
		self.density = Density::new(width, height, &self.config.density);

		for star in &mut self.stars {
			if let Particle::Star(s) = star {
				s.rescale(sx, sy, self.density.size_scale);
			}
		}
		let target = self.density.target_count(self.profile.base_star_count);
		if self.stars.len() > target {
			self.stars.truncate(target);
		} else {
			while self.stars.len() < target {
				self.stars
					.push(Particle::Star(Star::new(self.viewport, &self.profile, self.density.size_scale, rng)));
			}
		}

		for cloud in &mut self.nebulae {
			if let Particle::Nebula(n) = cloud {
				n.rescale(sx, sy);
			}
		}
		self.nebula_dirty = true;
		self.generation += 1;
		log::info!(
			"starfield-backdrop: rebuilt for {width}x{height} ({:?}), {} stars",
			self.density.bucket,
			self.stars.len()
		);
	}

	pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) {
		let (w, h) = self.viewport;
		self.parallax.pointer.pointer_move(x - w / 2.0, y - h / 2.0, now_ms);
	}

	pub fn pointer_leave(&mut self) {
		self.parallax.pointer.pointer_leave();
	}

	pub fn orientation(&mut self, beta: f64, gamma: f64, now_ms: f64) {
		self.parallax.pointer.orientation(beta, gamma, self.viewport, now_ms);
	}

	/// True once after the nebula layer changed.
	pub fn take_nebula_dirty(&mut self) -> bool {
		std::mem::take(&mut self.nebula_dirty)
	}

	pub fn stars(&self) -> &[Particle] {
		&self.stars
	}

	pub fn shooting_stars(&self) -> &[Particle] {
		&self.shooting_stars
	}

	pub fn nebulae(&self) -> &[Particle] {
		&self.nebulae
	}

	pub fn trail(&self) -> &TrailPool {
		&self.trail
	}

	pub fn sprite(&self) -> Option<SpritePose> {
		self.sprite
	}

	pub fn parallax(&self) -> &ParallaxState {
		&self.parallax
	}

	pub fn view(&self) -> ParallaxView {
		self.parallax.view()
	}

	pub fn viewport(&self) -> (f64, f64) {
		self.viewport
	}

	/// Bumped on every rebuild so renderers know to re-upload buffers.
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DT: f64 = 1.0 / 60.0;

	fn sim(viewport: (f64, f64), rng: &mut Rng) -> SimulationContext {
		SimulationContext::new(&TierProfile::low(), &BackdropConfig::default(), viewport, 0.0, rng)
	}

	#[test]
	fn initial_population_follows_density() {
		let mut rng = Rng::with_seed(1);
		let s = sim((1920.0, 1080.0), &mut rng);
		assert_eq!(s.stars().len(), 1000);
		assert_eq!(s.nebulae().len(), 4);
		let s = sim((375.0, 812.0), &mut rng);
		assert_eq!(s.stars().len(), 400);
	}

	#[test]
	fn resize_burst_rebuilds_once() {
		let mut rng = Rng::with_seed(2);
		let mut s = sim((1920.0, 1080.0), &mut rng);
		let mut now = 0.0;
		let mut rebuilds = 0;
		for (w, h) in [(1800.0, 1000.0), (1400.0, 900.0), (1100.0, 800.0), (1024.0, 768.0)] {
			s.request_resize(w, h, now);
			now += 50.0;
			if s.poll_rebuild(now, &mut rng) {
				rebuilds += 1;
			}
		}
		for _ in 0..20 {
			now += 50.0;
			if s.poll_rebuild(now, &mut rng) {
				rebuilds += 1;
			}
		}
		assert_eq!(rebuilds, 1);
		assert_eq!(s.generation(), 1);
		assert_eq!(s.viewport(), (1024.0, 768.0));
		assert_eq!(s.stars().len(), 700);
	}

	#[test]
	fn rebuild_rescales_existing_stars() {
		let mut rng = Rng::with_seed(3);
		let mut s = sim((1920.0, 1080.0), &mut rng);
		let before = s.stars()[0].as_star().cloned().unwrap();
		s.rebuild(960.0, 1080.0, &mut rng);
		let after = s.stars()[0].as_star().unwrap();
		assert!((after.x - before.x / 2.0).abs() < 1e-9);
		assert!((after.size - before.base_size * 0.9).abs() < 1e-9);
		assert!(s.take_nebula_dirty());
	}

	#[test]
	fn growing_viewport_adds_stars() {
		let mut rng = Rng::with_seed(4);
		let mut s = sim((375.0, 812.0), &mut rng);
		s.rebuild(1920.0, 1080.0, &mut rng);
		assert_eq!(s.stars().len(), 1000);
		assert!(s.stars().iter().all(|p| p.as_star().is_some_and(|st| st.size == st.base_size)));
	}

	#[test]
	fn shooting_stars_spawn_and_expire() {
		let mut rng = Rng::with_seed(5);
		let mut config = BackdropConfig::default();
		config.effects.shooting_star_chance = 1.0;
		let mut s = SimulationContext::new(&TierProfile::low(), &config, (800.0, 600.0), 0.0, &mut rng);
		s.step(DT, 16.0, |_| 0.0, &mut rng);
		assert_eq!(s.shooting_stars().len(), 1);

		s.config.effects.shooting_star_chance = 0.0;
		let mut now = 16.0;
		for _ in 0..300 {
			now += 16.0;
			s.step(DT, now, |_| 0.0, &mut rng);
		}
		assert!(s.shooting_stars().is_empty());
	}

	#[test]
	fn shader_tier_leaves_stars_to_the_gpu() {
		let mut rng = Rng::with_seed(10);
		let mut config = BackdropConfig::default();
		config.effects.shooting_star_chance = 1.0;
		config.effects.flare_chance = 0.01;
		let profile = TierProfile {
			base_star_count: 2000,
			..TierProfile::high()
		};
		let mut s = SimulationContext::new(&profile, &config, (1920.0, 1080.0), 0.0, &mut rng);
		let phases: Vec<f64> = s.stars().iter().filter_map(|p| p.as_star()).map(|st| st.twinkle_phase).collect();
		let mut now = 0.0;
		for _ in 0..60 {
			now += 16.0;
			s.step(DT, now, |_| 0.0, &mut rng);
		}
		assert!(s.shooting_stars().is_empty());
		for (p, phase) in s.stars().iter().zip(&phases) {
			let star = p.as_star().unwrap();
			assert!(star.flare.is_none());
			assert_eq!(star.twinkle_phase, *phase);
		}
	}

	#[test]
	fn nebula_ticks_at_fixed_rate() {
		let mut rng = Rng::with_seed(6);
		let mut s = sim((800.0, 600.0), &mut rng);
		assert!(s.take_nebula_dirty());
		s.step(DT, 16.0, |_| 0.0, &mut rng);
		assert!(!s.take_nebula_dirty());
		let mut ticks = 0;
		for i in 0..60 {
			s.step(DT, 32.0 + i as f64 * 16.0, |_| 0.0, &mut rng);
			if s.take_nebula_dirty() {
				ticks += 1;
			}
		}
		assert!((8..=10).contains(&ticks), "{ticks}");
	}

	#[test]
	fn flying_sprite_emits_bounded_trail() {
		let mut rng = Rng::with_seed(7);
		let mut config = BackdropConfig::default();
		config.trail.capacity = 50;
		config.flythrough.first_launch_ms = 0.0;
		let mut s = SimulationContext::new(&TierProfile::low(), &config, (800.0, 600.0), 0.0, &mut rng);
		let mut now = 0.0;
		for _ in 0..120 {
			s.step(DT, now, |_| 40.0, &mut rng);
			now += DT * 1000.0;
			assert!(s.trail().live() <= 50);
		}
		assert!(s.sprite().is_some());
		assert!(s.trail().live() > 0);
	}

	#[test]
	fn faulty_star_is_replaced() {
		let mut rng = Rng::with_seed(8);
		let mut s = sim((800.0, 600.0), &mut rng);
		let count = s.stars().len();
		if let Particle::Star(star) = &mut s.stars[0] {
			star.x = f64::NAN;
		}
		s.step(DT, 16.0, |_| 0.0, &mut rng);
		assert_eq!(s.stars().len(), count);
		assert!(s.stars()[0].as_star().is_some_and(|st| st.x.is_finite()));
		assert_eq!(s.faults.total, 1);
		assert_eq!(s.faults.last.get(&ParticleKind::Star), Some(&16.0));
	}

	#[test]
	fn pointer_is_measured_from_center() {
		let mut rng = Rng::with_seed(9);
		let mut config = BackdropConfig::default();
		config.parallax.lissajous.magnitude = 0.0;
		let mut s = SimulationContext::new(&TierProfile::low(), &config, (800.0, 600.0), 0.0, &mut rng);
		s.pointer_move(400.0, 300.0, 0.0);
		s.step(DT, 16.0, |_| 0.0, &mut rng);
		assert_eq!(s.parallax().offset(), (0.0, 0.0));
	}
}
