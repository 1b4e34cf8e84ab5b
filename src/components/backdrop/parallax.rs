//! Pointer parallax with idle recentering and ambient Lissajous drift.
//!
//! The raw pointer target is low-pass filtered with exponential smoothing:
//!
//! ```text
//! value += (target - value) * (1 - e^(-rate * dt))
//! ```
//!
//! which eases out as it approaches the target and is independent of frame
//! rate. While the pointer is idle (no movement for `idle_ms`, or it left the
//! viewport) the target becomes the center and the slower `idle_rate` applies.

use crate::config::{LissajousConfig, ParallaxConfig};

/// Orientation angles beyond this are clamped, in degrees.
pub const MAX_TILT_DEGREES: f64 = 45.0;

/// Depth layers. Near layers react more strongly to the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthBucket {
	Near,
	Mid,
	Far,
}

impl DepthBucket {
	pub const ALL: [DepthBucket; 3] = [DepthBucket::Near, DepthBucket::Mid, DepthBucket::Far];

	/// Bucket for a normalized depth in [0, 1), 0 being closest.
	pub fn from_depth(depth: f64) -> Self {
		if depth < 0.33 {
			DepthBucket::Near
		} else if depth < 0.66 {
			DepthBucket::Mid
		} else {
			DepthBucket::Far
		}
	}

	pub fn index(self) -> usize {
		match self {
			DepthBucket::Near => 0,
			DepthBucket::Mid => 1,
			DepthBucket::Far => 2,
		}
	}

	pub fn factor(self, config: &ParallaxConfig) -> f64 {
		config.factors[self.index()]
	}
}

/// Whether a `PointerEvent.pointerType` should steer parallax. Touch and pen
/// are left to device orientation.
pub fn accepts_pointer(pointer_type: &str) -> bool {
	pointer_type == "mouse"
}

/// Ambient offset at `t` seconds: two sinusoids with a phase offset.
pub fn lissajous(t: f64, config: &LissajousConfig) -> (f64, f64) {
	let phase = t * config.speed;
	(
		config.magnitude * (config.a * phase + config.delta).sin(),
		config.magnitude * (config.b * phase).sin(),
	)
}

fn smoothing(rate: f64, dt: f64) -> f64 {
	1.0 - (-rate * dt).exp()
}

/// Smoothed pointer offset relative to the viewport center.
#[derive(Clone, Debug)]
pub struct PointerTracker {
	follow_rate: f64,
	idle_rate: f64,
	idle_ms: f64,
	target: (f64, f64),
	smoothed: (f64, f64),
	/// Time of the last pointer or tilt input, `None` once the pointer left.
	last_input_ms: Option<f64>,
}

impl PointerTracker {
	pub fn new(config: &ParallaxConfig) -> Self {
		Self {
			follow_rate: config.follow_rate,
			idle_rate: config.idle_rate,
			idle_ms: config.idle_ms,
			target: (0.0, 0.0),
			smoothed: (0.0, 0.0),
			last_input_ms: None,
		}
	}

	/// Pointer moved to `(x, y)` relative to the viewport center.
	pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) {
		self.target = (x, y);
		self.last_input_ms = Some(now_ms);
	}

	/// Device tilt in degrees, mapped so that ±45° reaches a quarter viewport.
	pub fn orientation(&mut self, beta: f64, gamma: f64, viewport: (f64, f64), now_ms: f64) {
		let x = gamma.clamp(-MAX_TILT_DEGREES, MAX_TILT_DEGREES) / MAX_TILT_DEGREES;
		let y = beta.clamp(-MAX_TILT_DEGREES, MAX_TILT_DEGREES) / MAX_TILT_DEGREES;
		self.pointer_move(x * viewport.0 / 4.0, y * viewport.1 / 4.0, now_ms);
	}

	/// Pointer left the viewport; start recentering right away.
	pub fn pointer_leave(&mut self) {
		self.last_input_ms = None;
	}

	pub fn is_idle(&self, now_ms: f64) -> bool {
		match self.last_input_ms {
			Some(at) => now_ms - at >= self.idle_ms,
			None => true,
		}
	}

	/// Advance smoothing by `dt` seconds.
	pub fn step(&mut self, dt: f64, now_ms: f64) {
		let (target, rate) = if self.is_idle(now_ms) {
			((0.0, 0.0), self.idle_rate)
		} else {
			(self.target, self.follow_rate)
		};
		let k = smoothing(rate, dt);
		self.smoothed.0 += (target.0 - self.smoothed.0) * k;
		self.smoothed.1 += (target.1 - self.smoothed.1) * k;
	}

	pub fn offset(&self) -> (f64, f64) {
		self.smoothed
	}
}

/// Shared parallax state read by every particle's draw step.
#[derive(Clone, Debug)]
pub struct ParallaxState {
	config: ParallaxConfig,
	pub pointer: PointerTracker,
	ambient: (f64, f64),
	elapsed: f64,
}

impl ParallaxState {
	pub fn new(config: &ParallaxConfig) -> Self {
		Self {
			config: config.clone(),
			pointer: PointerTracker::new(config),
			ambient: lissajous(0.0, &config.lissajous),
			elapsed: 0.0,
		}
	}

	/// Advance pointer smoothing and the ambient trajectory.
	pub fn step(&mut self, dt: f64, now_ms: f64) {
		self.elapsed += dt;
		self.pointer.step(dt, now_ms);
		self.ambient = lissajous(self.elapsed, &self.config.lissajous);
	}

	/// Combined pointer and ambient offset.
	pub fn offset(&self) -> (f64, f64) {
		let p = self.pointer.offset();
		(p.0 + self.ambient.0, p.1 + self.ambient.1)
	}

	/// On-screen displacement for a depth bucket.
	pub fn displacement(&self, bucket: DepthBucket) -> (f64, f64) {
		let (x, y) = self.offset();
		let factor = bucket.factor(&self.config);
		(-x * factor, -y * factor)
	}

	/// Logo follows the pointer only; ambient drift would make it wander.
	pub fn logo_offset(&self) -> (f64, f64) {
		let (x, y) = self.pointer.offset();
		(-x * self.config.logo_ratio, -y * self.config.logo_ratio)
	}

	/// Precomputed displacements for all buckets, in `DepthBucket::index` order.
	pub fn view(&self) -> ParallaxView {
		ParallaxView {
			displacement: DepthBucket::ALL.map(|b| self.displacement(b)),
		}
	}
}

/// Per-frame snapshot of bucket displacements.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParallaxView {
	pub displacement: [(f64, f64); 3],
}

impl ParallaxView {
	pub fn of(&self, bucket: DepthBucket) -> (f64, f64) {
		self.displacement[bucket.index()]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DT: f64 = 1.0 / 60.0;

	fn still_config() -> ParallaxConfig {
		let mut config = ParallaxConfig::default();
		config.lissajous.magnitude = 0.0;
		config
	}

	/// Run `frames` frames at 60 FPS starting from `start_ms`, returning the end time.
	fn run(state: &mut ParallaxState, start_ms: f64, frames: usize) -> f64 {
		let mut now = start_ms;
		for _ in 0..frames {
			now += DT * 1000.0;
			state.step(DT, now);
		}
		now
	}

	#[test]
	fn only_mouse_pointers_steer() {
		assert!(accepts_pointer("mouse"));
		for other in ["touch", "pen", ""] {
			assert!(!accepts_pointer(other), "{other}");
		}
	}

	#[test]
	fn buckets_partition_depth() {
		assert_eq!(DepthBucket::from_depth(0.0), DepthBucket::Near);
		assert_eq!(DepthBucket::from_depth(0.5), DepthBucket::Mid);
		assert_eq!(DepthBucket::from_depth(0.99), DepthBucket::Far);
	}

	#[test]
	fn near_moves_more_than_far() {
		let mut state = ParallaxState::new(&still_config());
		state.pointer.pointer_move(120.0, -40.0, 0.0);
		run(&mut state, 0.0, 30);
		let near = state.displacement(DepthBucket::Near);
		let mid = state.displacement(DepthBucket::Mid);
		let far = state.displacement(DepthBucket::Far);
		let mag = |(x, y): (f64, f64)| (x * x + y * y).sqrt();
		assert!(mag(near) > mag(mid));
		assert!(mag(mid) > mag(far));
		assert!(mag(far) > 0.0);
	}

	#[test]
	fn steady_state_matches_factor() {
		let mut state = ParallaxState::new(&still_config());
		let mut now = 0.0;
		// Keep the pointer alive while smoothing settles.
		for _ in 0..10 {
			state.pointer.pointer_move(120.0, -40.0, now);
			now = run(&mut state, now, 60);
		}
		let (dx, dy) = state.displacement(DepthBucket::Near);
		assert!((dx - -7.2).abs() < 1e-3, "dx = {dx}");
		assert!((dy - 2.4).abs() < 1e-3, "dy = {dy}");
	}

	#[test]
	fn smoothing_does_not_jump() {
		let mut state = ParallaxState::new(&still_config());
		state.pointer.pointer_move(1000.0, 0.0, 0.0);
		state.step(DT, DT * 1000.0);
		let (x, _) = state.pointer.offset();
		assert!(x > 0.0 && x < 100.0, "first frame moved to {x}");
	}

	#[test]
	fn idle_pointer_decays_monotonically_to_center() {
		let config = still_config();
		let mut state = ParallaxState::new(&config);
		let mut now = 0.0;
		for _ in 0..3 {
			state.pointer.pointer_move(300.0, 200.0, now);
			now = run(&mut state, now, 60);
		}
		let settled = state.pointer.offset();
		assert!(settled.0 > 250.0);

		// No more input. Once idle, every frame must get strictly closer to center.
		now = run(&mut state, now, (config.idle_ms / 1000.0 / DT) as usize + 1);
		assert!(state.pointer.is_idle(now));
		let mut prev = state.pointer.offset();
		for _ in 0..600 {
			now += DT * 1000.0;
			state.step(DT, now);
			let cur = state.pointer.offset();
			assert!(cur.0.abs() < prev.0.abs() && cur.1.abs() < prev.1.abs());
			assert!(cur.0 >= 0.0 && cur.1 >= 0.0, "overshoot");
			prev = cur;
		}
		assert!(prev.0 < 1.0 && prev.1 < 1.0);
	}

	#[test]
	fn idle_decay_is_slower_than_follow() {
		let config = still_config();
		let mut following = PointerTracker::new(&config);
		following.pointer_move(100.0, 0.0, 0.0);
		following.step(DT, 0.0);

		let mut decaying = PointerTracker::new(&config);
		decaying.smoothed = (100.0, 0.0);
		decaying.step(DT, 0.0);

		let followed = following.offset().0;
		let decayed = 100.0 - decaying.offset().0;
		assert!(followed > decayed);
	}

	#[test]
	fn leaving_recenters_without_waiting() {
		let mut tracker = PointerTracker::new(&still_config());
		tracker.pointer_move(50.0, 50.0, 0.0);
		assert!(!tracker.is_idle(10.0));
		tracker.pointer_leave();
		assert!(tracker.is_idle(10.0));
	}

	#[test]
	fn tilt_is_clamped_to_quarter_viewport() {
		let mut tracker = PointerTracker::new(&still_config());
		tracker.orientation(90.0, -120.0, (800.0, 600.0), 0.0);
		assert_eq!(tracker.target, (-200.0, 150.0));
		tracker.orientation(22.5, 22.5, (800.0, 600.0), 0.0);
		assert_eq!(tracker.target, (100.0, 75.0));
	}

	#[test]
	fn ambient_drift_is_bounded_and_moving() {
		let config = LissajousConfig::default();
		let mut seen = std::collections::HashSet::new();
		for i in 0..1000 {
			let (x, y) = lissajous(i as f64 * 0.5, &config);
			assert!(x.abs() <= config.magnitude + 1e-9);
			assert!(y.abs() <= config.magnitude + 1e-9);
			seen.insert(((x * 10.0) as i64, (y * 10.0) as i64));
		}
		assert!(seen.len() > 200);
	}

	#[test]
	fn ambient_keeps_scene_moving_without_input() {
		let mut state = ParallaxState::new(&ParallaxConfig::default());
		let before = state.displacement(DepthBucket::Near);
		run(&mut state, 0.0, 120);
		assert_ne!(before, state.displacement(DepthBucket::Near));
	}

	#[test]
	fn logo_ignores_ambient_drift() {
		let mut state = ParallaxState::new(&ParallaxConfig::default());
		run(&mut state, 0.0, 120);
		assert_eq!(state.logo_offset(), (-0.0, -0.0));
	}
}
