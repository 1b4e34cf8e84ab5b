//! Decorative sprites crossing the screen.
//!
//! One sprite flies at a time, in a straight line between two points just
//! outside opposite viewport edges. After it lands, the next launch is
//! scheduled a random delay later.

use std::f64::consts::PI;

use fastrand::Rng;

use super::schedule::ScheduledTask;
use crate::config::FlythroughConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKind {
	Astronaut,
	Meteorite,
	Rocket,
	Satellite,
}

impl SpriteKind {
	pub const ALL: [SpriteKind; 4] = [
		SpriteKind::Astronaut,
		SpriteKind::Meteorite,
		SpriteKind::Rocket,
		SpriteKind::Satellite,
	];

	/// Element id and image stem.
	pub fn id(self) -> &'static str {
		match self {
			SpriteKind::Astronaut => "astronaut",
			SpriteKind::Meteorite => "meteorite",
			SpriteKind::Rocket => "rocket",
			SpriteKind::Satellite => "satellite",
		}
	}

	pub fn file(self) -> String {
		format!("{}.png", self.id())
	}

	pub fn random(rng: &mut Rng) -> Self {
		Self::ALL[rng.usize(..Self::ALL.len())]
	}
}

/// A planned straight-line flight.
#[derive(Clone, Debug, PartialEq)]
pub struct Flight {
	pub kind: SpriteKind,
	pub start: (f64, f64),
	pub end: (f64, f64),
	/// Seconds.
	pub duration: f64,
	/// Degrees.
	pub start_rotation: f64,
	pub end_rotation: f64,
}

impl Flight {
	pub fn plan(
		kind: SpriteKind,
		viewport: (f64, f64),
		sprite_size: f64,
		config: &FlythroughConfig,
		rng: &mut Rng,
	) -> Self {
		let (w, h) = viewport;
		let buffer = sprite_size * 2.0;
		let (start, end) = match rng.u8(..4) {
			0 => ((rng.f64() * w, -buffer), (rng.f64() * w, h + buffer)),
			1 => ((w + buffer, rng.f64() * h), (-buffer, rng.f64() * h)),
			2 => ((rng.f64() * w, h + buffer), (rng.f64() * w, -buffer)),
			_ => ((-buffer, rng.f64() * h), (w + buffer, rng.f64() * h)),
		};

		let (start_rotation, end_rotation) = if kind == SpriteKind::Rocket {
			let heading = (end.1 - start.1).atan2(end.0 - start.0) * 180.0 / PI + 90.0;
			(heading, heading)
		} else {
			let from = rng.f64() * 360.0;
			let turn = if rng.bool() { 360.0 } else { -360.0 };
			(from, from + turn)
		};

		let span = config.duration_max_s - config.duration_min_s;
		Self {
			kind,
			start,
			end,
			duration: config.duration_min_s + rng.f64() * span.max(0.0),
			start_rotation,
			end_rotation,
		}
	}

	fn progress(&self, elapsed: f64) -> f64 {
		if self.duration <= 0.0 {
			1.0
		} else {
			(elapsed / self.duration).clamp(0.0, 1.0)
		}
	}

	/// Sprite center after `elapsed` seconds.
	pub fn position(&self, elapsed: f64) -> (f64, f64) {
		let t = self.progress(elapsed);
		(
			self.start.0 + (self.end.0 - self.start.0) * t,
			self.start.1 + (self.end.1 - self.start.1) * t,
		)
	}

	/// Rotation in degrees after `elapsed` seconds.
	pub fn rotation(&self, elapsed: f64) -> f64 {
		let t = self.progress(elapsed);
		self.start_rotation + (self.end_rotation - self.start_rotation) * t
	}

	pub fn is_done(&self, elapsed: f64) -> bool {
		elapsed >= self.duration
	}
}

/// Where to draw the active sprite this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpritePose {
	pub kind: SpriteKind,
	pub center: (f64, f64),
	pub rotation: f64,
}

/// Launch loop: one flight at a time with random pauses between them.
#[derive(Clone, Debug)]
pub struct Flythrough {
	config: FlythroughConfig,
	current: Option<(Flight, f64)>,
	next_launch: ScheduledTask,
}

impl Flythrough {
	pub fn new(config: &FlythroughConfig, now_ms: f64) -> Self {
		Self {
			config: config.clone(),
			current: None,
			next_launch: ScheduledTask::at(now_ms + config.first_launch_ms),
		}
	}

	pub fn flight(&self) -> Option<&Flight> {
		self.current.as_ref().map(|(f, _)| f)
	}

	/// Advance to `now_ms`. `measure` reports a sprite's layout width, or 0
	/// when it has none yet.
	pub fn step(
		&mut self,
		now_ms: f64,
		viewport: (f64, f64),
		measure: impl Fn(SpriteKind) -> f64,
		rng: &mut Rng,
	) -> Option<SpritePose> {
		if self.next_launch.poll(now_ms) {
			let kind = SpriteKind::random(rng);
			let width = measure(kind);
			let size = if width > 0.0 { width } else { self.config.fallback_size };
			let flight = Flight::plan(kind, viewport, size, &self.config, rng);
			log::debug!(
				"starfield-backdrop: launching {} for {:.1}s",
				kind.id(),
				flight.duration
			);
			self.current = Some((flight, now_ms));
		}

		let (flight, started) = self.current.as_ref()?;
		let elapsed = (now_ms - started) / 1000.0;
		if flight.is_done(elapsed) {
			self.current = None;
			let delay = self.config.relaunch_min_ms
				+ rng.f64() * (self.config.relaunch_max_ms - self.config.relaunch_min_ms).max(0.0);
			self.next_launch.schedule(now_ms + delay);
			return None;
		}

		Some(SpritePose {
			kind: flight.kind,
			center: flight.position(elapsed),
			rotation: flight.rotation(elapsed),
		})
	}
}
