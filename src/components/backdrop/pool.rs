//! Fixed-capacity particle pool.
//!
//! Slots are recycled once their particle expires, so a steady emitter never
//! grows the backing storage past `capacity`. Emission beyond capacity is
//! dropped.

use fastrand::Rng;

use super::parallax::ParallaxView;
use super::particles::{FrameContext, Particle};
use super::surface::Surface;

/// Fixed-capacity storage for trail sparks.
///
/// Expired slots stay in place and are overwritten by the next spawn, so the
/// backing `Vec` never grows past `capacity`.
#[derive(Clone, Debug)]
pub struct TrailPool {
	slots: Vec<Particle>,
	capacity: usize,
}

impl TrailPool {
	pub fn new(capacity: usize) -> Self {
		Self {
			slots: Vec::with_capacity(capacity),
			capacity,
		}
	}

	/// Most particles the pool will ever hold.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of live particles.
	pub fn live(&self) -> usize {
		self.slots.iter().filter(|p| !p.is_expired()).count()
	}

	/// Place `particle` in an expired slot, or a fresh one while under capacity.
	/// Returns false if the pool is full.
	pub fn spawn(&mut self, particle: Particle) -> bool {
		if let Some(slot) = self.slots.iter_mut().find(|p| p.is_expired()) {
			*slot = particle;
			return true;
		}
		if self.slots.len() < self.capacity {
			self.slots.push(particle);
			return true;
		}
		false
	}

	/// Update live particles. Faulty ones are released; the number of
	/// faults is returned.
	pub fn update(&mut self, frame: &FrameContext, rng: &mut Rng) -> usize {
		let mut faults = 0;
		for p in self.slots.iter_mut().filter(|p| !p.is_expired()) {
			if p.update(frame, rng).is_err() {
				faults += 1;
				*p = expired();
			}
		}
		faults
	}

	/// Draw live particles; returns how many failed.
	pub fn draw(&self, surface: &mut dyn Surface, view: &ParallaxView) -> usize {
		let mut faults = 0;
		for p in self.iter() {
			if p.draw(surface, view).is_err() {
				faults += 1;
			}
		}
		faults
	}

	/// Live particles only.
	pub fn iter(&self) -> impl Iterator<Item = &Particle> {
		self.slots.iter().filter(|p| !p.is_expired())
	}
}

fn expired() -> Particle {
	Particle::Trail(Default::default())
}
