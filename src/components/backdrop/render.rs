//! Canvas rendering for the Low tier.
//!
//! Two layers, each on its own canvas:
//! 1. Nebula clouds, redrawn only when the simulation ticked them
//! 2. Stars, then shooting stars, then trail sparks, redrawn every frame
//!
//! A particle that fails to draw is skipped; the rest of the frame continues.

use super::parallax::ParallaxView;
use super::particles::Particle;
use super::simulation::SimulationContext;
use super::surface::Surface;
use crate::error::BackdropError;

/// Draw each particle, counting the ones that failed.
fn draw_all<'a>(
	surface: &mut dyn Surface,
	particles: impl IntoIterator<Item = &'a Particle>,
	view: &ParallaxView,
) -> usize {
	particles
		.into_iter()
		.filter(|p| p.draw(surface, view).is_err())
		.count()
}

/// Star layer. Returns the number of particles skipped.
pub fn draw_stars_layer(surface: &mut dyn Surface, sim: &SimulationContext) -> Result<usize, BackdropError> {
	surface.clear()?;
	let view = sim.view();
	let mut skipped = draw_all(surface, sim.stars(), &view);
	skipped += draw_all(surface, sim.shooting_stars(), &view);
	skipped += sim.trail().draw(surface, &view);
	Ok(skipped)
}

/// Nebula layer. Clouds ignore parallax.
pub fn draw_nebula_layer(surface: &mut dyn Surface, sim: &SimulationContext) -> Result<usize, BackdropError> {
	surface.clear()?;
	Ok(draw_all(surface, sim.nebulae(), &ParallaxView::default()))
}

#[cfg(test)]
mod tests {
	use fastrand::Rng;

	use super::*;
	use crate::components::backdrop::particles::tests::RecordingSurface;
	use crate::config::{BackdropConfig, TierProfile};

	fn sim(rng: &mut Rng) -> SimulationContext {
		let mut profile = TierProfile::low();
		profile.base_star_count = 50;
		SimulationContext::new(&profile, &BackdropConfig::default(), (1920.0, 1080.0), 0.0, rng)
	}

	#[test]
	fn star_layer_draws_every_star() {
		let mut rng = Rng::with_seed(1);
		let s = sim(&mut rng);
		let mut surface = RecordingSurface::default();
		assert_eq!(draw_stars_layer(&mut surface, &s).unwrap(), 0);
		assert_eq!(surface.circles.len(), 50);
	}

	#[test]
	fn nebula_layer_draws_glows() {
		let mut rng = Rng::with_seed(2);
		let s = sim(&mut rng);
		let mut surface = RecordingSurface::default();
		assert_eq!(draw_nebula_layer(&mut surface, &s).unwrap(), 0);
		assert_eq!(surface.glows, 4);
	}

	#[test]
	fn failing_surface_skips_particles() {
		let mut rng = Rng::with_seed(3);
		let s = sim(&mut rng);
		let mut surface = RecordingSurface::default();
		surface.fail = true;
		assert!(draw_stars_layer(&mut surface, &s).is_err());

		// Clearing succeeded but every particle failed: the frame still completes.
		let mut skipped = 0;
		surface.fail = false;
		surface.clear().unwrap();
		surface.fail = true;
		skipped += draw_all(&mut surface, s.stars(), &s.view());
		assert_eq!(skipped, 50);
	}
}
