//! Page configuration for the backdrop.
//!
//! Every section carries `#[serde(default)]`, so a page only needs to embed the
//! values it wants to override:
//!
//! ```json
//! { "detector": { "threshold_fps": 45 }, "trail": { "capacity": 200 } }
//! ```

use serde::Deserialize;

use crate::error::BackdropError;

/// Number of benchmark points added per FPS of required throughput.
pub const PARTICLES_PER_FPS: f64 = 1000.0;

/// Capability benchmark tuning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
	/// Minimum measured FPS for the High tier.
	pub threshold_fps: f64,
	/// Explicit benchmark point count. Derived from the threshold when unset.
	pub particle_count: Option<usize>,
	/// Length of the sampling window in milliseconds.
	pub duration_ms: f64,
	/// Interval between progress reports in milliseconds.
	pub report_interval_ms: f64,
	/// Offscreen benchmark surface width in pixels.
	pub surface_width: u32,
	/// Offscreen benchmark surface height in pixels.
	pub surface_height: u32,
}

impl DetectorConfig {
	/// Benchmark point count. A stricter threshold always benchmarks a heavier scene.
	pub fn particle_count(&self) -> usize {
		self.particle_count
			.unwrap_or_else(|| (self.threshold_fps.max(1.0) * PARTICLES_PER_FPS).round() as usize)
	}
}

impl Default for DetectorConfig {
	fn default() -> Self {
		Self {
			threshold_fps: 30.0,
			particle_count: None,
			duration_ms: 2000.0,
			report_interval_ms: 100.0,
			surface_width: 400,
			surface_height: 300,
		}
	}
}

/// Population settings for one rendering tier.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierProfile {
	/// Star count at desktop density before viewport scaling.
	pub base_star_count: usize,
	/// Number of nebula clouds.
	pub nebula_count: usize,
	/// Smallest star radius in pixels.
	pub star_size_min: f64,
	/// Largest star radius in pixels.
	pub star_size_max: f64,
	/// Fraction of stars rendered as pulsing red giants.
	pub red_giant_fraction: f64,
	/// Simulate twinkle, flares and shooting stars on the CPU. The WebGL tier
	/// twinkles in its shader instead.
	pub animate_stars: bool,
}

impl TierProfile {
	/// Canvas tier: a thousand stars over four soft nebula clouds.
	pub fn low() -> Self {
		Self {
			base_star_count: 1000,
			nebula_count: 4,
			star_size_min: 1.0,
			star_size_max: 3.0,
			red_giant_fraction: 0.02,
			animate_stars: true,
		}
	}

	/// WebGL tier: a dense point field over six noise-shaded clouds.
	pub fn high() -> Self {
		Self {
			base_star_count: 60_000,
			nebula_count: 6,
			star_size_min: 0.7,
			star_size_max: 1.6,
			red_giant_fraction: 0.0,
			animate_stars: false,
		}
	}
}

impl Default for TierProfile {
	fn default() -> Self {
		Self::low()
	}
}

/// Per-tier population profiles.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierProfiles {
	/// Canvas tier population.
	pub low: TierProfile,
	/// WebGL tier population.
	pub high: TierProfile,
}

impl Default for TierProfiles {
	fn default() -> Self {
		Self {
			low: TierProfile::low(),
			high: TierProfile::high(),
		}
	}
}

/// Viewport buckets and how they scale density.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DensityConfig {
	/// Widths at or below this are treated as mobile.
	pub mobile_max_width: f64,
	/// Widths at or below this (and above mobile) are treated as tablet.
	pub tablet_max_width: f64,
	/// Width/height ratios below this are treated as mobile regardless of width.
	pub narrow_aspect: f64,
	/// Count multipliers for mobile, tablet, desktop.
	pub count_scale: [f64; 3],
	/// Size multipliers for mobile, tablet, desktop.
	pub size_scale: [f64; 3],
	/// Quiet period after the last resize event before rebuilding.
	pub resize_debounce_ms: f64,
}

impl Default for DensityConfig {
	fn default() -> Self {
		Self {
			mobile_max_width: 768.0,
			tablet_max_width: 1280.0,
			narrow_aspect: 0.75,
			count_scale: [0.4, 0.7, 1.0],
			size_scale: [0.75, 0.9, 1.0],
			resize_debounce_ms: 200.0,
		}
	}
}

/// Closed ambient trajectory added to the parallax target.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LissajousConfig {
	/// Peak offset in pixels.
	pub magnitude: f64,
	/// Angular speed in radians per second.
	pub speed: f64,
	/// Horizontal frequency multiplier.
	pub a: f64,
	/// Vertical frequency multiplier.
	pub b: f64,
	/// Horizontal phase offset in radians.
	pub delta: f64,
}

impl Default for LissajousConfig {
	fn default() -> Self {
		Self {
			magnitude: 300.0,
			speed: 0.05,
			a: 3.0,
			b: 4.0,
			delta: std::f64::consts::FRAC_PI_2,
		}
	}
}

/// Pointer parallax tuning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParallaxConfig {
	/// Factors for near, mid and far depth buckets. Must be strictly decreasing.
	pub factors: [f64; 3],
	/// Smoothing rate (per second) while the pointer is active.
	pub follow_rate: f64,
	/// Smoothing rate (per second) while decaying back to center.
	pub idle_rate: f64,
	/// Time without pointer input before the offset recenters.
	pub idle_ms: f64,
	/// Logo displacement ratio.
	pub logo_ratio: f64,
	/// Ambient drift added on top of pointer input.
	pub lissajous: LissajousConfig,
}

impl ParallaxConfig {
	fn validate(&self) -> Result<(), BackdropError> {
		let [near, mid, far] = self.factors;
		if near > mid && mid > far {
			Ok(())
		} else {
			Err(BackdropError::Config(format!(
				"parallax factors must be strictly decreasing, got {:?}",
				self.factors
			)))
		}
	}
}

impl Default for ParallaxConfig {
	fn default() -> Self {
		Self {
			factors: [0.06, 0.04, 0.02],
			follow_rate: 3.0,
			idle_rate: 1.2,
			idle_ms: 3000.0,
			logo_ratio: 0.05,
			lissajous: LissajousConfig::default(),
		}
	}
}

/// Transient effect probabilities and timings. Chances are per frame at 60 FPS.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EffectsConfig {
	/// Chance a new shooting star spawns.
	pub shooting_star_chance: f64,
	/// Opacity lost per second by a shooting star.
	pub shooting_star_decay: f64,
	/// Chance an idle star starts a flare.
	pub flare_chance: f64,
	/// Flare lifetime in seconds.
	pub flare_duration: f64,
	/// Nebula update rate on the canvas tier, in hertz.
	pub nebula_hz: f64,
}

impl Default for EffectsConfig {
	fn default() -> Self {
		Self {
			shooting_star_chance: 0.015,
			shooting_star_decay: 0.6,
			flare_chance: 0.0005,
			flare_duration: 2.5,
			nebula_hz: 10.0,
		}
	}
}

/// Trail particle pool settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrailConfig {
	/// Hard cap on live trail particles.
	pub capacity: usize,
	/// Emission attempts per frame while a sprite is flying.
	pub emit_per_frame: usize,
	/// Alpha lost per second.
	pub fade_rate: f64,
	/// Max speed per axis in pixels per second.
	pub spread: f64,
}

impl Default for TrailConfig {
	fn default() -> Self {
		Self {
			capacity: 500,
			emit_per_frame: 3,
			fade_rate: 1.08,
			spread: 10.0,
		}
	}
}

/// Decorative sprite flythrough timing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlythroughConfig {
	/// Delay after mount before the first sprite launches.
	pub first_launch_ms: f64,
	/// Bounds of the random pause between flights.
	pub relaunch_min_ms: f64,
	pub relaunch_max_ms: f64,
	/// Bounds of the random flight duration, in seconds.
	pub duration_min_s: f64,
	pub duration_max_s: f64,
	/// Sprite size used when the element has no layout width yet.
	pub fallback_size: f64,
}

impl Default for FlythroughConfig {
	fn default() -> Self {
		Self {
			first_launch_ms: 1500.0,
			relaunch_min_ms: 2000.0,
			relaunch_max_ms: 5000.0,
			duration_min_s: 8.0,
			duration_max_s: 16.0,
			fallback_size: 38.0,
		}
	}
}

/// Static resources for one tier.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierAssets {
	/// Directory holding the tier's styles and images.
	pub dir: String,
	/// Stylesheets injected into the head, in order.
	pub stylesheets: Vec<String>,
	/// Scripts appended to the body after the stylesheets load.
	pub scripts: Vec<String>,
}

impl TierAssets {
	fn for_dir(dir: &str) -> Self {
		Self {
			dir: dir.to_string(),
			stylesheets: vec![
				format!("{dir}/styles/main.css"),
				format!("{dir}/styles/animations.css"),
			],
			scripts: Vec::new(),
		}
	}

	/// Path of an image inside the tier's asset directory.
	pub fn image(&self, file: &str) -> String {
		format!("{}/assets/{}", self.dir, file)
	}
}

impl Default for TierAssets {
	fn default() -> Self {
		Self::for_dir("base")
	}
}

/// Asset bundles for both tiers.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
	/// Canvas tier bundle.
	pub low: TierAssets,
	/// WebGL tier bundle.
	pub high: TierAssets,
	/// Logo image file name, resolved inside the active tier's directory.
	pub logo: String,
}

impl Default for AssetConfig {
	fn default() -> Self {
		Self {
			low: TierAssets::for_dir("base"),
			high: TierAssets::for_dir("webgl"),
			logo: "logo.png".to_string(),
		}
	}
}

/// Complete backdrop configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackdropConfig {
	/// Capability benchmark.
	pub detector: DetectorConfig,
	pub tiers: TierProfiles,
	/// Viewport-dependent scaling.
	pub density: DensityConfig,
	pub parallax: ParallaxConfig,
	pub effects: EffectsConfig,
	pub trail: TrailConfig,
	pub flythrough: FlythroughConfig,
	/// Per-tier stylesheets, scripts and images.
	pub assets: AssetConfig,
}

impl BackdropConfig {
	/// Parse a JSON document, filling anything missing from defaults.
	pub fn from_json(text: &str) -> Result<Self, BackdropError> {
		let config: Self = serde_json::from_str(text).map_err(|e| BackdropError::Config(e.to_string()))?;
		config.parallax.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = BackdropConfig::from_json("{}").unwrap();
		assert_eq!(config, BackdropConfig::default());
	}

	#[test]
	fn partial_sections_keep_sibling_defaults() {
		let config =
			BackdropConfig::from_json(r#"{ "detector": { "threshold_fps": 45 }, "trail": { "capacity": 64 } }"#)
				.unwrap();
		assert_eq!(config.detector.threshold_fps, 45.0);
		assert_eq!(config.detector.duration_ms, 2000.0);
		assert_eq!(config.trail.capacity, 64);
		assert_eq!(config.trail.emit_per_frame, 3);
		assert_eq!(config.assets.high.dir, "webgl");
	}

	#[test]
	fn malformed_json_is_a_config_error() {
		let err = BackdropConfig::from_json("{ detector: ").unwrap_err();
		assert!(matches!(err, BackdropError::Config(_)));
	}

	#[test]
	fn parallax_factors_must_decrease() {
		for factors in ["[0.02, 0.04, 0.06]", "[0.06, 0.06, 0.02]", "[0.06, 0.01, 0.02]"] {
			let text = format!(r#"{{ "parallax": {{ "factors": {factors} }} }}"#);
			let err = BackdropConfig::from_json(&text).unwrap_err();
			assert!(matches!(err, BackdropError::Config(ref m) if m.contains("strictly decreasing")), "{err}");
		}
		let config = BackdropConfig::from_json(r#"{ "parallax": { "factors": [0.1, 0.05, 0.01] } }"#).unwrap();
		assert_eq!(config.parallax.factors, [0.1, 0.05, 0.01]);
		assert!(ParallaxConfig::default().validate().is_ok());
	}

	#[test]
	fn only_the_canvas_tier_animates_stars_on_the_cpu() {
		let tiers = TierProfiles::default();
		assert!(tiers.low.animate_stars);
		assert!(!tiers.high.animate_stars);
	}

	#[test]
	fn benchmark_load_grows_with_threshold() {
		let mut previous = 0;
		for threshold in [10.0, 20.0, 30.0, 60.0, 120.0] {
			let config = DetectorConfig {
				threshold_fps: threshold,
				..DetectorConfig::default()
			};
			let count = config.particle_count();
			assert!(count > previous, "{threshold} fps -> {count} points");
			previous = count;
		}
		assert_eq!(DetectorConfig::default().particle_count(), 30_000);
	}

	#[test]
	fn explicit_particle_count_wins() {
		let config = BackdropConfig::from_json(r#"{ "detector": { "particle_count": 1234 } }"#).unwrap();
		assert_eq!(config.detector.particle_count(), 1234);
	}

	#[test]
	fn tier_assets_resolve_images() {
		let assets = AssetConfig::default();
		assert_eq!(assets.low.image("rocket.png"), "base/assets/rocket.png");
		assert_eq!(assets.high.stylesheets[0], "webgl/styles/main.css");
	}
}
