//! Viewport-dependent particle density.
//!
//! The viewport is classified into one of three buckets, each with its own
//! count and size multiplier:
//!
//! - [`ViewportBucket::Mobile`]: narrow widths, or any portrait-tall aspect.
//! - [`ViewportBucket::Tablet`]: medium widths.
//! - [`ViewportBucket::Desktop`]: everything wider.
//!
//! Multipliers apply to the whole population on every rebuild, not only to
//! particles created afterwards.

use crate::config::DensityConfig;

/// Viewport size class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportBucket {
	Mobile,
	Tablet,
	Desktop,
}

impl ViewportBucket {
	pub fn classify(width: f64, height: f64, config: &DensityConfig) -> Self {
		let aspect = if height > 0.0 { width / height } else { 1.0 };
		if width <= config.mobile_max_width || aspect < config.narrow_aspect {
			ViewportBucket::Mobile
		} else if width <= config.tablet_max_width {
			ViewportBucket::Tablet
		} else {
			ViewportBucket::Desktop
		}
	}

	fn index(self) -> usize {
		match self {
			ViewportBucket::Mobile => 0,
			ViewportBucket::Tablet => 1,
			ViewportBucket::Desktop => 2,
		}
	}

	pub fn count_scale(self, config: &DensityConfig) -> f64 {
		config.count_scale[self.index()]
	}

	pub fn size_scale(self, config: &DensityConfig) -> f64 {
		config.size_scale[self.index()]
	}
}

/// Density for a specific viewport, computed once per rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Density {
	pub bucket: ViewportBucket,
	pub count_scale: f64,
	pub size_scale: f64,
}

impl Density {
	pub fn new(width: f64, height: f64, config: &DensityConfig) -> Self {
		let bucket = ViewportBucket::classify(width, height, config);
		Self {
			bucket,
			count_scale: bucket.count_scale(config),
			size_scale: bucket.size_scale(config),
		}
	}

	/// `round(base * count_scale)`.
	pub fn target_count(&self, base: usize) -> usize {
		(base as f64 * self.count_scale).round() as usize
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_common_viewports() {
		let config = DensityConfig::default();
		assert_eq!(ViewportBucket::classify(375.0, 812.0, &config), ViewportBucket::Mobile);
		assert_eq!(ViewportBucket::classify(1024.0, 768.0, &config), ViewportBucket::Tablet);
		assert_eq!(ViewportBucket::classify(1920.0, 1080.0, &config), ViewportBucket::Desktop);
	}

	#[test]
	fn tall_windows_count_as_mobile() {
		let config = DensityConfig::default();
		assert_eq!(ViewportBucket::classify(1000.0, 1800.0, &config), ViewportBucket::Mobile);
	}

	#[test]
	fn degenerate_height_does_not_divide_by_zero() {
		let config = DensityConfig::default();
		assert_eq!(ViewportBucket::classify(1920.0, 0.0, &config), ViewportBucket::Desktop);
	}

	#[test]
	fn target_count_rounds() {
		let config = DensityConfig::default();
		let mobile = Density::new(400.0, 800.0, &config);
		assert_eq!(mobile.target_count(1000), 400);
		assert_eq!(mobile.target_count(3), 1);
		let tablet = Density::new(1000.0, 800.0, &config);
		assert_eq!(tablet.target_count(1001), 701);
		let desktop = Density::new(1600.0, 900.0, &config);
		assert_eq!(desktop.target_count(1000), 1000);
		assert_eq!(desktop.size_scale, 1.0);
	}
}
