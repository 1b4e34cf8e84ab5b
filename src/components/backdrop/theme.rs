//! Colors and palettes for stars, streaks, clouds and trails.

use fastrand::Rng;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self {
			a: a.clamp(0.0, 1.0),
			..self
		}
	}

	/// Add a flat amount to every channel, saturating at 255.
	pub fn brighten(self, amount: u8) -> Self {
		Self {
			r: self.r.saturating_add(amount),
			g: self.g.saturating_add(amount),
			b: self.b.saturating_add(amount),
			a: self.a,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
		}
	}

	/// Normalized RGB for shader attributes and uniforms.
	pub fn to_gl(self) -> [f32; 3] {
		[
			self.r as f32 / 255.0,
			self.g as f32 / 255.0,
			self.b as f32 / 255.0,
		]
	}
}

pub const STAR_WHITE_BLUE: Color = Color::rgb(200, 200, 255);
pub const STAR_YELLOW_WHITE: Color = Color::rgb(255, 255, 200);
pub const STAR_RED_TINTED: Color = Color::rgb(255, 180, 180);
pub const RED_GIANT: Color = Color::rgb(255, 100, 100);
pub const TRAIL: Color = Color::rgb(174, 198, 255);

/// Star color: mostly white-blue, some yellow-white, a few red-tinted.
pub fn star_color(rng: &mut Rng) -> Color {
	let roll = rng.f64();
	if roll < 0.7 {
		STAR_WHITE_BLUE
	} else if roll < 0.9 {
		STAR_YELLOW_WHITE
	} else {
		STAR_RED_TINTED
	}
}

/// Head and tail colors of a shooting star streak.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreakColors {
	pub head: Color,
	pub tail: Color,
}

pub const STREAKS: [StreakColors; 3] = [
	// Red
	StreakColors {
		head: Color::rgb(255, 100, 100),
		tail: Color::rgba(255, 0, 0, 0.0),
	},
	// White/blue
	StreakColors {
		head: Color::rgb(200, 220, 255),
		tail: Color::rgba(200, 220, 255, 0.0),
	},
	// Gold
	StreakColors {
		head: Color::rgb(255, 255, 200),
		tail: Color::rgba(255, 255, 0, 0.0),
	},
];

pub fn streak_colors(rng: &mut Rng) -> StreakColors {
	STREAKS[rng.usize(..STREAKS.len())]
}

/// Nebula hue: magenta/violet family with no green channel.
pub fn nebula_color(rng: &mut Rng) -> Color {
	let r = if rng.bool() { 255 } else { 100 };
	let b = if rng.bool() { 255 } else { 150 };
	Color::rgb(r, 0, b)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn brighten_saturates() {
		let c = Color::rgb(200, 10, 255).brighten(70);
		assert_eq!((c.r, c.g, c.b), (255, 80, 255));
	}

	#[test]
	fn css_formats() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(Color::rgb(1, 2, 3).with_alpha(0.5).to_css(), "rgba(1, 2, 3, 0.500)");
	}

	#[test]
	fn star_palette_is_weighted() {
		let mut rng = Rng::with_seed(7);
		let mut white_blue = 0;
		for _ in 0..10_000 {
			if star_color(&mut rng) == STAR_WHITE_BLUE {
				white_blue += 1;
			}
		}
		assert!((6500..7500).contains(&white_blue), "{white_blue}");
	}

	#[test]
	fn nebula_colors_have_no_green() {
		let mut rng = Rng::with_seed(3);
		for _ in 0..32 {
			let c = nebula_color(&mut rng);
			assert_eq!(c.g, 0);
			assert!(c.r == 255 || c.r == 100);
			assert!(c.b == 255 || c.b == 150);
		}
	}
}
