//! 2D drawing surface used by the canvas tier.
//!
//! Particles draw through this trait rather than a concrete canvas context so
//! their drawing can be exercised without a browser.

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::theme::Color;
use crate::error::{BackdropError, frame_fault};

/// Minimal set of primitives the particles need.
pub trait Surface {
	fn clear(&mut self) -> Result<(), BackdropError>;
	fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Color) -> Result<(), BackdropError>;
	fn line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		width: f64,
		color: Color,
	) -> Result<(), BackdropError>;
	/// Line whose color fades from `head` at `from` to `tail` at `to`.
	fn gradient_line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		width: f64,
		head: Color,
		tail: Color,
	) -> Result<(), BackdropError>;
	/// Filled disc with a radial gradient; stops are `(offset, color)`.
	fn radial_glow(
		&mut self,
		center: (f64, f64),
		radius: f64,
		stops: &[(f64, Color)],
	) -> Result<(), BackdropError>;
}

/// [`Surface`] over an HTML canvas 2D context.
pub struct CanvasSurface {
	ctx: CanvasRenderingContext2d,
	width: f64,
	height: f64,
}

impl CanvasSurface {
	pub fn new(ctx: CanvasRenderingContext2d, width: f64, height: f64) -> Self {
		Self { ctx, width, height }
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

impl Surface for CanvasSurface {
	fn clear(&mut self) -> Result<(), BackdropError> {
		self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
		Ok(())
	}

	fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Color) -> Result<(), BackdropError> {
		self.ctx.begin_path();
		self.ctx.arc(x, y, radius.max(0.0), 0.0, PI * 2.0).map_err(frame_fault)?;
		self.ctx.set_fill_style_str(&color.to_css());
		self.ctx.fill();
		Ok(())
	}

	fn line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		width: f64,
		color: Color,
	) -> Result<(), BackdropError> {
		self.ctx.set_stroke_style_str(&color.to_css());
		self.ctx.set_line_width(width);
		self.ctx.begin_path();
		self.ctx.move_to(from.0, from.1);
		self.ctx.line_to(to.0, to.1);
		self.ctx.stroke();
		Ok(())
	}

	fn gradient_line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		width: f64,
		head: Color,
		tail: Color,
	) -> Result<(), BackdropError> {
		let gradient = self.ctx.create_linear_gradient(from.0, from.1, to.0, to.1);
		gradient.add_color_stop(0.0, &head.to_css()).map_err(frame_fault)?;
		gradient.add_color_stop(1.0, &tail.to_css()).map_err(frame_fault)?;
		#[allow(deprecated)]
		self.ctx.set_stroke_style(&gradient);
		self.ctx.set_line_width(width);
		self.ctx.begin_path();
		self.ctx.move_to(from.0, from.1);
		self.ctx.line_to(to.0, to.1);
		self.ctx.stroke();
		Ok(())
	}

	fn radial_glow(
		&mut self,
		center: (f64, f64),
		radius: f64,
		stops: &[(f64, Color)],
	) -> Result<(), BackdropError> {
		let (x, y) = center;
		let gradient = self
			.ctx
			.create_radial_gradient(x, y, 0.0, x, y, radius)
			.map_err(frame_fault)?;
		for (offset, color) in stops {
			gradient
				.add_color_stop(*offset as f32, &color.to_css())
				.map_err(frame_fault)?;
		}
		#[allow(deprecated)]
		self.ctx.set_fill_style(&gradient);
		self.ctx.begin_path();
		self.ctx.arc(x, y, radius, 0.0, PI * 2.0).map_err(frame_fault)?;
		self.ctx.fill();
		Ok(())
	}
}
