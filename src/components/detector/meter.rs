//! Benchmark progress feedback for the loading screen.

use std::f64::consts::PI;

use leptos::prelude::*;

use super::probe::GpuClass;
use super::sampler::Progress;

/// Upper bound of the circular FPS gauge.
pub const GAUGE_MAX_FPS: f64 = 244.0;
/// Radius of the gauge circle in SVG units.
pub const GAUGE_RADIUS: f64 = 50.0;

/// Receives side-effect-only updates while detection runs.
pub trait ProgressObserver {
	fn on_progress(&self, progress: Progress);
	fn on_gpu(&self, renderer: &str, class: GpuClass);
	/// Benchmark window opened (`true`) or closed (`false`).
	fn set_visible(&self, visible: bool);
}

/// Stroke dash offset that fills the gauge proportionally to `fps`.
pub fn gauge_dash_offset(fps: f64) -> f64 {
	let circumference = 2.0 * PI * GAUGE_RADIUS;
	let fraction = fps.clamp(0.0, GAUGE_MAX_FPS) / GAUGE_MAX_FPS;
	circumference - fraction * circumference
}

/// Circumference of the gauge, used as its dash array.
pub fn gauge_circumference() -> f64 {
	2.0 * PI * GAUGE_RADIUS
}

/// Latest state shown by the loading screen meter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeterReading {
	pub visible: bool,
	pub fps: f64,
	pub fraction: f64,
	pub gpu: Option<String>,
}

/// Observer that publishes into a Leptos signal.
#[derive(Clone, Copy)]
pub struct SignalMeter {
	reading: RwSignal<MeterReading>,
}

impl SignalMeter {
	pub fn new(reading: RwSignal<MeterReading>) -> Self {
		Self { reading }
	}
}

impl ProgressObserver for SignalMeter {
	fn on_progress(&self, progress: Progress) {
		self.reading.update(|r| {
			if r.visible {
				r.fps = progress.fps;
				r.fraction = progress.fraction;
			}
		});
	}

	fn on_gpu(&self, renderer: &str, class: GpuClass) {
		let label = format!("GPU: {} ({})", renderer, class.label());
		self.reading.update(|r| r.gpu = Some(label));
	}

	fn set_visible(&self, visible: bool) {
		self.reading.update(|r| r.visible = visible);
	}
}

/// Circular gauge, progress bar and GPU line shown during the benchmark.
#[component]
pub fn PerformanceMeter(reading: RwSignal<MeterReading>) -> impl IntoView {
	let circumference = gauge_circumference();
	view! {
		<div
			id="gpu-info"
			style=move || if reading.get().gpu.is_some() { "display: block;" } else { "display: none;" }
		>
			{move || reading.get().gpu.unwrap_or_default()}
		</div>
		<div
			id="performance-meter"
			style=move || if reading.get().visible { "display: block;" } else { "display: none;" }
		>
			<svg class="fps-gauge" viewBox="0 0 120 120">
				<circle class="fps-gauge-track" cx="60" cy="60" r="50" />
				<circle
					id="fps-gauge-fill"
					cx="60"
					cy="60"
					r="50"
					stroke-dasharray=circumference.to_string()
					style=move || format!("stroke-dashoffset: {};", gauge_dash_offset(reading.get().fps))
				/>
			</svg>
			<span id="fps-value">{move || format!("{:.1}", reading.get().fps)}</span>
			<div class="progress-bar">
				<div
					id="progress-fill"
					style=move || format!("width: {}%;", reading.get().fraction * 100.0)
				/>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gauge_is_empty_at_zero_and_full_at_max() {
		assert!((gauge_dash_offset(0.0) - gauge_circumference()).abs() < 1e-9);
		assert!(gauge_dash_offset(GAUGE_MAX_FPS).abs() < 1e-9);
		assert!(gauge_dash_offset(1000.0).abs() < 1e-9);
	}

	#[test]
	fn gauge_fills_linearly() {
		let half = gauge_dash_offset(GAUGE_MAX_FPS / 2.0);
		assert!((half - gauge_circumference() / 2.0).abs() < 1e-9);
		assert!(gauge_dash_offset(30.0) > gauge_dash_offset(60.0));
	}
}
