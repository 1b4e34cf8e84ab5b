//! Frame-rate sampling for the benchmark window.
//!
//! The sampler is fed the timestamp of every rendered frame. It never schedules
//! anything itself, so progress reporting cannot skew the measurement.

use crate::config::DetectorConfig;

/// Progress snapshot for UI feedback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
	pub fps: f64,
	/// Elapsed fraction of the sampling window, in [0, 1].
	pub fraction: f64,
}

/// Result of feeding one frame timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleStep {
	/// Keep rendering. `report` is set when a report interval has elapsed.
	Running { report: Option<Progress> },
	/// Window closed; final measured rate.
	Complete { fps: f64 },
}

/// Counts frames over a fixed wall-clock window.
#[derive(Clone, Debug)]
pub struct FpsSampler {
	start_ms: f64,
	duration_ms: f64,
	report_interval_ms: f64,
	last_report_ms: f64,
	frames: u32,
	done: bool,
}

impl FpsSampler {
	pub fn new(config: &DetectorConfig, start_ms: f64) -> Self {
		Self {
			start_ms,
			duration_ms: config.duration_ms.max(1.0),
			report_interval_ms: config.report_interval_ms.max(1.0),
			last_report_ms: start_ms,
			frames: 0,
			done: false,
		}
	}

	fn rate(&self, elapsed_ms: f64) -> f64 {
		if elapsed_ms <= 0.0 {
			0.0
		} else {
			self.frames as f64 / (elapsed_ms / 1000.0)
		}
	}

	/// Account for a frame rendered at `now_ms`.
	///
	/// Frames inside the window are counted; the first frame at or past the end
	/// closes the window and yields the final rate.
	pub fn frame(&mut self, now_ms: f64) -> SampleStep {
		let elapsed = now_ms - self.start_ms;
		if self.done || elapsed >= self.duration_ms {
			self.done = true;
			return SampleStep::Complete {
				fps: self.rate(elapsed),
			};
		}

		self.frames += 1;
		let report = if now_ms - self.last_report_ms >= self.report_interval_ms {
			self.last_report_ms = now_ms;
			Some(Progress {
				fps: self.rate(elapsed),
				fraction: (elapsed / self.duration_ms).clamp(0.0, 1.0),
			})
		} else {
			None
		};
		SampleStep::Running { report }
	}

	pub fn frames(&self) -> u32 {
		self.frames
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::detector::state::{Tier, decide};

	/// Feed a constant frame rate until the sampler completes.
	fn run_at(fps: f64, config: &DetectorConfig) -> (f64, Vec<Progress>) {
		let start = 1_000.0;
		let mut sampler = FpsSampler::new(config, start);
		let mut reports = Vec::new();
		let mut n = 1.0;
		loop {
			match sampler.frame(start + n * 1000.0 / fps) {
				SampleStep::Running { report } => reports.extend(report),
				SampleStep::Complete { fps } => return (fps, reports),
			}
			n += 1.0;
		}
	}

	#[test]
	fn measures_steady_frame_rate() {
		let (fps, _) = run_at(60.0, &DetectorConfig::default());
		assert!((fps - 60.0).abs() < 1.0, "measured {fps}");
	}

	#[test]
	fn eighteen_fps_fails_a_twenty_fps_threshold() {
		let (fps, _) = run_at(18.0, &DetectorConfig::default());
		assert!(fps < 20.0);
		assert_eq!(decide(fps, 20.0), Tier::Low);
	}

	#[test]
	fn deterministic_feed_is_reproducible() {
		let config = DetectorConfig::default();
		let a = run_at(37.0, &config);
		let b = run_at(37.0, &config);
		assert_eq!(a.0, b.0);
		assert_eq!(decide(a.0, 30.0), decide(b.0, 30.0));
	}

	#[test]
	fn reports_respect_interval_and_progress_grows() {
		let (_, reports) = run_at(120.0, &DetectorConfig::default());
		// 2000ms window at 100ms cadence
		assert!(reports.len() >= 18 && reports.len() <= 20, "{} reports", reports.len());
		for pair in reports.windows(2) {
			assert!(pair[1].fraction > pair[0].fraction);
		}
		assert!(reports.iter().all(|r| r.fraction <= 1.0));
	}

	#[test]
	fn completed_sampler_stays_complete() {
		let config = DetectorConfig::default();
		let mut sampler = FpsSampler::new(&config, 0.0);
		sampler.frame(500.0);
		assert!(matches!(sampler.frame(2500.0), SampleStep::Complete { .. }));
		assert!(matches!(sampler.frame(2600.0), SampleStep::Complete { .. }));
		assert_eq!(sampler.frames(), 1);
	}
}
