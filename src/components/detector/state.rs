//! Tier decision and the per-load detection state machine.
//!
//! ```text
//! Init -> CheckSupport -> Benchmark -> Decided(High | Low)
//!              \______________________/
//!               unsupported -> Decided(Low)
//! ```
//!
//! `Decided` is terminal. Calls that do not match the current phase are ignored.

use log::{info, warn};
use serde::Serialize;

use crate::error::BackdropError;

/// Selected rendering strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Tier {
	/// 2D canvas.
	Low,
	/// WebGL.
	High,
}

impl Tier {
	/// Tier to try when this one cannot start. The canvas tier has nowhere left to go.
	pub fn fallback(self) -> Option<Tier> {
		match self {
			Tier::High => Some(Tier::Low),
			Tier::Low => None,
		}
	}
}

/// Outcome of capability detection. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
	/// Whether an accelerated context could be created at all.
	pub supported: bool,
	/// Benchmark throughput in frames per second, 0 when unsupported.
	pub measured_score: f64,
	pub selected_tier: Tier,
}

impl DetectionResult {
	/// Result used when no accelerated context exists.
	pub fn unsupported() -> Self {
		Self {
			supported: false,
			measured_score: 0.0,
			selected_tier: Tier::Low,
		}
	}
}

/// Single comparison between measured throughput and the threshold.
pub fn decide(fps: f64, threshold: f64) -> Tier {
	if fps >= threshold {
		Tier::High
	} else {
		Tier::Low
	}
}

/// Detection phases.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectorPhase {
	Init,
	CheckSupport,
	Benchmark,
	Decided(DetectionResult),
}

/// Drives the detection phases for one page load.
#[derive(Clone, Debug)]
pub struct Detector {
	threshold: f64,
	phase: DetectorPhase,
}

impl Detector {
	pub fn new(threshold: f64) -> Self {
		Self {
			threshold,
			phase: DetectorPhase::Init,
		}
	}

	pub fn phase(&self) -> &DetectorPhase {
		&self.phase
	}

	/// The final result, once decided.
	pub fn result(&self) -> Option<&DetectionResult> {
		match &self.phase {
			DetectorPhase::Decided(result) => Some(result),
			_ => None,
		}
	}

	/// Init -> CheckSupport.
	pub fn start(&mut self) {
		if self.phase == DetectorPhase::Init {
			self.phase = DetectorPhase::CheckSupport;
		}
	}

	/// Record the support probe. Any error decides Low immediately.
	pub fn on_support(&mut self, probe: Result<(), BackdropError>) {
		if self.phase != DetectorPhase::CheckSupport {
			return;
		}
		self.phase = match probe {
			Ok(()) => DetectorPhase::Benchmark,
			Err(e) => {
				info!("starfield-backdrop: {}, using canvas tier", e);
				DetectorPhase::Decided(DetectionResult::unsupported())
			}
		};
	}

	/// Record the benchmark outcome. Failures count as a failed test.
	pub fn on_benchmark(&mut self, measured: Result<f64, BackdropError>) {
		if self.phase != DetectorPhase::Benchmark {
			return;
		}
		let result = match measured {
			Ok(fps) => {
				let selected_tier = decide(fps, self.threshold);
				info!(
					"starfield-backdrop: benchmark {:.1} fps (threshold {:.1}) -> {:?}",
					fps, self.threshold, selected_tier
				);
				DetectionResult {
					supported: true,
					measured_score: fps,
					selected_tier,
				}
			}
			Err(e) => {
				warn!("starfield-backdrop: {}, using canvas tier", e);
				DetectionResult {
					supported: true,
					measured_score: 0.0,
					selected_tier: Tier::Low,
				}
			}
		};
		self.phase = DetectorPhase::Decided(result);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn unsupported() -> BackdropError {
		BackdropError::UnsupportedCapability("no webgl".into())
	}

	#[test]
	fn only_webgl_has_a_fallback() {
		assert_eq!(Tier::High.fallback(), Some(Tier::Low));
		assert_eq!(Tier::Low.fallback(), None);
	}

	#[test]
	fn decision_is_a_single_comparison() {
		assert_eq!(decide(18.0, 20.0), Tier::Low);
		assert_eq!(decide(20.0, 20.0), Tier::High);
		assert_eq!(decide(144.0, 30.0), Tier::High);
		assert_eq!(decide(29.99, 30.0), Tier::Low);
	}

	#[test]
	fn happy_path_walks_every_phase() {
		let mut d = Detector::new(30.0);
		assert_eq!(d.phase(), &DetectorPhase::Init);
		d.start();
		assert_eq!(d.phase(), &DetectorPhase::CheckSupport);
		d.on_support(Ok(()));
		assert_eq!(d.phase(), &DetectorPhase::Benchmark);
		d.on_benchmark(Ok(59.6));
		let result = d.result().unwrap();
		assert!(result.supported);
		assert_eq!(result.selected_tier, Tier::High);
		assert_eq!(result.measured_score, 59.6);
	}

	#[test]
	fn context_failure_always_selects_low() {
		let mut d = Detector::new(0.0);
		d.start();
		d.on_support(Err(unsupported()));
		// A late benchmark report cannot revive the decision.
		d.on_benchmark(Ok(1000.0));
		let result = d.result().unwrap();
		assert!(!result.supported);
		assert_eq!(result.selected_tier, Tier::Low);
	}

	#[test]
	fn benchmark_failure_selects_low() {
		let mut d = Detector::new(30.0);
		d.start();
		d.on_support(Ok(()));
		d.on_benchmark(Err(BackdropError::BenchmarkFailure("link failed".into())));
		let result = d.result().unwrap();
		assert!(result.supported);
		assert_eq!(result.selected_tier, Tier::Low);
		assert_eq!(result.measured_score, 0.0);
	}

	#[test]
	fn slow_device_falls_below_threshold() {
		let mut d = Detector::new(20.0);
		d.start();
		d.on_support(Ok(()));
		d.on_benchmark(Ok(18.0));
		assert_eq!(d.result().unwrap().selected_tier, Tier::Low);
	}

	#[test]
	fn out_of_order_calls_are_ignored() {
		let mut d = Detector::new(30.0);
		d.on_support(Ok(()));
		assert_eq!(d.phase(), &DetectorPhase::Init);
		d.on_benchmark(Ok(60.0));
		assert_eq!(d.phase(), &DetectorPhase::Init);
		assert!(d.result().is_none());
	}

	#[test]
	fn result_serializes_for_debug_handoff() {
		let result = DetectionResult {
			supported: true,
			measured_score: 42.0,
			selected_tier: Tier::High,
		};
		let json = serde_json::to_string(&result).unwrap();
		assert_eq!(json, r#"{"supported":true,"measuredScore":42.0,"selectedTier":"High"}"#);
	}
}
