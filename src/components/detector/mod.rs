//! Capability detection.
//!
//! Decides between the canvas tier and the WebGL tier:
//! 1. Probe for a WebGL context; none means the canvas tier
//! 2. Render a heavy offscreen scene for a fixed window while sampling FPS
//! 3. Compare the measured rate against the configured threshold
//!
//! The decision is exposed to the page as `window.__backdropDetection`.

pub mod bootstrap;
mod meter;
pub mod probe;
pub mod sampler;
pub mod state;

use std::rc::Rc;

use wasm_bindgen::JsValue;

pub use bootstrap::bootstrap;
pub use meter::{MeterReading, PerformanceMeter, ProgressObserver, SignalMeter, gauge_dash_offset};
pub use state::{DetectionResult, Detector, DetectorPhase, Tier, decide};

use crate::config::DetectorConfig;
use crate::error::js_message;

/// Global the final result is published under.
const HANDOFF_KEY: &str = "__backdropDetection";

/// Run detection end to end. Never fails: every error degrades to the canvas tier.
pub async fn detect(config: &DetectorConfig, observer: Option<Rc<dyn ProgressObserver>>) -> DetectionResult {
	let mut detector = Detector::new(config.threshold_fps);
	detector.start();

	match probe::check_support(config) {
		Ok(surface) => {
			detector.on_support(Ok(()));
			if let (Some(obs), Some(renderer)) = (observer.as_ref(), surface.renderer.as_deref()) {
				obs.on_gpu(renderer, probe::classify_renderer(renderer));
			}
			if let Some(obs) = &observer {
				obs.set_visible(true);
			}
			let measured = probe::run_benchmark(&surface, config, observer.clone()).await;
			if let Some(obs) = &observer {
				obs.set_visible(false);
			}
			detector.on_benchmark(measured);
		}
		Err(e) => detector.on_support(Err(e)),
	}

	let result = detector.result().cloned().unwrap_or_else(DetectionResult::unsupported);
	publish(&result);
	result
}

/// Expose the result on `window` for debugging.
fn publish(result: &DetectionResult) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let published = serde_json::to_string(result)
		.map_err(|e| e.to_string())
		.and_then(|json| js_sys::JSON::parse(&json).map_err(|e| js_message(&e)))
		.and_then(|value| {
			js_sys::Reflect::set(&window, &JsValue::from_str(HANDOFF_KEY), &value).map_err(|e| js_message(&e))
		});
	if let Err(e) = published {
		log::debug!("starfield-backdrop: could not publish detection result: {e}");
	}
}
