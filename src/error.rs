//! Error taxonomy for detection, bootstrap and per-frame work.
//!
//! Nothing here is fatal to the page: every variant maps to a degradation
//! (fall back to the Low tier, or skip one entity for one frame).

use wasm_bindgen::JsValue;

/// Errors raised while detecting capabilities, loading assets or animating.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BackdropError {
	/// A hardware-accelerated rendering context could not be created.
	#[error("rendering context unavailable: {0}")]
	UnsupportedCapability(String),

	/// Shader compilation, program linking or the benchmark loop failed.
	#[error("benchmark failed: {0}")]
	BenchmarkFailure(String),

	/// A tier-specific stylesheet or script failed to load.
	#[error("failed to load asset {url}: {reason}")]
	AssetLoadFailure { url: String, reason: String },

	/// Updating or drawing a single particle failed.
	#[error("frame fault: {0}")]
	PerFrameFault(String),

	/// Page configuration could not be parsed.
	#[error("invalid configuration: {0}")]
	Config(String),
}

/// Render a thrown JS value as a readable message.
pub fn js_message(value: &JsValue) -> String {
	value
		.as_string()
		.or_else(|| {
			js_sys::Reflect::get(value, &"message".into())
				.ok()
				.and_then(|m| m.as_string())
		})
		.unwrap_or_else(|| format!("{:?}", value))
}

/// Shorthand for mapping a JS exception into a per-frame fault.
pub fn frame_fault(value: JsValue) -> BackdropError {
	BackdropError::PerFrameFault(js_message(&value))
}
