//! Device orientation access negotiation.
//!
//! Some browsers expose orientation events freely, some gate them behind an
//! async permission prompt that must start from a user gesture, and desktop
//! browsers may not expose them at all.

use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::js_message;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationAccess {
	Granted,
	Denied,
	Unsupported,
}

/// Map a permission prompt answer. `None` means the prompt itself failed.
pub fn classify_permission(answer: Option<&str>) -> OrientationAccess {
	match answer {
		Some("granted") => OrientationAccess::Granted,
		_ => OrientationAccess::Denied,
	}
}

fn event_constructor() -> Option<JsValue> {
	let window = web_sys::window()?;
	Reflect::get(&window, &JsValue::from_str("DeviceOrientationEvent"))
		.ok()
		.filter(|v| !v.is_undefined())
}

fn permission_prompt(constructor: &JsValue) -> Option<Function> {
	Reflect::get(constructor, &JsValue::from_str("requestPermission"))
		.ok()
		.and_then(|f| f.dyn_into::<Function>().ok())
}

/// True when access has to be requested from inside a user gesture.
pub fn needs_gesture() -> bool {
	event_constructor().as_ref().and_then(permission_prompt).is_some()
}

/// Negotiate access, prompting the user when the browser requires it.
pub async fn request_access() -> OrientationAccess {
	let Some(constructor) = event_constructor() else {
		return OrientationAccess::Unsupported;
	};
	let Some(prompt) = permission_prompt(&constructor) else {
		return OrientationAccess::Granted;
	};

	let promise = match prompt.call0(&constructor) {
		Ok(p) => p,
		Err(e) => {
			log::debug!("starfield-backdrop: orientation prompt failed: {}", js_message(&e));
			return classify_permission(None);
		}
	};
	let answer = match promise.dyn_into::<js_sys::Promise>() {
		Ok(p) => JsFuture::from(p).await,
		Err(v) => Ok(v),
	};
	let access = match answer {
		Ok(v) => classify_permission(v.as_string().as_deref()),
		Err(e) => {
			log::debug!("starfield-backdrop: orientation prompt rejected: {}", js_message(&e));
			classify_permission(None)
		}
	};
	log::debug!("starfield-backdrop: orientation access {access:?}");
	access
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_granted_grants() {
		assert_eq!(classify_permission(Some("granted")), OrientationAccess::Granted);
		assert_eq!(classify_permission(Some("denied")), OrientationAccess::Denied);
		assert_eq!(classify_permission(Some("prompt")), OrientationAccess::Denied);
		assert_eq!(classify_permission(None), OrientationAccess::Denied);
	}
}
