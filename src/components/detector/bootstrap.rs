//! Tier asset bootstrap.
//!
//! Each tier ships a stylesheet bundle and an optional script bundle. They are
//! appended to `<head>` and awaited through their `load`/`error` events. A
//! High tier that fails to load falls back to the Low tier bundle; a Low tier
//! failure is logged and the Low tier is used anyway.

use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlElement, HtmlLinkElement, HtmlScriptElement};

use super::state::Tier;
use crate::config::{AssetConfig, TierAssets};
use crate::error::{BackdropError, js_message};

/// What to do after a bundle load attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStep {
	Done(Tier),
	Retry(Tier),
}

/// Fallback policy: only a failed High bundle is retried, as Low.
pub fn after_attempt(attempt: Tier, loaded: bool) -> BootStep {
	match (loaded, attempt.fallback()) {
		(false, Some(next)) => BootStep::Retry(next),
		_ => BootStep::Done(attempt),
	}
}

fn document() -> Result<Document, BackdropError> {
	web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| BackdropError::AssetLoadFailure {
			url: String::new(),
			reason: "no document".into(),
		})
}

fn load_failure(url: &str, reason: impl Into<String>) -> BackdropError {
	BackdropError::AssetLoadFailure {
		url: url.to_string(),
		reason: reason.into(),
	}
}

/// Append `element` to `<head>` and wait for its `load` event.
async fn append_and_wait(document: &Document, element: &HtmlElement, url: &str) -> Result<(), BackdropError> {
	let loaded = Promise::new(&mut |resolve, reject| {
		element.set_onload(Some(&resolve));
		element.set_onerror(Some(&reject));
	});
	let head = document.head().ok_or_else(|| load_failure(url, "no <head>"))?;
	head.append_child(element)
		.map_err(|e| load_failure(url, js_message(&e)))?;

	let result = JsFuture::from(loaded).await;
	element.set_onload(None);
	element.set_onerror(None);
	result.map(|_| ()).map_err(|_| load_failure(url, "load error"))
}

pub async fn load_stylesheet(href: &str) -> Result<(), BackdropError> {
	let document = document()?;
	let link: HtmlLinkElement = document
		.create_element("link")
		.map_err(|e| load_failure(href, js_message(&e)))?
		.dyn_into()
		.map_err(|_| load_failure(href, "link element has unexpected type"))?;
	link.set_rel("stylesheet");
	link.set_href(href);
	append_and_wait(&document, &link, href).await
}

pub async fn load_script(src: &str) -> Result<(), BackdropError> {
	let document = document()?;
	let script: HtmlScriptElement = document
		.create_element("script")
		.map_err(|e| load_failure(src, js_message(&e)))?
		.dyn_into()
		.map_err(|_| load_failure(src, "script element has unexpected type"))?;
	script.set_src(src);
	script.set_async(false);
	append_and_wait(&document, &script, src).await
}

/// Load every stylesheet, then every script, stopping at the first failure.
pub async fn load_bundle(assets: &TierAssets) -> Result<(), BackdropError> {
	for href in &assets.stylesheets {
		load_stylesheet(href).await?;
	}
	for src in &assets.scripts {
		load_script(src).await?;
	}
	Ok(())
}

/// Load the bundle for `tier` and return the tier that actually loaded.
pub async fn bootstrap(tier: Tier, assets: &AssetConfig) -> Tier {
	let mut attempt = tier;
	loop {
		let bundle = match attempt {
			Tier::High => &assets.high,
			Tier::Low => &assets.low,
		};
		let loaded = match load_bundle(bundle).await {
			Ok(()) => {
				log::info!("starfield-backdrop: {attempt:?} tier assets loaded from {}", bundle.dir);
				true
			}
			Err(e) => {
				log::warn!("starfield-backdrop: {attempt:?} tier assets failed: {e}");
				false
			}
		};
		match after_attempt(attempt, loaded) {
			BootStep::Done(t) => return t,
			BootStep::Retry(t) => attempt = t,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn high_failure_retries_low() {
		assert_eq!(after_attempt(Tier::High, true), BootStep::Done(Tier::High));
		assert_eq!(after_attempt(Tier::High, false), BootStep::Retry(Tier::Low));
	}

	#[test]
	fn low_is_terminal_even_on_failure() {
		assert_eq!(after_attempt(Tier::Low, true), BootStep::Done(Tier::Low));
		assert_eq!(after_attempt(Tier::Low, false), BootStep::Done(Tier::Low));
	}
}
