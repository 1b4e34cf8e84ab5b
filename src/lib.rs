//! starfield-backdrop: adaptive starfield and nebula backdrop for landing pages.
//!
//! On load the page benchmarks WebGL, picks a rendering tier, loads that tier's
//! assets (falling back to the canvas tier if they fail) and mounts the
//! animated backdrop behind the page content.

use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod config;
pub mod error;

pub use components::backdrop::Backdrop;
pub use components::detector::{DetectionResult, Tier, detect};
pub use config::BackdropConfig;
pub use error::BackdropError;

use components::detector::{MeterReading, PerformanceMeter, ProgressObserver, SignalMeter, bootstrap};

/// How long the loading screen takes to fade before it is removed.
const LOADING_FADE: Duration = Duration::from_millis(500);

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("starfield-backdrop: logging initialized");
}

/// Random generator seeded from the browser.
pub fn page_rng() -> fastrand::Rng {
	fastrand::Rng::with_seed((js_sys::Math::random() * u64::MAX as f64) as u64)
}

/// Load configuration from a script element with id="backdrop-config".
/// Missing or malformed configuration falls back to defaults.
fn load_config() -> BackdropConfig {
	let text = (|| {
		let window: Window = web_sys::window()?;
		let element = window.document()?.get_element_by_id("backdrop-config")?;
		let script: HtmlScriptElement = element.dyn_into().ok()?;
		script.text().ok()
	})();
	let Some(text) = text else {
		return BackdropConfig::default();
	};

	match BackdropConfig::from_json(&text) {
		Ok(config) => {
			info!(
				"starfield-backdrop: loaded config (threshold {} fps)",
				config.detector.threshold_fps
			);
			config
		}
		Err(e) => {
			warn!("starfield-backdrop: {}, using defaults", e);
			BackdropConfig::default()
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Loading {
	Visible,
	Fading,
	Hidden,
}

/// Main application component.
/// Detects capabilities, bootstraps the chosen tier and mounts the backdrop.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_config();
	let reading = RwSignal::new(MeterReading::default());
	let tier = RwSignal::new(None::<Tier>);
	let loading = RwSignal::new(Loading::Visible);

	let startup = config.clone();
	spawn_local(async move {
		let observer: Rc<dyn ProgressObserver> = Rc::new(SignalMeter::new(reading));
		let result = detect(&startup.detector, Some(observer)).await;
		let loaded = bootstrap(result.selected_tier, &startup.assets).await;
		info!("starfield-backdrop: mounting {loaded:?} tier");
		tier.set(Some(loaded));
		loading.set(Loading::Fading);
		set_timeout(move || loading.set(Loading::Hidden), LOADING_FADE);
	});

	let fallback_assets = config.assets.clone();
	let on_gl_failure = Callback::new(move |reason: String| {
		warn!("starfield-backdrop: webgl tier failed to start ({reason}), switching to canvas");
		let assets = fallback_assets.clone();
		spawn_local(async move {
			let loaded = bootstrap(Tier::Low, &assets).await;
			tier.set(Some(loaded));
		});
	});

	let backdrop = move || {
		tier.get().map(|selected| {
			let assets = match selected {
				Tier::High => config.assets.high.clone(),
				Tier::Low => config.assets.low.clone(),
			};
			view! {
				<Backdrop
					tier=selected
					config=config.clone()
					assets=assets
					logo=config.assets.logo.clone()
					on_gl_failure=on_gl_failure
				/>
			}
		})
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Starfield" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div
			id="loading-screen"
			class=move || if loading.get() == Loading::Fading { "fade-out" } else { "" }
			style=move || if loading.get() == Loading::Hidden { "display: none;" } else { "" }
		>
			<div class="loader" />
			<p class="loading-text">"Calibrating your universe..."</p>
			<PerformanceMeter reading=reading />
		</div>

		<main id="content">{backdrop}</main>
	}
}
