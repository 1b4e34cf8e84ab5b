//! Animated starfield backdrop.
//!
//! Renders a parallax starfield behind the page with:
//! - Depth-bucketed stars that twinkle and occasionally flare
//! - Shooting stars, drifting nebula clouds and sprite trails
//! - Pointer and device-tilt parallax with idle recentering
//! - Viewport-dependent density, rebuilt after resizing settles
//!
//! The simulation is renderer-agnostic; the Low tier draws it on 2D canvases
//! and the High tier through WebGL.
//!
//! # Example
//!
//! ```ignore
//! use starfield_backdrop::{Backdrop, BackdropConfig, Tier};
//!
//! let config = BackdropConfig::default();
//! let assets = config.assets.low.clone();
//! view! { <Backdrop tier=Tier::Low config=config assets=assets logo="logo.png" /> }
//! ```

mod component;
pub mod density;
pub mod flythrough;
pub mod gl;
pub mod orientation;
pub mod parallax;
pub mod particles;
pub mod pool;
mod render;
pub mod schedule;
pub mod shaders;
pub mod simulation;
pub mod surface;
pub mod theme;

pub use component::Backdrop;
pub use simulation::SimulationContext;
