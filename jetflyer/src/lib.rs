//! Jetflyer - a single-sprite jetpack flight toy.
//!
//! The core is a per-frame physics stepper fed by held arrow keys; the rest
//! is the window/render shell around it.

pub mod engine;
pub mod input;
pub mod math;
pub mod physics;
pub mod render;

pub use crate::engine::{Engine, EngineConfig, EngineContext, Game};
pub use crate::input::InputState;
pub use crate::math::Vec2;
pub use crate::physics::{FlyerState, ThrustInput, Viewport, FLYER_SIZE};
pub use crate::render::{Frame, Renderer};
pub use winit::keyboard::KeyCode;
