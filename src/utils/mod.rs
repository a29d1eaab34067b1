//! Utility modules for rust_dynamic_planning

pub mod throttle;
pub mod visualization;

pub use throttle::LogThrottle;
pub use visualization::{Visualizer, colors, rgba_to_hex};
