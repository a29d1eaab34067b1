//! Common types, traits, and error definitions for rust_dynamic_planning
//!
//! This module provides the capability contracts the planner is written
//! against, plus a concrete position/velocity state.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
