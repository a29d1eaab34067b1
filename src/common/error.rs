//! Error types for rust_dynamic_planning

use std::fmt;

/// Main error type for the planning core
///
/// Failing to find a trajectory is not an error: planners hand back an
/// empty [`Trajectory`](crate::planning::Trajectory) instead.
#[derive(Debug)]
pub enum PlanningError {
    /// Invalid parameter
    InvalidParameter(String),
    /// Operation needs at least one sample in the trajectory
    EmptyTrajectory,
    /// Configuration could not be decoded
    ConfigError(String),
    /// I/O error
    IoError(std::io::Error),
    /// Visualization error
    VisualizationError(String),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlanningError::EmptyTrajectory => write!(f, "Trajectory has no samples"),
            PlanningError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            PlanningError::IoError(e) => write!(f, "I/O error: {}", e),
            PlanningError::VisualizationError(msg) => write!(f, "Visualization error: {}", msg),
        }
    }
}

impl std::error::Error for PlanningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanningError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlanningError {
    fn from(e: std::io::Error) -> Self {
        PlanningError::IoError(e)
    }
}

impl From<serde_yaml::Error> for PlanningError {
    fn from(e: serde_yaml::Error) -> Self {
        PlanningError::ConfigError(e.to_string())
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
