//! Convenient re-exports for controller embedders.

pub use crate::config::{ControlMode, ControllerConfig, InputMode};
pub use crate::controller::Controller;
pub use crate::ports::{
    Estimates, MirrorSource, MotorPort, NullMirror, NullPlanner, RotorFlux, TickContext,
    TrajectoryPlanner, TrajectoryStep,
};
pub use crate::wrap::{fmod_pos, wrap_pm};
pub use openservo_cogging::{AnticoggingConfig, CoggingMap, CoggingMapRecord};
pub use openservo_errors::{CalibrationError, ConfigError, ControlError, ErrorFlags, TickResult};
