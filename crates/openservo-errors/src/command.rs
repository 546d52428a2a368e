//! Command-surface error types.
//!
//! These errors are returned from the non-real-time command context
//! (configuration, calibration commands). They are allowed to allocate
//! and carry context; they never appear in the tick path.

use thiserror::Error;

/// Errors raised while validating or applying a controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A gain or limit field must be finite and non-negative.
    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidGain {
        /// Name of the offending configuration field.
        field: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// The control sample rate must be a positive, finite frequency.
    #[error("sample rate must be positive (got {0} Hz)")]
    InvalidSampleRate(f32),

    /// Circular setpoints require a positive wrap range.
    #[error("circular setpoint range must be positive (got {0})")]
    InvalidCircularRange(f32),

    /// The cogging map length is fixed once the controller is constructed.
    #[error("cogging map length mismatch: expected {expected}, got {actual}")]
    MapLengthMismatch {
        /// Length the controller was constructed with.
        expected: usize,
        /// Length carried by the rejected configuration or record.
        actual: usize,
    },
}

/// Errors raised when a calibration command is rejected.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Calibration may not start while the axis has latched faults.
    #[error("axis has active faults (error bits 0x{0:08x})")]
    AxisFaulted(u32),

    /// Calibration requires the axis to be driving in closed loop.
    #[error("axis is not in closed-loop control")]
    NotClosedLoop,

    /// Calibration requires velocity control mode.
    #[error("anticogging calibration requires velocity control mode")]
    NotVelocityMode,
}
