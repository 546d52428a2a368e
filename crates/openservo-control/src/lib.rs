//! Control-loop core for the OpenServo brushless motor controller
//!
//! This crate implements the per-tick function that turns a commanded
//! reference (position, velocity, or torque) and measured state into a
//! commanded torque, together with the online anti-cogging calibration
//! hook. It runs once per current-measurement period inside a
//! hard-real-time context.
//!
//! # Overview
//!
//! One tick of [`Controller::update`] performs, in order:
//! - snapshot the estimator readings ([`Estimates`])
//! - shape the reference through the configured [`InputMode`]
//! - step the anti-cogging learner if a calibration sweep is running
//! - run the cascade: position loop, gain scheduling, velocity limit,
//!   overspeed guard, rotor-flux gain rescale, anti-cogging feed-forward,
//!   velocity loop with integrator, torque saturation, and the
//!   integrator anti-windup update
//!
//! External collaborators (motor driver, trajectory planner, the other
//! axis for mirror mode) are reached through the port traits in
//! [`ports`]; the controller never owns them.
//!
//! # RT Safety
//!
//! The tick path is RT-safe:
//! - No heap allocations after construction
//! - No syscalls, locks, or logging in [`Controller::update`]
//! - Bounded execution time; all numeric work is plain `f32` arithmetic
//!
//! A failing tick latches a fault bit and leaves the torque output
//! untouched; only `InvalidEstimate` clears itself on the next
//! successful tick.
//!
//! # Example
//!
//! ```
//! use openservo_control::prelude::*;
//!
//! struct Motor;
//! impl MotorPort for Motor {
//!     fn max_available_torque(&self) -> f32 { 1.0 }
//!     fn rotor_flux(&self) -> Option<RotorFlux> { None }
//! }
//!
//! let mut config = ControllerConfig::default();
//! config.control_mode = ControlMode::Torque;
//! config.input_mode = InputMode::Passthrough;
//! config.enable_current_mode_vel_limit = false;
//!
//! let mut controller = Controller::new(config).expect("valid config");
//! controller.set_input_torque(0.5);
//!
//! let estimates = Estimates {
//!     pos_linear: Some(0.0),
//!     vel: Some(0.0),
//!     ..Estimates::default()
//! };
//! let mut planner = NullPlanner;
//! let ctx = TickContext {
//!     estimates,
//!     motor: &Motor,
//!     planner: &mut planner,
//!     mirror: &NullMirror,
//!     closed_loop: true,
//! };
//! controller.update(ctx).expect("tick succeeds");
//! assert!((controller.torque_output() - 0.5).abs() < 1e-6);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod controller;
pub mod ports;
pub mod prelude;
pub mod shaper;
pub mod tick;
pub mod wrap;

pub use config::{ControlMode, ControllerConfig, InputMode};
pub use controller::Controller;
pub use ports::{
    Estimates, MirrorSource, MotorPort, NullMirror, NullPlanner, RotorFlux, TickContext,
    TrajectoryPlanner, TrajectoryStep,
};
pub use wrap::{fmod_pos, wrap_pm};

pub use openservo_cogging::{AnticoggingConfig, CoggingMap, CoggingMapRecord};
pub use openservo_errors::{CalibrationError, ConfigError, ControlError, ErrorFlags, TickResult};
