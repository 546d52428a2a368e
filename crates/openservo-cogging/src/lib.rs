//! Anti-cogging torque map and online calibration
//!
//! Cogging is position-dependent torque ripple intrinsic to a brushless
//! motor. This crate provides the position-indexed feed-forward map that
//! cancels it and the online learner that fills the map in while the motor
//! runs a slow constant-velocity sweep.
//!
//! # Overview
//!
//! - [`CoggingMap`]: fixed-length circular lookup table of torque
//!   corrections, indexed by the encoder-cycle position in `[0, 1)`
//! - [`AnticoggingConfig`]: operator-tunable calibration parameters
//! - [`AnticoggingLearner`]: the per-tick calibration step that measures
//!   residual velocity error and deposits Gaussian-weighted corrections
//!
//! # RT Safety
//!
//! Map lookup and the learner step are RT-safe:
//! - No heap allocations after construction
//! - O(1) lookup; the deposit touches a bounded window of entries
//! - No syscalls or I/O

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod learner;
pub mod map;

pub use config::AnticoggingConfig;
pub use learner::{AnticoggingLearner, LearnerSample, LearnerStep};
pub use map::{CoggingMap, CoggingMapRecord};
