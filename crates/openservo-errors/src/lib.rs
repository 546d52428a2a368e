//! Centralized error types for OpenServo
//!
//! This crate provides the error handling system for the OpenServo motor
//! controller, supporting both the real-time (RT) tick path and the non-RT
//! command path with appropriate safety guarantees.
//!
//! # Architecture
//!
//! - [`rt`]: Real-time fault kinds and the sticky fault bitset
//! - [`command`]: Command-surface errors (configuration, calibration)
//!
//! # RT Safety
//!
//! RT error types are designed for use inside the control tick:
//! - `Copy` semantics, no heap allocations
//! - Fixed `#[repr(u8)]` representation with pre-assigned codes
//! - Bitset operations are plain integer arithmetic

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod command;
pub mod rt;

pub use command::{CalibrationError, ConfigError};
pub use rt::{ControlError, ErrorFlags};

/// A specialized `Result` type for one control tick.
pub type TickResult<T = ()> = std::result::Result<T, ControlError>;
