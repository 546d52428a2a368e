//! Anti-cogging calibration parameters.

use serde::{Deserialize, Serialize};

use crate::map::CoggingMap;

/// Operator-tunable anti-cogging parameters.
///
/// The calibration sweep starts fast and coarse (`start_vel`, `start_gain`)
/// and ratchets down toward slow and fine (`end_vel`, `end_gain`) as the
/// measured residual error falls. `end_tolerance` is the relative velocity
/// error at which the sweep is considered converged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnticoggingConfig {
    /// Apply the learned map as feed-forward during normal operation.
    pub enabled: bool,
    /// The calibration sweep is currently running. Written by the command
    /// context to start/stop; cleared by the learner on convergence.
    pub calib_anticogging: bool,
    /// The map has been filled in by a completed calibration.
    pub pre_calibrated: bool,
    /// Sweep velocity at the start of calibration.
    pub start_vel: f32,
    /// Sweep velocity the calibration converges toward.
    pub end_vel: f32,
    /// Deposit gain multiplier at the start, in units of the operator's
    /// velocity integrator gain.
    pub start_gain: f32,
    /// Deposit gain multiplier at convergence.
    pub end_gain: f32,
    /// Relative velocity error below which the sweep is converged.
    pub end_tolerance: f32,
    /// Rate limit on sweep-velocity reduction, in velocity units per second.
    pub vel_ramp_rate: f32,
    /// Per-entry clamp on a single deposit contribution.
    pub max_torque: f32,
    /// Number of map entries. Fixed once the controller is constructed.
    pub map_len: usize,
}

impl Default for AnticoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            calib_anticogging: false,
            pre_calibrated: false,
            start_vel: 1.0,
            end_vel: 0.1,
            start_gain: 25.0,
            end_gain: 5.0,
            end_tolerance: 0.005,
            // (start_vel - end_vel) over a 30 second wind-down
            vel_ramp_rate: 0.03,
            max_torque: 0.1,
            map_len: CoggingMap::DEFAULT_LEN,
        }
    }
}
