//! Controller configuration and mode enums.

use openservo_cogging::AnticoggingConfig;
use openservo_errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Control-law depth. Higher modes include every lower stage.
///
/// The ordering is load-bearing: the cascade enables its position stage
/// for `control_mode >= Position` and its velocity stage for
/// `control_mode >= Velocity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    /// Direct voltage modulation; no cascade stage runs.
    Voltage = 0,
    /// Torque setpoint passes straight to the output stage.
    Torque = 1,
    /// Velocity loop drives the torque output.
    Velocity = 2,
    /// Position loop feeds the velocity loop.
    Position = 3,
}

/// Reference-shaping mode: how the externally written inputs drive the
/// three setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InputMode {
    /// Setpoints are left untouched.
    Inactive = 0,
    /// Inputs copied straight into the setpoints.
    Passthrough = 1,
    /// Velocity setpoint slews toward `input_vel` at `vel_ramp_rate`.
    VelRamp = 2,
    /// Torque setpoint slews toward `input_torque` at `torque_ramp_rate`.
    TorqueRamp = 3,
    /// Second-order critically damped tracking filter on `input_pos`.
    PosFilter = 4,
    /// Setpoints mirror another axis's estimates scaled by `mirror_ratio`.
    Mirror = 5,
    /// Trapezoidal trajectory toward `input_pos` via the planner port.
    TrapTraj = 6,
    /// Unrecognized wire value; every tick in this mode fails.
    #[serde(other)]
    Unknown = 255,
}

impl InputMode {
    /// Decode a wire value. Unknown codes map to [`InputMode::Unknown`]
    /// rather than being rejected, so a bad command surfaces as a tick
    /// fault instead of being silently dropped.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => InputMode::Inactive,
            1 => InputMode::Passthrough,
            2 => InputMode::VelRamp,
            3 => InputMode::TorqueRamp,
            4 => InputMode::PosFilter,
            5 => InputMode::Mirror,
            6 => InputMode::TrapTraj,
            _ => InputMode::Unknown,
        }
    }

    /// The wire value of this mode.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Controller configuration.
///
/// Stable across a tick; mutated only by operator commands between ticks.
/// [`Controller::apply_config`](crate::Controller::apply_config) validates
/// a new configuration and recomputes the derived filter gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Cascade depth.
    pub control_mode: ControlMode,
    /// Reference-shaping mode.
    pub input_mode: InputMode,
    /// Position loop gain, velocity units per unit position error.
    pub pos_gain: f32,
    /// Velocity loop gain, torque units per unit velocity error.
    pub vel_gain: f32,
    /// Velocity integrator gain.
    pub vel_integrator_gain: f32,
    /// Velocity limit applied to the desired velocity.
    pub vel_limit: f32,
    /// Clamp the desired velocity to `[-vel_limit, vel_limit]`.
    pub enable_vel_limit: bool,
    /// Overspeed trips at `vel_limit_tolerance * vel_limit`.
    pub vel_limit_tolerance: f32,
    /// Fail the tick when the measured velocity exceeds the tolerance.
    pub enable_overspeed_error: bool,
    /// Soft velocity limit on the torque output when the velocity loop
    /// is not running.
    pub enable_current_mode_vel_limit: bool,
    /// V-shaped gain scheduling on position error.
    pub enable_gain_scheduling: bool,
    /// Position error at which scheduled gains reach full strength.
    pub gain_scheduling_width: f32,
    /// Velocity slew rate for [`InputMode::VelRamp`], units per second.
    pub vel_ramp_rate: f32,
    /// Torque slew rate for [`InputMode::TorqueRamp`], units per second.
    pub torque_ramp_rate: f32,
    /// Load inertia used to derive feed-forward torque from acceleration.
    pub inertia: f32,
    /// Bandwidth of the [`InputMode::PosFilter`] tracking filter, Hz.
    pub input_filter_bandwidth: f32,
    /// Wrap setpoints into a circular range.
    pub circular_setpoints: bool,
    /// Wrap length for `input_pos` when `circular_setpoints` is set.
    pub circular_setpoint_range: f32,
    /// Axis index followed in [`InputMode::Mirror`].
    pub axis_to_mirror: u8,
    /// Scale applied to the mirrored estimates.
    pub mirror_ratio: f32,
    /// Current-measurement rate `Fs`; the tick period is `1/Fs`.
    pub sample_rate_hz: f32,
    /// Anti-cogging map and calibration parameters.
    pub anticogging: AnticoggingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::Position,
            input_mode: InputMode::Inactive,
            pos_gain: 20.0,
            vel_gain: 0.16,
            vel_integrator_gain: 0.32,
            vel_limit: 2.0,
            enable_vel_limit: true,
            vel_limit_tolerance: 1.2,
            enable_overspeed_error: true,
            enable_current_mode_vel_limit: true,
            enable_gain_scheduling: false,
            gain_scheduling_width: 10.0,
            vel_ramp_rate: 1.0,
            torque_ramp_rate: 0.01,
            inertia: 0.0,
            input_filter_bandwidth: 2.0,
            circular_setpoints: false,
            circular_setpoint_range: 1.0,
            axis_to_mirror: u8::MAX,
            mirror_ratio: 1.0,
            sample_rate_hz: 8000.0,
            anticogging: AnticoggingConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Validate the configuration before it is installed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }

        let gains = [
            ("pos_gain", self.pos_gain),
            ("vel_gain", self.vel_gain),
            ("vel_integrator_gain", self.vel_integrator_gain),
            ("vel_limit", self.vel_limit),
            ("vel_limit_tolerance", self.vel_limit_tolerance),
            ("vel_ramp_rate", self.vel_ramp_rate),
            ("torque_ramp_rate", self.torque_ramp_rate),
            ("inertia", self.inertia),
            ("input_filter_bandwidth", self.input_filter_bandwidth),
        ];
        for (field, value) in gains {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidGain { field, value });
            }
        }

        if self.enable_gain_scheduling
            && !(self.gain_scheduling_width.is_finite() && self.gain_scheduling_width > 0.0)
        {
            return Err(ConfigError::InvalidGain {
                field: "gain_scheduling_width",
                value: self.gain_scheduling_width,
            });
        }

        if self.circular_setpoints
            && !(self.circular_setpoint_range.is_finite() && self.circular_setpoint_range > 0.0)
        {
            return Err(ConfigError::InvalidCircularRange(self.circular_setpoint_range));
        }

        Ok(())
    }
}
