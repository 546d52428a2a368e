//! The controller: state, construction, and the command surface.
//!
//! Everything in this file runs in the non-real-time command context.
//! The tick path lives in [`crate::tick`].

use openservo_cogging::{AnticoggingLearner, CoggingMap, CoggingMapRecord};
use openservo_errors::{CalibrationError, ConfigError, ControlError, ErrorFlags};
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::ports::TrajectoryPlanner;

/// Per-tick motor controller.
///
/// Holds the configuration, the command inputs written by the operator,
/// the setpoints produced by the reference shaper, the cascade state, and
/// the anti-cogging map. [`update`](crate::Controller::update) is the
/// hard-real-time entry point; every other method belongs to the command
/// context and must only be called between ticks.
#[derive(Debug)]
pub struct Controller {
    pub(crate) config: ControllerConfig,

    // Command inputs, written by the operator between ticks
    pub(crate) input_pos: f32,
    pub(crate) input_vel: f32,
    pub(crate) input_torque: f32,
    pub(crate) input_pos_updated: bool,

    // Reference shaper outputs
    pub(crate) pos_setpoint: f32,
    pub(crate) vel_setpoint: f32,
    pub(crate) torque_setpoint: f32,

    // Cascade state
    pub(crate) vel_integrator_torque: f32,
    pub(crate) torque_output: f32,

    // Derived tracking-filter gains
    pub(crate) input_filter_kp: f32,
    pub(crate) input_filter_ki: f32,

    // Trajectory mode
    pub(crate) trajectory_done: bool,
    pub(crate) traj_elapsed: f32,

    // Anti-cogging
    pub(crate) cogging_map: CoggingMap,
    pub(crate) learner: AnticoggingLearner,
    pub(crate) anticogging_valid: bool,

    pub(crate) error: ErrorFlags,
}

impl Controller {
    /// Construct a controller from a validated configuration.
    ///
    /// The cogging map length is fixed here for the controller's lifetime.
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let map_len = config.anticogging.map_len;
        let mut controller = Self {
            config,
            input_pos: 0.0,
            input_vel: 0.0,
            input_torque: 0.0,
            input_pos_updated: false,
            pos_setpoint: 0.0,
            vel_setpoint: 0.0,
            torque_setpoint: 0.0,
            vel_integrator_torque: 0.0,
            torque_output: 0.0,
            input_filter_kp: 0.0,
            input_filter_ki: 0.0,
            trajectory_done: true,
            traj_elapsed: 0.0,
            cogging_map: CoggingMap::new(map_len),
            learner: AnticoggingLearner::default(),
            anticogging_valid: false,
            error: ErrorFlags::NONE,
        };
        controller.update_filter_gains();
        Ok(controller)
    }

    /// Validate and install a new configuration, recomputing derived gains.
    ///
    /// The cogging map length may not change once the controller exists.
    pub fn apply_config(&mut self, config: ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.anticogging.map_len != self.cogging_map.len() {
            return Err(ConfigError::MapLengthMismatch {
                expected: self.cogging_map.len(),
                actual: config.anticogging.map_len,
            });
        }
        self.config = config;
        self.update_filter_gains();
        debug!(
            control_mode = ?self.config.control_mode,
            input_mode = ?self.config.input_mode,
            "controller configuration applied"
        );
        Ok(())
    }

    /// Zero the setpoints and the velocity integrator.
    pub fn reset(&mut self) {
        self.pos_setpoint = 0.0;
        self.vel_setpoint = 0.0;
        self.torque_setpoint = 0.0;
        self.vel_integrator_torque = 0.0;
    }

    pub(crate) fn update_filter_gains(&mut self) {
        let bandwidth =
            self.config.input_filter_bandwidth.min(0.25 * self.config.sample_rate_hz);
        self.input_filter_ki = 2.0 * bandwidth;
        // Critically damped
        self.input_filter_kp = 0.25 * self.input_filter_ki * self.input_filter_ki;
    }

    /// The tick period `Ts = 1/Fs`.
    #[inline]
    pub(crate) fn dt(&self) -> f32 {
        1.0 / self.config.sample_rate_hz
    }

    //--------------------------------
    // Command inputs
    //--------------------------------

    /// Write the position command and signal trajectory replanning.
    pub fn set_input_pos(&mut self, pos: f32) {
        self.input_pos = pos;
        self.input_pos_updated = true;
    }

    /// Write the velocity command.
    pub fn set_input_vel(&mut self, vel: f32) {
        self.input_vel = vel;
    }

    /// Write the torque command.
    pub fn set_input_torque(&mut self, torque: f32) {
        self.input_torque = torque;
    }

    /// Plan a trapezoidal move from the current setpoints to `goal`.
    pub fn move_to_pos(&mut self, goal: f32, planner: &mut dyn TrajectoryPlanner) {
        self.plan_trajectory(goal, planner);
    }

    /// Move by `displacement`: relative to the position command, or
    /// relative to the current position setpoint.
    pub fn move_incremental(&mut self, displacement: f32, from_input_pos: bool) {
        if from_input_pos {
            self.input_pos += displacement;
        } else {
            self.input_pos = self.pos_setpoint + displacement;
        }
        self.input_pos_updated = true;
    }

    pub(crate) fn plan_trajectory(&mut self, goal: f32, planner: &mut dyn TrajectoryPlanner) {
        planner.plan(goal, self.pos_setpoint, self.vel_setpoint);
        self.traj_elapsed = 0.0;
        self.trajectory_done = false;
    }

    //--------------------------------
    // Anti-cogging commands
    //--------------------------------

    /// Start the anti-cogging calibration sweep.
    ///
    /// `pos_estimate` is the current linear position (the sweep counts
    /// turns from it); `closed_loop` comes from the axis state machine.
    /// Rejected while the axis has latched faults or is not in closed
    /// loop.
    pub fn start_anticogging_calibration(
        &mut self,
        pos_estimate: f32,
        closed_loop: bool,
    ) -> Result<(), CalibrationError> {
        if !self.error.is_empty() {
            return Err(CalibrationError::AxisFaulted(self.error.bits()));
        }
        if !closed_loop {
            return Err(CalibrationError::NotClosedLoop);
        }

        self.input_vel = self.config.anticogging.start_vel;
        self.learner = AnticoggingLearner::begin(
            &self.config.anticogging,
            self.config.vel_integrator_gain,
            pos_estimate,
            self.cogging_map.len(),
        );
        // The learner supplies its own integrator action through the map
        self.config.vel_integrator_gain = 0.0;
        self.config.anticogging.calib_anticogging = true;

        info!(
            start_vel = self.config.anticogging.start_vel,
            start_pos = pos_estimate,
            "anticogging calibration started"
        );
        Ok(())
    }

    /// Stop the calibration sweep and restore the operator gains.
    pub fn stop_anticogging_calibration(&mut self) {
        self.stop_calibration_internal();
        info!("anticogging calibration stopped");
    }

    /// RT-safe stop: restores the parked integrator gain without logging.
    /// Also called from the tick when the sweep converges or the
    /// calibration predicate fails.
    pub(crate) fn stop_calibration_internal(&mut self) {
        if self.config.anticogging.calib_anticogging {
            self.config.vel_integrator_gain = self.learner.saved_vel_integrator_gain();
        }
        self.input_vel = 0.0;
        self.config.anticogging.calib_anticogging = false;
    }

    /// Subtract the mean from every cogging map entry.
    pub fn anticogging_remove_bias(&mut self) {
        self.cogging_map.remove_bias();
    }

    /// Read a cogging map entry; out-of-range reads return `0.0`.
    pub fn anticogging_get_val(&self, index: usize) -> f32 {
        self.cogging_map.get(index)
    }

    /// Write a cogging map entry; out-of-range writes are ignored.
    pub fn anticogging_set_val(&mut self, index: usize, value: f32) {
        self.cogging_map.set(index, value);
    }

    /// Snapshot the cogging map for persistence.
    pub fn cogging_map_record(&self) -> CoggingMapRecord {
        self.cogging_map.to_record()
    }

    /// Restore a persisted cogging map. The record length must match the
    /// configured map length. Does not touch `anticogging_valid`; the
    /// startup sequence decides when the restored map is trustworthy.
    pub fn load_cogging_map(&mut self, record: CoggingMapRecord) -> Result<(), ConfigError> {
        self.cogging_map = CoggingMap::from_record(record, self.cogging_map.len())?;
        Ok(())
    }

    /// Mark the cogging map as usable for feed-forward. Owned by the
    /// persistence / startup sequence.
    pub fn set_anticogging_valid(&mut self, valid: bool) {
        self.anticogging_valid = valid;
    }

    //--------------------------------
    // Fault reporting
    //--------------------------------

    /// Latch a fault kind.
    pub fn set_error(&mut self, kind: ControlError) {
        self.error.set(kind);
    }

    /// External fault reset.
    pub fn clear_errors(&mut self) {
        self.error.clear();
    }

    //--------------------------------
    // Accessors
    //--------------------------------

    /// The active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Mutable access to the configuration from the command context.
    ///
    /// Derived filter gains are only recomputed by
    /// [`apply_config`](Self::apply_config).
    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Current position command.
    pub fn input_pos(&self) -> f32 {
        self.input_pos
    }

    /// Current velocity command.
    pub fn input_vel(&self) -> f32 {
        self.input_vel
    }

    /// Current torque command.
    pub fn input_torque(&self) -> f32 {
        self.input_torque
    }

    /// Position setpoint produced by the reference shaper.
    pub fn pos_setpoint(&self) -> f32 {
        self.pos_setpoint
    }

    /// Velocity setpoint produced by the reference shaper.
    pub fn vel_setpoint(&self) -> f32 {
        self.vel_setpoint
    }

    /// Torque setpoint produced by the reference shaper.
    pub fn torque_setpoint(&self) -> f32 {
        self.torque_setpoint
    }

    /// Commanded torque from the last successful tick.
    pub fn torque_output(&self) -> f32 {
        self.torque_output
    }

    /// Velocity integrator accumulator.
    pub fn vel_integrator_torque(&self) -> f32 {
        self.vel_integrator_torque
    }

    /// The active trajectory has completed.
    pub fn trajectory_done(&self) -> bool {
        self.trajectory_done
    }

    /// Latched fault bits.
    pub fn error(&self) -> ErrorFlags {
        self.error
    }

    /// The cogging map is usable for feed-forward.
    pub fn anticogging_valid(&self) -> bool {
        self.anticogging_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::ports::NullPlanner;
    use openservo_cogging::AnticoggingConfig;

    #[test]
    fn test_new_controller_defaults() {
        let controller = Controller::new(ControllerConfig::default()).expect("valid config");
        assert_eq!(controller.torque_output(), 0.0);
        assert!(controller.trajectory_done());
        assert!(controller.error().is_empty());
        assert!(!controller.anticogging_valid());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ControllerConfig { pos_gain: f32::NAN, ..ControllerConfig::default() };
        assert!(Controller::new(config).is_err());
    }

    #[test]
    fn test_filter_gains_critically_damped() {
        let config = ControllerConfig {
            input_filter_bandwidth: 2.0,
            sample_rate_hz: 8000.0,
            ..ControllerConfig::default()
        };
        let controller = Controller::new(config).expect("valid config");
        assert!((controller.input_filter_ki - 4.0).abs() < 1e-6);
        assert!((controller.input_filter_kp - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_filter_bandwidth_clamped_to_quarter_fs() {
        let config = ControllerConfig {
            input_filter_bandwidth: 1e9,
            sample_rate_hz: 8000.0,
            ..ControllerConfig::default()
        };
        let controller = Controller::new(config).expect("valid config");
        assert!((controller.input_filter_ki - 2.0 * 2000.0).abs() < 1e-3);
    }

    #[test]
    fn test_apply_config_rejects_map_resize() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        let config = ControllerConfig {
            anticogging: AnticoggingConfig { map_len: 128, ..AnticoggingConfig::default() },
            ..ControllerConfig::default()
        };
        assert!(matches!(
            controller.apply_config(config),
            Err(ConfigError::MapLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_reset_zeros_setpoints_and_integrator() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.pos_setpoint = 1.0;
        controller.vel_setpoint = 2.0;
        controller.torque_setpoint = 3.0;
        controller.vel_integrator_torque = 4.0;

        controller.reset();

        assert_eq!(controller.pos_setpoint(), 0.0);
        assert_eq!(controller.vel_setpoint(), 0.0);
        assert_eq!(controller.torque_setpoint(), 0.0);
        assert_eq!(controller.vel_integrator_torque(), 0.0);
    }

    #[test]
    fn test_move_incremental_from_input_pos() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.set_input_pos(1.0);
        controller.input_pos_updated = false;

        controller.move_incremental(0.5, true);
        assert!((controller.input_pos() - 1.5).abs() < 1e-6);
        assert!(controller.input_pos_updated);
    }

    #[test]
    fn test_move_incremental_from_setpoint() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.pos_setpoint = 2.0;

        controller.move_incremental(-0.5, false);
        assert!((controller.input_pos() - 1.5).abs() < 1e-6);
        assert!(controller.input_pos_updated);
    }

    #[test]
    fn test_move_to_pos_arms_trajectory() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        let mut planner = NullPlanner;
        controller.move_to_pos(3.0, &mut planner);
        assert!(!controller.trajectory_done());
        assert_eq!(controller.traj_elapsed, 0.0);
    }

    #[test]
    fn test_start_calibration_parks_integrator_gain() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        let operator_gain = controller.config().vel_integrator_gain;
        assert!(operator_gain > 0.0);

        controller.start_anticogging_calibration(0.0, true).expect("starts");

        assert_eq!(controller.config().vel_integrator_gain, 0.0);
        assert!(controller.config().anticogging.calib_anticogging);
        assert_eq!(controller.input_vel(), controller.config().anticogging.start_vel);

        controller.stop_anticogging_calibration();

        assert_eq!(controller.config().vel_integrator_gain, operator_gain);
        assert!(!controller.config().anticogging.calib_anticogging);
        assert_eq!(controller.input_vel(), 0.0);
    }

    #[test]
    fn test_start_calibration_rejected_when_faulted() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.set_error(ControlError::Overspeed);
        assert!(matches!(
            controller.start_anticogging_calibration(0.0, true),
            Err(CalibrationError::AxisFaulted(_))
        ));
    }

    #[test]
    fn test_start_calibration_rejected_outside_closed_loop() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        assert!(matches!(
            controller.start_anticogging_calibration(0.0, false),
            Err(CalibrationError::NotClosedLoop)
        ));
    }

    #[test]
    fn test_stop_when_idle_keeps_operator_gain() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        let operator_gain = controller.config().vel_integrator_gain;
        controller.stop_anticogging_calibration();
        assert_eq!(controller.config().vel_integrator_gain, operator_gain);
    }

    #[test]
    fn test_cogging_map_persistence_roundtrip() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.anticogging_set_val(7, 0.25);

        let record = controller.cogging_map_record();
        let mut restored = Controller::new(ControllerConfig::default()).expect("valid config");
        restored.load_cogging_map(record).expect("length matches");

        assert_eq!(restored.anticogging_get_val(7), 0.25);
        assert!(!restored.anticogging_valid());
    }

    #[test]
    fn test_error_latch_and_clear() {
        let mut controller = Controller::new(ControllerConfig::default()).expect("valid config");
        controller.set_error(ControlError::InvalidMirrorAxis);
        assert!(controller.error().contains(ControlError::InvalidMirrorAxis));

        controller.clear_errors();
        assert!(controller.error().is_empty());
    }
}
