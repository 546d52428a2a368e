//! Port traits for the controller's external collaborators.
//!
//! These traits define the contracts for everything the control tick
//! touches outside its own state: the estimator readings, the motor
//! driver, the trapezoidal trajectory planner, and the cross-axis mirror
//! source. The controller never owns an implementation; everything is
//! passed in per tick through [`TickContext`].

use openservo_errors::{ControlError, TickResult};

/// Estimator readings snapshotted at the start of a tick.
///
/// Every reading may be absent (estimator not ready, encoder fault). A
/// tick that reaches a stage requiring an absent reading fails with
/// `InvalidEstimate` for that tick only; the next tick retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Estimates {
    /// Linear (turn-counting) position.
    pub pos_linear: Option<f32>,
    /// Circular position in `[0, pos_wrap)`.
    pub pos_circular: Option<f32>,
    /// Wrap length of the circular position.
    pub pos_wrap: Option<f32>,
    /// Velocity.
    pub vel: Option<f32>,
    /// Encoder-cycle position in `[0, 1)`.
    pub pos_cpr: Option<f32>,
}

/// Unwrap a reading required by the stage the tick has reached, failing
/// the tick if it is absent.
#[inline]
pub(crate) fn require(reading: Option<f32>) -> TickResult<f32> {
    reading.ok_or(ControlError::InvalidEstimate)
}

/// Rotor-flux feedback reported by an induction motor driver.
#[derive(Debug, Clone, Copy)]
pub struct RotorFlux {
    /// Estimated rotor flux.
    pub flux: f32,
    /// Floor applied to the flux magnitude before gain rescaling.
    pub min_flux: f32,
}

/// Motor driver contract.
///
/// Implementations MUST be real-time safe: no heap allocations, no
/// blocking calls, bounded execution time. Both methods are invoked from
/// inside the control tick.
pub trait MotorPort {
    /// Peak torque the driver can deliver this tick. May vary per tick
    /// with bus voltage and thermal limits.
    fn max_available_torque(&self) -> f32;

    /// Rotor-flux feedback for induction motors. Permanent-magnet motors
    /// return `None` and skip the gain rescale.
    fn rotor_flux(&self) -> Option<RotorFlux>;
}

/// One evaluated point of a trapezoidal profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryStep {
    /// Position `Y`.
    pub pos: f32,
    /// Velocity `dY/dt`.
    pub vel: f32,
    /// Acceleration `d2Y/dt2`.
    pub accel: f32,
}

/// Trapezoidal trajectory planner contract.
///
/// [`plan`](TrajectoryPlanner::plan) lays out a profile from the given
/// starting state to `goal` using the planner's own configured velocity,
/// acceleration, and deceleration limits. The controller owns the elapsed
/// time of the active profile and calls
/// [`eval`](TrajectoryPlanner::eval) with it while it is within
/// [`duration`](TrajectoryPlanner::duration).
///
/// `eval` is invoked from the control tick and must be RT-safe.
pub trait TrajectoryPlanner {
    /// Plan a profile from `(start_pos, start_vel)` to `goal`.
    fn plan(&mut self, goal: f32, start_pos: f32, start_vel: f32);

    /// Final time `Tf` of the most recently planned profile.
    fn duration(&self) -> f32;

    /// Evaluate the profile at `t` in `[0, Tf]`.
    fn eval(&self, t: f32) -> TrajectoryStep;
}

/// Cross-axis estimate source for [`InputMode::Mirror`](crate::InputMode).
pub trait MirrorSource {
    /// Number of axes available to mirror.
    fn axis_count(&self) -> usize;

    /// Position estimate of the given axis, if present.
    fn pos_estimate(&self, axis: usize) -> Option<f32>;

    /// Velocity estimate of the given axis, if present.
    fn vel_estimate(&self, axis: usize) -> Option<f32>;
}

/// Everything one tick needs from outside the controller.
pub struct TickContext<'a> {
    /// Estimator readings snapshotted for this tick.
    pub estimates: Estimates,
    /// Motor driver.
    pub motor: &'a dyn MotorPort,
    /// Trajectory planner.
    pub planner: &'a mut dyn TrajectoryPlanner,
    /// Cross-axis mirror source.
    pub mirror: &'a dyn MirrorSource,
    /// The axis state machine is in closed-loop control.
    pub closed_loop: bool,
}

/// Mirror source for single-axis systems: no axes to mirror.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMirror;

impl MirrorSource for NullMirror {
    fn axis_count(&self) -> usize {
        0
    }

    fn pos_estimate(&self, _axis: usize) -> Option<f32> {
        None
    }

    fn vel_estimate(&self, _axis: usize) -> Option<f32> {
        None
    }
}

/// Planner stub for configurations that never enter trajectory mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlanner;

impl TrajectoryPlanner for NullPlanner {
    fn plan(&mut self, _goal: f32, _start_pos: f32, _start_vel: f32) {}

    fn duration(&self) -> f32 {
        0.0
    }

    fn eval(&self, _t: f32) -> TrajectoryStep {
        TrajectoryStep::default()
    }
}
