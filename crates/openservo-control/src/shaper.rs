//! Reference shaper: drives the setpoints from the command inputs.

use openservo_errors::{ControlError, TickResult};

use crate::config::{ControlMode, InputMode};
use crate::controller::Controller;
use crate::ports::{MirrorSource, TrajectoryPlanner};

impl Controller {
    /// Shape the command inputs into `(pos_setpoint, vel_setpoint,
    /// torque_setpoint)` according to the configured input mode.
    pub(crate) fn update_reference(
        &mut self,
        planner: &mut dyn TrajectoryPlanner,
        mirror: &dyn MirrorSource,
    ) -> TickResult {
        let dt = self.dt();
        match self.config.input_mode {
            InputMode::Inactive => {}
            InputMode::Passthrough => {
                self.pos_setpoint = self.input_pos;
                self.vel_setpoint = self.input_vel;
                self.torque_setpoint = self.input_torque;
            }
            InputMode::VelRamp => {
                let max_step = (dt * self.config.vel_ramp_rate).abs();
                let full_step = self.input_vel - self.vel_setpoint;
                let step = full_step.clamp(-max_step, max_step);

                self.vel_setpoint += step;
                self.torque_setpoint = (step / dt) * self.config.inertia;
            }
            InputMode::TorqueRamp => {
                let max_step = (dt * self.config.torque_ramp_rate).abs();
                let full_step = self.input_torque - self.torque_setpoint;
                let step = full_step.clamp(-max_step, max_step);

                self.torque_setpoint += step;
            }
            InputMode::PosFilter => {
                // 2nd order position tracking filter
                let delta_pos = self.input_pos - self.pos_setpoint;
                let delta_vel = self.input_vel - self.vel_setpoint;
                let accel = self.input_filter_kp * delta_pos + self.input_filter_ki * delta_vel;
                self.torque_setpoint = accel * self.config.inertia;
                self.vel_setpoint += dt * accel;
                self.pos_setpoint += dt * self.vel_setpoint;
            }
            InputMode::Mirror => {
                let axis = self.config.axis_to_mirror as usize;
                if axis >= mirror.axis_count() {
                    return Err(ControlError::InvalidMirrorAxis);
                }
                let (Some(other_pos), Some(other_vel)) =
                    (mirror.pos_estimate(axis), mirror.vel_estimate(axis))
                else {
                    return Err(ControlError::InvalidEstimate);
                };
                self.pos_setpoint = other_pos * self.config.mirror_ratio;
                self.vel_setpoint = other_vel * self.config.mirror_ratio;
            }
            InputMode::TrapTraj => {
                if self.input_pos_updated {
                    self.plan_trajectory(self.input_pos, planner);
                    self.input_pos_updated = false;
                }
                // Avoid evaluating an uninitialized trajectory
                if !self.trajectory_done {
                    if self.traj_elapsed > planner.duration() {
                        // Drop into plain position control when done to
                        // avoid problems on loop counter delta overflow
                        self.config.control_mode = ControlMode::Position;
                        self.pos_setpoint = self.input_pos;
                        self.vel_setpoint = 0.0;
                        self.torque_setpoint = 0.0;
                        self.trajectory_done = true;
                    } else {
                        let step = planner.eval(self.traj_elapsed);
                        self.pos_setpoint = step.pos;
                        self.vel_setpoint = step.vel;
                        self.torque_setpoint = step.accel * self.config.inertia;
                        self.traj_elapsed += dt;
                    }
                }
            }
            InputMode::Unknown => return Err(ControlError::InvalidInputMode),
        }
        Ok(())
    }
}
