//! The hard-real-time tick: update orchestration and the cascade.
//!
//! Everything here is RT-safe: no heap allocations, no syscalls, no
//! locks, no logging. A failing tick latches the fault kind and leaves
//! `torque_output` untouched.

use openservo_cogging::LearnerSample;
use openservo_errors::{ControlError, TickResult};

use crate::config::ControlMode;
use crate::controller::Controller;
use crate::ports::{require, Estimates, MotorPort, TickContext};
use crate::wrap::{fmod_pos, wrap_pm};

/// Integrator decay per saturated tick.
const INTEGRATOR_DECAY: f32 = 0.99;

/// Soft velocity limit for torque-mode operation: bound the torque so the
/// velocity loop formed by `vel_gain` cannot push past `vel_limit`.
#[inline]
fn limit_vel(vel_limit: f32, vel_estimate: f32, vel_gain: f32, torque: f32) -> f32 {
    let t_max = (vel_limit - vel_estimate) * vel_gain;
    let t_min = (-vel_limit - vel_estimate) * vel_gain;
    torque.clamp(t_min, t_max)
}

impl Controller {
    /// One control tick.
    ///
    /// Shapes the reference, steps the calibration sweep if one is
    /// running, and runs the cascade down to a saturated torque output.
    /// On success the new commanded torque is available from
    /// [`torque_output`](Self::torque_output) and the transient estimate
    /// fault is cleared. On failure the matching fault bit is latched,
    /// the torque output is left unchanged, and the caller is expected
    /// to stop driving.
    #[inline]
    pub fn update(&mut self, ctx: TickContext<'_>) -> TickResult {
        match self.tick(ctx) {
            Ok(()) => {
                self.error.clear_transient();
                Ok(())
            }
            Err(kind) => {
                self.error.set(kind);
                Err(kind)
            }
        }
    }

    fn tick(&mut self, ctx: TickContext<'_>) -> TickResult {
        let estimates = ctx.estimates;

        // Keep the position command from drifting out of the wrap
        if self.config.circular_setpoints {
            self.input_pos = fmod_pos(self.input_pos, self.config.circular_setpoint_range);
        }

        self.update_reference(ctx.planner, ctx.mirror)?;

        if self.config.anticogging.calib_anticogging {
            self.calibration_step(&estimates, ctx.closed_loop)?;
        }

        self.run_cascade(&estimates, ctx.motor)
    }

    /// One learner step. Only reached while a calibration sweep is
    /// enabled; stops the sweep when it converges or when the axis falls
    /// out of velocity-mode closed-loop control.
    fn calibration_step(&mut self, estimates: &Estimates, closed_loop: bool) -> TickResult {
        let pos_cpr = require(estimates.pos_cpr)?;
        let vel_estimate = require(estimates.vel)?;
        let pos_linear = require(estimates.pos_linear)?;

        if self.config.control_mode == ControlMode::Velocity && closed_loop {
            let sample = LearnerSample {
                pos_linear,
                pos_cpr,
                vel_estimate,
                vel_setpoint: self.vel_setpoint,
                input_vel: self.input_vel,
            };
            let dt = self.dt();
            let step =
                self.learner.step(&self.config.anticogging, &mut self.cogging_map, &sample, dt);
            self.input_vel = step.input_vel;

            if step.done {
                self.stop_calibration_internal();
                self.config.anticogging.pre_calibrated = true;
            }
        } else {
            self.stop_calibration_internal();
            self.config.anticogging.pre_calibrated = false;
        }
        Ok(())
    }

    fn run_cascade(&mut self, estimates: &Estimates, motor: &dyn MotorPort) -> TickResult {
        // Position control
        let mut gain_scheduling_multiplier = 1.0;
        let mut vel_des = self.vel_setpoint;
        if self.config.control_mode >= ControlMode::Position {
            let pos_err = if self.config.circular_setpoints {
                let pos_circular = require(estimates.pos_circular)?;
                let pos_wrap = require(estimates.pos_wrap)?;
                // Keep the setpoint from drifting out of the wrap
                self.pos_setpoint = fmod_pos(self.pos_setpoint, pos_wrap);
                wrap_pm(self.pos_setpoint - pos_circular, pos_wrap)
            } else {
                let pos_linear = require(estimates.pos_linear)?;
                self.pos_setpoint - pos_linear
            };

            vel_des += self.config.pos_gain * pos_err;

            // V-shaped gain schedule on position error
            let abs_pos_err = pos_err.abs();
            if self.config.enable_gain_scheduling
                && abs_pos_err <= self.config.gain_scheduling_width
            {
                gain_scheduling_multiplier = abs_pos_err / self.config.gain_scheduling_width;
            }
        }

        // Velocity limiting
        let vel_lim = self.config.vel_limit;
        if self.config.enable_vel_limit {
            vel_des = vel_des.clamp(-vel_lim, vel_lim);
        }

        // Overspeed fault, checked here for cohesion with the limit
        if self.config.enable_overspeed_error {
            let vel_estimate = require(estimates.vel)?;
            if vel_estimate.abs() > self.config.vel_limit_tolerance * vel_lim {
                return Err(ControlError::Overspeed);
            }
        }

        // Torque-per-amp rescale for induction motors
        let mut vel_gain = self.config.vel_gain;
        let mut vel_integrator_gain = self.config.vel_integrator_gain;
        if let Some(rotor) = motor.rotor_flux() {
            let effective_flux = if rotor.flux.abs() < rotor.min_flux {
                rotor.min_flux.copysign(rotor.flux)
            } else {
                rotor.flux
            };
            vel_gain /= effective_flux;
            vel_integrator_gain /= effective_flux;
        }

        let mut torque = self.torque_setpoint;

        // Anti-cogging feed-forward runs live during calibration and
        // whenever a trusted map is enabled
        if self.config.anticogging.calib_anticogging
            || (self.anticogging_valid && self.config.anticogging.enabled)
        {
            let pos_cpr = require(estimates.pos_cpr)?;
            torque += self.cogging_map.interpolate(pos_cpr);
        }

        // Velocity control
        let mut v_err = 0.0;
        if self.config.control_mode >= ControlMode::Velocity {
            let vel_estimate = require(estimates.vel)?;
            v_err = vel_des - vel_estimate;
            torque += (vel_gain * gain_scheduling_multiplier) * v_err;

            // Integral action before limiting
            torque += self.vel_integrator_torque;
        }

        // Velocity limiting in torque mode
        if self.config.control_mode < ControlMode::Velocity
            && self.config.enable_current_mode_vel_limit
        {
            let vel_estimate = require(estimates.vel)?;
            torque = limit_vel(self.config.vel_limit, vel_estimate, vel_gain, torque);
        }

        // Torque limiting
        let mut limited = false;
        let t_lim = motor.max_available_torque();
        if torque > t_lim {
            limited = true;
            torque = t_lim;
        }
        if torque < -t_lim {
            limited = true;
            torque = -t_lim;
        }

        // Integrator behaviour depends on limiting
        if self.config.control_mode < ControlMode::Velocity {
            // Reset the integral while it is not in use
            self.vel_integrator_torque = 0.0;
        } else if limited {
            self.vel_integrator_torque *= INTEGRATOR_DECAY;
        } else {
            self.vel_integrator_torque +=
                (vel_integrator_gain * gain_scheduling_multiplier * self.dt()) * v_err;
        }

        self.torque_output = torque;
        Ok(())
    }
}
