use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Proportional, integral and derivative gains for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if [self.kp, self.ki, self.kd].iter().all(|g| g.is_finite()) {
            Ok(())
        } else {
            Err(ConfigError::NonFiniteGain {
                kp: self.kp,
                ki: self.ki,
                kd: self.kd,
            })
        }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.4,
            ki: 0.0,
            kd: 0.1,
        }
    }
}

/// Single-axis PID controller.
///
/// Each axis owns its own instance; integral and derivative memory is never
/// shared.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: f64,
    prev_timestamp: Option<Duration>,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self::from_gains(PidGains { kp, ki, kd })
    }

    pub fn from_gains(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: 0.0,
            prev_timestamp: None,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Advances the controller by `dt` seconds and returns the raw output.
    ///
    /// When `dt` is not a positive finite number the integral and derivative
    /// terms are skipped and only `kp * error` is returned.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let PidGains { kp, ki, kd } = self.gains;
        let output = if dt > 0.0 && dt.is_finite() {
            self.integral += error * dt;
            let derivative = (error - self.prev_error) / dt;
            kp * error + ki * self.integral + kd * derivative
        } else {
            kp * error
        };
        self.prev_error = error;
        output
    }

    /// Like [`Pid::update`], with `dt` taken from the previous call's timestamp.
    /// The first call after construction or [`Pid::reset`] has `dt = 0`.
    pub fn update_at(&mut self, error: f64, timestamp: Duration) -> f64 {
        let dt = self
            .prev_timestamp
            .map_or(0.0, |prev| timestamp.as_secs_f64() - prev.as_secs_f64());
        self.prev_timestamp = Some(timestamp);
        self.update(error, dt)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.prev_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn proportional_only() {
        let mut pid = Pid::new(2.0, 0.0, 0.0);
        assert_relative_eq!(pid.update(1.5, 0.1), 3.0);
    }

    #[test]
    fn integral_accumulates() {
        let mut pid = Pid::new(0.0, 1.0, 0.0);
        pid.update(1.0, 0.1);
        assert_relative_eq!(pid.update(1.0, 0.1), 0.2);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = Pid::new(0.0, 0.0, 1.0);
        pid.update(1.0, 0.5);
        assert_relative_eq!(pid.update(2.0, 0.5), 2.0);
    }

    #[test]
    fn zero_error_after_reset_is_zero() {
        let mut pid = Pid::new(0.7, 0.3, 0.2);
        for _ in 0..10 {
            pid.update(25.0, 0.05);
        }
        pid.reset();
        for dt in [0.001, 0.033, 1.0, 10.0] {
            let mut fresh = pid.clone();
            assert_eq!(fresh.update(0.0, dt), 0.0);
        }
    }

    #[test]
    fn reset_forgets_history() {
        let mut clean = Pid::new(0.5, 0.4, 0.3);
        let mut used = clean.clone();
        used.update(80.0, 0.1);
        used.update(-45.0, 0.2);
        used.update(60.0, 0.05);
        used.reset();

        assert_eq!(used.update(12.0, 0.1), clean.update(12.0, 0.1));
        assert_eq!(used.integral(), clean.integral());
    }

    #[test]
    fn invalid_dt_skips_integral_and_derivative() {
        let mut pid = Pid::new(1.0, 10.0, 10.0);
        for dt in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let output = pid.update(4.0, dt);
            assert_eq!(output, 4.0);
            assert_eq!(pid.integral(), 0.0);
        }
    }

    #[test]
    fn timestamps_drive_dt() {
        let mut pid = Pid::new(0.0, 1.0, 0.0);
        // First sample has no predecessor, so nothing is integrated.
        assert_eq!(pid.update_at(2.0, Duration::from_millis(100)), 0.0);
        assert_relative_eq!(pid.update_at(2.0, Duration::from_millis(600)), 1.0);
        // Repeated timestamp is a zero dt.
        assert_relative_eq!(pid.update_at(2.0, Duration::from_millis(600)), 0.0);
    }
}
