// THEORY:
// The `PositionController` is the actuation layer. It turns "where is the target
// relative to the middle of the frame" into a `Command`, the four-axis velocity
// vector the vehicle understands.
//
// Key rules:
// 1.  **Dead zone**: an axis whose error is within `tolerance` pixels (inclusive) is
//     considered centered and gets exactly zero, whatever the control mode. This
//     keeps the vehicle from hunting back and forth around the setpoint. In feedback
//     mode a centered axis still advances its PID clock with a zero error.
// 2.  **Two control laws**, chosen once at configuration time:
//     - fixed step: a constant push of `step` in the direction of the error;
//     - feedback: one PID per axis, output rounded and saturated.
// 3.  **Saturation, not overflow**: every component is clamped to `[-limit, limit]`.
// 4.  **Search on loss**: without a target the configured search command is issued
//     and all PID memory is cleared, so integral error from one sighting never leaks
//     into the next.
//
// Axis conventions: left/right follows the horizontal pixel error directly; up/down
// follows the *negated* vertical error because image rows grow downward. Forward/back
// and yaw are only used by the search policy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::core_modules::pid::{Pid, PidGains};
use crate::core_modules::region::Point;
use crate::core_modules::target_selector::Target;

pub type AxisSpeed = i32;

/// Velocity command for the four vehicle axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Positive moves right.
    pub left_right: AxisSpeed,
    /// Positive moves forward.
    pub forward_back: AxisSpeed,
    /// Positive climbs.
    pub up_down: AxisSpeed,
    /// Positive turns clockwise.
    pub yaw: AxisSpeed,
}

impl Command {
    pub const HOVER: Command = Command {
        left_right: 0,
        forward_back: 0,
        up_down: 0,
        yaw: 0,
    };

    pub fn clamped(self, limit: AxisSpeed) -> Self {
        let clamp = |v: AxisSpeed| v.clamp(-limit, limit);
        Self {
            left_right: clamp(self.left_right),
            forward_back: clamp(self.forward_back),
            up_down: clamp(self.up_down),
            yaw: clamp(self.yaw),
        }
    }

    pub fn is_hover(&self) -> bool {
        *self == Self::HOVER
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lr={} fb={} ud={} yaw={}",
            self.left_right, self.forward_back, self.up_down, self.yaw
        )
    }
}

/// Signed pixel distance from the frame center to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub fn between(target: Point, center: Point) -> Self {
        Self {
            dx: target.x - center.x,
            dy: target.y - center.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlMode {
    /// Constant push of `step` toward the target on every off-center axis.
    FixedStep { step: AxisSpeed },
    /// Independent PID loops for the horizontal and vertical axes.
    Feedback { x: PidGains, y: PidGains },
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::FixedStep { step: 20 }
    }
}

/// What to do while no target is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Hold position.
    #[default]
    Hover,
    /// Turn in place at `yaw` speed.
    Rotate { yaw: AxisSpeed },
}

impl SearchPolicy {
    pub fn command(&self) -> Command {
        match *self {
            SearchPolicy::Hover => Command::HOVER,
            SearchPolicy::Rotate { yaw } => Command { yaw, ..Command::HOVER },
        }
    }
}

#[derive(Debug, Clone)]
enum ControlLaw {
    FixedStep { step: AxisSpeed },
    Feedback { x: Pid, y: Pid },
}

#[derive(Debug, Clone)]
pub struct PositionController {
    law: ControlLaw,
    tolerance: u32,
    limit: AxisSpeed,
    search: SearchPolicy,
}

impl PositionController {
    /// Builds a controller from an already validated configuration.
    pub fn new(config: &TrackerConfig) -> Self {
        let law = match config.mode {
            ControlMode::FixedStep { step } => ControlLaw::FixedStep { step },
            ControlMode::Feedback { x, y } => ControlLaw::Feedback {
                x: Pid::from_gains(x),
                y: Pid::from_gains(y),
            },
        };
        Self {
            law,
            tolerance: config.tolerance,
            limit: config.command_limit,
            search: config.search,
        }
    }

    fn within_tolerance(&self, error: i32) -> bool {
        error.unsigned_abs() <= self.tolerance
    }

    /// True when both axes are inside the dead zone.
    pub fn is_centered(&self, offset: Offset) -> bool {
        self.within_tolerance(offset.dx) && self.within_tolerance(offset.dy)
    }

    /// Computes this frame's command. `timestamp` is the frame's capture time and
    /// only matters in feedback mode.
    pub fn control(&mut self, target: Option<&Target>, frame_center: Point, timestamp: Duration) -> Command {
        let Some(target) = target else {
            self.reset();
            return self.search.command().clamped(self.limit);
        };

        let offset = Offset::between(target.centroid, frame_center);
        let horizontal = (!self.within_tolerance(offset.dx)).then_some(offset.dx);
        let vertical = (!self.within_tolerance(offset.dy)).then_some(-offset.dy);
        let limit = self.limit;

        let command = match &mut self.law {
            ControlLaw::FixedStep { step } => Command {
                left_right: horizontal.map_or(0, |e| *step * e.signum()),
                up_down: vertical.map_or(0, |e| *step * e.signum()),
                ..Command::HOVER
            },
            ControlLaw::Feedback { x, y } => Command {
                left_right: feedback_axis(x, horizontal, timestamp, limit),
                up_down: feedback_axis(y, vertical, timestamp, limit),
                ..Command::HOVER
            },
        };

        command.clamped(limit)
    }

    /// Clears all PID memory.
    pub fn reset(&mut self) {
        if let ControlLaw::Feedback { x, y } = &mut self.law {
            x.reset();
            y.reset();
        }
    }
}

/// One PID axis. A centered axis outputs zero but still feeds its PID a zero
/// error at this frame's timestamp, so the next off-center frame sees a one-frame
/// `dt` instead of the whole centered stretch.
fn feedback_axis(pid: &mut Pid, error: Option<i32>, timestamp: Duration, limit: AxisSpeed) -> AxisSpeed {
    match error {
        Some(error) => saturate(pid.update_at(error as f64, timestamp), limit),
        None => {
            pid.update_at(0.0, timestamp);
            0
        }
    }
}

fn saturate(raw: f64, limit: AxisSpeed) -> AxisSpeed {
    let bound = limit as f64;
    // NaN casts to 0.
    raw.round().clamp(-bound, bound) as AxisSpeed
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Point = Point::new(320, 240);

    fn target(x: i32, y: i32) -> Target {
        Target { centroid: Point::new(x, y), area: 1000.0 }
    }

    fn fixed_step() -> PositionController {
        PositionController::new(&TrackerConfig::default())
    }

    fn feedback(gains: PidGains) -> PositionController {
        PositionController::new(&TrackerConfig {
            mode: ControlMode::Feedback { x: gains, y: gains },
            ..TrackerConfig::default()
        })
    }

    fn at(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn dead_zone_is_zero_in_both_modes() {
        let offsets = [(0, 0), (40, 0), (-40, 40), (39, -40), (-1, 1)];
        let mut controllers = [fixed_step(), feedback(PidGains { kp: 5.0, ki: 1.0, kd: 1.0 })];
        for controller in controllers.iter_mut() {
            for (i, (dx, dy)) in offsets.iter().enumerate() {
                let t = target(CENTER.x + dx, CENTER.y + dy);
                let command = controller.control(Some(&t), CENTER, at(33 * i as u64));
                assert!(command.is_hover(), "{dx},{dy} -> {command}");
            }
        }
    }

    #[test]
    fn only_the_off_center_axis_moves() {
        let mut controller = fixed_step();
        let command = controller.control(Some(&target(420, 250)), CENTER, at(0));
        assert_eq!(command, Command { left_right: 20, ..Command::HOVER });
    }

    #[test]
    fn fixed_step_ignores_magnitude() {
        let mut controller = fixed_step();
        let near = controller.control(Some(&target(361, 240)), CENTER, at(0));
        let far = controller.control(Some(&target(639, 240)), CENTER, at(33));
        assert_eq!(near, far);
        assert_eq!(near.left_right, 20);
    }

    #[test]
    fn target_above_center_commands_climb() {
        let mut controller = fixed_step();
        let command = controller.control(Some(&target(320, 100)), CENTER, at(0));
        assert_eq!(command, Command { up_down: 20, ..Command::HOVER });

        let command = controller.control(Some(&target(200, 400)), CENTER, at(33));
        assert_eq!(command, Command { left_right: -20, up_down: -20, ..Command::HOVER });
    }

    #[test]
    fn feedback_output_saturates_at_the_bound() {
        let mut controller = feedback(PidGains { kp: 10.0, ki: 0.0, kd: 0.0 });
        let command = controller.control(Some(&target(600, 20)), CENTER, at(0));
        assert_eq!(command.left_right, 100);
        assert_eq!(command.up_down, 100);

        let command = controller.control(Some(&target(0, 479)), CENTER, at(33));
        assert_eq!(command.left_right, -100);
        assert_eq!(command.up_down, -100);
    }

    #[test]
    fn feedback_is_proportional_on_first_sample() {
        let mut controller = feedback(PidGains { kp: 0.5, ki: 2.0, kd: 3.0 });
        let command = controller.control(Some(&target(380, 240)), CENTER, at(500));
        assert_eq!(command.left_right, 30);
    }

    #[test]
    fn losing_the_target_clears_pid_memory() {
        let gains = PidGains { kp: 0.2, ki: 0.5, kd: 0.0 };
        let mut warmed = feedback(gains);
        for i in 0..20 {
            warmed.control(Some(&target(450, 240)), CENTER, at(100 * i));
        }
        let search = warmed.control(None, CENTER, at(2100));
        assert!(search.is_hover());

        let mut fresh = feedback(gains);
        let t = target(400, 240);
        assert_eq!(
            warmed.control(Some(&t), CENTER, at(2200)),
            fresh.control(Some(&t), CENTER, at(2200))
        );
    }

    #[test]
    fn centered_stretch_does_not_inflate_the_next_dt() {
        let mut controller = feedback(PidGains { kp: 0.0, ki: 1.0, kd: 0.0 });
        let off = target(420, 240);
        let centered = target(320, 240);

        assert_eq!(controller.control(Some(&off), CENTER, at(0)).left_right, 0);
        assert_eq!(controller.control(Some(&off), CENTER, at(100)).left_right, 10);
        for i in 2..100 {
            assert!(controller.control(Some(&centered), CENTER, at(100 * i)).is_hover());
        }
        // One 100 ms step on top of the integral from before: 10 + 100 * 0.1.
        assert_eq!(controller.control(Some(&off), CENTER, at(10_000)).left_right, 20);
    }

    #[test]
    fn rotate_search_policy_turns_in_place() {
        let mut controller = PositionController::new(&TrackerConfig {
            search: SearchPolicy::Rotate { yaw: 250 },
            ..TrackerConfig::default()
        });
        let command = controller.control(None, CENTER, at(0));
        assert_eq!(command, Command { yaw: 100, ..Command::HOVER });
    }

    #[test]
    fn centered_means_both_axes() {
        let controller = fixed_step();
        assert!(controller.is_centered(Offset { dx: 40, dy: -40 }));
        assert!(!controller.is_centered(Offset { dx: 41, dy: 0 }));
        assert!(!controller.is_centered(Offset { dx: 0, dy: -41 }));
    }
}
