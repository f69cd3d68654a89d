// THEORY:
// The tracker never talks to a camera, a radio or a keyboard directly. Those are
// external collaborators plugged in through three small traits:
//
// - `FrameSource` hands out timestamped frames and may block while waiting for one.
// - `Actuator` forwards commands to the vehicle and reports when it cannot.
// - `StopSignal` is polled once per cycle; returning `true` ends the session after
//   the current cycle.
//
// A few stock implementations live here as well: a replay source for recorded or
// synthetic frames, a dry-run actuator that only logs, and stop signals for a
// shared flag and a safety deadline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::core_modules::frame::Frame;
use crate::core_modules::position_controller::Command;
use crate::error::{ActuationError, SourceError};

/// A frame together with its capture time, measured from any fixed origin.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    pub frame: Frame,
    pub timestamp: Duration,
}

pub trait FrameSource {
    /// Returns the next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError>;
}

pub trait Actuator {
    fn takeoff(&mut self) -> Result<(), ActuationError>;

    /// Fire-and-forget delivery of one command.
    fn send(&mut self, command: &Command) -> Result<(), ActuationError>;

    fn land(&mut self) -> Result<(), ActuationError>;
}

pub trait StopSignal {
    fn should_stop(&mut self) -> bool;
}

/// Plays back a fixed list of frames.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<TimedFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = TimedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Timestamps the frames at a constant `interval`, starting from zero.
    pub fn at_interval(frames: impl IntoIterator<Item = Frame>, interval: Duration) -> Self {
        Self::new(frames.into_iter().enumerate().map(|(i, frame)| TimedFrame {
            frame,
            timestamp: interval * i as u32,
        }))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

/// Dry-run actuator that logs every command instead of flying.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    commands_seen: u64,
}

impl LoggingActuator {
    pub fn commands_seen(&self) -> u64 {
        self.commands_seen
    }
}

impl Actuator for LoggingActuator {
    fn takeoff(&mut self) -> Result<(), ActuationError> {
        info!("[dry-run] takeoff");
        Ok(())
    }

    fn send(&mut self, command: &Command) -> Result<(), ActuationError> {
        self.commands_seen += 1;
        debug!("[dry-run] command #{}: {}", self.commands_seen, command);
        Ok(())
    }

    fn land(&mut self) -> Result<(), ActuationError> {
        info!("[dry-run] land after {} commands", self.commands_seen);
        Ok(())
    }
}

/// Never asks the loop to stop; the session ends only on source exhaustion or
/// failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopSignal for NeverStop {
    fn should_stop(&mut self) -> bool {
        false
    }
}

/// Safety timeout: stops once the deadline has passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }
}

impl StopSignal for Deadline {
    fn should_stop(&mut self) -> bool {
        Instant::now() >= self.at
    }
}

/// A flag raised from elsewhere, e.g. a signal handler.
impl StopSignal for Arc<AtomicBool> {
    fn should_stop(&mut self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// An absent signal never fires.
impl<T: StopSignal> StopSignal for Option<T> {
    fn should_stop(&mut self) -> bool {
        self.as_mut().is_some_and(|signal| signal.should_stop())
    }
}

/// Stops when either signal fires. Both are polled every cycle.
impl<A: StopSignal, B: StopSignal> StopSignal for (A, B) {
    fn should_stop(&mut self) -> bool {
        let first = self.0.should_stop();
        let second = self.1.should_stop();
        first || second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn replay_source_hands_out_frames_in_order_then_ends() {
        let frames = (1..=3).map(|w| Frame::from(RgbImage::new(w, 1)));
        let mut source = ReplaySource::at_interval(frames, Duration::from_millis(50));
        assert_eq!(source.remaining(), 3);

        let mut widths = Vec::new();
        while let Some(timed) = source.next_frame().unwrap() {
            assert_eq!(timed.timestamp, Duration::from_millis(50) * (timed.frame.width() - 1));
            widths.push(timed.frame.width());
        }
        assert_eq!(widths, vec![1, 2, 3]);
    }

    #[test]
    fn combined_signals_fire_on_either() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut stop = (NeverStop, Some(flag.clone()));
        assert!(!stop.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(stop.should_stop());

        let mut absent: Option<Deadline> = None;
        assert!(!absent.should_stop());
    }

    #[test]
    fn expired_deadline_stops() {
        let mut deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.should_stop());
        let mut later = Deadline::after(Duration::from_secs(3600));
        assert!(!later.should_stop());
    }
}
