// THEORY:
// The `pipeline` module is the top-level API of the tracker. `TrackingLoop` wires the
// core modules into the per-frame cycle and owns everything that must survive from
// one frame to the next: the controller's PID memory, the loop state and the last
// target seen.
//
// One cycle, strictly in this order:
//   1. acquire a frame (may block), resized to the configured size
//   2. detect -> select -> control
//   3. update the state machine
//   4. dispatch the command
//   5. poll the stop signal once
//
// Stopping is cooperative: a cycle that has started always finishes. Whatever the
// reason for stopping, the loop then issues exactly one land command, clears the PID
// memory and reports how the session went. `run` and `finish` consume the loop, so a
// stopped loop can never be resumed. Callers that need to watch each cycle drive it
// with `step` and hand the stop reason to `finish` themselves.

use std::fmt;

use log::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::core_modules::color_detector::ColorDetector;
use crate::core_modules::position_controller::{Command, Offset, PositionController};
use crate::core_modules::region::Point;
use crate::core_modules::state::{TrackingEvent, TrackingState};
use crate::core_modules::target_selector::{Target, TargetSelector};
use crate::error::{ActuationError, ConfigError, FrameError, SourceError};
use crate::interfaces::{Actuator, FrameSource, StopSignal, TimedFrame};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop signal fired.
    StopRequested,
    /// The frame source has no more frames.
    SourceExhausted,
    /// The frame source failed.
    SourceFailed(String),
    /// The frame source produced a buffer that is not a valid frame.
    FrameRejected(FrameError),
    /// The actuation channel refused a command or lost the vehicle.
    ActuationFailed(ActuationError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::StopRequested => f.write_str("stop requested"),
            StopReason::SourceExhausted => f.write_str("frame source exhausted"),
            StopReason::SourceFailed(message) => write!(f, "frame source failed: {message}"),
            StopReason::FrameRejected(err) => write!(f, "frame rejected: {err}"),
            StopReason::ActuationFailed(err) => write!(f, "actuation failed: {err}"),
        }
    }
}

/// What one completed cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub state: TrackingState,
    pub target: Option<Target>,
    pub command: Command,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub reason: StopReason,
    /// Cycles that completed detection and control.
    pub cycles: u64,
    /// Commands the actuator accepted.
    pub commands_sent: u64,
    /// Whether the final land command was accepted.
    pub landed: bool,
    pub final_state: TrackingState,
    /// The last target seen before stopping, if any.
    pub last_target: Option<Target>,
}

pub struct TrackingLoop<'a, S, A, T> {
    frame_width: u32,
    frame_height: u32,
    detector: ColorDetector,
    selector: TargetSelector,
    controller: PositionController,
    source: S,
    actuator: &'a mut A,
    stop: T,
    state: TrackingState,
    last_target: Option<Target>,
    frames_since_seen: u32,
    cycles: u64,
    commands_sent: u64,
    halted: Option<StopReason>,
}

impl<'a, S: FrameSource, A: Actuator, T: StopSignal> TrackingLoop<'a, S, A, T> {
    pub fn new(config: &TrackerConfig, source: S, actuator: &'a mut A, stop: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            detector: ColorDetector::new(config.thresholds),
            selector: TargetSelector::new(config.min_area)?,
            controller: PositionController::new(config),
            source,
            actuator,
            stop,
            state: TrackingState::Searching,
            last_target: None,
            frames_since_seen: 0,
            cycles: 0,
            commands_sent: 0,
            halted: None,
        })
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Runs cycles until something stops the session, then lands.
    pub fn run(mut self) -> SessionReport {
        info!(
            "tracking started: {}x{} frames, thresholds {:?}..{:?}",
            self.frame_width,
            self.frame_height,
            self.detector.range().lower(),
            self.detector.range().upper()
        );
        self.controller.reset();

        let reason = loop {
            if let Err(reason) = self.step() {
                break reason;
            }
        };
        self.finish(reason)
    }

    /// Runs a single cycle.
    ///
    /// Once a cycle has failed or the stop signal has fired, every later call
    /// returns the same reason without touching the source or the actuator; the
    /// caller is expected to hand that reason to [`TrackingLoop::finish`].
    pub fn step(&mut self) -> Result<CycleOutcome, StopReason> {
        if let Some(reason) = &self.halted {
            return Err(reason.clone());
        }
        let outcome = self.cycle();
        if let Err(reason) = &outcome {
            self.halted = Some(reason.clone());
        }
        outcome
    }

    fn cycle(&mut self) -> Result<CycleOutcome, StopReason> {
        let TimedFrame { frame, timestamp } = self.acquire()?;
        let frame = frame.into_size(self.frame_width, self.frame_height);
        let center = frame.center();

        let detection = self.detector.detect(&frame);
        let target = self.selector.select(&detection.regions);
        let command = self.controller.control(target.as_ref(), center, timestamp);

        self.transition(self.classify(target.as_ref(), center));
        self.remember(target);
        self.cycles += 1;
        debug!(
            "cycle {}: {} regions, target {:?}, {} -> {}",
            self.cycles,
            detection.regions.len(),
            target.map(|t| t.centroid),
            self.state,
            command
        );

        if let Err(err) = self.actuator.send(&command) {
            warn!("command {command} not delivered: {err}");
            return Err(StopReason::ActuationFailed(err));
        }
        self.commands_sent += 1;

        if self.stop.should_stop() {
            return Err(StopReason::StopRequested);
        }
        Ok(CycleOutcome {
            state: self.state,
            target,
            command,
        })
    }

    fn acquire(&mut self) -> Result<TimedFrame, StopReason> {
        match self.source.next_frame() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(StopReason::SourceExhausted),
            Err(SourceError::Frame(err)) => {
                warn!("rejecting frame: {err}");
                Err(StopReason::FrameRejected(err))
            }
            Err(err) => Err(StopReason::SourceFailed(err.to_string())),
        }
    }

    fn classify(&self, target: Option<&Target>, center: Point) -> TrackingEvent {
        match target {
            None => TrackingEvent::TargetLost,
            Some(t) if self.controller.is_centered(Offset::between(t.centroid, center)) => {
                TrackingEvent::TargetCentered
            }
            Some(_) => TrackingEvent::TargetOffCenter,
        }
    }

    fn transition(&mut self, event: TrackingEvent) {
        let next = self.state.on(event);
        if next != self.state {
            info!("{} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn remember(&mut self, target: Option<Target>) {
        match target {
            Some(target) => {
                if self.frames_since_seen > 0 && self.last_target.is_some() {
                    debug!("target reacquired after {} frames", self.frames_since_seen);
                }
                self.last_target = Some(target);
                self.frames_since_seen = 0;
            }
            None => {
                self.frames_since_seen = self.frames_since_seen.saturating_add(1);
                if self.frames_since_seen == 1 {
                    if let Some(last) = self.last_target {
                        debug!("target lost, last seen at {:?}", last.centroid);
                    }
                }
            }
        }
    }

    /// Stops the session: one land command, PID memory cleared, loop consumed.
    pub fn finish(mut self, reason: StopReason) -> SessionReport {
        self.transition(TrackingEvent::Stop);
        self.controller.reset();

        let landed = match self.actuator.land() {
            Ok(()) => true,
            Err(err) => {
                error!("land command failed: {err}");
                false
            }
        };
        info!(
            "tracking stopped ({reason}) after {} cycles, {} commands",
            self.cycles, self.commands_sent
        );

        SessionReport {
            reason,
            cycles: self.cycles,
            commands_sent: self.commands_sent,
            landed,
            final_state: self.state,
            last_target: self.last_target,
        }
    }
}
