// THEORY:
// `FlightSession` is the operator-facing lifecycle around a tracking run:
//
//   Idle --takeoff--> Flying --track--> Tracking --(loop stops)--> Stopped
//                       |                                      ^
//                       +------------------land----------------+
//   any non-stopped phase --quit--> Stopped (landing first when airborne)
//
// Operator input is parsed once into a typed `OperatorCommand`; every transition
// goes through `FlightPhase::after`, so an out-of-order command is a typed error
// rather than a silently ignored string. A session is single use: once Stopped,
// every command is refused.

use std::fmt;
use std::str::FromStr;

use log::{info, warn};

use crate::config::TrackerConfig;
use crate::error::SessionError;
use crate::interfaces::{Actuator, FrameSource, StopSignal};
use crate::pipeline::{SessionReport, TrackingLoop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    Flying,
    Tracking,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Takeoff,
    BeginTracking,
    Land,
    Terminate,
}

impl FlightPhase {
    /// The phase reached by applying `command`, or `None` when the command is not
    /// allowed here.
    pub fn after(self, command: OperatorCommand) -> Option<FlightPhase> {
        use FlightPhase::*;
        use OperatorCommand::*;
        match (self, command) {
            (Stopped, _) => None,
            (_, Terminate) => Some(Stopped),
            (Idle, Takeoff) => Some(Flying),
            (Flying, BeginTracking) => Some(Tracking),
            (Flying | Tracking, Land) => Some(Stopped),
            _ => None,
        }
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, FlightPhase::Flying | FlightPhase::Tracking)
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightPhase::Idle => "idle",
            FlightPhase::Flying => "flying",
            FlightPhase::Tracking => "tracking",
            FlightPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorCommand::Takeoff => "takeoff",
            OperatorCommand::BeginTracking => "track",
            OperatorCommand::Land => "land",
            OperatorCommand::Terminate => "quit",
        };
        f.write_str(name)
    }
}

impl FromStr for OperatorCommand {
    type Err = SessionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "takeoff" | "t" => Ok(OperatorCommand::Takeoff),
            "track" | "g" => Ok(OperatorCommand::BeginTracking),
            "land" | "l" => Ok(OperatorCommand::Land),
            "quit" | "q" | "exit" => Ok(OperatorCommand::Terminate),
            _ => Err(SessionError::UnknownCommand(input.trim().to_string())),
        }
    }
}

pub struct FlightSession<A> {
    config: TrackerConfig,
    actuator: A,
    phase: FlightPhase,
}

impl<A: Actuator> FlightSession<A> {
    pub fn new(config: TrackerConfig, actuator: A) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            config,
            actuator,
            phase: FlightPhase::Idle,
        })
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }

    fn next_phase(&self, command: OperatorCommand) -> Result<FlightPhase, SessionError> {
        self.phase.after(command).ok_or(SessionError::InvalidTransition {
            phase: self.phase,
            command,
        })
    }

    fn enter(&mut self, phase: FlightPhase) {
        info!("flight phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    pub fn takeoff(&mut self) -> Result<(), SessionError> {
        let next = self.next_phase(OperatorCommand::Takeoff)?;
        if let Err(err) = self.actuator.takeoff() {
            self.enter(FlightPhase::Stopped);
            return Err(err.into());
        }
        self.enter(next);
        Ok(())
    }

    /// Runs the tracking loop until it stops. The loop lands the vehicle itself,
    /// so the session always ends up Stopped.
    pub fn track<S: FrameSource, T: StopSignal>(&mut self, source: S, stop: T) -> Result<SessionReport, SessionError> {
        let next = self.next_phase(OperatorCommand::BeginTracking)?;
        self.enter(next);
        let outcome = TrackingLoop::new(&self.config, source, &mut self.actuator, stop).map(|tracking| tracking.run());
        let report = match outcome {
            Ok(report) => report,
            Err(err) => {
                // Airborne without a loop: land here instead.
                if let Err(land) = self.actuator.land() {
                    warn!("land after failed tracking start failed: {land}");
                }
                self.enter(FlightPhase::Stopped);
                return Err(err.into());
            }
        };
        self.enter(FlightPhase::Stopped);
        Ok(report)
    }

    pub fn land(&mut self) -> Result<(), SessionError> {
        let next = self.next_phase(OperatorCommand::Land)?;
        let result = self.actuator.land();
        self.enter(next);
        result.map_err(SessionError::from)
    }

    /// Ends the session from any phase, landing first when airborne.
    pub fn terminate(&mut self) -> Result<(), SessionError> {
        let next = self.next_phase(OperatorCommand::Terminate)?;
        let result = if self.phase.is_airborne() {
            self.actuator.land()
        } else {
            Ok(())
        };
        if let Err(err) = &result {
            warn!("land on terminate failed: {err}");
        }
        self.enter(next);
        result.map_err(SessionError::from)
    }

    /// Applies a command that needs no frame source. `BeginTracking` must go
    /// through [`FlightSession::track`].
    pub fn apply(&mut self, command: OperatorCommand) -> Result<(), SessionError> {
        match command {
            OperatorCommand::Takeoff => self.takeoff(),
            OperatorCommand::Land => self.land(),
            OperatorCommand::Terminate => self.terminate(),
            OperatorCommand::BeginTracking => Err(SessionError::InvalidTransition {
                phase: self.phase,
                command,
            }),
        }
    }
}
