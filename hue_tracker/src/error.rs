use std::path::PathBuf;

use crate::session::{FlightPhase, OperatorCommand};

/// Errors raised while building or loading a tracker configuration.
///
/// None of these can happen once a session is running: every component is built
/// from an already validated configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{channel} bound {value} is outside 0..={max}")]
    ChannelOutOfRange {
        channel: &'static str,
        value: i32,
        max: i32,
    },
    #[error("{channel} lower bound {lower} exceeds upper bound {upper}")]
    InvertedRange {
        channel: &'static str,
        lower: i32,
        upper: i32,
    },
    #[error("minimum region area must be a positive number, got {0}")]
    NonPositiveMinArea(f64),
    #[error("frame size must be non-zero, got {width}x{height}")]
    EmptyFrameSize { width: u32, height: u32 },
    #[error("command limit must be positive, got {0}")]
    NonPositiveLimit(i32),
    #[error("fixed step must be positive, got {0}")]
    NonPositiveStep(i32),
    #[error("PID gains must be finite (kp={kp}, ki={ki}, kd={kd})")]
    NonFiniteGain { kp: f64, ki: f64, kd: f64 },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised when a pixel buffer cannot be interpreted as a frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unsupported channel count {0}, expected 3 or 4")]
    UnsupportedChannels(usize),
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Failures reported by a frame source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Failures reported by the actuation channel.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActuationError {
    #[error("vehicle rejected the command: {0}")]
    Rejected(String),
    #[error("link to the vehicle was lost")]
    Disconnected,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("cannot {command} while {phase}")]
    InvalidTransition {
        phase: FlightPhase,
        command: OperatorCommand,
    },
    #[error("unknown operator command {0:?}")]
    UnknownCommand(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Actuation(#[from] ActuationError),
}
