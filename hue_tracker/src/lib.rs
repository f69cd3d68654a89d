// THEORY:
// This file is the main entry point for the `hue_tracker` library crate.
//
// The crate turns a stream of camera frames into a stream of bounded movement
// commands that keep one colored object in the middle of the picture. The work for
// each frame runs top to bottom through the `core_modules`:
//
//   Frame -> ColorDetector (mask + regions) -> TargetSelector (target or none)
//         -> PositionController (command) -> Actuator
//
// `pipeline::TrackingLoop` drives that sequence until something asks it to stop,
// and `session::FlightSession` wraps the loop in the take-off / track / land
// lifecycle the operator sees. Cameras, vehicles and stop buttons stay outside the
// crate and plug in through the traits in `interfaces`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod interfaces;
pub mod pipeline;
pub mod session;

pub use config::{ThresholdConfig, TrackerConfig};
pub use core_modules::color_detector::{ColorDetector, Detection};
pub use core_modules::frame::{ChannelOrder, Frame, HsvPixel};
pub use core_modules::hsv_range::HsvRange;
pub use core_modules::pid::{Pid, PidGains};
pub use core_modules::position_controller::{
    Command, ControlMode, Offset, PositionController, SearchPolicy,
};
pub use core_modules::region::{BoundingBox, Point, Region};
pub use core_modules::state::{TrackingEvent, TrackingState};
pub use core_modules::target_selector::{Target, TargetSelector};
pub use error::{ActuationError, ConfigError, FrameError, SessionError, SourceError};
pub use interfaces::{
    Actuator, Deadline, FrameSource, LoggingActuator, NeverStop, ReplaySource, StopSignal, TimedFrame,
};
pub use pipeline::{CycleOutcome, SessionReport, StopReason, TrackingLoop};
pub use session::{FlightPhase, FlightSession, OperatorCommand};
