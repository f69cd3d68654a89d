use std::fmt;

/// Where the tracking loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// No target in view; the search command is issued.
    Searching,
    /// Target in view but outside the dead zone; corrective commands are issued.
    Tracking,
    /// Target inside the dead zone; the vehicle holds.
    Centered,
    /// Terminal. Nothing is issued after the final land command.
    Stopped,
}

/// What the loop observed during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    TargetLost,
    TargetOffCenter,
    TargetCentered,
    Stop,
}

impl TrackingState {
    pub fn on(self, event: TrackingEvent) -> Self {
        match (self, event) {
            (TrackingState::Stopped, _) | (_, TrackingEvent::Stop) => TrackingState::Stopped,
            (_, TrackingEvent::TargetLost) => TrackingState::Searching,
            (_, TrackingEvent::TargetOffCenter) => TrackingState::Tracking,
            (_, TrackingEvent::TargetCentered) => TrackingState::Centered,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == TrackingState::Stopped
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingState::Searching => "SEARCHING",
            TrackingState::Tracking => "TRACKING",
            TrackingState::Centered => "CENTERED",
            TrackingState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}
