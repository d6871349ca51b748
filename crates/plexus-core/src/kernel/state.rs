use std::fmt;

/// Framework lifecycle. Linear: a stopped framework is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkState {
    Created,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for FrameworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameworkState::Created => "created",
            FrameworkState::Started => "started",
            FrameworkState::Stopping => "stopping",
            FrameworkState::Stopped => "stopped",
        })
    }
}
