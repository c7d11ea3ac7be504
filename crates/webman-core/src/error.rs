use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unexpected response status {0}")]
    Protocol(u16),
    #[error("unexpected page layout: {0}")]
    Parse(String),
    #[error("device unreachable")]
    Unreachable,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("device is busy with another command")]
    Busy,
    #[error("{command} was sent but not confirmed within {}s", waited.as_secs())]
    ConvergenceTimeout {
        command: &'static str,
        waited: Duration,
    },
    #[error("unknown game: {0}")]
    UnknownGame(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DeviceError {
    pub(crate) fn parse(detail: impl Into<String>) -> Self {
        Self::Parse(detail.into())
    }

    /// Powered-off devices time out or drop the connection; callers treat
    /// this as a state rather than a fault.
    pub fn is_device_off(&self) -> bool {
        matches!(self, Self::Unreachable)
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Busy => "another command is still running, try again shortly",
            Self::ConvergenceTimeout { .. } => {
                "command sent, but the device state is unconfirmed; refresh to check"
            }
            Self::Unreachable => "the device is off or not reachable",
            Self::UnknownGame(_) | Self::InvalidArgument(_) => "check the command arguments",
            Self::Protocol(_) | Self::Parse(_) | Self::Transport(_) => {
                "the device answered unexpectedly"
            }
        }
    }
}
