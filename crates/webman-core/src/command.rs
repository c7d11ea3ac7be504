use crate::endpoint::{Button, Endpoint};
use crate::error::DeviceError;
use crate::snapshot::{FanMode, Snapshot};

/// Source name for "no game file mounted, boot from the disc drive".
pub const XMB_SOURCE: &str = "XMB";

pub const MAX_FAN_SPEED: u8 = 100;
pub const MIN_TARGET_TEMP: f64 = 40.0;
pub const MAX_TARGET_TEMP: f64 = 85.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Notify { message: String, icon: u8, sound: u8 },
    SetFanMode(FanMode),
    SetTargetTemp(f64),
    SetFanSpeed(u8),
    PressButton(Button),
    Shutdown,
    StartPlayback,
    QuitPlayback,
    MountDisc,
    MountGame(String),
}

/// What a slow command waits to see in a later snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Convergence {
    SessionEnded,
    SessionStarted,
    GameMounted(String),
    DiscMounted,
}

impl Convergence {
    pub fn is_met(&self, snapshot: &Snapshot) -> bool {
        if !snapshot.is_on() {
            return false;
        }
        match self {
            Convergence::SessionEnded => snapshot.media_session().is_none(),
            Convergence::SessionStarted => snapshot.media_session().is_some(),
            Convergence::GameMounted(location) => {
                snapshot.mounted_gamefile() == Some(location.as_str())
            }
            Convergence::DiscMounted => snapshot.mounted_gamefile().is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WritePlan {
    pub endpoint: Endpoint,
    pub convergence: Option<Convergence>,
}

impl Command {
    pub fn notify(message: impl Into<String>) -> Self {
        Command::Notify {
            message: message.into(),
            icon: 1,
            sound: 1,
        }
    }

    /// Picks the mount command for a source name as listed by
    /// `Device::source_list`.
    pub fn select_source(source: &str) -> Self {
        if source == XMB_SOURCE {
            Command::MountDisc
        } else {
            Command::MountGame(source.to_string())
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Notify { .. } => "notify",
            Command::SetFanMode(_) => "set fan mode",
            Command::SetTargetTemp(_) => "set target temperature",
            Command::SetFanSpeed(_) => "set fan speed",
            Command::PressButton(_) => "press button",
            Command::Shutdown => "shutdown",
            Command::StartPlayback => "start playback",
            Command::QuitPlayback => "quit playback",
            Command::MountDisc => "mount disc",
            Command::MountGame(_) => "mount game",
        }
    }

    pub fn is_slow(&self) -> bool {
        matches!(
            self,
            Command::StartPlayback
                | Command::QuitPlayback
                | Command::MountDisc
                | Command::MountGame(_)
        )
    }

    /// Validates arguments against the current snapshot and resolves the
    /// endpoint plus, for slow commands, the state to wait for.
    pub(crate) fn plan(&self, current: &Snapshot) -> Result<WritePlan, DeviceError> {
        let fast = |endpoint: Endpoint| -> Result<WritePlan, DeviceError> {
            Ok(WritePlan {
                endpoint,
                convergence: None,
            })
        };
        let slow = |endpoint: Endpoint, convergence: Convergence| -> Result<WritePlan, DeviceError> {
            Ok(WritePlan {
                endpoint,
                convergence: Some(convergence),
            })
        };

        match self {
            Command::Notify {
                message,
                icon,
                sound,
            } => fast(Endpoint::Notify {
                message: message.clone(),
                icon: *icon,
                sound: *sound,
            }),
            Command::SetFanMode(mode) => fast(Endpoint::SetFanMode(*mode)),
            Command::SetTargetTemp(temp) => {
                if !(MIN_TARGET_TEMP..=MAX_TARGET_TEMP).contains(temp) {
                    return Err(DeviceError::InvalidArgument(format!(
                        "target temperature {temp} outside {MIN_TARGET_TEMP}..={MAX_TARGET_TEMP}"
                    )));
                }
                fast(Endpoint::SetTargetTemp(*temp))
            }
            Command::SetFanSpeed(speed) => {
                if *speed > MAX_FAN_SPEED {
                    return Err(DeviceError::InvalidArgument(format!(
                        "fan speed {speed}% above {MAX_FAN_SPEED}%"
                    )));
                }
                fast(Endpoint::SetFanSpeed(*speed))
            }
            Command::PressButton(button) => fast(Endpoint::PressButton(*button)),
            Command::Shutdown => fast(Endpoint::Shutdown),
            Command::StartPlayback => slow(Endpoint::StartPlayback, Convergence::SessionStarted),
            Command::QuitPlayback => slow(Endpoint::QuitPlayback, Convergence::SessionEnded),
            Command::MountDisc => slow(Endpoint::MountDisc, Convergence::DiscMounted),
            Command::MountGame(name) => {
                let location = current
                    .games()
                    .and_then(|games| games.location_of(name))
                    .ok_or_else(|| DeviceError::UnknownGame(name.clone()))?
                    .to_string();
                slow(
                    Endpoint::MountGame {
                        location: location.clone(),
                    },
                    Convergence::GameMounted(location),
                )
            }
        }
    }
}
