use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    #[default]
    Unknown,
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanMode {
    #[serde(rename = "SYSCON")]
    Syscon,
    Manual,
    Dynamic,
    Auto,
}

impl FanMode {
    pub const ALL: [FanMode; 4] = [
        FanMode::Syscon,
        FanMode::Manual,
        FanMode::Dynamic,
        FanMode::Auto,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FanMode::Syscon => "SYSCON",
            FanMode::Manual => "Manual",
            FanMode::Dynamic => "Dynamic",
            FanMode::Auto => "Auto",
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FanMode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown fan mode '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSession {
    Game {
        game_id: String,
        game_title: String,
        /// Seconds.
        playback_elapsed: u64,
        image_path: Option<String>,
    },
    Media {
        /// Seconds.
        playback_elapsed: u64,
    },
}

impl MediaSession {
    pub fn playback_elapsed(&self) -> u64 {
        match self {
            MediaSession::Game {
                playback_elapsed, ..
            }
            | MediaSession::Media { playback_elapsed } => *playback_elapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub name: String,
    pub location: String,
}

/// Installed games keyed by display name, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameLibrary(Vec<GameEntry>);

impl GameLibrary {
    /// Returns false when `name` is already present; the first entry wins.
    pub fn insert(&mut self, name: impl Into<String>, location: impl Into<String>) -> bool {
        let name = name.into();
        if self.location_of(&name).is_some() {
            return false;
        }
        self.0.push(GameEntry {
            name,
            location: location.into(),
        });
        true
    }

    pub fn location_of(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.location.as_str())
    }

    pub fn name_of(&self, location: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.location == location)
            .map(|entry| entry.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|entry| entry.name.as_str())
    }

    pub fn entries(&self) -> &[GameEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything scraped from a reachable device. Only exists while the
/// device is on, so the fields are cleared together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub cpu_temp: f64,
    pub rsx_temp: f64,
    pub fan_speed: u8,
    pub fan_mode: FanMode,
    /// Set only in `FanMode::Dynamic`.
    pub target_temp: Option<f64>,
    pub media_session: Option<MediaSession>,
    pub games: Option<GameLibrary>,
    pub mounted_gamefile: Option<String>,
    pub firmware_version: Option<String>,
}

/// Immutable once built; telemetry is present exactly when the device is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub(crate) sequence: u64,
    pub(crate) ts: DateTime<Utc>,
    pub(crate) power_state: PowerState,
    pub(crate) telemetry: Option<Telemetry>,
}

impl Snapshot {
    pub fn initial() -> Self {
        Self::cleared(0, PowerState::Unknown)
    }

    /// Checked constructor for snapshots built outside a device.
    pub fn from_parts(
        sequence: u64,
        ts: DateTime<Utc>,
        power_state: PowerState,
        telemetry: Option<Telemetry>,
    ) -> Result<Self, DeviceError> {
        match (&telemetry, power_state) {
            (Some(_), PowerState::On) | (None, PowerState::Off | PowerState::Unknown) => {}
            (Some(_), _) => {
                return Err(DeviceError::InvalidArgument(format!(
                    "{power_state:?} snapshot cannot carry telemetry"
                )))
            }
            (None, PowerState::On) => {
                return Err(DeviceError::InvalidArgument(
                    "On snapshot needs telemetry".to_string(),
                ))
            }
        }
        if let Some(t) = &telemetry {
            if t.target_temp.is_some() && t.fan_mode != FanMode::Dynamic {
                return Err(DeviceError::InvalidArgument(format!(
                    "target temperature is only reported in Dynamic mode, not {}",
                    t.fan_mode
                )));
            }
        }

        Ok(Self {
            sequence,
            ts,
            power_state,
            telemetry,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn power_state(&self) -> PowerState {
        self.power_state
    }

    pub fn telemetry(&self) -> Option<&Telemetry> {
        self.telemetry.as_ref()
    }

    pub(crate) fn on(sequence: u64, telemetry: Telemetry) -> Self {
        Self {
            sequence,
            ts: Utc::now(),
            power_state: PowerState::On,
            telemetry: Some(telemetry),
        }
    }

    pub(crate) fn cleared(sequence: u64, power_state: PowerState) -> Self {
        Self {
            sequence,
            ts: Utc::now(),
            power_state,
            telemetry: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.power_state == PowerState::On
    }

    pub fn cpu_temp(&self) -> Option<f64> {
        self.telemetry.as_ref().map(|t| t.cpu_temp)
    }

    pub fn rsx_temp(&self) -> Option<f64> {
        self.telemetry.as_ref().map(|t| t.rsx_temp)
    }

    pub fn fan_speed(&self) -> Option<u8> {
        self.telemetry.as_ref().map(|t| t.fan_speed)
    }

    pub fn fan_mode(&self) -> Option<FanMode> {
        self.telemetry.as_ref().map(|t| t.fan_mode)
    }

    pub fn target_temp(&self) -> Option<f64> {
        self.telemetry.as_ref().and_then(|t| t.target_temp)
    }

    pub fn media_session(&self) -> Option<&MediaSession> {
        self.telemetry.as_ref().and_then(|t| t.media_session.as_ref())
    }

    pub fn games(&self) -> Option<&GameLibrary> {
        self.telemetry.as_ref().and_then(|t| t.games.as_ref())
    }

    pub fn mounted_gamefile(&self) -> Option<&str> {
        self.telemetry
            .as_ref()
            .and_then(|t| t.mounted_gamefile.as_deref())
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.telemetry
            .as_ref()
            .and_then(|t| t.firmware_version.as_deref())
    }
}
