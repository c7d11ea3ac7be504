use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::snapshot::FanMode;

// Unreserved characters and '/' stay literal.
const PATH_TEXT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Request,
    Transition,
    Menu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Cross,
    Circle,
    Square,
    Triangle,
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    Ps,
    L1,
    L2,
    L3,
    R1,
    R2,
    R3,
}

impl Button {
    pub const ALL: [Button; 17] = [
        Button::Cross,
        Button::Circle,
        Button::Square,
        Button::Triangle,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Start,
        Button::Select,
        Button::Ps,
        Button::L1,
        Button::L2,
        Button::L3,
        Button::R1,
        Button::R2,
        Button::R3,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Button::Cross => "cross",
            Button::Circle => "circle",
            Button::Square => "square",
            Button::Triangle => "triangle",
            Button::Up => "up",
            Button::Down => "down",
            Button::Left => "left",
            Button::Right => "right",
            Button::Start => "start",
            Button::Select => "select",
            Button::Ps => "psbtn",
            Button::L1 => "l1",
            Button::L2 => "l2",
            Button::L3 => "l3",
            Button::R1 => "r1",
            Button::R2 => "r2",
            Button::R3 => "r3",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        Button::ALL
            .into_iter()
            .find(|button| button.code() == wanted || (wanted == "ps" && *button == Button::Ps))
            .ok_or_else(|| format!("unknown button '{s}'"))
    }
}

/// The fixed set of remote-interface calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Status,
    GameIndex,
    Notify { message: String, icon: u8, sound: u8 },
    SetFanMode(FanMode),
    SetTargetTemp(f64),
    SetFanSpeed(u8),
    StartPlayback,
    QuitPlayback,
    MountDisc,
    MountGame { location: String },
    Shutdown,
    PressButton(Button),
    WaitForMenu,
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Status => "/cpursx.ps3".to_string(),
            Endpoint::GameIndex => "/index.ps3".to_string(),
            Endpoint::Notify {
                message,
                icon,
                sound,
            } => format!(
                "/popup.ps3?{}&icon={icon}&snd={sound}",
                utf8_percent_encode(message, PATH_TEXT)
            ),
            Endpoint::SetFanMode(mode) => {
                format!("/cpursx.ps3?{};/beep.ps3?1", fan_mode_fragment(*mode))
            }
            Endpoint::SetTargetTemp(temp) => format!("/cpursx.ps3?max={temp};/beep.ps3?1"),
            Endpoint::SetFanSpeed(speed) => {
                format!("/cpursx.ps3?man;/cpursx.ps3?fan={speed};/beep.ps3?1")
            }
            Endpoint::StartPlayback => "/play.ps3".to_string(),
            Endpoint::QuitPlayback => "/xmb.ps3$exit;/wait.ps3?xmb".to_string(),
            Endpoint::MountDisc => "/mount.ps3/unmount".to_string(),
            Endpoint::MountGame { location } => {
                format!("/mount.ps3{}", utf8_percent_encode(location, PATH_TEXT))
            }
            Endpoint::Shutdown => "/shutdown.ps3".to_string(),
            Endpoint::PressButton(button) => format!("/pad.ps3?{}", button.code()),
            Endpoint::WaitForMenu => "/wait.ps3?xmb".to_string(),
        }
    }

    pub fn url(&self, address: &str) -> String {
        format!("http://{address}{}", self.path())
    }

    pub fn timeout_class(&self) -> TimeoutClass {
        match self {
            Endpoint::QuitPlayback | Endpoint::MountDisc | Endpoint::MountGame { .. } => {
                TimeoutClass::Transition
            }
            Endpoint::WaitForMenu => TimeoutClass::Menu,
            _ => TimeoutClass::Request,
        }
    }
}

fn fan_mode_fragment(mode: FanMode) -> &'static str {
    match mode {
        FanMode::Syscon => "fan=0",
        FanMode::Manual => "fan=1;/cpursx.ps3?man",
        FanMode::Dynamic => "fan=1;/cpursx.ps3?man;/cpursx.ps3?mode",
        FanMode::Auto => "fan=2",
    }
}
