//! Scrapers for the status (`cpursx.ps3`) and index pages.
//!
//! The markup is matched by fixed anchors and split on fixed delimiters, so
//! anything unexpected is reported as `DeviceError::Parse` instead of being
//! defaulted. Only the session, mounted image and firmware blocks are
//! allowed to be missing.

use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html, Selector};

use crate::error::DeviceError;
use crate::snapshot::{FanMode, GameLibrary, MediaSession, Telemetry};

const TEMPERATURE_ANCHOR: &str = r#"a.s[href="/cpursx.ps3?up"]"#;
const FAN_ANCHOR: &str = r#"a.s[href="/cpursx.ps3?mode"]"#;
const SESSION_LINKS: &str = r#"span[style="position:relative;top:-20px;"] h2 a"#;
const SESSION_ICON: &str = r#"span[style="position:relative;top:-20px;"] img"#;
const PLAY_LABEL: &str = r#"label[title="Play"]"#;
const MOUNTED_LINK: &str = r#"a[href^="/mount.ps3/dev_"]"#;
const MOUNT_LINKS: &str = r#"a[href^="/mount.ps3/"]"#;
const STATUS_LINKS: &str = "a.s";

const MOUNT_PREFIX: &str = "/mount.ps3";
const UNMOUNT_HREF: &str = "/mount.ps3/unmount";

const FIELD_DELIMITER: &str = ": ";
const DEGREES: &str = "°C";
const PERCENT: &str = "%";

// Scanned in order, first hit wins.
const FAN_MODE_MARKERS: [(&str, FanMode); 4] = [
    ("SYSCON", FanMode::Syscon),
    ("Manual", FanMode::Manual),
    ("MAX", FanMode::Dynamic),
    ("AUTO", FanMode::Auto),
];

#[derive(Debug, Clone, PartialEq)]
pub struct StatusPage {
    pub cpu_temp: f64,
    pub rsx_temp: f64,
    pub fan_speed: u8,
    pub fan_mode: FanMode,
    pub target_temp: Option<f64>,
    pub media_session: Option<MediaSession>,
    pub mounted_gamefile: Option<String>,
    pub firmware_version: Option<String>,
}

impl StatusPage {
    pub fn into_telemetry(self, games: Option<GameLibrary>) -> Telemetry {
        Telemetry {
            cpu_temp: self.cpu_temp,
            rsx_temp: self.rsx_temp,
            fan_speed: self.fan_speed,
            fan_mode: self.fan_mode,
            target_temp: self.target_temp,
            media_session: self.media_session,
            games,
            mounted_gamefile: self.mounted_gamefile,
            firmware_version: self.firmware_version,
        }
    }
}

pub fn parse_status(html: &str) -> Result<StatusPage, DeviceError> {
    let document = Html::parse_document(html);

    let temperature_text = required_text(&document, TEMPERATURE_ANCHOR, "temperature")?;
    let fan_text = required_text(&document, FAN_ANCHOR, "fan speed")?;

    let temperature_fields: Vec<&str> = temperature_text.split(FIELD_DELIMITER).collect();
    if temperature_fields.len() < 3 {
        return Err(DeviceError::parse(format!(
            "temperature text '{temperature_text}' has no CPU/RSX fields"
        )));
    }
    let cpu_temp = degrees(temperature_fields[1])?;
    let rsx_temp = degrees(temperature_fields[temperature_fields.len() - 1])?;

    let fan_speed = percentage(&fan_text)?;
    // Stock pages put the mode marker in the temperature link; some builds
    // only show it next to the fan speed, so that link is the fallback.
    let fan_mode = classify_fan_mode(&temperature_text)
        .or_else(|_| classify_fan_mode(&fan_text))
        .map_err(|_| {
            DeviceError::parse(format!(
                "no fan mode marker in '{temperature_text}' or '{fan_text}'"
            ))
        })?;

    let target_temp = if fan_mode == FanMode::Dynamic {
        if temperature_fields.len() < 4 {
            return Err(DeviceError::parse(format!(
                "temperature text '{temperature_text}' has no target field"
            )));
        }
        Some(degrees(temperature_fields[2])?)
    } else {
        None
    };

    Ok(StatusPage {
        cpu_temp,
        rsx_temp,
        fan_speed,
        fan_mode,
        target_temp,
        media_session: media_session(&document)?,
        mounted_gamefile: mounted_gamefile(&document)?,
        firmware_version: firmware_version(&document)?,
    })
}

/// Returns `None` when the page lists no mountable games.
pub fn parse_index(html: &str) -> Result<Option<GameLibrary>, DeviceError> {
    let document = Html::parse_document(html);
    let links = selector(MOUNT_LINKS)?;

    let mut games = GameLibrary::default();
    for link in document.select(&links) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href == UNMOUNT_HREF {
            continue;
        }
        let name = element_text(&link);
        if name.is_empty() {
            continue;
        }
        games.insert(name, location_from_href(href));
    }

    Ok((!games.is_empty()).then_some(games))
}

pub fn parse_mac_address(html: &str) -> Result<String, DeviceError> {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .find_map(find_mac)
        .ok_or_else(|| DeviceError::parse("no MAC address on status page"))
}

pub fn classify_fan_mode(text: &str) -> Result<FanMode, DeviceError> {
    FAN_MODE_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(marker))
        .map(|(_, mode)| *mode)
        .ok_or_else(|| DeviceError::parse(format!("no fan mode marker in '{text}'")))
}

fn selector(css: &'static str) -> Result<Selector, DeviceError> {
    Selector::parse(css).map_err(|err| DeviceError::parse(format!("bad selector {css}: {err}")))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn required_text(document: &Html, css: &'static str, what: &str) -> Result<String, DeviceError> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .next()
        .map(|element| element_text(&element))
        .ok_or_else(|| DeviceError::parse(format!("{what} element missing")))
}

fn degrees(field: &str) -> Result<f64, DeviceError> {
    let (value, _) = field
        .split_once(DEGREES)
        .ok_or_else(|| DeviceError::parse(format!("'{field}' has no {DEGREES} unit")))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|err| DeviceError::parse(format!("bad temperature '{value}': {err}")))
}

fn percentage(fan_text: &str) -> Result<u8, DeviceError> {
    let field = fan_text
        .split(FIELD_DELIMITER)
        .nth(1)
        .ok_or_else(|| DeviceError::parse(format!("fan text '{fan_text}' has no value")))?;
    let (value, _) = field
        .split_once(PERCENT)
        .ok_or_else(|| DeviceError::parse(format!("'{field}' has no {PERCENT} unit")))?;
    value
        .trim()
        .parse::<u8>()
        .map_err(|err| DeviceError::parse(format!("bad fan speed '{value}': {err}")))
}

fn media_session(document: &Html) -> Result<Option<MediaSession>, DeviceError> {
    let play_label = selector(PLAY_LABEL)?;
    let Some(label) = document.select(&play_label).next() else {
        return Ok(None);
    };

    let elapsed_text = label
        .next_sibling()
        .and_then(|node| node.value().as_text().map(|text| text.trim().to_string()))
        .ok_or_else(|| DeviceError::parse("play label has no elapsed time"))?;
    let playback_elapsed = parse_elapsed(&elapsed_text)?;

    let session_links = selector(SESSION_LINKS)?;
    let links: Vec<String> = document
        .select(&session_links)
        .map(|link| element_text(&link))
        .collect();

    if links.is_empty() {
        return Ok(Some(MediaSession::Media { playback_elapsed }));
    }
    if links.len() < 2 {
        return Err(DeviceError::parse("game session is missing its title"));
    }

    let session_icon = selector(SESSION_ICON)?;
    let image_path = document
        .select(&session_icon)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    Ok(Some(MediaSession::Game {
        game_id: links[0].clone(),
        game_title: links[1].clone(),
        playback_elapsed,
        image_path,
    }))
}

fn parse_elapsed(text: &str) -> Result<u64, DeviceError> {
    let mut seconds = 0_u64;
    let mut parts = 0;
    for part in text.split(':') {
        let value = part
            .trim()
            .parse::<u64>()
            .map_err(|err| DeviceError::parse(format!("bad elapsed time '{text}': {err}")))?;
        seconds = seconds * 60 + value;
        parts += 1;
    }
    if !(2..=3).contains(&parts) {
        return Err(DeviceError::parse(format!("bad elapsed time '{text}'")));
    }
    Ok(seconds)
}

fn mounted_gamefile(document: &Html) -> Result<Option<String>, DeviceError> {
    let mounted = selector(MOUNTED_LINK)?;
    Ok(document
        .select(&mounted)
        .filter_map(|link| link.value().attr("href"))
        .next()
        .map(location_from_href))
}

fn firmware_version(document: &Html) -> Result<Option<String>, DeviceError> {
    let links = selector(STATUS_LINKS)?;
    Ok(document
        .select(&links)
        .map(|link| element_text(&link))
        .find(|text| text.contains("Firmware"))
        .and_then(|text| {
            text.split_once(FIELD_DELIMITER)
                .map(|(_, version)| version.trim().to_string())
        })
        .filter(|version| !version.is_empty()))
}

fn location_from_href(href: &str) -> String {
    let path = href.strip_prefix(MOUNT_PREFIX).unwrap_or(href);
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

fn find_mac(text: &str) -> Option<String> {
    const LEN: usize = 17;
    let bytes = text.as_bytes();
    if bytes.len() < LEN {
        return None;
    }

    (0..=bytes.len() - LEN).find_map(|start| {
        let window = &bytes[start..start + LEN];
        let shaped = window.iter().enumerate().all(|(idx, byte)| {
            if idx % 3 == 2 {
                *byte == b':' || *byte == b'-'
            } else {
                byte.is_ascii_hexdigit()
            }
        });
        let bounded = start
            .checked_sub(1)
            .map_or(true, |prev| !bytes[prev].is_ascii_hexdigit())
            && bytes
                .get(start + LEN)
                .map_or(true, |next| !next.is_ascii_hexdigit());

        (shaped && bounded).then(|| {
            String::from_utf8_lossy(window)
                .replace('-', ":")
                .to_ascii_uppercase()
        })
    })
}
