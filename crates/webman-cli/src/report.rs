use std::fmt::Write as _;

use webman_core::{DeviceError, MediaSession, Snapshot};

pub fn human_report(snapshot: &Snapshot, address: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== webMAN Snapshot ===");
    let _ = writeln!(out, "Time:       {}", snapshot.ts().to_rfc3339());
    let _ = writeln!(out, "Device:     {address}");
    let _ = writeln!(
        out,
        "State:      power={:?} sequence={}",
        snapshot.power_state(), snapshot.sequence()
    );

    let Some(telemetry) = snapshot.telemetry() else {
        return out;
    };

    if let Some(firmware) = &telemetry.firmware_version {
        let _ = writeln!(out, "Firmware:   {firmware}");
    }
    let _ = writeln!(
        out,
        "Temps:      cpu={:.1}C rsx={:.1}C",
        telemetry.cpu_temp, telemetry.rsx_temp
    );
    let target = telemetry
        .target_temp
        .map(|t| format!(" target={t:.0}C"))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "Fan:        {}% mode={}{target}",
        telemetry.fan_speed, telemetry.fan_mode
    );

    match &telemetry.media_session {
        Some(MediaSession::Game {
            game_id,
            game_title,
            playback_elapsed,
            ..
        }) => {
            let _ = writeln!(
                out,
                "Playing:    {game_title} [{game_id}] {}",
                format_elapsed(*playback_elapsed)
            );
        }
        Some(MediaSession::Media { playback_elapsed }) => {
            let _ = writeln!(out, "Playing:    media {}", format_elapsed(*playback_elapsed));
        }
        None => {}
    }

    if let Some(mounted) = &telemetry.mounted_gamefile {
        let _ = writeln!(out, "Mounted:    {mounted}");
    }
    if let Some(games) = &telemetry.games {
        let _ = writeln!(out, "Games:      {} installed", games.len());
    }

    out
}

pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Operator hint for failures that came from the device layer.
pub fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DeviceError>())
        .map(DeviceError::guidance)
}
