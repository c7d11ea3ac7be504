use std::time::Duration;

use anyhow::Context;
use chrono::{TimeZone, Utc};
use webman_core::{
    DeviceError, FanMode, GameLibrary, MediaSession, PowerState, Snapshot, Telemetry,
};

use crate::report::{format_elapsed, hint_for, human_report};

fn snapshot_with(telemetry: Option<Telemetry>) -> Snapshot {
    let power_state = if telemetry.is_some() {
        PowerState::On
    } else {
        PowerState::Off
    };
    let ts = Utc
        .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid date");
    Snapshot::from_parts(7, ts, power_state, telemetry).expect("consistent snapshot")
}

#[test]
fn report_shows_live_telemetry() {
    // Arrange
    let mut games = GameLibrary::default();
    games.insert("Flower", "/dev_hdd0/GAMES/FLOWER");
    let snapshot = snapshot_with(Some(Telemetry {
        cpu_temp: 61.0,
        rsx_temp: 58.5,
        fan_speed: 42,
        fan_mode: FanMode::Dynamic,
        target_temp: Some(70.0),
        media_session: Some(MediaSession::Game {
            game_id: "NPUA80001".to_string(),
            game_title: "Flower".to_string(),
            playback_elapsed: 3723,
            image_path: None,
        }),
        games: Some(games),
        mounted_gamefile: Some("/dev_hdd0/GAMES/FLOWER".to_string()),
        firmware_version: Some("4.90 CEX".to_string()),
    }));

    // Act
    let report = human_report(&snapshot, "192.168.1.20");

    // Assert
    assert!(report.contains("power=On sequence=7"));
    assert!(report.contains("cpu=61.0C rsx=58.5C"));
    assert!(report.contains("42% mode=Dynamic target=70C"));
    assert!(report.contains("Flower [NPUA80001] 01:02:03"));
    assert!(report.contains("Mounted:    /dev_hdd0/GAMES/FLOWER"));
    assert!(report.contains("1 installed"));
}

#[test]
fn report_for_powered_off_device_stops_after_state() {
    let report = human_report(&snapshot_with(None), "192.168.1.20");

    assert!(report.contains("power=Off"));
    assert!(!report.contains("Temps:"));
    assert!(!report.contains("Fan:"));
}

#[test]
fn elapsed_is_zero_padded() {
    assert_eq!(format_elapsed(0), "00:00:00");
    assert_eq!(format_elapsed(2710), "00:45:10");
    assert_eq!(format_elapsed(36_000), "10:00:00");
}

#[test]
fn hints_are_found_through_context() {
    // Arrange
    let busy: anyhow::Error = Err::<(), _>(DeviceError::Busy)
        .context("mount game")
        .expect_err("busy");
    let timeout = anyhow::Error::new(DeviceError::ConvergenceTimeout {
        command: "quit playback",
        waited: Duration::from_secs(30),
    });
    let other = anyhow::anyhow!("terminal went away");

    // Act
    let hints = [hint_for(&busy), hint_for(&timeout), hint_for(&other)];

    // Assert
    assert_eq!(hints[0], Some(DeviceError::Busy.guidance()));
    assert!(hints[1].is_some());
    assert_ne!(hints[0], hints[1]);
    assert_eq!(hints[2], None);
}
