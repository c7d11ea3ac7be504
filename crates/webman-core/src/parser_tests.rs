use crate::error::DeviceError;
use crate::parser::{classify_fan_mode, parse_index, parse_mac_address, parse_status};
use crate::snapshot::{FanMode, MediaSession};

fn status_page(temperature: &str, fan: &str, extra: &str) -> String {
    format!(
        r#"<html><head><title>wMM</title></head><body>
<a class="s" href="/cpursx.ps3?up">{temperature}</a>
<a class="s" href="/cpursx.ps3?mode">{fan}</a>
<a class="s" href="/setup.ps3">Firmware : 4.90 CEX</a>
<a class="s" href="/net.ps3">MAC Address : 00:1f:a7:12:34:56</a>
{extra}
</body></html>"#
    )
}

const GAME_SESSION: &str = r#"<span style="position:relative;top:-20px;"><img src="/dev_hdd0/game/BCUS98114/ICON0.PNG"><h2><a href="/dev_hdd0/game/BCUS98114">BCUS98114</a> <a href="/search?q=Flower">Flower</a></h2></span>
<label title="Play">&#9654;</label> 01:02:03"#;

const MEDIA_SESSION: &str = r#"<label title="Play">&#9654;</label> 00:45:10"#;

#[test]
fn auto_mode_page_yields_temps_and_no_target() {
    // Arrange
    let html = status_page("CPU : 45.2°C RSX : 52.0°C", "Fan : 35% (AUTO)", "");

    // Act
    let page = parse_status(&html).expect("parse status");

    // Assert
    assert_eq!(page.cpu_temp, 45.2);
    assert_eq!(page.rsx_temp, 52.0);
    assert_eq!(page.fan_speed, 35);
    assert_eq!(page.fan_mode, FanMode::Auto);
    assert_eq!(page.target_temp, None);
    assert_eq!(page.media_session, None);
    assert_eq!(page.mounted_gamefile, None);
    assert_eq!(page.firmware_version.as_deref(), Some("4.90 CEX"));
}

#[test]
fn fan_mode_marker_in_temperature_link() {
    // Arrange
    let html = status_page("CPU : 47.0°C (AUTO) RSX : 51.5°C", "Fan : 33%", "");

    // Act
    let page = parse_status(&html).expect("status parses");

    // Assert
    assert_eq!(page.fan_mode, FanMode::Auto);
    assert_eq!(page.cpu_temp, 47.0);
    assert_eq!(page.rsx_temp, 51.5);
    assert_eq!(page.fan_speed, 33);
}

#[test]
fn temperature_link_marker_wins_over_fan_link() {
    let html = status_page("CPU : 47.0°C (AUTO) RSX : 51.5°C", "Fan : 33% Manual", "");

    let page = parse_status(&html).expect("status parses");

    assert_eq!(page.fan_mode, FanMode::Auto);
}

#[test]
fn dynamic_mode_reads_target_between_cpu_and_rsx() {
    let html = status_page("CPU : 61.0°C (MAX: 70°C) RSX : 58.5°C", "Fan : 42%", "");

    let page = parse_status(&html).expect("parse status");

    assert_eq!(page.fan_mode, FanMode::Dynamic);
    assert_eq!(page.cpu_temp, 61.0);
    assert_eq!(page.rsx_temp, 58.5);
    assert_eq!(page.target_temp, Some(70.0));
}

#[test]
fn game_session_and_mounted_image_are_scraped() {
    // Arrange
    let mounted = r#"<a href="/mount.ps3/dev_hdd0/PS3ISO/Demon%27s%20Souls.iso">Demon's Souls</a>"#;
    let html = status_page(
        "CPU : 50.0°C RSX : 55.0°C",
        "Fan : 30% SYSCON",
        &format!("{GAME_SESSION}\n{mounted}"),
    );

    // Act
    let page = parse_status(&html).expect("parse status");

    // Assert
    assert_eq!(page.fan_mode, FanMode::Syscon);
    assert_eq!(
        page.media_session,
        Some(MediaSession::Game {
            game_id: "BCUS98114".to_string(),
            game_title: "Flower".to_string(),
            playback_elapsed: 3723,
            image_path: Some("/dev_hdd0/game/BCUS98114/ICON0.PNG".to_string()),
        })
    );
    assert_eq!(
        page.mounted_gamefile.as_deref(),
        Some("/dev_hdd0/PS3ISO/Demon's Souls.iso")
    );
}

#[test]
fn play_label_without_game_links_is_a_media_session() {
    let html = status_page("CPU : 50.0°C RSX : 55.0°C", "Fan : 30% Manual", MEDIA_SESSION);

    let page = parse_status(&html).expect("parse status");

    assert_eq!(page.fan_mode, FanMode::Manual);
    assert_eq!(
        page.media_session,
        Some(MediaSession::Media {
            playback_elapsed: 2710
        })
    );
}

#[test]
fn missing_fan_mode_marker_is_a_parse_error() {
    let html = status_page("CPU : 45.2°C RSX : 52.0°C", "Fan : 35%", "");

    let err = parse_status(&html).expect_err("no fan mode");

    assert!(matches!(err, DeviceError::Parse(_)), "got {err:?}");
}

#[test]
fn missing_anchor_or_delimiter_is_a_parse_error() {
    let no_fan = r#"<html><body><a class="s" href="/cpursx.ps3?up">CPU : 45.2°C RSX : 52.0°C AUTO</a></body></html>"#;
    let no_unit = status_page("CPU : 45.2 RSX : 52.0", "Fan : 35% AUTO", "");
    let no_percent = status_page("CPU : 45.2°C RSX : 52.0°C", "Fan : 35 AUTO", "");

    assert!(matches!(parse_status(no_fan), Err(DeviceError::Parse(_))));
    assert!(matches!(parse_status(&no_unit), Err(DeviceError::Parse(_))));
    assert!(matches!(parse_status(&no_percent), Err(DeviceError::Parse(_))));
}

#[test]
fn fan_mode_markers_resolve_in_table_order() {
    assert_eq!(classify_fan_mode("SYSCON MAX").ok(), Some(FanMode::Syscon));
    assert_eq!(classify_fan_mode("MAX: 70°C AUTO").ok(), Some(FanMode::Dynamic));
    assert!(classify_fan_mode("nothing here").is_err());
}

#[test]
fn index_lists_games_in_page_order_without_unmount() {
    // Arrange
    let html = r#"<html><body>
<a href="/mount.ps3/unmount">Unmount</a>
<a href="/mount.ps3/dev_hdd0/PS3ISO/Demon%27s%20Souls.iso">Demon's Souls</a>
<a href="/mount.ps3/dev_hdd0/GAMES/FLOWER">Flower</a>
<a href="/mount.ps3/dev_usb000/PS3ISO/flower-copy.iso">Flower</a>
<a href="/setup.ps3">Setup</a>
</body></html>"#;

    // Act
    let games = parse_index(html).expect("parse index").expect("games present");

    // Assert
    assert_eq!(games.names().collect::<Vec<_>>(), ["Demon's Souls", "Flower"]);
    assert_eq!(
        games.location_of("Demon's Souls"),
        Some("/dev_hdd0/PS3ISO/Demon's Souls.iso")
    );
    assert_eq!(games.location_of("Flower"), Some("/dev_hdd0/GAMES/FLOWER"));
}

#[test]
fn index_without_games_is_none() {
    let html = r#"<html><body><a href="/mount.ps3/unmount">Unmount</a></body></html>"#;

    assert_eq!(parse_index(html).expect("parse index"), None);
}

#[test]
fn mac_address_is_found_in_page_text() {
    let html = status_page("CPU : 45.2°C RSX : 52.0°C", "Fan : 35% AUTO", "");

    assert_eq!(parse_mac_address(&html).expect("mac"), "00:1F:A7:12:34:56");
    assert!(matches!(
        parse_mac_address("<html><body>no identity</body></html>"),
        Err(DeviceError::Parse(_))
    ));
}
