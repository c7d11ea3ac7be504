use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webman_core::{
    spawn_poller, Button, Command as DeviceCommand, Device, DeviceConfig, FanMode, HttpTransport,
    Snapshot,
};

mod report;
mod viewer;
#[cfg(test)]
mod report_tests;

#[derive(Debug, Parser)]
#[command(name = "webmanctl")]
#[command(about = "webMAN remote-management client")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value = "192.168.1.20")]
    address: String,

    #[arg(long, default_value_t = 30_000)]
    interval_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    request_timeout_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    transition_timeout_ms: u64,

    #[arg(long, default_value_t = 60_000)]
    menu_timeout_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    convergence_timeout_ms: u64,

    /// Poll cadence while a slow command waits for confirmation.
    #[arg(long, default_value_t = 2_000)]
    confirm_interval_ms: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    Status {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Mac,
    Games,
    Run {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View {
        #[arg(long, default_value_t = 600.0)]
        window_sec: f64,
    },
    Notify {
        message: String,
    },
    FanMode {
        mode: FanMode,
    },
    TargetTemp {
        celsius: f64,
    },
    FanSpeed {
        percent: u8,
    },
    Button {
        button: Button,
    },
    Shutdown,
    Play,
    Stop,
    Mount {
        game: String,
    },
    Eject,
    PowerOn {
        #[arg(long, default_value_t = 120)]
        wait_sec: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(err) = &result {
        if let Some(hint) = report::hint_for(err) {
            eprintln!("hint: {hint}");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = DeviceConfig {
        address: cli.address.clone(),
        request_timeout: Duration::from_millis(cli.request_timeout_ms),
        transition_timeout: Duration::from_millis(cli.transition_timeout_ms),
        menu_timeout: Duration::from_millis(cli.menu_timeout_ms),
        convergence_timeout: Duration::from_millis(cli.convergence_timeout_ms),
        poll_interval: Duration::from_millis(cli.interval_ms),
    };
    let confirm_every = Duration::from_millis(cli.confirm_interval_ms);
    let device = Arc::new(Device::connect(config).context("building HTTP client")?);

    match cli.command {
        Command::Status { format } => {
            let snapshot = device.update().await?;
            print_snapshot(&snapshot, device.address(), format)?;
        }
        Command::Mac => {
            println!("{}", device.get_mac_address().await?);
        }
        Command::Games => {
            let snapshot = device.update().await?;
            match snapshot.games() {
                Some(games) => {
                    for entry in games.entries() {
                        println!("{:<40} {}", entry.name, entry.location);
                    }
                }
                None if snapshot.is_on() => println!("no games installed"),
                None => println!("device is {:?}", snapshot.power_state()),
            }
        }
        Command::Run { format } | Command::Watch { format } => {
            stream_loop(&device, format).await?;
        }
        Command::View { window_sec } => {
            viewer::run_viewer(&*device, window_sec).await?;
        }
        Command::PowerOn { wait_sec } => {
            device
                .wait_for_menu_reachable(Duration::from_secs(wait_sec))
                .await?;
            let snapshot = device.update().await?;
            print_snapshot(&snapshot, device.address(), OutputFormat::Human)?;
        }
        Command::Notify { message } => {
            send(&device, DeviceCommand::notify(message), confirm_every).await?
        }
        Command::FanMode { mode } => {
            send(&device, DeviceCommand::SetFanMode(mode), confirm_every).await?
        }
        Command::TargetTemp { celsius } => {
            send(&device, DeviceCommand::SetTargetTemp(celsius), confirm_every).await?
        }
        Command::FanSpeed { percent } => {
            send(&device, DeviceCommand::SetFanSpeed(percent), confirm_every).await?
        }
        Command::Button { button } => {
            send(&device, DeviceCommand::PressButton(button), confirm_every).await?
        }
        Command::Shutdown => send(&device, DeviceCommand::Shutdown, confirm_every).await?,
        Command::Play => send(&device, DeviceCommand::StartPlayback, confirm_every).await?,
        Command::Stop => send(&device, DeviceCommand::QuitPlayback, confirm_every).await?,
        Command::Mount { game } => {
            send(&device, DeviceCommand::select_source(&game), confirm_every).await?
        }
        Command::Eject => send(&device, DeviceCommand::MountDisc, confirm_every).await?,
    }

    Ok(())
}

/// Sends one command. Slow commands are confirmed by a short-cadence poller
/// that runs only for the duration of the wait.
async fn send(
    device: &Arc<Device<HttpTransport>>,
    command: DeviceCommand,
    confirm_every: Duration,
) -> Result<()> {
    let name = command.name();

    if !command.is_slow() {
        let snapshot = device
            .write_and_refresh(command)
            .await
            .with_context(|| format!("{name} failed"))?;
        info!(command = name, power = ?snapshot.power_state(), "done");
        return Ok(());
    }

    // Slow commands may need the game library, so start from fresh data.
    device.update().await?;
    let poller = spawn_poller(Arc::clone(device), confirm_every);
    let outcome = device.write(command).await;
    poller.abort();
    outcome.with_context(|| format!("{name} failed"))?;

    print_snapshot(&device.snapshot(), device.address(), OutputFormat::Human)
}

async fn stream_loop(device: &Arc<Device<HttpTransport>>, format: OutputFormat) -> Result<()> {
    let every = device.config().poll_interval;
    let mut ticker = interval_at(Instant::now() + Duration::from_millis(50), every);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = match device.poll().await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(error = %err, hint = err.guidance(), "poll failed");
                        device.snapshot()
                    }
                };
                print_snapshot(&snapshot, device.address(), format)?;
                info!(sequence = snapshot.sequence(), power = ?snapshot.power_state(), "tick");
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, address: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        OutputFormat::Human => {
            print!("{}", report::human_report(snapshot, address));
        }
    }

    Ok(())
}
