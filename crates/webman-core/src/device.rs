use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch, OnceCell, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::command::{Command, Convergence, XMB_SOURCE};
use crate::config::DeviceConfig;
use crate::endpoint::{Endpoint, TimeoutClass};
use crate::error::DeviceError;
use crate::parser;
use crate::snapshot::{FanMode, MediaSession, PowerState, Snapshot, Telemetry};
use crate::transport::{HttpTransport, Transport};

const MENU_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Stateful client for one console.
///
/// Reads go through [`Device::update`], which swaps in a fresh [`Snapshot`]
/// and wakes everything subscribed to it. Writes go through
/// [`Device::write`]; only one write may be in flight, and slow commands keep
/// the gate until a later snapshot confirms them. Every published snapshot
/// is checked against the pending confirmation, so a match is never lost to
/// a newer update.
pub struct Device<T: Transport> {
    transport: T,
    config: DeviceConfig,
    gate: Semaphore,
    snapshots: watch::Sender<Arc<Snapshot>>,
    sequence: AtomicU64,
    skip_next_poll: AtomicBool,
    mac_address: OnceCell<String>,
    pending: Mutex<Option<PendingConfirmation>>,
}

struct PendingConfirmation {
    convergence: Convergence,
    confirmed: oneshot::Sender<u64>,
}

impl Device<HttpTransport> {
    pub fn connect(config: DeviceConfig) -> Result<Self, DeviceError> {
        let transport = HttpTransport::new(config.address.clone())?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Device<T> {
    pub fn new(transport: T, config: DeviceConfig) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(Snapshot::initial()));
        Self {
            transport,
            config,
            gate: Semaphore::new(1),
            snapshots,
            sequence: AtomicU64::new(0),
            skip_next_poll: AtomicBool::new(false),
            mac_address: OnceCell::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver that fires once per completed update.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    pub fn fan_modes(&self) -> [FanMode; 4] {
        FanMode::ALL
    }

    pub fn media_image_url(&self) -> Option<String> {
        match self.snapshot().media_session() {
            Some(MediaSession::Game {
                image_path: Some(path),
                ..
            }) => Some(format!("http://{}{}", self.config.address, path)),
            _ => None,
        }
    }

    /// Installed games followed by the disc source.
    pub fn source_list(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut sources: Vec<String> = snapshot
            .games()
            .map(|games| games.names().map(str::to_string).collect())
            .unwrap_or_default();
        sources.push(XMB_SOURCE.to_string());
        sources
    }

    pub fn current_source(&self) -> Option<String> {
        let snapshot = self.snapshot();
        if !snapshot.is_on() {
            return None;
        }
        let Some(mounted) = snapshot.mounted_gamefile() else {
            return Some(XMB_SOURCE.to_string());
        };
        let name = snapshot
            .games()
            .and_then(|games| games.name_of(mounted))
            .unwrap_or(mounted);
        Some(name.to_string())
    }

    pub async fn update(&self) -> Result<Arc<Snapshot>, DeviceError> {
        match self.fetch_telemetry().await {
            Ok(telemetry) => Ok(self.publish(|sequence| Snapshot::on(sequence, telemetry))),
            Err(DeviceError::Unreachable) => {
                Ok(self.publish(|sequence| Snapshot::cleared(sequence, PowerState::Off)))
            }
            Err(err) => {
                warn!(error = %err, "update failed, clearing telemetry");
                self.publish(|sequence| Snapshot::cleared(sequence, PowerState::Unknown));
                Err(err)
            }
        }
    }

    /// Scheduled refresh. Skips one cycle after [`Device::write_and_refresh`]
    /// already fetched fresh data.
    pub async fn poll(&self) -> Result<Arc<Snapshot>, DeviceError> {
        if self.skip_next_poll.swap(false, Ordering::AcqRel) {
            debug!("snapshot refreshed by last write, skipping poll");
            return Ok(self.snapshot());
        }
        self.update().await
    }

    pub async fn write(&self, command: Command) -> Result<(), DeviceError> {
        let plan = command.plan(&self.snapshot())?;

        let _permit = self.gate.try_acquire().map_err(|_| {
            warn!(command = command.name(), "write rejected, another command is in flight");
            DeviceError::Busy
        })?;

        // Registered before sending so an update racing the request is seen.
        let confirmed = plan
            .convergence
            .map(|convergence| self.expect_confirmation(convergence));

        debug!(command = command.name(), "sending command");
        if let Err(err) = self
            .transport
            .get(&plan.endpoint, self.timeout_for(&plan.endpoint))
            .await
        {
            self.pending_confirmation().take();
            return Err(err);
        }

        match confirmed {
            None => {
                info!(command = command.name(), "command sent");
                Ok(())
            }
            Some(confirmed) => self.await_convergence(confirmed, command.name()).await,
        }
    }

    pub async fn write_and_refresh(&self, command: Command) -> Result<Arc<Snapshot>, DeviceError> {
        self.write(command).await?;
        let snapshot = self.update().await?;
        self.skip_next_poll.store(true, Ordering::Release);
        Ok(snapshot)
    }

    pub async fn get_mac_address(&self) -> Result<String, DeviceError> {
        self.mac_address
            .get_or_try_init(|| async {
                let html = self.fetch_page(&Endpoint::Status).await?;
                let mac = parser::parse_mac_address(&html)?;
                info!(%mac, address = %self.config.address, "device identity resolved");
                Ok(mac)
            })
            .await
            .cloned()
    }

    /// Keeps calling the menu wait endpoint until one call succeeds or
    /// `overall` runs out. Used after an external power-on.
    pub async fn wait_for_menu_reachable(&self, overall: Duration) -> Result<(), DeviceError> {
        let attempts = async {
            let mut attempt = 0_u32;
            loop {
                attempt += 1;
                match self.fetch_page(&Endpoint::WaitForMenu).await {
                    Ok(_) => return attempt,
                    Err(err) => {
                        debug!(attempt, error = %err, "menu not reachable yet");
                        sleep(MENU_RETRY_PAUSE).await;
                    }
                }
            }
        };

        match timeout(overall, attempts).await {
            Ok(attempt) => {
                info!(attempt, "device menu reachable");
                Ok(())
            }
            Err(_) => {
                warn!(waited_s = overall.as_secs(), "device menu never became reachable");
                Err(DeviceError::Unreachable)
            }
        }
    }

    async fn fetch_page(&self, endpoint: &Endpoint) -> Result<String, DeviceError> {
        self.transport.get(endpoint, self.timeout_for(endpoint)).await
    }

    async fn fetch_telemetry(&self) -> Result<Telemetry, DeviceError> {
        let status_html = self.fetch_page(&Endpoint::Status).await?;
        let status = parser::parse_status(&status_html)?;
        let index_html = self.fetch_page(&Endpoint::GameIndex).await?;
        let games = parser::parse_index(&index_html)?;
        Ok(status.into_telemetry(games))
    }

    fn timeout_for(&self, endpoint: &Endpoint) -> Duration {
        match endpoint.timeout_class() {
            TimeoutClass::Request => self.config.request_timeout,
            TimeoutClass::Transition => self.config.transition_timeout,
            TimeoutClass::Menu => self.config.menu_timeout,
        }
    }

    fn publish(&self, build: impl FnOnce(u64) -> Snapshot) -> Arc<Snapshot> {
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(build(sequence));
        let previous = self.snapshots.send_replace(Arc::clone(&snapshot));

        if previous.power_state != snapshot.power_state {
            info!(
                from = ?previous.power_state,
                to = ?snapshot.power_state,
                address = %self.config.address,
                "power state changed"
            );
        }
        debug!(sequence, power = ?snapshot.power_state, "snapshot published");

        let mut pending = self.pending_confirmation();
        match pending.as_ref().map(|waiting| waiting.convergence.is_met(&snapshot)) {
            Some(true) => {
                if let Some(waiting) = pending.take() {
                    let _ = waiting.confirmed.send(sequence);
                }
            }
            Some(false) => debug!(sequence, "snapshot does not confirm pending command"),
            None => {}
        }
        drop(pending);

        snapshot
    }

    fn pending_confirmation(&self) -> MutexGuard<'_, Option<PendingConfirmation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expect_confirmation(&self, convergence: Convergence) -> oneshot::Receiver<u64> {
        let (confirmed, receiver) = oneshot::channel();
        *self.pending_confirmation() = Some(PendingConfirmation {
            convergence,
            confirmed,
        });
        receiver
    }

    async fn await_convergence(
        &self,
        confirmed: oneshot::Receiver<u64>,
        command: &'static str,
    ) -> Result<(), DeviceError> {
        let waited = self.config.convergence_timeout;
        match timeout(waited, confirmed).await {
            Ok(Ok(sequence)) => {
                info!(command, sequence, "command confirmed");
                Ok(())
            }
            _ => {
                self.pending_confirmation().take();
                warn!(command, waited_s = waited.as_secs(), "command not confirmed");
                Err(DeviceError::ConvergenceTimeout { command, waited })
            }
        }
    }
}
