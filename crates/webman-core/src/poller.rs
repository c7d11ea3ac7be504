use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::device::Device;
use crate::transport::Transport;

/// Drives [`Device::poll`] on a fixed cadence until the handle is aborted.
/// Failures are logged and left for the next tick.
pub fn spawn_poller<T>(device: Arc<Device<T>>, every: Duration) -> JoinHandle<()>
where
    T: Transport + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match device.poll().await {
                Ok(snapshot) => debug!(
                    sequence = snapshot.sequence,
                    power = ?snapshot.power_state,
                    "poll complete"
                ),
                Err(err) => warn!(error = %err, "poll failed"),
            }
        }
    })
}
