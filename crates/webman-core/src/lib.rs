pub mod command;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod parser;
pub mod poller;
pub mod snapshot;
pub mod transport;

#[cfg(test)]
mod fake_transport;
#[cfg(test)]
mod parser_tests;

pub use command::{Command, Convergence, XMB_SOURCE};
pub use config::DeviceConfig;
pub use device::Device;
pub use endpoint::{Button, Endpoint};
pub use error::DeviceError;
pub use poller::spawn_poller;
pub use snapshot::{FanMode, GameLibrary, MediaSession, PowerState, Snapshot, Telemetry};
pub use transport::{HttpTransport, Transport};
