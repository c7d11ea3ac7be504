use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub address: String,
    pub request_timeout: Duration,
    pub transition_timeout: Duration,
    pub menu_timeout: Duration,
    pub convergence_timeout: Duration,
    pub poll_interval: Duration,
}

impl DeviceConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            request_timeout: Duration::from_secs(5),
            transition_timeout: Duration::from_secs(30),
            menu_timeout: Duration::from_secs(60),
            convergence_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
        }
    }
}
