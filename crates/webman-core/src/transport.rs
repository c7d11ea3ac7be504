use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::DeviceError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one GET and returns the body of a 200 response.
    async fn get(&self, endpoint: &Endpoint, timeout: Duration) -> Result<String, DeviceError>;
}

pub struct HttpTransport {
    address: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(address: impl Into<String>) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .build()
            .map_err(|err| DeviceError::Transport(format!("failed to build http client: {err}")))?;

        Ok(Self {
            address: address.into(),
            client,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &Endpoint, timeout: Duration) -> Result<String, DeviceError> {
        let url = endpoint.url(&self.address);
        debug!(%url, timeout_ms = timeout.as_millis() as u64, "GET");

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DeviceError::Protocol(status.as_u16()));
        }

        response.text().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> DeviceError {
    if err.is_timeout() || dropped_connection(&err) {
        return DeviceError::Unreachable;
    }
    DeviceError::Transport(err.to_string())
}

// A console that is switching off resets the socket or hangs up mid-response.
fn dropped_connection(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_timeout() {
                return true;
            }
        }
        current = err.source();
    }
    false
}
