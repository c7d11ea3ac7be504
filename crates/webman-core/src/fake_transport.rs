use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::DeviceError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Page(String),
    Status(u16),
    Unreachable,
}

/// In-memory console. Unrouted endpoints answer 200 with an empty body; a
/// routed sequence is consumed front to back and its last reply repeats.
#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<String, VecDeque<Reply>>,
    calls: Vec<String>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, endpoint: &Endpoint, reply: Reply) {
        self.route_sequence(endpoint, vec![reply]);
    }

    pub(crate) fn route_sequence(&self, endpoint: &Endpoint, replies: Vec<Reply>) {
        let mut state = self.state.lock().expect("fake state");
        state.routes.insert(endpoint.path(), replies.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().expect("fake state").calls.clone()
    }

    pub(crate) fn call_count(&self, endpoint: &Endpoint) -> usize {
        let path = endpoint.path();
        self.calls().iter().filter(|call| **call == path).count()
    }

    pub(crate) async fn wait_for_call(&self, endpoint: &Endpoint) {
        while self.call_count(endpoint) == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn answer(&self, path: String) -> Result<String, DeviceError> {
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(path.clone());

        let reply = match state.routes.get_mut(&path) {
            Some(replies) if replies.len() > 1 => replies.pop_front(),
            Some(replies) => replies.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Page(body)) => Ok(body),
            Some(Reply::Status(code)) => Err(DeviceError::Protocol(code)),
            Some(Reply::Unreachable) => Err(DeviceError::Unreachable),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl Transport for Arc<FakeTransport> {
    async fn get(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<String, DeviceError> {
        self.answer(endpoint.path())
    }
}

pub(crate) fn status_html(temperature: &str, fan: &str, extra: &str) -> String {
    format!(
        r#"<html><body>
<a class="s" href="/cpursx.ps3?up">{temperature}</a>
<a class="s" href="/cpursx.ps3?mode">{fan}</a>
<a class="s" href="/setup.ps3">Firmware : 4.90 CEX</a>
<a class="s" href="/net.ps3">MAC Address : 00:1f:a7:12:34:56</a>
{extra}
</body></html>"#
    )
}

pub(crate) fn idle_status() -> String {
    status_html("CPU : 45.2°C (AUTO) RSX : 52.0°C", "Fan : 35%", "")
}

pub(crate) fn playing_status() -> String {
    status_html(
        "CPU : 58.0°C (AUTO) RSX : 63.0°C",
        "Fan : 40%",
        r#"<span style="position:relative;top:-20px;"><img src="/dev_hdd0/game/NPUA80001/ICON0.PNG"><h2><a href="/dev_hdd0/game/NPUA80001">NPUA80001</a> <a href="/search?q=Flower">Flower</a></h2></span>
<label title="Play">&#9654;</label> 00:10:00"#,
    )
}

pub(crate) fn mounted_status(location: &str) -> String {
    status_html(
        "CPU : 45.2°C (AUTO) RSX : 52.0°C",
        "Fan : 35%",
        &format!(r#"<a href="/mount.ps3{location}">mounted</a>"#),
    )
}

pub(crate) fn index_html(games: &[(&str, &str)]) -> String {
    let links: String = games
        .iter()
        .map(|(name, location)| format!("<a href=\"/mount.ps3{location}\">{name}</a>\n"))
        .collect();
    format!("<html><body>\n<a href=\"/mount.ps3/unmount\">Unmount</a>\n{links}</body></html>")
}
