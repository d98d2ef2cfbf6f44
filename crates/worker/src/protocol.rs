//! JSON-lines event transport between a page-side driver and the host.
//!
//! Each input line is one event:
//!
//! ```text
//! {"event":"fetch","url":"https://user.github.io/index.html"}
//! {"event":"fetch","url":"...","method":"HEAD"}
//! {"event":"message","data":{"type":"SKIP_WAITING"}}
//! ```
//!
//! Each event produces exactly one output line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use swcache_core::{Request, Response, ResponseType};

use crate::error::HostError;
use crate::host::ServiceHost;
use crate::lifecycle::WorkerState;

fn default_method() -> String {
    "GET".to_string()
}

/// One inbound event.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Fetch {
        url: String,
        #[serde(default = "default_method")]
        method: String,
    },
    Message {
        #[serde(default)]
        data: Value,
    },
}

/// Serializable view of a response; the body is decoded as text.
#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        let url = response.url.clone();
        let status = response.status;
        let status_text = response.status_text.clone();
        let response_type = response.response_type;
        let headers = response.headers.clone();
        Self { url, status, status_text, response_type, headers, body: response.text() }
    }
}

/// One outbound line.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// `response` is null when network-first found nothing anywhere.
    Fetched { response: Option<ResponseView> },
    State { state: WorkerState },
    Error { error: String },
}

pub fn parse(line: &str) -> Result<Event, HostError> {
    serde_json::from_str(line).map_err(|e| HostError::InvalidEvent(e.to_string()))
}

/// Handle one input line against the host.
pub async fn handle_line(host: &ServiceHost, line: &str) -> Reply {
    let event = match parse(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting event");
            return Reply::Error { error: e.to_string() };
        }
    };

    match event {
        Event::Fetch { url, method } => {
            let response = host.fetch(Request::new(&method, url)).await;
            Reply::Fetched { response: response.map(ResponseView::from) }
        }
        Event::Message { data } => match host.message(&data).await {
            Ok(state) => Reply::State { state },
            Err(e) => Reply::Error { error: e.to_string() },
        },
    }
}

/// Answer every line of `input` on `output` until EOF.
///
/// Detached cache writes are settled before returning, also when reading
/// or writing fails part way.
pub async fn serve<R, W>(host: &ServiceHost, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let served = async {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = handle_line(host, &line).await;
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            output.write_all(&out).await?;
            output.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    }
    .await;

    host.worker().settle().await;
    served
}
