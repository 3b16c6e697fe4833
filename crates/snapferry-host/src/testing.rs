use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use hyper::Method;
use snapferry_core::collect_stream;
use tokio::sync::Mutex;

use crate::error::{HostError, HostResult};
use crate::protocol::ServerInfo;
use crate::transport::{HostRequest, HostResponse, HostTransport};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(&'static str, String)>,
    pub(crate) body: Option<Bytes>,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport double answering from a queue and recording every request.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    info: ServerInfo,
    responses: Mutex<VecDeque<(u16, Bytes)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    info_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            info: ServerInfo {
                api_extensions: extensions.iter().map(ToString::to_string).collect(),
            },
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            info_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) async fn respond(&self, status: u16, body: &'static str) {
        self.responses
            .lock()
            .await
            .push_back((status, Bytes::from_static(body.as_bytes())));
    }

    pub(crate) async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub(crate) fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostTransport for ScriptedTransport {
    async fn server_info(&self) -> HostResult<ServerInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.clone())
    }

    async fn send(&self, request: HostRequest) -> HostResult<HostResponse> {
        let body = match request.body {
            Some(stream) => Some(
                collect_stream(stream)
                    .await
                    .map_err(|source| HostError::Body { source })?,
            ),
            None => None,
        };
        self.requests.lock().await.push(RecordedRequest {
            method: request.method,
            path: request.path,
            headers: request.headers,
            body,
        });
        let (status, body) =
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or(HostError::Endpoint {
                    reason: "no_scripted_response",
                })?;
        Ok(HostResponse {
            status,
            body: snapferry_core::byte_stream_from_chunks(vec![body]),
        })
    }
}
