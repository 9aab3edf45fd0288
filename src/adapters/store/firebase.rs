//! Firebase Realtime Database adapter. Implements StorePort over the REST API.
//!
//! - Writes: `PUT <endpoint>/<path>.json`, deletes: `DELETE <endpoint>/<path>.json`
//! - Subscriptions: `GET` with `Accept: text/event-stream`; `put`/`patch`
//!   events are folded into a local mirror and re-emitted as full snapshots
//! - Dropped streams reconnect with exponential backoff; a revoked listener or
//!   a rejected request ends the feed with an error item

use crate::adapters::store::mirror::SubtreeMirror;
use crate::adapters::store::push_id::PushIdGenerator;
use crate::adapters::store::sse::{SseDecoder, SseEvent};
use crate::domain::DomainError;
use crate::ports::{ChildRef, FeedItem, StorePort, Subscription};
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// REST client for one database endpoint, e.g. `https://<db>.firebaseio.com`.
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    ids: PushIdGenerator,
}

impl FirebaseStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ids: PushIdGenerator::new(),
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

#[async_trait::async_trait]
impl StorePort for FirebaseStore {
    fn create_child(&self, path: &str) -> ChildRef {
        ChildRef::new(path.trim_matches('/'), self.ids.next_id())
    }

    async fn write(&self, child: &ChildRef, value: Value) -> Result<(), DomainError> {
        let res = self
            .client
            .put(self.node_url(&child.path()))
            .json(&value)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(res).await?;
        debug!(path = %child.path(), "store write acknowledged");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), DomainError> {
        let res = self
            .client
            .delete(self.node_url(path))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(res).await?;
        debug!(path, "store delete acknowledged");
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, DomainError> {
        let path = path.trim_matches('/').to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let feeder = tokio::spawn(stream_subtree(
            self.client.clone(),
            self.node_url(&path),
            path.clone(),
            tx,
        ));
        info!(path = %path, "subscribed");
        Ok(Subscription::new(path, rx).with_feeder(feeder))
    }
}

/// Why one streaming connection stopped.
#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    /// Server closed the body; reconnect.
    Disconnected,
    /// Store revoked the listener (`cancel` / `auth_revoked`); give up.
    Cancelled,
    /// Subscription dropped on our side.
    ReceiverGone,
}

/// What the feeder does once a connection has ended.
#[derive(Debug, PartialEq, Eq)]
enum NextStep {
    Reconnect(Duration),
    /// Nobody is listening any more.
    Stop,
    /// End the feed with this error.
    Fail(DomainError),
}

/// Effect of one server-sent event on the mirror.
#[derive(Debug, PartialEq, Eq)]
enum EventOutcome {
    Changed,
    Ignored,
    Cancelled,
}

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

async fn stream_subtree(
    client: Client,
    url: String,
    path: String,
    tx: mpsc::UnboundedSender<FeedItem>,
) {
    let mut delay = RECONNECT_BASE;
    loop {
        let outcome = follow_stream(&client, &url, &path, &tx).await;
        match &outcome {
            Ok(StreamEnd::Disconnected) => info!(path = %path, "event stream closed; reconnecting"),
            Err(e) if e.is_recoverable() => {
                warn!(path = %path, error = %e, retry_ms = delay.as_millis() as u64, "event stream failed")
            }
            _ => {}
        }
        match next_step(outcome, &path, &mut delay) {
            NextStep::Reconnect(wait) => {
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(wait).await;
            }
            NextStep::Stop => return,
            NextStep::Fail(e) => {
                error!(path = %path, error = %e, "subscription ended");
                // Subscriber may be gone already.
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Decide how to continue after a connection ended. `delay` carries the
/// backoff between calls: reset by a clean disconnect, doubled per retry.
fn next_step(
    outcome: Result<StreamEnd, DomainError>,
    path: &str,
    delay: &mut Duration,
) -> NextStep {
    match outcome {
        Ok(StreamEnd::ReceiverGone) => NextStep::Stop,
        Ok(StreamEnd::Cancelled) => NextStep::Fail(DomainError::StoreRejected(format!(
            "store cancelled the subscription to {}",
            path
        ))),
        Ok(StreamEnd::Disconnected) => {
            *delay = RECONNECT_BASE;
            backoff(delay)
        }
        Err(e) if e.is_recoverable() => backoff(delay),
        Err(e) => NextStep::Fail(e),
    }
}

fn backoff(delay: &mut Duration) -> NextStep {
    let wait = *delay;
    *delay = (wait * 2).min(RECONNECT_MAX);
    NextStep::Reconnect(wait)
}

async fn follow_stream(
    client: &Client,
    url: &str,
    path: &str,
    tx: &mpsc::UnboundedSender<FeedItem>,
) -> Result<StreamEnd, DomainError> {
    let res = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(transport_error)?;
    let res = ensure_success(res).await?;

    let mut mirror = SubtreeMirror::new(path);
    let body = res.bytes_stream().map(|chunk| chunk.map_err(transport_error));
    consume_events(body, &mut mirror, tx).await
}

/// Decode an event-stream body into the mirror, sending a snapshot per change.
async fn consume_events<S, B>(
    mut body: S,
    mirror: &mut SubtreeMirror,
    tx: &mpsc::UnboundedSender<FeedItem>,
) -> Result<StreamEnd, DomainError>
where
    S: Stream<Item = Result<B, DomainError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for event in decoder.feed(chunk.as_ref()) {
            match apply_event(mirror, &event) {
                EventOutcome::Changed => {
                    if tx.send(Ok(mirror.snapshot())).is_err() {
                        return Ok(StreamEnd::ReceiverGone);
                    }
                }
                EventOutcome::Ignored => {}
                EventOutcome::Cancelled => return Ok(StreamEnd::Cancelled),
            }
        }
    }
    Ok(StreamEnd::Disconnected)
}

fn apply_event(mirror: &mut SubtreeMirror, event: &SseEvent) -> EventOutcome {
    match event.event.as_str() {
        "put" | "patch" => {
            let payload: StreamPayload = match serde_json::from_str(&event.data) {
                Ok(p) => p,
                Err(e) => {
                    warn!(event = %event.event, error = %e, "unparseable stream payload");
                    return EventOutcome::Ignored;
                }
            };
            if event.event == "put" {
                mirror.put(&payload.path, payload.data);
            } else {
                mirror.patch(&payload.path, payload.data);
            }
            EventOutcome::Changed
        }
        "keep-alive" => EventOutcome::Ignored,
        "cancel" | "auth_revoked" => EventOutcome::Cancelled,
        other => {
            debug!(event = other, "ignoring stream event");
            EventOutcome::Ignored
        }
    }
}

fn transport_error(e: reqwest::Error) -> DomainError {
    if e.is_builder() {
        DomainError::StoreRejected(format!("invalid request: {}", e))
    } else {
        DomainError::StoreUnavailable(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> DomainError {
    let msg = format!("store returned {}: {}", status, body.trim());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        DomainError::StoreUnavailable(msg)
    } else {
        DomainError::StoreRejected(msg)
    }
}

async fn ensure_success(res: Response) -> Result<Response, DomainError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
    Err(classify_status(status, &text))
}
