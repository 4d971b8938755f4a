//! Listen-channel client.
//!
//! Opening a subscription is a two-step exchange with the CMS real-time
//! API: a handshake `POST` registers the query and returns a channel URL,
//! then a long-lived `GET` on that URL streams server-sent events. A
//! background task decodes the stream and feeds the [`Subscription`].

use async_trait::async_trait;
use futures::StreamExt;
use pressroom_core::{Credentials, QueryDescriptor};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConnectionError, Error, Result};
use crate::sse::{SseDecoder, SseEvent};
use crate::subscription::{Feed, Subscription};

/// Default listen endpoint of the CMS real-time API.
pub const DEFAULT_LISTEN_URL: &str = "https://graphql-listen.datocms.com/graphql";

/// Anything that can open a live subscription for a query.
///
/// The HTTP implementation is [`ListenClient`]; tests substitute an
/// in-memory source built on [`Subscription::channel`].
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Subscribe to changes of `descriptor`'s result.
    async fn subscribe(&self, descriptor: &QueryDescriptor) -> Result<Subscription>;
}

/// Listen client configuration.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Handshake endpoint.
    pub listen_url: String,
    /// Delivery credentials; the descriptor's mode picks one.
    pub credentials: Credentials,
    /// Base editing URL for edit-location tokens.
    pub base_editing_url: String,
    /// Optional environment override.
    pub environment: Option<String>,
    /// Buffered notifications per subscription.
    pub channel_capacity: usize,
}

impl ListenConfig {
    pub fn new(credentials: Credentials, base_editing_url: impl Into<String>) -> Self {
        Self {
            listen_url: DEFAULT_LISTEN_URL.to_string(),
            credentials,
            base_editing_url: base_editing_url.into(),
            environment: None,
            channel_capacity: 16,
        }
    }
}

/// HTTP implementation of [`LiveSource`].
#[derive(Debug, Clone)]
pub struct ListenClient {
    http: reqwest::Client,
    config: ListenConfig,
}

#[derive(Deserialize)]
struct Handshake {
    url: String,
}

#[derive(Deserialize)]
struct ChannelError {
    #[serde(alias = "code")]
    error_code: String,
    #[serde(default)]
    message: String,
    #[serde(default = "default_fatal")]
    fatal: bool,
}

fn default_fatal() -> bool {
    true
}

/// What a decoded SSE frame means for the subscriber.
#[derive(Debug, PartialEq)]
enum Frame {
    Update(Value),
    Error(ConnectionError),
    Ignored,
}

impl ListenClient {
    pub fn new(config: ListenConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Share an existing connection pool.
    pub fn with_client(http: reqwest::Client, config: ListenConfig) -> Self {
        Self { http, config }
    }

    /// Register the query and return the channel URL.
    async fn handshake(&self, descriptor: &QueryDescriptor) -> Result<String> {
        let credential = self.config.credentials.for_mode(descriptor.mode());
        let mut request = self
            .http
            .post(&self.config.listen_url)
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .json(&descriptor.request_body());
        for (name, value) in descriptor.delivery_headers(
            &self.config.base_editing_url,
            self.config.environment.as_deref(),
        ) {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Handshake {
                status: status.as_u16(),
                body,
            });
        }

        let handshake: Handshake = response.json().await?;
        Ok(handshake.url)
    }
}

#[async_trait]
impl LiveSource for ListenClient {
    async fn subscribe(&self, descriptor: &QueryDescriptor) -> Result<Subscription> {
        let channel_url = self.handshake(descriptor).await?;

        let response = self
            .http
            .get(&channel_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Channel(response.status().as_u16()));
        }

        tracing::debug!(
            query = descriptor.document().name,
            mode = %descriptor.mode(),
            "live channel opened"
        );

        let (feed, subscription) = Subscription::channel(self.config.channel_capacity);
        let cancel = feed.cancel_handle();
        let task = tokio::spawn(pump(response, feed));
        cancel.attach(task.abort_handle());
        Ok(subscription)
    }
}

/// Decode the channel body into notifications until it ends or the
/// subscriber goes away.
async fn pump(response: reqwest::Response, mut feed: Feed) {
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "live channel transport failed");
                feed.fail(Error::from(e).into()).await;
                return;
            }
        };

        let events = match decoder.push(&chunk) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "live channel frame rejected");
                feed.fail(e.into()).await;
                return;
            }
        };

        for event in events {
            match interpret(&event) {
                Frame::Update(payload) => {
                    if !feed.update(payload).await {
                        tracing::debug!("live subscriber gone, closing channel");
                        return;
                    }
                }
                Frame::Error(error) if error.fatal => {
                    tracing::warn!(code = %error.code, message = %error.message, "live channel error");
                    feed.fail(error).await;
                    return;
                }
                Frame::Error(error) => {
                    tracing::debug!(code = %error.code, message = %error.message, "non-fatal live channel error");
                }
                Frame::Ignored => {}
            }
        }
    }

    feed.fail(ConnectionError::closed()).await;
}

/// Map one SSE frame to a subscriber-facing frame.
fn interpret(event: &SseEvent) -> Frame {
    match event.event.as_str() {
        "update" => match update_payload(&event.data) {
            Ok(payload) => Frame::Update(payload),
            Err(e) => Frame::Error(ConnectionError::from(e)),
        },
        "channelError" => match serde_json::from_str::<ChannelError>(&event.data) {
            Ok(err) => Frame::Error(ConnectionError {
                code: err.error_code,
                message: err.message,
                fatal: err.fatal,
            }),
            Err(e) => Frame::Error(ConnectionError::from(Error::from(e))),
        },
        _ => Frame::Ignored,
    }
}

/// Pull `data` out of an update frame.
///
/// The frame carries a GraphQL response, either bare or wrapped in
/// `{"response": ...}`.
fn update_payload(raw: &str) -> Result<Value> {
    let mut frame: Value = serde_json::from_str(raw)?;
    if let Some(inner) = frame.get_mut("response") {
        let response = inner.take();
        frame = response;
    }
    match frame {
        Value::Object(mut map) => Ok(map.remove("data").unwrap_or(Value::Null)),
        other => Err(Error::Json(serde::de::Error::custom(format!(
            "update frame is not an object: {other}"
        )))),
    }
}
