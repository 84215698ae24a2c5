/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mti::prelude::*;
use tracing::{instrument, trace};

use super::{DeliveryReceipt, ResponseMode, SendCompletion, SendHandle};
use crate::message::{FrontError, Message};
use crate::registry::NameRegistry;
use crate::route::{resolve, RouteIntent, RouteType};
use crate::transport::{OutboundRequest, Transport};

/// Tunables of an [`AsyncDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Whether a send may receive more than one response.
    pub response_mode: ResponseMode,
    /// Capacity of each send's response channel.
    pub response_buffer: usize,
    /// Response timeout used when a send does not specify one.
    pub default_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            response_mode: ResponseMode::Single,
            response_buffer: 64,
            default_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Issues sends without blocking the caller.
///
/// Every method validates and resolves synchronously, then spawns the actual
/// transfer on the Tokio runtime, so it must be called from within one.
/// Concurrent sends are independent and carry no ordering guarantee.
#[derive(Debug, Clone)]
pub struct AsyncDispatcher {
    transport: Arc<dyn Transport>,
    topics: Arc<NameRegistry>,
    settings: DispatchSettings,
}

impl AsyncDispatcher {
    /// Creates a dispatcher sending through `transport`.
    pub fn new(
        transport: Arc<dyn Transport>,
        topics: Arc<NameRegistry>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            topics,
            settings,
        }
    }

    /// The dispatcher's settings.
    #[must_use]
    pub const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Sends a request and returns its completion channels.
    ///
    /// The error channel fires if the route is unreachable, or if `timeout`
    /// (the configured default when `None`) elapses without any response. A
    /// zero timeout waits for responses indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    #[instrument(skip(self, payload), fields(route = %intent.route_type()))]
    pub fn send(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        timeout: Option<Duration>,
    ) -> Result<SendHandle, FrontError> {
        let descriptor = resolve(intent, topic)?;
        let timeout = timeout.unwrap_or(self.settings.default_timeout);
        let trace_id = new_trace_id();
        self.note_local_topic(descriptor.route_type(), descriptor.topic());

        let message = Message::outbound(&descriptor, payload.into(), seq)
            .with_trace_id(trace_id.clone())
            .with_timeout(timeout);
        let (completion, handle) = SendCompletion::channel(
            trace_id,
            self.settings.response_mode,
            self.settings.response_buffer,
        );

        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let request = OutboundRequest {
                descriptor,
                message,
                completion: Some(completion.clone()),
            };
            if let Err(error) = transport.send_raw(request).await {
                completion.fail(error);
                return;
            }
            if timeout.is_zero() {
                return;
            }
            tokio::select! {
                () = completion.settled() => {}
                () = tokio::time::sleep(timeout) => {
                    completion.expire(timeout);
                }
            }
        });
        Ok(handle)
    }

    /// Callback flavour of [`send`](Self::send).
    ///
    /// `on_response` runs for every response, `on_error` at most once. Both
    /// run on a spawned task. Returns the trace id of the send.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    #[allow(clippy::too_many_arguments)]
    pub fn send_with_callbacks<E, R>(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        timeout: Option<Duration>,
        on_error: E,
        on_response: R,
    ) -> Result<String, FrontError>
    where
        E: FnOnce(FrontError) + Send + 'static,
        R: Fn(Message) + Send + 'static,
    {
        let mut handle = self.send(intent, topic, payload, seq, timeout)?;
        let trace_id = handle.trace_id().to_owned();
        tokio::spawn(async move {
            let mut on_error = Some(on_error);
            while let Some(item) = handle.next().await {
                match item {
                    Ok(message) => on_response(message),
                    Err(error) => {
                        if let Some(on_error) = on_error.take() {
                            on_error(error);
                        }
                    }
                }
            }
        });
        Ok(trace_id)
    }

    /// Sends without expecting a response.
    ///
    /// The receipt reports an unroutable destination; nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    pub fn send_one_way(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
    ) -> Result<DeliveryReceipt, FrontError> {
        let descriptor = resolve(intent, topic)?;
        self.note_local_topic(descriptor.route_type(), descriptor.topic());
        let trace_id = new_trace_id();
        let message =
            Message::outbound(&descriptor, payload.into(), seq).with_trace_id(trace_id.clone());
        let (completion, receipt) = SendCompletion::error_only(trace_id);

        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let request = OutboundRequest {
                descriptor,
                message,
                completion: None,
            };
            match transport.send_raw(request).await {
                Ok(()) => completion.complete(),
                Err(error) => {
                    completion.fail(error);
                }
            }
        });
        Ok(receipt)
    }

    /// Replies to a request received from `dst_node`, preserving `trace_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when `dst_node` is empty or
    /// `trace_id` is blank.
    pub fn send_response(
        &self,
        dst_node: impl Into<Bytes>,
        trace_id: &str,
        payload: impl Into<Bytes>,
        seq: u32,
    ) -> Result<DeliveryReceipt, FrontError> {
        let dst_node = dst_node.into();
        if dst_node.is_empty() {
            return Err(FrontError::InvalidAddress("response node id is empty".into()));
        }
        if trace_id.trim().is_empty() {
            return Err(FrontError::InvalidAddress("response trace id is blank".into()));
        }
        let message = Message::new("", payload).with_seq(seq).with_trace_id(trace_id);
        let (completion, receipt) = SendCompletion::error_only(trace_id.to_owned());

        trace!(trace_id, node = %String::from_utf8_lossy(&dst_node), "Sending response");
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.send_response(dst_node, message).await {
                Ok(()) => completion.complete(),
                Err(error) => {
                    completion.fail(error);
                }
            }
        });
        Ok(receipt)
    }

    /// Callback flavour of [`send_response`](Self::send_response).
    ///
    /// # Errors
    ///
    /// Same as [`send_response`](Self::send_response).
    pub fn send_response_with<E>(
        &self,
        dst_node: impl Into<Bytes>,
        trace_id: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        on_error: E,
    ) -> Result<(), FrontError>
    where
        E: FnOnce(FrontError) + Send + 'static,
    {
        let receipt = self.send_response(dst_node, trace_id, payload, seq)?;
        tokio::spawn(async move {
            if let Err(error) = receipt.outcome().await {
                on_error(error);
            }
        });
        Ok(())
    }

    /// Whether a topic route targets a topic this node itself subscribes to.
    fn note_local_topic(&self, route_type: RouteType, topic: &str) -> bool {
        if route_type != RouteType::Topic {
            return false;
        }
        let subscribed = self.topics.is_registered(topic);
        if !subscribed {
            trace!(topic, "Topic route to a topic this node does not subscribe to");
        }
        subscribed
    }
}

fn new_trace_id() -> String {
    "trace".create_type_id::<V7>().to_string()
}
