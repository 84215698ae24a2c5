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
use tracing::{instrument, trace};

use super::MailboxSet;
use crate::message::{FrontError, Message};
use crate::route::{resolve, RouteIntent};
use crate::transport::{OutboundRequest, Transport};

/// Blocking push, pop and peek over the transport and the local mailboxes.
#[derive(Debug, Clone)]
pub struct SyncQueue {
    transport: Arc<dyn Transport>,
    mailboxes: Arc<MailboxSet>,
    send_timeout: Duration,
    pop_timeout: Duration,
}

impl SyncQueue {
    /// Creates a queue over `mailboxes` with the given default timeouts.
    pub fn new(
        transport: Arc<dyn Transport>,
        mailboxes: Arc<MailboxSet>,
        send_timeout: Duration,
        pop_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            mailboxes,
            send_timeout,
            pop_timeout,
        }
    }

    /// Resolves `intent` and sends one message, waiting for the transport to
    /// accept it.
    ///
    /// `timeout` bounds the send side only; `None` uses the default send
    /// timeout and zero waits without bound.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] when the route does not resolve.
    /// * [`FrontError::Timeout`] when the transport did not accept in time.
    /// * Whatever the transport reports, typically
    ///   [`FrontError::TransportUnavailable`].
    #[instrument(skip(self, payload), fields(route = %intent.route_type()))]
    pub async fn push(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        timeout: Option<Duration>,
    ) -> Result<(), FrontError> {
        let descriptor = resolve(intent, topic)?;
        let timeout = timeout.unwrap_or(self.send_timeout);
        let target = descriptor.target();
        let message = Message::outbound(&descriptor, payload.into(), seq);
        let send = self.transport.send_raw(OutboundRequest {
            descriptor,
            message,
            completion: None,
        });

        let result = if timeout.is_zero() {
            send.await
        } else {
            tokio::time::timeout(timeout, send)
                .await
                .unwrap_or_else(|_| {
                    Err(FrontError::Timeout(format!(
                        "push to {target} not accepted within {timeout:?}"
                    )))
                })
        };
        trace!(ok = result.is_ok(), "Push finished");
        result
    }

    /// Waits for the oldest message on `topic`.
    ///
    /// `None` uses the default pop timeout.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] if `topic` is blank.
    /// * [`FrontError::Timeout`] if nothing arrived in time.
    pub async fn pop(&self, topic: &str, timeout: Option<Duration>) -> Result<Message, FrontError> {
        self.mailboxes
            .pop(topic, timeout.unwrap_or(self.pop_timeout))
            .await
    }

    /// Returns a copy of the oldest message on `topic`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] if `topic` is blank.
    pub fn peek(&self, topic: &str) -> Result<Option<Message>, FrontError> {
        self.mailboxes.peek(topic)
    }

    /// The mailboxes this queue reads from.
    #[must_use]
    pub fn mailboxes(&self) -> &Arc<MailboxSet> {
        &self.mailboxes
    }
}
