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

use std::time::Duration;

use bytes::Bytes;

use crate::route::RouteDescriptor;

/// A single transfer between two front instances.
///
/// A `Message` is created by the sender, is immutable while in flight, and is
/// consumed exactly once on the receiving side: either by a registered
/// handler or by one `pop` from its topic's mailbox.
///
/// The sequence number is assigned by the sender and is only used for
/// correlation. It is neither globally unique nor an ordering key.
///
/// The payload is a [`Bytes`] buffer, so cloning a message (as `peek` does)
/// never copies the payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Topic the message is addressed to. May be empty for responses.
    pub topic: String,
    /// Sender-assigned sequence number.
    pub seq: u32,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Correlation token linking a request to its responses.
    pub trace_id: Option<String>,
    /// How long the sender waits for a response. Only set on request-style sends.
    pub timeout: Option<Duration>,
    /// Node id of the sender, filled in by the transport.
    pub src_node: Option<Bytes>,
    /// Agency of the sender, filled in by the transport.
    pub src_inst: Option<String>,
    /// Destination component of a component-routed message.
    pub dst_component: Option<String>,
}

impl Message {
    /// Creates a message for `topic` carrying `payload`.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Sets the sequence number.
    #[must_use]
    pub const fn with_seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the response timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the payload as a byte slice.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the sender's node id, if the transport recorded it.
    #[must_use]
    pub fn src_node(&self) -> Option<&[u8]> {
        self.src_node.as_deref()
    }

    /// Builds the message that travels along `descriptor`.
    pub(crate) fn outbound(descriptor: &RouteDescriptor, payload: Bytes, seq: u32) -> Self {
        Self {
            topic: descriptor.topic().to_owned(),
            seq,
            payload,
            dst_component: descriptor.dst_component().map(str::to_owned),
            ..Self::default()
        }
    }
}
