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

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::dispatch::SendCompletion;
use crate::message::{FrontError, Message};
use crate::route::{ComponentRoutePolicy, RouteDescriptor};

/// Receives messages the transport delivers to this node.
///
/// Called on the transport's task. Implementations must not block.
pub trait InboundHandler: Send + Sync {
    /// Handles one inbound message.
    fn on_message(&self, message: Message);
}

/// One entry of a peer snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// The peer's node id.
    pub node_id: Bytes,
    /// The peer's raw metadata blob, normally a serialized `ServiceMeta`.
    pub meta: String,
    /// The components the peer currently has registered.
    pub components: Vec<String>,
}

impl PeerInfo {
    /// Creates a snapshot entry.
    pub fn new(
        node_id: impl Into<Bytes>,
        meta: impl Into<String>,
        components: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            meta: meta.into(),
            components: components.into_iter().map(Into::into).collect(),
        }
    }
}

/// Everything the transport needs to carry out one send.
///
/// The descriptor is moved in, so it is consumed by exactly this send.
#[derive(Debug)]
pub struct OutboundRequest {
    /// Where the message goes.
    pub descriptor: RouteDescriptor,
    /// The message itself.
    pub message: Message,
    /// Completion channels for request-style sends. `None` for one-way sends
    /// and pushes.
    pub completion: Option<SendCompletion>,
}

/// The byte transport a front instance sends through.
///
/// # Contract
///
/// * `send_raw` reports a routing failure by returning `Err`. It never fails
///   the request's completion itself.
/// * Responses correlated to a pending request (same trace id) are delivered
///   through that request's [`SendCompletion`] and only through it.
/// * Names registered with `register_topic` / `register_component` start
///   receiving traffic once the call returns `Ok`.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// The id of the node this transport represents.
    fn node_id(&self) -> Bytes;

    /// The agency this node belongs to.
    fn agency(&self) -> &str;

    /// Installs the handler that receives this node's inbound traffic.
    fn bind_inbound(&self, handler: Arc<dyn InboundHandler>);

    /// Sets how component routes combine agency and component, for transports
    /// that let the caller choose. The default keeps the transport's own rule.
    fn apply_component_policy(&self, _policy: ComponentRoutePolicy) {}

    /// Lists the node ids `descriptor` would currently reach.
    fn select_nodes(&self, descriptor: &RouteDescriptor) -> Vec<Bytes>;

    /// Routes one message.
    async fn send_raw(&self, request: OutboundRequest) -> Result<(), FrontError>;

    /// Sends a reply to `dst_node`, preserving the message's trace id.
    async fn send_response(&self, dst_node: Bytes, message: Message) -> Result<(), FrontError>;

    /// Adds `topic` to this node's inbound routing table.
    async fn register_topic(&self, topic: &str) -> Result<(), FrontError>;

    /// Removes `topic` from this node's inbound routing table.
    async fn unregister_topic(&self, topic: &str) -> Result<(), FrontError>;

    /// Advertises `component` as hosted by this node.
    async fn register_component(&self, component: &str) -> Result<(), FrontError>;

    /// Withdraws `component`.
    async fn unregister_component(&self, component: &str) -> Result<(), FrontError>;

    /// Propagates this node's serialized service metadata to its peers.
    async fn publish_meta(&self, meta: String) -> Result<(), FrontError>;

    /// Returns the current snapshot of alive peers, excluding this node.
    async fn alive_peers(&self) -> Result<Vec<PeerInfo>, FrontError>;
}
