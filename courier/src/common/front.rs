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
use rand::seq::IndexedRandom;
use tracing::{info, instrument, trace};

use super::front_inner::FrontInner;
use super::{FrontConfig, MessageHandler};
use crate::directory::{EntryPointMeta, RefreshSummary, ServiceDirectory, ServiceMeta};
use crate::dispatch::{AsyncDispatcher, DeliveryReceipt, SendHandle};
use crate::message::{FrontError, Message};
use crate::queue::SyncQueue;
use crate::registry::{HandlerTable, NameRegistry};
use crate::route::{resolve, RouteIntent};
use crate::transport::{PeerInfo, Transport};

/// The routing front of one service instance.
///
/// A `Front` owns this instance's topic and component registries, its inbound
/// handlers and mailboxes, its async dispatcher, and its service directory.
/// It is a cheap handle: clones share the same state, so it can be captured by
/// handlers that need to reply.
///
/// All state is owned by the instance; nothing is process-global, and several
/// fronts can share one process (or one [`MemoryHub`](crate::transport::MemoryHub)).
///
/// # Example
///
/// ```rust,ignore
/// let hub = MemoryHub::new();
/// let server = Front::launch(hub.attach("server", "agency-a"), FrontConfig::default());
/// let replier = server.clone();
/// server
///     .register_topic_handler("echo", move |request| {
///         let _ = replier.send_response(
///             request.src_node.clone().unwrap_or_default(),
///             request.trace_id.as_deref().unwrap_or_default(),
///             request.payload.clone(),
///             request.seq,
///         );
///     })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Front {
    inner: Arc<FrontInner>,
}

impl Front {
    /// Wires a front to `transport` and binds it as the transport's inbound
    /// handler.
    ///
    /// The component route policy from `config` is handed to the transport.
    /// Background discovery only runs after [`start`](Self::start).
    pub fn launch(transport: Arc<dyn Transport>, config: FrontConfig) -> Self {
        transport.apply_component_policy(config.routing.component_policy);
        let inner = Arc::new(FrontInner::new(Arc::clone(&transport), config));
        transport.bind_inbound(inner.inbound.clone());
        info!(
            node = %String::from_utf8_lossy(&transport.node_id()),
            agency = transport.agency(),
            "Front launched"
        );
        Self { inner }
    }

    /// Starts background discovery if it is enabled. Returns `true` if a
    /// refresher was started by this call.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) -> bool {
        if !self.inner.config.discovery.enabled {
            trace!("Discovery disabled");
            return false;
        }
        self.inner.discovery.start(&self.inner.cancellation_token)
    }

    /// Stops background work, waiting up to the configured shutdown timeout.
    ///
    /// Registrations are left as they are; the transport owns their lifetime.
    ///
    /// # Errors
    ///
    /// Fails if the discovery refresher does not stop in time.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let timeout = self.inner.config.shutdown_timeout();
        let stopped = self.inner.discovery.stop(timeout).await;
        self.inner.cancellation_token.cancel();
        stopped?;
        info!("Front shut down");
        Ok(())
    }

    // --- registries ---

    /// Starts receiving messages for `topic`.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::register`].
    pub async fn register_topic(&self, topic: &str) -> Result<bool, FrontError> {
        self.inner.topics.register(topic).await
    }

    /// Stops receiving messages for `topic`. Queued messages stay queued.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::unregister`].
    pub async fn unregister_topic(&self, topic: &str) -> Result<bool, FrontError> {
        self.inner.topics.unregister(topic).await
    }

    /// Advertises `component` as hosted here.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::register`].
    pub async fn register_component(&self, component: &str) -> Result<bool, FrontError> {
        self.inner.components.register(component).await
    }

    /// Withdraws `component`.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::unregister`].
    pub async fn unregister_component(&self, component: &str) -> Result<bool, FrontError> {
        self.inner.components.unregister(component).await
    }

    /// Whether `topic` is registered.
    #[must_use]
    pub fn is_topic_registered(&self, topic: &str) -> bool {
        self.inner.topics.is_registered(topic)
    }

    /// Whether `component` is registered.
    #[must_use]
    pub fn is_component_registered(&self, component: &str) -> bool {
        self.inner.components.is_registered(component)
    }

    /// The topic registry.
    #[must_use]
    pub fn topics(&self) -> &NameRegistry {
        &self.inner.topics
    }

    /// The component registry.
    #[must_use]
    pub fn components(&self) -> &NameRegistry {
        &self.inner.components
    }

    /// Registers `topic` and delivers its messages to `handler` instead of the
    /// topic's mailbox.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::register`]. On failure the previous handler, if
    /// any, is restored.
    pub async fn register_topic_handler<F>(&self, topic: &str, handler: F) -> Result<bool, FrontError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let table = self.inner.inbound.topic_handlers();
        bind_handler(table, &self.inner.topics, topic, Arc::new(handler)).await
    }

    /// Unregisters `topic` and drops its handler.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::unregister`]. The handler is kept if that fails.
    pub async fn unregister_topic_handler(&self, topic: &str) -> Result<bool, FrontError> {
        let removed = self.inner.topics.unregister(topic).await?;
        self.inner.inbound.topic_handlers().remove(topic);
        Ok(removed)
    }

    /// Registers `component` and delivers messages addressed to it to `handler`.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::register`]. On failure the previous handler, if
    /// any, is restored.
    pub async fn register_component_handler<F>(
        &self,
        component: &str,
        handler: F,
    ) -> Result<bool, FrontError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let table = self.inner.inbound.component_handlers();
        bind_handler(table, &self.inner.components, component, Arc::new(handler)).await
    }

    /// Unregisters `topic`, drops its handler, and discards its queued messages.
    ///
    /// Returns how many queued messages were discarded.
    ///
    /// # Errors
    ///
    /// See [`NameRegistry::unregister`]. Nothing is discarded if that fails.
    pub async fn remove_topic(&self, topic: &str) -> Result<usize, FrontError> {
        self.inner.topics.unregister(topic).await?;
        self.inner.inbound.topic_handlers().remove(topic);
        let discarded = self.inner.queue.mailboxes().remove(topic);
        trace!(topic, discarded, "Removed topic");
        Ok(discarded)
    }

    // --- async delivery ---

    /// See [`AsyncDispatcher::send`].
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    pub fn send(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        timeout: Option<Duration>,
    ) -> Result<SendHandle, FrontError> {
        self.inner.dispatcher.send(intent, topic, payload, seq, timeout)
    }

    /// See [`AsyncDispatcher::send_with_callbacks`].
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
        self.inner
            .dispatcher
            .send_with_callbacks(intent, topic, payload, seq, timeout, on_error, on_response)
    }

    /// See [`AsyncDispatcher::send_one_way`].
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
        self.inner.dispatcher.send_one_way(intent, topic, payload, seq)
    }

    /// See [`AsyncDispatcher::send_response`].
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] for an empty node or blank trace id.
    pub fn send_response(
        &self,
        dst_node: impl Into<Bytes>,
        trace_id: &str,
        payload: impl Into<Bytes>,
        seq: u32,
    ) -> Result<DeliveryReceipt, FrontError> {
        self.inner
            .dispatcher
            .send_response(dst_node, trace_id, payload, seq)
    }

    /// See [`AsyncDispatcher::send_response_with`].
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] for an empty node or blank trace id.
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
        self.inner
            .dispatcher
            .send_response_with(dst_node, trace_id, payload, seq, on_error)
    }

    // --- sync delivery ---

    /// See [`SyncQueue::push`].
    ///
    /// # Errors
    ///
    /// See [`SyncQueue::push`].
    pub async fn push(
        &self,
        intent: &RouteIntent,
        topic: &str,
        payload: impl Into<Bytes>,
        seq: u32,
        timeout: Option<Duration>,
    ) -> Result<(), FrontError> {
        self.inner.queue.push(intent, topic, payload, seq, timeout).await
    }

    /// See [`SyncQueue::pop`].
    ///
    /// # Errors
    ///
    /// See [`SyncQueue::pop`].
    pub async fn pop(&self, topic: &str, timeout: Option<Duration>) -> Result<Message, FrontError> {
        self.inner.queue.pop(topic, timeout).await
    }

    /// See [`SyncQueue::peek`].
    ///
    /// # Errors
    ///
    /// See [`SyncQueue::peek`].
    pub fn peek(&self, topic: &str) -> Result<Option<Message>, FrontError> {
        self.inner.queue.peek(topic)
    }

    // --- directory ---

    /// Entry points of `service_name` in the latest peer snapshot.
    #[must_use]
    pub fn get_alive_entry_points(&self, service_name: &str) -> Vec<EntryPointMeta> {
        self.inner.directory.get_alive_entry_points(service_name)
    }

    /// See [`ServiceDirectory::register_service`].
    ///
    /// # Errors
    ///
    /// See [`ServiceDirectory::register_service`].
    pub async fn register_service(&self, service_name: &str, entry_point: &str) -> Result<(), FrontError> {
        self.inner
            .directory
            .register_service(service_name, entry_point)
            .await
    }

    /// This instance's advertised service metadata.
    #[must_use]
    pub fn service_meta(&self) -> ServiceMeta {
        self.inner.directory.service_meta()
    }

    /// Pulls one fresh peer snapshot into the directory.
    ///
    /// # Errors
    ///
    /// Returns the transport's error when listing peers fails.
    pub async fn refresh_directory(&self) -> Result<RefreshSummary, FrontError> {
        self.inner.discovery.refresh_once().await
    }

    /// The transport's current peer list.
    ///
    /// # Errors
    ///
    /// Returns the transport's error when listing peers fails.
    pub async fn get_peers(&self) -> Result<Vec<PeerInfo>, FrontError> {
        self.inner.transport.alive_peers().await
    }

    // --- node selection ---

    /// Node ids `intent` would currently reach.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    #[instrument(skip(self))]
    pub fn select_node_list(&self, intent: &RouteIntent) -> Result<Vec<Bytes>, FrontError> {
        let descriptor = resolve(intent, "")?;
        Ok(self.inner.transport.select_nodes(&descriptor))
    }

    /// One node id `intent` would reach, picked at random.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] when the route does not resolve.
    pub fn select_node(&self, intent: &RouteIntent) -> Result<Option<Bytes>, FrontError> {
        let nodes = self.select_node_list(intent)?;
        Ok(nodes.choose(&mut rand::rng()).cloned())
    }

    // --- accessors ---

    /// This instance's node id.
    #[must_use]
    pub fn node_id(&self) -> Bytes {
        self.inner.transport.node_id()
    }

    /// This instance's agency.
    #[must_use]
    pub fn agency(&self) -> &str {
        self.inner.transport.agency()
    }

    /// The configuration the front was launched with.
    #[must_use]
    pub fn config(&self) -> &FrontConfig {
        &self.inner.config
    }

    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &AsyncDispatcher {
        &self.inner.dispatcher
    }

    /// The underlying sync queue.
    #[must_use]
    pub fn queue(&self) -> &SyncQueue {
        &self.inner.queue
    }

    /// The service directory.
    #[must_use]
    pub fn directory(&self) -> &ServiceDirectory {
        &self.inner.directory
    }

    /// The transport this front sends through.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }
}

/// Installs `handler` for `name`, then registers `name`. The handler goes in
/// first so no message slips into the mailbox between the two steps.
async fn bind_handler(
    table: &HandlerTable,
    registry: &NameRegistry,
    name: &str,
    handler: MessageHandler,
) -> Result<bool, FrontError> {
    let previous = table.insert(name, handler);
    match registry.register(name).await {
        Ok(added) => Ok(added),
        Err(err) => {
            match previous {
                Some(previous) => {
                    table.insert(name, previous);
                }
                None => {
                    table.remove(name);
                }
            }
            Err(err)
        }
    }
}
