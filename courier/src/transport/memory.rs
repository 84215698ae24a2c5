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

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::{InboundHandler, OutboundRequest, PeerInfo, Transport};
use crate::dispatch::SendCompletion;
use crate::message::{FrontError, Message};
use crate::route::{ComponentRoutePolicy, RouteDescriptor, RouteType};

/// Runtime switches that make the hub misbehave on purpose.
///
/// Every switch starts off. They apply to all nodes of the hub.
#[derive(Debug, Default)]
pub struct FaultSwitches {
    reject_registrations: AtomicBool,
    reject_publish: AtomicBool,
    stall_sends: AtomicBool,
    fail_peer_listing: AtomicBool,
}

impl FaultSwitches {
    /// Makes topic and component (un)registration fail.
    pub fn set_reject_registrations(&self, on: bool) {
        self.reject_registrations.store(on, Ordering::SeqCst);
    }

    /// Makes metadata publication fail.
    pub fn set_reject_publish(&self, on: bool) {
        self.reject_publish.store(on, Ordering::SeqCst);
    }

    /// Makes `send_raw` never complete.
    pub fn set_stall_sends(&self, on: bool) {
        self.stall_sends.store(on, Ordering::SeqCst);
    }

    /// Makes peer listing fail.
    pub fn set_fail_peer_listing(&self, on: bool) {
        self.fail_peer_listing.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), FrontError> {
        if flag.load(Ordering::SeqCst) {
            Err(FrontError::TransportUnavailable(format!("{what} rejected by hub")))
        } else {
            Ok(())
        }
    }
}

/// One node attached to a [`MemoryHub`].
struct MemoryNode {
    node_id: Bytes,
    agency: String,
    inbound: RwLock<Option<Weak<dyn InboundHandler>>>,
    topics: RwLock<HashSet<String>>,
    components: RwLock<HashSet<String>>,
    meta: RwLock<String>,
    /// How this node resolves the component routes it sends.
    policy: RwLock<ComponentRoutePolicy>,
    /// Request-style sends issued by this node, keyed by trace id.
    pending: DashMap<String, SendCompletion>,
}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNode")
            .field("node_id", &String::from_utf8_lossy(&self.node_id))
            .field("agency", &self.agency)
            .field("topics", &self.topics.read().len())
            .field("components", &self.components.read().len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl MemoryNode {
    fn new(node_id: Bytes, agency: String, policy: ComponentRoutePolicy) -> Self {
        Self {
            node_id,
            agency,
            inbound: RwLock::new(None),
            topics: RwLock::new(HashSet::new()),
            components: RwLock::new(HashSet::new()),
            meta: RwLock::new(String::new()),
            policy: RwLock::new(policy),
            pending: DashMap::new(),
        }
    }

    fn accepts(&self, descriptor: &RouteDescriptor, policy: ComponentRoutePolicy) -> bool {
        match descriptor.route_type() {
            RouteType::NodeId => descriptor.dst_node() == Some(&self.node_id[..]),
            RouteType::Agency => descriptor.dst_inst() == Some(self.agency.as_str()),
            RouteType::Component => {
                let hosts = descriptor
                    .dst_component()
                    .is_some_and(|component| self.components.read().contains(component));
                hosts
                    && policy
                        .agency_scope(descriptor)
                        .map_or(true, |agency| agency == self.agency)
            }
            RouteType::Topic => {
                descriptor.dst_inst() == Some(self.agency.as_str())
                    && self.topics.read().contains(descriptor.topic())
            }
        }
    }

    /// Hands `message` to the bound inbound handler. Returns `false` when no
    /// live handler is bound.
    fn deliver(&self, message: Message) -> bool {
        let handler = self.inbound.read().as_ref().and_then(Weak::upgrade);
        match handler {
            Some(handler) => {
                handler.on_message(message);
                true
            }
            None => {
                warn!(
                    node = %String::from_utf8_lossy(&self.node_id),
                    topic = %message.topic,
                    "Dropping message for node without inbound handler"
                );
                false
            }
        }
    }

    fn sorted_components(&self) -> Vec<String> {
        let mut components: Vec<String> = self.components.read().iter().cloned().collect();
        components.sort_unstable();
        components
    }
}

#[derive(Debug, Default)]
struct HubInner {
    nodes: DashMap<Bytes, Arc<MemoryNode>>,
    policy: RwLock<ComponentRoutePolicy>,
    faults: FaultSwitches,
}

/// An in-process routing table shared by any number of nodes.
///
/// Delivery happens inline on the sending task, so messages from one producer
/// to one topic arrive in the order they were sent.
///
/// # Example
///
/// ```rust,ignore
/// let hub = MemoryHub::new();
/// let alice = hub.attach("alice", "agency-a");
/// let bob = hub.attach("bob", "agency-b");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    /// Creates an empty hub whose nodes start with [`ComponentRoutePolicy::Scoped`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a node, replacing any node previously attached under the same id.
    pub fn attach(&self, node_id: impl Into<Bytes>, agency: impl Into<String>) -> Arc<MemoryTransport> {
        let policy = *self.inner.policy.read();
        let node = Arc::new(MemoryNode::new(node_id.into(), agency.into(), policy));
        debug!(node = ?node, "Attaching node to hub");
        self.inner
            .nodes
            .insert(node.node_id.clone(), Arc::clone(&node));
        Arc::new(MemoryTransport {
            hub: self.clone(),
            node,
        })
    }

    /// Removes a node. Returns `true` if it was attached.
    pub fn detach(&self, node_id: &[u8]) -> bool {
        self.inner.nodes.remove(node_id).is_some()
    }

    /// The hub's fault injection switches.
    #[must_use]
    pub fn faults(&self) -> &FaultSwitches {
        &self.inner.faults
    }

    /// Sets the component route policy of nodes attached from now on.
    pub fn set_policy(&self, policy: ComponentRoutePolicy) {
        *self.inner.policy.write() = policy;
    }

    /// All nodes `descriptor` currently reaches, ordered by node id.
    fn select(&self, descriptor: &RouteDescriptor, policy: ComponentRoutePolicy) -> Vec<Arc<MemoryNode>> {
        let mut nodes: Vec<Arc<MemoryNode>> = self
            .inner
            .nodes
            .iter()
            .filter(|entry| entry.value().accepts(descriptor, policy))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    fn node(&self, node_id: &[u8]) -> Option<Arc<MemoryNode>> {
        self.inner
            .nodes
            .get(node_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

/// One node of a [`MemoryHub`], implementing [`Transport`].
#[derive(Debug)]
pub struct MemoryTransport {
    hub: MemoryHub,
    node: Arc<MemoryNode>,
}

impl MemoryTransport {
    /// The hub this node is attached to.
    #[must_use]
    pub const fn hub(&self) -> &MemoryHub {
        &self.hub
    }

    /// The metadata blob this node last published.
    #[must_use]
    pub fn published_meta(&self) -> String {
        self.node.meta.read().clone()
    }

    fn policy(&self) -> ComponentRoutePolicy {
        *self.node.policy.read()
    }

    fn stamp(&self, mut message: Message) -> Message {
        message.src_node = Some(self.node.node_id.clone());
        message.src_inst = Some(self.node.agency.clone());
        message
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn node_id(&self) -> Bytes {
        self.node.node_id.clone()
    }

    fn agency(&self) -> &str {
        &self.node.agency
    }

    fn bind_inbound(&self, handler: Arc<dyn InboundHandler>) {
        *self.node.inbound.write() = Some(Arc::downgrade(&handler));
    }

    fn apply_component_policy(&self, policy: ComponentRoutePolicy) {
        *self.node.policy.write() = policy;
    }

    fn select_nodes(&self, descriptor: &RouteDescriptor) -> Vec<Bytes> {
        self.hub
            .select(descriptor, self.policy())
            .into_iter()
            .map(|node| node.node_id.clone())
            .collect()
    }

    async fn send_raw(&self, request: OutboundRequest) -> Result<(), FrontError> {
        if self.hub.faults().stall_sends.load(Ordering::SeqCst) {
            trace!(route = %request.descriptor.target(), "Stalling send");
            std::future::pending::<()>().await;
        }

        let OutboundRequest {
            descriptor,
            message,
            completion,
        } = request;
        let targets = self.hub.select(&descriptor, self.policy());
        if targets.is_empty() {
            return Err(FrontError::TransportUnavailable(format!(
                "no route to {}",
                descriptor.target()
            )));
        }

        if let (Some(completion), Some(trace_id)) = (completion, message.trace_id.clone()) {
            self.node.pending.retain(|_, pending| !pending.is_settled());
            self.node.pending.insert(trace_id, completion);
        }

        let message = self.stamp(message);
        // Topic routes fan out to every subscriber; the others pick one hop.
        let hops = if descriptor.route_type() == RouteType::Topic {
            targets.len()
        } else {
            1
        };
        let mut delivered = 0_usize;
        for node in targets.iter().take(hops) {
            if node.deliver(message.clone()) {
                delivered += 1;
            }
        }
        trace!(route = %descriptor.target(), delivered, "Routed message");

        if delivered == 0 {
            return Err(FrontError::TransportUnavailable(format!(
                "{} has no inbound handler",
                descriptor.target()
            )));
        }
        Ok(())
    }

    async fn send_response(&self, dst_node: Bytes, message: Message) -> Result<(), FrontError> {
        let Some(node) = self.hub.node(&dst_node) else {
            return Err(FrontError::TransportUnavailable(format!(
                "node '{}' is not attached",
                String::from_utf8_lossy(&dst_node)
            )));
        };
        let message = self.stamp(message);

        let pending = message.trace_id.as_deref().and_then(|trace_id| {
            node.pending
                .get(trace_id)
                .map(|entry| entry.value().clone())
        });
        if let Some(completion) = pending {
            if !completion.respond(message) {
                trace!(trace_id = completion.trace_id(), "Response not accepted by request");
            }
            return Ok(());
        }
        if node.deliver(message) {
            Ok(())
        } else {
            Err(FrontError::TransportUnavailable(format!(
                "node '{}' has no inbound handler",
                String::from_utf8_lossy(&dst_node)
            )))
        }
    }

    async fn register_topic(&self, topic: &str) -> Result<(), FrontError> {
        FaultSwitches::check(&self.hub.faults().reject_registrations, "registration")?;
        self.node.topics.write().insert(topic.to_owned());
        Ok(())
    }

    async fn unregister_topic(&self, topic: &str) -> Result<(), FrontError> {
        FaultSwitches::check(&self.hub.faults().reject_registrations, "registration")?;
        self.node.topics.write().remove(topic);
        Ok(())
    }

    async fn register_component(&self, component: &str) -> Result<(), FrontError> {
        FaultSwitches::check(&self.hub.faults().reject_registrations, "registration")?;
        self.node.components.write().insert(component.to_owned());
        Ok(())
    }

    async fn unregister_component(&self, component: &str) -> Result<(), FrontError> {
        FaultSwitches::check(&self.hub.faults().reject_registrations, "registration")?;
        self.node.components.write().remove(component);
        Ok(())
    }

    async fn publish_meta(&self, meta: String) -> Result<(), FrontError> {
        FaultSwitches::check(&self.hub.faults().reject_publish, "metadata publish")?;
        *self.node.meta.write() = meta;
        Ok(())
    }

    async fn alive_peers(&self) -> Result<Vec<PeerInfo>, FrontError> {
        FaultSwitches::check(&self.hub.faults().fail_peer_listing, "peer listing")?;
        let mut peers: Vec<PeerInfo> = self
            .hub
            .inner
            .nodes
            .iter()
            .filter(|entry| entry.key() != &self.node.node_id)
            .map(|entry| {
                let node = entry.value();
                PeerInfo {
                    node_id: node.node_id.clone(),
                    meta: node.meta.read().clone(),
                    components: node.sorted_components(),
                }
            })
            .collect();
        peers.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        Ok(peers)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::dispatch::ResponseMode;
    use crate::route::{resolve, RouteIntent};

    #[derive(Default)]
    struct Collector(Mutex<Vec<Message>>);

    impl InboundHandler for Collector {
        fn on_message(&self, message: Message) {
            self.0.lock().push(message);
        }
    }

    fn request(intent: &RouteIntent, topic: &str) -> OutboundRequest {
        let descriptor = resolve(intent, topic).unwrap();
        let message = Message::outbound(&descriptor, Bytes::from_static(b"ping"), 1);
        OutboundRequest {
            descriptor,
            message,
            completion: None,
        }
    }

    #[tokio::test]
    async fn test_node_route_stamps_sender() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let bob = hub.attach("bob", "agency-b");
        let inbox = Arc::new(Collector::default());
        bob.bind_inbound(inbox.clone());

        alice
            .send_raw(request(&RouteIntent::node("bob"), "t"))
            .await
            .unwrap();

        let received = inbox.0.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].src_node(), Some(&b"alice"[..]));
        assert_eq!(received[0].src_inst.as_deref(), Some("agency-a"));
    }

    #[tokio::test]
    async fn test_unknown_node_is_unavailable() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let result = alice.send_raw(request(&RouteIntent::node("ghost"), "t")).await;
        assert!(matches!(result, Err(FrontError::TransportUnavailable(_))));
    }

    #[tokio::test]
    async fn test_topic_route_reaches_only_subscribers() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let bob = hub.attach("bob", "agency-b");
        let _carol = hub.attach("carol", "agency-b");
        bob.register_topic("orders").await.unwrap();

        let descriptor = resolve(&RouteIntent::topic("agency-b", "orders"), "").unwrap();
        assert_eq!(alice.select_nodes(&descriptor), vec![Bytes::from_static(b"bob")]);
    }

    #[tokio::test]
    async fn test_component_policy_controls_scope() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let bob = hub.attach("bob", "agency-b");
        bob.register_component("psi").await.unwrap();

        let scoped = resolve(&RouteIntent::component_in("agency-a", "psi"), "").unwrap();
        assert!(alice.select_nodes(&scoped).is_empty());

        alice.apply_component_policy(ComponentRoutePolicy::ComponentOnly);
        assert_eq!(alice.select_nodes(&scoped), vec![Bytes::from_static(b"bob")]);

        hub.set_policy(ComponentRoutePolicy::ComponentOnly);
        let carol = hub.attach("carol", "agency-c");
        assert_eq!(carol.select_nodes(&scoped), vec![Bytes::from_static(b"bob")]);
    }

    #[tokio::test]
    async fn test_response_settles_pending_request() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let bob = hub.attach("bob", "agency-b");
        let inbox = Arc::new(Collector::default());
        bob.bind_inbound(inbox.clone());

        let (completion, mut handle) =
            SendCompletion::channel("trace_1".into(), ResponseMode::Single, 4);
        let mut outbound = request(&RouteIntent::node("bob"), "t");
        outbound.message.trace_id = Some("trace_1".into());
        outbound.completion = Some(completion);
        alice.send_raw(outbound).await.unwrap();

        let reply = Message::new("", "pong").with_trace_id("trace_1");
        bob.send_response(Bytes::from_static(b"alice"), reply)
            .await
            .unwrap();

        let response = handle.response().await.unwrap();
        assert_eq!(response.payload(), b"pong");
        assert_eq!(response.src_node(), Some(&b"bob"[..]));
    }

    #[tokio::test]
    async fn test_faults_reject_operations() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        hub.faults().set_reject_registrations(true);
        hub.faults().set_reject_publish(true);
        hub.faults().set_fail_peer_listing(true);

        assert!(alice.register_topic("t").await.is_err());
        assert!(alice.publish_meta("{}".into()).await.is_err());
        assert!(alice.alive_peers().await.is_err());
    }

    #[tokio::test]
    async fn test_alive_peers_excludes_self() {
        let hub = MemoryHub::new();
        let alice = hub.attach("alice", "agency-a");
        let bob = hub.attach("bob", "agency-b");
        bob.register_component("c2").await.unwrap();
        bob.register_component("c1").await.unwrap();
        bob.publish_meta("{\"serviceInfos\":[]}".into()).await.unwrap();

        let peers = alice.alive_peers().await.unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].node_id, Bytes::from_static(b"bob"));
        assert_eq!(peers[0].components, vec!["c1".to_owned(), "c2".to_owned()]);

        assert!(hub.detach(b"bob"));
        assert!(alice.alive_peers().await.unwrap().is_empty());
    }
}
