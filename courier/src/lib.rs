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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Courier
//!
//! Courier is the routing front that sits between application code and a
//! byte transport. It lets service instances exchange payloads using four
//! addressing schemes and two delivery disciplines, and keeps a small
//! directory of the services that peers advertise.
//!
//! ## Key Concepts
//!
//! - **Routes (`RouteIntent`)**: one of node, agency, component or topic
//!   addressing. [`resolve`](crate::route::resolve) turns an intent into an
//!   immutable `RouteDescriptor` consumed by exactly one send.
//! - **Registries (`NameRegistry`)**: the topics and components this instance
//!   listens on. Every change is propagated to the transport before it becomes
//!   visible locally.
//! - **Async delivery (`AsyncDispatcher`)**: non-blocking sends that hand back a
//!   `SendHandle` with a single-fire error channel and a response channel.
//! - **Sync delivery (`SyncQueue`)**: `push` with a send-side timeout, and
//!   per-topic FIFO mailboxes drained by a blocking `pop` or inspected by `peek`.
//! - **Service directory (`ServiceDirectory`)**: derives alive entry points for a
//!   service name from the latest peer metadata snapshot and publishes this
//!   instance's own `ServiceMeta`.
//! - **Transport (`Transport`)**: the external collaborator. `MemoryHub` provides
//!   an in-process implementation used for embedding and tests.
//! - **Front (`Front`)**: the facade that wires all of the above together.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hub = MemoryHub::new();
//!     let alice = Front::launch(hub.attach("alice", "agency-a"), FrontConfig::default());
//!     let bob = Front::launch(hub.attach("bob", "agency-b"), FrontConfig::default());
//!
//!     alice
//!         .push(&RouteIntent::node("bob"), "greetings", "hello", 0, None)
//!         .await?;
//!     let message = bob.pop("greetings", None).await?;
//!     assert_eq!(message.payload(), b"hello");
//!     Ok(())
//! }
//! ```

/// The `Front` facade, configuration, and shared type aliases.
pub(crate) mod common;

/// Route intents, descriptors, and address resolution.
pub mod route;

/// Topic and component registries plus the inbound handler tables.
pub mod registry;

/// The `Message` value object and the `FrontError` type.
pub mod message;

/// Non-blocking sends, completion channels, and inbound routing.
pub mod dispatch;

/// Per-topic mailboxes and the synchronous push/pop/peek surface.
pub mod queue;

/// Service metadata, the service directory, and the discovery refresher.
pub mod directory;

/// The external transport contract and the in-process `MemoryHub`.
pub mod transport;

pub use common::{
    DiscoveryConfig, Front, FrontConfig, LimitsConfig, MessageHandler, RoutingConfig,
    TimeoutConfig,
};

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// *   [`crate::Front`]: The facade that owns registries, dispatcher, queues and directory.
/// *   [`crate::FrontConfig`]: Configuration loaded from XDG-compliant locations.
/// *   [`crate::route::RouteIntent`]: The four addressing schemes.
/// *   [`crate::route::RouteType`]: Wire discriminant of a route.
/// *   [`crate::route::RouteDescriptor`]: The resolved, immutable routing header.
/// *   [`crate::route::ComponentRoutePolicy`]: How agency and component combine.
/// *   [`crate::message::Message`]: The payload carried by every send.
/// *   [`crate::message::FrontError`]: The error type of every public operation.
/// *   [`crate::dispatch::SendHandle`]: Completion channels of a request-style send.
/// *   [`crate::dispatch::DeliveryReceipt`]: Completion of a one-way send or response.
/// *   [`crate::dispatch::ResponseMode`]: Single-fire or streaming responses.
/// *   [`crate::directory::EntryPointMeta`]: One reachable entry point of a service.
/// *   [`crate::directory::ServiceMeta`]: The services one instance advertises.
/// *   [`crate::transport::Transport`]: The external byte transport contract.
/// *   [`crate::transport::MemoryHub`]: In-process transport hub.
/// *   [`crate::transport::PeerInfo`]: One entry of a peer snapshot.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use bytes::Bytes;

    pub use crate::common::{Front, FrontConfig};
    pub use crate::directory::{EntryPointMeta, ServiceMeta};
    pub use crate::dispatch::{DeliveryReceipt, ResponseMode, SendHandle};
    pub use crate::message::{FrontError, Message};
    pub use crate::route::{ComponentRoutePolicy, RouteDescriptor, RouteIntent, RouteType};
    pub use crate::transport::{MemoryHub, MemoryTransport, PeerInfo, Transport};
}
