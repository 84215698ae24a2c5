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

//! The transport contract the front is built on.
//!
//! The front never touches sockets. It hands resolved routes and messages to a
//! [`Transport`], registers the names it listens on through it, publishes its
//! service metadata through it, and reads peer snapshots from it. Inbound
//! traffic comes back through the [`InboundHandler`] bound at launch.
//!
//! [`MemoryHub`] is a complete in-process implementation: every attached
//! [`MemoryTransport`] is one node sharing the hub's routing table.

pub use memory::{FaultSwitches, MemoryHub, MemoryTransport};
pub use traits::{InboundHandler, OutboundRequest, PeerInfo, Transport};

/// Defines the in-process hub transport.
mod memory;
/// Defines the transport and inbound handler traits.
mod traits;
