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

//! Non-blocking sends and inbound routing.
//!
//! [`AsyncDispatcher`] resolves a route, hands the message to the transport on
//! a spawned task, and returns immediately with the send's completion
//! channels. [`InboundRouter`] is the other direction: it decides whether an
//! inbound message goes to a registered handler or into its topic's mailbox.

pub use completion::{DeliveryReceipt, ResponseMode, SendCompletion, SendHandle};
pub use dispatcher::{AsyncDispatcher, DispatchSettings};
pub use inbound::{Delivery, InboundRouter};

/// Defines the completion channels of a send.
mod completion;
/// Defines [`AsyncDispatcher`].
mod dispatcher;
/// Defines [`InboundRouter`].
mod inbound;
