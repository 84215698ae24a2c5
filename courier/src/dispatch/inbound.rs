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

use tracing::{trace, warn};

use crate::message::Message;
use crate::queue::MailboxSet;
use crate::registry::HandlerTable;
use crate::transport::InboundHandler;

/// Where an inbound message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Passed to the handler registered for its topic.
    TopicHandler,
    /// Passed to the handler registered for its destination component.
    ComponentHandler,
    /// Appended to its topic's mailbox.
    Queued,
    /// Discarded: no handler matched and it has no topic to queue under.
    Dropped,
}

/// Routes each inbound message to exactly one consumer.
///
/// A topic handler wins over a component handler, and either wins over the
/// mailbox. A message is never handed to two consumers.
///
/// Messages with a blank topic and no matching handler are dropped with a
/// warning, since no `pop` could ever reach them.
#[derive(Debug)]
pub struct InboundRouter {
    topic_handlers: HandlerTable,
    component_handlers: HandlerTable,
    mailboxes: Arc<MailboxSet>,
}

impl InboundRouter {
    /// Creates a router that queues into `mailboxes` when no handler matches.
    #[must_use]
    pub fn new(mailboxes: Arc<MailboxSet>) -> Self {
        Self {
            topic_handlers: HandlerTable::default(),
            component_handlers: HandlerTable::default(),
            mailboxes,
        }
    }

    /// Handlers keyed by topic.
    #[must_use]
    pub const fn topic_handlers(&self) -> &HandlerTable {
        &self.topic_handlers
    }

    /// Handlers keyed by component.
    #[must_use]
    pub const fn component_handlers(&self) -> &HandlerTable {
        &self.component_handlers
    }

    /// Delivers `message` and reports where it went.
    pub fn route(&self, message: Message) -> Delivery {
        if let Some(handler) = self.topic_handlers.get(&message.topic) {
            trace!(topic = %message.topic, "Inbound message to topic handler");
            handler(message);
            return Delivery::TopicHandler;
        }
        let component_handler = message
            .dst_component
            .as_deref()
            .and_then(|component| self.component_handlers.get(component));
        if let Some(handler) = component_handler {
            trace!(topic = %message.topic, "Inbound message to component handler");
            handler(message);
            return Delivery::ComponentHandler;
        }
        if message.topic.trim().is_empty() {
            warn!(trace_id = ?message.trace_id, "Dropping inbound message with no receiver");
            return Delivery::Dropped;
        }
        self.mailboxes.push(message);
        Delivery::Queued
    }
}

impl InboundHandler for InboundRouter {
    fn on_message(&self, message: Message) {
        self.route(message);
    }
}
