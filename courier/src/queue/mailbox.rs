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

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::message::{FrontError, Message};

/// A FIFO of messages for one topic.
///
/// Unbounded; backpressure belongs to the transport.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
}

impl Mailbox {
    /// Appends a message and wakes one waiting consumer.
    pub fn push(&self, message: Message) {
        self.queue.lock().push_back(message);
        self.notify.notify_one();
    }

    /// Removes the oldest message, if any.
    pub fn try_pop(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Clones the oldest message without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<Message> {
        self.queue.lock().front().cloned()
    }

    /// Waits up to `timeout` for a message.
    pub async fn pop(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking, so a push between the check and the
            // wait is not missed.
            notified.as_mut().enable();
            if let Some(message) = self.try_pop() {
                return Some(message);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the mailbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Discards every queued message, returning how many there were.
    ///
    /// Waiting consumers keep waiting on this mailbox.
    pub fn clear(&self) -> usize {
        self.queue.lock().drain(..).count()
    }
}

/// Mailboxes keyed by topic, created on first use.
#[derive(Debug, Default)]
pub struct MailboxSet {
    mailboxes: DashMap<String, Arc<Mailbox>>,
}

impl MailboxSet {
    /// Queues `message` in its topic's mailbox.
    pub fn push(&self, message: Message) {
        trace!(topic = %message.topic, seq = message.seq, "Queueing inbound message");
        self.mailbox(&message.topic).push(message);
    }

    /// Waits up to `timeout` for the oldest message on `topic`.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] if `topic` is blank.
    /// * [`FrontError::Timeout`] if nothing arrived in time. An empty message
    ///   is never returned instead.
    pub async fn pop(&self, topic: &str, timeout: Duration) -> Result<Message, FrontError> {
        check_topic(topic)?;
        let mailbox = self.mailbox(topic);
        match mailbox.pop(timeout).await {
            Some(message) => {
                trace!(topic, seq = message.seq, "Popped message");
                Ok(message)
            }
            None => Err(FrontError::Timeout(format!(
                "no message on topic '{topic}' within {timeout:?}"
            ))),
        }
    }

    /// Returns a copy of the oldest message on `topic` without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::InvalidAddress`] if `topic` is blank.
    pub fn peek(&self, topic: &str) -> Result<Option<Message>, FrontError> {
        check_topic(topic)?;
        Ok(self
            .mailboxes
            .get(topic)
            .and_then(|mailbox| mailbox.peek()))
    }

    /// Discards the messages queued on `topic`, returning how many it held.
    ///
    /// The mailbox itself stays in place, so a `pop` already waiting on the
    /// topic still sees later pushes.
    pub fn remove(&self, topic: &str) -> usize {
        self.mailboxes.get(topic).map_or(0, |mailbox| mailbox.clear())
    }

    /// Number of messages queued on `topic`.
    #[must_use]
    pub fn len(&self, topic: &str) -> usize {
        self.mailboxes.get(topic).map_or(0, |mailbox| mailbox.len())
    }

    fn mailbox(&self, topic: &str) -> Arc<Mailbox> {
        if let Some(mailbox) = self.mailboxes.get(topic) {
            return Arc::clone(mailbox.value());
        }
        Arc::clone(self.mailboxes.entry(topic.to_owned()).or_default().value())
    }
}

fn check_topic(topic: &str) -> Result<(), FrontError> {
    if topic.trim().is_empty() {
        return Err(FrontError::InvalidAddress("topic is blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_per_topic() {
        let set = MailboxSet::default();
        for seq in 1..=3 {
            set.push(Message::new("t", "x").with_seq(seq));
        }
        set.push(Message::new("other", "y"));
        for seq in 1..=3 {
            assert_eq!(set.pop("t", Duration::from_millis(10)).await.unwrap().seq, seq);
        }
        assert_eq!(set.len("other"), 1);
    }

    #[tokio::test]
    async fn test_peek_does_not_remove() {
        let set = MailboxSet::default();
        assert_eq!(set.peek("t").unwrap(), None);
        set.push(Message::new("t", "x").with_seq(9));
        let peeked = set.peek("t").unwrap().unwrap();
        let popped = set.pop("t", Duration::from_millis(10)).await.unwrap();
        assert_eq!(peeked, popped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_times_out() {
        let set = MailboxSet::default();
        let started = Instant::now();
        let result = set.pop("t", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(FrontError::Timeout(_))));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let set = Arc::new(MailboxSet::default());
        let consumer = {
            let set = Arc::clone(&set);
            tokio::spawn(async move { set.pop("t", Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        set.push(Message::new("t", "late"));
        let message = consumer.await.unwrap().unwrap();
        assert_eq!(message.payload(), b"late");
    }

    #[tokio::test]
    async fn test_blank_topic_is_invalid() {
        let set = MailboxSet::default();
        assert!(matches!(set.peek(" "), Err(FrontError::InvalidAddress(_))));
        assert!(matches!(
            set.pop("", Duration::from_millis(1)).await,
            Err(FrontError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_remove_discards_messages() {
        let set = MailboxSet::default();
        set.push(Message::new("t", "a"));
        set.push(Message::new("t", "b"));
        assert_eq!(set.remove("t"), 2);
        assert_eq!(set.len("t"), 0);
        assert_eq!(set.remove("never-used"), 0);
    }

    #[tokio::test]
    async fn test_waiting_pop_survives_remove() {
        let set = Arc::new(MailboxSet::default());
        let consumer = {
            let set = Arc::clone(&set);
            tokio::spawn(async move { set.pop("t", Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(set.remove("t"), 0);
        set.push(Message::new("t", "fresh"));
        let message = consumer.await.unwrap().unwrap();
        assert_eq!(message.payload(), b"fresh");
        assert_eq!(set.len("t"), 0);
    }
}
