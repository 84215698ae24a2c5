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

//! The synchronous delivery discipline.
//!
//! Inbound messages without a handler land in a per-topic [`Mailbox`]. The
//! [`SyncQueue`] drains those mailboxes with a blocking `pop`, inspects them
//! with `peek`, and sends with a bounded `push`.

pub use mailbox::{Mailbox, MailboxSet};
pub use sync_queue::SyncQueue;

/// Defines [`Mailbox`] and [`MailboxSet`].
mod mailbox;
/// Defines [`SyncQueue`].
mod sync_queue;
