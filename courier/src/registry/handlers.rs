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

use std::fmt;

use dashmap::DashMap;

use crate::common::MessageHandler;

/// Inbound handlers keyed by topic or component name.
#[derive(Default)]
pub struct HandlerTable {
    handlers: DashMap<String, MessageHandler>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl HandlerTable {
    /// Binds `handler` to `name`, returning the handler it replaced.
    pub fn insert(&self, name: impl Into<String>, handler: MessageHandler) -> Option<MessageHandler> {
        self.handlers.insert(name.into(), handler)
    }

    /// Removes the handler bound to `name`.
    pub fn remove(&self, name: &str) -> Option<MessageHandler> {
        self.handlers.remove(name).map(|(_, handler)| handler)
    }

    /// Returns the handler bound to `name`.
    ///
    /// The handler is cloned out so no map lock is held while it runs.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MessageHandler> {
        self.handlers.get(name).map(|entry| entry.value().clone())
    }

    /// Whether a handler is bound to `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
