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
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, trace};

use crate::message::FrontError;
use crate::transport::Transport;

/// Which transport routing table a [`NameRegistry`] maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    /// Topics this instance receives.
    Topic,
    /// Components this instance hosts.
    Component,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic => f.write_str("topic"),
            Self::Component => f.write_str("component"),
        }
    }
}

/// The set of topic or component names registered by this instance.
///
/// Registration is idempotent and not reference counted: registering twice is
/// a no-op and a single unregister removes the name.
///
/// # Consistency
///
/// Mutations are serialized by an async writer lock and are propagated to the
/// transport *before* they are applied locally. A failed propagation leaves the
/// set exactly as it was, and readers only ever see whole registrations.
pub struct NameRegistry {
    kind: RegistryKind,
    transport: Arc<dyn Transport>,
    names: RwLock<HashSet<String>>,
    writer: tokio::sync::Mutex<()>,
}

impl fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRegistry")
            .field("kind", &self.kind)
            .field("names", &self.names.read().len())
            .finish_non_exhaustive()
    }
}

impl NameRegistry {
    /// Creates an empty registry propagating to `transport`.
    pub fn new(kind: RegistryKind, transport: Arc<dyn Transport>) -> Self {
        Self {
            kind,
            transport,
            names: RwLock::new(HashSet::new()),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers `name`. Returns `false` if it was already registered.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] if `name` is blank.
    /// * [`FrontError::RegistrationFailed`] if the transport rejects it.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn register(&self, name: &str) -> Result<bool, FrontError> {
        self.check_name(name)?;
        let _writer = self.writer.lock().await;
        if self.names.read().contains(name) {
            trace!("Already registered");
            return Ok(false);
        }
        self.propagate(name, true).await?;
        self.names.write().insert(name.to_owned());
        debug!("Registered");
        Ok(true)
    }

    /// Unregisters `name`. Returns `false` if it was not registered.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] if `name` is blank.
    /// * [`FrontError::RegistrationFailed`] if the transport rejects it; the
    ///   name then stays registered.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn unregister(&self, name: &str) -> Result<bool, FrontError> {
        self.check_name(name)?;
        let _writer = self.writer.lock().await;
        if !self.names.read().contains(name) {
            trace!("Not registered");
            return Ok(false);
        }
        self.propagate(name, false).await?;
        self.names.write().remove(name);
        debug!("Unregistered");
        Ok(true)
    }

    /// Whether `name` is currently registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.names.read().contains(name)
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    fn check_name(&self, name: &str) -> Result<(), FrontError> {
        if name.trim().is_empty() {
            return Err(FrontError::InvalidAddress(format!("{} name is blank", self.kind)));
        }
        Ok(())
    }

    async fn propagate(&self, name: &str, add: bool) -> Result<(), FrontError> {
        let result = match (self.kind, add) {
            (RegistryKind::Topic, true) => self.transport.register_topic(name).await,
            (RegistryKind::Topic, false) => self.transport.unregister_topic(name).await,
            (RegistryKind::Component, true) => self.transport.register_component(name).await,
            (RegistryKind::Component, false) => self.transport.unregister_component(name).await,
        };
        result.map_err(|err| FrontError::RegistrationFailed {
            name: name.to_owned(),
            cause: err.to_string(),
        })
    }
}
