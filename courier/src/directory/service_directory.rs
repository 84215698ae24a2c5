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
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use super::{EntryPointMeta, ServiceMeta};
use crate::message::FrontError;
use crate::transport::{PeerInfo, Transport};

/// Counts from one snapshot refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshSummary {
    /// Peers in the new snapshot.
    pub peers: usize,
    /// Peers whose metadata blob could not be parsed.
    pub malformed: usize,
}

/// The queryable view of which services are alive where.
///
/// Holds the latest peer snapshot as an immutable `Arc<Vec<_>>` that is swapped
/// whole on refresh, so queries never see a half-applied snapshot. Queries
/// re-derive their answer from that snapshot every time.
pub struct ServiceDirectory {
    transport: Arc<dyn Transport>,
    snapshot: RwLock<Arc<Vec<PeerInfo>>>,
    own_meta: RwLock<ServiceMeta>,
    publish_lock: tokio::sync::Mutex<()>,
}

impl fmt::Debug for ServiceDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDirectory")
            .field("peers", &self.snapshot.read().len())
            .field("own_services", &self.own_meta.read().service_infos.len())
            .finish_non_exhaustive()
    }
}

impl ServiceDirectory {
    /// Creates an empty directory publishing through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            own_meta: RwLock::new(ServiceMeta::default()),
            publish_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the peer snapshot.
    pub fn refresh_from_peer_snapshot(&self, peers: Vec<PeerInfo>) -> RefreshSummary {
        let malformed = peers
            .iter()
            .filter(|peer| !peer.meta.trim().is_empty() && ServiceMeta::parse(&peer.meta).is_err())
            .count();
        let summary = RefreshSummary {
            peers: peers.len(),
            malformed,
        };
        *self.snapshot.write() = Arc::new(peers);
        debug!(peers = summary.peers, malformed = summary.malformed, "Refreshed peer snapshot");
        summary
    }

    /// The current peer snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<PeerInfo>> {
        Arc::clone(&self.snapshot.read())
    }

    /// Entry points of `service_name` across the current snapshot.
    #[must_use]
    pub fn get_alive_entry_points(&self, service_name: &str) -> Vec<EntryPointMeta> {
        let snapshot = self.snapshot();
        alive_entry_points(&snapshot, service_name)
    }

    /// Advertises `entry_point` for `service_name` in this instance's metadata.
    ///
    /// Entries are appended, so registering a service twice advertises both
    /// entry points. The new metadata is kept only if publishing succeeds.
    ///
    /// # Errors
    ///
    /// * [`FrontError::InvalidAddress`] if either argument is blank.
    /// * [`FrontError::MetadataPublishFailed`] if serialization or publication
    ///   fails.
    #[instrument(skip(self))]
    pub async fn register_service(&self, service_name: &str, entry_point: &str) -> Result<(), FrontError> {
        if service_name.trim().is_empty() || entry_point.trim().is_empty() {
            return Err(FrontError::InvalidAddress(format!(
                "service '{service_name}' needs a name and an entry point"
            )));
        }
        let _publish = self.publish_lock.lock().await;
        let mut next = self.own_meta.read().clone();
        next.add_entry_point(EntryPointMeta::new(service_name, entry_point));
        let blob = next.to_json()?;
        self.transport
            .publish_meta(blob)
            .await
            .map_err(|err| FrontError::MetadataPublishFailed(format!("service '{service_name}': {err}")))?;
        *self.own_meta.write() = next;
        info!("Registered service");
        Ok(())
    }

    /// A copy of this instance's advertised metadata.
    #[must_use]
    pub fn service_meta(&self) -> ServiceMeta {
        self.own_meta.read().clone()
    }
}

/// Derives the entry points of `service_name` from `peers`.
///
/// Service names match case-insensitively. Each match carries the advertising
/// peer's components after any listed in the blob itself. Peers with an empty
/// or malformed blob are skipped; one bad peer never hides the others.
#[must_use]
pub fn alive_entry_points(peers: &[PeerInfo], service_name: &str) -> Vec<EntryPointMeta> {
    let wanted = service_name.to_lowercase();
    let mut found = Vec::new();
    for peer in peers {
        if peer.meta.trim().is_empty() {
            trace!(node = %String::from_utf8_lossy(&peer.node_id), "Peer advertises no metadata");
            continue;
        }
        let meta = match ServiceMeta::parse(&peer.meta) {
            Ok(meta) => meta,
            Err(error) => {
                warn!(
                    node = %String::from_utf8_lossy(&peer.node_id),
                    %error,
                    "Ignoring peer with malformed metadata"
                );
                continue;
            }
        };
        found.extend(
            meta.service_infos
                .into_iter()
                .filter(|entry| entry.service_name.to_lowercase() == wanted)
                .map(|mut entry| {
                    entry.components.extend(peer.components.iter().cloned());
                    entry
                }),
        );
    }
    found
}
