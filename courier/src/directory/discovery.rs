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
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::{RefreshSummary, ServiceDirectory};
use crate::message::FrontError;
use crate::transport::Transport;

struct Refresher {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps a [`ServiceDirectory`] fed with fresh peer snapshots.
///
/// The refresher runs on its own task once [`start`](Self::start)ed and stops
/// when its cancellation token (a child of the front's token) fires.
pub struct NodeDiscovery {
    transport: Arc<dyn Transport>,
    directory: Arc<ServiceDirectory>,
    interval: Duration,
    refresher: Mutex<Option<Refresher>>,
}

impl std::fmt::Debug for NodeDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDiscovery")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl NodeDiscovery {
    /// Creates a refresher for `directory` that ticks every `interval`.
    pub fn new(
        transport: Arc<dyn Transport>,
        directory: Arc<ServiceDirectory>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            directory,
            interval,
            refresher: Mutex::new(None),
        }
    }

    /// Fetches the transport's peer list once and installs it.
    ///
    /// # Errors
    ///
    /// Returns whatever the transport reports when listing peers fails. The
    /// previous snapshot is kept in that case.
    pub async fn refresh_once(&self) -> Result<RefreshSummary, FrontError> {
        refresh(self.transport.as_ref(), &self.directory).await
    }

    /// Whether the background refresher is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.refresher
            .lock()
            .as_ref()
            .is_some_and(|refresher| !refresher.handle.is_finished())
    }

    /// Spawns the background refresher. Returns `false` if it already runs.
    pub fn start(&self, parent: &CancellationToken) -> bool {
        let mut slot = self.refresher.lock();
        if slot.as_ref().is_some_and(|refresher| !refresher.handle.is_finished()) {
            return false;
        }
        let token = parent.child_token();
        let transport = Arc::clone(&self.transport);
        let directory = Arc::clone(&self.directory);
        let period = self.interval.max(Duration::from_millis(1));
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => {
                        trace!("Discovery refresher cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = refresh(transport.as_ref(), &directory).await {
                            error!(%err, "Discovery refresh failed");
                        }
                    }
                }
            }
        });
        debug!(interval = ?self.interval, "Discovery refresher started");
        *slot = Some(Refresher { token, handle });
        true
    }

    /// Cancels the refresher and waits up to `timeout` for it to finish.
    ///
    /// # Errors
    ///
    /// Fails if the task does not finish in time or ended with a panic.
    pub async fn stop(&self, timeout: Duration) -> anyhow::Result<()> {
        let refresher = self.refresher.lock().take();
        let Some(Refresher { token, handle }) = refresher else {
            return Ok(());
        };
        token.cancel();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                debug!("Discovery refresher stopped");
                Ok(())
            }
            Ok(Err(join_error)) => Err(anyhow::anyhow!("discovery refresher failed: {join_error}")),
            Err(_) => Err(anyhow::anyhow!(
                "discovery refresher did not stop within {} ms",
                timeout.as_millis()
            )),
        }
    }
}

async fn refresh(
    transport: &dyn Transport,
    directory: &ServiceDirectory,
) -> Result<RefreshSummary, FrontError> {
    let peers = transport.alive_peers().await?;
    Ok(directory.refresh_from_peer_snapshot(peers))
}
