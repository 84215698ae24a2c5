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

use tokio_util::sync::CancellationToken;

use crate::common::FrontConfig;
use crate::directory::{NodeDiscovery, ServiceDirectory};
use crate::dispatch::{AsyncDispatcher, InboundRouter};
use crate::queue::{MailboxSet, SyncQueue};
use crate::registry::{NameRegistry, RegistryKind};
use crate::transport::Transport;

/// Everything one front instance owns.
///
/// Built once by [`Front::launch`](super::Front::launch) and shared behind an
/// `Arc` by every clone of the facade.
#[derive(Debug)]
pub(crate) struct FrontInner {
    pub(crate) config: FrontConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) topics: Arc<NameRegistry>,
    pub(crate) components: Arc<NameRegistry>,
    pub(crate) inbound: Arc<InboundRouter>,
    pub(crate) dispatcher: AsyncDispatcher,
    pub(crate) queue: SyncQueue,
    pub(crate) directory: Arc<ServiceDirectory>,
    pub(crate) discovery: NodeDiscovery,
    pub(crate) cancellation_token: CancellationToken,
}

impl FrontInner {
    pub(crate) fn new(transport: Arc<dyn Transport>, config: FrontConfig) -> Self {
        let topics = Arc::new(NameRegistry::new(RegistryKind::Topic, Arc::clone(&transport)));
        let components = Arc::new(NameRegistry::new(
            RegistryKind::Component,
            Arc::clone(&transport),
        ));
        let mailboxes = Arc::new(MailboxSet::default());
        let inbound = Arc::new(InboundRouter::new(Arc::clone(&mailboxes)));
        let dispatcher = AsyncDispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&topics),
            config.dispatch_settings(),
        );
        let queue = SyncQueue::new(
            Arc::clone(&transport),
            mailboxes,
            config.send_timeout(),
            config.pop_timeout(),
        );
        let directory = Arc::new(ServiceDirectory::new(Arc::clone(&transport)));
        let discovery = NodeDiscovery::new(
            Arc::clone(&transport),
            Arc::clone(&directory),
            config.refresh_interval(),
        );

        Self {
            config,
            transport,
            topics,
            components,
            inbound,
            dispatcher,
            queue,
            directory,
            discovery,
            cancellation_token: CancellationToken::new(),
        }
    }
}
