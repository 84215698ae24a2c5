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

//! Service discovery derived from peer metadata.
//!
//! Every instance advertises a [`ServiceMeta`] blob. The [`ServiceDirectory`]
//! keeps the latest snapshot of peer blobs and answers "where is service X"
//! by re-deriving entry points from that snapshot on every query.
//! [`NodeDiscovery`] refreshes the snapshot from the transport periodically.

pub use discovery::NodeDiscovery;
pub use service_directory::{alive_entry_points, RefreshSummary, ServiceDirectory};
pub use service_meta::{EntryPointMeta, ServiceMeta};

/// Defines the periodic snapshot refresher.
mod discovery;
/// Defines [`ServiceDirectory`].
mod service_directory;
/// Defines the metadata schema.
mod service_meta;
