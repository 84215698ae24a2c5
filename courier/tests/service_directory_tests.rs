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

use std::time::Duration;

use courier::directory::{alive_entry_points, ServiceDirectory};
use courier::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test]
async fn test_entry_points_carry_peer_components() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();
    server.register_service("svcA", "10.0.0.1:8080").await?;
    server.register_component("c1").await?;
    server.register_component("c2").await?;

    let summary = client.refresh_directory().await?;
    assert_eq!(summary.peers, 1);

    let entries = client.get_alive_entry_points("svcA");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].service_name, "svcA");
    assert_eq!(entries[0].entry_point, "10.0.0.1:8080");
    let mut components = entries[0].components.clone();
    components.sort();
    assert_eq!(components, vec!["c1".to_owned(), "c2".to_owned()]);
    Ok(())
}

#[test]
fn test_snapshot_with_malformed_peer_still_answers() {
    let peers = vec![
        PeerInfo::new("bad", "{\"serviceInfos\": [", ["x"]),
        PeerInfo::new(
            "good",
            r#"{"serviceInfos":[{"serviceName":"svcA","entryPoint":"10.0.0.1:8080"}]}"#,
            ["c1", "c2"],
        ),
    ];
    let entries = alive_entry_points(&peers, "SVCA");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_point, "10.0.0.1:8080");
    assert_eq!(entries[0].components, vec!["c1".to_owned(), "c2".to_owned()]);
}

#[tokio::test]
async fn test_register_service_appends() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, .. } = pair();
    server.register_service("svcA", "http://host:1").await?;
    server.register_service("svcA", "http://host:2").await?;

    let entry_points: Vec<String> = server
        .service_meta()
        .service_infos
        .into_iter()
        .map(|entry| entry.entry_point)
        .collect();
    assert_eq!(entry_points, vec!["http://host:1", "http://host:2"]);
    Ok(())
}

#[tokio::test]
async fn test_publish_failure_is_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { hub, server, client } = pair();
    server.register_service("svcA", "h:1").await?;
    hub.faults().set_reject_publish(true);

    let err = server.register_service("svcB", "h:2").await.unwrap_err();
    assert!(matches!(err, FrontError::MetadataPublishFailed(_)));
    assert!(err.is_retryable());

    client.refresh_directory().await?;
    assert_eq!(client.get_alive_entry_points("svcA").len(), 1);
    assert!(client.get_alive_entry_points("svcB").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_queries_follow_latest_snapshot() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { hub, server, client } = pair();
    server.register_service("svcA", "h:1").await?;
    client.refresh_directory().await?;
    assert_eq!(client.get_alive_entry_points("svcA").len(), 1);

    hub.detach(b"server");
    // Still the old snapshot until the next refresh.
    assert_eq!(client.get_alive_entry_points("svcA").len(), 1);
    client.refresh_directory().await?;
    assert!(client.get_alive_entry_points("svcA").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_background_discovery_refreshes() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = FrontConfig::default();
    config.discovery.refresh_interval_ms = 20;
    let Pair { server, client, .. } = pair_with(config);
    server.register_service("svcA", "h:1").await?;

    assert!(client.start());
    assert!(!client.start());
    let mut found = false;
    for _ in 0..50 {
        if !client.get_alive_entry_points("svcA").is_empty() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    client.shutdown().await?;
    assert!(found, "refresher never picked up the peer");
    Ok(())
}

#[tokio::test]
async fn test_get_peers_and_listing_failure() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { hub, client, .. } = pair();

    let peers = client.get_peers().await?;
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].node_id, Bytes::from_static(b"server"));

    hub.faults().set_fail_peer_listing(true);
    assert!(client.get_peers().await.is_err());
    assert!(client.refresh_directory().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_directory_without_front() {
    initialize_tracing();
    let hub = MemoryHub::new();
    let directory = ServiceDirectory::new(hub.attach("solo", "agency-a"));
    directory.refresh_from_peer_snapshot(vec![PeerInfo::new(
        "peer",
        r#"{"serviceInfos":[{"serviceName":"svcA","entryPoint":"10.0.0.9:80"}]}"#,
        Vec::<String>::new(),
    )]);

    let entries = directory.get_alive_entry_points("svcA");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url("/health"), "http://10.0.0.9:80/health");
}
