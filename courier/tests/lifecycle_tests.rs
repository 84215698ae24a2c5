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

use courier::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test]
async fn test_disabled_discovery_does_not_start() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = FrontConfig::default();
    config.discovery.enabled = false;
    let Pair { client, .. } = pair_with(config);

    assert!(!client.start());
    client.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_without_start() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, .. } = pair();
    server.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_clones_share_state() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();
    let alias = server.clone();

    alias.register_topic("shared").await?;
    assert!(server.is_topic_registered("shared"));

    client
        .push(&RouteIntent::node("server"), "shared", "x", 0, None)
        .await?;
    assert!(alias.pop("shared", Some(Duration::from_millis(200))).await.is_ok());
    assert!(server.peek("shared")?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_front_reports_identity_and_config() {
    initialize_tracing();
    let mut config = FrontConfig::default();
    config.timeouts.pop_timeout_ms = 10;
    let Pair { server, .. } = pair_with(config);

    assert_eq!(server.node_id(), Bytes::from_static(b"server"));
    assert_eq!(server.agency(), "agency-a");
    assert_eq!(server.config().pop_timeout(), Duration::from_millis(10));

    // The configured pop timeout applies when none is given.
    assert!(server.pop("nothing", None).await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_detached_node_is_unreachable() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { hub, client, .. } = pair();
    assert!(hub.detach(b"server"));

    assert!(matches!(
        client.push(&RouteIntent::node("server"), "t", "x", 0, None).await,
        Err(FrontError::TransportUnavailable(_))
    ));
    Ok(())
}
