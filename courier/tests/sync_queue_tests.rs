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

use std::time::{Duration, Instant};

use courier::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test]
async fn test_pop_on_empty_topic_times_out() {
    initialize_tracing();
    let Pair { server, .. } = pair();

    let started = Instant::now();
    let err = server
        .pop("T", Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    let waited = started.elapsed();

    assert!(matches!(err, FrontError::Timeout(ref cause) if cause.contains("'T'")));
    assert!(waited >= Duration::from_millis(100), "returned after {waited:?}");
    assert!(waited < Duration::from_millis(1_000), "returned after {waited:?}");
}

#[tokio::test]
async fn test_push_then_pop_is_fifo() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();

    for (seq, payload) in [(1, "M1"), (2, "M2"), (3, "M3")] {
        client
            .push(&RouteIntent::node("server"), "T", payload, seq, None)
            .await?;
    }
    for expected in ["M1", "M2", "M3"] {
        let message = server.pop("T", Some(Duration::from_millis(500))).await?;
        assert_eq!(message.payload(), expected.as_bytes());
    }
    Ok(())
}

#[tokio::test]
async fn test_peek_matches_following_pop() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();

    assert!(server.peek("T")?.is_none());
    client
        .push(&RouteIntent::node("server"), "T", "only", 5, None)
        .await?;

    let peeked = server.peek("T")?.expect("queued message");
    let again = server.peek("T")?.expect("still queued");
    let popped = server.pop("T", Some(Duration::from_millis(500))).await?;
    assert_eq!(peeked, again);
    assert_eq!(peeked, popped);
    assert!(server.peek("T")?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_topics_are_independent() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();

    client
        .push(&RouteIntent::node("server"), "A", "a", 1, None)
        .await?;
    client
        .push(&RouteIntent::node("server"), "B", "b", 2, None)
        .await?;

    assert_eq!(server.pop("B", Some(Duration::from_millis(200))).await?.seq, 2);
    assert_eq!(server.pop("A", Some(Duration::from_millis(200))).await?.seq, 1);
    Ok(())
}

#[tokio::test]
async fn test_blocked_pop_wakes_on_push() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();

    let consumer = tokio::spawn({
        let server = server.clone();
        async move { server.pop("late", Some(Duration::from_secs(5))).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    client
        .push(&RouteIntent::node("server"), "late", "finally", 9, None)
        .await?;

    let message = consumer.await??;
    assert_eq!(message.seq, 9);
    Ok(())
}

#[tokio::test]
async fn test_stalled_transport_fails_push_with_timeout() {
    initialize_tracing();
    let Pair { hub, client, .. } = pair();
    hub.faults().set_stall_sends(true);

    let err = client
        .push(
            &RouteIntent::node("server"),
            "T",
            "x",
            0,
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_push_errors_are_reported() {
    initialize_tracing();
    let Pair { client, .. } = pair();

    assert!(matches!(
        client.push(&RouteIntent::agency(""), "T", "x", 0, None).await,
        Err(FrontError::InvalidAddress(_))
    ));
    assert!(matches!(
        client.push(&RouteIntent::node("ghost"), "T", "x", 0, None).await,
        Err(FrontError::TransportUnavailable(_))
    ));
    assert!(matches!(
        client.pop(" ", Some(Duration::from_millis(1))).await,
        Err(FrontError::InvalidAddress(_))
    ));
}

#[tokio::test]
async fn test_remove_topic_discards_queue() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();
    server.register_topic("T").await?;

    client
        .push(&RouteIntent::topic("agency-a", "T"), "", "x", 0, None)
        .await?;
    client
        .push(&RouteIntent::topic("agency-a", "T"), "", "y", 1, None)
        .await?;

    assert_eq!(server.remove_topic("T").await?, 2);
    assert!(!server.is_topic_registered("T"));
    assert!(server.peek("T")?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_waiting_pop_sees_push_after_remove_topic() -> anyhow::Result<()> {
    initialize_tracing();
    let Pair { server, client, .. } = pair();

    let consumer = {
        let server = server.clone();
        tokio::spawn(async move { server.pop("T", Some(Duration::from_millis(500))).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.remove_topic("T").await?, 0);

    client
        .push(&RouteIntent::node("server"), "T", "after-remove", 1, None)
        .await?;
    let message = consumer.await??;
    assert_eq!(message.payload(), b"after-remove");
    assert!(server.peek("T")?.is_none());
    Ok(())
}
