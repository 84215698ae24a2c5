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

use std::sync::Once;

use courier::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Logs go to `logs/courier_tests.txt`. Safe to call from every test.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "courier_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("courier=trace".parse().unwrap())
            .add_directive("courier::transport::memory=debug".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// A hub with two launched fronts: `server` in `agency-a` and `client` in
/// `agency-b`.
#[allow(dead_code)]
pub struct Pair {
    pub hub: MemoryHub,
    pub server: Front,
    pub client: Front,
}

/// Launches a [`Pair`] with default configuration.
#[allow(dead_code)]
pub fn pair() -> Pair {
    pair_with(FrontConfig::default())
}

/// Launches a [`Pair`] with `config` for both fronts.
#[allow(dead_code)]
pub fn pair_with(config: FrontConfig) -> Pair {
    let hub = MemoryHub::new();
    let server = Front::launch(hub.attach("server", "agency-a"), config.clone());
    let client = Front::launch(hub.attach("client", "agency-b"), config);
    Pair { hub, server, client }
}

/// Makes `front` answer every message on `topic` with `replies` copies of its
/// payload.
#[allow(dead_code)]
pub async fn echo(front: &Front, topic: &str, replies: usize) -> Result<(), FrontError> {
    let replier = front.clone();
    front
        .register_topic_handler(topic, move |request: Message| {
            let node = request.src_node.clone().unwrap_or_default();
            let trace_id = request.trace_id.clone().unwrap_or_default();
            for _ in 0..replies {
                let _ = replier.send_response(node.clone(), &trace_id, request.payload.clone(), request.seq);
            }
        })
        .await?;
    Ok(())
}
