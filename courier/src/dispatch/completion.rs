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
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::message::{FrontError, Message};

/// Whether one send may be answered more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// The first correlated response completes the send.
    #[default]
    Single,
    /// Responses keep flowing until the send's timeout elapses.
    Streaming,
}

// Both senders sit behind one lock so that answering and failing a send are
// mutually exclusive.
struct Channels {
    error_tx: Option<oneshot::Sender<FrontError>>,
    response_tx: Option<mpsc::Sender<Message>>,
}

struct CompletionInner {
    trace_id: String,
    mode: ResponseMode,
    channels: Mutex<Channels>,
    responses: AtomicUsize,
    settled: AtomicBool,
    done: CancellationToken,
}

/// The producer side of a send's completion channels.
///
/// Held by the transport (to deliver correlated responses) and by the
/// dispatcher (to report failures and the timeout). Cloning is cheap and all
/// clones settle the same send.
///
/// * The error channel fires at most once. A response, a failure, or
///   completion all close it.
/// * The response channel is bounded. When the receiver falls behind, extra
///   responses are dropped with a warning rather than blocking the transport.
#[derive(Clone)]
pub struct SendCompletion {
    inner: Arc<CompletionInner>,
}

impl fmt::Debug for SendCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendCompletion")
            .field("trace_id", &self.inner.trace_id)
            .field("mode", &self.inner.mode)
            .field("responses", &self.response_count())
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl SendCompletion {
    fn new(
        trace_id: String,
        mode: ResponseMode,
        error_tx: oneshot::Sender<FrontError>,
        response_tx: Option<mpsc::Sender<Message>>,
    ) -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                trace_id,
                mode,
                channels: Mutex::new(Channels {
                    error_tx: Some(error_tx),
                    response_tx,
                }),
                responses: AtomicUsize::new(0),
                settled: AtomicBool::new(false),
                done: CancellationToken::new(),
            }),
        }
    }

    /// Creates the channels of a request-style send.
    #[must_use]
    pub fn channel(trace_id: String, mode: ResponseMode, buffer: usize) -> (Self, SendHandle) {
        let (error_tx, errors) = oneshot::channel();
        let (response_tx, responses) = mpsc::channel(buffer.max(1));
        let handle = SendHandle {
            trace_id: trace_id.clone(),
            errors,
            errors_done: false,
            responses,
        };
        (Self::new(trace_id, mode, error_tx, Some(response_tx)), handle)
    }

    /// Creates the error channel of a one-way send or a response.
    #[must_use]
    pub fn error_only(trace_id: String) -> (Self, DeliveryReceipt) {
        let (error_tx, errors) = oneshot::channel();
        (
            Self::new(trace_id, ResponseMode::Single, error_tx, None),
            DeliveryReceipt { errors },
        )
    }

    /// The trace id correlating this send with its responses.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    /// Number of responses accepted so far.
    #[must_use]
    pub fn response_count(&self) -> usize {
        self.inner.responses.load(Ordering::Acquire)
    }

    /// Whether the send has completed or failed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::Acquire)
    }

    /// Resolves once the send has completed or failed.
    pub async fn settled(&self) {
        self.inner.done.cancelled().await;
    }

    /// Delivers one correlated response. Returns `true` if it was accepted.
    pub fn respond(&self, message: Message) -> bool {
        let mut channels = self.inner.channels.lock();
        let Some(sender) = channels.response_tx.as_ref() else {
            trace!(trace_id = %self.inner.trace_id, "Dropping response for settled send");
            return false;
        };

        let accepted = match sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(trace_id = %self.inner.trace_id, "Response channel full, dropping response");
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!(trace_id = %self.inner.trace_id, "Response receiver gone");
                false
            }
        };
        if accepted {
            // Once answered, the send can no longer fail.
            drop(channels.error_tx.take());
            self.inner.responses.fetch_add(1, Ordering::AcqRel);
            if self.inner.mode == ResponseMode::Single {
                self.settle(&mut channels);
            }
        }
        accepted
    }

    /// Reports `error`. Fires at most once; later calls return `false`.
    pub fn fail(&self, error: FrontError) -> bool {
        let mut channels = self.inner.channels.lock();
        let fired = match channels.error_tx.take() {
            Some(error_tx) => {
                trace!(trace_id = %self.inner.trace_id, %error, "Send failed");
                // The receiver may already be gone; that is not our concern.
                let _ = error_tx.send(error);
                true
            }
            None => false,
        };
        self.settle(&mut channels);
        fired
    }

    /// Settles the send once `timeout` has elapsed.
    ///
    /// Fails with [`FrontError::Timeout`] if nothing answered, completes
    /// otherwise. Returns `true` if it timed out.
    pub fn expire(&self, timeout: Duration) -> bool {
        let unanswered = self.inner.responses.load(Ordering::Acquire) == 0;
        if unanswered {
            return self.fail(FrontError::Timeout(format!(
                "no response to {} within {timeout:?}",
                self.inner.trace_id
            )));
        }
        self.complete();
        false
    }

    /// Closes both channels without an error.
    pub fn complete(&self) {
        let mut channels = self.inner.channels.lock();
        drop(channels.error_tx.take());
        self.settle(&mut channels);
    }

    fn settle(&self, channels: &mut Channels) {
        drop(channels.response_tx.take());
        if self
            .inner
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.done.cancel();
        }
    }
}

/// The consumer side of a request-style send.
///
/// Yields every accepted response, then the error if the send failed, then
/// `None` once the send is logically complete.
#[derive(Debug)]
pub struct SendHandle {
    trace_id: String,
    errors: oneshot::Receiver<FrontError>,
    errors_done: bool,
    responses: mpsc::Receiver<Message>,
}

impl SendHandle {
    /// The trace id assigned to the send.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Waits for the next response or the failure of the send.
    ///
    /// Returns `None` once the send is complete.
    pub async fn next(&mut self) -> Option<Result<Message, FrontError>> {
        loop {
            tokio::select! {
                biased;
                response = self.responses.recv() => {
                    if let Some(message) = response {
                        return Some(Ok(message));
                    }
                    if self.errors_done {
                        return None;
                    }
                    self.errors_done = true;
                    return (&mut self.errors).await.ok().map(Err);
                }
                error = &mut self.errors, if !self.errors_done => {
                    self.errors_done = true;
                    if let Ok(error) = error {
                        return Some(Err(error));
                    }
                }
            }
        }
    }

    /// Waits for the first response.
    ///
    /// # Errors
    ///
    /// Returns the send's error, or [`FrontError::TransportUnavailable`] if the
    /// send completed without any response.
    pub async fn response(mut self) -> Result<Message, FrontError> {
        match self.next().await {
            Some(result) => result,
            None => Err(FrontError::TransportUnavailable(format!(
                "send {} completed without a response",
                self.trace_id
            ))),
        }
    }

    /// Turns the handle into a stream of responses and errors.
    pub fn into_stream(self) -> impl Stream<Item = Result<Message, FrontError>> {
        futures::stream::unfold(self, |mut handle| async move {
            handle.next().await.map(|item| (item, handle))
        })
    }
}

/// The outcome of a one-way send or a response.
#[derive(Debug)]
pub struct DeliveryReceipt {
    errors: oneshot::Receiver<FrontError>,
}

impl DeliveryReceipt {
    /// Waits until the transport accepted or rejected the message.
    ///
    /// # Errors
    ///
    /// Returns the failure reported for the send.
    pub async fn outcome(self) -> Result<(), FrontError> {
        match self.errors.await {
            Ok(error) => Err(error),
            Err(_) => Ok(()),
        }
    }
}
