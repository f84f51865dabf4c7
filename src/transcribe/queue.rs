// Ordered, single-consumer transcription queue.
//
// Enqueuing while idle starts a drain task; enqueuing while draining only
// appends. The draining flag is the sole mutual-exclusion mechanism: it is
// set and cleared under the same lock that guards the pending sequence, so
// at most one drain task exists and no two endpoint calls for a session are
// ever in flight together. Chunks are consumed strictly FIFO; a failed
// chunk is logged and skipped, never retried, and never stops the drain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

use super::client::SpeechToText;
use crate::audio::AudioChunk;
use crate::error::TranscribeError;
use crate::session::TranscriptState;

/// Queue tuning knobs
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Pending chunks beyond this are discarded oldest-first
    pub max_pending: usize,
    /// Delay between drain iterations to smooth request rate
    pub pacing: Duration,
    /// Delay after a failed chunk before continuing
    pub failure_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: 20,
            pacing: Duration::from_millis(300),
            failure_backoff: Duration::from_millis(500),
        }
    }
}

struct QueueState {
    pending: VecDeque<Arc<AudioChunk>>,
    draining: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    stt: Arc<dyn SpeechToText>,
    transcript: Arc<Mutex<TranscriptState>>,
    config: QueueConfig,
    idle: Notify,
}

/// Single-consumer FIFO of pending chunks.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct TranscriptionQueue {
    inner: Arc<QueueInner>,
}

impl TranscriptionQueue {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        transcript: Arc<Mutex<TranscriptState>>,
        config: QueueConfig,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    draining: false,
                }),
                stt,
                transcript,
                config,
                idle: Notify::new(),
            }),
        }
    }

    /// Append a chunk and start draining if no drain is active.
    ///
    /// When the pending length would exceed the bound, the oldest excess
    /// entries are discarded first: the pipeline favors freshness over
    /// completeness under sustained overload.
    pub fn enqueue(&self, chunk: Arc<AudioChunk>) {
        let start_drain = {
            let mut state = self.inner.state.lock().unwrap();
            state.pending.push_back(chunk);

            let excess = state
                .pending
                .len()
                .saturating_sub(self.inner.config.max_pending);
            if excess > 0 {
                for _ in 0..excess {
                    state.pending.pop_front();
                }
                warn!(
                    "Transcription queue over capacity, discarded {} oldest chunk(s)",
                    excess
                );
            }

            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };

        if start_drain {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(drain(inner));
        }
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }

    /// True when the queue is empty and no drain is active
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        !state.draining && state.pending.is_empty()
    }

    /// Wait until the queue has fully drained
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking, so a drain finishing in between
            // cannot slip past unnoticed
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

/// Drain loop: one chunk at a time, oldest first, until the queue is empty
async fn drain(inner: Arc<QueueInner>) {
    loop {
        let chunk = {
            let mut state = inner.state.lock().unwrap();
            match state.pending.pop_front() {
                Some(chunk) => chunk,
                None => {
                    state.draining = false;
                    drop(state);
                    inner.idle.notify_waiters();
                    return;
                }
            }
        };

        match inner.stt.transcribe(&chunk).await {
            Ok(result) if !result.text.is_empty() => {
                inner.transcript.lock().unwrap().append(&result);
            }
            Ok(_) => {
                debug!("Chunk {} was silent, nothing to append", chunk.index);
            }
            Err(TranscribeError::RateLimited) => {
                warn!(
                    "Chunk {} rejected by rate limit, its text is lost",
                    chunk.index
                );
                tokio::time::sleep(inner.config.failure_backoff).await;
            }
            Err(e) => {
                warn!("Chunk {} transcription failed, continuing: {}", chunk.index, e);
                tokio::time::sleep(inner.config.failure_backoff).await;
            }
        }

        tokio::time::sleep(inner.config.pacing).await;
    }
}
