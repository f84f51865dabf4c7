// Integration tests for the transcription queue
//
// These tests verify FIFO consumption, the single-consumer guarantee, the
// bounded-pending backpressure policy, and per-chunk failure isolation.

use livenote::audio::AudioChunk;
use livenote::error::TranscribeError;
use livenote::session::TranscriptState;
use livenote::transcribe::{
    QueueConfig, SpeechToText, TranscriptionQueue, TranscriptionResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Per-chunk behavior override; chunks without one transcribe to "c{index}"
enum Behavior {
    /// Delay the successful reply by this many milliseconds
    Delay(u64),
    /// Reply with empty text (a silent chunk)
    Silent,
    /// Generic endpoint failure
    Fail,
    RateLimited,
}

struct ScriptedTranscriber {
    behaviors: Mutex<HashMap<usize, Behavior>>,
    languages: Mutex<HashMap<usize, &'static str>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTranscriber {
    fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            languages: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_behavior(self, index: usize, behavior: Behavior) -> Self {
        self.behaviors.lock().unwrap().insert(index, behavior);
        self
    }

    fn with_language(self, index: usize, language: &'static str) -> Self {
        self.languages.lock().unwrap().insert(index, language);
        self
    }

    fn reply_for(&self, index: usize) -> TranscriptionResult {
        TranscriptionResult {
            text: format!("c{}", index),
            language: self
                .languages
                .lock()
                .unwrap()
                .get(&index)
                .map(|l| l.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl SpeechToText for ScriptedTranscriber {
    async fn transcribe(
        &self,
        chunk: &AudioChunk,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = self.behaviors.lock().unwrap().remove(&chunk.index);
        let result = match behavior {
            Some(Behavior::Delay(ms)) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(self.reply_for(chunk.index))
            }
            Some(Behavior::Silent) => Ok(TranscriptionResult {
                text: String::new(),
                language: None,
            }),
            Some(Behavior::Fail) => Err(TranscribeError::Endpoint {
                status: 500,
                message: "endpoint exploded".to_string(),
            }),
            Some(Behavior::RateLimited) => Err(TranscribeError::RateLimited),
            None => Ok(self.reply_for(chunk.index)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn chunk(index: usize) -> Arc<AudioChunk> {
    Arc::new(AudioChunk {
        index,
        data: vec![0u8; 32],
        encoding: "audio/pcm;codec=s16le".to_string(),
        duration_ms: 100,
    })
}

fn fast_config() -> QueueConfig {
    QueueConfig {
        max_pending: 20,
        pacing: Duration::ZERO,
        failure_backoff: Duration::ZERO,
    }
}

fn queue_with(
    stt: Arc<ScriptedTranscriber>,
) -> (TranscriptionQueue, Arc<Mutex<TranscriptState>>) {
    let transcript = Arc::new(Mutex::new(TranscriptState::new()));
    let queue = TranscriptionQueue::new(stt, Arc::clone(&transcript), fast_config());
    (queue, transcript)
}

fn transcript_text(transcript: &Arc<Mutex<TranscriptState>>) -> String {
    transcript.lock().unwrap().text().to_string()
}

#[tokio::test]
async fn test_chunks_append_in_fifo_order() {
    // Completion-time skew between chunks must not reorder the transcript
    let stt = Arc::new(
        ScriptedTranscriber::new()
            .with_behavior(1, Behavior::Delay(40))
            .with_behavior(3, Behavior::Delay(25))
            .with_behavior(5, Behavior::Delay(5)),
    );
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    for i in 1..=5 {
        queue.enqueue(chunk(i));
    }
    queue.wait_idle().await;

    assert_eq!(transcript_text(&transcript), "c1 c2 c3 c4 c5");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_two_transcription_calls_in_flight() {
    let stt = Arc::new({
        let mut mock = ScriptedTranscriber::new();
        for i in 0..10 {
            mock = mock.with_behavior(i, Behavior::Delay(5));
        }
        mock
    });
    let (queue, _transcript) = queue_with(Arc::clone(&stt));

    // Burst enqueue from several tasks
    let mut senders = Vec::new();
    for i in 0..10 {
        let queue = queue.clone();
        senders.push(tokio::spawn(async move { queue.enqueue(chunk(i)) }));
    }
    for sender in senders {
        sender.await.unwrap();
    }
    queue.wait_idle().await;

    assert_eq!(stt.calls.load(Ordering::SeqCst), 10);
    assert_eq!(stt.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_is_bounded_and_oldest_discarded() {
    let stt = Arc::new(ScriptedTranscriber::new());
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    // 25 chunks enqueued back-to-back with no await in between: the drain
    // task has not run yet, so nothing has been consumed
    for i in 1..=25 {
        queue.enqueue(chunk(i));
    }
    assert_eq!(queue.pending_len(), 20);

    queue.wait_idle().await;

    // Chunks 1-5 were discarded oldest-first; 6-25 survive in order
    let expected: Vec<String> = (6..=25).map(|i| format!("c{}", i)).collect();
    let text = transcript_text(&transcript);
    let got: Vec<&str> = text.split_whitespace().collect();
    assert_eq!(got, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_failed_chunk_is_skipped_without_stopping() {
    let stt = Arc::new(ScriptedTranscriber::new().with_behavior(2, Behavior::Fail));
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    for i in 1..=5 {
        queue.enqueue(chunk(i));
    }
    queue.wait_idle().await;

    // Chunk 2's text is permanently lost; the rest arrive in order
    assert_eq!(transcript_text(&transcript), "c1 c3 c4 c5");
    assert_eq!(stt.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_rate_limited_chunk_is_skipped_without_stopping() {
    let stt = Arc::new(ScriptedTranscriber::new().with_behavior(3, Behavior::RateLimited));
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    for i in 1..=5 {
        queue.enqueue(chunk(i));
    }
    queue.wait_idle().await;

    assert_eq!(transcript_text(&transcript), "c1 c2 c4 c5");
}

#[tokio::test]
async fn test_silent_chunk_appends_nothing() {
    let stt = Arc::new(ScriptedTranscriber::new().with_behavior(2, Behavior::Silent));
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    for i in 1..=3 {
        queue.enqueue(chunk(i));
    }
    queue.wait_idle().await;

    assert_eq!(transcript_text(&transcript), "c1 c3");
}

#[tokio::test]
async fn test_language_latches_on_first_report() {
    let stt = Arc::new(
        ScriptedTranscriber::new()
            .with_language(3, "uk")
            .with_language(5, "en"),
    );
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    for i in 1..=5 {
        queue.enqueue(chunk(i));
    }
    queue.wait_idle().await;

    // Chunk 5's "en" does not overwrite the latched "uk"
    assert_eq!(transcript.lock().unwrap().language(), Some("uk"));
}

#[tokio::test]
async fn test_queue_reenters_draining_after_idle() {
    let stt = Arc::new(ScriptedTranscriber::new());
    let (queue, transcript) = queue_with(Arc::clone(&stt));

    queue.enqueue(chunk(1));
    queue.enqueue(chunk(2));
    queue.wait_idle().await;
    assert!(queue.is_idle());

    // A later enqueue starts a fresh drain
    queue.enqueue(chunk(3));
    queue.wait_idle().await;

    assert_eq!(transcript_text(&transcript), "c1 c2 c3");
}
