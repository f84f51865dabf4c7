// Integration tests for the chunk recorder
//
// These tests verify that the mixed stream is segmented on the configured
// cadence, that the partial tail is flushed when the stream ends, that empty
// intervals never produce chunks, and that every chunk reaches both the
// session buffer and the transcription queue in order.

use livenote::audio::{
    AudioChunk, AudioFrame, ChunkRecorder, RecorderConfig, SessionAudioBuffer, TrackKind,
    PCM_ENCODING, WAV_ENCODING,
};
use livenote::error::TranscribeError;
use livenote::session::TranscriptState;
use livenote::transcribe::{
    QueueConfig, SpeechToText, TranscriptionQueue, TranscriptionResult,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Replies with the chunk's index so the transcript records consumption order
struct EchoTranscriber;

#[async_trait::async_trait]
impl SpeechToText for EchoTranscriber {
    async fn transcribe(
        &self,
        chunk: &AudioChunk,
    ) -> Result<TranscriptionResult, TranscribeError> {
        Ok(TranscriptionResult {
            text: format!("c{}", chunk.index),
            language: None,
        })
    }
}

fn fast_queue() -> (TranscriptionQueue, Arc<Mutex<TranscriptState>>) {
    let transcript = Arc::new(Mutex::new(TranscriptState::new()));
    let queue = TranscriptionQueue::new(
        Arc::new(EchoTranscriber),
        Arc::clone(&transcript),
        QueueConfig {
            max_pending: 20,
            pacing: Duration::ZERO,
            failure_backoff: Duration::ZERO,
        },
    );
    (queue, transcript)
}

fn recorder(interval_ms: u64, encoding: &str) -> ChunkRecorder {
    ChunkRecorder::new(RecorderConfig {
        chunk_interval: Duration::from_millis(interval_ms),
        preferred_encoding: encoding.to_string(),
        sample_rate: 16000,
        channels: 1,
    })
    .unwrap()
}

fn frame(timestamp_ms: u64, samples: usize) -> AudioFrame {
    AudioFrame {
        samples: vec![7i16; samples],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
        kind: TrackKind::DisplayAudio,
    }
}

#[tokio::test]
async fn test_recorder_cuts_on_cadence_and_flushes_tail() {
    let (queue, transcript) = fast_queue();
    let buffer = SessionAudioBuffer::new();
    let recorder = recorder(60, PCM_ENCODING);

    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(recorder.run(rx, buffer.clone(), queue.clone()));

    // ~160ms of frames at 20ms spacing: at least two interval ticks pass
    for i in 0..8u64 {
        tx.send(frame(i * 20, 320)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    drop(tx);

    let chunks = run.await.unwrap().unwrap();

    assert!(chunks >= 2, "expected at least 2 chunks, got {}", chunks);
    assert_eq!(buffer.chunk_count(), chunks);

    // No samples were lost or duplicated across the chunk boundaries
    assert_eq!(buffer.total_bytes(), 8 * 320 * 2);

    // Every chunk is non-empty, carries the negotiated encoding, and is
    // numbered in production order
    for (i, chunk) in buffer.snapshot().iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert!(chunk.size_bytes() > 0);
        assert_eq!(chunk.encoding, PCM_ENCODING);
    }

    // The queue consumed the same chunks, in the same order
    queue.wait_idle().await;
    let text = transcript.lock().unwrap().text().to_string();
    let expected: Vec<String> = (0..chunks).map(|i| format!("c{}", i)).collect();
    assert_eq!(text.split_whitespace().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_empty_intervals_produce_no_chunks() {
    let (queue, _transcript) = fast_queue();
    let buffer = SessionAudioBuffer::new();
    let recorder = recorder(40, PCM_ENCODING);

    let (tx, rx) = mpsc::channel::<AudioFrame>(8);
    let run = tokio::spawn(recorder.run(rx, buffer.clone(), queue.clone()));

    // Let several intervals elapse with no frames at all
    tokio::time::sleep(Duration::from_millis(150)).await;
    drop(tx);

    let chunks = run.await.unwrap().unwrap();

    assert_eq!(chunks, 0);
    assert!(buffer.is_empty());
    assert!(queue.is_idle());
}

#[tokio::test]
async fn test_unsupported_encoding_falls_back() {
    let recorder = recorder(100, "audio/webm;codecs=opus");
    assert_eq!(recorder.encoding(), WAV_ENCODING);
}

#[tokio::test]
async fn test_wav_chunks_decode_with_declared_format() {
    let (queue, _transcript) = fast_queue();
    let buffer = SessionAudioBuffer::new();
    let recorder = recorder(50, WAV_ENCODING);

    let (tx, rx) = mpsc::channel(16);
    let run = tokio::spawn(recorder.run(rx, buffer.clone(), queue.clone()));

    for i in 0..4u64 {
        tx.send(frame(i * 20, 320)).await.unwrap();
    }
    drop(tx);

    let chunks = run.await.unwrap().unwrap();
    assert!(chunks >= 1);

    let mut decoded_total = 0usize;
    for chunk in buffer.snapshot() {
        let reader = hound::WavReader::new(Cursor::new(chunk.data.clone())).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        decoded_total += reader.into_samples::<i16>().count();
    }
    assert_eq!(decoded_total, 4 * 320);

    queue.wait_idle().await;
}
