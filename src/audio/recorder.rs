use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::capture::AudioFrame;
use super::chunk::{AudioChunk, SessionAudioBuffer};
use super::encode::{ChunkEncoder, ChunkEncoderFactory};
use crate::error::EncodeError;
use crate::transcribe::TranscriptionQueue;

/// Chunk recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Cadence of chunk production
    pub chunk_interval: Duration,
    /// Requested chunk encoding (subject to fallback)
    pub preferred_encoding: String,
    /// Format assumed until the first frame arrives
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_secs(5),
            preferred_encoding: super::encode::PCM_ENCODING.to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Segments the mixed stream into encoded chunks on a fixed timer.
///
/// Every produced chunk is delivered to two sinks: the session accumulation
/// buffer and the transcription queue. Chunks with no captured samples are
/// discarded at the source and never enqueued.
pub struct ChunkRecorder {
    encoder: Box<dyn ChunkEncoder>,
    interval: Duration,
    pending: Vec<i16>,
    pending_ms: u64,
    next_index: usize,
    sample_rate: u32,
    channels: u16,
}

impl ChunkRecorder {
    /// Negotiate an encoding and build a recorder.
    ///
    /// Fails when neither the requested encoding nor the fallback is
    /// supported on this host.
    pub fn new(config: RecorderConfig) -> Result<Self, EncodeError> {
        let encoder = ChunkEncoderFactory::negotiate(&config.preferred_encoding)?;

        info!(
            "Chunk recorder initialized: {} every {}ms",
            encoder.encoding(),
            config.chunk_interval.as_millis()
        );

        Ok(Self {
            encoder,
            interval: config.chunk_interval,
            pending: Vec::new(),
            pending_ms: 0,
            next_index: 0,
            sample_rate: config.sample_rate,
            channels: config.channels,
        })
    }

    /// Encoding actually in use after negotiation
    pub fn encoding(&self) -> &'static str {
        self.encoder.encoding()
    }

    /// Consume the mixed stream until it ends, producing chunks at the
    /// configured cadence and flushing any partial tail as a final chunk.
    ///
    /// Returns the number of chunks produced.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        buffer: SessionAudioBuffer,
        queue: TranscriptionQueue,
    ) -> Result<usize> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first chunk
        // spans a full interval
        ticker.tick().await;

        loop {
            tokio::select! {
                maybe_frame = frames.recv() => match maybe_frame {
                    Some(frame) => self.absorb(frame),
                    None => break,
                },
                _ = ticker.tick() => self.cut(&buffer, &queue)?,
            }
        }

        // Stream ended: flush any partially accumulated tail
        self.cut(&buffer, &queue)?;

        info!("Chunk recording complete: {} chunks", self.next_index);
        Ok(self.next_index)
    }

    fn absorb(&mut self, frame: AudioFrame) {
        self.sample_rate = frame.sample_rate;
        self.channels = frame.channels;
        let frame_ms = frame.samples.len() as u64 * 1000
            / (frame.sample_rate as u64 * frame.channels.max(1) as u64);
        self.pending_ms += frame_ms;
        self.pending.extend_from_slice(&frame.samples);
    }

    /// Encode accumulated samples into a chunk and deliver it to both sinks
    fn cut(
        &mut self,
        buffer: &SessionAudioBuffer,
        queue: &TranscriptionQueue,
    ) -> Result<(), EncodeError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let samples = std::mem::take(&mut self.pending);
        let duration_ms = std::mem::take(&mut self.pending_ms);
        let data = self
            .encoder
            .encode(&samples, self.sample_rate, self.channels)?;

        let chunk = Arc::new(AudioChunk {
            index: self.next_index,
            data,
            encoding: self.encoder.encoding().to_string(),
            duration_ms,
        });
        self.next_index += 1;

        debug!(
            "Chunk {} cut: {} bytes, {}ms",
            chunk.index,
            chunk.size_bytes(),
            chunk.duration_ms
        );

        buffer.push(Arc::clone(&chunk));
        queue.enqueue(chunk);

        Ok(())
    }
}
