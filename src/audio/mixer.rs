// Mixing graph that combines the acquired audio tracks into one stream.
//
// Each track feeds a forwarder task into a merged channel; a single mixing
// task buffers frames per track kind and sums one frame from every live
// source with clipping. A source that stalls past the buffering delay is
// skipped for that round rather than blocking the stream. The graph owns
// every task it spawns and releases them when closed, on both normal stop
// and error paths.

use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::capture::{AudioFrame, MediaTrack, TrackKind};
use crate::error::AcquireError;

/// Configuration for the mixing graph
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Target sample rate for output
    pub sample_rate: u32,
    /// Number of channels in output
    pub channels: u16,
    /// Maximum timestamp spread a source may buffer before the mixer stops
    /// waiting for slower sources
    pub max_buffer_delay_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            max_buffer_delay_ms: 200,
        }
    }
}

enum MixInput {
    Frame(AudioFrame),
    SourceEnded(TrackKind),
}

/// Mixing graph resource
///
/// `open` wires the given audio tracks into a single mixed output stream;
/// `close` releases the graph. Dropping the graph also releases it.
pub struct MixerGraph {
    config: MixerConfig,
    forwarders: Vec<JoinHandle<()>>,
    mix_task: Option<JoinHandle<()>>,
}

impl MixerGraph {
    pub fn new(config: MixerConfig) -> Self {
        Self {
            config,
            forwarders: Vec::new(),
            mix_task: None,
        }
    }

    /// Connect the audio tracks and start mixing.
    ///
    /// Fails with `NoAudioSource` when none of the tracks carries audio.
    /// Video tracks are skipped; they must be stopped by the acquirer.
    pub fn open(
        &mut self,
        tracks: &mut [MediaTrack],
    ) -> Result<mpsc::Receiver<AudioFrame>, AcquireError> {
        let mut inputs = Vec::new();
        for track in tracks.iter_mut() {
            if track.kind() == TrackKind::Video {
                continue;
            }
            if let Some(rx) = track.take_frames() {
                inputs.push((track.kind(), rx));
            }
        }

        if inputs.is_empty() {
            return Err(AcquireError::NoAudioSource);
        }

        info!(
            "Mixing graph opened: {} sources, {}Hz, {} channels",
            inputs.len(),
            self.config.sample_rate,
            self.config.channels
        );

        let kinds: Vec<TrackKind> = inputs.iter().map(|(kind, _)| *kind).collect();

        let (merged_tx, mut merged_rx) = mpsc::channel::<MixInput>(64);
        for (kind, mut rx) in inputs {
            let tx = merged_tx.clone();
            self.forwarders.push(tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    if tx.send(MixInput::Frame(frame)).await.is_err() {
                        return;
                    }
                }
                let _ = tx.send(MixInput::SourceEnded(kind)).await;
            }));
        }
        drop(merged_tx);

        let (out_tx, out_rx) = mpsc::channel(64);
        let config = self.config.clone();
        self.mix_task = Some(tokio::spawn(async move {
            let mut mixer = FrameMixer::new(config, &kinds);

            while let Some(input) = merged_rx.recv().await {
                let ready = match input {
                    MixInput::Frame(frame) => mixer.push(frame),
                    MixInput::SourceEnded(kind) => mixer.source_ended(kind),
                };
                for mixed in ready {
                    if out_tx.send(mixed).await.is_err() {
                        return;
                    }
                }
            }

            // Every source has ended; flush whatever is still buffered
            for mixed in mixer.flush() {
                if out_tx.send(mixed).await.is_err() {
                    return;
                }
            }
        }));

        Ok(out_rx)
    }

    /// Release the graph, waiting for the mixing task to flush and finish
    pub async fn close(&mut self) {
        let mut tasks: Vec<JoinHandle<()>> = self.forwarders.drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        if let Some(mix_task) = self.mix_task.take() {
            tasks.push(mix_task);
        }
        let _ = futures::future::join_all(tasks).await;
        debug!("Mixing graph closed");
    }
}

impl Drop for MixerGraph {
    fn drop(&mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        if let Some(mix_task) = self.mix_task.take() {
            mix_task.abort();
        }
    }
}

/// Buffers frames per track kind and sums one frame from every live source
struct FrameMixer {
    config: MixerConfig,
    buffers: HashMap<TrackKind, VecDeque<AudioFrame>>,
    /// Live source count per kind; a kind stops gating rounds once all its
    /// sources have ended
    live: HashMap<TrackKind, usize>,
}

impl FrameMixer {
    fn new(config: MixerConfig, kinds: &[TrackKind]) -> Self {
        let mut live: HashMap<TrackKind, usize> = HashMap::new();
        for kind in kinds {
            *live.entry(*kind).or_insert(0) += 1;
        }

        Self {
            config,
            buffers: HashMap::new(),
            live,
        }
    }

    /// Buffer a frame and return any mixed frames that became ready
    fn push(&mut self, frame: AudioFrame) -> Vec<AudioFrame> {
        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return Vec::new();
        }

        if frame.channels != self.config.channels {
            warn!(
                "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.config.channels, frame.channels
            );
            return Vec::new();
        }

        self.buffers.entry(frame.kind).or_default().push_back(frame);

        let mut ready = self.drain_ready();
        if ready.is_empty() && self.overdue() {
            // A live source is stalled; mix what is available rather than
            // buffering without bound
            if let Some(mixed) = self.pop_round() {
                ready.push(mixed);
            }
        }
        ready
    }

    /// A source ended; rounds it was gating may now be ready
    fn source_ended(&mut self, kind: TrackKind) -> Vec<AudioFrame> {
        if let Some(count) = self.live.get_mut(&kind) {
            *count -= 1;
            if *count == 0 {
                self.live.remove(&kind);
            }
        }
        self.drain_ready()
    }

    /// Mix everything still buffered, one round at a time
    fn flush(&mut self) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        while let Some(mixed) = self.pop_round() {
            out.push(mixed);
        }
        out
    }

    fn drain_ready(&mut self) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        while self.round_ready() {
            if let Some(mixed) = self.pop_round() {
                out.push(mixed);
            }
        }
        out
    }

    /// A round is ready when every live source has a frame waiting
    fn round_ready(&self) -> bool {
        if self.buffers.values().all(|b| b.is_empty()) {
            return false;
        }
        self.live.keys().all(|kind| {
            self.buffers
                .get(kind)
                .map(|b| !b.is_empty())
                .unwrap_or(false)
        })
    }

    /// True when some buffer spans more than the allowed delay
    fn overdue(&self) -> bool {
        self.buffers.values().any(|buffer| {
            match (buffer.front(), buffer.back()) {
                (Some(oldest), Some(newest)) => {
                    newest.timestamp_ms.saturating_sub(oldest.timestamp_ms)
                        > self.config.max_buffer_delay_ms
                }
                _ => false,
            }
        })
    }

    /// Pop one frame from each non-empty buffer and sum them
    fn pop_round(&mut self) -> Option<AudioFrame> {
        let mut frames: Vec<AudioFrame> = Vec::new();
        for buffer in self.buffers.values_mut() {
            if let Some(frame) = buffer.pop_front() {
                frames.push(frame);
            }
        }

        if frames.is_empty() {
            return None;
        }

        if frames.len() == 1 {
            return frames.into_iter().next();
        }

        Some(self.sum_frames(&frames))
    }

    /// Sum frames sample-by-sample with clipping
    fn sum_frames(&self, frames: &[AudioFrame]) -> AudioFrame {
        // Use the earliest timestamp and the longest frame's length
        let timestamp_ms = frames.iter().map(|f| f.timestamp_ms).min().unwrap_or(0);
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);

        let mut mixed_samples = Vec::with_capacity(max_len);
        for i in 0..max_len {
            let mut sum: i32 = 0;
            for frame in frames {
                sum += frame.samples.get(i).copied().unwrap_or(0) as i32;
            }
            mixed_samples.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }

        AudioFrame {
            samples: mixed_samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            timestamp_ms,
            kind: TrackKind::DisplayAudio,
        }
    }
}
