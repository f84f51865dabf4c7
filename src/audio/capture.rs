use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::AcquireError;

/// Kind of media track handed out by a capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Audio portion of a shared display/tab
    DisplayAudio,
    /// Microphone input
    Microphone,
    /// Video portion of a shared display (never mixed, stopped at acquisition)
    Video,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    /// Track this frame came from
    pub kind: TrackKind,
}

/// A live source track obtained from a capture backend.
///
/// Audio tracks carry a frame receiver; video tracks carry none and exist
/// only so the acquirer can stop them. Stopping a track aborts its producer
/// task, which closes the frame channel and lets downstream consumers drain
/// and finish.
pub struct MediaTrack {
    kind: TrackKind,
    frames: Option<mpsc::Receiver<AudioFrame>>,
    producer: Option<JoinHandle<()>>,
}

impl MediaTrack {
    pub fn audio(
        kind: TrackKind,
        frames: mpsc::Receiver<AudioFrame>,
        producer: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            kind,
            frames: Some(frames),
            producer,
        }
    }

    pub fn video(producer: Option<JoinHandle<()>>) -> Self {
        Self {
            kind: TrackKind::Video,
            frames: None,
            producer,
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_audio(&self) -> bool {
        self.frames.is_some()
    }

    /// Take the frame receiver for this track (audio tracks only, once)
    pub fn take_frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.frames.take()
    }

    /// Stop the underlying source; safe to call more than once
    pub fn stop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for MediaTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture facility boundary
///
/// Implementations hand out live tracks. `acquire_display` returns the
/// shared display's tracks (audio plus possibly video); `acquire_microphone`
/// returns a single microphone track. Both fail when permission is denied
/// or no source device exists.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn acquire_display(&self) -> Result<Vec<MediaTrack>, AcquireError>;

    async fn acquire_microphone(&self) -> Result<MediaTrack, AcquireError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source selection
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Native display capture (requires a platform bridge)
    Display,
    /// Replay an audio file as the display source, with an optional second
    /// file standing in for the microphone
    File {
        display: PathBuf,
        microphone: Option<PathBuf>,
    },
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureBackend>, AcquireError> {
        match source {
            CaptureSource::File {
                display,
                microphone,
            } => Ok(Box::new(FileCaptureBackend::new(display, microphone))),

            CaptureSource::Display => Err(AcquireError::Unavailable(
                "native display capture requires a platform bridge".to_string(),
            )),
        }
    }
}

/// Milliseconds of audio per replayed frame
const REPLAY_FRAME_MS: u64 = 100;

/// Capture backend that replays WAV files as live tracks.
///
/// Frames are delivered at wall-clock pace, so the rest of the pipeline sees
/// the same cadence it would from a real capture device. When the file runs
/// out the channel closes, which reads as the source ending.
pub struct FileCaptureBackend {
    display_path: PathBuf,
    microphone_path: Option<PathBuf>,
}

impl FileCaptureBackend {
    pub fn new(display_path: PathBuf, microphone_path: Option<PathBuf>) -> Self {
        Self {
            display_path,
            microphone_path,
        }
    }

    fn open_track(path: &PathBuf, kind: TrackKind) -> Result<MediaTrack, AcquireError> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| AcquireError::Backend(format!("{}: {}", path.display(), e)))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AcquireError::Backend(format!("{}: {}", path.display(), e)))?;

        info!(
            "Replaying {} as {:?}: {}Hz, {} channels, {} samples",
            path.display(),
            kind,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let (tx, rx) = mpsc::channel(64);
        let sample_rate = spec.sample_rate;
        let channels = spec.channels;
        let samples_per_frame =
            ((sample_rate as u64 * channels as u64 * REPLAY_FRAME_MS / 1000) as usize).max(1);

        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(REPLAY_FRAME_MS));
            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            while offset < samples.len() {
                ticker.tick().await;

                let end = (offset + samples_per_frame).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                    kind,
                };

                if tx.send(frame).await.is_err() {
                    break;
                }

                offset = end;
                timestamp_ms += REPLAY_FRAME_MS;
            }
        });

        Ok(MediaTrack::audio(kind, rx, Some(producer)))
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileCaptureBackend {
    async fn acquire_display(&self) -> Result<Vec<MediaTrack>, AcquireError> {
        let track = Self::open_track(&self.display_path, TrackKind::DisplayAudio)?;
        Ok(vec![track])
    }

    async fn acquire_microphone(&self) -> Result<MediaTrack, AcquireError> {
        match &self.microphone_path {
            Some(path) => Self::open_track(path, TrackKind::Microphone),
            None => {
                warn!("No microphone source configured");
                Err(AcquireError::Backend(
                    "no microphone source configured".to_string(),
                ))
            }
        }
    }

    fn name(&self) -> &str {
        "file-replay"
    }
}
