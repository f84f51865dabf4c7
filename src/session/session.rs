use super::config::SessionConfig;
use super::stats::{SessionOutcome, SessionStats};
use super::subtitle::recent_speech;
use super::timer::SessionTimer;
use super::transcript::TranscriptState;
use crate::audio::{
    CaptureBackend, ChunkRecorder, MediaTrack, MixerConfig, MixerGraph, RecorderConfig,
    SessionAudioBuffer, TrackKind,
};
use crate::error::{FinalizeError, SessionError};
use crate::notes::{
    FixedWindowLimiter, LimitedAction, MediaStore, Note, NoteDraft, NoteStore, Summarizer,
};
use crate::transcribe::{
    QueueConfig, RateLimitedTranscriber, SpeechToText, TranscriptionQueue,
};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Title used when summarization fails or returns nothing
const DEFAULT_NOTE_TITLE: &str = "Live note";

/// Handles to the external collaborators a session talks to
#[derive(Clone)]
pub struct SessionServices {
    pub stt: Arc<dyn SpeechToText>,
    pub summarizer: Arc<dyn Summarizer>,
    pub notes: Arc<dyn NoteStore>,
    pub media: Arc<dyn MediaStore>,
    pub limiter: Arc<FixedWindowLimiter>,
}

/// A live recording session: capture, mixing, chunked recording, ordered
/// transcription, and end-of-session finalization into a note.
///
/// Stopping the recording releases the capture and mixing resources
/// immediately but lets the transcription queue finish draining, so the
/// transcript handed to summarization includes late-arriving chunk results.
/// If finalization fails, the transcript, audio buffer, and duration stay in
/// memory and a later `stop` call retries finalization without re-recording.
pub struct RecordingSession {
    config: SessionConfig,
    services: SessionServices,

    started_at: std::sync::Mutex<chrono::DateTime<Utc>>,
    is_recording: Arc<AtomicBool>,
    has_started: AtomicBool,
    finalized: AtomicBool,

    transcript: Arc<std::sync::Mutex<TranscriptState>>,
    audio_buffer: SessionAudioBuffer,
    queue: TranscriptionQueue,
    timer: Arc<SessionTimer>,

    tracks: tokio::sync::Mutex<Vec<MediaTrack>>,
    mixer: tokio::sync::Mutex<Option<MixerGraph>>,
    recorder_task: tokio::sync::Mutex<Option<JoinHandle<Result<usize>>>>,

    /// Serializes concurrent stop calls
    stop_gate: tokio::sync::Mutex<()>,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        services: SessionServices,
        queue_config: QueueConfig,
    ) -> Self {
        let transcript = Arc::new(std::sync::Mutex::new(TranscriptState::new()));

        // Every chunk passes the platform's transcription limit before it
        // reaches the endpoint, keyed by this session's user
        let stt: Arc<dyn SpeechToText> = Arc::new(RateLimitedTranscriber::new(
            Arc::clone(&services.stt),
            Arc::clone(&services.limiter),
            config.user_id.clone(),
        ));

        let queue = TranscriptionQueue::new(stt, Arc::clone(&transcript), queue_config);

        Self {
            config,
            services,
            started_at: std::sync::Mutex::new(Utc::now()),
            is_recording: Arc::new(AtomicBool::new(false)),
            has_started: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            transcript,
            audio_buffer: SessionAudioBuffer::new(),
            queue,
            timer: SessionTimer::new(),
            tracks: tokio::sync::Mutex::new(Vec::new()),
            mixer: tokio::sync::Mutex::new(None),
            recorder_task: tokio::sync::Mutex::new(None),
            stop_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    /// Start recording.
    ///
    /// Acquires the display (and optionally microphone) tracks, opens the
    /// mixing graph, and starts the chunk recorder and timer. Acquisition or
    /// encoding-negotiation failure leaves nothing running.
    pub async fn start(&self, backend: &dyn CaptureBackend) -> Result<(), SessionError> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyRecording);
        }

        info!("Starting recording session: {}", self.config.session_id);

        self.transcript.lock().unwrap().reset();
        self.audio_buffer.clear();
        self.finalized.store(false, Ordering::SeqCst);

        if let Err(e) = self.acquire_and_launch(backend).await {
            self.is_recording.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.has_started.store(true, Ordering::SeqCst);
        *self.started_at.lock().unwrap() = Utc::now();
        self.timer.start();

        info!("Recording session started: {}", self.config.session_id);
        Ok(())
    }

    async fn acquire_and_launch(&self, backend: &dyn CaptureBackend) -> Result<(), SessionError> {
        // Negotiate the encoding before touching any capture resource
        let recorder = ChunkRecorder::new(RecorderConfig {
            chunk_interval: self.config.chunk_interval,
            preferred_encoding: self.config.preferred_encoding.clone(),
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        })?;

        let acquired = backend.acquire_display().await?;

        // The video portion is never mixed; stop it right away
        let mut audio_tracks: Vec<MediaTrack> = Vec::new();
        for mut track in acquired {
            if track.kind() == TrackKind::Video {
                track.stop();
            } else {
                audio_tracks.push(track);
            }
        }

        if self.config.mix_microphone {
            let mic = backend.acquire_microphone().await?;
            audio_tracks.push(mic);
        }

        let mut graph = MixerGraph::new(MixerConfig {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            ..MixerConfig::default()
        });
        let mixed_rx = graph.open(&mut audio_tracks)?;

        let task = tokio::spawn(recorder.run(
            mixed_rx,
            self.audio_buffer.clone(),
            self.queue.clone(),
        ));

        *self.tracks.lock().await = audio_tracks;
        *self.mixer.lock().await = Some(graph);
        *self.recorder_task.lock().await = Some(task);

        Ok(())
    }

    /// Stop recording and finalize the session into a note.
    ///
    /// A stop on a session that never started, or that already finalized,
    /// is a no-op carrying stats only. A stop after a failed finalize
    /// retries finalization.
    pub async fn stop(&self) -> Result<SessionOutcome, SessionError> {
        let _gate = self.stop_gate.lock().await;

        if self.is_recording.swap(false, Ordering::SeqCst) {
            self.teardown().await;
        } else if !self.has_started.load(Ordering::SeqCst)
            || self.finalized.load(Ordering::SeqCst)
        {
            return Ok(SessionOutcome {
                stats: self.stats(),
                note: None,
            });
        }

        let note = self.finalize().await?;
        self.finalized.store(true, Ordering::SeqCst);

        Ok(SessionOutcome {
            stats: self.stats(),
            note: Some(note),
        })
    }

    /// Release capture and mixing resources, flush the recorder, and wait
    /// for the transcription queue to drain
    async fn teardown(&self) {
        info!("Stopping recording session: {}", self.config.session_id);

        self.timer.stop();

        // Stopping the source tracks closes the frame channels; the mixer
        // flushes and ends, and the recorder cuts its tail chunk
        {
            let mut tracks = self.tracks.lock().await;
            for track in tracks.iter_mut() {
                track.stop();
            }
            tracks.clear();
        }

        if let Some(task) = self.recorder_task.lock().await.take() {
            match task.await {
                Ok(Ok(chunks)) => info!("Recorder finished with {} chunks", chunks),
                Ok(Err(e)) => error!("Recorder failed: {}", e),
                Err(e) => error!("Recorder task panicked: {}", e),
            }
        }

        if let Some(mut graph) = self.mixer.lock().await.take() {
            graph.close().await;
        }

        // Chunks enqueued before the stop still get transcribed
        self.queue.wait_idle().await;

        info!("Recording session stopped: {}", self.config.session_id);
    }

    /// Upload the session audio, summarize the transcript, and persist the
    /// note (subject to the create-note rate limit)
    async fn finalize(&self) -> Result<Note, FinalizeError> {
        let (transcript, language) = self.transcript_snapshot();
        let duration_secs = self.timer.elapsed_secs();

        let audio_url = if self.audio_buffer.is_empty() {
            None
        } else {
            let content_type = self
                .audio_buffer
                .encoding()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let url = self
                .services
                .media
                .put(&self.audio_buffer.concat(), &content_type)
                .await
                .map_err(|e| FinalizeError::Upload(e.to_string()))?;
            Some(url)
        };

        if !self
            .services
            .limiter
            .check(&self.config.user_id, LimitedAction::CreateNote)
            .await
        {
            return Err(FinalizeError::RateLimited);
        }

        // A summarization failure degrades to a bare note rather than
        // failing the session
        let (title, summary) = match self
            .services
            .summarizer
            .summarize(&transcript, language.as_deref())
            .await
        {
            Ok(outcome) => {
                let title = if outcome.title.is_empty() {
                    DEFAULT_NOTE_TITLE.to_string()
                } else {
                    outcome.title
                };
                (title, outcome.summary)
            }
            Err(e) => {
                warn!("Summarization failed, keeping default title: {}", e);
                (DEFAULT_NOTE_TITLE.to_string(), String::new())
            }
        };

        let note = self
            .services
            .notes
            .create(NoteDraft {
                title,
                summary,
                transcript,
                language,
                audio_url,
                duration_seconds: Some(duration_secs),
            })
            .await
            .map_err(|e| FinalizeError::Persist(e.to_string()))?;

        info!("Session {} saved as note {}", self.config.session_id, note.id);

        Ok(note)
    }

    pub fn stats(&self) -> SessionStats {
        let (chars, language) = {
            let transcript = self.transcript.lock().unwrap();
            (transcript.char_count(), transcript.language().map(String::from))
        };

        SessionStats {
            is_recording: self.is_recording.load(Ordering::SeqCst),
            started_at: *self.started_at.lock().unwrap(),
            elapsed_secs: self.timer.elapsed_secs(),
            chunks_recorded: self.audio_buffer.chunk_count(),
            pending_chunks: self.queue.pending_len(),
            transcript_chars: chars,
            detected_language: language,
        }
    }

    /// Current transcript text and latched language
    pub fn transcript_snapshot(&self) -> (String, Option<String>) {
        let transcript = self.transcript.lock().unwrap();
        (
            transcript.text().to_string(),
            transcript.language().map(String::from),
        )
    }

    /// Rolling caption for display; None while hidden
    pub fn subtitle(&self) -> Option<String> {
        let transcript = self.transcript.lock().unwrap();
        recent_speech(transcript.text(), self.is_recording.load(Ordering::SeqCst))
    }
}
