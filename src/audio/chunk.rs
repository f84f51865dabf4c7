use std::sync::{Arc, Mutex};

/// One fixed-duration segment of encoded audio produced during a session.
///
/// Immutable once produced. Shared between the transcription queue (which
/// owns it until consumed) and the session accumulation buffer (which keeps
/// it for final upload).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Position in the session's chunk sequence (0-indexed)
    pub index: usize,
    /// Encoded payload
    pub data: Vec<u8>,
    /// Declared media encoding of the payload
    pub encoding: String,
    /// Milliseconds of captured audio in this chunk
    pub duration_ms: u64,
}

impl AudioChunk {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Append-only, ordered buffer of every chunk produced in a session.
///
/// Retained for the lifetime of the session and used at stop time to build
/// the uploaded session audio.
#[derive(Clone, Default)]
pub struct SessionAudioBuffer {
    chunks: Arc<Mutex<Vec<Arc<AudioChunk>>>>,
}

impl SessionAudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, chunk: Arc<AudioChunk>) {
        self.chunks.lock().unwrap().push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.lock().unwrap().is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.size_bytes())
            .sum()
    }

    /// Snapshot of the buffered chunks, in production order
    pub fn snapshot(&self) -> Vec<Arc<AudioChunk>> {
        self.chunks.lock().unwrap().clone()
    }

    /// Declared encoding of the buffered payload, if any chunks exist
    pub fn encoding(&self) -> Option<String> {
        self.chunks
            .lock()
            .unwrap()
            .first()
            .map(|c| c.encoding.clone())
    }

    /// Ordered concatenation of every chunk payload.
    ///
    /// The result is handed to the media store as an opaque blob; with the
    /// raw PCM encoding it is also a playable sample stream.
    pub fn concat(&self) -> Vec<u8> {
        let chunks = self.chunks.lock().unwrap();
        let mut out = Vec::with_capacity(chunks.iter().map(|c| c.size_bytes()).sum());
        for chunk in chunks.iter() {
            out.extend_from_slice(&chunk.data);
        }
        out
    }

    pub fn clear(&self) {
        self.chunks.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, data: Vec<u8>) -> Arc<AudioChunk> {
        Arc::new(AudioChunk {
            index,
            data,
            encoding: "audio/pcm;codec=s16le".to_string(),
            duration_ms: 100,
        })
    }

    #[test]
    fn test_buffer_preserves_order() {
        let buffer = SessionAudioBuffer::new();
        buffer.push(chunk(0, vec![1, 2]));
        buffer.push(chunk(1, vec![3]));
        buffer.push(chunk(2, vec![4, 5]));

        assert_eq!(buffer.chunk_count(), 3);
        assert_eq!(buffer.total_bytes(), 5);
        assert_eq!(buffer.concat(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_buffer_clear() {
        let buffer = SessionAudioBuffer::new();
        buffer.push(chunk(0, vec![1]));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.encoding(), None);
    }
}
