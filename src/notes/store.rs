use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A finished session persisted as a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub transcript: String,
    pub language: Option<String>,
    /// Reference to the stored session audio
    pub audio_url: Option<String>,
    pub duration_seconds: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a note
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub summary: String,
    pub transcript: String,
    pub language: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<u64>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
}

/// Session persistence boundary
#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    async fn create(&self, draft: NoteDraft) -> Result<Note>;

    async fn get(&self, id: Uuid) -> Result<Option<Note>>;

    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<Option<Note>>;

    /// All notes, newest first
    async fn list(&self) -> Result<Vec<Note>>;

    /// Returns true when a note was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// In-memory note store
#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<Uuid, Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn create(&self, draft: NoteDraft) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            title: draft.title,
            summary: draft.summary,
            transcript: draft.transcript,
            language: draft.language,
            audio_url: draft.audio_url,
            duration_seconds: draft.duration_seconds,
            created_at: Utc::now(),
        };

        self.notes.write().await.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>> {
        Ok(self.notes.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<Option<Note>> {
        let mut notes = self.notes.write().await;
        let Some(note) = notes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(summary) = update.summary {
            note.summary = summary;
        }

        Ok(Some(note.clone()))
    }

    async fn list(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.notes.read().await.values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.notes.write().await.remove(&id).is_some())
    }
}
