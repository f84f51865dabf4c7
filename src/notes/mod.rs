//! External data platform boundary: note persistence, rate limits, media
//! storage, and transcript summarization

mod limits;
mod media;
mod store;
mod summarize;

pub use limits::{
    FixedWindowLimiter, InMemoryRateLimitStore, LimitRule, LimitedAction, RateLimitStore,
    RateWindow,
};
pub use media::{FsMediaStore, MediaStore};
pub use store::{InMemoryNoteStore, Note, NoteDraft, NoteStore, NoteUpdate};
pub use summarize::{HttpSummarizer, SummaryOutcome, Summarizer};
