// Derives the rolling "recent speech" caption from the full transcript.
// Pure function of the transcript and the recording-active flag, so it can
// be recomputed on every transcript change.

/// Sentence-terminal punctuation across the supported languages
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];
/// Segments at or below this many characters are likely fragments
const MIN_SEGMENT_CHARS: usize = 5;
/// How many trailing sentences the caption shows
const RECENT_SENTENCES: usize = 3;
/// Fallback word count when no full sentence exists yet
const FALLBACK_WORDS: usize = 15;

/// Compute the caption for the current transcript.
///
/// Returns None when the caption should be hidden: recording is not active,
/// or the transcript is empty/whitespace.
pub fn recent_speech(transcript: &str, recording: bool) -> Option<String> {
    if !recording {
        return None;
    }

    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return None;
    }

    let segments: Vec<&str> = transcript
        .split(|c| SENTENCE_TERMINATORS.contains(&c))
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SEGMENT_CHARS)
        .collect();

    // An unpunctuated transcript splits into one segment spanning the whole
    // text, which would make the caption grow without bound
    if segments.is_empty() || !transcript.contains(&SENTENCE_TERMINATORS[..]) {
        // No full sentence yet: show the last words of the raw transcript
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let start = words.len().saturating_sub(FALLBACK_WORDS);
        return Some(words[start..].join(" "));
    }

    let start = segments.len().saturating_sub(RECENT_SENTENCES);
    let mut recent = segments[start..].join(". ");
    if !recent.ends_with(&SENTENCE_TERMINATORS[..]) {
        recent.push('.');
    }

    Some(recent)
}
