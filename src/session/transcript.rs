use tracing::info;

use crate::transcribe::TranscriptionResult;

/// Growing transcript for one recording session.
///
/// Append-only for the duration of a session: chunk texts are joined with a
/// single space in consumption order, and the first non-empty detected
/// language latches for the rest of the session. Reset only at the start of
/// a new session.
#[derive(Debug, Default)]
pub struct TranscriptState {
    text: String,
    language: Option<String>,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: &TranscriptionResult) {
        if result.text.is_empty() {
            return;
        }

        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&result.text);

        if self.language.is_none() {
            if let Some(language) = result.language.as_deref().filter(|l| !l.is_empty()) {
                info!("Detected language: {}", language);
                self.language = Some(language.to_string());
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.language = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, language: Option<&str>) -> TranscriptionResult {
        TranscriptionResult {
            text: text.to_string(),
            language: language.map(String::from),
        }
    }

    #[test]
    fn test_append_joins_with_single_space() {
        let mut transcript = TranscriptState::new();
        transcript.append(&result("hello", None));
        transcript.append(&result("world", None));

        assert_eq!(transcript.text(), "hello world");
    }

    #[test]
    fn test_empty_text_is_ignored() {
        let mut transcript = TranscriptState::new();
        transcript.append(&result("hello", None));
        transcript.append(&result("", Some("en")));
        transcript.append(&result("again", None));

        // No doubled space, and an empty result latches nothing
        assert_eq!(transcript.text(), "hello again");
        assert_eq!(transcript.language(), None);
    }

    #[test]
    fn test_language_latches_on_first_value() {
        let mut transcript = TranscriptState::new();
        transcript.append(&result("перший", None));
        transcript.append(&result("другий", Some("uk")));
        transcript.append(&result("third", Some("en")));

        assert_eq!(transcript.language(), Some("uk"));
    }

    #[test]
    fn test_reset_clears_text_and_language() {
        let mut transcript = TranscriptState::new();
        transcript.append(&result("hello", Some("en")));
        transcript.reset();

        assert_eq!(transcript.text(), "");
        assert_eq!(transcript.language(), None);
    }
}
