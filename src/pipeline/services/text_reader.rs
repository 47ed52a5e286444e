use crate::config::EngineConfig;
use crate::pipeline::domain::RecognizedText;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

const ELLIPSIS: &str = "...";

/// Reads recognized printed text aloud, once per noticeably different page.
pub struct TextReader {
    config: Arc<EngineConfig>,
    last_text: Option<String>,
    last_read: Option<DateTime<Utc>>,
}

impl TextReader {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            last_text: None,
            last_read: None,
        }
    }

    /// The text to speak for this frame's lines, if any.
    ///
    /// Lines are joined with single spaces. Text shorter than the configured
    /// minimum is noise. A reading is held back while the cooldown runs and
    /// while it stays similar to the last one spoken.
    pub fn read(&mut self, lines: &[RecognizedText], now: DateTime<Utc>) -> Option<String> {
        let reading = &self.config.reading;
        let text = lines
            .iter()
            .map(|line| line.text.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.chars().count() < reading.min_chars {
            debug!("Ignoring {} characters of text", text.chars().count());
            return None;
        }

        if let Some(last_read) = self.last_read {
            if now - last_read < self.config.cooldown() {
                return None;
            }
        }

        if let Some(last_text) = &self.last_text {
            let score = similarity(last_text, &text);
            if score >= reading.similarity_threshold {
                debug!("Text unchanged since last reading (similarity {:.2})", score);
                return None;
            }
        }

        self.last_text = Some(text.clone());
        self.last_read = Some(now);
        Some(truncate(text, reading.max_chars))
    }

    pub fn reset(&mut self) {
        self.last_text = None;
        self.last_read = None;
    }
}

fn truncate(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text,
    }
}

/// Share of positions holding the same character, over the shorter text.
fn similarity(a: &str, b: &str) -> f32 {
    let shorter = a.chars().count().min(b.chars().count());
    if shorter == 0 {
        return 0.0;
    }
    let same = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    same as f32 / shorter as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::Region;
    use chrono::{TimeDelta, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn lines(texts: &[&str]) -> Vec<RecognizedText> {
        texts
            .iter()
            .map(|text| RecognizedText {
                text: text.to_string(),
                region: Region::new(0.5, 0.5, 0.8, 0.1),
            })
            .collect()
    }

    fn reader() -> TextReader {
        TextReader::new(Arc::new(EngineConfig::text_reading()))
    }

    #[test]
    fn lines_are_joined_and_read() {
        let mut reader = reader();
        let text = reader.read(&lines(&["  Keep refrigerated ", "", "after opening"]), at(0));
        assert_eq!(text.as_deref(), Some("Keep refrigerated after opening"));
    }

    #[test]
    fn short_text_is_noise() {
        let mut reader = reader();
        assert_eq!(reader.read(&lines(&["EXIT"]), at(0)), None);
        // Noise never starts the cooldown
        assert!(reader.read(&lines(&["Platform 4 this way"]), at(10)).is_some());
    }

    #[test]
    fn same_page_is_not_read_twice() {
        let mut reader = reader();
        let page = lines(&["Take two tablets daily with water"]);
        assert!(reader.read(&page, at(0)).is_some());
        assert_eq!(reader.read(&page, at(60_000)), None);

        let smudged = lines(&["Take two tablets daily with watr"]);
        assert_eq!(reader.read(&smudged, at(120_000)), None);
    }

    #[test]
    fn different_page_waits_for_cooldown() {
        let mut reader = reader();
        let cooldown = EngineConfig::text_reading().cooldown();
        assert!(reader.read(&lines(&["Chapter one begins here"]), at(0)).is_some());

        let next = lines(&["Nothing else is like the sea"]);
        let just_before = cooldown - TimeDelta::milliseconds(1);
        assert_eq!(reader.read(&next, at(just_before.num_milliseconds())), None);
        assert!(reader.read(&next, at(cooldown.num_milliseconds())).is_some());
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        let mut reader = reader();
        let long = "ä".repeat(650);
        let text = reader.read(&lines(&[&long]), at(0)).unwrap();
        assert_eq!(text.chars().count(), 603);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn reset_forgets_the_last_page() {
        let mut reader = reader();
        let page = lines(&["Mind the gap between the train"]);
        assert!(reader.read(&page, at(0)).is_some());
        reader.reset();
        assert!(reader.read(&page, at(10)).is_some());
    }

    #[test]
    fn similarity_compares_positions() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abcd", "abxy"), 0.5);
        assert_eq!(similarity("ab", "abcdef"), 1.0);
    }
}
