//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used throughout the match pipeline: Unicode-aware text
//! folding for keyword matching, preview helpers for logging and a simple
//! operation timer.
//!
//! ## Input/Output Specification
//! - **Input**: Raw user text and operation names
//! - **Output**: Folded/truncated text, timing measurements

use std::time::Instant;
use unicode_normalization::UnicodeNormalization;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

/// Text processing utilities
pub struct TextUtils;

impl TextUtils {
    /// Fold text for matching: Unicode NFC normalization, lowercase,
    /// collapsed whitespace. The keyword tables assume exactly this form.
    pub fn fold(text: &str) -> String {
        let normalized: String = text.nfc().collect();
        normalized
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate text to roughly `max_chars` characters with ellipsis, for
    /// log previews.
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut)
        }
    }

    /// Count words in text
    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_lowercases_and_collapses_whitespace() {
        assert_eq!(TextUtils::fold("  Частная   ШКОЛА  "), "частная школа");
        assert_eq!(TextUtils::fold("Almaty\tSchool"), "almaty school");
    }

    #[test]
    fn fold_of_empty_is_empty() {
        assert_eq!(TextUtils::fold(""), "");
        assert_eq!(TextUtils::fold("   "), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(TextUtils::truncate("школа", 10), "школа");
        assert_eq!(TextUtils::truncate("частная школа в алматы", 10), "частная...");
    }

    #[test]
    fn word_count_counts_whitespace_tokens() {
        assert_eq!(TextUtils::word_count("школа в алматы"), 3);
    }

    #[test]
    fn timer_stop_reports_elapsed_time() {
        let timer = Timer::new("test_op");
        assert!(timer.elapsed_ms() < 1000);
        let elapsed = timer.stop();
        assert!(elapsed < 1000);
    }
}
