//! Case-insensitive literal term matching over corpus rows.

use regex::{Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

use quizcards_shared::{QuizcardsError, Result};

use crate::CorpusRow;

/// Matches one search term as a literal, ignoring case.
///
/// The term is composed (NFC) first: search terms come out of the text
/// normalizer decomposed, while corpus text is stored precomposed.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    pattern: Regex,
}

impl TermMatcher {
    pub fn new(term: &str) -> Result<Self> {
        let composed: String = term.nfc().collect();
        let pattern = RegexBuilder::new(&regex::escape(&composed))
            .case_insensitive(true)
            .build()
            .map_err(|e| QuizcardsError::validation(format!("unusable search term '{term}': {e}")))?;
        Ok(Self { pattern })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Whether any searchable field of the row contains the term.
    pub fn matches_row(&self, row: &CorpusRow) -> bool {
        match row {
            CorpusRow::SingleQuestion(r) => self.is_match(&r.question) || self.is_match(&r.answer),
            CorpusRow::MultiPart(r) => {
                self.is_match(&r.leadin)
                    || r.parts.iter().any(|p| self.is_match(p))
                    || r.answers.iter().any(|a| self.is_match(a))
            }
        }
    }
}
