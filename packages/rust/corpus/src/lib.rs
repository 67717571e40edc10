//! Past-question corpus: loading and literal search.
//!
//! Two JSON-lines tables are loaded once per run:
//! - single-question records (tossups): `question_sanitized`, `answer_sanitized`
//! - multi-part records (bonuses): `leadin_sanitized`, `parts_sanitized`, `answers_sanitized`
//!
//! Each record is tagged with its [`CorpusRow`] variant at load time, so the
//! rest of the pipeline never has to guess a row's shape.

mod search;

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use quizcards_shared::{DataPaths, QuizcardsError, Result};

pub use search::TermMatcher;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A single question with one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleQuestionRow {
    pub question: String,
    pub answer: String,
    /// Name of the packet set the question came from, when recorded.
    pub set_name: Option<String>,
    /// Source difficulty level, when recorded.
    pub difficulty: Option<u8>,
}

/// A lead-in followed by parts, each with its own answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPartRow {
    pub leadin: String,
    pub parts: Vec<String>,
    pub answers: Vec<String>,
    pub set_name: Option<String>,
    pub difficulty: Option<u8>,
}

/// A corpus record, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusRow {
    SingleQuestion(SingleQuestionRow),
    MultiPart(MultiPartRow),
}

impl CorpusRow {
    pub fn set_name(&self) -> Option<&str> {
        match self {
            Self::SingleQuestion(row) => row.set_name.as_deref(),
            Self::MultiPart(row) => row.set_name.as_deref(),
        }
    }

    pub fn difficulty(&self) -> Option<u8> {
        match self {
            Self::SingleQuestion(row) => row.difficulty,
            Self::MultiPart(row) => row.difficulty,
        }
    }
}

/// Which schema a table follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    SingleQuestion,
    MultiPart,
}

impl RowKind {
    /// Fields a table of this kind must expose.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::SingleQuestion => &["question_sanitized", "answer_sanitized"],
            Self::MultiPart => &["leadin_sanitized", "parts_sanitized", "answers_sanitized"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleQuestion => "single-question",
            Self::MultiPart => "multi-part",
        }
    }

    /// Build a typed row from one record, or `None` if the record lacks the shape.
    fn row_from_record(&self, record: &Map<String, Value>) -> Option<CorpusRow> {
        let set_name = record
            .get("set")
            .and_then(|set| set.get("name"))
            .or_else(|| record.get("set_name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let difficulty = record
            .get("difficulty")
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok());

        match self {
            Self::SingleQuestion => Some(CorpusRow::SingleQuestion(SingleQuestionRow {
                question: text_field(record, "question_sanitized")?,
                answer: text_field(record, "answer_sanitized")?,
                set_name,
                difficulty,
            })),
            Self::MultiPart => Some(CorpusRow::MultiPart(MultiPartRow {
                leadin: text_field(record, "leadin_sanitized")?,
                parts: list_field(record, "parts_sanitized")?,
                answers: list_field(record, "answers_sanitized")?,
                set_name,
                difficulty,
            })),
        }
    }
}

/// A string field; non-string values read as empty text.
fn text_field(record: &Map<String, Value>, name: &str) -> Option<String> {
    let value = record.get(name)?;
    Some(value.as_str().unwrap_or_default().to_string())
}

/// A list-of-strings field; non-string elements are dropped and a bare
/// string is treated as a one-element list.
fn list_field(record: &Map<String, Value>, name: &str) -> Option<Vec<String>> {
    match record.get(name)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => Some(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// One loaded table. Read-only after load.
#[derive(Debug, Clone)]
pub struct CorpusTable {
    kind: RowKind,
    rows: Vec<CorpusRow>,
    skipped_records: usize,
}

impl CorpusTable {
    /// Build a table from already-typed rows.
    pub fn from_rows(kind: RowKind, rows: Vec<CorpusRow>) -> Self {
        Self {
            kind,
            rows,
            skipped_records: 0,
        }
    }

    /// Load a JSON-lines file.
    pub fn load(path: &Path, kind: RowKind) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| QuizcardsError::io(path, e))?;
        Self::parse_jsonl(&content, kind)
            .map_err(|e| QuizcardsError::config(format!("{}: {e}", path.display())))
    }

    /// Parse JSON-lines content.
    ///
    /// Fails if a line is not a JSON object, or if a required field appears in
    /// no record at all. Records missing a field that other records have are
    /// skipped and counted.
    pub fn parse_jsonl(content: &str, kind: RowKind) -> Result<Self> {
        let mut records: Vec<Map<String, Value>> = Vec::new();
        let mut seen_fields: BTreeSet<String> = BTreeSet::new();

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                QuizcardsError::config(format!("line {}: invalid JSON: {e}", idx + 1))
            })?;
            let Value::Object(record) = value else {
                return Err(QuizcardsError::config(format!(
                    "line {}: expected a JSON object",
                    idx + 1
                )));
            };
            seen_fields.extend(record.keys().cloned());
            records.push(record);
        }

        let missing: Vec<&str> = kind
            .required_fields()
            .iter()
            .copied()
            .filter(|field| !seen_fields.contains(*field))
            .collect();
        if !missing.is_empty() {
            return Err(QuizcardsError::config(format!(
                "{} table is missing required fields: {}",
                kind.as_str(),
                missing.join(", ")
            )));
        }

        let total = records.len();
        let rows: Vec<CorpusRow> = records
            .iter()
            .filter_map(|record| kind.row_from_record(record))
            .collect();
        let skipped_records = total - rows.len();

        if skipped_records > 0 {
            warn!(
                kind = kind.as_str(),
                skipped = skipped_records,
                "skipped records lacking required fields"
            );
        }

        Ok(Self {
            kind,
            rows,
            skipped_records,
        })
    }

    pub fn kind(&self) -> RowKind {
        self.kind
    }

    pub fn rows(&self) -> &[CorpusRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records dropped at load time for lacking the table's shape.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Rows containing `term` (case-insensitive, literal), in table order.
    pub fn search(&self, term: &str) -> Result<Vec<&CorpusRow>> {
        let matcher = TermMatcher::new(term)?;
        let hits: Vec<&CorpusRow> = self
            .rows
            .iter()
            .filter(|row| matcher.matches_row(row))
            .collect();
        debug!(kind = self.kind.as_str(), term, hits = hits.len(), "corpus search");
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Both tables, loaded once per run.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub tossups: CorpusTable,
    pub bonuses: CorpusTable,
}

impl Corpus {
    /// Load both tables from the data directory.
    #[instrument(skip_all, fields(data_dir = %paths.data_dir.display()))]
    pub fn load(paths: &DataPaths) -> Result<Self> {
        let tossups = CorpusTable::load(&paths.tossups_path(), RowKind::SingleQuestion)?;
        let bonuses = CorpusTable::load(&paths.bonuses_path(), RowKind::MultiPart)?;

        info!(
            tossups = tossups.len(),
            bonuses = bonuses.len(),
            "corpus loaded"
        );

        Ok(Self { tossups, bonuses })
    }

    /// Single-question rows whose question or answer contains `term`.
    pub fn search_tossups(&self, term: &str) -> Result<Vec<&CorpusRow>> {
        self.tossups.search(term)
    }

    /// Multi-part rows whose lead-in, parts, or answers contain `term`.
    pub fn search_bonuses(&self, term: &str) -> Result<Vec<&CorpusRow>> {
        self.bonuses.search(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::PathBuf::from(format!("../../../fixtures/jsonl/{name}"))
    }

    fn fixture_corpus() -> Corpus {
        Corpus {
            tossups: CorpusTable::load(&fixture_path("tossups.jsonl"), RowKind::SingleQuestion)
                .expect("load tossups"),
            bonuses: CorpusTable::load(&fixture_path("bonuses.jsonl"), RowKind::MultiPart)
                .expect("load bonuses"),
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn loads_fixture_tables() {
        let corpus = fixture_corpus();
        assert_eq!(corpus.tossups.len(), 4);
        assert_eq!(corpus.tossups.skipped_records(), 1);
        assert_eq!(corpus.bonuses.len(), 3);
        assert_eq!(corpus.bonuses.kind(), RowKind::MultiPart);

        match &corpus.tossups.rows()[0] {
            CorpusRow::SingleQuestion(row) => {
                assert_eq!(row.answer, "The Dead Sea");
                assert_eq!(row.set_name.as_deref(), Some("2019 ACF Regionals"));
                assert_eq!(row.difficulty, Some(7));
            }
            other => panic!("expected single-question row, got {other:?}"),
        }
    }

    #[test]
    fn table_missing_required_field_is_config_error() {
        let content = r#"{"question_sanitized": "Q only"}"#;
        let err = CorpusTable::parse_jsonl(content, RowKind::SingleQuestion).unwrap_err();
        assert!(matches!(err, QuizcardsError::Config { .. }));
        assert!(err.to_string().contains("answer_sanitized"));
    }

    #[test]
    fn multi_part_schema_enforced_on_tossup_file() {
        let err = CorpusTable::load(&fixture_path("tossups.jsonl"), RowKind::MultiPart)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("leadin_sanitized"));
        assert!(msg.contains("tossups.jsonl"));
    }

    #[test]
    fn invalid_json_line_is_reported() {
        let content = "{\"question_sanitized\": \"a\", \"answer_sanitized\": \"b\"}\n{oops\n";
        let err = CorpusTable::parse_jsonl(content, RowKind::SingleQuestion).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn lenient_list_fields() {
        let content = r#"{"leadin_sanitized": "L", "parts_sanitized": "only part", "answers_sanitized": ["a", 3, "b"]}"#;
        let table = CorpusTable::parse_jsonl(content, RowKind::MultiPart).unwrap();
        match &table.rows()[0] {
            CorpusRow::MultiPart(row) => {
                assert_eq!(row.parts, vec!["only part"]);
                assert_eq!(row.answers, vec!["a", "b"]);
            }
            other => panic!("expected multi-part row, got {other:?}"),
        }
    }

    #[test]
    fn missing_table_file_is_io_error() {
        let err = CorpusTable::load(Path::new("/definitely/missing.jsonl"), RowKind::MultiPart)
            .unwrap_err();
        assert!(matches!(err, QuizcardsError::Io { .. }));
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    #[test]
    fn search_is_case_insensitive() {
        let corpus = fixture_corpus();
        let lower = corpus.search_tossups("dead sea").unwrap();
        let upper = corpus.search_tossups("DEAD SEA").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.len(), 2);

        let lower = corpus.search_bonuses("dead sea").unwrap();
        let upper = corpus.search_bonuses("DEAD SEA").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn search_results_contain_term() {
        use unicode_normalization::UnicodeNormalization;

        let corpus = fixture_corpus();
        for term in ["márquez", "dead sea", "o'connor"] {
            let needle: String = term.nfc().collect::<String>().to_lowercase();
            let hits: Vec<&CorpusRow> = corpus
                .search_tossups(term)
                .unwrap()
                .into_iter()
                .chain(corpus.search_bonuses(term).unwrap())
                .collect();
            assert!(!hits.is_empty(), "no hits for {term:?}");

            for row in hits {
                let fields: Vec<&str> = match row {
                    CorpusRow::SingleQuestion(r) => vec![&r.question, &r.answer],
                    CorpusRow::MultiPart(r) => std::iter::once(r.leadin.as_str())
                        .chain(r.parts.iter().map(String::as_str))
                        .chain(r.answers.iter().map(String::as_str))
                        .collect(),
                };
                assert!(
                    fields
                        .iter()
                        .any(|f| f.nfc().collect::<String>().to_lowercase().contains(&needle)),
                    "{term:?} not found in {fields:?}"
                );
            }
        }
    }

    #[test]
    fn search_matches_bonus_parts_and_answers() {
        let corpus = fixture_corpus();

        // Only appears in a part.
        let hits = corpus.search_bonuses("Buendia").unwrap();
        assert_eq!(hits.len(), 1);

        // Only appears in an answer.
        let hits = corpus.search_bonuses("Ficciones").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn search_preserves_order_and_allows_empty() {
        let corpus = fixture_corpus();
        let hits = corpus.search_tossups("the").unwrap();
        let positions: Vec<usize> = hits
            .iter()
            .map(|hit| {
                corpus
                    .tossups
                    .rows()
                    .iter()
                    .position(|row| std::ptr::eq(row, *hit))
                    .unwrap()
            })
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);

        assert!(corpus.search_tossups("zzz-no-such-term").unwrap().is_empty());
    }

    #[test]
    fn search_is_literal_not_regex() {
        let table = CorpusTable::from_rows(
            RowKind::SingleQuestion,
            vec![CorpusRow::SingleQuestion(SingleQuestionRow {
                question: "Name this author of \"A.B.C. (1920)\"".into(),
                answer: "Someone".into(),
                set_name: None,
                difficulty: None,
            })],
        );
        assert_eq!(table.search("A.B.C. (1920)").unwrap().len(), 1);
        assert!(table.search("AxBxC").unwrap().is_empty());
    }
}
