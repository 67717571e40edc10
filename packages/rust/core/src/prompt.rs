//! Prompt construction: category display names, key-term emphasis, corpus
//! excerpts and placeholder substitution.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use quizcards_corpus::CorpusRow;
use quizcards_shared::{QuizcardsError, Result, TopicEntry};

/// Placeholders a generation template may reference.
pub const PROMPT_PLACEHOLDERS: &[&str] = &[
    "category",
    "topic",
    "text",
    "num_related_tossups",
    "tossups",
    "num_related_bonuses",
    "bonuses",
];

const SHORT_TEMPLATE: &str = include_str!("../prompts/short.md");
const DETAILED_TEMPLATE: &str = include_str!("../prompts/detailed.md");
const FREQUENCY_TEMPLATE: &str = include_str!("../prompts/frequency.md");

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Built-in generation prompt variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Compact instructions with a worked example.
    Short,
    /// Long-form instructions covering power clues and pitfalls.
    Detailed,
    /// Prioritizes clues that recur across past questions.
    #[default]
    Frequency,
}

impl PromptStyle {
    pub const ALL: [PromptStyle; 3] = [Self::Short, Self::Detailed, Self::Frequency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Detailed => "detailed",
            Self::Frequency => "frequency",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::Short => SHORT_TEMPLATE,
            Self::Detailed => DETAILED_TEMPLATE,
            Self::Frequency => FREQUENCY_TEMPLATE,
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStyle {
    type Err = QuizcardsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                QuizcardsError::validation(format!(
                    "unknown prompt style '{s}' (expected short, detailed or frequency)"
                ))
            })
    }
}

/// A generation template together with the name it is reported under.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    pub fn builtin(style: PromptStyle) -> Self {
        Self {
            name: style.as_str().to_string(),
            text: style.template().to_string(),
        }
    }

    /// Load a custom template from disk, rejecting unknown placeholders up front.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| QuizcardsError::io(path, e))?;
        let template = Self {
            name: path.display().to_string(),
            text,
        };
        template
            .validate()
            .map_err(|e| QuizcardsError::config(format!("{}: {e}", path.display())))?;
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn validate(&self) -> Result<()> {
        let values: HashMap<&str, String> = PROMPT_PLACEHOLDERS
            .iter()
            .map(|name| (*name, String::new()))
            .collect();
        render_template(&self.text, &values).map(|_| ())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin(PromptStyle::default())
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Substitute `{name}` placeholders in `template`.
///
/// `{{` and `}}` produce literal braces. Any other brace, or a placeholder
/// missing from `values`, is a template error.
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> Result<String> {
    static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}|[{}]").expect("valid regex")
    });

    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(template) {
        let Some(token) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..token.start()]);
        last = token.end();

        match (token.as_str(), caps.get(1)) {
            ("{{", _) => out.push('{'),
            ("}}", _) => out.push('}'),
            (_, Some(name)) => {
                let value = values.get(name.as_str()).ok_or_else(|| {
                    QuizcardsError::template(format!("unknown placeholder `{}`", name.as_str()))
                })?;
                out.push_str(value);
            }
            (brace, None) => {
                return Err(QuizcardsError::template(format!(
                    "unmatched `{brace}` at byte {}",
                    token.start()
                )));
            }
        }
    }
    out.push_str(&template[last..]);

    Ok(out)
}

// ---------------------------------------------------------------------------
// Topic text
// ---------------------------------------------------------------------------

/// Category name as shown in prompts: the lower-cased title without the
/// "you gotta know (these)" boilerplate.
pub fn display_category(article_title: &str) -> String {
    let lower = article_title.to_lowercase();
    let stripped = lower
        .strip_prefix("you gotta know these ")
        .or_else(|| lower.strip_prefix("you gotta know "))
        .unwrap_or(&lower);
    stripped.trim().to_string()
}

/// Wrap each occurrence of a key term in `**…**`.
///
/// Longer terms win: a match overlapping an already-wrapped span is left
/// alone, so a term contained in another never produces nested markers.
pub fn emphasize_terms(text: &str, terms: &[String]) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for term in terms.iter().map(|t| t.trim()) {
        if !term.is_empty() && !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut spans: Vec<(usize, usize)> = Vec::new();
    for term in unique {
        for (start, matched) in text.match_indices(term) {
            let end = start + matched.len();
            if spans.iter().all(|&(s, e)| end <= s || start >= e) {
                spans.push((start, end));
            }
        }
    }
    spans.sort_unstable();

    let mut out = String::with_capacity(text.len() + spans.len() * 4);
    let mut last = 0;
    for (start, end) in spans {
        out.push_str(&text[last..start]);
        out.push_str("**");
        out.push_str(&text[start..end]);
        out.push_str("**");
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

// ---------------------------------------------------------------------------
// Corpus excerpts
// ---------------------------------------------------------------------------

/// Related corpus questions, rendered for a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcerptBundle {
    pub num_tossups: usize,
    pub tossups: String,
    pub num_bonuses: usize,
    pub bonuses: String,
}

impl ExcerptBundle {
    pub fn from_matches(tossups: &[&CorpusRow], bonuses: &[&CorpusRow]) -> Self {
        Self {
            num_tossups: tossups.len(),
            tossups: format_excerpts(tossups),
            num_bonuses: bonuses.len(),
            bonuses: format_excerpts(bonuses),
        }
    }
}

/// Render rows as text blocks separated by a blank line.
pub fn format_excerpts(rows: &[&CorpusRow]) -> String {
    rows.iter()
        .map(|row| format_excerpt(row))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_excerpt(row: &CorpusRow) -> String {
    match row {
        CorpusRow::SingleQuestion(r) => {
            format!("Question: {}\nAnswer: {}", r.question.trim(), r.answer.trim())
        }
        CorpusRow::MultiPart(r) => {
            let mut block = format!("Leadin: {}\n", r.leadin.trim());
            for (i, (part, answer)) in r.parts.iter().zip(&r.answers).enumerate() {
                block.push_str(&format!(
                    "  Part {}: {}\n  Answer: {}\n",
                    i + 1,
                    part.trim(),
                    answer.trim()
                ));
            }
            block.trim().to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Fill a generation template for one topic.
pub fn format_prompt(topic: &TopicEntry, template: &str, bundle: &ExcerptBundle) -> Result<String> {
    let values: HashMap<&str, String> = HashMap::from([
        ("category", display_category(&topic.article_title)),
        ("topic", topic.topic_label.clone()),
        ("text", emphasize_terms(&topic.body_text, &topic.key_terms)),
        ("num_related_tossups", bundle.num_tossups.to_string()),
        ("tossups", bundle.tossups.clone()),
        ("num_related_bonuses", bundle.num_bonuses.to_string()),
        ("bonuses", bundle.bonuses.clone()),
    ]);
    render_template(template, &values)
}
