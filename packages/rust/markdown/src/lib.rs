//! Markdown pipe-table parsing and formatting.
//!
//! The generator is asked to answer with a pipe table. [`parse_table`] pulls
//! that table out of a reply that may also carry prose or code fences, and
//! [`format_table`] writes one back out.

use tracing::{debug, warn};

use quizcards_shared::{QuizcardsError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A parsed pipe table: header columns plus data rows of the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows dropped because their cell count did not match the header.
    pub skipped_rows: usize,
}

impl ParsedTable {
    /// Index of the column named `name`, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the first pipe table found in `text`.
///
/// Lines without a pipe are ignored, as are separator rows. The first
/// remaining row is the header. At least one data row of the header's width
/// must follow it.
pub fn parse_table(text: &str) -> Result<ParsedTable> {
    let mut structural: Vec<Vec<String>> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('|'))
        .filter(|line| !is_separator_row(line))
        .map(split_row)
        .collect();

    if structural.len() < 2 {
        return Err(QuizcardsError::parse(format!(
            "expected a header and at least one data row, found {} table row(s)",
            structural.len()
        )));
    }

    let columns = structural.remove(0);
    let width = columns.len();
    let mut rows = Vec::with_capacity(structural.len());
    let mut skipped_rows = 0;

    for (i, mut cells) in structural.into_iter().enumerate() {
        if cells.len() > width && cells[width..].iter().all(String::is_empty) {
            cells.truncate(width);
        }
        if cells.len() != width {
            warn!(
                row = i + 1,
                expected = width,
                found = cells.len(),
                "skipping table row with wrong number of cells"
            );
            skipped_rows += 1;
            continue;
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return Err(QuizcardsError::parse(format!(
            "table has no usable data rows ({skipped_rows} row(s) with the wrong number of cells)"
        )));
    }

    debug!(columns = width, rows = rows.len(), skipped_rows, "parsed table");

    Ok(ParsedTable {
        columns,
        rows,
        skipped_rows,
    })
}

/// A row made only of dashes, colons, pipes and whitespace, with at least one dash.
fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|') || c.is_whitespace())
}

/// Split one table line into trimmed cells. `\|` is a literal pipe and `\-`
/// a literal dash.
fn split_row(line: &str) -> Vec<String> {
    let mut body = line.strip_prefix('|').unwrap_or(line);
    if body.ends_with('|') && !body.ends_with("\\|") {
        body = &body[..body.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('|' | '-')) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render columns and rows as a pipe table with a `---` separator row.
pub fn format_table<S: AsRef<str>>(columns: &[S], rows: &[Vec<String>]) -> String {
    let mut md = String::new();

    push_row(&mut md, columns.iter().map(AsRef::as_ref));

    md.push_str("| ");
    md.push_str(&vec!["---"; columns.len()].join(" | "));
    md.push_str(" |\n");

    for row in rows {
        push_row(&mut md, row.iter().map(String::as_str));
    }

    md
}

fn push_row<'a>(md: &mut String, cells: impl Iterator<Item = &'a str>) {
    let cells: Vec<String> = cells.map(escape_cell).collect();
    md.push_str("| ");
    md.push_str(&cells.join(" | "));
    md.push_str(" |\n");
}

fn escape_cell(cell: &str) -> String {
    let cell = cell.replace(['\r', '\n'], " ").replace('|', "\\|");
    // A row of dash-only cells would read back as a separator row
    if cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':') || c.is_whitespace()) {
        cell.replace('-', "\\-")
    } else {
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_reply_with_surrounding_prose() {
        let reply = "Here are your flashcards:\n\n\
            ```markdown\n\
            | Question | Answer | Difficulty |\n\
            |:---|:---:|---:|\n\
            | Who founded Macondo? | José Arcadio Buendía | 2 |\n\
            | What genre? | Magical realism | 1 |\n\
            ```\n\n\
            Let me know if you need more.";

        let table = parse_table(reply).unwrap();
        assert_eq!(table.columns, cells(&["Question", "Answer", "Difficulty"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "José Arcadio Buendía");
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn format_then_parse_round_trip() {
        let columns = cells(&["Question", "Answer"]);
        let rows = vec![
            cells(&["Either/or | both?", "Kierkegaard"]),
            cells(&["", "empty question"]),
            cells(&["Line\nbreak", "joined"]),
        ];

        let md = format_table(&columns, &rows);
        let table = parse_table(&md).unwrap();

        assert_eq!(table.columns, columns);
        assert_eq!(table.rows[0], rows[0]);
        assert_eq!(table.rows[1], rows[1]);
        assert_eq!(table.rows[2], cells(&["Line break", "joined"]));
    }

    #[test]
    fn header_and_separator_only_is_rejected() {
        let err = parse_table("| Question | Answer |\n|---|---|\n").unwrap_err();
        assert!(matches!(err, QuizcardsError::Parse { .. }));
    }

    #[test]
    fn reply_without_table_is_rejected() {
        assert!(parse_table("I cannot help with that.").is_err());
        assert!(parse_table("").is_err());
    }

    #[test]
    fn table_whose_rows_are_all_malformed_is_rejected() {
        let md = "| Question | Answer | Difficulty |\n|---|---|---|\n| q1 | a1 |\n| q2 |\n";
        let err = parse_table(md).unwrap_err();
        assert!(matches!(err, QuizcardsError::Parse { .. }));
        assert!(err.to_string().contains("2 row(s)"));
    }

    #[test]
    fn dash_only_cells_survive_round_trip() {
        let columns = cells(&["Question", "Answer"]);
        let rows = vec![cells(&["-", ":--"]), cells(&["q", "a - b"])];

        let md = format_table(&columns, &rows);
        assert!(md.contains("| \\- | :\\-\\- |"));

        let table = parse_table(&md).unwrap();
        assert_eq!(table.rows, rows);
    }

    #[test]
    fn trailing_empty_cells_are_truncated() {
        let table = parse_table("| Q | A |\n|---|---|\n| q1 | a1 | |\n").unwrap();
        assert_eq!(table.rows, vec![cells(&["q1", "a1"])]);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn mismatched_rows_are_skipped() {
        let md = "| Q | A |\n|---|---|\n| q1 | a1 |\n| only one |\n| q3 | a3 | extra |\n| q4 | a4 |";
        let table = parse_table(md).unwrap();
        assert_eq!(table.rows, vec![cells(&["q1", "a1"]), cells(&["q4", "a4"])]);
        assert_eq!(table.skipped_rows, 2);
    }

    #[test]
    fn rows_without_outer_pipes() {
        let table = parse_table("Q | A\n--- | ---\nq1 | a1").unwrap();
        assert_eq!(table.columns, cells(&["Q", "A"]));
        assert_eq!(table.rows, vec![cells(&["q1", "a1"])]);
    }

    #[test]
    fn column_lookup_ignores_case() {
        let table = parse_table("| question | ANSWER |\n|---|---|\n| q | a |").unwrap();
        assert_eq!(table.column_index("Question"), Some(0));
        assert_eq!(table.column_index("answer"), Some(1));
        assert_eq!(table.column_index("Difficulty"), None);
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator_row("|---|:---:|"));
        assert!(is_separator_row("--- | ---"));
        assert!(!is_separator_row("| - | dash |"));
        assert!(!is_separator_row("| | |"));
    }
}
