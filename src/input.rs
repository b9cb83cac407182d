//! Term list loading
//!
//! The term universe is read from the first column of a comma-delimited file whose
//! first record is a header.

use crate::Result;
use std::path::Path;

/// Reads the term universe from a delimited file
pub fn load_terms(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let terms = parse_terms(&content);
    tracing::info!("Loaded {} terms from {}", terms.len(), path.display());
    Ok(terms)
}

/// Extracts the first column of every record after the header
///
/// Records are separated by newlines outside double quotes, so a quoted field may
/// span several lines. Surrounding quotes are removed and `""` inside a quoted field
/// is an escaped quote. Blank lines are skipped. A record whose first field is empty
/// still yields an empty term, keeping later terms at their position in the file.
///
/// # Example
///
/// ```
/// use term_sweep::input::parse_terms;
///
/// let terms = parse_terms("term,category\nrust,lang\n\"tokio, runtime\",crate\n,orphan\n");
/// assert_eq!(terms, vec!["rust", "tokio, runtime", ""]);
/// ```
pub fn parse_terms(content: &str) -> Vec<String> {
    let mut reader = FirstColumnReader::default();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if reader.in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    reader.push('"');
                } else {
                    reader.in_quotes = false;
                }
            } else {
                reader.push(c);
            }
            continue;
        }

        match c {
            '"' if reader.at_field_start => {
                reader.in_quotes = true;
                reader.at_field_start = false;
                reader.has_content = true;
            }
            ',' => {
                reader.field += 1;
                reader.at_field_start = true;
                reader.has_content = true;
            }
            '\n' => reader.end_record(),
            '\r' => {}
            _ => {
                reader.push(c);
                reader.at_field_start = false;
                if !c.is_whitespace() {
                    reader.has_content = true;
                }
            }
        }
    }

    if reader.in_quotes {
        tracing::warn!("Unterminated quoted field at end of input");
    }
    reader.end_record();

    reader.records.into_iter().skip(1).collect()
}

/// Accumulates the first field of each record
struct FirstColumnReader {
    records: Vec<String>,
    current: String,
    field: usize,
    in_quotes: bool,
    at_field_start: bool,
    has_content: bool,
}

impl Default for FirstColumnReader {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            current: String::new(),
            field: 0,
            in_quotes: false,
            at_field_start: true,
            has_content: false,
        }
    }
}

impl FirstColumnReader {
    fn push(&mut self, c: char) {
        if self.field == 0 {
            self.current.push(c);
        }
    }

    fn end_record(&mut self) {
        let first = std::mem::take(&mut self.current);
        if self.has_content {
            self.records.push(first);
        }
        self.field = 0;
        self.in_quotes = false;
        self.at_field_start = true;
        self.has_content = false;
    }
}
