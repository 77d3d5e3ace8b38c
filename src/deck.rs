//! Deck model – card records and a CSV reader.
//!
//! A deck is a header row followed by one row per card. Columns are free-form;
//! a handful of well-known ones (id, template, size overrides) are located via
//! [`ColumnNames`] so projects can rename them.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DeckError;

/// Names of the well-known columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub id: String,
    pub template: String,
    pub width: String,
    pub height: String,
    pub unit: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            template: "template".to_string(),
            width: "width".to_string(),
            height: "height".to_string(),
            unit: "unit".to_string(),
        }
    }
}

/// One row of the deck. Column order follows the deck header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    header: Arc<Vec<String>>,
    values: Vec<String>,
}

impl CardRecord {
    /// Build a record from `(column, value)` pairs. Mostly useful in tests and
    /// for hosts that do not read CSV.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (header, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            header: Arc::new(header),
            values,
        }
    }

    /// Value of `column`, if the column exists in the deck header.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .iter()
            .position(|h| h == column)
            .map(|i| self.values.get(i).map(String::as_str).unwrap_or(""))
    }

    /// Value of `column`, treating empty or whitespace-only cells as absent.
    pub fn get_non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|h| h == column)
    }

    /// Card identifier from the configured id column.
    pub fn id(&self, columns: &ColumnNames) -> Option<&str> {
        self.get_non_empty(&columns.id)
    }

    /// Per-row template path, if the row names one.
    pub fn template(&self, columns: &ColumnNames) -> Option<&str> {
        self.get_non_empty(&columns.template)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), self.values.get(i).map(String::as_str).unwrap_or("")))
    }

    /// Stable content hash of the row, used as part of cache keys.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (column, value) in self.columns() {
            column.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Parse a CSV deck. The first non-empty record is the header.
///
/// Supports quoted fields with embedded commas, newlines and doubled quotes,
/// CRLF line endings and a leading UTF-8 BOM. Short rows are padded with empty
/// cells; surplus cells are dropped. Blank lines are skipped.
pub fn parse_csv(input: &str) -> Result<Vec<CardRecord>, DeckError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = CsvReader::new(input);

    let header = loop {
        match reader.next_record()? {
            Some(rec) if is_blank(&rec) => continue,
            Some(rec) => break rec.into_iter().map(|h| h.trim().to_string()).collect::<Vec<_>>(),
            None => return Err(DeckError::MissingHeader),
        }
    };

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for h in &header {
        *seen.entry(h.as_str()).or_default() += 1;
    }
    for (name, count) in seen {
        if count > 1 {
            log::warn!("Deck header repeats column '{name}' {count} times; the first one wins");
        }
    }

    let header = Arc::new(header);
    let mut cards = Vec::new();
    while let Some(mut values) = reader.next_record()? {
        if is_blank(&values) {
            continue;
        }
        values.resize(header.len(), String::new());
        cards.push(CardRecord {
            header: Arc::clone(&header),
            values,
        });
    }
    log::debug!("Parsed deck: {} columns, {} cards", header.len(), cards.len());
    Ok(cards)
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|v| v.trim().is_empty())
}

struct CsvReader<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> CsvReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
    }

    fn next_record(&mut self) -> Result<Option<Vec<String>>, DeckError> {
        if self.eof() {
            return Ok(None);
        }
        let mut fields = Vec::new();
        loop {
            let field = self.parse_field()?;
            fields.push(field);
            match self.peek() {
                Some(',') => self.advance(','),
                Some('\r') => {
                    self.advance('\r');
                    if self.peek() == Some('\n') {
                        self.advance('\n');
                    }
                    return Ok(Some(fields));
                }
                Some('\n') => {
                    self.advance('\n');
                    return Ok(Some(fields));
                }
                None => return Ok(Some(fields)),
                // parse_field only stops on separators or end of input
                Some(_) => unreachable!(),
            }
        }
    }

    fn parse_field(&mut self) -> Result<String, DeckError> {
        let mut out = String::new();
        if self.peek() == Some('"') {
            let start_line = self.line;
            self.advance('"');
            loop {
                match self.peek() {
                    Some('"') => {
                        self.advance('"');
                        if self.peek() == Some('"') {
                            self.advance('"');
                            out.push('"');
                        } else {
                            break;
                        }
                    }
                    Some(c) => {
                        self.advance(c);
                        out.push(c);
                    }
                    None => return Err(DeckError::UnterminatedQuote { line: start_line }),
                }
            }
            // Anything between the closing quote and the next separator is kept verbatim.
            while let Some(c) = self.peek() {
                if matches!(c, ',' | '\n' | '\r') {
                    break;
                }
                self.advance(c);
                out.push(c);
            }
        } else {
            while let Some(c) = self.peek() {
                if matches!(c, ',' | '\n' | '\r') {
                    break;
                }
                self.advance(c);
                out.push(c);
            }
        }
        Ok(out)
    }
}
