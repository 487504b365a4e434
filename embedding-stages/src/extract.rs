//! Record extraction from CSV text.
//!
//! The header row names the columns. For every data row the extractor builds
//! the embedding input (values of the requested columns that exist in the
//! header, in request order, joined by a single space) and the metadata
//! (every other column). Requested columns missing from the header are skipped.
//!
//! Rows are produced lazily; a malformed row surfaces as an `Err` item at its
//! position and ends the sequence.

use std::sync::Arc;

use csv::{ReaderBuilder, StringRecordsIntoIter};
use vector_index::Metadata;

use crate::errors::{Result, StageError};

/// One parsed row: column values in header order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// `(column, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Extractor output for one data row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedRow {
    /// 0-based data row index (header excluded).
    pub index: usize,
    pub row: Row,
    pub text: String,
    pub metadata: Metadata,
}

/// Lazy row sequence over borrowed CSV text.
pub struct Extraction<'a> {
    headers: Arc<[String]>,
    /// Header positions of the requested columns, in request order.
    embed_positions: Vec<usize>,
    records: StringRecordsIntoIter<&'a [u8]>,
    next_index: usize,
    failed: bool,
}

impl Extraction<'_> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn build(&self, index: usize, values: Vec<String>) -> ExtractedRow {
        let text = self
            .embed_positions
            .iter()
            .map(|&i| values[i].as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let metadata = self
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.embed_positions.contains(i))
            .map(|(i, h)| (h.clone(), values[i].clone()))
            .collect();

        ExtractedRow {
            index,
            row: Row {
                headers: Arc::clone(&self.headers),
                values,
            },
            text,
            metadata,
        }
    }
}

impl Iterator for Extraction<'_> {
    type Item = Result<ExtractedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let record = match self.records.next()? {
            Ok(r) => r,
            Err(e) => {
                self.failed = true;
                return Some(Err(StageError::MalformedInput(format!(
                    "row {}: {e}",
                    self.next_index
                ))));
            }
        };
        let index = self.next_index;
        self.next_index += 1;
        let values = record.iter().map(str::to_string).collect();
        Some(Ok(self.build(index, values)))
    }
}

/// Starts extracting rows from `text`.
///
/// # Errors
/// [`StageError::MalformedInput`] if the text has no header row or it cannot
/// be read. Row-level
/// errors (column count mismatch, invalid UTF-8) appear as items of the
/// returned iterator.
pub fn extract<'a>(text: &'a str, embed_columns: &[String]) -> Result<Extraction<'a>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Arc<[String]> = reader
        .headers()
        .map_err(|e| StageError::MalformedInput(format!("header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || text.trim().is_empty() {
        return Err(StageError::MalformedInput("header: no columns".into()));
    }

    let embed_positions = embed_columns
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == c))
        .collect();

    Ok(Extraction {
        headers,
        embed_positions,
        records: reader.into_records(),
        next_index: 0,
        failed: false,
    })
}

/// Eager variant of [`extract`]: all rows or the first error.
pub fn extract_all(text: &str, embed_columns: &[String]) -> Result<Vec<ExtractedRow>> {
    extract(text, embed_columns)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(c: &[&str]) -> Vec<String> {
        c.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_text_and_metadata() {
        let csv = "title,description,price\nA,d1,9\nB,d2,10\n";
        let rows = extract_all(csv, &cols(&["title", "description"])).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].text, "A d1");
        assert_eq!(rows[1].text, "B d2");
        assert_eq!(rows[0].metadata.get("price").map(String::as_str), Some("9"));
        assert_eq!(rows[1].metadata.len(), 1);
        assert_eq!(rows[1].row.get("title"), Some("B"));
    }

    #[test]
    fn text_follows_request_order_and_skips_missing_columns() {
        let csv = "title,description,price\nA,d1,9\n";
        let rows = extract_all(csv, &cols(&["description", "color", "title"])).unwrap();

        assert_eq!(rows[0].text, "d1 A");
        assert_eq!(rows[0].metadata.keys().collect::<Vec<_>>(), vec!["price"]);
    }

    #[test]
    fn empty_or_blank_file_has_no_columns() {
        for text in ["", "  \n\t\n", "\n\n"] {
            let err = extract_all(text, &cols(&["title"])).unwrap_err();
            assert!(
                matches!(&err, StageError::MalformedInput(m) if m == "header: no columns"),
                "{text:?} -> {err}"
            );
        }
    }

    #[test]
    fn no_matching_columns_gives_empty_text() {
        let rows = extract_all("a,b\n1,2\n", &cols(&["title"])).unwrap();
        assert_eq!(rows[0].text, "");
        assert_eq!(rows[0].metadata.len(), 2);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let csv = "title,description\n\"Chair, oak\",\"say \"\"hi\"\"\"\n";
        let rows = extract_all(csv, &cols(&["title", "description"])).unwrap();
        assert_eq!(rows[0].text, "Chair, oak say \"hi\"");
    }

    #[test]
    fn ragged_row_is_malformed_and_ends_iteration() {
        let csv = "a,b\n1,2\n3\n4,5\n";
        let mut it = extract(csv, &cols(&["a"])).unwrap();

        assert!(it.next().unwrap().is_ok());
        let err = it.next().unwrap().unwrap_err();
        assert!(matches!(err, StageError::MalformedInput(_)));
        assert!(it.next().is_none());

        assert!(extract_all(csv, &cols(&["a"])).is_err());
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let it = extract("title,description\n", &cols(&["title"])).unwrap();
        assert_eq!(it.headers(), ["title", "description"]);
        assert_eq!(it.count(), 0);
    }
}
