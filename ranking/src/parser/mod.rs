//! Ranking file parser with delimiter auto-detection and scalar coercion.
//!
//! The delimiter is guessed from the header line only and then applied to
//! the whole file. Cells become [`CellValue`]s: empty cells are null,
//! `true`/`false` are booleans, numeric literals are numbers.

use csv::{ReaderBuilder, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

use crate::error::{CsvError, CsvResult};
use crate::models::{CellValue, RankingRow, RankingTable};

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [',', '\t', '|', ';'];

/// Used when no candidate splits the header into more than one field.
const DEFAULT_DELIMITER: char = ',';

/// Largest magnitude still coerced to a number; bigger literals stay text.
const MAX_SAFE_NUMBER: f64 = 9_007_199_254_740_992.0;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$").expect("valid number pattern")
});

/// Decode raw bytes as UTF-8, replacing invalid sequences and dropping a BOM.
pub fn decode_content(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Detect the delimiter from the first line.
///
/// Each candidate splits the line (quote-aware); the one producing the most
/// fields wins, earlier candidates win ties.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = DEFAULT_DELIMITER;
    let mut best_count = 1;

    for &sep in &DELIMITERS {
        let count = field_count(first_line, sep);
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

fn field_count(line: &str, delimiter: char) -> usize {
    ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map(|record| record.len())
        .unwrap_or(0)
}

/// Coerce one raw cell.
pub fn coerce(raw: &str) -> CellValue {
    match raw {
        "" => return CellValue::Null,
        "true" | "TRUE" => return CellValue::Bool(true),
        "false" | "FALSE" => return CellValue::Bool(false),
        _ => {}
    }

    if NUMBER.is_match(raw) {
        if let Ok(n) = raw.trim().parse::<f64>() {
            if n.abs() < MAX_SAFE_NUMBER {
                return CellValue::Number(n);
            }
        }
    }

    CellValue::Text(raw.to_string())
}

/// Parse raw ranking file bytes.
///
/// Never fails: empty or unreadable input yields an empty table.
pub fn parse_ranking_table(bytes: &[u8]) -> RankingTable {
    parse_ranking_text(&decode_content(bytes))
}

/// Parse decoded ranking file text. See [`parse_ranking_table`].
pub fn parse_ranking_text(content: &str) -> RankingTable {
    let delimiter = detect_delimiter(content);
    match parse_with_delimiter(content, delimiter) {
        Ok(table) => table,
        Err(e) => {
            debug!(error = %e, "ranking file yielded no rows");
            RankingTable::empty()
        }
    }
}

/// Parse with an explicit delimiter, reporting why nothing could be read.
pub fn parse_with_delimiter(content: &str, delimiter: char) -> CsvResult<RankingTable> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;

        // Blank line
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let row: RankingRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, raw)| (header.clone(), coerce(raw)))
            .collect();
        rows.push(row);
    }

    Ok(RankingTable {
        headers,
        delimiter,
        rows,
    })
}

/// Read and parse a ranking file from disk.
pub fn parse_ranking_file<P: AsRef<Path>>(path: P) -> std::io::Result<RankingTable> {
    let bytes = std::fs::read(path.as_ref())?;
    Ok(parse_ranking_table(&bytes))
}

/// Serialize a table back to CSV, header first, columns in header order.
pub fn write_ranking_table(table: &RankingTable, delimiter: char) -> CsvResult<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(Vec::new());

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(
            table
                .headers
                .iter()
                .map(|h| row.get(h).map(|cell| cell.to_string()).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::ParseError(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_ranking_text("doi,asreview_ranking\n10.1/a,2\n10.1/b,1");

        assert_eq!(table.delimiter, ',');
        assert_eq!(table.headers, vec!["doi", "asreview_ranking"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("doi"), Some(&CellValue::Text("10.1/a".into())));
        assert_eq!(table.rows[0].get("asreview_ranking"), Some(&CellValue::Number(2.0)));
        assert_eq!(table.rows[1].get("asreview_ranking"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_semicolon_file() {
        let table = parse_ranking_text("record_id;doi;issn;asreview_ranking\n4;10.1/a;;7\n");

        assert_eq!(table.delimiter, ';');
        assert_eq!(table.rows[0].get("issn"), Some(&CellValue::Null));
        assert_eq!(table.rows[0].get("record_id"), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_quoted_values() {
        let table = parse_ranking_text("title,doi\n\"Hello, World\",10.1/a");

        assert_eq!(table.rows[0].get("title"), Some(&CellValue::Text("Hello, World".into())));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_ranking_text("a,b\n1,2\n\n3,4\n");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_short_rows_leave_columns_absent() {
        let table = parse_ranking_text("a,b,c\n1,2");

        assert_eq!(table.rows[0].get("a"), Some(&CellValue::Number(1.0)));
        assert_eq!(table.rows[0].get("c"), None);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let table = parse_ranking_text("a,b\n1,2,3,4");

        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[0].get("b"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        assert!(parse_ranking_text("").is_empty());
        assert!(parse_ranking_text("  \n").is_empty());
        assert!(parse_ranking_table(&[]).is_empty());
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = parse_ranking_text("doi,issn,asreview_ranking\n");
        assert!(table.is_empty());
        assert_eq!(table.headers.len(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let bytes: &[u8] = b"doi,asreview_ranking\n10.1/\xff,3\n";
        let table = parse_ranking_table(bytes);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get("asreview_ranking"), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_bom_is_stripped() {
        let table = parse_ranking_table("\u{feff}doi,asreview_ranking\n10.1/a,1".as_bytes());
        assert!(table.rows[0].get("doi").is_some());
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_delimiter_uses_first_line_only() {
        // Body is full of semicolons, header is comma separated
        assert_eq!(detect_delimiter("doi,title\n10.1/a,\"a;b;c;d;e\""), ',');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted_separators() {
        assert_eq!(detect_delimiter("\"a,b,c\";d\n"), ';');
    }

    #[test]
    fn test_detect_delimiter_single_column_defaults_to_comma() {
        assert_eq!(detect_delimiter("doi\n10.1/a"), ',');
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(""), CellValue::Null);
        assert_eq!(coerce("TRUE"), CellValue::Bool(true));
        assert_eq!(coerce("false"), CellValue::Bool(false));
        assert_eq!(coerce("42"), CellValue::Number(42.0));
        assert_eq!(coerce("-0.5"), CellValue::Number(-0.5));
        assert_eq!(coerce(".5"), CellValue::Number(0.5));
        assert_eq!(coerce("1e3"), CellValue::Number(1000.0));
        assert_eq!(coerce("1234-5678"), CellValue::Text("1234-5678".into()));
        assert_eq!(coerce("10.1/a"), CellValue::Text("10.1/a".into()));
        assert_eq!(coerce("True"), CellValue::Text("True".into()));
        assert_eq!(
            coerce("123456789012345678901"),
            CellValue::Text("123456789012345678901".into())
        );
    }

    #[test]
    fn test_written_table_parses_back_to_same_rows() {
        let source = "doi;issn;title;asreview_ranking\n\
                      10.1/a;;\"semi;colon\";2\n\
                      ;1234-5678;plain;9\n\
                      10.1/c;0000-0001;x;0.5\n";
        let table = parse_ranking_text(source);
        assert_eq!(table.delimiter, ';');

        let written = write_ranking_table(&table, table.delimiter).unwrap();
        let reparsed = parse_ranking_text(&written);

        assert_eq!(reparsed.rows, table.rows);
        assert_eq!(reparsed.headers, table.headers);
        assert_eq!(reparsed.delimiter, ';');
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asreview.csv");
        std::fs::write(&path, "doi\tasreview_ranking\n10.1/a\t5\n").unwrap();

        let table = parse_ranking_file(&path).unwrap();
        assert_eq!(table.delimiter, '\t');
        assert_eq!(table.rows[0].get("asreview_ranking"), Some(&CellValue::Number(5.0)));
    }
}
