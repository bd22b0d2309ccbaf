//! File loading: encoding-fallback decoding and CSV parsing
//!
//! Files are decoded through an ordered fallback chain (UTF-8, then
//! windows-1252, then UTF-16LE). An attempt only counts as a success if
//! decoding reported no errors and the text contains no NUL characters;
//! windows-1252 alone never fails, so the NUL rule is what routes UTF-16
//! content onward and rejects binary files.

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Dataset, DatasetSchema};
use encoding_rs::{Encoding, UTF_16LE, UTF_8, WINDOWS_1252};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Header reads never pull more than this many bytes
const HEADER_READ_LIMIT: u64 = 64 * 1024;

fn fallback_chain() -> [&'static Encoding; 3] {
    [UTF_8, WINDOWS_1252, UTF_16LE]
}

/// Decode raw bytes through the fallback chain.
///
/// Returns the decoded text and the name of the encoding that succeeded.
/// BOM sniffing may redirect an attempt to the BOM's encoding.
fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<(String, String)> {
    for encoding in fallback_chain() {
        let (text, used, had_errors) = encoding.decode(bytes);
        if !had_errors && !text.contains('\0') {
            return Ok((text.into_owned(), used.name().to_string()));
        }
    }

    // Report the failure in terms of the primary encoding: byte offset of
    // the first invalid (or NUL) byte, plus derived line/column.
    let offset = match std::str::from_utf8(bytes) {
        Err(e) => e.valid_up_to(),
        Ok(text) => text.find('\0').unwrap_or(bytes.len()),
    };
    let (line, column) = line_col(bytes, offset);
    Err(Error::Decode {
        path: path.to_path_buf(),
        offset,
        line,
        column,
    })
}

/// 1-based line/column of a byte offset
fn line_col(bytes: &[u8], offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut line_start = 0;
    for (i, &b) in bytes.iter().enumerate().take(offset) {
        if b == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, offset - line_start + 1)
}

/// Dataset identity: the file stem
fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Load only a dataset's header: identity, ordered columns, encoding.
///
/// Reads at most 64 KiB of the file head, so the cost stays O(header)
/// regardless of file size. Errors if the header line does not fit in
/// that bound.
pub fn read_schema<P: AsRef<Path>>(path: P) -> Result<DatasetSchema> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut head = Vec::new();
    file.take(HEADER_READ_LIMIT)
        .read_to_end(&mut head)
        .map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    // A full-limit read means the file was truncated mid-line somewhere;
    // cut back to the last complete line so decoding stays clean.
    if head.len() as u64 == HEADER_READ_LIMIT {
        head = trim_to_last_newline(head, path)?;
    }

    let (text, encoding) = decode_bytes(path, &head)?;
    let columns = parse_header(&text, path)?;

    Ok(DatasetSchema {
        name: dataset_name(path),
        path: path.to_path_buf(),
        columns,
        encoding,
    })
}

/// Drop everything after the last newline. For UTF-16LE content the NUL
/// high byte of the newline code unit is kept so the slice stays an even
/// number of bytes.
fn trim_to_last_newline(mut head: Vec<u8>, path: &Path) -> Result<Vec<u8>> {
    let Some(idx) = head.iter().rposition(|&b| b == b'\n') else {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: format!("header line exceeds the {} byte read limit", HEADER_READ_LIMIT),
        });
    };
    let mut end = idx + 1;
    if head.get(end) == Some(&0) {
        end += 1;
    }
    head.truncate(end);
    Ok(head)
}

/// Load a dataset in full: decode, parse header and typed rows
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (text, encoding) = decode_bytes(path, &bytes)?;
    parse_dataset(&text, dataset_name(path), path.to_path_buf(), encoding)
}

/// Parse a dataset from a string (useful for testing)
pub fn read_table_str(content: &str, name: &str) -> Result<Dataset> {
    parse_dataset(
        content,
        name.to_string(),
        PathBuf::from(format!("{}.csv", name)),
        "UTF-8".to_string(),
    )
}

/// Parse and validate a header line into ordered columns
fn parse_header(content: &str, path: &Path) -> Result<Vec<Column>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.to_string(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut seen = std::collections::BTreeSet::new();
    for col in &columns {
        if col.name.contains('\u{FFFD}') || col.name.contains('\0') {
            return Err(Error::CsvParse {
                path: path.to_path_buf(),
                message: format!("header contains undecodable characters: '{}'", col.name),
            });
        }
        // A repeated name would make join-column lookup ambiguous
        if !seen.insert(col.name.as_str()) {
            return Err(Error::CsvParse {
                path: path.to_path_buf(),
                message: format!("duplicate column name '{}'", col.name),
            });
        }
    }

    Ok(columns)
}

fn parse_dataset(
    content: &str,
    name: String,
    path: PathBuf,
    encoding: String,
) -> Result<Dataset> {
    let columns = parse_header(content, &path)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        // Pad with empty cells if row is shorter than header
        while cells.len() < columns.len() {
            cells.push(CellValue::Empty);
        }

        // Warn if row is longer than header (truncate)
        if cells.len() > columns.len() {
            eprintln!(
                "Warning: row {} in {} has more cells than columns, truncating",
                row_idx + 1,
                path.display()
            );
            cells.truncate(columns.len());
        }

        rows.push(cells);
    }

    Ok(Dataset {
        name,
        path,
        columns,
        rows,
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "id,name,value\n1,foo,100\n2,bar,200\n";
        let ds = read_table_str(csv, "test").unwrap();

        assert_eq!(ds.name, "test");
        assert_eq!(ds.columns.len(), 3);
        assert_eq!(ds.columns[0].name, "id");
        assert_eq!(ds.columns[2].name, "value");

        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0][0], CellValue::Integer(1));
        assert_eq!(ds.rows[1][1], CellValue::Text("bar".to_string()));
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let csv = "id,name,value\n1,foo\n";
        let ds = read_table_str(csv, "test").unwrap();

        assert_eq!(ds.rows[0].len(), 3);
        assert_eq!(ds.rows[0][2], CellValue::Empty);
    }

    #[test]
    fn test_parse_with_floats() {
        let csv = "id,value\n1,3.14\n";
        let ds = read_table_str(csv, "test").unwrap();
        assert_eq!(ds.rows[0][1], CellValue::Float(3.14));
    }

    #[test]
    fn test_duplicate_column_is_an_error() {
        let csv = "id,name,id\n1,foo,2\n";
        let err = read_table_str(csv, "test").unwrap_err();
        assert!(matches!(err, Error::CsvParse { .. }));
        assert!(err.to_string().contains("duplicate column name 'id'"));
    }

    #[test]
    fn test_empty_content_is_an_error() {
        let err = read_table_str("", "test").unwrap_err();
        assert!(matches!(err, Error::CsvParse { .. }));
    }

    #[test]
    fn test_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        std::fs::write(&path, "id,name\n1,caf\u{e9}\n").unwrap();

        let ds = read_table(&path).unwrap();
        assert_eq!(ds.encoding, "UTF-8");
        assert_eq!(ds.rows[0][1], CellValue::Text("caf\u{e9}".to_string()));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // 0xE9 is é in windows-1252 and invalid as a lone UTF-8 byte
        let mut file = File::create(&path).unwrap();
        file.write_all(b"id,name\n1,caf\xe9\n").unwrap();
        drop(file);

        let ds = read_table(&path).unwrap();
        assert_eq!(ds.encoding, "windows-1252");
        assert_eq!(ds.rows[0][1], CellValue::Text("caf\u{e9}".to_string()));
    }

    #[test]
    fn test_utf16le_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        let bytes: Vec<u8> = "id,name\n1,x\n"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        std::fs::write(&path, bytes).unwrap();

        let ds = read_table(&path).unwrap();
        assert_eq!(ds.encoding, "UTF-16LE");
        assert_eq!(ds.columns[1].name, "name");
        assert_eq!(ds.rows[0][1], CellValue::Text("x".to_string()));
    }

    #[test]
    fn test_binary_file_fails_with_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.csv");
        // Invalid UTF-8 at offset 0, NULs for the other attempts, odd
        // length so UTF-16LE reports an error too
        std::fs::write(&path, [0xff, 0x00, 0x00, 0xff, 0x80]).unwrap();

        let err = read_table(&path).unwrap_err();
        match err {
            Error::Decode {
                offset,
                line,
                column,
                ..
            } => {
                assert_eq!(offset, 0);
                assert_eq!(line, 1);
                assert_eq!(column, 1);
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_offset_points_at_failing_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.csv");
        // Valid header, NUL byte on the second line, odd byte count so
        // every fallback rejects it and the diagnostic names the position
        std::fs::write(&path, b"id,name\n1,a\x00b\xff\xfe").unwrap();

        let err = read_table(&path).unwrap_err();
        match err {
            Error::Decode { offset, line, .. } => {
                assert_eq!(line, 2);
                assert!(offset >= 8);
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_schema_is_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        std::fs::write(&path, "id,name\n1,a\n2,b\n").unwrap();

        let schema = read_schema(&path).unwrap();
        assert_eq!(schema.name, "big");
        assert_eq!(schema.column_count(), 2);
        assert_eq!(schema.columns[1].name, "name");
    }

    #[test]
    fn test_read_schema_round_trip_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stable.csv");
        std::fs::write(&path, "b,a,c\n1,2,3\n").unwrap();

        let first = read_schema(&path).unwrap();
        let second = read_schema(&path).unwrap();
        let names = |s: &DatasetSchema| {
            s.columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_oversized_header_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide_header.csv");
        // One header "line" longer than the read limit, no newline
        std::fs::write(&path, "a".repeat(70_000)).unwrap();

        let err = read_schema(&path).unwrap_err();
        assert!(err.to_string().contains("header line exceeds"));
    }
}
