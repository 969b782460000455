//! Matrix validator: uploaded bytes to a square [`Matrix`] of numeric fields.
//!
//! Parsing runs in three steps, each of which can fail on its own:
//!
//! 1. the byte stream is bounded by [`BoundedReader`] while it is read,
//! 2. the bytes are decoded as CSV records (no header, blank lines skipped,
//!    quotes only around whole fields, every record must have the same
//!    number of fields),
//! 3. the record count must match the field count (square-matrix rule).
//!
//! Fields stay strings here; integer conversion belongs to the operations.

use std::fmt;
use std::io::{self, Read};

use crate::error::{ValidationError, ValidationResult};

/// Default upload limit in bytes (10 MiB).
pub const DEFAULT_UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;

/// A square matrix of literal numeric fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    rows: Vec<Vec<String>>,
}

impl Matrix {
    /// Build a matrix, enforcing the square-matrix rule.
    ///
    /// Only the first row's width is compared against the row count; the CSV
    /// decoder already guarantees that every row has the same width.
    pub fn from_rows(rows: Vec<Vec<String>>) -> ValidationResult<Self> {
        if let Some(first) = rows.first() {
            if first.len() != rows.len() || rows.iter().any(|r| r.len() != first.len()) {
                return Err(ValidationError::NotSquare);
            }
        }
        Ok(Self { rows })
    }

    /// The empty matrix.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Marker carried inside the `io::Error` produced by [`BoundedReader`].
#[derive(Debug, Clone, Copy)]
pub struct LimitExceeded {
    pub limit: u64,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read more than {} bytes", self.limit)
    }
}

impl std::error::Error for LimitExceeded {}

/// Reader that fails as soon as more than `limit` bytes went through it.
///
/// At most one byte past the limit is ever requested from the inner reader,
/// so an oversized stream is rejected without being buffered.
#[derive(Debug)]
pub struct BoundedReader<R> {
    inner: R,
    limit: u64,
    consumed: u64,
}

impl<R: Read> BoundedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            consumed: 0,
        }
    }

    /// Bytes read so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let allowance = self.limit.saturating_sub(self.consumed).saturating_add(1);
        let max = usize::try_from(allowance).map_or(buf.len(), |a| a.min(buf.len()));

        let n = self.inner.read(&mut buf[..max])?;
        self.consumed += n as u64;

        if self.consumed > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                LimitExceeded { limit: self.limit },
            ));
        }
        Ok(n)
    }
}

/// Map an I/O error to [`ValidationError::SizeExceeded`] when it came from
/// a [`BoundedReader`].
pub fn classify_io_error(err: io::Error) -> ValidationError {
    let limit = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
        .map(|marker| marker.limit);

    match limit {
        Some(limit) => ValidationError::SizeExceeded { limit },
        None => ValidationError::Io(err),
    }
}

/// Line the record at `pos` really starts on.
///
/// The decoder stamps a record before skipping the blank lines in front of
/// it, so those are counted back in here.
fn record_line(data: &[u8], pos: &csv::Position) -> u64 {
    let start = usize::try_from(pos.byte()).map_or(data.len(), |b| b.min(data.len()));
    let blank = data[start..]
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .filter(|&&b| b == b'\n')
        .count();
    pos.line() + blank as u64
}

fn from_csv_error(err: csv::Error, data: &[u8]) -> ValidationError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => classify_io_error(e),
        csv::ErrorKind::UnequalLengths { pos, .. } => ValidationError::MalformedCsv {
            line: pos.map_or(0, |p| record_line(data, &p)),
            detail: "wrong number of fields".to_string(),
        },
        other => ValidationError::Io(io::Error::other(format!("{:?}", other))),
    }
}

const BARE_QUOTE: &str = "bare \" in non-quoted field";
const MISPLACED_QUOTE: &str = "extraneous or missing \" in quoted-field";

/// First quoting mistake in an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuoteFault {
    /// Byte offset of the record holding the mistake.
    record_start: usize,
    start_line: u64,
    line: u64,
    column: u64,
    detail: &'static str,
}

impl From<QuoteFault> for ValidationError {
    fn from(fault: QuoteFault) -> Self {
        ValidationError::BadQuote {
            start_line: fault.start_line,
            line: fault.line,
            column: fault.column,
            detail: fault.detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// Just saw a quote inside a quoted field.
    QuoteInQuoted,
}

/// Scan for quotes the csv crate would silently accept.
///
/// A quote may only open a field or be doubled inside a quoted field, and a
/// quoted field must be closed. Columns are 1-based byte offsets and a
/// `\r\n` pair counts as one line break.
fn find_quote_fault(data: &[u8]) -> Option<QuoteFault> {
    let mut state = FieldState::Start;
    let mut line = 1u64;
    let mut line_start = 0usize;
    let mut prev_line_start = 0usize;
    let mut in_record = false;
    let mut record_start = 0usize;
    let mut start_line = 1u64;

    let fault = |record_start, start_line, line, column, detail| QuoteFault {
        record_start,
        start_line,
        line,
        column,
        detail,
    };

    for (i, &b) in data.iter().enumerate() {
        let column = (i - line_start) as u64 + 1;
        let crlf = b == b'\r' && data.get(i + 1) == Some(&b'\n');

        if !in_record && b != b'\n' && !crlf {
            in_record = true;
            record_start = i;
            start_line = line;
        }

        match state {
            FieldState::Start | FieldState::Unquoted => match b {
                b'\n' => {
                    state = FieldState::Start;
                    in_record = false;
                }
                b',' => state = FieldState::Start,
                b'"' if state == FieldState::Start => state = FieldState::Quoted,
                b'"' => {
                    return Some(fault(record_start, start_line, line, column, BARE_QUOTE));
                }
                _ if crlf => {}
                _ => state = FieldState::Unquoted,
            },
            FieldState::Quoted => {
                if b == b'"' {
                    state = FieldState::QuoteInQuoted;
                }
            }
            FieldState::QuoteInQuoted => match b {
                b'"' => state = FieldState::Quoted,
                b',' => state = FieldState::Start,
                b'\n' => {
                    state = FieldState::Start;
                    in_record = false;
                }
                _ if crlf => {}
                _ => {
                    return Some(fault(
                        record_start,
                        start_line,
                        line,
                        column - 1,
                        MISPLACED_QUOTE,
                    ));
                }
            },
        }

        if b == b'\n' {
            line += 1;
            prev_line_start = line_start;
            line_start = i + 1;
        }
    }

    if state != FieldState::Quoted {
        return None;
    }

    // Unterminated quote: reported just past the last non-empty line.
    let (last_line, last_start) = if line_start == data.len() && line > 1 {
        (line - 1, prev_line_start)
    } else {
        (line, line_start)
    };
    let tail = &data[last_start..];
    let width = if tail.ends_with(b"\r\n") {
        tail.len() - 1
    } else {
        tail.len()
    };
    Some(fault(
        record_start,
        start_line,
        last_line,
        width as u64 + 1,
        MISPLACED_QUOTE,
    ))
}

/// Decode an in-memory upload into a square matrix.
fn decode(data: &[u8]) -> ValidationResult<Matrix> {
    // Records before a quoting mistake are still checked first, so an
    // earlier field-count error wins.
    let quote_fault = find_quote_fault(data);
    let decodable = quote_fault.as_ref().map_or(data.len(), |f| f.record_start);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(&data[..decodable]);

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record.map_err(|e| from_csv_error(e, data))?;
        // Invalid UTF-8 is kept so the codec reports the offending field.
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    if let Some(fault) = quote_fault {
        return Err(fault.into());
    }
    Matrix::from_rows(rows)
}

/// Parse an upload into a square matrix.
///
/// The reader is drained through a [`BoundedReader`] first, so an oversized
/// upload fails before any decoding.
///
/// # Example
/// ```
/// use csvmatrix::parser::parse;
///
/// let matrix = parse("1,2\n\n3,4\n".as_bytes(), 1024).unwrap();
/// assert_eq!(matrix.len(), 2);
/// assert_eq!(matrix.rows()[1], vec!["3", "4"]);
/// ```
pub fn parse<R: Read>(reader: R, limit: u64) -> ValidationResult<Matrix> {
    let mut data = Vec::new();
    BoundedReader::new(reader, limit)
        .read_to_end(&mut data)
        .map_err(classify_io_error)?;
    decode(&data)
}

/// Parse an in-memory upload.
pub fn parse_bytes(bytes: &[u8], limit: u64) -> ValidationResult<Matrix> {
    if bytes.len() as u64 > limit {
        return Err(ValidationError::SizeExceeded { limit });
    }
    decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rows(m: &Matrix) -> Vec<Vec<&str>> {
        m.rows()
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_square_matrix() {
        let m = parse_bytes(b"1,2,3\n4,5,6\n7,8,9", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert_eq!(
            rows(&m),
            vec![vec!["1", "2", "3"], vec!["4", "5", "6"], vec!["7", "8", "9"]]
        );
    }

    #[test]
    fn test_empty_upload_is_valid() {
        let m = parse_bytes(b"", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_only_blank_lines() {
        let m = parse_bytes(b"\n\n\n\n\r\n", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let m = parse_bytes(b"\n1,2,-3\n\n\n1,-2,3\r\n\n1,2,-3\n\n\n", DEFAULT_UPLOAD_LIMIT)
            .unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(rows(&m)[1], vec!["1", "-2", "3"]);
    }

    #[test]
    fn test_whitespace_kept_in_fields() {
        let m = parse_bytes(b" 1,\t2\n3 ,4", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert_eq!(rows(&m), vec![vec![" 1", "\t2"], vec!["3 ", "4"]]);
    }

    #[test]
    fn test_not_square() {
        let err = parse_bytes(b"1,2,3", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert!(matches!(err, ValidationError::NotSquare));

        let err = parse_bytes(b"1\n2", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert!(matches!(err, ValidationError::NotSquare));
    }

    #[test]
    fn test_ragged_rows() {
        let err = parse_bytes(b"1,2\n3\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        match err {
            ValidationError::MalformedCsv { line, detail } => {
                assert_eq!(line, 2);
                assert_eq!(detail, "wrong number of fields");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_after_blank_lines() {
        let err = parse_bytes(b"1,2\n\n\n3\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(err.to_string(), "record on line 4: wrong number of fields");

        let err = parse_bytes(b"\r\n1,2\r\n\r\n3,4\r\n5\r\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(err.to_string(), "record on line 5: wrong number of fields");
    }

    #[test]
    fn test_bare_quote() {
        let err = parse_bytes(b"1\"2", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error on line 1, column 2: bare \" in non-quoted field"
        );

        let err = parse_bytes(b"1,2\n\n3, \"4\"\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error on line 3, column 4: bare \" in non-quoted field"
        );
    }

    #[test]
    fn test_misplaced_quotes() {
        let err = parse_bytes(b"\"1\"2,3\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error on line 1, column 3: extraneous or missing \" in quoted-field"
        );

        let err = parse_bytes(b"1,\"2\n3", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "record on line 1; parse error on line 2, column 2: extraneous or missing \" in quoted-field"
        );
    }

    #[test]
    fn test_well_formed_quotes_accepted() {
        let m = parse_bytes(b"\"1\",\"2\"\r\n\"3\",4\n", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert_eq!(rows(&m), vec![vec!["1", "2"], vec!["3", "4"]]);

        let m = parse_bytes(b"\"a\"\"b\"", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert_eq!(rows(&m), vec![vec!["a\"b"]]);
    }

    #[test]
    fn test_earlier_ragged_row_wins_over_quote() {
        let err = parse_bytes(b"1,2\n3\n4,\"5\n", DEFAULT_UPLOAD_LIMIT).unwrap_err();
        assert_eq!(err.to_string(), "record on line 2: wrong number of fields");
    }

    #[test]
    fn test_size_limit() {
        let limit = 16;
        let exact = vec![b'1'; 1];
        assert!(parse_bytes(&exact, limit).is_ok());

        let at_limit = b"1,2,3,4\n5,6,7,8\n"; // 16 bytes, 2x4
        assert!(matches!(
            parse_bytes(at_limit, limit),
            Err(ValidationError::NotSquare)
        ));

        let over = vec![0u8; (limit + 1) as usize];
        match parse_bytes(&over, limit) {
            Err(ValidationError::SizeExceeded { limit: l }) => assert_eq!(l, limit),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bounded_reader_stops_early() {
        let data = vec![b'x'; 100];
        let mut reader = BoundedReader::new(Cursor::new(data), 10);
        let mut buf = [0u8; 64];

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(reader.consumed(), 11);
        assert!(matches!(
            classify_io_error(err),
            ValidationError::SizeExceeded { limit: 10 }
        ));
    }

    #[test]
    fn test_other_io_errors_are_unexpected() {
        let err = classify_io_error(io::Error::other("boom"));
        assert!(matches!(err, ValidationError::Io(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_invalid_utf8_is_left_to_codec() {
        let m = parse_bytes(b"\xff", DEFAULT_UPLOAD_LIMIT).unwrap();
        assert_eq!(m.rows()[0][0], "\u{FFFD}");
    }
}
