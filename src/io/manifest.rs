//! Depth manifest (`depth.txt`) parsing.
//!
//! One record per line, `<timestamp> <relative image path>`, whitespace
//! separated. Lines with any other token count are comments or headers and
//! are skipped, as are lines that are not valid UTF-8. The file is read as a stream.

use std::io::BufRead;

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub timestamp: u64,
    pub path: String,
}

/// Parse a dotted timestamp token.
///
/// The integer and fractional digits are concatenated as written, so
/// `1305031102.175304` becomes `1305031102175304` (microseconds for a
/// six-digit fraction). A token without a dot is a plain integer.
pub fn parse_timestamp(token: &str) -> Option<u64> {
    let mut parts = token.split('.').filter(|s| !s.is_empty());
    let whole = parts.next()?;
    let digits = match parts.next() {
        Some(frac) => format!("{whole}{frac}"),
        None => whole.to_string(),
    };
    digits.parse().ok()
}

/// Parse one manifest line. None for non-data lines.
pub fn parse_record(line: &str) -> Option<ManifestRecord> {
    let mut tokens = line.split_whitespace();
    let (Some(stamp), Some(path), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return None;
    };
    match parse_timestamp(stamp) {
        Some(timestamp) => Some(ManifestRecord {
            timestamp,
            path: path.to_string(),
        }),
        None => {
            debug!("Skipping manifest line with non-numeric timestamp: {line:?}");
            None
        }
    }
}

/// Streaming reader over manifest records.
pub struct ManifestReader<R> {
    reader: R,
    line: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> ManifestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Next data record, or None at end of file.
    pub fn next_record(&mut self) -> Result<Option<ManifestRecord>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.line)
                .with_context(|| format!("Failed to read manifest line {}", self.line_no + 1))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            match std::str::from_utf8(&self.line) {
                Ok(text) => {
                    if let Some(record) = parse_record(text) {
                        return Ok(Some(record));
                    }
                }
                Err(e) => debug!("Skipping manifest line {} ({})", self.line_no, e),
            }
            self.skipped += 1;
        }
    }

    /// Number of non-data lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_timestamp_parts_are_concatenated() {
        assert_eq!(parse_timestamp("1305031102.175304"), Some(1305031102175304));
        // Short fractions are not rescaled
        assert_eq!(parse_timestamp("12.5"), Some(125));
        assert_eq!(parse_timestamp("42"), Some(42));
        assert_eq!(parse_timestamp("abc.def"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_record_requires_exactly_two_tokens() {
        assert_eq!(
            parse_record("1.000001 depth/1.png\n"),
            Some(ManifestRecord {
                timestamp: 1000001,
                path: "depth/1.png".into()
            })
        );
        assert_eq!(parse_record("# depth maps"), None);
        assert_eq!(parse_record("# timestamp filename"), None);
        assert_eq!(parse_record("1.0 a.png extra"), None);
        assert_eq!(parse_record("1.0"), None);
        assert_eq!(parse_record(""), None);
    }

    #[test]
    fn test_repeated_whitespace_collapses() {
        let rec = parse_record("  3.000007 \t d.png  ").unwrap();
        assert_eq!(rec.timestamp, 3000007);
        assert_eq!(rec.path, "d.png");
    }

    #[test]
    fn test_reader_skips_non_data_lines() {
        let manifest = "# depth maps\n# file: 'x.bag'\n# timestamp filename\n\
                        1.000001 a.png\n\n2.000002 b.png\nnot a record at all\n3.000003 c.png";
        let mut reader = ManifestReader::new(Cursor::new(manifest));

        let mut stamps = Vec::new();
        while let Some(rec) = reader.next_record().unwrap() {
            stamps.push(rec.timestamp);
        }

        assert_eq!(stamps, vec![1000001, 2000002, 3000003]);
        assert_eq!(reader.skipped(), 5);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut manifest = b"1.000001 a.png\n# comment ".to_vec();
        manifest.extend_from_slice(&[0xff, 0xfe]);
        manifest.extend_from_slice(b"\n2.000002 b.png\n");
        let mut reader = ManifestReader::new(Cursor::new(manifest));

        assert_eq!(reader.next_record().unwrap().unwrap().timestamp, 1000001);
        assert_eq!(reader.next_record().unwrap().unwrap().timestamp, 2000002);
        assert_eq!(reader.next_record().unwrap(), None);
        assert_eq!(reader.skipped(), 1);
    }
}
