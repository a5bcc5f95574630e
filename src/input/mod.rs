// Keyword file loading.
//
// Accepts the CSV/TSV/TXT exports SEO tools produce. A BOM decides the
// encoding when present; otherwise UTF-16 is recognised by its NUL bytes,
// UTF-8 is tried next and anything else goes through charset detection
// (Windows-1252 from Excel, Latin-1, ...). UTF-16 files are tab-separated,
// as keyword-research tools export them. The delimiter is sniffed from the
// header line. Rows too short
// for the chosen column are skipped, empty keywords are dropped and
// duplicates keep their first position.

use std::collections::HashSet;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use tracing::{debug, info};

use crate::error::InputError;

/// How to pick the keyword column out of the file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Header name of the keyword column (case-insensitive). Defaults to a
    /// column called "keyword"/"query" if present, else the first column.
    pub column: Option<String>,
    /// When false, every line is data and the first column holds keywords.
    pub has_header: bool,
}

impl LoadOptions {
    pub fn with_header(column: Option<String>) -> Self {
        Self {
            column,
            has_header: true,
        }
    }
}

/// Read and parse a keyword file.
pub fn load_keywords(path: &Path, options: &LoadOptions) -> Result<Vec<String>, InputError> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(InputError::NotFound { path: path_str });
    }

    let bytes = std::fs::read(path).map_err(|source| InputError::Read {
        path: path_str.clone(),
        source,
    })?;

    let (text, encoding) = decode(&bytes)?;
    debug!(
        path = %path_str,
        encoding = encoding.name(),
        bytes = bytes.len(),
        "Decoded keyword file"
    );

    let forced = is_utf16(encoding).then_some('\t');
    let keywords = parse_keywords(&text, forced, options)?;

    info!(path = %path_str, keywords = keywords.len(), "Loaded keywords");
    Ok(keywords)
}

/// Decode file bytes, returning the text and the encoding it was read as.
///
/// Fails when the bytes are not valid in the chosen encoding.
pub fn decode(bytes: &[u8]) -> Result<(String, &'static Encoding), InputError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (detect(bytes), bytes),
    };

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or(InputError::Encoding {
            encoding: encoding.name(),
        })?;
    Ok((text.into_owned(), encoding))
}

/// Whether text in `encoding` should be split on tabs.
pub fn is_utf16(encoding: &'static Encoding) -> bool {
    encoding == UTF_16LE || encoding == UTF_16BE
}

/// Guess the encoding of BOM-less bytes.
fn detect(bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = sniff_utf16(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, false)
}

/// BOM-less UTF-16 of mostly ASCII text has a NUL in every other byte.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 4 || bytes.len() % 2 != 0 {
        return None;
    }
    let pairs = bytes.len() / 2;
    let high_nul = bytes.chunks_exact(2).filter(|p| p[0] != 0 && p[1] == 0).count();
    let low_nul = bytes.chunks_exact(2).filter(|p| p[0] == 0 && p[1] != 0).count();

    if high_nul * 10 >= pairs * 9 {
        Some(UTF_16LE)
    } else if low_nul * 10 >= pairs * 9 {
        Some(UTF_16BE)
    } else {
        None
    }
}

/// Parse decoded text into a de-duplicated keyword list.
///
/// `delimiter` forces a field separator; otherwise it is sniffed from the
/// first line.
pub fn parse_keywords(
    text: &str,
    delimiter: Option<char>,
    options: &LoadOptions,
) -> Result<Vec<String>, InputError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let Some(first) = lines.next() else {
        return Err(InputError::Empty);
    };
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(first));

    let (column_index, first_data) = if options.has_header {
        let header = split_record(first, delimiter);
        (resolve_column(&header, options.column.as_deref())?, None)
    } else {
        (0, Some(first))
    };

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    let mut skipped = 0usize;

    for line in first_data.into_iter().chain(lines) {
        let fields = split_record(line, delimiter);
        let Some(value) = fields.get(column_index) else {
            skipped += 1;
            continue;
        };
        let keyword = value.trim();
        if keyword.is_empty() {
            continue;
        }
        if seen.insert(keyword.to_string()) {
            keywords.push(keyword.to_string());
        }
    }

    if skipped > 0 {
        debug!(skipped = skipped, "Skipped rows missing the keyword column");
    }

    if keywords.is_empty() {
        return Err(InputError::NoKeywords);
    }
    Ok(keywords)
}

/// Pick the most frequent of tab, semicolon and comma in the header line.
/// A line with none of them is a single-column file.
pub fn sniff_delimiter(line: &str) -> char {
    ['\t', ';', ',']
        .into_iter()
        .map(|d| (d, line.matches(d).count()))
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(',')
}

fn resolve_column(header: &[String], wanted: Option<&str>) -> Result<usize, InputError> {
    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    match wanted {
        Some(name) => find(name).ok_or_else(|| InputError::ColumnNotFound {
            column: name.to_string(),
            available: header.join(", "),
        }),
        None => Ok(find("keyword").or_else(|| find("query")).unwrap_or(0)),
    }
}

/// Split one delimited line, honouring double-quoted fields with `""` escapes.
pub fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' if in_quotes => in_quotes = false,
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_field_keeps_delimiter() {
        let fields = split_record(r#""shoes, red",10,"say ""hi""""#, ',');
        assert_eq!(fields, vec!["shoes, red", "10", r#"say "hi""#]);
    }

    #[test]
    fn sniff_prefers_most_frequent_separator() {
        assert_eq!(sniff_delimiter("Keyword\tVolume\tKD"), '\t');
        assert_eq!(sniff_delimiter("Keyword;Volume"), ';');
        assert_eq!(sniff_delimiter("Keyword,Volume,\"a;b\""), ',');
        assert_eq!(sniff_delimiter("Keyword"), ',');
    }

    #[test]
    fn utf16_le_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Keyword\tVolume\nshoes\t10".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(encoding, UTF_16LE);
        assert!(text.starts_with("Keyword\tVolume"));
    }

    #[test]
    fn utf16_without_bom_is_recognised() {
        let mut bytes = Vec::new();
        for unit in "Keyword\tVolume\nshoes\t10".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(encoding, UTF_16BE);
        assert!(is_utf16(encoding));
        assert_eq!(text, "Keyword\tVolume\nshoes\t10");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFKeyword\nshoes".to_vec();
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(encoding, UTF_8);
        assert_eq!(text, "Keyword\nshoes");
    }

    #[test]
    fn windows_1252_is_detected() {
        let bytes = b"Keyword\nzapatillas ni\xF1os\ncami\xF3n de juguete\nbeb\xE9 a\xF1adir canci\xF3n\nespa\xF1ol peque\xF1o\n";
        let (text, encoding) = decode(bytes).unwrap();
        assert_eq!(encoding.name(), "windows-1252");
        assert!(text.contains("zapatillas niños"));
        assert!(text.contains("pequeño"));
    }

    #[test]
    fn odd_length_utf16_is_encoding_error() {
        let err = decode(&[0xFF, 0xFE, b'K', 0, b'e']).unwrap_err();
        assert!(matches!(err, InputError::Encoding { encoding: "UTF-16LE" }));
    }
}
