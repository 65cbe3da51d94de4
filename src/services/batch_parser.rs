//! Upload decoding and row extraction
//!
//! Review uploads arrive as delimited text. The first field of each record
//! is the review body; any further fields are ignored. Both decoding and
//! splitting are pure functions of the input bytes, so the row count
//! reported at submit time and the rows the background job later processes
//! always agree.

use csv::ReaderBuilder;

/// Result of decoding an upload
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    pub text: String,
    /// True when invalid UTF-8 sequences were replaced instead of rejected
    pub lossy: bool,
}

/// Decode upload bytes as UTF-8
///
/// Strict decoding is attempted first; on failure the bytes are decoded
/// lossily with replacement characters so a few bad bytes degrade a row
/// instead of rejecting the whole upload. A leading BOM is stripped.
pub fn decode_upload(bytes: &[u8]) -> DecodedUpload {
    let (text, lossy) = match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    };

    let text = match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    };

    DecodedUpload { text, lossy }
}

/// Extract review rows from delimited text
///
/// Every record is data (no header row). Quoted fields may contain the
/// delimiter and embedded newlines. Records whose first field is empty or
/// whitespace-only are dropped, as are records the reader cannot parse.
pub fn extract_rows(text: &str, delimiter: u8) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => {
                let field = record.get(0)?.trim();
                (!field.is_empty()).then(|| field.to_string())
            }
            Err(e) => {
                tracing::debug!("skipping unparseable record: {e}");
                None
            }
        })
        .collect()
}

/// Parse the delimiter form field
///
/// Accepts a single ASCII character, the two-character escape `\t`, or the
/// word `tab`. An empty value falls back to comma.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    if raw.is_empty() {
        return Ok(b',');
    }
    if raw == "\\t" || raw.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }

    let bytes = raw.as_bytes();
    if bytes.len() == 1 {
        Ok(bytes[0])
    } else {
        Err(format!("delimiter must be a single character, got '{raw}'"))
    }
}
