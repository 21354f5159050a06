//! Input records: `<key><separator>[<count>]`, one per line, where the
//! separators are space, tab, CR and LF.

use crate::error::RecordError;
use bstr::ByteSlice;

/// A parsed input line. The key borrows from the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub key: &'a [u8],
    pub count: u64,
}

/// Field separators. Other whitespace (vertical tab, form feed, NBSP, ...)
/// is part of the key.
#[inline]
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parse one line. The trailing `\n` / `\r\n` may be present.
///
/// A missing count means one occurrence. Tokens after the count are ignored.
/// The count must be plain decimal digits: `12x` or `abc` is an
/// [`InvalidCount`](RecordError::InvalidCount) rather than being read as a
/// numeric prefix or as zero.
pub fn parse_record(line: &[u8]) -> Result<Record<'_>, RecordError> {
    let mut fields = line.fields_with(is_separator);
    let key = fields.next().ok_or(RecordError::MissingKey)?;
    let count = match fields.next() {
        None => 1,
        Some(tok) => parse_count(tok)?,
    };
    Ok(Record { key, count })
}

fn parse_count(tok: &[u8]) -> Result<u64, RecordError> {
    let invalid = || RecordError::InvalidCount {
        token: tok.to_str_lossy().into_owned(),
    };
    // `u64::from_str` would also take a leading '+'.
    if !tok.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    tok.to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}
