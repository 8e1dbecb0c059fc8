//! Zero-copy record file parser
//!
//! The whole file is read in one I/O into a contiguous byte buffer; lines
//! and fields are borrowed views into it. Decoding allocates exactly once
//! per record, for the symbol. Malformed numeric fields decode to zero and
//! are rejected downstream by the validator; the parser itself only fails
//! on I/O or a structurally unusable file.

use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, TradeflowError};
use crate::record::{Record, SIDE_NONE, TYPE_MARKET};

/// Parse a character-separated record file into records.
///
/// The first line is the header and is discarded; empty lines are skipped.
/// Column order: `trade_id, order_id, timestamp, symbol, price, volume,
/// side, type, is_pro`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let content = std::fs::read(path.as_ref())?;
    parse_bytes(&content)
}

/// Parse an in-memory byte buffer; same contract as [`parse_file`]
pub fn parse_bytes(content: &[u8]) -> Result<Vec<Record>> {
    // A record file always starts with a header; zero bytes is corruption,
    // not an empty dataset.
    if content.is_empty() {
        return Err(TradeflowError::parse("empty input: missing header line"));
    }

    let mut lines = content.split(|&b| b == b'\n');
    lines.next(); // header, discarded

    let mut records = Vec::new();
    for line in lines {
        let line = strip_cr(line);
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(line));
    }
    Ok(records)
}

/// Slice the next comma-separated field off the front of `cursor`.
///
/// Advances past the separator; when no separator remains, the whole
/// remainder is the field and the cursor becomes empty. A trailing CR is
/// stripped so CRLF input parses like LF input.
#[inline]
fn next_field<'a>(cursor: &mut &'a [u8]) -> &'a [u8] {
    match cursor.iter().position(|&b| b == b',') {
        Some(idx) => {
            let field = &cursor[..idx];
            *cursor = &cursor[idx + 1..];
            strip_cr(field)
        }
        None => {
            let field = strip_cr(cursor);
            *cursor = &[];
            field
        }
    }
}

#[inline]
fn strip_cr(field: &[u8]) -> &[u8] {
    match field {
        [rest @ .., b'\r'] => rest,
        _ => field,
    }
}

/// Decode an ASCII numeric field; zero on failure so the validator can
/// reject the record with full context
#[inline]
fn parse_or_zero<T: FromStr + Default>(field: &[u8]) -> T {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

#[inline]
fn first_byte_or(field: &[u8], default: u8) -> u8 {
    field.first().copied().unwrap_or(default)
}

fn parse_line(line: &[u8]) -> Record {
    let mut cursor = line;

    let trade_id = parse_or_zero(next_field(&mut cursor));
    let order_id = parse_or_zero(next_field(&mut cursor));
    let timestamp = parse_or_zero(next_field(&mut cursor));
    let symbol = String::from_utf8_lossy(next_field(&mut cursor)).into_owned();
    let price = parse_or_zero(next_field(&mut cursor));
    let volume = parse_or_zero(next_field(&mut cursor));
    let side = first_byte_or(next_field(&mut cursor), SIDE_NONE);
    let order_type = first_byte_or(next_field(&mut cursor), TYPE_MARKET);
    let is_pro = next_field(&mut cursor) == b"1";

    Record {
        trade_id,
        order_id,
        timestamp,
        symbol,
        price,
        volume,
        side,
        order_type,
        is_pro,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "trade_id,order_id,timestamp,symbol,price,volume,side,type,is_pro\n";

    #[test]
    fn test_single_record() {
        let input = format!("{HEADER}1,2,1698208500000000001,RELIANCE,2456.75,100,B,L,0\n");
        let records = parse_bytes(input.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.trade_id, 1);
        assert_eq!(r.order_id, 2);
        assert_eq!(r.timestamp, 1698208500000000001);
        assert_eq!(r.symbol, "RELIANCE");
        assert_eq!(r.price, 2456.75);
        assert_eq!(r.volume, 100);
        assert_eq!(r.side, b'B');
        assert_eq!(r.order_type, b'L');
        assert!(!r.is_pro);
    }

    #[test]
    fn test_crlf_terminated_lines() {
        let input = format!("{HEADER}5,6,1000,TCS,3500.5,25,S,M,1\r\n");
        let records = parse_bytes(input.as_bytes()).unwrap();
        assert_eq!(records[0].symbol, "TCS");
        assert!(records[0].is_pro);
        assert_eq!(records[0].volume, 25);
    }

    #[test]
    fn test_header_and_blank_lines_skipped() {
        let input = format!("{HEADER}\n1,1,1,A,1.0,1,B,L,0\n\n2,2,2,B,2.0,2,S,M,1\n");
        let records = parse_bytes(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].trade_id, 2);
    }

    #[test]
    fn test_malformed_numeric_decodes_to_zero() {
        let input = format!("{HEADER}abc,2,999,ACME,not_a_price,xyz,B,L,0\n");
        let records = parse_bytes(input.as_bytes()).unwrap();
        let r = &records[0];
        assert_eq!(r.trade_id, 0);
        assert_eq!(r.price, 0.0);
        assert_eq!(r.volume, 0);
        // Untouched fields still decode.
        assert_eq!(r.timestamp, 999);
        assert_eq!(r.symbol, "ACME");
    }

    #[test]
    fn test_missing_trailing_fields_default() {
        let input = format!("{HEADER}1,2,3,ACME,10.5,5\n");
        let records = parse_bytes(input.as_bytes()).unwrap();
        let r = &records[0];
        assert_eq!(r.side, SIDE_NONE);
        assert_eq!(r.order_type, TYPE_MARKET);
        assert!(!r.is_pro);
    }

    #[test]
    fn test_integer_price_accepted() {
        let input = format!("{HEADER}1,2,3,ACME,2456,100,B,L,0\n");
        let records = parse_bytes(input.as_bytes()).unwrap();
        assert_eq!(records[0].price, 2456.0);
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let err = parse_bytes(b"").unwrap_err();
        assert!(matches!(err, TradeflowError::Parse { .. }));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let records = parse_bytes(HEADER.as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_reparse_is_identical() {
        let input = format!("{HEADER}1,2,3,ACME,10.5,5,B,L,1\n4,5,6,TCS,20.0,7,S,I,0\n");
        let first = parse_bytes(input.as_bytes()).unwrap();
        let second = parse_bytes(input.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_next_field_cursor_discipline() {
        let mut cursor: &[u8] = b"a,bb,";
        assert_eq!(next_field(&mut cursor), b"a");
        assert_eq!(next_field(&mut cursor), b"bb");
        // Separator at end: one final empty field.
        assert_eq!(next_field(&mut cursor), b"");
        assert!(cursor.is_empty());
        // Exhausted cursor keeps yielding empty fields.
        assert_eq!(next_field(&mut cursor), b"");
    }
}
