//! Synthetic record file generator backing the `generate` subcommand

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::COLUMN_ORDER;
use crate::error::Result;

const SYMBOLS: [&str; 8] = [
    "RELIANCE", "TCS", "INFY", "HDFCBANK", "SBIN", "ITC", "WIPRO", "ONGC",
];
const SIDES: [char; 3] = ['B', 'S', 'N'];
const TYPES: [char; 3] = ['M', 'L', 'I'];

/// Fraction of rows deliberately malformed to exercise the validator
const INVALID_EVERY: u64 = 211;

/// Write `rows` synthetic trades (plus header) to `path`
pub fn generate_file(path: &Path, rows: u64) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", COLUMN_ORDER.join(","))?;

    let mut rng = rand::thread_rng();
    let base_ts: i64 = 1_698_208_500_000_000_000;

    for i in 0..rows {
        let trade_id = i + 1;
        let order_id = rng.gen_range(1..=rows.max(2));
        let timestamp = base_ts + i as i64 * 1_000 + rng.gen_range(0..1_000);
        let symbol = SYMBOLS.choose(&mut rng).unwrap();
        let mut price = (rng.gen_range(50.0..5_000.0) * 100.0_f64).round() / 100.0;
        let mut volume: u32 = rng.gen_range(1..=1_000);
        let side = SIDES.choose(&mut rng).unwrap();
        let order_type = TYPES.choose(&mut rng).unwrap();
        let is_pro = u8::from(rng.gen_bool(0.2));

        // A thin seam of rejects keeps the validator path honest.
        if trade_id % INVALID_EVERY == 0 {
            if trade_id % 2 == 0 {
                price = 0.0;
            } else {
                volume = 0;
            }
        }

        writeln!(
            out,
            "{trade_id},{order_id},{timestamp},{symbol},{price},{volume},{side},{order_type},{is_pro}"
        )?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::validator::{validate_batch, RejectLog};
    use crate::record::Record;

    struct NullLog;
    impl RejectLog for NullLog {
        fn reject(&self, _record: &Record, _reason: &str) {}
    }

    #[test]
    fn test_generated_file_parses_and_mostly_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthetic.csv");
        generate_file(&path, 1_000).unwrap();

        let records = parser::parse_file(&path).unwrap();
        assert_eq!(records.len(), 1_000);

        let (clean, rejected) = validate_batch(records, &NullLog);
        assert!(rejected > 0, "generator should seed some invalid rows");
        assert!(rejected < 20);
        assert_eq!(clean.len() + rejected, 1_000);
    }
}
