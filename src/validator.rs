//! Record validation rule engine
//!
//! Stateless checks applied in a fixed order, returning on the first
//! failure. Rejects are diagnostics, not errors: they are counted, reported
//! through a write-only log seam and dropped from the stream.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MAX_PRICE, MAX_SYMBOL_LEN};
use crate::record::{Record, ValidationOutcome};
use crate::record::{SIDE_BUY, SIDE_NONE, SIDE_SELL, TYPE_IOC, TYPE_LIMIT, TYPE_MARKET};

/// Compiled once; `[A-Z]{1,10}` anchored on both ends
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[A-Z]{{1,{MAX_SYMBOL_LEN}}}$")).expect("valid pattern")
});

/// Write-only diagnostic sink for rejected records.
///
/// Supplied by the environment so tests can capture rejects and production
/// routes them to structured logging. Implementations must be thread-safe.
pub trait RejectLog: Send + Sync {
    /// Report one rejected record with its first failing rule
    fn reject(&self, record: &Record, reason: &str);
}

/// Default sink: one warning line per reject
#[derive(Debug, Default)]
pub struct TracingRejectLog;

impl RejectLog for TracingRejectLog {
    fn reject(&self, record: &Record, reason: &str) {
        tracing::warn!(trade_id = record.trade_id, reason, "record rejected");
    }
}

/// Apply the six rules in order; the reason of the first failure names the
/// offending value.
pub fn validate(record: &Record) -> ValidationOutcome {
    if !SYMBOL_RE.is_match(&record.symbol) {
        return reject(format!("invalid symbol: '{}'", record.symbol));
    }
    if record.price <= 0.0 || record.price >= MAX_PRICE {
        return reject(format!("price out of range: {}", record.price));
    }
    if record.volume == 0 {
        return reject(format!("volume must be positive: {}", record.volume));
    }
    if !matches!(record.side, SIDE_BUY | SIDE_SELL | SIDE_NONE) {
        return reject(format!("invalid side: '{}'", record.side as char));
    }
    if !matches!(record.order_type, TYPE_MARKET | TYPE_LIMIT | TYPE_IOC) {
        return reject(format!("invalid order type: '{}'", record.order_type as char));
    }
    if record.timestamp <= 0 {
        return reject(format!("timestamp must be positive: {}", record.timestamp));
    }
    ValidationOutcome::Ok
}

fn reject(reason: String) -> ValidationOutcome {
    ValidationOutcome::Reject { reason }
}

/// Filter a batch down to its clean subsequence, preserving order.
///
/// Returns the passing records and the reject count; each reject goes to
/// the diagnostic log with its reason.
pub fn validate_batch(records: Vec<Record>, log: &dyn RejectLog) -> (Vec<Record>, usize) {
    let mut clean = Vec::with_capacity(records.len());
    let mut rejected = 0usize;

    for record in records {
        match validate(&record) {
            ValidationOutcome::Ok => clean.push(record),
            ValidationOutcome::Reject { reason } => {
                log.reject(&record, &reason);
                rejected += 1;
            }
        }
    }

    (clean, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingLog {
        reasons: Mutex<Vec<String>>,
    }

    impl RejectLog for CapturingLog {
        fn reject(&self, _record: &Record, reason: &str) {
            self.reasons.lock().push(reason.to_string());
        }
    }

    fn good_record() -> Record {
        Record {
            trade_id: 1,
            order_id: 2,
            timestamp: 1_000,
            symbol: "RELIANCE".to_string(),
            price: 2456.75,
            volume: 100,
            side: b'B',
            order_type: b'L',
            is_pro: false,
        }
    }

    #[test]
    fn test_clean_record_passes() {
        assert!(validate(&good_record()).is_ok());
    }

    fn assert_reject_containing(record: Record, needle: &str) {
        match validate(&record) {
            ValidationOutcome::Reject { reason } => {
                assert!(reason.contains(needle), "reason {reason:?} missing {needle:?}");
            }
            ValidationOutcome::Ok => panic!("expected reject for {needle:?}"),
        }
    }

    #[test]
    fn test_each_rule_rejects_with_offending_value() {
        let mut r = good_record();
        r.symbol = "reliance".to_string();
        assert_reject_containing(r, "reliance");

        let mut r = good_record();
        r.price = 0.0;
        assert_reject_containing(r, "0");

        let mut r = good_record();
        r.volume = 0;
        assert_reject_containing(r, "0");

        let mut r = good_record();
        r.side = b'X';
        assert_reject_containing(r, "X");

        let mut r = good_record();
        r.order_type = b'Q';
        assert_reject_containing(r, "Q");

        let mut r = good_record();
        r.timestamp = 0;
        assert_reject_containing(r, "0");
    }

    #[test]
    fn test_price_upper_bound_exclusive() {
        let mut r = good_record();
        r.price = MAX_PRICE;
        assert!(!validate(&r).is_ok());

        r.price = MAX_PRICE - 0.01;
        assert!(validate(&r).is_ok());
    }

    #[test]
    fn test_symbol_length_bounds() {
        let mut r = good_record();
        r.symbol = "ABCDEFGHIJ".to_string(); // 10 letters
        assert!(validate(&r).is_ok());

        r.symbol = "ABCDEFGHIJK".to_string(); // 11 letters
        assert!(!validate(&r).is_ok());

        r.symbol = String::new();
        assert!(!validate(&r).is_ok());
    }

    #[test]
    fn test_single_letter_n_is_a_valid_symbol() {
        let mut r = good_record();
        r.symbol = "N".to_string();
        assert!(validate(&r).is_ok());
    }

    #[test]
    fn test_batch_preserves_order_and_counts_rejects() {
        let mut bad = good_record();
        bad.volume = 0;

        let mut later = good_record();
        later.trade_id = 9;

        let log = CapturingLog::default();
        let (clean, rejected) =
            validate_batch(vec![good_record(), bad, later.clone()], &log);

        assert_eq!(rejected, 1);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].trade_id, 1);
        assert_eq!(clean[1].trade_id, 9);
        assert_eq!(log.reasons.lock().len(), 1);
    }

    #[test]
    fn test_first_failure_wins() {
        // Both symbol and price are bad; the symbol rule runs first.
        let mut r = good_record();
        r.symbol = "bad".to_string();
        r.price = -1.0;
        assert_reject_containing(r, "symbol");
    }
}
