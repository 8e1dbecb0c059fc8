//! Pipeline constants
//!
//! Core constants used by the concurrency substrate and the validation rules.

/// Cache line size for alignment (64 bytes on most CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Default SPSC ring capacity (must be power of 2)
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Default number of parallel load workers
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default indicator look-back window
pub const DEFAULT_INDICATOR_PERIOD: u32 = 5;

/// Exclusive upper bound accepted for a trade price
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum accepted symbol length
pub const MAX_SYMBOL_LEN: usize = 10;

/// Input column order, shared by the parser, the COPY stream and the
/// columnar schema
pub const COLUMN_ORDER: [&str; 9] = [
    "trade_id",
    "order_id",
    "timestamp",
    "symbol",
    "price",
    "volume",
    "side",
    "type",
    "is_pro",
];
