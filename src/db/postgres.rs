//! PostgreSQL implementation of the bulk sink
//!
//! Every operation opens its own connection: the prepare/finalize phases
//! because they run serially on the driver thread, `copy_span` because each
//! pool worker must own a distinct wire-level session for its COPY stream.
//! Row data travels through the binary COPY channel; indicator rows go
//! through parameterized inserts, never through string interpolation.

use postgres::binary_copy::BinaryCopyInWriter;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};

use crate::error::{Result, TradeflowError};
use crate::record::{IndicatorRow, Record};

use super::BulkSink;

const CREATE_TRADES: &str = "
CREATE TABLE IF NOT EXISTS trades (
    trade_id  BIGINT NOT NULL PRIMARY KEY,
    order_id  BIGINT NOT NULL,
    timestamp BIGINT NOT NULL,
    symbol    TEXT NOT NULL,
    price     DOUBLE PRECISION NOT NULL CHECK (price > 0),
    volume    INTEGER NOT NULL CHECK (volume > 0),
    side      TEXT NOT NULL CHECK (side IN ('B', 'S', 'N')),
    type      TEXT NOT NULL CHECK (type IN ('M', 'L', 'I')),
    is_pro    BOOLEAN NOT NULL
)";

const CREATE_TRADES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS trades_symbol_ts_idx ON trades (symbol, timestamp)";

const CREATE_INDICATORS: &str = "
CREATE TABLE IF NOT EXISTS indicators (
    id          BIGSERIAL PRIMARY KEY,
    symbol      TEXT NOT NULL,
    computed_at BIGINT NOT NULL,
    sma         DOUBLE PRECISION NOT NULL,
    rsi         DOUBLE PRECISION NOT NULL CHECK (rsi >= 0 AND rsi <= 100),
    vwap        DOUBLE PRECISION NOT NULL CHECK (vwap > 0),
    period      INTEGER NOT NULL CHECK (period > 0)
)";

const CREATE_INDICATORS_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
    indicators_symbol_computed_at_idx ON indicators (symbol, computed_at)";

/// The DDL in P1 takes the strongest table locks and cannot be concurrent;
/// afterwards the table has no indexes and bulk streams append at disk
/// bandwidth.
const PREPARE_SQL: &str = "
TRUNCATE trades;
ALTER TABLE trades DROP CONSTRAINT IF EXISTS trades_pkey;
DROP INDEX IF EXISTS trades_symbol_ts_idx;
";

/// Rebuilding the key as one bulk sort-and-build is far cheaper than
/// per-row index maintenance during the copy.
const FINALIZE_SQL: &str = "
ALTER TABLE trades ADD PRIMARY KEY (trade_id);
CREATE INDEX trades_symbol_ts_idx ON trades (symbol, timestamp);
";

const COPY_TRADES: &str = "COPY trades \
    (trade_id, order_id, timestamp, symbol, price, volume, side, type, is_pro) \
    FROM STDIN BINARY";

static COPY_TYPES: [Type; 9] = [
    Type::INT8,
    Type::INT8,
    Type::INT8,
    Type::TEXT,
    Type::FLOAT8,
    Type::INT4,
    Type::TEXT,
    Type::TEXT,
    Type::BOOL,
];

const INSERT_INDICATOR: &str = "INSERT INTO indicators \
    (symbol, computed_at, sma, rsi, vwap, period) \
    VALUES ($1, $2, $3, $4, $5, $6)";

/// Bulk sink backed by a PostgreSQL database
#[derive(Debug, Clone)]
pub struct PostgresSink {
    connection_string: String,
}

impl PostgresSink {
    /// Create a sink for the given libpq-style connection string
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }

    fn connect(&self) -> Result<Client> {
        Client::connect(&self.connection_string, NoTls)
            .map_err(|e| TradeflowError::connect(e.to_string()))
    }
}

impl BulkSink for PostgresSink {
    fn init_schema(&self) -> Result<()> {
        let mut client = self.connect()?;
        for sql in [
            CREATE_TRADES,
            CREATE_TRADES_INDEX,
            CREATE_INDICATORS,
            CREATE_INDICATORS_INDEX,
        ] {
            client
                .batch_execute(sql)
                .map_err(|e| TradeflowError::schema(e.to_string()))?;
        }
        Ok(())
    }

    fn prepare(&self) -> Result<()> {
        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|e| TradeflowError::schema(e.to_string()))?;
        tx.batch_execute(PREPARE_SQL)
            .map_err(|e| TradeflowError::schema(e.to_string()))?;
        tx.commit()
            .map_err(|e| TradeflowError::schema(e.to_string()))
    }

    fn copy_span(&self, records: &[Record]) -> Result<u64> {
        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;

        let sink = tx
            .copy_in(COPY_TRADES)
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        let mut writer = BinaryCopyInWriter::new(sink, &COPY_TYPES);

        for record in records {
            let trade_id = record.trade_id as i64;
            let order_id = record.order_id as i64;
            let volume = record.volume as i32;
            let side = [record.side];
            let side = std::str::from_utf8(&side).unwrap_or("?");
            let order_type = [record.order_type];
            let order_type = std::str::from_utf8(&order_type).unwrap_or("?");

            let row: [&(dyn ToSql + Sync); 9] = [
                &trade_id,
                &order_id,
                &record.timestamp,
                &record.symbol,
                &record.price,
                &volume,
                &side,
                &order_type,
                &record.is_pro,
            ];
            // Any encoder failure poisons the whole stream.
            writer
                .write(&row)
                .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        }

        let rows = writer
            .finish()
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        tx.commit()
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        Ok(rows)
    }

    fn finalize(&self) -> Result<()> {
        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|e| TradeflowError::constraint(e.to_string()))?;
        tx.batch_execute(FINALIZE_SQL)
            .map_err(|e| TradeflowError::constraint(e.to_string()))?;
        tx.commit()
            .map_err(|e| TradeflowError::constraint(e.to_string()))
    }

    fn save_indicators(&self, rows: &[IndicatorRow], computed_at: i64) -> Result<()> {
        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        let stmt = tx
            .prepare(INSERT_INDICATOR)
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;

        for row in rows {
            let period = row.period as i32;
            tx.execute(
                &stmt,
                &[
                    &row.symbol,
                    &computed_at,
                    &row.sma,
                    &row.rsi,
                    &row.vwap,
                    &period,
                ],
            )
            .map_err(|e| TradeflowError::bulk(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| TradeflowError::bulk(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_column_order_matches_types() {
        // One wire type per column in the COPY statement.
        let columns: Vec<&str> = COPY_TRADES
            .split('(')
            .nth(1)
            .unwrap()
            .split(')')
            .next()
            .unwrap()
            .split(',')
            .map(str::trim)
            .collect();
        assert_eq!(columns.len(), COPY_TYPES.len());
        assert_eq!(columns[0], "trade_id");
        assert_eq!(columns[5], "volume");
        assert_eq!(COPY_TYPES[5], Type::INT4);
        assert_eq!(columns[8], "is_pro");
        assert_eq!(COPY_TYPES[8], Type::BOOL);
    }

    #[test]
    fn test_connect_failure_maps_to_connect_kind() {
        let sink = PostgresSink::new("host=127.0.0.1 port=1 user=nobody connect_timeout=1");
        let err = match sink.connect() {
            Err(err) => err,
            Ok(_) => panic!("expected connect() to fail"),
        };
        assert!(err.is_store_error());
        assert!(err.is_retriable());
    }
}
