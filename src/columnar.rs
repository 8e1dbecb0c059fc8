//! Columnar artifact writer
//!
//! Transposes the row-oriented record buffer into Arrow columns and writes
//! one Snappy-compressed Parquet file. Low-cardinality fields (symbol, side,
//! type) are dictionary-encoded: a tiny value table plus dense `Int8`
//! indices that compress to near nothing. Small datasets land in a single
//! row group. The writer must be closed for the footer to be flushed; a
//! file without one is corrupt and the error propagates.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringDictionaryBuilder,
    UInt32Builder, UInt64Builder,
};
use arrow::datatypes::{DataType, Field, Int8Type, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Local;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{Result, TradeflowError};
use crate::record::Record;

/// Result of one columnar write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnarArtifact {
    /// Full path of the written file
    pub path: PathBuf,
    /// Rows written
    pub rows: usize,
    /// File size after close
    pub bytes: u64,
}

fn dictionary_utf8() -> DataType {
    DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Utf8))
}

/// Arrow schema for the trade table; column order matches the input file
/// and the COPY stream
pub fn trade_schema() -> Schema {
    Schema::new(vec![
        Field::new("trade_id", DataType::UInt64, false),
        Field::new("order_id", DataType::UInt64, false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("symbol", dictionary_utf8(), false),
        Field::new("price", DataType::Float64, false),
        Field::new("volume", DataType::UInt32, false),
        Field::new("side", dictionary_utf8(), false),
        Field::new("type", dictionary_utf8(), false),
        Field::new("is_pro", DataType::Boolean, false),
    ])
}

/// Write `records` as `trades_YYYYMMDD_HHMMSS.parquet` under `dir`.
///
/// The directory is created if absent. The filename derives from local wall
/// clock time.
pub fn write_parquet(records: &[Record], dir: &Path) -> Result<ColumnarArtifact> {
    std::fs::create_dir_all(dir)?;
    let filename = Local::now().format("trades_%Y%m%d_%H%M%S.parquet").to_string();
    let path = dir.join(filename);
    write_parquet_to(records, &path)?;

    let bytes = std::fs::metadata(&path)?.len();
    Ok(ColumnarArtifact {
        path,
        rows: records.len(),
        bytes,
    })
}

/// Write `records` to an explicit path
pub fn write_parquet_to(records: &[Record], path: &Path) -> Result<()> {
    let batch = build_batch(records)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        // Whole dataset in one row group; the loads this pipeline handles
        // stay well below parquet's practical group ceiling.
        .set_max_row_group_size(records.len().max(1))
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| TradeflowError::encode(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| TradeflowError::encode(e.to_string()))?;
    // Flushes the footer; skipping this leaves a corrupt file.
    writer
        .close()
        .map_err(|e| TradeflowError::encode(e.to_string()))?;
    Ok(())
}

fn build_batch(records: &[Record]) -> Result<RecordBatch> {
    let n = records.len();

    let mut trade_ids = UInt64Builder::with_capacity(n);
    let mut order_ids = UInt64Builder::with_capacity(n);
    let mut timestamps = Int64Builder::with_capacity(n);
    let mut symbols = StringDictionaryBuilder::<Int8Type>::new();
    let mut prices = Float64Builder::with_capacity(n);
    let mut volumes = UInt32Builder::with_capacity(n);
    let mut sides = StringDictionaryBuilder::<Int8Type>::new();
    let mut types = StringDictionaryBuilder::<Int8Type>::new();
    let mut is_pros = BooleanBuilder::with_capacity(n);

    for record in records {
        trade_ids.append_value(record.trade_id);
        order_ids.append_value(record.order_id);
        timestamps.append_value(record.timestamp);
        symbols
            .append(&record.symbol)
            .map_err(|e| TradeflowError::encode(e.to_string()))?;
        prices.append_value(record.price);
        volumes.append_value(record.volume);

        let side = [record.side];
        sides
            .append(std::str::from_utf8(&side).unwrap_or("?"))
            .map_err(|e| TradeflowError::encode(e.to_string()))?;
        let order_type = [record.order_type];
        types
            .append(std::str::from_utf8(&order_type).unwrap_or("?"))
            .map_err(|e| TradeflowError::encode(e.to_string()))?;

        is_pros.append_value(record.is_pro);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(trade_ids.finish()),
        Arc::new(order_ids.finish()),
        Arc::new(timestamps.finish()),
        Arc::new(symbols.finish()),
        Arc::new(prices.finish()),
        Arc::new(volumes.finish()),
        Arc::new(sides.finish()),
        Arc::new(types.finish()),
        Arc::new(is_pros.finish()),
    ];

    RecordBatch::try_new(Arc::new(trade_schema()), columns)
        .map_err(|e| TradeflowError::encode(e.to_string()))
}
