//! Per-symbol technical indicators
//!
//! Records are grouped by symbol (input order preserved within a group) and
//! each group yields one row of SMA, RSI and VWAP. The effective window is
//! `p = min(period, n)` for a symbol with `n` records.

use std::collections::HashMap;

use crate::record::{IndicatorRow, Record};

#[derive(Default)]
struct SymbolSeries {
    prices: Vec<f64>,
    volumes: Vec<u32>,
}

/// Compute one [`IndicatorRow`] per distinct symbol.
///
/// Rows come back sorted by symbol so output is deterministic. The
/// `computed_at` stamp stays zero; the sink assigns it at persist time.
pub fn compute(records: &[Record], period: u32) -> Vec<IndicatorRow> {
    let mut groups: HashMap<&str, SymbolSeries> = HashMap::new();
    for record in records {
        let series = groups.entry(record.symbol.as_str()).or_default();
        series.prices.push(record.price);
        series.volumes.push(record.volume);
    }

    let mut rows: Vec<IndicatorRow> = groups
        .into_iter()
        .map(|(symbol, series)| {
            let effective = (period as usize).min(series.prices.len()) as u32;
            IndicatorRow {
                symbol: symbol.to_string(),
                sma: sma(&series.prices, effective as usize),
                rsi: rsi(&series.prices, effective as usize),
                vwap: vwap(&series.prices, &series.volumes),
                period: effective,
                computed_at: 0,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    rows
}

/// Arithmetic mean of the last `window` prices; 0.0 on an empty window
fn sma(prices: &[f64], window: usize) -> f64 {
    if window == 0 || prices.is_empty() {
        return 0.0;
    }
    let window = window.min(prices.len());
    let tail = &prices[prices.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

/// Volume-weighted average price over the whole series; 0.0 on zero volume
fn vwap(prices: &[f64], volumes: &[u32]) -> f64 {
    let total_volume: u64 = volumes.iter().map(|&v| u64::from(v)).sum();
    if total_volume == 0 {
        return 0.0;
    }
    let notional: f64 = prices
        .iter()
        .zip(volumes)
        .map(|(&p, &v)| p * f64::from(v))
        .sum();
    notional / total_volume as f64
}

/// Relative strength index over the last `window + 1` prices.
///
/// With no consecutive differences the result is the neutral 50.0; with no
/// losses it saturates at 100.0.
fn rsi(prices: &[f64], window: usize) -> f64 {
    let take = (window + 1).min(prices.len());
    let tail = &prices[prices.len() - take..];
    let diff_count = tail.len().saturating_sub(1);
    if diff_count == 0 {
        return 50.0;
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for pair in tail.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > 0.0 {
            gain += diff;
        } else {
            loss += -diff;
        }
    }

    let avg_gain = gain / diff_count as f64;
    let avg_loss = loss / diff_count as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
