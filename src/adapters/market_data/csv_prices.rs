//! CSV price files and report export
//!
//! Input format: header `timestamp,price_a,price_b`, one aligned bar per
//! row, RFC 3339 timestamps in strictly increasing order. Rows are never
//! sorted or repaired here.

use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::AnalysisReport;
use crate::domain::{PairsError, PricePoint, PriceSeries, TradeLog};

#[derive(Debug, Error)]
pub enum PriceFileError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Price file {} has no rows", path.display())]
    Empty { path: PathBuf },
    #[error(transparent)]
    Data(#[from] PairsError),
}

/// One aligned bar as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
}

/// Flat trade row for CSV export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub id: u64,
    pub side: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub exit_price_a: f64,
    pub exit_price_b: f64,
    pub hedge_ratio: f64,
    pub exit_reason: String,
    pub bars_held: usize,
    pub gross_pnl: f64,
    pub costs: f64,
    pub net_pnl: f64,
    pub return_pct: f64,
}

/// Load an aligned price file into two series named `symbol_a` / `symbol_b`
pub fn load_price_pair<P: AsRef<Path>>(
    path: P,
    symbol_a: &str,
    symbol_b: &str,
) -> Result<(PriceSeries, PriceSeries), PriceFileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PriceFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = Reader::from_reader(file);
    let mut points_a = Vec::new();
    let mut points_b = Vec::new();

    for result in reader.deserialize() {
        let row: PriceRow = result.map_err(|source| PriceFileError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        points_a.push(PricePoint {
            timestamp: row.timestamp,
            price: row.price_a,
        });
        points_b.push(PricePoint {
            timestamp: row.timestamp,
            price: row.price_b,
        });
    }

    if points_a.is_empty() {
        return Err(PriceFileError::Empty {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(path = %path.display(), rows = points_a.len(), "Loaded price file");

    Ok((
        PriceSeries::new(symbol_a, points_a)?,
        PriceSeries::new(symbol_b, points_b)?,
    ))
}

/// Write two aligned series in the input format
pub fn save_price_pair<P: AsRef<Path>>(
    price_a: &PriceSeries,
    price_b: &PriceSeries,
    path: P,
) -> Result<(), PriceFileError> {
    price_a.check_aligned(price_b)?;
    let path = path.as_ref();
    let mut writer = create_writer(path)?;

    for ((&timestamp, &a), &b) in price_a
        .timestamps()
        .iter()
        .zip(price_a.prices())
        .zip(price_b.prices())
    {
        let row = PriceRow {
            timestamp,
            price_a: a,
            price_b: b,
        };
        writer.serialize(row).map_err(|source| PriceFileError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    }

    flush(writer, path)
}

/// Export closed trades, one row per round trip
pub fn save_trades<P: AsRef<Path>>(log: &TradeLog, path: P) -> Result<usize, PriceFileError> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;

    for trade in log.trades() {
        let row = TradeRow {
            id: trade.id,
            side: trade.side.to_string(),
            entry_time: trade.entry_time,
            exit_time: trade.exit_time,
            entry_price_a: trade.entry_prices.a,
            entry_price_b: trade.entry_prices.b,
            exit_price_a: trade.exit_prices.a,
            exit_price_b: trade.exit_prices.b,
            hedge_ratio: trade.hedge_ratio,
            exit_reason: trade.exit_reason.to_string(),
            bars_held: trade.bars_held(),
            gross_pnl: trade.gross_pnl,
            costs: trade.costs,
            net_pnl: trade.net_pnl,
            return_pct: trade.return_pct,
        };
        writer.serialize(row).map_err(|source| PriceFileError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    }

    flush(writer, path)?;
    Ok(log.len())
}

/// Export the full report as pretty JSON
pub fn save_report_json<P: AsRef<Path>>(
    report: &AnalysisReport,
    path: P,
) -> Result<(), PriceFileError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| PriceFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

fn create_writer(path: &Path) -> Result<Writer<File>, PriceFileError> {
    let file = File::create(path).map_err(|source| PriceFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Writer::from_writer(file))
}

fn flush(mut writer: Writer<File>, path: &Path) -> Result<(), PriceFileError> {
    writer.flush().map_err(|source| PriceFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
