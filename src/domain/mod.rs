//! Domain Layer - Core types for the pairs engine
//!
//! Pure data types with no I/O:
//! - `series`: aligned price history per asset
//! - `position`: Flat/Long/Short spread positions and entry snapshots
//! - `signal`: state machine transitions and exit reasons
//! - `trade`: trade records and the trade log
//! - `error`: the crate-wide error type

pub mod error;
pub mod position;
pub mod series;
pub mod signal;
pub mod trade;

pub use error::PairsError;
pub use position::{notional, OpenPosition, Position};
pub use series::{PricePoint, PriceSeries};
pub use signal::{ExitReason, Transition};
pub use trade::{OpenTrade, PricePair, TradeLog, TradeRecord};
