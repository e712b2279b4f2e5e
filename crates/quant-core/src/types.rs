use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    Signal,
    Timeout,
    EndOfData,
    Other,
}

/// Immutable record of one closed trade, produced by the external
/// simulator/execution engine. The pnl sign is assumed consistent with
/// side and price delta; this crate does not re-derive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub side: TradeSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Realized profit/loss in account currency.
    pub pnl: f64,
    /// Realized profit/loss as a percentage of entry value.
    pub pnl_pct: f64,
    pub bars_held: u32,
    pub exit_reason: ExitReason,
}
