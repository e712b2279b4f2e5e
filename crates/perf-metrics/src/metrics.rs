use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Aggregate performance over a set of closed trades.
///
/// Created fresh per evaluation call and never mutated afterwards. Ratios
/// that are mathematically undefined for the sample (zero variance, no
/// losers, zero drawdown, fewer than two trades) are `None` rather than a
/// silently wrong number.
///
/// `profit_factor` uses the infinity convention: `f64::INFINITY` when there
/// are winners but no losses, `0.0` when there are neither. JSON cannot
/// carry infinity, so the serialized form emits `null` for a non-finite
/// value and deserialization maps `null` back to infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Optional sample tag, e.g. "train" or "test".
    pub label: Option<String>,

    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    /// Fraction of winning trades, 0.0..=1.0.
    pub win_rate: f64,

    pub gross_profit: f64,
    pub gross_loss: f64,
    #[serde(
        serialize_with = "serialize_finite_or_null",
        deserialize_with = "deserialize_null_as_infinity"
    )]
    pub profit_factor: f64,
    pub net_profit: f64,

    /// Mean pnl of winning trades (0.0 when there are none).
    pub avg_win: f64,
    /// Mean pnl of losing trades; negative or zero (0.0 when there are none).
    pub avg_loss: f64,
    /// Expected pnl per trade.
    pub expectancy: f64,

    /// Deepest peak-to-trough equity decline in currency; always <= 0.
    pub max_drawdown: f64,
    /// Drawdown at the same trough as a percentage of the peak; always <= 0.
    pub max_drawdown_pct: f64,

    pub max_consecutive_wins: i32,
    pub max_consecutive_losses: i32,

    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,

    /// Net profit as a percentage of initial capital.
    pub total_return_pct: f64,

    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,
}

impl PerformanceMetrics {
    /// All-zero metrics for an empty trade set. Not an error by design.
    pub fn empty(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_string),
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            profit_factor: 0.0,
            net_profit: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            expectancy: 0.0,
            max_drawdown: 0.0,
            max_drawdown_pct: 0.0,
            max_consecutive_wins: 0,
            max_consecutive_losses: 0,
            largest_win: 0.0,
            largest_loss: 0.0,
            avg_bars_held: 0.0,
            total_return_pct: 0.0,
            sharpe_ratio: None,
            sortino_ratio: None,
            calmar_ratio: None,
        }
    }
}

/// Serialize a ratio that may legitimately be infinite: JSON gets `null`
/// instead of a value it cannot represent.
pub fn serialize_finite_or_null<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Inverse of [`serialize_finite_or_null`]: `null` means the ratio was
/// infinite (the only non-finite value these fields can take).
pub fn deserialize_null_as_infinity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}
