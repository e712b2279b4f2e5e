use chrono::{DateTime, NaiveDate, Utc};
use quant_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard limits enforced before every trade. `None` disables a check; a
/// present value is enforced literally, so a limit of zero blocks rather
/// than allows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum entries per calendar day.
    pub max_trades_per_day: Option<u32>,
    /// Daily loss limit in percent of account value (5.0 = 5%).
    pub max_daily_loss_pct: Option<f64>,
    /// Absolute daily loss cap in account currency.
    pub max_daily_loss_amount: Option<f64>,
    /// Maximum simultaneously open positions.
    pub max_concurrent_positions: Option<u32>,
    /// Consecutive losses that trigger a cooldown.
    pub loss_streak_cooldown: Option<u32>,
    /// How long a triggered cooldown lasts.
    pub cooldown_duration_minutes: i64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_trades_per_day: Some(10),
            max_daily_loss_pct: Some(3.0),
            max_daily_loss_amount: None,
            max_concurrent_positions: Some(3),
            loss_streak_cooldown: Some(3),
            cooldown_duration_minutes: 60,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pct) = self.max_daily_loss_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(ConfigError::invalid(
                    "max_daily_loss_pct",
                    format!("must be within 0.0..=100.0 percent, got {pct}"),
                ));
            }
        }
        if let Some(amount) = self.max_daily_loss_amount {
            if amount <= 0.0 {
                return Err(ConfigError::invalid(
                    "max_daily_loss_amount",
                    format!("must be positive when set, got {amount}"),
                ));
            }
        }
        if self.loss_streak_cooldown.is_some() && self.cooldown_duration_minutes <= 0 {
            return Err(ConfigError::invalid(
                "cooldown_duration_minutes",
                "must be positive when a loss streak cooldown is configured",
            ));
        }
        Ok(())
    }
}

/// Mutable per-day trading state. Reset on day rollover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub date: NaiveDate,
    pub trades_today: u32,
    pub daily_pnl: f64,
    pub open_positions: u32,
    pub consecutive_losses: u32,
    pub in_cooldown: bool,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl RiskState {
    /// Fresh state for a new trading day.
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            trades_today: 0,
            daily_pnl: 0.0,
            open_positions: 0,
            consecutive_losses: 0,
            in_cooldown: false,
            cooldown_until: None,
        }
    }
}

/// Why a trade was blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockReason {
    MaxTradesPerDay { limit: u32 },
    DailyLossPct { limit_pct: f64, current_pnl: f64 },
    DailyLossAmount { limit: f64, current_pnl: f64 },
    MaxConcurrentPositions { limit: u32 },
    Cooldown { until: DateTime<Utc> },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::MaxTradesPerDay { limit } => {
                write!(f, "MAX_TRADES: daily trade limit of {limit} reached")
            }
            BlockReason::DailyLossPct {
                limit_pct,
                current_pnl,
            } => write!(
                f,
                "DAILY_LOSS_PCT: daily loss {current_pnl:.2} exceeds {limit_pct:.1}% of account"
            ),
            BlockReason::DailyLossAmount { limit, current_pnl } => write!(
                f,
                "DAILY_LOSS_AMOUNT: daily loss {current_pnl:.2} exceeds cap of {limit:.2}"
            ),
            BlockReason::MaxConcurrentPositions { limit } => {
                write!(f, "MAX_POSITIONS: {limit} positions already open")
            }
            BlockReason::Cooldown { until } => {
                write!(f, "COOLDOWN: loss streak cooldown active until {until}")
            }
        }
    }
}

/// Outcome of a pre-trade check. `reasons` lists every violated limit, not
/// just the first one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCheck {
    pub allowed: bool,
    pub reasons: Vec<BlockReason>,
}

/// Point-in-time view of the manager for dashboards and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub date: NaiveDate,
    pub account_value: f64,
    pub trades_today: u32,
    pub daily_pnl: f64,
    pub daily_pnl_pct: f64,
    pub open_positions: u32,
    pub consecutive_losses: u32,
    pub in_cooldown: bool,
    pub cooldown_until: Option<DateTime<Utc>>,
}
