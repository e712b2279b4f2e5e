use crate::models::{BlockReason, RiskCheck, RiskLimits, RiskSnapshot, RiskState};
use chrono::Duration;
use quant_core::{Clock, ConfigError};
use std::sync::Arc;
use tracing::{info, warn};

/// Live risk gate for a single account. Tracks per-day trade counts, PnL,
/// open positions and loss streaks, and answers "may I open a trade right
/// now". All time is read through the injected clock so tests (and
/// backtests) can drive it deterministically.
///
/// Not internally synchronized; callers sharing a manager across threads
/// wrap it in a `Mutex`.
pub struct RiskManager {
    limits: RiskLimits,
    account_value: f64,
    state: RiskState,
    clock: Arc<dyn Clock>,
}

impl RiskManager {
    pub fn new(
        limits: RiskLimits,
        account_value: f64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        limits.validate()?;
        if account_value <= 0.0 {
            return Err(ConfigError::invalid(
                "account_value",
                format!("must be positive, got {account_value}"),
            ));
        }
        let state = RiskState::fresh(clock.today());
        Ok(Self {
            limits,
            account_value,
            state,
            clock,
        })
    }

    /// Roll the day and expire cooldowns. Runs before every read or write
    /// of the state so stale state is never observed.
    fn sync(&mut self) {
        let today = self.clock.today();
        if today != self.state.date {
            info!(date = %today, "risk state rolled to new trading day");
            self.state = RiskState::fresh(today);
        }
        if self.state.in_cooldown {
            if let Some(until) = self.state.cooldown_until {
                if self.clock.now() >= until {
                    info!("loss streak cooldown expired");
                    self.state.in_cooldown = false;
                    self.state.cooldown_until = None;
                    self.state.consecutive_losses = 0;
                }
            }
        }
    }

    /// Check every limit and report all violations at once.
    pub fn can_trade(&mut self) -> RiskCheck {
        self.sync();
        let mut reasons = Vec::new();

        if let Some(limit) = self.limits.max_trades_per_day {
            if self.state.trades_today >= limit {
                reasons.push(BlockReason::MaxTradesPerDay { limit });
            }
        }

        if let Some(limit_pct) = self.limits.max_daily_loss_pct {
            let loss_cap = self.account_value * limit_pct / 100.0;
            if self.state.daily_pnl <= -loss_cap {
                reasons.push(BlockReason::DailyLossPct {
                    limit_pct,
                    current_pnl: self.state.daily_pnl,
                });
            }
        }

        if let Some(limit) = self.limits.max_daily_loss_amount {
            if self.state.daily_pnl <= -limit {
                reasons.push(BlockReason::DailyLossAmount {
                    limit,
                    current_pnl: self.state.daily_pnl,
                });
            }
        }

        if let Some(limit) = self.limits.max_concurrent_positions {
            if self.state.open_positions >= limit {
                reasons.push(BlockReason::MaxConcurrentPositions { limit });
            }
        }

        if self.state.in_cooldown {
            if let Some(until) = self.state.cooldown_until {
                reasons.push(BlockReason::Cooldown { until });
            }
        }

        if !reasons.is_empty() {
            warn!(count = reasons.len(), "trade blocked by risk limits");
        }

        RiskCheck {
            allowed: reasons.is_empty(),
            reasons,
        }
    }

    /// Record that a trade was opened. Call after a passing `can_trade`.
    pub fn record_trade_start(&mut self) {
        self.sync();
        self.state.trades_today += 1;
        self.state.open_positions += 1;
    }

    /// Record a closed trade's realized PnL. A loss extends the streak and
    /// may trigger a cooldown; any non-negative result clears the streak.
    pub fn record_trade_end(&mut self, pnl: f64) {
        self.sync();
        self.state.daily_pnl += pnl;
        self.state.open_positions = self.state.open_positions.saturating_sub(1);

        if pnl < 0.0 {
            self.state.consecutive_losses += 1;
            if let Some(threshold) = self.limits.loss_streak_cooldown {
                if self.state.consecutive_losses >= threshold && !self.state.in_cooldown {
                    let until =
                        self.clock.now() + Duration::minutes(self.limits.cooldown_duration_minutes);
                    warn!(
                        losses = self.state.consecutive_losses,
                        until = %until,
                        "loss streak cooldown triggered"
                    );
                    self.state.in_cooldown = true;
                    self.state.cooldown_until = Some(until);
                }
            }
        } else {
            self.state.consecutive_losses = 0;
        }
    }

    pub fn set_account_value(&mut self, account_value: f64) -> Result<(), ConfigError> {
        if account_value <= 0.0 {
            return Err(ConfigError::invalid(
                "account_value",
                format!("must be positive, got {account_value}"),
            ));
        }
        self.account_value = account_value;
        Ok(())
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn state(&mut self) -> &RiskState {
        self.sync();
        &self.state
    }

    pub fn snapshot(&mut self) -> RiskSnapshot {
        self.sync();
        RiskSnapshot {
            date: self.state.date,
            account_value: self.account_value,
            trades_today: self.state.trades_today,
            daily_pnl: self.state.daily_pnl,
            daily_pnl_pct: self.state.daily_pnl / self.account_value * 100.0,
            open_positions: self.state.open_positions,
            consecutive_losses: self.state.consecutive_losses,
            in_cooldown: self.state.in_cooldown,
            cooldown_until: self.state.cooldown_until,
        }
    }
}
