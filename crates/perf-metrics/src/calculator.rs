use quant_core::TradeResult;
use statrs::statistics::Statistics;

use crate::metrics::PerformanceMetrics;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Reduce a set of closed trades into a [`PerformanceMetrics`] snapshot
/// using [`DEFAULT_INITIAL_CAPITAL`] for the equity curve.
pub fn compute_metrics(trades: &[TradeResult], label: Option<&str>) -> PerformanceMetrics {
    compute_metrics_with_capital(trades, DEFAULT_INITIAL_CAPITAL, label)
}

/// Reduce a set of closed trades into a [`PerformanceMetrics`] snapshot.
///
/// The input is left untouched; order-dependent statistics (drawdown,
/// streaks) are computed over an internal copy sorted by exit time, so two
/// calls on the same slice produce identical results regardless of input
/// order. An empty slice yields all-zero metrics.
pub fn compute_metrics_with_capital(
    trades: &[TradeResult],
    initial_capital: f64,
    label: Option<&str>,
) -> PerformanceMetrics {
    if trades.is_empty() {
        return PerformanceMetrics::empty(label);
    }

    let mut sorted: Vec<&TradeResult> = trades.iter().collect();
    sorted.sort_by_key(|t| t.exit_time);

    let total = sorted.len();
    let winners: Vec<&TradeResult> = sorted.iter().copied().filter(|t| t.pnl > 0.0).collect();
    let losers: Vec<&TradeResult> = sorted.iter().copied().filter(|t| t.pnl <= 0.0).collect();

    let win_rate = winners.len() as f64 / total as f64;
    let gross_profit: f64 = winners.iter().map(|t| t.pnl).sum();
    let gross_loss: f64 = losers.iter().map(|t| t.pnl).sum::<f64>().abs();
    let net_profit = gross_profit - gross_loss;

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let avg_win = if winners.is_empty() {
        0.0
    } else {
        gross_profit / winners.len() as f64
    };
    let avg_loss = if losers.is_empty() {
        0.0
    } else {
        losers.iter().map(|t| t.pnl).sum::<f64>() / losers.len() as f64
    };

    // Weighted expectancy needs both subsets; otherwise fall back to the
    // plain average trade.
    let expectancy = if !winners.is_empty() && !losers.is_empty() {
        win_rate * avg_win + (1.0 - win_rate) * avg_loss
    } else {
        net_profit / total as f64
    };

    let (max_drawdown, max_drawdown_pct) = drawdown(&sorted, initial_capital);
    let (max_consecutive_wins, max_consecutive_losses) = streaks(&sorted);

    let largest_win = winners.iter().map(|t| t.pnl).fold(0.0, f64::max);
    let largest_loss = losers.iter().map(|t| t.pnl).fold(0.0, f64::min);
    let avg_bars_held = sorted.iter().map(|t| t.bars_held as f64).sum::<f64>() / total as f64;

    let total_return_pct = if initial_capital > 0.0 {
        net_profit / initial_capital * 100.0
    } else {
        0.0
    };

    let (sharpe_ratio, sortino_ratio, calmar_ratio) = risk_ratios(&sorted, max_drawdown_pct);

    PerformanceMetrics {
        label: label.map(str::to_string),
        total_trades: total as i32,
        winning_trades: winners.len() as i32,
        losing_trades: losers.len() as i32,
        win_rate,
        gross_profit,
        gross_loss,
        profit_factor,
        net_profit,
        avg_win,
        avg_loss,
        expectancy,
        max_drawdown,
        max_drawdown_pct,
        max_consecutive_wins,
        max_consecutive_losses,
        largest_win,
        largest_loss,
        avg_bars_held,
        total_return_pct,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
    }
}

/// Equity curve from cumulative pnl; returns (max_drawdown, max_drawdown_pct),
/// both <= 0. The percentage is taken against the peak in force at the trough.
fn drawdown(sorted: &[&TradeResult], initial_capital: f64) -> (f64, f64) {
    let mut equity = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0f64;
    let mut max_dd_pct = 0.0f64;

    for trade in sorted {
        equity += trade.pnl;
        if equity > peak {
            peak = equity;
        }
        let dd = equity - peak;
        if dd < max_dd {
            max_dd = dd;
            max_dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        }
    }

    (max_dd, max_dd_pct)
}

/// Longest win and loss runs in one forward pass. pnl > 0 is a win,
/// pnl <= 0 is a loss.
fn streaks(sorted: &[&TradeResult]) -> (i32, i32) {
    let mut current_wins = 0i32;
    let mut current_losses = 0i32;
    let mut max_wins = 0i32;
    let mut max_losses = 0i32;

    for trade in sorted {
        if trade.pnl > 0.0 {
            current_wins += 1;
            current_losses = 0;
            max_wins = max_wins.max(current_wins);
        } else {
            current_losses += 1;
            current_wins = 0;
            max_losses = max_losses.max(current_losses);
        }
    }

    (max_wins, max_losses)
}

/// Sharpe, Sortino and Calmar over per-trade percentage returns. All three
/// need at least two trades; each is `None` when its denominator degenerates.
fn risk_ratios(
    sorted: &[&TradeResult],
    max_drawdown_pct: f64,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    if sorted.len() < 2 {
        return (None, None, None);
    }

    let returns: Vec<f64> = sorted.iter().map(|t| t.pnl_pct).collect();
    let mean = returns.iter().mean();
    let std = returns.iter().std_dev();

    let sharpe = if std > 1e-10 { Some(mean / std) } else { None };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino = if downside.len() >= 2 {
        let downside_std = downside.iter().std_dev();
        if downside_std > 1e-10 {
            Some(mean / downside_std)
        } else {
            None
        }
    } else {
        None
    };

    let total_return: f64 = returns.iter().sum();
    let calmar = if max_drawdown_pct < 0.0 {
        Some(total_return / max_drawdown_pct.abs())
    } else {
        None
    };

    (sharpe, sortino, calmar)
}
