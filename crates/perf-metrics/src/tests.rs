use chrono::{Duration, TimeZone, Utc};
use quant_core::{ExitReason, TradeResult, TradeSide};

use crate::calculator::{compute_metrics, compute_metrics_with_capital};
use crate::metrics::PerformanceMetrics;

/// Helper: build a closed trade with the given pnl, exiting `offset_hours`
/// after a fixed epoch so exit-time ordering is explicit.
fn trade(pnl: f64, pnl_pct: f64, offset_hours: i64) -> TradeResult {
    let entry = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap() + Duration::hours(offset_hours);
    TradeResult {
        entry_time: entry,
        exit_time: entry + Duration::hours(1),
        side: TradeSide::Long,
        entry_price: 100.0,
        exit_price: 100.0 + pnl / 10.0,
        quantity: 10.0,
        pnl,
        pnl_pct,
        bars_held: 4,
        exit_reason: ExitReason::Signal,
    }
}

fn trades_from_pnls(pnls: &[f64]) -> Vec<TradeResult> {
    pnls.iter()
        .enumerate()
        .map(|(i, &pnl)| trade(pnl, pnl / 10.0, i as i64 * 2))
        .collect()
}

// =============================================================================
// Basic aggregates
// =============================================================================

#[test]
fn empty_trade_set_is_all_zero_not_an_error() {
    let metrics = compute_metrics(&[], Some("test"));
    assert_eq!(metrics, PerformanceMetrics::empty(Some("test")));
    assert_eq!(metrics.total_trades, 0);
    assert_eq!(metrics.profit_factor, 0.0);
    assert!(metrics.sharpe_ratio.is_none());
}

#[test]
fn metrics_from_known_pnls() {
    // pnl = [100, -50, 150, -50]
    let trades = trades_from_pnls(&[100.0, -50.0, 150.0, -50.0]);
    let m = compute_metrics(&trades, None);

    assert_eq!(m.total_trades, 4);
    assert_eq!(m.winning_trades, 2);
    assert_eq!(m.losing_trades, 2);
    assert!((m.win_rate - 0.5).abs() < 1e-12);
    assert!((m.gross_profit - 250.0).abs() < 1e-9);
    assert!((m.gross_loss - 100.0).abs() < 1e-9);
    assert!((m.profit_factor - 2.5).abs() < 1e-9);
    assert!((m.net_profit - 150.0).abs() < 1e-9);
}

#[test]
fn conservation_of_pnl() {
    let trades = trades_from_pnls(&[12.5, -3.0, 7.25, -19.0, 44.0, 0.0]);
    let m = compute_metrics(&trades, None);

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    assert!((m.net_profit - total_pnl).abs() < 1e-9);
    assert!((m.gross_profit - m.gross_loss - m.net_profit).abs() < 1e-9);
}

#[test]
fn expectancy_weights_wins_and_losses() {
    let trades = trades_from_pnls(&[100.0, -50.0, 150.0, -50.0]);
    let m = compute_metrics(&trades, None);

    // win_rate * avg_win + (1 - win_rate) * avg_loss = 0.5*125 + 0.5*(-50)
    assert!((m.avg_win - 125.0).abs() < 1e-9);
    assert!((m.avg_loss - (-50.0)).abs() < 1e-9);
    assert!((m.expectancy - 37.5).abs() < 1e-9);
}

#[test]
fn expectancy_falls_back_to_avg_trade_without_losers() {
    let trades = trades_from_pnls(&[100.0, 50.0]);
    let m = compute_metrics(&trades, None);
    assert!((m.expectancy - 75.0).abs() < 1e-9);
}

// =============================================================================
// Profit factor infinity convention
// =============================================================================

#[test]
fn profit_factor_is_infinite_without_losses() {
    let trades = trades_from_pnls(&[100.0, 50.0]);
    let m = compute_metrics(&trades, None);
    assert!(m.profit_factor.is_infinite() && m.profit_factor > 0.0);
}

#[test]
fn infinite_profit_factor_serializes_as_null() {
    let trades = trades_from_pnls(&[100.0, 50.0]);
    let m = compute_metrics(&trades, None);

    let json = serde_json::to_value(&m).unwrap();
    assert!(json["profit_factor"].is_null());

    let back: PerformanceMetrics = serde_json::from_value(json).unwrap();
    assert!(back.profit_factor.is_infinite());
}

// =============================================================================
// Drawdown
// =============================================================================

#[test]
fn drawdown_is_never_positive() {
    let trades = trades_from_pnls(&[100.0, -200.0, 50.0, -75.0, 300.0]);
    let m = compute_metrics(&trades, None);
    assert!(m.max_drawdown <= 0.0);
    assert!(m.max_drawdown_pct <= 0.0);
}

#[test]
fn drawdown_zero_iff_equity_non_decreasing() {
    let trades = trades_from_pnls(&[10.0, 0.0, 25.0]);
    let m = compute_metrics(&trades, None);
    // The 0.0 trade keeps equity flat, never below the peak.
    assert_eq!(m.max_drawdown, 0.0);
    assert_eq!(m.max_drawdown_pct, 0.0);
}

#[test]
fn drawdown_tracks_peak_at_trough() {
    // Capital 10000: equity 10100 (peak), 9900, 9950.
    let trades = trades_from_pnls(&[100.0, -200.0, 50.0]);
    let m = compute_metrics_with_capital(&trades, 10_000.0, None);

    assert!((m.max_drawdown - (-200.0)).abs() < 1e-9);
    let expected_pct = -200.0 / 10_100.0 * 100.0;
    assert!((m.max_drawdown_pct - expected_pct).abs() < 1e-9);
}

#[test]
fn drawdown_uses_exit_time_order_not_input_order() {
    let mut trades = trades_from_pnls(&[100.0, -200.0, 50.0]);
    trades.reverse();
    let shuffled = compute_metrics_with_capital(&trades, 10_000.0, None);
    assert!((shuffled.max_drawdown - (-200.0)).abs() < 1e-9);
}

// =============================================================================
// Streaks
// =============================================================================

#[test]
fn streaks_reset_on_sign_change() {
    let trades = trades_from_pnls(&[10.0, 10.0, 10.0, -5.0, -5.0, 10.0]);
    let m = compute_metrics(&trades, None);
    assert_eq!(m.max_consecutive_wins, 3);
    assert_eq!(m.max_consecutive_losses, 2);
}

#[test]
fn zero_pnl_counts_as_loss_in_streaks() {
    let trades = trades_from_pnls(&[10.0, 0.0, 0.0, 10.0]);
    let m = compute_metrics(&trades, None);
    assert_eq!(m.max_consecutive_losses, 2);
    assert_eq!(m.max_consecutive_wins, 1);
}

// =============================================================================
// Risk ratios
// =============================================================================

#[test]
fn ratios_undefined_below_two_trades() {
    let trades = trades_from_pnls(&[100.0]);
    let m = compute_metrics(&trades, None);
    assert!(m.sharpe_ratio.is_none());
    assert!(m.sortino_ratio.is_none());
    assert!(m.calmar_ratio.is_none());
}

#[test]
fn sharpe_undefined_for_zero_variance() {
    let trades = trades_from_pnls(&[50.0, 50.0, 50.0]);
    let m = compute_metrics(&trades, None);
    assert!(m.sharpe_ratio.is_none());
}

#[test]
fn sortino_needs_at_least_two_losing_returns() {
    let trades = trades_from_pnls(&[100.0, -50.0, 150.0]);
    let m = compute_metrics(&trades, None);
    assert!(m.sharpe_ratio.is_some());
    assert!(m.sortino_ratio.is_none());
}

#[test]
fn calmar_defined_only_with_drawdown() {
    let flat = compute_metrics(&trades_from_pnls(&[10.0, 20.0]), None);
    assert!(flat.calmar_ratio.is_none());

    let dipped = compute_metrics(&trades_from_pnls(&[100.0, -50.0, 150.0, -50.0]), None);
    let calmar = dipped.calmar_ratio.expect("drawdown exists");
    let total_pct: f64 = [100.0, -50.0, 150.0, -50.0].iter().map(|p| p / 10.0).sum();
    assert!((calmar - total_pct / dipped.max_drawdown_pct.abs()).abs() < 1e-9);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn same_input_yields_identical_output() {
    let trades = trades_from_pnls(&[12.0, -7.5, 3.25, -1.0, 88.0]);
    let a = compute_metrics(&trades, Some("test"));
    let b = compute_metrics(&trades, Some("test"));
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn supplementary_trade_stats() {
    let trades = trades_from_pnls(&[100.0, -50.0, 150.0, -50.0]);
    let m = compute_metrics(&trades, None);
    assert_eq!(m.largest_win, 150.0);
    assert_eq!(m.largest_loss, -50.0);
    assert!((m.avg_bars_held - 4.0).abs() < 1e-12);
    assert!((m.total_return_pct - 1.5).abs() < 1e-9); // 150 on 10k
}
