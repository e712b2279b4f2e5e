use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use perf_metrics::{compute_metrics_with_capital, PerformanceMetrics};
use quant_core::TradeResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::folds::FoldWindow;

/// Failure modes of the external simulation collaborator. Any of these on a
/// fold marks that fold unsuccessful; none of them aborts the run.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Insufficient data for window {start}..{end}: {message}")]
    InsufficientData {
        start: NaiveDate,
        end: NaiveDate,
        message: String,
    },

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Run cancelled")]
    Cancelled,
}

/// The external backtest simulator, seen through the only surface this crate
/// needs: produce the closed trades for a date window. Adapters own timeout
/// enforcement and must surface a timeout as [`EngineError::Timeout`].
pub trait BacktestEngine: Sync {
    fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradeResult>, EngineError>;
}

/// Cooperative cancellation, checked at fold granularity: a cancelled token
/// stops folds that have not started, never interrupts one mid-simulation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One completed walk-forward cycle: window boundaries, in-sample and
/// out-of-sample metrics, and the train-vs-test degradation score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fold {
    pub fold_number: i32,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub train_metrics: Option<PerformanceMetrics>,
    pub test_metrics: Option<PerformanceMetrics>,
    /// 0.0 = out-of-sample held up, 1.0 = untrustworthy fold.
    pub degradation: f64,
    pub is_successful: bool,
    pub error: Option<String>,
}

/// Runs one backtest per fold window and collects per-fold metrics.
///
/// Folds are independent of one another and run in parallel; results come
/// back in fold order. A fold whose simulation fails is recorded with
/// `is_successful = false` and does not abort its siblings.
pub struct WalkForwardRunner {
    initial_capital: f64,
}

impl WalkForwardRunner {
    pub fn new(initial_capital: f64) -> Self {
        Self { initial_capital }
    }

    pub fn run<E: BacktestEngine>(
        &self,
        engine: &E,
        windows: &[FoldWindow],
        cancel: &CancelToken,
    ) -> Vec<Fold> {
        windows
            .par_iter()
            .map(|window| self.run_fold(engine, window, cancel))
            .collect()
    }

    fn run_fold<E: BacktestEngine>(
        &self,
        engine: &E,
        window: &FoldWindow,
        cancel: &CancelToken,
    ) -> Fold {
        let outcome = if cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            self.simulate_fold(engine, window)
        };

        match outcome {
            Ok((train_metrics, test_metrics)) => {
                let degradation = profit_factor_degradation(&train_metrics, &test_metrics);
                Fold {
                    fold_number: window.fold_number,
                    train_start: window.train_start,
                    train_end: window.train_end,
                    test_start: window.test_start,
                    test_end: window.test_end,
                    train_metrics: Some(train_metrics),
                    test_metrics: Some(test_metrics),
                    degradation,
                    is_successful: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    fold = window.fold_number,
                    error = %e,
                    "walk-forward fold failed; excluding from aggregation"
                );
                Fold {
                    fold_number: window.fold_number,
                    train_start: window.train_start,
                    train_end: window.train_end,
                    test_start: window.test_start,
                    test_end: window.test_end,
                    train_metrics: None,
                    test_metrics: None,
                    degradation: 1.0,
                    is_successful: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn simulate_fold<E: BacktestEngine>(
        &self,
        engine: &E,
        window: &FoldWindow,
    ) -> Result<(PerformanceMetrics, PerformanceMetrics), EngineError> {
        let train_trades = engine.run(window.train_start, window.train_end)?;
        let test_trades = engine.run(window.test_start, window.test_end)?;

        let train_metrics =
            compute_metrics_with_capital(&train_trades, self.initial_capital, Some("train"));
        let test_metrics =
            compute_metrics_with_capital(&test_trades, self.initial_capital, Some("test"));
        Ok((train_metrics, test_metrics))
    }
}

/// How much the out-of-sample profit factor gives back against in-sample.
///
/// 0.0 when the test window held up or improved; 1.0 when the training
/// window itself was unprofitable (nothing to trust); otherwise the relative
/// shortfall, clamped to [0, 1].
pub fn profit_factor_degradation(train: &PerformanceMetrics, test: &PerformanceMetrics) -> f64 {
    if train.profit_factor <= 0.0 {
        return 1.0;
    }
    if test.profit_factor >= train.profit_factor {
        return 0.0;
    }
    (1.0 - test.profit_factor / train.profit_factor).clamp(0.0, 1.0)
}
