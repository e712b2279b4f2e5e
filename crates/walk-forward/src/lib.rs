pub mod aggregate;
pub mod config;
pub mod folds;
pub mod runner;


pub use aggregate::{aggregate_folds, AggregatedMetrics, Dispersion, MetricSummary, StabilityMetrics};
pub use config::{WalkForwardConfig, WalkForwardMode};
pub use folds::{generate_folds, FoldWindow};
pub use runner::{
    profit_factor_degradation, BacktestEngine, CancelToken, EngineError, Fold, WalkForwardRunner,
};

use chrono::NaiveDate;
use quant_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Complete output of one walk-forward run: the per-fold records plus the
/// aggregated and stability blocks (absent when no fold, or fewer than two
/// folds, succeeded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub folds: Vec<Fold>,
    pub aggregate: Option<AggregatedMetrics>,
    pub stability: Option<StabilityMetrics>,
}

/// Generate folds, backtest each one through `engine`, and aggregate.
///
/// Errors only on invalid configuration; individual fold failures are
/// recorded in the report, never raised.
pub fn run_walk_forward<E: BacktestEngine>(
    engine: &E,
    config: &WalkForwardConfig,
    start: NaiveDate,
    end: NaiveDate,
    mode: WalkForwardMode,
    initial_capital: f64,
    cancel: &CancelToken,
) -> Result<WalkForwardReport, ConfigError> {
    let windows = generate_folds(config, start, end, mode)?;
    let runner = WalkForwardRunner::new(initial_capital);
    let folds = runner.run(engine, &windows, cancel);
    let (aggregate, stability) = aggregate_folds(&folds);

    Ok(WalkForwardReport {
        folds,
        aggregate,
        stability,
    })
}
