use perf_metrics::metrics::serialize_finite_or_null;
use perf_metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::runner::Fold;

/// Mean/min/max of one metric across the successful folds' test windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Spread of one metric across folds. The coefficient of variation is
/// std/|mean|; an exact zero mean makes it infinite (serialized as null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub std_dev: f64,
    #[serde(
        serialize_with = "serialize_finite_or_null",
        deserialize_with = "perf_metrics::metrics::deserialize_null_as_infinity"
    )]
    pub cv: f64,
}

/// Out-of-sample metrics aggregated over the successful folds.
///
/// `profit_factor` and `sharpe_ratio` summaries exclude folds where the value
/// is infinite or undefined; such folds' raw trade counts still feed
/// `combined_win_rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub successful_folds: usize,
    pub failed_folds: usize,

    pub expectancy: MetricSummary,
    pub profit_factor: Option<MetricSummary>,
    pub win_rate: MetricSummary,
    pub max_drawdown_pct: MetricSummary,
    pub total_return_pct: MetricSummary,
    pub sharpe_ratio: Option<MetricSummary>,
    pub total_trades: MetricSummary,

    /// Trade-weighted win rate: total winners / total trades across folds.
    pub combined_win_rate: f64,
}

/// The overfitting/robustness signal: lower CVs and a higher
/// profitable-folds ratio indicate a more stable strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityMetrics {
    pub expectancy: Option<Dispersion>,
    pub profit_factor: Option<Dispersion>,
    pub total_return_pct: Option<Dispersion>,

    pub worst_fold_return_pct: f64,
    pub profitable_folds_ratio: f64,
}

/// Aggregate a completed fold list. Returns `(aggregate, stability)`;
/// the aggregate is `None` without any successful fold, the stability block
/// is `None` with fewer than two.
pub fn aggregate_folds(folds: &[Fold]) -> (Option<AggregatedMetrics>, Option<StabilityMetrics>) {
    let successful: Vec<&PerformanceMetrics> = folds
        .iter()
        .filter(|f| f.is_successful)
        .filter_map(|f| f.test_metrics.as_ref())
        .collect();
    let failed_folds = folds.len() - successful.len();

    if successful.is_empty() {
        return (None, None);
    }

    let collect = |pick: fn(&PerformanceMetrics) -> f64| -> Vec<f64> {
        successful.iter().map(|m| pick(m)).collect()
    };

    let total_trades: i32 = successful.iter().map(|m| m.total_trades).sum();
    let total_wins: i32 = successful.iter().map(|m| m.winning_trades).sum();
    let combined_win_rate = if total_trades > 0 {
        total_wins as f64 / total_trades as f64
    } else {
        0.0
    };

    let aggregate = AggregatedMetrics {
        successful_folds: successful.len(),
        failed_folds,
        expectancy: summarize(&collect(|m| m.expectancy)),
        profit_factor: summarize_finite(&collect(|m| m.profit_factor)),
        win_rate: summarize(&collect(|m| m.win_rate)),
        max_drawdown_pct: summarize(&collect(|m| m.max_drawdown_pct)),
        total_return_pct: summarize(&collect(|m| m.total_return_pct)),
        sharpe_ratio: {
            let values: Vec<f64> = successful.iter().filter_map(|m| m.sharpe_ratio).collect();
            summarize_finite(&values)
        },
        total_trades: summarize(&collect(|m| m.total_trades as f64)),
        combined_win_rate,
    };

    let stability = if successful.len() >= 2 {
        let returns = collect(|m| m.total_return_pct);
        Some(StabilityMetrics {
            expectancy: dispersion(&collect(|m| m.expectancy)),
            profit_factor: dispersion(&collect(|m| m.profit_factor)),
            total_return_pct: dispersion(&returns),
            worst_fold_return_pct: returns.iter().copied().fold(f64::INFINITY, f64::min),
            profitable_folds_ratio: returns.iter().filter(|r| **r > 0.0).count() as f64
                / returns.len() as f64,
        })
    } else {
        None
    };

    (Some(aggregate), stability)
}

fn summarize(values: &[f64]) -> MetricSummary {
    MetricSummary {
        mean: values.iter().sum::<f64>() / values.len() as f64,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Like [`summarize`], but over the finite subset only; `None` when nothing
/// finite remains (e.g. every fold's profit factor was infinite).
fn summarize_finite(values: &[f64]) -> Option<MetricSummary> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(summarize(&finite))
    }
}

/// Sample standard deviation and coefficient of variation over the finite
/// subset; `None` below two finite values.
fn dispersion(values: &[f64]) -> Option<Dispersion> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }

    let mean = finite.iter().mean();
    let std_dev = finite.iter().std_dev();
    let cv = if mean != 0.0 {
        std_dev / mean.abs()
    } else {
        f64::INFINITY
    };

    Some(Dispersion { std_dev, cv })
}
