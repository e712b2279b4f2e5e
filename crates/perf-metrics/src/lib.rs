pub mod calculator;
pub mod metrics;

#[cfg(test)]
mod tests;

pub use calculator::{compute_metrics, compute_metrics_with_capital, DEFAULT_INITIAL_CAPITAL};
pub use metrics::PerformanceMetrics;
