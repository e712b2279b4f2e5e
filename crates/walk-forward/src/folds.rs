use chrono::{Duration, NaiveDate};
use quant_core::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{WalkForwardConfig, WalkForwardMode};

/// Date boundaries of one walk-forward cycle. The test window starts exactly
/// where the training window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldWindow {
    pub fold_number: i32,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

/// Partition `[start, end]` into train/test folds.
///
/// A candidate fold whose test window would run past `end` is discarded, not
/// truncated. Fewer folds than `config.min_folds` logs a warning and returns
/// whatever was produced; only malformed configuration is an error.
pub fn generate_folds(
    config: &WalkForwardConfig,
    start: NaiveDate,
    end: NaiveDate,
    mode: WalkForwardMode,
) -> Result<Vec<FoldWindow>, ConfigError> {
    config.validate()?;
    if start >= end {
        return Err(ConfigError::InvalidDateRange { start, end });
    }

    let train = Duration::days(config.training_window_days as i64);
    let test = Duration::days(config.test_window_days as i64);
    let step = Duration::days(config.step_days as i64);

    let mut folds = Vec::new();
    let mut current_start = start;

    loop {
        let train_start = match mode {
            WalkForwardMode::Rolling => current_start,
            WalkForwardMode::Anchored => start,
        };
        let train_end = current_start + train;
        let test_start = train_end;
        let test_end = test_start + test;

        if test_end > end {
            break;
        }

        folds.push(FoldWindow {
            fold_number: folds.len() as i32 + 1,
            train_start,
            train_end,
            test_start,
            test_end,
        });
        current_start += step;
    }

    if (folds.len() as u32) < config.min_folds {
        warn!(
            produced = folds.len(),
            min_folds = config.min_folds,
            %start,
            %end,
            "walk-forward fold count below configured minimum; continuing"
        );
    }

    Ok(folds)
}
