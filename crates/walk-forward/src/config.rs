use quant_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Fold sizing for walk-forward analysis, in calendar days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub training_window_days: u32,
    pub test_window_days: u32,
    pub step_days: u32,
    /// Producing fewer folds than this is a warning, not an error.
    pub min_folds: u32,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            training_window_days: 180,
            test_window_days: 60,
            step_days: 60,
            min_folds: 3,
        }
    }
}

impl WalkForwardConfig {
    /// Fail fast on configuration errors; never during a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.training_window_days == 0 {
            return Err(ConfigError::invalid(
                "training_window_days",
                "must be a positive number of days",
            ));
        }
        if self.test_window_days == 0 {
            return Err(ConfigError::invalid(
                "test_window_days",
                "must be a positive number of days",
            ));
        }
        if self.step_days == 0 {
            return Err(ConfigError::invalid(
                "step_days",
                "must be a positive number of days",
            ));
        }
        if self.min_folds == 0 {
            return Err(ConfigError::invalid("min_folds", "must be at least 1"));
        }
        Ok(())
    }
}

/// How the training window moves between folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkForwardMode {
    /// Training window slides forward with each fold.
    Rolling,
    /// Training always starts at the overall start date and only grows.
    Anchored,
}
