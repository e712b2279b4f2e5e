use quant_core::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Clear EMA direction with strong ADX backing it
    StrongTrendBull,
    StrongTrendBear,

    /// EMA direction without trend strength confirmation
    WeakTrendBull,
    WeakTrendBear,

    /// Directionless, range-bound tape
    ChopRange,

    /// Extreme volatility; tradable but dangerous
    VolatilityExplosive,

    /// No classifiable structure
    Neutral,
}

impl MarketRegime {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            MarketRegime::StrongTrendBull => "Strong Trend (Bull)",
            MarketRegime::StrongTrendBear => "Strong Trend (Bear)",
            MarketRegime::WeakTrendBull => "Weak Trend (Bull)",
            MarketRegime::WeakTrendBear => "Weak Trend (Bear)",
            MarketRegime::ChopRange => "Chop / Range",
            MarketRegime::VolatilityExplosive => "Volatility Explosive",
            MarketRegime::Neutral => "Neutral",
        }
    }

    /// Derive the entry gate for this regime. Chop only admits structure
    /// entries, Neutral admits none, explosive volatility admits everything
    /// but at reduced size.
    pub fn gate_info(&self) -> GateInfo {
        match self {
            MarketRegime::ChopRange => GateInfo {
                allowed: true,
                reason: Some("chop regime blocks plain market entries".to_string()),
                allowed_entry_types: vec![
                    EntryType::Breakout,
                    EntryType::Retest,
                    EntryType::SfpReclaim,
                ],
                recommendation: "trade range structure only".to_string(),
            },
            MarketRegime::Neutral => GateInfo {
                allowed: false,
                reason: Some("no classifiable market structure".to_string()),
                allowed_entry_types: Vec::new(),
                recommendation: "stand aside".to_string(),
            },
            MarketRegime::VolatilityExplosive => GateInfo {
                allowed: true,
                reason: None,
                allowed_entry_types: EntryType::all(),
                recommendation: "reduce position size".to_string(),
            },
            _ => GateInfo {
                allowed: true,
                reason: None,
                allowed_entry_types: EntryType::all(),
                recommendation: "normal sizing".to_string(),
            },
        }
    }
}

/// Entry styles the decision loop may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Market,
    Breakout,
    Retest,
    SfpReclaim,
}

impl EntryType {
    fn all() -> Vec<EntryType> {
        vec![
            EntryType::Market,
            EntryType::Breakout,
            EntryType::Retest,
            EntryType::SfpReclaim,
        ]
    }
}

/// Trade gate derived from a regime classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateInfo {
    pub allowed: bool,
    pub reason: Option<String>,
    pub allowed_entry_types: Vec<EntryType>,
    pub recommendation: String,
}

// --- Component states ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityState {
    Extreme,
    High,
    Low,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmaAlignment {
    Bull,
    Bear,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdxStrength {
    Strong,
    Weak,
    Chop,
    /// Missing input
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumState {
    Overbought,
    Oversold,
    Bullish,
    Bearish,
    Neutral,
}

/// Indicator snapshot from the external feature engine. Any field may be
/// absent; a missing value degrades its component to the neutral/unknown
/// state rather than being coerced to zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub adx: Option<f64>,
    pub atr_pct: Option<f64>,
    pub rsi: Option<f64>,
}

/// The four component classifications feeding the combiner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeComponents {
    pub ema_alignment: EmaAlignment,
    pub adx_strength: AdxStrength,
    pub volatility_state: VolatilityState,
    pub momentum_state: MomentumState,
}

/// Regime detection result with confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeResult {
    pub regime: MarketRegime,
    /// 0.0..=1.0
    pub confidence: f64,
    pub components: RegimeComponents,
    /// The raw inputs the classification was made from.
    pub snapshot: IndicatorSnapshot,
    pub reasoning: String,
}

impl RegimeResult {
    pub fn gate_info(&self) -> GateInfo {
        self.regime.gate_info()
    }
}

/// Classification thresholds. Construction-time validation enforces the
/// ordering invariants (chop < weak < strong, low < high < extreme,
/// oversold < overbought) so a run never sees an inverted config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub adx_strong_threshold: f64,
    pub adx_weak_threshold: f64,
    pub adx_chop_threshold: f64,
    /// EMA20/EMA50 separation (in percent) below which alignment is neutral.
    pub ema_alignment_tolerance_pct: f64,
    pub atr_extreme_threshold: f64,
    pub atr_high_threshold: f64,
    pub atr_low_threshold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            adx_strong_threshold: 25.0,
            adx_weak_threshold: 20.0,
            adx_chop_threshold: 15.0,
            ema_alignment_tolerance_pct: 0.1,
            atr_extreme_threshold: 5.0,
            atr_high_threshold: 2.5,
            atr_low_threshold: 0.8,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.adx_chop_threshold < self.adx_weak_threshold
            && self.adx_weak_threshold < self.adx_strong_threshold)
        {
            return Err(ConfigError::UnorderedThresholds(format!(
                "ADX thresholds must satisfy chop < weak < strong, got {} / {} / {}",
                self.adx_chop_threshold, self.adx_weak_threshold, self.adx_strong_threshold
            )));
        }
        if !(self.atr_low_threshold < self.atr_high_threshold
            && self.atr_high_threshold < self.atr_extreme_threshold)
        {
            return Err(ConfigError::UnorderedThresholds(format!(
                "ATR thresholds must satisfy low < high < extreme, got {} / {} / {}",
                self.atr_low_threshold, self.atr_high_threshold, self.atr_extreme_threshold
            )));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(ConfigError::UnorderedThresholds(format!(
                "RSI oversold ({}) must be below overbought ({})",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if self.ema_alignment_tolerance_pct < 0.0 {
            return Err(ConfigError::invalid(
                "ema_alignment_tolerance_pct",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Stateless rule-based market regime detector. Every call classifies a
/// fresh indicator snapshot; there is no memory between calls.
pub struct RegimeDetector {
    config: RegimeConfig,
}

impl RegimeDetector {
    pub fn new(config: RegimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Classify the current market state. Missing inputs never raise: each
    /// component degrades to its neutral state and the combined regime
    /// degrades toward Neutral/ChopRange.
    pub fn detect(&self, snapshot: &IndicatorSnapshot) -> RegimeResult {
        let components = RegimeComponents {
            ema_alignment: self.ema_alignment(snapshot.ema20, snapshot.ema50),
            adx_strength: self.adx_strength(snapshot.adx),
            volatility_state: self.volatility_state(snapshot.atr_pct),
            momentum_state: self.momentum_state(snapshot.rsi),
        };

        let (regime, confidence) = self.classify(&components);
        let confidence = confidence.clamp(0.0, 1.0);

        let reasoning = format!(
            "{} (ema: {:?}, adx: {:?}, volatility: {:?}, momentum: {:?})",
            regime.name(),
            components.ema_alignment,
            components.adx_strength,
            components.volatility_state,
            components.momentum_state,
        );
        debug!(regime = regime.name(), confidence, "regime classified");

        RegimeResult {
            regime,
            confidence,
            components,
            snapshot: *snapshot,
            reasoning,
        }
    }

    fn volatility_state(&self, atr_pct: Option<f64>) -> VolatilityState {
        match atr_pct {
            Some(v) if v >= self.config.atr_extreme_threshold => VolatilityState::Extreme,
            Some(v) if v >= self.config.atr_high_threshold => VolatilityState::High,
            Some(v) if v < self.config.atr_low_threshold => VolatilityState::Low,
            Some(_) => VolatilityState::Normal,
            None => VolatilityState::Normal,
        }
    }

    fn ema_alignment(&self, ema20: Option<f64>, ema50: Option<f64>) -> EmaAlignment {
        let (ema20, ema50) = match (ema20, ema50) {
            (Some(fast), Some(slow)) if slow != 0.0 => (fast, slow),
            _ => return EmaAlignment::Neutral,
        };

        let diff_pct = (ema20 - ema50) / ema50 * 100.0;
        if diff_pct > self.config.ema_alignment_tolerance_pct {
            EmaAlignment::Bull
        } else if diff_pct < -self.config.ema_alignment_tolerance_pct {
            EmaAlignment::Bear
        } else {
            EmaAlignment::Neutral
        }
    }

    fn adx_strength(&self, adx: Option<f64>) -> AdxStrength {
        match adx {
            None => AdxStrength::None,
            Some(v) if v >= self.config.adx_strong_threshold => AdxStrength::Strong,
            Some(v) if v >= self.config.adx_weak_threshold => AdxStrength::Weak,
            // Below the chop threshold is chop; the band between chop and
            // weak counts as weak trend strength.
            Some(v) if v < self.config.adx_chop_threshold => AdxStrength::Chop,
            Some(_) => AdxStrength::Weak,
        }
    }

    fn momentum_state(&self, rsi: Option<f64>) -> MomentumState {
        match rsi {
            None => MomentumState::Neutral,
            Some(v) if v >= self.config.rsi_overbought => MomentumState::Overbought,
            Some(v) if v <= self.config.rsi_oversold => MomentumState::Oversold,
            Some(v) if v > 50.0 => MomentumState::Bullish,
            Some(v) if v < 50.0 => MomentumState::Bearish,
            Some(_) => MomentumState::Neutral,
        }
    }

    /// Combiner: first match wins. Chop on the ADX beats everything,
    /// including a directional EMA alignment.
    fn classify(&self, c: &RegimeComponents) -> (MarketRegime, f64) {
        if c.adx_strength == AdxStrength::Chop {
            return (MarketRegime::ChopRange, 0.7);
        }
        if c.volatility_state == VolatilityState::Extreme {
            return (MarketRegime::VolatilityExplosive, 0.75);
        }

        match (c.ema_alignment, c.adx_strength) {
            (EmaAlignment::Neutral, AdxStrength::Weak | AdxStrength::None) => {
                (MarketRegime::ChopRange, 0.6)
            }
            (EmaAlignment::Neutral, _) => (MarketRegime::Neutral, 0.5),
            (EmaAlignment::Bull, AdxStrength::Strong) => (
                MarketRegime::StrongTrendBull,
                strong_trend_confidence(EmaAlignment::Bull, c.momentum_state),
            ),
            (EmaAlignment::Bear, AdxStrength::Strong) => (
                MarketRegime::StrongTrendBear,
                strong_trend_confidence(EmaAlignment::Bear, c.momentum_state),
            ),
            (EmaAlignment::Bull, _) => (MarketRegime::WeakTrendBull, 0.65),
            (EmaAlignment::Bear, _) => (MarketRegime::WeakTrendBear, 0.65),
        }
    }
}

/// Strong-trend confidence: 0.85 base, +0.05 when momentum confirms the
/// direction, -0.10 when momentum sits at the adverse extreme (overbought on
/// a bull trend, oversold on a bear trend), capped at 0.95.
fn strong_trend_confidence(direction: EmaAlignment, momentum: MomentumState) -> f64 {
    let mut confidence: f64 = 0.85;
    match (direction, momentum) {
        (EmaAlignment::Bull, MomentumState::Bullish)
        | (EmaAlignment::Bear, MomentumState::Bearish) => confidence += 0.05,
        (EmaAlignment::Bull, MomentumState::Overbought)
        | (EmaAlignment::Bear, MomentumState::Oversold) => confidence -= 0.10,
        _ => {}
    }
    confidence.min(0.95)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RegimeDetector {
        RegimeDetector::new(RegimeConfig::default()).unwrap()
    }

    fn snapshot(
        ema20: Option<f64>,
        ema50: Option<f64>,
        adx: Option<f64>,
        atr_pct: Option<f64>,
        rsi: Option<f64>,
    ) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema20,
            ema50,
            adx,
            atr_pct,
            rsi,
        }
    }

    #[test]
    fn chop_adx_wins_over_bullish_ema() {
        // EMA says bull, but ADX 10 is below the chop threshold of 15:
        // regime must be ChopRange regardless of the EMA alignment.
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(10.0),
            Some(1.0),
            Some(55.0),
        ));
        assert_eq!(result.components.ema_alignment, EmaAlignment::Bull);
        assert_eq!(result.components.adx_strength, AdxStrength::Chop);
        assert_eq!(result.regime, MarketRegime::ChopRange);
        assert!((result.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn strong_bull_trend_with_momentum_confirmation() {
        // Bull EMA + strong ADX + bullish momentum → 0.85 + 0.05 = 0.90.
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(30.0),
            Some(1.5),
            Some(60.0),
        ));
        assert_eq!(result.regime, MarketRegime::StrongTrendBull);
        assert!((result.confidence - 0.90).abs() < 1e-12);
    }

    #[test]
    fn overbought_momentum_penalizes_bull_trend() {
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(30.0),
            Some(1.5),
            Some(80.0),
        ));
        assert_eq!(result.regime, MarketRegime::StrongTrendBull);
        assert!((result.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn oversold_momentum_penalizes_bear_trend() {
        let result = detector().detect(&snapshot(
            Some(95.0),
            Some(100.0),
            Some(30.0),
            Some(1.5),
            Some(20.0),
        ));
        assert_eq!(result.regime, MarketRegime::StrongTrendBear);
        assert!((result.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn weak_trend_without_strong_adx() {
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(22.0),
            Some(1.5),
            Some(55.0),
        ));
        assert_eq!(result.regime, MarketRegime::WeakTrendBull);
        assert!((result.confidence - 0.65).abs() < 1e-12);
    }

    #[test]
    fn neutral_ema_with_weak_adx_is_chop() {
        let result = detector().detect(&snapshot(
            Some(100.0),
            Some(100.0),
            Some(18.0),
            Some(1.0),
            Some(50.0),
        ));
        // ADX 18 sits between chop (15) and weak (20): weak band.
        assert_eq!(result.components.adx_strength, AdxStrength::Weak);
        assert_eq!(result.regime, MarketRegime::ChopRange);
        assert!((result.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn neutral_ema_with_strong_adx_is_neutral_regime() {
        let result = detector().detect(&snapshot(
            Some(100.0),
            Some(100.0),
            Some(30.0),
            Some(1.0),
            Some(50.0),
        ));
        assert_eq!(result.regime, MarketRegime::Neutral);
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn extreme_volatility_yields_explosive_regime() {
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(30.0),
            Some(6.0),
            Some(55.0),
        ));
        assert_eq!(result.components.volatility_state, VolatilityState::Extreme);
        assert_eq!(result.regime, MarketRegime::VolatilityExplosive);
    }

    #[test]
    fn missing_inputs_degrade_to_neutral_components() {
        let result = detector().detect(&IndicatorSnapshot::default());
        assert_eq!(result.components.ema_alignment, EmaAlignment::Neutral);
        assert_eq!(result.components.adx_strength, AdxStrength::None);
        assert_eq!(result.components.volatility_state, VolatilityState::Normal);
        assert_eq!(result.components.momentum_state, MomentumState::Neutral);
        // Neutral EMA + no ADX reading → chop, never a crash.
        assert_eq!(result.regime, MarketRegime::ChopRange);
    }

    #[test]
    fn momentum_component_boundaries() {
        let d = detector();
        assert_eq!(d.momentum_state(Some(75.0)), MomentumState::Overbought);
        assert_eq!(d.momentum_state(Some(25.0)), MomentumState::Oversold);
        assert_eq!(d.momentum_state(Some(55.0)), MomentumState::Bullish);
        assert_eq!(d.momentum_state(Some(45.0)), MomentumState::Bearish);
        assert_eq!(d.momentum_state(Some(50.0)), MomentumState::Neutral);
        assert_eq!(d.momentum_state(None), MomentumState::Neutral);
    }

    #[test]
    fn gate_blocks_everything_in_neutral_regime() {
        let gate = MarketRegime::Neutral.gate_info();
        assert!(!gate.allowed);
        assert!(gate.allowed_entry_types.is_empty());
        assert!(gate.reason.is_some());
    }

    #[test]
    fn gate_restricts_chop_to_structure_entries() {
        let gate = MarketRegime::ChopRange.gate_info();
        assert!(gate.allowed);
        assert!(!gate.allowed_entry_types.contains(&EntryType::Market));
        assert!(gate.allowed_entry_types.contains(&EntryType::Breakout));
        assert!(gate.allowed_entry_types.contains(&EntryType::Retest));
        assert!(gate.allowed_entry_types.contains(&EntryType::SfpReclaim));
    }

    #[test]
    fn gate_recommends_reduced_size_in_explosive_volatility() {
        let gate = MarketRegime::VolatilityExplosive.gate_info();
        assert!(gate.allowed);
        assert!(gate.allowed_entry_types.contains(&EntryType::Market));
        assert!(gate.recommendation.contains("reduce"));
    }

    #[test]
    fn inverted_thresholds_rejected_at_construction() {
        let mut config = RegimeConfig::default();
        config.adx_chop_threshold = 30.0; // above strong
        assert!(RegimeDetector::new(config).is_err());

        let mut config = RegimeConfig::default();
        config.atr_low_threshold = 10.0; // above extreme
        assert!(RegimeDetector::new(config).is_err());

        let mut config = RegimeConfig::default();
        config.rsi_oversold = 80.0; // above overbought
        assert!(RegimeDetector::new(config).is_err());
    }

    #[test]
    fn result_serializes_for_the_decision_loop() {
        let result = detector().detect(&snapshot(
            Some(105.0),
            Some(100.0),
            Some(30.0),
            Some(1.5),
            Some(60.0),
        ));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["regime"], "StrongTrendBull");
        assert!(json["confidence"].is_number());
        assert!(json["reasoning"].is_string());
    }
}
