use serde::Deserialize;
use std::path::Path;

/// The full parameter record for one backtest run, parsed from TOML.
///
/// Every knob is enumerated here with an explicit default; unknown keys
/// are rejected at parse time rather than silently ignored. Percent
/// fields are whole percentages (`swing_deviation_pct = 0.2` means
/// 0.2%); `retracement_level`, `retracement_tolerance`, and the other
/// `_frac` fields are fractions of a swing range.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    // Swing detection
    pub swing_depth: usize,
    pub swing_deviation_pct: f64,

    // Retracement entry
    pub retracement_level: f64,
    pub retracement_tolerance: f64,
    pub use_atr_tolerance: bool,
    pub atr_period: usize,
    pub atr_tolerance_mult: f64,
    pub enter_at_retracement: bool,

    // Trade construction
    pub min_signal_gap: usize,
    pub risk_reward_ratio: f64,
    pub stop_buffer_frac: f64,
    pub use_atr_take_profit: bool,
    pub atr_take_profit_mult: f64,
    pub enable_shorts: bool,

    // Trend filter
    pub use_trend_filter: bool,
    pub ema_period: usize,
    pub max_ema_distance_pct: f64,

    // Momentum filter
    pub use_momentum_filter: bool,
    pub momentum_bars: usize,
    pub min_momentum_pct: f64,

    // Volume filter
    pub use_volume_filter: bool,
    pub volume_period: usize,
    pub volume_ratio: f64,

    // RSI filter
    pub use_rsi_filter: bool,
    pub rsi_period: usize,
    pub rsi_threshold: f64,

    // Candle filter
    pub use_candle_filter: bool,
    pub min_body_ratio: f64,

    // Price-position filter
    pub use_position_filter: bool,
    pub position_lookback: usize,
    pub min_price_position: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            swing_depth: 3,
            swing_deviation_pct: 0.2,
            retracement_level: 0.786,
            retracement_tolerance: 0.10,
            use_atr_tolerance: false,
            atr_period: 14,
            atr_tolerance_mult: 0.5,
            enter_at_retracement: false,
            min_signal_gap: 5,
            risk_reward_ratio: 1.0,
            stop_buffer_frac: 0.02,
            use_atr_take_profit: false,
            atr_take_profit_mult: 2.0,
            enable_shorts: false,
            use_trend_filter: true,
            ema_period: 200,
            max_ema_distance_pct: 0.0,
            use_momentum_filter: false,
            momentum_bars: 3,
            min_momentum_pct: 0.0,
            use_volume_filter: true,
            volume_period: 20,
            volume_ratio: 0.8,
            use_rsi_filter: true,
            rsi_period: 14,
            rsi_threshold: 50.0,
            use_candle_filter: true,
            min_body_ratio: 0.3,
            use_position_filter: false,
            position_lookback: 20,
            min_price_position: 0.35,
        }
    }
}

impl StrategyParams {
    /// Load parameters from a TOML file path.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse parameters from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Load and merge multiple TOML files (later files override earlier).
    pub fn from_toml_files(paths: &[&Path]) -> Result<Self, ConfigError> {
        if paths.is_empty() {
            return Err(ConfigError::Parse("no config files provided".into()));
        }

        let content =
            std::fs::read_to_string(paths[0]).map_err(|e| ConfigError::Io(e.to_string()))?;
        let mut base: toml::Value =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        for path in &paths[1..] {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let overlay: toml::Value =
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            merge_toml(&mut base, overlay);
        }

        let merged = toml::to_string(&base).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_toml_str(&merged)
    }

    /// Reject values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn bad(msg: String) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg))
        }

        if self.swing_depth == 0 {
            return bad("swing_depth must be at least 1".into());
        }
        if self.swing_deviation_pct < 0.0 {
            return bad("swing_deviation_pct must be non-negative".into());
        }
        if !(self.retracement_level > 0.0 && self.retracement_level < 1.0) {
            return bad(format!(
                "retracement_level must be in (0, 1), got {}",
                self.retracement_level
            ));
        }
        if self.retracement_tolerance < 0.0 {
            return bad("retracement_tolerance must be non-negative".into());
        }
        if self.risk_reward_ratio <= 0.0 {
            return bad("risk_reward_ratio must be positive".into());
        }
        for (name, period) in [
            ("atr_period", self.atr_period),
            ("ema_period", self.ema_period),
            ("momentum_bars", self.momentum_bars),
            ("volume_period", self.volume_period),
            ("rsi_period", self.rsi_period),
            ("position_lookback", self.position_lookback),
        ] {
            if period == 0 {
                return bad(format!("{name} must be at least 1"));
            }
        }
        Ok(())
    }
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    if let (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) = (base, overlay) {
        for (key, value) in overlay_table {
            if let Some(base_value) = base_table.get_mut(&key) {
                if base_value.is_table() && value.is_table() {
                    merge_toml(base_value, value);
                    continue;
                }
            }
            base_table.insert(key, value);
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let params = StrategyParams::from_toml_str("").unwrap();
        assert_eq!(params.swing_depth, 3);
        assert!((params.retracement_level - 0.786).abs() < 1e-12);
        assert!(params.use_trend_filter);
        assert!(!params.enable_shorts);
    }

    #[test]
    fn test_overrides_apply() {
        let params = StrategyParams::from_toml_str(
            r#"
swing_depth = 10
swing_deviation_pct = 2.0
risk_reward_ratio = 2.0
use_rsi_filter = false
"#,
        )
        .unwrap();
        assert_eq!(params.swing_depth, 10);
        assert!((params.swing_deviation_pct - 2.0).abs() < 1e-12);
        assert!(!params.use_rsi_filter);
        // Untouched knobs keep their defaults.
        assert_eq!(params.min_signal_gap, 5);
    }

    #[test]
    fn test_from_toml_files_later_overrides_earlier() {
        let dir = std::env::temp_dir().join("ewict_config_merge_test");
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("base.toml");
        let overlay = dir.join("override.toml");
        std::fs::write(&base, "swing_depth = 4\nrisk_reward_ratio = 2.0\n").unwrap();
        std::fs::write(&overlay, "risk_reward_ratio = 3.0\nenable_shorts = true\n").unwrap();

        let params = StrategyParams::from_toml_files(&[base.as_path(), overlay.as_path()]).unwrap();
        // Base keys not present in the overlay survive.
        assert_eq!(params.swing_depth, 4);
        // The overlay wins where both files set a key.
        assert!((params.risk_reward_ratio - 3.0).abs() < 1e-12);
        // Overlay-only keys apply.
        assert!(params.enable_shorts);
        // Keys in neither file keep their defaults.
        assert_eq!(params.min_signal_gap, 5);

        std::fs::remove_file(&base).ok();
        std::fs::remove_file(&overlay).ok();
    }

    #[test]
    fn test_from_toml_files_rejects_empty_list() {
        let err = StrategyParams::from_toml_files(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = StrategyParams::from_toml_str("zz_dpeth = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn test_out_of_range_level_is_rejected() {
        let err = StrategyParams::from_toml_str("retracement_level = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let err = StrategyParams::from_toml_str("swing_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }
}
