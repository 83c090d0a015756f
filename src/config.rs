//! Configuration types for premarket-scanner

use crate::activity::{default_rules, ActivityRule, RuleId};
use crate::technical::{MacdParams, PatternTag};
use crate::telemetry::LogFormat;
use crate::window::{BackpressurePolicy, OrderingPolicy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub technical: TechnicalConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

/// Configuration errors, all fatal at startup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("universe price range is inverted: min {min} > max {max}")]
    InvertedPriceRange { min: Decimal, max: Decimal },
    #[error("{field} must be positive")]
    NonPositive { field: String },
    #[error("{field} must be greater than {min}")]
    NotAbove { field: String, min: Decimal },
    #[error("{field} must be non-zero")]
    Zero { field: String },
    #[error("technical.macd must name a preset (\"standard\" or \"short\") or fast/slow/signal periods")]
    MacdUnspecified,
    #[error("technical.macd sets both a preset and explicit periods")]
    MacdAmbiguous,
    #[error("technical.macd fast period {fast} must be below slow period {slow}")]
    MacdPeriods { fast: usize, slow: usize },
    #[error("technical.stochastic_periods must not be empty")]
    EmptyStochasticPeriods,
    #[error("activity rule {0} is configured more than once")]
    DuplicateRule(RuleId),
    #[error("{field} weights sum to {sum}, expected 1")]
    WeightsSum { field: String, sum: Decimal },
    #[error("window.capacity {capacity} is smaller than the longest lookback {required}")]
    CapacityTooSmall { capacity: usize, required: usize },
    #[error("{field} is not a duration like \"30s\", \"15m\" or \"1h\": {value}")]
    InvalidDuration { field: String, value: String },
}

/// Market feed connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Environment variable holding the feed API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Channels to subscribe to after authenticating
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<String>,
    #[serde(default = "default_feed_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_initial_reconnect_ms")]
    pub initial_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_ms")]
    pub max_reconnect_delay_ms: u64,
    /// 0 = retry forever
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

fn default_feed_url() -> String {
    "wss://socket.polygon.io/stocks".to_string()
}
fn default_api_key_env() -> String {
    "POLYGON_API_KEY".to_string()
}
fn default_subscriptions() -> Vec<String> {
    vec!["AM.*".to_string(), "Q.*".to_string(), "T.*".to_string()]
}
fn default_feed_channel_capacity() -> usize {
    10_000
}
fn default_initial_reconnect_ms() -> u64 {
    1_000
}
fn default_max_reconnect_ms() -> u64 {
    60_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            api_key_env: default_api_key_env(),
            subscriptions: default_subscriptions(),
            channel_capacity: default_feed_channel_capacity(),
            initial_reconnect_delay_ms: default_initial_reconnect_ms(),
            max_reconnect_delay_ms: default_max_reconnect_ms(),
            max_reconnect_attempts: 0,
        }
    }
}

/// Tier 1 eligibility thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UniverseConfig {
    /// Snapshot endpoint; the run command needs it, backtests do not
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default = "default_min_price")]
    pub min_price: Decimal,
    #[serde(default = "default_max_price")]
    pub max_price: Decimal,
    /// Exclusive upper bound
    #[serde(default = "default_max_float_shares")]
    pub max_float_shares: u64,
    #[serde(default = "default_min_volume")]
    pub min_volume: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_min_price() -> Decimal {
    Decimal::new(30, 2) // 0.30
}
fn default_max_price() -> Decimal {
    Decimal::new(1000, 2) // 10.00
}
fn default_max_float_shares() -> u64 {
    40_000_000
}
fn default_min_volume() -> u64 {
    50_000
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            min_price: default_min_price(),
            max_price: default_max_price(),
            max_float_shares: default_max_float_shares(),
            min_volume: default_min_volume(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Rolling window sizing and ordering
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub ordering: OrderingPolicy,
}

fn default_window_capacity() -> usize {
    64
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: default_window_capacity(),
            ordering: OrderingPolicy::default(),
        }
    }
}

/// Ingest queue sharding and backpressure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Per-shard capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub backpressure: BackpressurePolicy,
}

fn default_shards() -> usize {
    8
}
fn default_queue_capacity() -> usize {
    10_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            queue_capacity: default_queue_capacity(),
            backpressure: BackpressurePolicy::default(),
        }
    }
}

/// Tier 2 rule set
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityConfig {
    /// Default VolumeVsSMA multiplier
    #[serde(default = "default_volume_spike_threshold")]
    pub volume_spike_threshold: Decimal,
    /// Default PriceChange threshold (fraction of previous close)
    #[serde(default = "default_price_change_threshold")]
    pub price_change_threshold: Decimal,
    /// Enabled rules; omitted means every built-in rule with defaults
    #[serde(default = "default_rules")]
    pub rules: Vec<ActivityRule>,
}

fn default_volume_spike_threshold() -> Decimal {
    Decimal::from(3)
}
fn default_price_change_threshold() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            volume_spike_threshold: default_volume_spike_threshold(),
            price_change_threshold: default_price_change_threshold(),
            rules: default_rules(),
        }
    }
}

/// MACD preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdPreset {
    /// 12/26/9
    Standard,
    /// 5/13/8
    Short,
}

/// MACD periods: either a preset or all three explicit periods
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MacdConfig {
    #[serde(default)]
    pub preset: Option<MacdPreset>,
    #[serde(default)]
    pub fast: Option<usize>,
    #[serde(default)]
    pub slow: Option<usize>,
    #[serde(default)]
    pub signal: Option<usize>,
}

impl MacdConfig {
    pub fn preset(preset: MacdPreset) -> Self {
        Self {
            preset: Some(preset),
            ..Default::default()
        }
    }

    /// Resolve to concrete periods
    pub fn params(&self) -> Result<MacdParams, ConfigError> {
        let params = match (self.preset, self.fast, self.slow, self.signal) {
            (Some(MacdPreset::Standard), None, None, None) => MacdParams::standard(),
            (Some(MacdPreset::Short), None, None, None) => MacdParams::short_form(),
            (Some(_), _, _, _) => return Err(ConfigError::MacdAmbiguous),
            (None, Some(fast), Some(slow), Some(signal)) => MacdParams { fast, slow, signal },
            (None, _, _, _) => return Err(ConfigError::MacdUnspecified),
        };

        if params.fast == 0 || params.signal == 0 {
            return Err(ConfigError::Zero {
                field: "technical.macd periods".to_string(),
            });
        }
        if params.fast >= params.slow {
            return Err(ConfigError::MacdPeriods {
                fast: params.fast,
                slow: params.slow,
            });
        }
        Ok(params)
    }
}

/// Momentum score shape
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MomentumConfig {
    #[serde(default = "default_roc_period")]
    pub roc_period: usize,
    /// Rate of change that maps to a full-strength price component
    #[serde(default = "default_roc_scale")]
    pub roc_scale: Decimal,
    #[serde(default = "default_recent_volume_bars")]
    pub recent_volume_bars: usize,
    #[serde(default = "default_baseline_volume_bars")]
    pub baseline_volume_bars: usize,
    /// Recent/baseline volume ratio that maps to a full-strength volume component
    #[serde(default = "default_volume_ratio_cap")]
    pub volume_ratio_cap: Decimal,
    #[serde(default = "default_roc_weight")]
    pub roc_weight: Decimal,
    #[serde(default = "default_volume_weight")]
    pub volume_weight: Decimal,
}

fn default_roc_period() -> usize {
    5
}
fn default_roc_scale() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_recent_volume_bars() -> usize {
    3
}
fn default_baseline_volume_bars() -> usize {
    10
}
fn default_volume_ratio_cap() -> Decimal {
    Decimal::from(3)
}
fn default_roc_weight() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_volume_weight() -> Decimal {
    Decimal::new(4, 1) // 0.4
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            roc_period: default_roc_period(),
            roc_scale: default_roc_scale(),
            recent_volume_bars: default_recent_volume_bars(),
            baseline_volume_bars: default_baseline_volume_bars(),
            volume_ratio_cap: default_volume_ratio_cap(),
            roc_weight: default_roc_weight(),
            volume_weight: default_volume_weight(),
        }
    }
}

impl MomentumConfig {
    pub fn lookback(&self) -> usize {
        (self.roc_period + 1).max(self.recent_volume_bars + self.baseline_volume_bars)
    }
}

/// Tier 3 indicator set and working set bounds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechnicalConfig {
    /// Required; see `MacdConfig::params`
    #[serde(default)]
    pub macd: MacdConfig,
    #[serde(default = "default_stochastic_periods")]
    pub stochastic_periods: Vec<usize>,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternTag>,
    /// Bars forming the opening range of a session
    #[serde(default = "default_opening_range_bars")]
    pub opening_range_bars: usize,
    #[serde(default = "default_alert_ttl_secs")]
    pub alert_ttl_secs: u64,
    #[serde(default = "default_max_active_symbols")]
    pub max_active_symbols: usize,
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
}

fn default_stochastic_periods() -> Vec<usize> {
    vec![9, 14, 40]
}
fn default_rsi_period() -> usize {
    14
}
fn default_patterns() -> Vec<PatternTag> {
    vec![
        PatternTag::HigherLows,
        PatternTag::OpeningRangeBreakout,
        PatternTag::NewSessionHigh,
    ]
}
fn default_opening_range_bars() -> usize {
    5
}
fn default_alert_ttl_secs() -> u64 {
    300
}
fn default_max_active_symbols() -> usize {
    50
}
fn default_worker_concurrency() -> usize {
    8
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            macd: MacdConfig::default(),
            stochastic_periods: default_stochastic_periods(),
            rsi_period: default_rsi_period(),
            momentum: MomentumConfig::default(),
            patterns: default_patterns(),
            opening_range_bars: default_opening_range_bars(),
            alert_ttl_secs: default_alert_ttl_secs(),
            max_active_symbols: default_max_active_symbols(),
            worker_concurrency: default_worker_concurrency(),
        }
    }
}

impl TechnicalConfig {
    /// Bars needed before every configured indicator is ready
    pub fn max_lookback(&self) -> Result<usize, ConfigError> {
        let macd = self.macd.params()?.lookback();
        let stochastic = self
            .stochastic_periods
            .iter()
            .map(|p| p + 2)
            .max()
            .ok_or(ConfigError::EmptyStochasticPeriods)?;
        let rsi = self.rsi_period + 1;
        Ok(macd.max(stochastic).max(rsi).max(self.momentum.lookback()))
    }
}

/// Optional confirmation required before an Exit is emitted
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitConfirmationConfig {
    #[default]
    None,
    /// Trade volume over the last `lookback_secs` must reach `min_volume`
    Volume { min_volume: u64, lookback_secs: u64 },
    /// Latest quote's ask size / bid size must reach `min_ratio`
    QuoteImbalance { min_ratio: Decimal },
}

/// Tier 4 scoring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    /// Minimum confidence for a signal to be published
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: Decimal,
    #[serde(default = "default_overbought")]
    pub overbought: Decimal,
    #[serde(default = "default_agreement_weight")]
    pub agreement_weight: Decimal,
    #[serde(default = "default_momentum_weight")]
    pub momentum_weight: Decimal,
    #[serde(default)]
    pub exit_confirmation: ExitConfirmationConfig,
}

fn default_confidence_threshold() -> Decimal {
    Decimal::new(6, 1) // 0.6
}
fn default_overbought() -> Decimal {
    Decimal::from(80)
}
fn default_agreement_weight() -> Decimal {
    Decimal::new(6, 1)
}
fn default_momentum_weight() -> Decimal {
    Decimal::new(4, 1)
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            overbought: default_overbought(),
            agreement_weight: default_agreement_weight(),
            momentum_weight: default_momentum_weight(),
            exit_confirmation: ExitConfirmationConfig::None,
        }
    }
}

/// Tier schedules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_universe_interval")]
    pub universe_interval_secs: u64,
    #[serde(default = "default_activity_interval")]
    pub activity_interval_secs: u64,
    #[serde(default = "default_technical_interval")]
    pub technical_interval_secs: u64,
    #[serde(default = "default_signal_channel_capacity")]
    pub signal_channel_capacity: usize,
}

fn default_universe_interval() -> u64 {
    600
}
fn default_activity_interval() -> u64 {
    60
}
fn default_technical_interval() -> u64 {
    15
}
fn default_signal_channel_capacity() -> usize {
    1024
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            universe_interval_secs: default_universe_interval(),
            activity_interval_secs: default_activity_interval(),
            technical_interval_secs: default_technical_interval(),
            signal_channel_capacity: default_signal_channel_capacity(),
        }
    }
}

/// Time-series batching, retries and dead-lettering
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_dead_letter_dir")]
    pub dead_letter_dir: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_batch_size() -> usize {
    100
}
fn default_batch_interval_ms() -> u64 {
    1_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_dead_letter_dir() -> PathBuf {
    PathBuf::from("./dead_letter")
}
fn default_cache_ttl_secs() -> u64 {
    900
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            dead_letter_dir: default_dead_letter_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Bar capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File rotation interval, e.g. "1h", "30m"
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval: String,
    #[serde(default = "default_flush_batch")]
    pub flush_batch_size: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_rotation_interval() -> String {
    "1h".to_string()
}
fn default_flush_batch() -> usize {
    1_000
}
fn default_flush_interval_secs() -> u64 {
    5
}

impl DataConfig {
    /// `rotation_interval` in seconds; accepts a bare number or an `s`/`m`/`h`/`d` suffix
    pub fn rotation_interval_secs(&self) -> Result<u64, ConfigError> {
        let invalid = || ConfigError::InvalidDuration {
            field: "data.rotation_interval".to_string(),
            value: self.rotation_interval.clone(),
        };
        let text = self.rotation_interval.trim();
        let (digits, unit) = match text.char_indices().last() {
            Some((i, c)) if c.is_ascii_alphabetic() => (&text[..i], c),
            _ => (text, 's'),
        };
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let secs = match unit {
            's' => value,
            'm' => value * 60,
            'h' => value * 3_600,
            'd' => value * 86_400,
            _ => return Err(invalid()),
        };
        if secs == 0 {
            return Err(invalid());
        }
        Ok(secs)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            rotation_interval: default_rotation_interval(),
            flush_batch_size: default_flush_batch(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

/// Backtest position sizing and costs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BacktestConfig {
    /// Shares per simulated trade
    #[serde(default = "default_position_size")]
    pub position_size: Decimal,
    /// Commission per share, charged on entry and on exit
    #[serde(default = "default_fee_per_share")]
    pub fee_per_share: Decimal,
}

fn default_position_size() -> Decimal {
    Decimal::from(100)
}
fn default_fee_per_share() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            position_size: default_position_size(),
            fee_per_share: default_fee_per_share(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject conflicting or missing thresholds before anything is scheduled
    pub fn validate(&self) -> Result<(), ConfigError> {
        let u = &self.universe;
        if u.min_price > u.max_price {
            return Err(ConfigError::InvertedPriceRange {
                min: u.min_price,
                max: u.max_price,
            });
        }
        positive("universe.max_price", u.max_price)?;
        non_zero("universe.max_float_shares", u.max_float_shares)?;

        non_zero("window.capacity", self.window.capacity as u64)?;
        non_zero("ingest.shards", self.ingest.shards as u64)?;
        non_zero("ingest.queue_capacity", self.ingest.queue_capacity as u64)?;

        positive("activity.volume_spike_threshold", self.activity.volume_spike_threshold)?;
        positive("activity.price_change_threshold", self.activity.price_change_threshold)?;
        let mut seen = HashSet::new();
        for rule in &self.activity.rules {
            if !seen.insert(rule.id()) {
                return Err(ConfigError::DuplicateRule(rule.id()));
            }
            rule.validate()?;
        }

        let t = &self.technical;
        t.macd.params()?;
        if t.stochastic_periods.is_empty() {
            return Err(ConfigError::EmptyStochasticPeriods);
        }
        if t.stochastic_periods.contains(&0) {
            return Err(ConfigError::Zero {
                field: "technical.stochastic_periods".to_string(),
            });
        }
        non_zero("technical.rsi_period", t.rsi_period as u64)?;
        non_zero("technical.momentum.roc_period", t.momentum.roc_period as u64)?;
        non_zero("technical.momentum.recent_volume_bars", t.momentum.recent_volume_bars as u64)?;
        non_zero("technical.momentum.baseline_volume_bars", t.momentum.baseline_volume_bars as u64)?;
        positive("technical.momentum.roc_scale", t.momentum.roc_scale)?;
        if t.momentum.volume_ratio_cap <= Decimal::ONE {
            return Err(ConfigError::NotAbove {
                field: "technical.momentum.volume_ratio_cap".to_string(),
                min: Decimal::ONE,
            });
        }
        weights_sum(
            "technical.momentum",
            t.momentum.roc_weight,
            t.momentum.volume_weight,
        )?;
        non_zero("technical.opening_range_bars", t.opening_range_bars as u64)?;
        non_zero("technical.max_active_symbols", t.max_active_symbols as u64)?;
        non_zero("technical.worker_concurrency", t.worker_concurrency as u64)?;

        let s = &self.signal;
        weights_sum("signal", s.agreement_weight, s.momentum_weight)?;
        positive("signal.overbought", s.overbought)?;
        if let ExitConfirmationConfig::QuoteImbalance { min_ratio } = s.exit_confirmation {
            positive("signal.exit_confirmation.min_ratio", min_ratio)?;
        }

        let p = &self.pipeline;
        non_zero("pipeline.universe_interval_secs", p.universe_interval_secs)?;
        non_zero("pipeline.activity_interval_secs", p.activity_interval_secs)?;
        non_zero("pipeline.technical_interval_secs", p.technical_interval_secs)?;
        non_zero("pipeline.signal_channel_capacity", p.signal_channel_capacity as u64)?;

        let st = &self.storage;
        non_zero("storage.batch_size", st.batch_size as u64)?;
        non_zero("storage.batch_interval_ms", st.batch_interval_ms)?;
        non_zero("storage.max_attempts", st.max_attempts as u64)?;

        self.data.rotation_interval_secs()?;
        non_zero("data.flush_batch_size", self.data.flush_batch_size as u64)?;

        positive("backtest.position_size", self.backtest.position_size)?;

        let required = t
            .max_lookback()?
            .max(self.activity.rules.iter().map(|r| r.lookback()).max().unwrap_or(0));
        if self.window.capacity < required {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.window.capacity,
                required,
            });
        }

        Ok(())
    }
}

pub(crate) fn positive(field: &str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::NonPositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn non_zero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn weights_sum(field: &str, a: Decimal, b: Decimal) -> Result<(), ConfigError> {
    if a < Decimal::ZERO || b < Decimal::ZERO || a + b != Decimal::ONE {
        return Err(ConfigError::WeightsSum {
            field: field.to_string(),
            sum: a + b,
        });
    }
    Ok(())
}
