//! Monitor configuration types.

use serde::{Deserialize, Serialize};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time-series query endpoint settings.
    #[serde(default)]
    pub influx: InfluxConfig,

    /// Telemetry streams to poll.
    #[serde(default = "default_streams")]
    pub streams: Vec<StreamConfig>,

    /// Rolling history capacity per stream (points).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Weather lookup settings.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Heartbeat log interval in seconds.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            influx: InfluxConfig::default(),
            streams: default_streams(),
            buffer_capacity: default_buffer_capacity(),
            weather: WeatherConfig::default(),
            heartbeat_secs: default_heartbeat(),
        }
    }
}

/// Query endpoint connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    #[serde(default = "default_influx_url")]
    pub url: String,

    /// Organization name passed with every query.
    #[serde(default = "default_org")]
    pub org: String,

    /// Bucket holding the telemetry measurements.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// API token. Empty means unauthenticated.
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            org: default_org(),
            bucket: default_bucket(),
            token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// One telemetry stream: which measurement to query and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name, e.g. "realtime".
    pub name: String,

    /// Measurement to filter on.
    pub measurement: String,

    /// Fields to select. Empty selects all fields.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Query range start, e.g. "-5m".
    #[serde(default = "default_range_start")]
    pub range_start: String,

    /// Optional server-side window aggregation.
    #[serde(default)]
    pub aggregate: Option<AggregateConfig>,

    /// Pivot field rows into one column per field on the server.
    /// When false, rows come back one-per-field and are pivoted locally.
    #[serde(default = "default_true")]
    pub server_pivot: bool,

    /// Polling interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Server-side window aggregation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Window size, e.g. "1m".
    pub every: String,
    /// Aggregate function, e.g. "mean", "max".
    pub func: String,
}

/// Weather lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Free-text location resolved via geocoding.
    #[serde(default = "default_location")]
    pub location: String,

    /// Hours of hourly forecast to fetch.
    #[serde(default = "default_forecast_hours")]
    pub forecast_hours: u32,

    /// Forecast cache TTL in seconds.
    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_secs: u64,

    /// Forecast refresh interval for the background task, in seconds.
    #[serde(default = "default_weather_refresh")]
    pub refresh_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            forecast_hours: default_forecast_hours(),
            forecast_ttl_secs: default_forecast_ttl(),
            refresh_secs: default_weather_refresh(),
        }
    }
}

fn default_streams() -> Vec<StreamConfig> {
    vec![
        StreamConfig {
            name: "realtime".into(),
            measurement: "electrical".into(),
            fields: vec![
                "v_rms".into(),
                "i_rms".into(),
                "p_active".into(),
                "frequency".into(),
            ],
            range_start: "-30s".into(),
            aggregate: None,
            server_pivot: true,
            interval_ms: 1_000,
        },
        StreamConfig {
            name: "power".into(),
            measurement: "electrical".into(),
            fields: vec![
                "p_active".into(),
                "p_reactive".into(),
                "p_apparent".into(),
                "energy_wh".into(),
            ],
            range_start: "-5m".into(),
            aggregate: Some(AggregateConfig {
                every: "5s".into(),
                func: "mean".into(),
            }),
            server_pivot: true,
            interval_ms: 5_000,
        },
        StreamConfig {
            name: "extremes".into(),
            measurement: "electrical".into(),
            fields: vec!["v_min".into(), "v_max".into(), "p_max".into()],
            range_start: "-1h".into(),
            aggregate: Some(AggregateConfig {
                every: "1m".into(),
                func: "max".into(),
            }),
            server_pivot: true,
            interval_ms: 30_000,
        },
    ]
}

fn default_influx_url() -> String {
    "http://localhost:8086".into()
}

fn default_org() -> String {
    "home".into()
}

fn default_bucket() -> String {
    "energy".into()
}

fn default_timeout() -> u64 {
    10
}

fn default_range_start() -> String {
    "-5m".into()
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_buffer_capacity() -> usize {
    500
}

fn default_heartbeat() -> u64 {
    30
}

fn default_location() -> String {
    "Berlin".into()
}

fn default_forecast_hours() -> u32 {
    24
}

fn default_forecast_ttl() -> u64 {
    3 * 3600
}

fn default_weather_refresh() -> u64 {
    600
}

fn default_true() -> bool {
    true
}
