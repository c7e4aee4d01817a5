//! Configuration loader — merges env vars, .env file, and config.toml.

use std::path::Path;

use common::config::MonitorConfig;
use common::Error;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &MonitorConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.influx.url.trim().is_empty() {
        issues.push("influx.url must not be empty".into());
    }
    if config.influx.org.trim().is_empty() {
        issues.push("influx.org must not be empty".into());
    }
    if config.influx.bucket.trim().is_empty() {
        issues.push("influx.bucket must not be empty".into());
    }
    if config.influx.timeout_secs == 0 {
        issues.push("influx.timeout_secs must be > 0".into());
    }

    if config.streams.is_empty() {
        issues.push("streams must contain at least one stream".into());
    }
    for stream in &config.streams {
        if stream.name.trim().is_empty() {
            issues.push("every stream needs a name".into());
        }
        if stream.measurement.trim().is_empty() {
            issues.push(format!("stream {}: measurement must not be empty", stream.name));
        }
        if stream.interval_ms == 0 {
            issues.push(format!("stream {}: interval_ms must be > 0", stream.name));
        }
    }

    if config.buffer_capacity == 0 {
        issues.push("buffer_capacity must be > 0".into());
    }
    if config.heartbeat_secs == 0 {
        issues.push("heartbeat_secs must be > 0".into());
    }

    if config.weather.location.trim().is_empty() {
        issues.push("weather.location must not be empty".into());
    }
    if config.weather.forecast_hours == 0 {
        issues.push("weather.forecast_hours must be > 0".into());
    }
    if config.weather.forecast_ttl_secs == 0 {
        issues.push("weather.forecast_ttl_secs must be > 0".into());
    }
    if config.weather.refresh_secs == 0 {
        issues.push("weather.refresh_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load monitor configuration from environment and optional config file.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = MonitorConfig::default();

    // 3. Try loading the config file if it exists.
    let config_path = path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(url) = std::env::var("INFLUX_URL") {
        config.influx.url = url;
    }
    if let Ok(org) = std::env::var("INFLUX_ORG") {
        config.influx.org = org;
    }
    if let Ok(bucket) = std::env::var("INFLUX_BUCKET") {
        config.influx.bucket = bucket;
    }
    if let Ok(token) = std::env::var("INFLUX_TOKEN") {
        config.influx.token = token;
    }
    if let Ok(raw) = std::env::var("INFLUX_TIMEOUT_SECS") {
        config.influx.timeout_secs = parse_positive_u64(&raw, "INFLUX_TIMEOUT_SECS")?;
    }
    if let Ok(location) = std::env::var("WEATHER_LOCATION") {
        config.weather.location = location;
    }
    if let Ok(raw) = std::env::var("WEATHER_FORECAST_TTL_SECS") {
        config.weather.forecast_ttl_secs = parse_positive_u64(&raw, "WEATHER_FORECAST_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("BUFFER_CAPACITY") {
        config.buffer_capacity = parse_positive_u64(&raw, "BUFFER_CAPACITY")? as usize;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.streams.len(), 3);
    }

    #[test]
    fn test_empty_streams_rejected() {
        let mut config = MonitorConfig::default();
        config.streams.clear();
        let err = validate_config(&config).expect_err("should be invalid");
        assert!(err.to_string().contains("at least one stream"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = MonitorConfig::default();
        config.streams[0].interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_all_issues_reported_together() {
        let mut config = MonitorConfig::default();
        config.influx.bucket = String::new();
        config.buffer_capacity = 0;
        let err = validate_config(&config).expect_err("should be invalid");
        let message = err.to_string();
        assert!(message.contains("bucket"));
        assert!(message.contains("buffer_capacity"));
    }

    #[test]
    fn test_parse_positive_u64() {
        assert_eq!(parse_positive_u64("30", "X").unwrap(), 30);
        assert!(parse_positive_u64("0", "X").is_err());
        assert!(parse_positive_u64("abc", "X").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let raw = r#"
            buffer_capacity = 200

            [influx]
            url = "http://influx:8086"
            bucket = "telemetry"

            [[streams]]
            name = "realtime"
            measurement = "electrical"
            fields = ["v_rms", "p_active"]
            interval_ms = 1000
        "#;
        let config: MonitorConfig = toml::from_str(raw).expect("should parse");
        assert_eq!(config.buffer_capacity, 200);
        assert_eq!(config.influx.bucket, "telemetry");
        assert_eq!(config.streams.len(), 1);
        assert_eq!(config.streams[0].interval_ms, 1000);
        assert!(config.streams[0].server_pivot);
        assert!(validate_config(&config).is_ok());
    }
}
