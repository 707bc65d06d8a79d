use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/collect";
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Client-side routing scheme the host application uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    #[default]
    History,
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Buffer events and flush when the batch-size threshold or the interval
    /// timer fires.
    #[default]
    Batch,
    /// No threshold-triggered flushes; events leave on the interval timer and
    /// on page-leave finalization.
    Single,
}

/// The loosely-typed init surface. `app_id` and `is_spa` are required;
/// everything else falls back to a documented default in
/// [`AgentConfig::resolve`].
///
/// Deserializable so a JSON options object can be validated with descriptive
/// errors — a missing `app_id` or a string where `is_spa` expects a boolean
/// fails here, before any agent state exists. The aliases accept the
/// camelCase key spelling existing embedder options objects use
/// (`appId`, `isSPA`, `uploadType`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitOptions {
    #[serde(alias = "appId")]
    pub app_id: String,
    #[serde(alias = "isSPA")]
    pub is_spa: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default, alias = "routerMode")]
    pub router_mode: Option<RouterMode>,
    #[serde(default, alias = "uploadType", alias = "deliveryMode")]
    pub delivery_mode: Option<DeliveryMode>,
    #[serde(default, alias = "batchSize")]
    pub batch_size: Option<usize>,
    #[serde(default, alias = "uploadInterval", alias = "flushIntervalMs")]
    pub flush_interval_ms: Option<u64>,
    #[serde(default, alias = "autoTrackRouter")]
    pub auto_track_router: Option<bool>,
}

impl InitOptions {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Resolved configuration, immutable after init.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub app_id: String,
    pub endpoint: Url,
    pub debug: bool,
    pub is_spa: bool,
    pub router_mode: RouterMode,
    pub delivery_mode: DeliveryMode,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub auto_track_router: bool,
}

impl AgentConfig {
    /// Validate `options` and fill in defaults. Fails without leaving any
    /// partial state behind — identity resolution happens only after this
    /// returns `Ok`.
    pub fn resolve(options: InitOptions) -> Result<Self, ConfigError> {
        if options.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }
        let endpoint = Url::parse(options.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;
        let batch_size = options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        let flush_interval_ms = options
            .flush_interval_ms
            .unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
        // A zero period would poison the interval timer downstream, leaving
        // buffered events with no time-based bound on staleness.
        if flush_interval_ms == 0 {
            return Err(ConfigError::InvalidFlushInterval);
        }
        Ok(Self {
            app_id: options.app_id,
            endpoint,
            debug: options.debug.unwrap_or(false),
            is_spa: options.is_spa,
            router_mode: options.router_mode.unwrap_or_default(),
            delivery_mode: options.delivery_mode.unwrap_or_default(),
            batch_size,
            flush_interval_ms,
            auto_track_router: options.auto_track_router.unwrap_or(true),
        })
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_applied_for_optional_fields() {
        let config = AgentConfig::resolve(InitOptions {
            app_id: "a1".to_string(),
            is_spa: true,
            ..Default::default()
        })
        .expect("resolve");
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert!(!config.debug);
        assert_eq!(config.router_mode, RouterMode::History);
        assert_eq!(config.delivery_mode, DeliveryMode::Batch);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.flush_interval_ms, DEFAULT_FLUSH_INTERVAL_MS);
        assert!(config.auto_track_router);
    }

    #[test]
    fn missing_app_id_fails_deserialization() {
        let err = InitOptions::from_value(json!({ "is_spa": true }))
            .err()
            .expect("missing app_id must fail");
        assert!(err.to_string().contains("app_id"), "got: {err}");
    }

    #[test]
    fn empty_app_id_rejected() {
        let err = AgentConfig::resolve(InitOptions {
            app_id: "  ".to_string(),
            is_spa: false,
            ..Default::default()
        })
        .err()
        .expect("blank app_id must fail");
        assert!(matches!(err, ConfigError::MissingAppId));
    }

    #[test]
    fn mistyped_is_spa_is_a_config_error_not_a_coercion() {
        let err = InitOptions::from_value(json!({ "app_id": "x", "is_spa": "true" }))
            .err()
            .expect("string is_spa must fail");
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let err = AgentConfig::resolve(InitOptions {
            app_id: "a1".to_string(),
            is_spa: true,
            batch_size: Some(0),
            ..Default::default()
        })
        .err()
        .expect("zero batch_size must fail");
        assert!(matches!(err, ConfigError::InvalidBatchSize));
    }

    #[test]
    fn zero_flush_interval_rejected() {
        // A zero interval would panic the timer task and silently disable
        // time-based flushing; it must fail init instead.
        let err = AgentConfig::resolve(InitOptions {
            app_id: "a1".to_string(),
            is_spa: true,
            flush_interval_ms: Some(0),
            ..Default::default()
        })
        .err()
        .expect("zero flush interval must fail");
        assert!(matches!(err, ConfigError::InvalidFlushInterval));
    }

    #[test]
    fn unparseable_endpoint_rejected() {
        let err = AgentConfig::resolve(InitOptions {
            app_id: "a1".to_string(),
            is_spa: true,
            endpoint: Some("not a url".to_string()),
            ..Default::default()
        })
        .err()
        .expect("bad endpoint must fail");
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn options_parse_from_full_json_object() {
        let options = InitOptions::from_value(json!({
            "app_id": "a1",
            "is_spa": true,
            "endpoint": "https://collect.example/ingest",
            "debug": true,
            "router_mode": "hash",
            "delivery_mode": "single",
            "batch_size": 5,
            "flush_interval_ms": 1000,
            "auto_track_router": false
        }))
        .expect("parse options");
        let config = AgentConfig::resolve(options).expect("resolve");
        assert_eq!(config.endpoint.as_str(), "https://collect.example/ingest");
        assert_eq!(config.router_mode, RouterMode::Hash);
        assert_eq!(config.delivery_mode, DeliveryMode::Single);
        assert_eq!(config.batch_size, 5);
        assert!(!config.auto_track_router);
    }

    #[test]
    fn options_parse_from_camel_case_json_object() {
        let options = InitOptions::from_value(json!({
            "appId": "a1",
            "isSPA": true,
            "routerMode": "hash",
            "uploadType": "single",
            "batchSize": 7,
            "uploadInterval": 2000,
            "autoTrackRouter": false
        }))
        .expect("parse camelCase options");
        let config = AgentConfig::resolve(options).expect("resolve");
        assert_eq!(config.app_id, "a1");
        assert!(config.is_spa);
        assert_eq!(config.router_mode, RouterMode::Hash);
        assert_eq!(config.delivery_mode, DeliveryMode::Single);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.flush_interval_ms, 2_000);
        assert!(!config.auto_track_router);
    }
}
