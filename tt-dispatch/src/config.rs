//! Dispatcher configuration
//!
//! Merges the `[dispatch]` table of `config.toml` with command-line
//! overrides. Command-line values win; anything unset falls back to the
//! compiled defaults.

use crate::catalog::CatalogSource;
use crate::engine::{EngineConfig, DEFAULT_EXTEND_DELAY_MS, DEFAULT_SETTLE_DELAY_MS};
use crate::error::{Error, Result};
use crate::selection::CohesionMode;
use std::net::SocketAddr;
use tt_common::config::TomlConfig;
use tt_common::time;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:5780";

/// Default `tracing` filter when neither RUST_LOG nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "tt_dispatch=info";

/// Values given on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub catalog: Option<String>,
    pub bind: Option<String>,
    pub mode: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub extend_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub catalog: Option<CatalogSource>,
    pub bind: SocketAddr,
    pub engine: EngineConfig,
    pub log_filter: String,
}

impl DispatchConfig {
    pub fn resolve(toml: &TomlConfig, overrides: Overrides) -> Result<Self> {
        let section = &toml.dispatch;

        let catalog = overrides
            .catalog
            .or_else(|| section.catalog.clone())
            .filter(|c| !c.trim().is_empty())
            .map(|c| CatalogSource::parse(&c));

        let bind = overrides
            .bind
            .or_else(|| section.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address '{}': {}", bind, e)))?;

        let default_mode = match overrides.mode.or_else(|| section.default_mode.clone()) {
            Some(mode) => mode.parse::<CohesionMode>().map_err(Error::Config)?,
            None => CohesionMode::default(),
        };

        let settle_delay_ms = overrides
            .settle_delay_ms
            .or(section.settle_delay_ms)
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS);
        let extend_delay_ms = overrides
            .extend_delay_ms
            .or(section.extend_delay_ms)
            .unwrap_or(DEFAULT_EXTEND_DELAY_MS);

        let log_filter = toml
            .logging
            .level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            catalog,
            bind,
            engine: EngineConfig {
                settle_delay: time::millis_to_duration(settle_delay_ms),
                extend_delay: time::millis_to_duration(extend_delay_ms),
                default_mode,
            },
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::resolve(&TomlConfig::default(), Overrides::default()).unwrap();

        assert!(config.catalog.is_none());
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.engine.settle_delay, Duration::from_millis(3500));
        assert_eq!(config.engine.extend_delay, Duration::from_millis(1500));
        assert_eq!(config.engine.default_mode, CohesionMode::Medium);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_toml_values_apply() {
        let toml = TomlConfig::from_toml_str(
            r#"
            [logging]
            level = "debug"

            [dispatch]
            catalog = "https://example.org/tunes.json"
            settle_delay_ms = 0
            default_mode = "creative"
            "#,
        )
        .unwrap();

        let config = DispatchConfig::resolve(&toml, Overrides::default()).unwrap();
        assert_eq!(
            config.catalog,
            Some(CatalogSource::Url("https://example.org/tunes.json".into()))
        );
        assert!(config.engine.settle_delay.is_zero());
        assert_eq!(config.engine.default_mode, CohesionMode::Creative);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_overrides_win() {
        let toml = TomlConfig::from_toml_str(
            r#"
            [dispatch]
            catalog = "tunes.json"
            bind = "0.0.0.0:9000"
            default_mode = "creative"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            catalog: Some("other.json".into()),
            bind: Some("127.0.0.1:6000".into()),
            mode: Some("strict".into()),
            settle_delay_ms: Some(10),
            extend_delay_ms: None,
        };

        let config = DispatchConfig::resolve(&toml, overrides).unwrap();
        assert_eq!(config.catalog, Some(CatalogSource::parse("other.json")));
        assert_eq!(config.bind.port(), 6000);
        assert_eq!(config.engine.default_mode, CohesionMode::Strict);
        assert_eq!(config.engine.settle_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_bind = Overrides {
            bind: Some("not-an-address".into()),
            ..Default::default()
        };
        assert!(matches!(
            DispatchConfig::resolve(&TomlConfig::default(), bad_bind),
            Err(Error::Config(_))
        ));

        let bad_mode = Overrides {
            mode: Some("chaotic".into()),
            ..Default::default()
        };
        assert!(matches!(
            DispatchConfig::resolve(&TomlConfig::default(), bad_mode),
            Err(Error::Config(_))
        ));
    }
}
