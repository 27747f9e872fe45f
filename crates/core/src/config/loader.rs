use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, so
/// `TRAWL_CACHE__TTL_SECS` overrides `cache.ttl_secs`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TRAWL_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[auth]
method = "none"

[server]
port = 9000

[cache]
ttl_secs = 600
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.cache.max_entries_per_source, 1000);
    }

    #[test]
    fn test_health_and_aggregator_sections() {
        let toml = r#"
[auth]
method = "none"

[health]
window_secs = 3600

[aggregator]
max_concurrent_sources = 4
source_timeout_secs = 10
max_results = 250
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.health.window_secs, 3600);
        assert_eq!(config.aggregator.max_concurrent_sources, 4);
        assert_eq!(config.aggregator.source_timeout_secs, 10);
        assert_eq!(config.aggregator.max_results, 250);
    }

    #[test]
    fn test_aggregator_and_health_defaults() {
        let config = load_config_from_str("[auth]\nmethod = \"none\"\n").unwrap();
        assert_eq!(config.health.window_secs, 86_400);
        assert_eq!(config.aggregator.max_concurrent_sources, 16);
        assert_eq!(config.aggregator.source_timeout_secs, 30);
        assert_eq!(config.aggregator.max_results, 1000);
        assert_eq!(config.cache.ttl_secs, 2100);
        assert_eq!(config.cache.sweep_interval_secs, 300);
    }

    #[test]
    fn test_env_overrides_keys_with_underscores() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "trawl.toml",
                r#"
[auth]
method = "none"

[cache]
ttl_secs = 600
"#,
            )?;
            jail.set_env("TRAWL_CACHE__TTL_SECS", "60");
            jail.set_env("TRAWL_HEALTH__WINDOW_SECS", "120");
            jail.set_env("TRAWL_SERVER__PORT", "9999");

            let config = load_config(Path::new("trawl.toml")).unwrap();
            assert_eq!(config.cache.ttl_secs, 60);
            assert_eq!(config.health.window_secs, 120);
            assert_eq!(config.server.port, 9999);
            Ok(())
        });
    }

    #[test]
    fn test_load_config_from_str_missing_auth() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 3000

[[sources]]
id = "local"
name = "Local Jackett"
kind = "semi-private"

[sources.torznab]
url = "http://127.0.0.1:9118"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].id, "local");
    }
}
