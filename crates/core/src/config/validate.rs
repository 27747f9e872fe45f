use std::collections::HashSet;

use super::types::{AuthMethod, Config, SourceBackend};
use super::ConfigError;
use crate::category::CategoryMap;

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde), api_key present for api_key auth
/// - Server port is not 0
/// - Cache, health and aggregator limits are non-zero
/// - Source ids are unique and usable as a scope
/// - Each source has its backend section and a valid category table
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if matches!(config.auth.method, AuthMethod::ApiKey)
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(invalid("auth.api_key is required when auth.method = \"api_key\""));
    }

    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.cache.ttl_secs == 0 {
        return Err(invalid("cache.ttl_secs cannot be 0"));
    }
    if config.cache.max_entries_per_source == 0 {
        return Err(invalid("cache.max_entries_per_source cannot be 0"));
    }
    if config.health.window_secs == 0 {
        return Err(invalid("health.window_secs cannot be 0"));
    }
    if config.aggregator.max_concurrent_sources == 0 {
        return Err(invalid("aggregator.max_concurrent_sources cannot be 0"));
    }
    if config.aggregator.source_timeout_secs == 0 {
        return Err(invalid("aggregator.source_timeout_secs cannot be 0"));
    }
    if config.aggregator.max_results == 0 {
        return Err(invalid("aggregator.max_results cannot be 0"));
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        let id = source.id.as_str();
        if id.is_empty() {
            return Err(invalid("sources[].id cannot be empty"));
        }
        if id == "all" || id.contains(':') || id.contains('/') {
            return Err(invalid(format!(
                "source id '{}' is reserved or contains ':' or '/'",
                id
            )));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate source id '{}'", id)));
        }
        if source.timeout_secs == Some(0) {
            return Err(invalid(format!("source '{}': timeout_secs cannot be 0", id)));
        }
        if source.modes.is_empty() {
            return Err(invalid(format!(
                "source '{}': at least one search mode is required",
                id
            )));
        }

        match source.backend {
            SourceBackend::Torznab => match &source.torznab {
                Some(t) if !t.url.trim().is_empty() => {}
                _ => {
                    return Err(invalid(format!(
                        "source '{}': [sources.torznab] with a url is required",
                        id
                    )))
                }
            },
        }

        CategoryMap::new(source.categories.clone())
            .map_err(|e| invalid(format!("source '{}': {}", id, e)))?;
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    const SOURCE: &str = r#"
[[sources]]
id = "one"
name = "One"
kind = "public"

[sources.torznab]
url = "http://localhost:9117"
"#;

    fn config_with(extra: &str) -> Config {
        let toml = format!("[auth]\nmethod = \"none\"\n{}", extra);
        load_config_from_str(&toml).unwrap()
    }

    fn assert_invalid(config: &Config) {
        let result = validate_config(config);
        assert!(
            matches!(result, Err(ConfigError::ValidationError(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config_with(SOURCE)).is_ok());
        assert!(validate_config(&config_with("")).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = config_with("");
        config.server.port = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_api_key_required() {
        let config = load_config_from_str("[auth]\nmethod = \"api_key\"\n").unwrap();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_limits_fail() {
        let mut config = config_with("");
        config.cache.max_entries_per_source = 0;
        assert_invalid(&config);

        let mut config = config_with("");
        config.aggregator.max_results = 0;
        assert_invalid(&config);

        let mut config = config_with("");
        config.health.window_secs = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_duplicate_source_ids() {
        let config = config_with(&format!("{}{}", SOURCE, SOURCE));
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_reserved_source_id() {
        let mut config = config_with(SOURCE);
        config.sources[0].id = "all".to_string();
        assert_invalid(&config);

        config.sources[0].id = "tag:x".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_missing_backend_section() {
        let mut config = config_with(SOURCE);
        config.sources[0].torznab = None;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_bad_category_table() {
        let config = config_with(&format!(
            "{}\n[[sources.categories]]\nlocal = 1\nglobal = [2999]\n",
            SOURCE
        ));
        assert_invalid(&config);
    }
}
