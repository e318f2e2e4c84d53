//! Tests for the configuration module.
//!
//! Configuration is exercised through `Config::from_lookup` so no test has
//! to mutate the process environment.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::config::{Config, DEFAULT_API_BASE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use crate::error::ConfigError;

fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|name| map.get(name).cloned())
}

#[cfg(test)]
mod config_logic_tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn api_key_is_trimmed() {
        let config = config_from(&[("OPENAI_API_KEY", "  sk-test  ")]).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert_eq!(config.api_key, None);

        let err = config.require_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "OPENAI_API_KEY"));
    }

    #[test]
    fn api_base_trailing_slash_is_removed() {
        let config = config_from(&[("OPENAI_API_BASE", "http://localhost:9000/v1/")]).unwrap();
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.endpoint("videos"), "http://localhost:9000/v1/videos");
    }

    #[test]
    fn endpoint_joins_paths() {
        let config = Config::default();
        assert_eq!(config.endpoint("videos"), "https://api.openai.com/v1/videos");
        assert_eq!(
            config.endpoint("/videos/video_123/content"),
            "https://api.openai.com/v1/videos/video_123/content"
        );
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        for raw in ["abc", "0", "-5"] {
            let err = config_from(&[("OPENAI_TIMEOUT_SECS", raw)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue(ref name, _) if name == "OPENAI_TIMEOUT_SECS"),
                "timeout {:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-very-secret")]).unwrap();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("sk-very-secret"));
        assert!(debug_str.contains("<redacted>"));
        assert!(debug_str.contains("api.openai.com"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        /// Any valid port number round-trips through the PORT variable.
        #[test]
        fn config_preserves_port(port in 1u16..=u16::MAX) {
            let raw = port.to_string();
            let config = config_from(&[("PORT", raw.as_str())]).unwrap();
            prop_assert_eq!(config.port, port);
        }

        /// Any positive timeout round-trips through OPENAI_TIMEOUT_SECS.
        #[test]
        fn config_preserves_timeout(secs in 1u64..100_000u64) {
            let raw = secs.to_string();
            let config = config_from(&[("OPENAI_TIMEOUT_SECS", raw.as_str())]).unwrap();
            prop_assert_eq!(config.timeout_secs, secs);
        }

        /// Endpoints always start with the configured base.
        #[test]
        fn endpoint_starts_with_base(path in "[a-z0-9_/]{1,40}") {
            let config = Config::default();
            let endpoint = config.endpoint(&path);
            prop_assert!(endpoint.starts_with(DEFAULT_API_BASE));
            prop_assert!(!endpoint.contains("v1//"));
        }
    }
}
