use kennel_core::{KennelConfig, KennelConfigSnapshot};

pub const ENV_PREFIX: &str = "KENNEL__";

/// Built-in values, overridden by anything loaded on top.
pub fn defaults() -> KennelConfig {
    KennelConfig::new()
        .with("http.host", "127.0.0.1")
        .with("http.port", "3030")
        .with("urls.base", "https://kennel.dev")
}

/// Defaults overlaid with `KENNEL__*` environment variables.
pub fn from_env() -> KennelConfig {
    let mut config = defaults();
    let loaded = config.load_env(ENV_PREFIX);
    tracing::debug!(loaded, "configuration loaded from environment");
    config
}

pub fn listen_addr(config: &KennelConfigSnapshot) -> String {
    let host = config
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config.get_u32("http.port").unwrap_or(3030);
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_locally() {
        assert_eq!(listen_addr(&defaults().snapshot()), "127.0.0.1:3030");
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = defaults();
        config.load_vars(
            ENV_PREFIX,
            vec![("KENNEL__HTTP__PORT".to_string(), "8080".to_string())],
        );
        assert_eq!(listen_addr(&config.snapshot()), "127.0.0.1:8080");
    }
}
