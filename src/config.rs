use lazy_static::lazy_static;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use crate::av::BackendKind;
use crate::error::Result;
use crate::format::transport::Endpoint;
use crate::tracker::HeaderMode;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::load());
}

const CONFIG_PATHS: [&str; 2] = ["./config.toml", "./nalrelay.toml"];

const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5555";

const ENV_KEYS: [(&str, &str); 5] = [
    ("NALRELAY_BACKEND", "backend"),
    ("NALRELAY_PUSH_ENDPOINT", "push_endpoint"),
    ("NALRELAY_PULL_ENDPOINT", "pull_endpoint"),
    ("NALRELAY_HEADER_MODE", "header_mode"),
    ("NALRELAY_RECV_TIMEOUT_MS", "recv_timeout_ms"),
];

/// Relay settings: which backend to use, where to push and pull, and how
/// headers are gathered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: BackendKind,
    pub push_endpoint: String,
    pub pull_endpoint: String,
    pub header_mode: HeaderMode,
    pub recv_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::ZeroMq,
            push_endpoint: DEFAULT_ENDPOINT.to_string(),
            pull_endpoint: DEFAULT_ENDPOINT.to_string(),
            header_mode: HeaderMode::Set,
            recv_timeout_ms: None,
        }
    }
}

impl Config {
    /// Defaults, overridden by the first config file found, overridden by
    /// environment variables. Invalid values are logged and ignored.
    pub fn load() -> Self {
        let mut config = Config::default();

        for path in &CONFIG_PATHS {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    if let Err(e) = config.parse_file_contents(&content) {
                        log::warn!("ignoring {}: {}", path, e);
                    }
                    break;
                }
            }
        }

        if let Err(e) = config.apply_env(|key| env::var(key).ok()) {
            log::warn!("ignoring environment override: {}", e);
        }

        config
    }

    /// Applies `key = "value"` lines. Comments and unknown keys are skipped.
    ///
    /// Either every line is applied or, on the first invalid one, none is.
    pub fn parse_file_contents(&mut self, content: &str) -> Result<()> {
        let mut updated = self.clone();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if !value.is_empty() {
                    updated.set(key.trim(), value)?;
                }
            }
        }
        *self = updated;
        Ok(())
    }

    /// Applies `NALRELAY_*` overrides read through `lookup`, all or nothing.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut updated = self.clone();
        for (var, key) in ENV_KEYS {
            if let Some(value) = lookup(var) {
                updated.set(key, &value)?;
            }
        }
        *self = updated;
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backend" => self.backend = value.parse()?,
            "push_endpoint" => self.push_endpoint = Endpoint::parse(value)?.as_str().to_string(),
            "pull_endpoint" => self.pull_endpoint = Endpoint::parse(value)?.as_str().to_string(),
            "header_mode" => self.header_mode = value.parse()?,
            "recv_timeout_ms" => self.recv_timeout_ms = Some(value.trim().parse()?),
            _ => log::debug!("unknown config key '{}'", key),
        }
        Ok(())
    }

    pub fn push_endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.push_endpoint)
    }

    pub fn pull_endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.pull_endpoint)
    }

    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms.map(Duration::from_millis)
    }

    pub fn reload() {
        let new_config = Config::load();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}

/// Returns a copy of the process-wide configuration, loading it on first use
pub fn get() -> Config {
    match CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        std::fs::write(path, TEMPLATE)?;
    }
    Ok(())
}

pub(crate) const TEMPLATE: &str = include_str!("config.template.toml");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::ZeroMq);
        assert_eq!(config.header_mode, HeaderMode::Set);
        assert_eq!(config.recv_timeout(), None);
        assert_eq!(config.push_endpoint().unwrap().as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_template_parses() {
        let mut config = Config::default();
        config.parse_file_contents(TEMPLATE).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_create_template_once() {
        let path = std::env::temp_dir().join(format!("nalrelay-template-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        create_default_config_template(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TEMPLATE);

        std::fs::write(&path, "backend = \"nanomsg\"\n").unwrap();
        create_default_config_template(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "backend = \"nanomsg\"\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_contents() {
        let mut config = Config::default();
        config
            .parse_file_contents(
                r#"
                # relay settings
                backend = "nanomsg"
                pull_endpoint = 'ipc:///tmp/frames.sock'
                header_mode = sequential
                recv_timeout_ms = "250"
                colour = "blue"
                "#,
            )
            .unwrap();
        assert_eq!(config.backend, BackendKind::Nanomsg);
        assert_eq!(config.pull_endpoint, "ipc:///tmp/frames.sock");
        assert_eq!(config.push_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.header_mode, HeaderMode::Sequential);
        assert_eq!(config.recv_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NALRELAY_BACKEND", "zmq"),
            ("NALRELAY_PUSH_ENDPOINT", "tcp://10.0.0.2:6000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.backend = BackendKind::Nanomsg;
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend, BackendKind::ZeroMq);
        assert_eq!(config.push_endpoint, "tcp://10.0.0.2:6000");
    }

    #[test]
    fn test_template_lists_every_key() {
        for (_, key) in ENV_KEYS {
            assert!(TEMPLATE.contains(key), "template is missing {}", key);
        }
    }

    #[test]
    fn test_invalid_file_applies_nothing() {
        let mut config = Config::default();
        let err = config
            .parse_file_contents("backend = \"nanomsg\"\nheader_mode = \"sometimes\"\n")
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
        assert_eq!(config, Config::default());

        let env: HashMap<&str, &str> = [
            ("NALRELAY_BACKEND", "nng"),
            ("NALRELAY_RECV_TIMEOUT_MS", "-1"),
        ]
        .into_iter()
        .collect();
        assert!(config.apply_env(|key| env.get(key).map(|v| v.to_string())).is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.parse_file_contents("backend = \"carrier-pigeon\""),
            Err(RelayError::Config(_))
        ));
        assert!(matches!(
            config.parse_file_contents("push_endpoint = \"http://example.com\""),
            Err(RelayError::Config(_))
        ));
        assert!(matches!(
            config.parse_file_contents("recv_timeout_ms = \"soon\""),
            Err(RelayError::ParseInt(_))
        ));
    }
}
