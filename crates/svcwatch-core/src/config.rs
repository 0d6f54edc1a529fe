//! svcwatch.toml configuration parser.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::ServiceKind;

/// Probe timeout used when `[probe].timeout` is not set.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvcwatchConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    pub api: Option<ApiConfig>,
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub timeout: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub listen: SocketAddr,
}

/// One `[[service]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub endpoint: String,
    /// Check interval (e.g. "30s", "500ms", "2m").
    pub interval: String,
    pub kind: ServiceKind,
}

impl ServiceSpec {
    pub fn interval(&self) -> ConfigResult<Duration> {
        let field = format!("service {} interval", self.name);
        let interval = parse_duration(&self.interval).ok_or_else(|| ConfigError::InvalidDuration {
            field: field.clone(),
            value: self.interval.clone(),
        })?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroDuration(field));
        }
        Ok(interval)
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> ConfigResult<Duration> {
        let Some(raw) = &self.timeout else {
            return Ok(DEFAULT_PROBE_TIMEOUT);
        };
        let timeout = parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
            field: "probe timeout".to_string(),
            value: raw.clone(),
        })?;
        if timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("probe timeout".to_string()));
        }
        Ok(timeout)
    }
}

impl SvcwatchConfig {
    /// Read, parse, and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        self.probe.timeout()?;

        let mut seen = HashSet::new();
        for (index, service) in self.services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
            if service.endpoint.trim().is_empty() {
                return Err(ConfigError::EmptyEndpoint(service.name.clone()));
            }
            service.interval()?;
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.trim().parse::<u64>().ok()?;
        mins.checked_mul(60).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[probe]
timeout = "2s"
accept_invalid_certs = true

[api]
listen = "127.0.0.1:9494"

[[service]]
name = "llm"
endpoint = "http://127.0.0.1:11434/api/tags"
interval = "30s"
kind = "generic"

[[service]]
name = "requirements"
endpoint = "https://jama.example.com/rest/v1/projects"
interval = "1m"
kind = "auth-tolerant"
"#;

    #[test]
    fn parse_full_config() {
        let config = SvcwatchConfig::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].kind, ServiceKind::Generic);
        assert_eq!(config.services[1].kind, ServiceKind::AuthTolerant);
        assert_eq!(config.services[1].interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.probe.timeout().unwrap(), Duration::from_secs(2));
        assert!(config.probe.accept_invalid_certs);
        assert_eq!(config.api.unwrap().listen.port(), 9494);
    }

    #[test]
    fn probe_timeout_defaults_to_five_seconds() {
        let config = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://localhost"
interval = "5s"
kind = "generic"
"#,
        )
        .unwrap();
        assert_eq!(config.probe.timeout().unwrap(), DEFAULT_PROBE_TIMEOUT);
        assert!(config.api.is_none());
    }

    #[test]
    fn rejects_empty_service_list() {
        let config = SvcwatchConfig::from_toml_str("").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoServices)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let config = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://one"
interval = "5s"
kind = "generic"

[[service]]
name = "a"
endpoint = "http://two"
interval = "5s"
kind = "auth-tolerant"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateService(name)) if name == "a"
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        let config = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://one"
interval = "0s"
kind = "generic"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDuration(_))));
    }

    #[test]
    fn rejects_unparseable_interval() {
        let config = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://one"
interval = "soon"
kind = "generic"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { value, .. }) if value == "soon"
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://one"
interval = "5s"
kind = "quantum"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = SvcwatchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.services[0].name, "llm");
    }

    #[test]
    fn from_file_missing_path() {
        let err = SvcwatchConfig::from_file(Path::new("/nonexistent/svcwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn shipped_config_is_valid() {
        let config = SvcwatchConfig::from_toml_str(include_str!("../../../svcwatch.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.services.len(), 2);
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn minutes_overflow_is_rejected() {
        assert_eq!(parse_duration("307445734561825861m"), None);

        let config = SvcwatchConfig::from_toml_str(
            r#"
[[service]]
name = "a"
endpoint = "http://one"
interval = "307445734561825861m"
kind = "generic"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { value, .. }) if value == "307445734561825861m"
        ));
    }
}
