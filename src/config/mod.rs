mod format;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::Uri;
use serde::{Deserialize, Deserializer, de};
use thiserror::Error;

pub use format::{Format, FormatHint};

use crate::http::Auth;
use crate::sinks::console;
use crate::stat::Stat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path:?} failed, {err}")]
    Read {
        path: PathBuf,
        err: std::io::Error,
    },

    #[error("deserialize config failed, {0}")]
    Deserialize(String),

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

const fn default_interval() -> Duration {
    Duration::from_secs(60)
}

/// One nginx instance exposing the traffic status module.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Becomes part of every metric path of this server.
    pub name: String,

    /// The JSON status endpoint, e.g. `http://127.0.0.1/status/format/json`
    #[serde(deserialize_with = "deserialize_uri")]
    pub url: Uri,

    #[serde(default)]
    pub auth: Option<Auth>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prepended to every metric path, e.g. `Custom Metrics|Nginx`.
    #[serde(default)]
    pub metric_prefix: String,

    /// How often all servers are polled.
    #[serde(default = "default_interval", with = "humanize::duration::serde")]
    pub interval: Duration,

    /// Bound of every HTTP request, requests never time out if not set.
    #[serde(default, with = "humanize::duration::serde_option")]
    pub timeout: Option<Duration>,

    pub servers: Vec<ServerConfig>,

    pub stats: Vec<Stat>,

    #[serde(default)]
    pub sink: console::Config,
}

impl Config {
    /// Read, deserialize and validate the config file at `path`, the format
    /// is picked by its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            err,
        })?;

        Config::from_content(&content, Format::from_path(path).ok())
    }

    pub fn from_content(content: &str, hint: FormatHint) -> Result<Config, ConfigError> {
        let config: Config = format::deserialize(content, hint).map_err(ConfigError::Deserialize)?;
        config.validate().map_err(ConfigError::Invalid)?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errs = vec![];

        if self.servers.is_empty() {
            errs.push("at least one server is required".to_string());
        }
        if self.stats.is_empty() {
            errs.push("at least one stat is required".to_string());
        }
        if self.interval.is_zero() {
            errs.push("interval must be greater than zero".to_string());
        }

        let mut names = HashSet::new();
        for server in &self.servers {
            if server.name.is_empty() {
                errs.push("server name cannot be empty".to_string());
            } else if !names.insert(server.name.as_str()) {
                errs.push(format!("duplicate server name {:?}", server.name));
            }

            if !matches!(server.url.scheme_str(), Some("http") | Some("https"))
                || server.url.authority().is_none()
            {
                errs.push(format!(
                    "url of server {:?} must be an absolute http or https url, got {:?}",
                    server.name,
                    server.url.to_string()
                ));
            }

            if let Some(Err(err)) = server.auth.as_ref().map(Auth::validate) {
                errs.push(format!("auth of server {:?}: {err}", server.name));
            }
        }

        let mut names = HashSet::new();
        for stat in &self.stats {
            if !names.insert(stat.name()) {
                errs.push(format!("duplicate stat name {:?}", stat.name()));
            }

            if stat.metrics().is_empty() {
                errs.push(format!("stat {:?} has no metrics", stat.name()));
            }

            for (index, metric) in stat.metrics().iter().enumerate() {
                if metric.attr().is_empty() || metric.alias().is_empty() {
                    errs.push(format!(
                        "metrics[{index}] of stat {:?} must have non-empty attr and alias",
                        stat.name()
                    ));
                }
            }
        }

        if errs.is_empty() { Ok(()) } else { Err(errs) }
    }
}

fn deserialize_uri<'de, D>(deserializer: D) -> Result<Uri, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<Uri>().map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sinks::console::{Encoding, Stream};

    const EXAMPLE: &str = r#"
metric_prefix: "Custom Metrics|Nginx"
interval: 30s
timeout: 10s
servers:
  - name: web-1
    url: http://127.0.0.1:8080/status/format/json
    auth:
      strategy: basic
      user: admin
      password: secret
  - name: web-2
    url: https://nginx.example.com/status/format/json
stats:
  - name: vts
    metrics:
      - attr: requestCounter
        alias: Requests
        aggregation_type: SUM
      - attr: active
        alias: Active
        delta: true
sink:
  stream: stderr
  encoding: json
"#;

    #[test]
    fn load_example() {
        let path = testify::temp::write_temp_file("yaml", EXAMPLE);
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(config.metric_prefix, "Custom Metrics|Nginx");
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].name, "web-1");
        assert_eq!(
            config.servers[0].url,
            Uri::from_static("http://127.0.0.1:8080/status/format/json")
        );
        assert_eq!(config.servers[0].auth, Some(Auth::basic("admin", "secret")));
        assert_eq!(config.servers[1].auth, None);

        assert_eq!(config.stats.len(), 1);
        let metrics = config.stats[0].metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].attr(), "requestCounter");
        assert_eq!(
            metrics[0].properties().get("aggregation_type").map(String::as_str),
            Some("SUM")
        );
        assert_eq!(
            metrics[1].properties().get("delta").map(String::as_str),
            Some("true")
        );

        assert_eq!(config.sink.stream, Stream::Stderr);
        assert_eq!(config.sink.encoding, Encoding::Json);
    }

    #[test]
    fn load_json() {
        let content = r#"{
            "servers": [{"name": "web", "url": "http://127.0.0.1/status"}],
            "stats": [{"name": "vts", "metrics": [{"attr": "active", "alias": "Active"}]}]
        }"#;
        let path = testify::temp::write_temp_file("json", content);
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(config.metric_prefix, "");
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.timeout, None);
        assert_eq!(config.sink, console::Config::default());
    }

    #[test]
    fn missing_file() {
        let err = Config::load(testify::temp::temp_file("yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "{err}");
    }

    #[test]
    fn unknown_field() {
        let content = r#"
servers:
  - name: web
    url: http://127.0.0.1/status
    method: POST
stats:
  - name: vts
    metrics:
      - attr: active
        alias: Active
"#;

        let err = Config::from_content(content, None).unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)), "{err}");
    }

    #[test]
    fn invalid() {
        let content = r#"
servers:
  - name: web
    url: /status
  - name: web
    url: ftp://127.0.0.1/status
stats:
  - name: vts
    metrics:
      - attr: ""
        alias: Active
  - name: vts
    metrics: []
"#;

        let err = Config::from_content(content, Some(Format::YAML)).unwrap_err();
        let ConfigError::Invalid(errs) = err else {
            panic!("unexpected error {err}");
        };

        assert_eq!(
            errs,
            vec![
                "url of server \"web\" must be an absolute http or https url, got \"/status\""
                    .to_string(),
                "duplicate server name \"web\"".to_string(),
                "url of server \"web\" must be an absolute http or https url, got \"ftp://127.0.0.1/status\""
                    .to_string(),
                "metrics[0] of stat \"vts\" must have non-empty attr and alias".to_string(),
                "duplicate stat name \"vts\"".to_string(),
                "stat \"vts\" has no metrics".to_string(),
            ]
        );
    }

    #[test]
    fn invalid_bearer_token() {
        let content = r#"
servers:
  - name: web
    url: http://127.0.0.1/status
    auth:
      strategy: bearer
      token: "abc\ndef"
stats:
  - name: vts
    metrics:
      - attr: active
        alias: Active
"#;

        let err = Config::from_content(content, None).unwrap_err();
        let ConfigError::Invalid(errs) = err else {
            panic!("unexpected error {err}");
        };

        assert_eq!(errs.len(), 1);
        assert!(
            errs[0].starts_with("auth of server \"web\": invalid bearer token"),
            "{}",
            errs[0]
        );
    }

    #[test]
    fn empty() {
        let err = Config::from_content("servers: []\nstats: []", None).unwrap_err();
        let ConfigError::Invalid(errs) = err else {
            panic!("unexpected error {err}");
        };

        assert_eq!(
            errs,
            vec![
                "at least one server is required".to_string(),
                "at least one stat is required".to_string(),
            ]
        );
    }
}
