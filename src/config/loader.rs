//! Configuration resolution from named string settings.

use thiserror::Error;

use crate::config::schema::{
    Config, ProxyUrl, ProxyUrlError, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT,
    DEFAULT_MAX_CONNECTIONS,
};
use crate::config::validation::{collect_warnings, ConfigWarning};
use crate::routing::matcher::HostPattern;

/// Raw, unvalidated settings as they arrive from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub listen_host: Option<String>,
    pub listen_port: Option<String>,
    pub good_host_regex: Option<String>,
    pub good_proxy: Option<String>,
    pub bad_proxy: Option<String>,
    pub max_connections: Option<String>,
    pub debug: Option<String>,
}

/// Fatal configuration problems. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOD_HOST_REGEX is required")]
    MissingGoodHostRegex,

    #[error("LISTEN_PORT must be a valid port number, got {0:?}")]
    InvalidListenPort(String),

    #[error("GOOD_HOST_REGEX must be a valid regular expression: {0}")]
    InvalidGoodHostRegex(#[from] regex::Error),

    #[error("GOOD_PROXY is required")]
    MissingGoodProxy,

    #[error("{key} must be a valid URL: {source}")]
    InvalidProxyUrl {
        key: &'static str,
        source: url::ParseError,
    },

    #[error("{key} must be an HTTP or HTTPS proxy URL, got scheme {scheme:?}")]
    UnsupportedProxyScheme { key: &'static str, scheme: String },

    #[error("{key} must name a proxy host")]
    MissingProxyHost { key: &'static str },

    #[error("MAX_CONNECTIONS must be a positive integer, got {0:?}")]
    InvalidMaxConnections(String),
}

/// A validated configuration plus the warnings raised while resolving it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

impl Config {
    /// Validate raw settings into a configuration.
    ///
    /// Checks run in a fixed order and the first failure wins; nothing is
    /// partially applied.
    pub fn resolve(raw: RawSettings) -> Result<Resolved, ConfigError> {
        let good_host_regex = non_empty(raw.good_host_regex)
            .ok_or(ConfigError::MissingGoodHostRegex)?;

        // Only an unset value takes the default; an empty port is invalid.
        let listen_host = raw
            .listen_host
            .unwrap_or_else(|| DEFAULT_LISTEN_HOST.to_string());
        let listen_port = parse_port(raw.listen_port.as_deref().unwrap_or(DEFAULT_LISTEN_PORT))?;

        let good_host_pattern = HostPattern::new(&good_host_regex)?;

        let good_proxy = non_empty(raw.good_proxy).ok_or(ConfigError::MissingGoodProxy)?;
        let good_proxy = parse_proxy("GOOD_PROXY", &good_proxy)?;

        let bad_proxy = non_empty(raw.bad_proxy)
            .map(|value| parse_proxy("BAD_PROXY", &value))
            .transpose()?;

        let max_connections = match non_empty(raw.max_connections) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxConnections(value)),
            },
        };

        let good_proxy_has_embedded_auth = good_proxy.has_credentials();

        let config = Config {
            listen_host,
            listen_port,
            good_host_pattern,
            good_proxy,
            bad_proxy,
            good_proxy_has_embedded_auth,
            max_connections,
            debug: is_truthy(raw.debug.as_deref()),
        };
        let warnings = collect_warnings(&config);

        Ok(Resolved { config, warnings })
    }
}

/// Truthiness of a flag value: anything but unset, empty, "0" or "false".
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !matches!(v.trim(), "" | "0" | "false"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidListenPort(value.to_string()))
}

fn parse_proxy(key: &'static str, value: &str) -> Result<ProxyUrl, ConfigError> {
    ProxyUrl::parse(value).map_err(|e| match e {
        ProxyUrlError::Parse(source) => ConfigError::InvalidProxyUrl { key, source },
        ProxyUrlError::Scheme(scheme) => ConfigError::UnsupportedProxyScheme { key, scheme },
        ProxyUrlError::MissingHost => ConfigError::MissingProxyHost { key },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(regex: &str, good: &str) -> RawSettings {
        RawSettings {
            good_host_regex: Some(regex.into()),
            good_proxy: Some(good.into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_applied() {
        let resolved = Config::resolve(settings(r"^internal\.", "http://proxy1:3128")).unwrap();
        let config = resolved.config;
        assert_eq!(config.listen_host, "0.0.0.0");
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(config.bad_proxy.is_none());
        assert!(!config.good_proxy_has_embedded_auth);
        assert!(!config.debug);
    }

    #[test]
    fn missing_regex_is_fatal() {
        let raw = RawSettings {
            good_proxy: Some("http://proxy1:3128".into()),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::MissingGoodHostRegex)
        ));

        let raw = settings("", "http://proxy1:3128");
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::MissingGoodHostRegex)
        ));
    }

    #[test]
    fn out_of_range_port_is_fatal() {
        let mut raw = settings(r"^internal\.", "http://proxy1:3128");
        raw.listen_port = Some("70000".into());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::InvalidListenPort(p)) if p == "70000"
        ));
    }

    #[test]
    fn non_numeric_port_is_fatal() {
        let mut raw = settings(r"^internal\.", "http://proxy1:3128");
        raw.listen_port = Some("http".into());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::InvalidListenPort(_))
        ));
    }

    #[test]
    fn empty_port_is_fatal() {
        let mut raw = settings(r"^internal\.", "http://proxy1:3128");
        raw.listen_port = Some(String::new());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::InvalidListenPort(p)) if p.is_empty()
        ));
    }

    #[test]
    fn empty_host_is_kept() {
        let mut raw = settings(r"^internal\.", "http://proxy1:3128");
        raw.listen_host = Some(String::new());
        assert_eq!(Config::resolve(raw).unwrap().config.listen_host, "");
    }

    #[test]
    fn port_bounds_accepted() {
        for port in ["0", "65535"] {
            let mut raw = settings(r"^internal\.", "http://proxy1:3128");
            raw.listen_port = Some(port.into());
            assert!(Config::resolve(raw).is_ok(), "port {port}");
        }
    }

    #[test]
    fn port_checked_before_regex() {
        let mut raw = settings("(", "http://proxy1:3128");
        raw.listen_port = Some("-1".into());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::InvalidListenPort(_))
        ));
    }

    #[test]
    fn invalid_regex_is_fatal() {
        assert!(matches!(
            Config::resolve(settings("(unclosed", "http://proxy1:3128")),
            Err(ConfigError::InvalidGoodHostRegex(_))
        ));
    }

    #[test]
    fn good_proxy_required_and_validated() {
        let raw = RawSettings {
            good_host_regex: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::MissingGoodProxy)
        ));

        assert!(matches!(
            Config::resolve(settings("x", "::not a url::")),
            Err(ConfigError::InvalidProxyUrl { key: "GOOD_PROXY", .. })
        ));

        assert!(matches!(
            Config::resolve(settings("x", "socks5://proxy1:1080")),
            Err(ConfigError::UnsupportedProxyScheme { key: "GOOD_PROXY", .. })
        ));
    }

    #[test]
    fn bad_proxy_validated_when_present() {
        let mut raw = settings("x", "http://proxy1:3128");
        raw.bad_proxy = Some("ftp://proxy2:21".into());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::UnsupportedProxyScheme { key: "BAD_PROXY", .. })
        ));
    }

    #[test]
    fn empty_bad_proxy_means_direct() {
        let mut raw = settings("x", "http://proxy1:3128");
        raw.bad_proxy = Some(String::new());
        let resolved = Config::resolve(raw).unwrap();
        assert!(resolved.config.bad_proxy.is_none());
        assert!(resolved.warnings.contains(&ConfigWarning::NoFallbackProxy));
    }

    #[test]
    fn warnings_for_unauthenticated_proxies() {
        let mut raw = settings(r"^internal\.", "http://proxy1:3128");
        raw.bad_proxy = Some("http://proxy2:8888".into());
        let resolved = Config::resolve(raw).unwrap();
        assert_eq!(
            resolved.warnings,
            vec![
                ConfigWarning::FallbackWithoutAuth,
                ConfigWarning::TrustedAuthPassThrough
            ]
        );
    }

    #[test]
    fn warnings_for_authenticated_proxies() {
        let mut raw = settings(r"^internal\.example\.com$", "http://u:p@proxy1:3128");
        raw.bad_proxy = Some("http://v:q@proxy2:8888".into());
        let resolved = Config::resolve(raw).unwrap();
        assert!(resolved.config.good_proxy_has_embedded_auth);
        assert_eq!(resolved.warnings, vec![ConfigWarning::TrustedAuthFixed]);
    }

    #[test]
    fn unescaped_dot_warned() {
        let resolved = Config::resolve(settings("^internal.example.com$", "http://proxy1:3128"))
            .unwrap();
        assert!(resolved
            .warnings
            .contains(&ConfigWarning::UnescapedDot { count: 2 }));
    }

    #[test]
    fn max_connections_validated() {
        let mut raw = settings("x", "http://proxy1:3128");
        raw.max_connections = Some("0".into());
        assert!(matches!(
            Config::resolve(raw),
            Err(ConfigError::InvalidMaxConnections(_))
        ));

        let mut raw = settings("x", "http://proxy1:3128");
        raw.max_connections = Some("64".into());
        assert_eq!(Config::resolve(raw).unwrap().config.max_connections, 64);
    }

    #[test]
    fn debug_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(Some("false")));
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("yes")));
    }
}
