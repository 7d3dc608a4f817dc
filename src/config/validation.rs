//! Non-fatal configuration checks.
//!
//! # Responsibilities
//! - Flag settings that are valid but probably not what the operator meant
//! - Report which side supplies trusted-proxy credentials
//!
//! # Design Decisions
//! - Warnings never abort startup; fatal problems are `ConfigError`s
//! - Pure function of the resolved `Config`

use std::fmt;

use crate::config::schema::Config;

/// A condition worth telling the operator about at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// BAD_PROXY unset; non-matching hosts connect directly.
    NoFallbackProxy,
    /// BAD_PROXY set without credentials.
    FallbackWithoutAuth,
    /// GOOD_HOST_REGEX has `.` wildcards that are probably meant literally.
    UnescapedDot { count: usize },
    /// GOOD_PROXY carries credentials; client credentials are ignored.
    TrustedAuthFixed,
    /// GOOD_PROXY has no credentials; the client's are passed through.
    TrustedAuthPassThrough,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::NoFallbackProxy => {
                write!(f, "BAD_PROXY is missing. Using direct connection instead")
            }
            ConfigWarning::FallbackWithoutAuth => write!(
                f,
                "no authentication provided for BAD_PROXY. BAD_PROXY will be used without authentication"
            ),
            ConfigWarning::UnescapedDot { count } => write!(
                f,
                "GOOD_HOST_REGEX contains {} unescaped dot (.) character(s) (aka. wildcards). \
                 Make sure this is intentional! If not, escape them with a backslash (\\)",
                count
            ),
            ConfigWarning::TrustedAuthFixed => write!(
                f,
                "GOOD_PROXY will use the provided authentication and ignore any authentication provided by the client"
            ),
            ConfigWarning::TrustedAuthPassThrough => write!(
                f,
                "no authentication provided for GOOD_PROXY. GOOD_PROXY will use the authentication provided by the client"
            ),
        }
    }
}

/// Collect all warnings for a resolved configuration, in reporting order.
pub fn collect_warnings(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    match &config.bad_proxy {
        None => warnings.push(ConfigWarning::NoFallbackProxy),
        Some(proxy) if !proxy.has_credentials() => {
            warnings.push(ConfigWarning::FallbackWithoutAuth)
        }
        Some(_) => {}
    }

    let dots = config.good_host_pattern.unescaped_dots();
    if dots > 0 {
        warnings.push(ConfigWarning::UnescapedDot { count: dots });
    }

    warnings.push(if config.good_proxy_has_embedded_auth {
        ConfigWarning::TrustedAuthFixed
    } else {
        ConfigWarning::TrustedAuthPassThrough
    });

    warnings
}
