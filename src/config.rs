use std::env;
use std::net::SocketAddr;

use crate::metrics::{BuildInfo, MatchPolicy};

#[derive(Clone, Debug)]
pub struct ApiToken {
    pub user: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub build_info: BuildInfo,
    pub api_tokens: Vec<ApiToken>,
    pub metrics_key: Option<String>,
    pub match_policy: MatchPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("BIND_ADDR is not a socket address: {}", e))?;

        let build_info = BuildInfo {
            version: lookup("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            hostname: lookup("HOSTNAME")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(system_hostname),
            container_tag: lookup("CONTAINER_TAG").unwrap_or_default(),
        };

        let api_tokens = match lookup("API_TOKENS") {
            Some(raw) => parse_api_tokens(&raw)?,
            None => Vec::new(),
        };

        let metrics_key = lookup("METRICS_KEY").filter(|k| !k.is_empty());

        let match_policy = match lookup("METRICS_MATCH_POLICY") {
            Some(raw) => raw.parse()?,
            None => MatchPolicy::default(),
        };

        Ok(Self {
            bind_addr,
            build_info,
            api_tokens,
            metrics_key,
            match_policy,
        })
    }
}

/// `alice:s3cret,bob:t0ken`
fn parse_api_tokens(raw: &str) -> Result<Vec<ApiToken>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user, token) = entry
                .split_once(':')
                .ok_or_else(|| format!("API_TOKENS entry {:?} must look like name:token", entry))?;

            let (user, token) = (user.trim(), token.trim());
            if user.is_empty() || token.is_empty() {
                return Err(format!("API_TOKENS entry {:?} has an empty name or token", entry));
            }

            Ok(ApiToken {
                user: user.to_string(),
                token: token.to_string(),
            })
        })
        .collect()
}

fn system_hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[("HOSTNAME", "node-1")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.build_info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.build_info.environment, "development");
        assert_eq!(config.build_info.hostname, "node-1");
        assert_eq!(config.build_info.container_tag, "");
        assert!(config.api_tokens.is_empty());
        assert!(config.metrics_key.is_none());
        assert_eq!(config.match_policy, MatchPolicy::FanOut);
    }

    #[test]
    fn reads_every_setting() {
        let config = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("APP_VERSION", "2.0.0"),
            ("ENVIRONMENT", "production"),
            ("HOSTNAME", "api-7"),
            ("CONTAINER_TAG", "sha-abc"),
            ("API_TOKENS", "alice:one, bob:two"),
            ("METRICS_KEY", "scrape"),
            ("METRICS_MATCH_POLICY", "first-match"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.build_info.version, "2.0.0");
        assert_eq!(config.build_info.environment, "production");
        assert_eq!(config.build_info.container_tag, "sha-abc");
        assert_eq!(config.api_tokens.len(), 2);
        assert_eq!(config.api_tokens[1].user, "bob");
        assert_eq!(config.api_tokens[1].token, "two");
        assert_eq!(config.metrics_key.as_deref(), Some("scrape"));
        assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(config(&[("API_TOKENS", "alice")]).is_err());
        assert!(config(&[("API_TOKENS", "alice:")]).is_err());
        assert!(config(&[("API_TOKENS", ":token")]).is_err());
    }

    #[test]
    fn rejects_unknown_policy_and_bad_address() {
        assert!(config(&[("METRICS_MATCH_POLICY", "sometimes")]).is_err());
        assert!(config(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
