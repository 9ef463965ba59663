use axum::http::StatusCode;
use std::str::FromStr;

pub const ENDPOINT_USAGE_COUNTER: &str = "endpoint_usage_counter";
pub const BUILD_INFO_GAUGE: &str = "build_info";

/// What to do when more than one indexed pattern matches a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Every matching pattern gets its own increment.
    #[default]
    FanOut,
    /// Only the earliest registered matching pattern is counted.
    FirstMatch,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fan-out" | "fanout" => Ok(Self::FanOut),
            "first-match" | "firstmatch" => Ok(Self::FirstMatch),
            other => Err(format!("Unknown metrics match policy: {}", other)),
        }
    }
}

/// Everything the interceptor learned about one completed request.
#[derive(Debug, Clone)]
pub struct RequestFacts {
    pub path: String,
    pub method: String,
    pub host: String,
    /// Path parameters in route order.
    pub params: Vec<(String, String)>,
    /// Display name of the authenticated user, empty when anonymous.
    pub user: String,
    pub status: StatusCode,
}

/// One `endpoint_usage_counter` label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSample {
    pub status_code: String,
    pub method: String,
    pub path_pattern: String,
    pub params: String,
    pub instance: String,
    pub user: String,
}

impl EndpointSample {
    pub fn new(facts: &RequestFacts, path_pattern: &str) -> Self {
        Self {
            status_code: facts.status.as_u16().to_string(),
            method: facts.method.clone(),
            path_pattern: path_pattern.to_string(),
            params: params_label(&facts.params),
            instance: facts.host.clone(),
            user: facts.user.clone(),
        }
    }

    pub fn labels(&self) -> [(&'static str, String); 6] {
        [
            ("statusCode", self.status_code.clone()),
            ("method", self.method.clone()),
            ("pathPattern", self.path_pattern.clone()),
            ("params", self.params.clone()),
            ("instance", self.instance.clone()),
            ("user", self.user.clone()),
        ]
    }
}

/// `param_id="7" param_tab="settings"`
pub fn params_label(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("param_{}=\"{}\"", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub environment: String,
    pub hostname: String,
    pub container_tag: String,
}

impl BuildInfo {
    pub fn labels(&self) -> [(&'static str, String); 4] {
        [
            ("version", self.version.clone()),
            ("environment", self.environment.clone()),
            ("hostname", self.hostname.clone()),
            ("container_tag", self.container_tag.clone()),
        ]
    }
}
