//! Configuration schema types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete policy configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub common: CommonConfig,
    pub policy: Option<PolicyConfig>,
    pub bypass: Option<BypassConfig>,
}

impl Config {
    /// Rule tables, empty if none were configured
    pub fn policy(&self) -> PolicyConfig {
        self.policy.clone().unwrap_or_default()
    }

    /// Host pre-filter settings, falling back to the stock bypass ranges
    pub fn bypass(&self) -> BypassConfig {
        self.bypass.clone().unwrap_or_default()
    }
}

/// Settings not tied to the rule tables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommonConfig {
    #[serde(default = "default_config_version")]
    pub config_version: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub server: ServerConfig,
}

pub(crate) fn default_config_version() -> String {
    "1.0".to_string()
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            verbose: false,
            server: ServerConfig::default(),
        }
    }
}

/// Query service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/skia-policy.sock")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

/// How internal domain suffixes are compared against hostnames
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DomainMatch {
    /// Raw trailing-substring test: `evilzju.edu.cn` is inside `zju.edu.cn`
    #[default]
    Suffix,
    /// Only the domain itself or a dot-separated subdomain
    Label,
}

/// The rule tables consulted by the evaluator, in pipeline order
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub domain_match: DomainMatch,
    /// Domain suffixes that always connect directly
    #[serde(default)]
    pub internal_domains: Vec<String>,
    /// Available proxy endpoints, in order
    #[serde(default)]
    pub proxies: Vec<ProxyEndpointConfig>,
    /// Networks that always connect directly
    #[serde(default)]
    pub internal_networks: Vec<InternalNetwork>,
    #[serde(default)]
    pub forced_apps: ForcedApps,
    /// Application identifier to the proxy it must use
    #[serde(default)]
    pub app_overrides: IndexMap<String, ProxyRef>,
    #[serde(default)]
    pub blocked_domains: BlockedDomains,
}

impl PolicyConfig {
    /// Position in `proxies` that a reference points at
    pub fn proxy_index(&self, reference: &ProxyRef) -> Option<usize> {
        match reference {
            ProxyRef::Index(index) => (*index < self.proxies.len()).then_some(*index),
            ProxyRef::Name(name) => self
                .proxies
                .iter()
                .position(|p| p.name.as_deref() == Some(name.as_str())),
        }
    }
}

/// A configured proxy endpoint
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProxyEndpointConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub host: String,
    pub port: u32,
}

impl ProxyEndpointConfig {
    /// Name used in diagnostics: the configured name or `host:port`
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

/// A network/netmask pair in dotted-quad form
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InternalNetwork {
    pub network: String,
    pub netmask: String,
}

/// Reference to a proxy by list position or by name
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ProxyRef {
    Index(usize),
    Name(String),
}

impl Default for ProxyRef {
    fn default() -> Self {
        ProxyRef::Index(0)
    }
}

impl fmt::Display for ProxyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRef::Index(index) => write!(f, "#{}", index),
            ProxyRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Applications that always go through one proxy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ForcedApps {
    #[serde(default)]
    pub proxy: ProxyRef,
    #[serde(default)]
    pub apps: Vec<String>,
    /// Ask the host not to remember the decision
    #[serde(default)]
    pub no_cache: bool,
}

/// Domains routed through a randomly chosen proxy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BlockedDomains {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub no_cache: bool,
}

/// Destinations the host handles directly without consulting the policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BypassConfig {
    #[serde(default = "default_bypass_networks")]
    pub networks: Vec<String>,
    #[serde(default = "default_true")]
    pub localhost: bool,
}

fn default_bypass_networks() -> Vec<String> {
    vec![
        "127.0.0.0/8".to_string(),
        "10.0.0.0/8".to_string(),
        "172.16.0.0/12".to_string(),
        "192.168.0.0/16".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            networks: default_bypass_networks(),
            localhost: true,
        }
    }
}
