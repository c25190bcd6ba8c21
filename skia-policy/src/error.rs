//! Error types for policy loading and the query service

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PolicyError>;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Proxy not found: {reference}")]
    ProxyNotFound { reference: String },

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Malformed query: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported config version: {version}")]
    UnsupportedVersion { version: String },

    #[error("Invalid IPv4 literal: {value}")]
    InvalidAddress { value: String },

    #[error("Invalid port for proxy {proxy}: must be in 1..=65535")]
    InvalidPort { proxy: String },

    #[error("Invalid internal network {network}/{netmask}")]
    InvalidNetwork { network: String, netmask: String },

    #[error("Invalid CIDR notation: {cidr}")]
    InvalidCidr { cidr: String },

    #[error("Invalid domain: {domain:?}")]
    InvalidDomain { domain: String },

    #[error("Unknown proxy reference: {reference}")]
    UnknownProxy { reference: String },

    #[error("Duplicate proxy name: {name}")]
    DuplicateProxy { name: String },

    #[error("No proxies configured but {rule} routes through one")]
    NoProxies { rule: String },
}
