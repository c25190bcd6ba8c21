//! Configuration management for the policy tables

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::{
    BlockedDomains, BypassConfig, Config, DomainMatch, ForcedApps, InternalNetwork, PolicyConfig,
    ProxyEndpointConfig, ProxyRef,
};
pub use validator::ConfigValidator;
