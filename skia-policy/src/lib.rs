//! Per-connection proxy selection policy for intercepted applications

pub mod config;
pub mod decision;
pub mod error;
pub mod fakeip;
pub mod filter;
pub mod resolve;
pub mod router;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, ConfigValidator, DomainMatch, PolicyConfig};
pub use decision::{Decision, Evaluation, ProxyEndpoint, Rule};
pub use error::{PolicyError, Result, ValidationError};
pub use fakeip::FakeIpTable;
pub use filter::{BypassFilter, PolicyEngine};
pub use resolve::{ResolutionCycle, Resolver, SystemResolver};
pub use router::ProxyRouter;
pub use server::{QueryServer, QueryServerConfig};
