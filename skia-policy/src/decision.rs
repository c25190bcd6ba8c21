//! Routing decisions produced by the policy engine

use std::fmt;
use std::net::Ipv4Addr;

/// A proxy the engine can route through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where a connection should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Direct,
    ViaProxy {
        host: Ipv4Addr,
        port: u16,
        /// Whether the host may keep this decision for the app's lifetime
        cacheable: bool,
    },
}

impl Decision {
    pub fn via(proxy: ProxyEndpoint, cacheable: bool) -> Self {
        Decision::ViaProxy {
            host: proxy.host,
            port: proxy.port,
            cacheable,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Decision::Direct)
    }

    /// The proxy this decision routes through, if any
    pub fn proxy(&self) -> Option<ProxyEndpoint> {
        match *self {
            Decision::Direct => None,
            Decision::ViaProxy { host, port, .. } => Some(ProxyEndpoint { host, port }),
        }
    }

    pub fn is_cacheable(&self) -> bool {
        match *self {
            Decision::Direct => true,
            Decision::ViaProxy { cacheable, .. } => cacheable,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Direct => write!(f, "DIRECT"),
            Decision::ViaProxy {
                host,
                port,
                cacheable: true,
            } => write!(f, "PROXY {} {}", host, port),
            Decision::ViaProxy {
                host,
                port,
                cacheable: false,
            } => write!(f, "PROXY {} {} NOCACHE", host, port),
        }
    }
}

/// The rule category that produced a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    PlainHost,
    InternalNetwork { network: String, netmask: String },
    InternalDomain { domain: String },
    ForcedApp,
    AppOverride,
    BlockedDomain { domain: String },
    Default,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::PlainHost => write!(f, "plain hostname"),
            Rule::InternalNetwork { network, netmask } => {
                write!(f, "internal network {}/{}", network, netmask)
            }
            Rule::InternalDomain { domain } => write!(f, "internal domain {}", domain),
            Rule::ForcedApp => write!(f, "forced application"),
            Rule::AppOverride => write!(f, "application override"),
            Rule::BlockedDomain { domain } => write!(f, "blocked domain {}", domain),
            Rule::Default => write!(f, "default"),
        }
    }
}

/// A decision together with the rule that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub rule: Rule,
}
