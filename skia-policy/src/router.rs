//! Host-side routing: pre-filter, decision cache, then the policy engine

use crate::decision::Decision;
use crate::fakeip::FakeIpTable;
use crate::filter::{BypassFilter, PolicyEngine};
use crate::resolve::Resolver;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    app: String,
    host: String,
    port: u16,
}

/// Routes connections for many applications.
///
/// Decisions are remembered per application until [`forget_app`] is
/// called, unless the engine marked them as not cacheable.
///
/// [`forget_app`]: ProxyRouter::forget_app
pub struct ProxyRouter<R> {
    engine: Arc<PolicyEngine>,
    bypass: BypassFilter,
    resolver: R,
    fake_ips: Arc<FakeIpTable>,
    cache: RwLock<HashMap<CacheKey, Decision>>,
}

impl<R: Resolver> ProxyRouter<R> {
    pub fn new(engine: Arc<PolicyEngine>, bypass: BypassFilter, resolver: R) -> Self {
        Self {
            engine,
            bypass,
            resolver,
            fake_ips: Arc::new(FakeIpTable::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Share a synthetic address table with the component answering lookups
    pub fn with_fake_ips(mut self, fake_ips: Arc<FakeIpTable>) -> Self {
        self.fake_ips = fake_ips;
        self
    }

    /// Route a connection to a named destination
    pub fn route(&self, app: &str, host: &str, port: u16) -> Decision {
        if host.is_empty() || port == 0 {
            return Decision::Direct;
        }

        if self.bypass.bypass_name(host) {
            debug!(app, host, port, "Bypassed by pre-filter");
            return Decision::Direct;
        }

        self.decide(app, host, port)
    }

    /// Route a connection to an address, recovering the hostname for
    /// synthetic addresses
    pub fn route_addr(&self, app: &str, addr: Ipv4Addr, port: u16) -> Decision {
        if let Some(name) = self.fake_ips.addr_to_name(addr) {
            return self.route(app, &name, port);
        }

        if port == 0 || self.bypass.bypass_addr(addr) {
            debug!(app, %addr, port, "Bypassed by pre-filter");
            return Decision::Direct;
        }

        self.decide(app, &addr.to_string(), port)
    }

    fn decide(&self, app: &str, host: &str, port: u16) -> Decision {
        let key = CacheKey {
            app: app.to_string(),
            host: host.to_string(),
            port,
        };

        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        if let Some(decision) = cached {
            return decision;
        }

        let decision = self.engine.evaluate(&self.resolver, app, host, port);
        if decision.is_cacheable() {
            self.cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, decision);
        }

        match decision.proxy() {
            Some(proxy) => info!("proxied connect: {} via {} for {}:{}", app, proxy, host, port),
            None => info!("direct connect: {} to {}:{}", app, host, port),
        }
        decision
    }

    /// Drop every remembered decision for an application
    pub fn forget_app(&self, app: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.app != app);
    }

    /// Number of remembered decisions
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
