//! Policy engine for choosing a route per connection

use super::matcher::{is_plain_host_name, DomainSet, HostMatcher};
use crate::config::schema::{PolicyConfig, ProxyRef};
use crate::config::ConfigValidator;
use crate::decision::{Decision, Evaluation, ProxyEndpoint, Rule};
use crate::error::{PolicyError, Result};
use crate::resolve::{ResolutionCycle, Resolver};
use rand::Rng;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tracing::debug;

/// A routing target chosen by an app rule, with its caching hint
#[derive(Debug, Clone, Copy, PartialEq)]
struct Route {
    proxy: ProxyEndpoint,
    cacheable: bool,
}

/// Evaluates the ordered rule pipeline. First matching rule wins:
/// plain hostname, internal networks, internal domains, forced apps,
/// app overrides, blocked domains, then direct.
///
/// The engine is immutable once built and can be shared across threads.
/// Each evaluation gets its own [`ResolutionCycle`].
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    proxies: Vec<ProxyEndpoint>,
    internal_networks: Vec<(String, String)>,
    internal_domains: HostMatcher,
    forced_apps: Vec<String>,
    forced_route: Option<Route>,
    app_overrides: HashMap<String, ProxyEndpoint>,
    blocked_domains: DomainSet,
    blocked_cacheable: bool,
}

impl PolicyEngine {
    /// Build an engine from validated rule tables
    pub fn from_config(policy: &PolicyConfig) -> Result<Self> {
        ConfigValidator::validate_policy(policy)?;

        let proxies = policy
            .proxies
            .iter()
            .map(|p| -> Result<ProxyEndpoint> {
                let host = p.host.parse::<Ipv4Addr>().map_err(|_| PolicyError::ProxyNotFound {
                    reference: p.label(),
                })?;
                let port = u16::try_from(p.port).map_err(|_| PolicyError::ProxyNotFound {
                    reference: p.label(),
                })?;
                Ok(ProxyEndpoint::new(host, port))
            })
            .collect::<Result<Vec<_>>>()?;

        let lookup = |reference: &ProxyRef| -> Result<ProxyEndpoint> {
            policy
                .proxy_index(reference)
                .map(|index| proxies[index])
                .ok_or_else(|| PolicyError::ProxyNotFound {
                    reference: reference.to_string(),
                })
        };

        let forced_route = if policy.forced_apps.apps.is_empty() {
            None
        } else {
            Some(Route {
                proxy: lookup(&policy.forced_apps.proxy)?,
                cacheable: !policy.forced_apps.no_cache,
            })
        };

        let mut app_overrides = HashMap::new();
        for (app, reference) in &policy.app_overrides {
            app_overrides.insert(app.clone(), lookup(reference)?);
        }

        let mut internal_domains = HostMatcher::new(policy.domain_match);
        for domain in &policy.internal_domains {
            internal_domains.add_domain(domain);
        }

        Ok(Self {
            internal_networks: policy
                .internal_networks
                .iter()
                .map(|n| (n.network.clone(), n.netmask.clone()))
                .collect(),
            internal_domains,
            forced_apps: policy.forced_apps.apps.clone(),
            forced_route,
            app_overrides,
            blocked_domains: policy.blocked_domains.domains.iter().collect(),
            blocked_cacheable: !policy.blocked_domains.no_cache,
            proxies,
        })
    }

    /// Decide the route for one connection
    pub fn evaluate<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        app: &str,
        host: &str,
        port: u16,
    ) -> Decision {
        self.explain(resolver, app, host, port).decision
    }

    /// Decide the route and report which rule made the decision
    pub fn explain<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        app: &str,
        host: &str,
        port: u16,
    ) -> Evaluation {
        self.explain_with_rng(resolver, &mut rand::thread_rng(), app, host, port)
    }

    /// As [`explain`](Self::explain), drawing random proxies from `rng`
    pub fn explain_with_rng<R: Resolver + ?Sized, G: Rng>(
        &self,
        resolver: &R,
        rng: &mut G,
        app: &str,
        host: &str,
        port: u16,
    ) -> Evaluation {
        let mut cycle = ResolutionCycle::new(resolver);
        let evaluation = self.run_pipeline(&mut cycle, rng, app, host);
        debug!(
            app,
            host,
            port,
            rule = %evaluation.rule,
            decision = %evaluation.decision,
            resolved = cycle.cached_hosts(),
            "Evaluated policy"
        );
        evaluation
    }

    fn run_pipeline<R: Resolver + ?Sized, G: Rng>(
        &self,
        cycle: &mut ResolutionCycle<'_, R>,
        rng: &mut G,
        app: &str,
        host: &str,
    ) -> Evaluation {
        let direct = |rule| Evaluation {
            decision: Decision::Direct,
            rule,
        };

        if is_plain_host_name(host) {
            return direct(Rule::PlainHost);
        }

        for (network, netmask) in &self.internal_networks {
            if cycle.is_host_in_network(host, network, netmask) {
                return direct(Rule::InternalNetwork {
                    network: network.clone(),
                    netmask: netmask.clone(),
                });
            }
        }

        if let Some(domain) = self.internal_domains.matching_domain(host) {
            return direct(Rule::InternalDomain {
                domain: domain.to_string(),
            });
        }

        if let Some(route) = self.forced_route {
            if self.forced_apps.iter().any(|forced| forced == app) {
                return Evaluation {
                    decision: Decision::via(route.proxy, route.cacheable),
                    rule: Rule::ForcedApp,
                };
            }
        }

        if let Some(proxy) = self.app_overrides.get(app) {
            return Evaluation {
                decision: Decision::via(*proxy, true),
                rule: Rule::AppOverride,
            };
        }

        if let Some(domain) = self.blocked_domains.find(host) {
            // An empty proxy list falls through to direct
            if !self.proxies.is_empty() {
                let proxy = self.proxies[rng.gen_range(0..self.proxies.len())];
                return Evaluation {
                    decision: Decision::via(proxy, self.blocked_cacheable),
                    rule: Rule::BlockedDomain {
                        domain: domain.to_string(),
                    },
                };
            }
        }

        direct(Rule::Default)
    }

    /// Configured proxies in order
    pub fn proxies(&self) -> &[ProxyEndpoint] {
        &self.proxies
    }
}
