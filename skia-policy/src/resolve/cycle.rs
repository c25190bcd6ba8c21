use super::Resolver;
use crate::filter::matcher::{is_ipv4_shaped, network_contains};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Resolution state for a single policy evaluation.
///
/// Each host is sent to the resolver at most once per cycle, including
/// lookups that found nothing. Dropping the cycle discards everything it
/// learned, so no answer outlives the evaluation that asked for it.
pub struct ResolutionCycle<'r, R: Resolver + ?Sized> {
    resolver: &'r R,
    cache: HashMap<String, Option<String>>,
}

impl<'r, R: Resolver + ?Sized> ResolutionCycle<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// First IPv4-shaped address of the local machine, if any
    pub fn primary_ip_address(&self) -> Option<String> {
        first_ipv4(self.resolver.primary_addresses())
    }

    /// First IPv4-shaped address `host` resolves to, memoized for this cycle
    pub fn dns_resolve(&mut self, host: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(host) {
            trace!(host, address = ?cached, "Resolution cache hit");
            return cached.clone();
        }

        let address = first_ipv4(self.resolver.host_addresses(host));
        debug!(host, address = ?address, "Resolved host");
        self.cache.insert(host.to_string(), address.clone());
        address
    }

    pub fn is_host_resolvable(&mut self, host: &str) -> bool {
        self.dns_resolve(host).is_some_and(|address| !address.is_empty())
    }

    /// Resolve `host` and test it against a network/netmask pair.
    /// Unresolvable hosts and malformed octets never match.
    pub fn is_host_in_network(&mut self, host: &str, network: &str, netmask: &str) -> bool {
        match self.dns_resolve(host) {
            Some(address) => network_contains(&address, network, netmask),
            None => false,
        }
    }

    /// Number of hosts looked up so far in this cycle
    pub fn cached_hosts(&self) -> usize {
        self.cache.len()
    }
}

/// First IPv4-shaped entry. IPv6 entries are expected and skipped quietly;
/// anything else is reported as malformed.
fn first_ipv4(addresses: Vec<String>) -> Option<String> {
    addresses.into_iter().find(|address| {
        if is_ipv4_shaped(address) {
            return true;
        }
        if address.contains(':') {
            trace!(address = address.as_str(), "Skipping non-IPv4 address");
        } else {
            warn!(address = address.as_str(), "Skipping malformed resolver address");
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeResolver {
        primary: Vec<String>,
        hosts: HashMap<String, Vec<String>>,
        lookups: RefCell<Vec<String>>,
    }

    impl FakeResolver {
        fn with_host(mut self, host: &str, addresses: &[&str]) -> Self {
            self.hosts.insert(
                host.to_string(),
                addresses.iter().map(|a| a.to_string()).collect(),
            );
            self
        }
    }

    impl Resolver for FakeResolver {
        fn primary_addresses(&self) -> Vec<String> {
            self.primary.clone()
        }

        fn host_addresses(&self, host: &str) -> Vec<String> {
            self.lookups.borrow_mut().push(host.to_string());
            self.hosts.get(host).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_primary_ip_skips_ipv6() {
        let resolver = FakeResolver {
            primary: vec!["fe80::1".to_string(), "192.168.1.20".to_string()],
            ..Default::default()
        };
        let cycle = ResolutionCycle::new(&resolver);
        assert_eq!(cycle.primary_ip_address(), Some("192.168.1.20".to_string()));

        let empty = FakeResolver::default();
        assert_eq!(ResolutionCycle::new(&empty).primary_ip_address(), None);
    }

    #[test]
    fn test_resolve_picks_first_ipv4() {
        let resolver =
            FakeResolver::default().with_host("example.com", &["2606:2800::1", "93.184.216.34", "1.1.1.1"]);
        let mut cycle = ResolutionCycle::new(&resolver);

        assert_eq!(cycle.dns_resolve("example.com"), Some("93.184.216.34".to_string()));
    }

    #[test]
    fn test_resolve_skips_malformed_entries() {
        let resolver = FakeResolver::default()
            .with_host("example.com", &["not-an-address", "93.184", "93.184.216.34"])
            .with_host("broken.example", &["", "1.2.3"]);
        let mut cycle = ResolutionCycle::new(&resolver);

        assert_eq!(cycle.dns_resolve("example.com"), Some("93.184.216.34".to_string()));
        assert_eq!(cycle.dns_resolve("broken.example"), None);
    }

    #[test]
    fn test_resolve_is_memoized() {
        let resolver = FakeResolver::default().with_host("example.com", &["93.184.216.34"]);
        let mut cycle = ResolutionCycle::new(&resolver);

        let first = cycle.dns_resolve("example.com");
        let second = cycle.dns_resolve("example.com");

        assert_eq!(first, second);
        assert_eq!(resolver.lookups.borrow().len(), 1);
        assert_eq!(cycle.cached_hosts(), 1);
    }

    #[test]
    fn test_negative_result_is_memoized() {
        let resolver = FakeResolver::default();
        let mut cycle = ResolutionCycle::new(&resolver);

        assert_eq!(cycle.dns_resolve("nowhere.invalid"), None);
        assert!(!cycle.is_host_resolvable("nowhere.invalid"));
        assert_eq!(resolver.lookups.borrow().len(), 1);
    }

    #[test]
    fn test_new_cycle_resolves_again() {
        let resolver = FakeResolver::default().with_host("example.com", &["93.184.216.34"]);

        ResolutionCycle::new(&resolver).dns_resolve("example.com");
        ResolutionCycle::new(&resolver).dns_resolve("example.com");

        assert_eq!(resolver.lookups.borrow().len(), 2);
    }

    #[test]
    fn test_host_in_network() {
        let resolver = FakeResolver::default()
            .with_host("campus.example", &["222.205.3.4"])
            .with_host("odd.example", &["222.205.3.x"]);
        let mut cycle = ResolutionCycle::new(&resolver);

        assert!(cycle.is_host_in_network("campus.example", "222.205.0.0", "255.255.0.0"));
        assert!(!cycle.is_host_in_network("campus.example", "210.32.0.0", "255.255.0.0"));
        assert!(!cycle.is_host_in_network("odd.example", "222.205.0.0", "255.255.0.0"));
        assert!(!cycle.is_host_in_network("missing.example", "0.0.0.0", "0.0.0.0"));
        assert!(!cycle.is_host_in_network("campus.example", "222.205.0.0", "255.255"));
    }
}
