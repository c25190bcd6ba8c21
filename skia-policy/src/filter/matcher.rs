//! Hostname classification and domain matching

use crate::config::schema::DomainMatch;
use std::collections::HashSet;

/// True if the text has exactly four dot-separated components.
/// This is the only shape check resolver output goes through.
pub fn is_ipv4_shaped(address: &str) -> bool {
    address.split('.').count() == 4
}

/// Parse a dotted quad into four bytes.
/// Returns None for anything that is not four decimal components in 0..=255.
pub fn parse_octets(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(octets)
}

/// Per-octet netmask test: `address & netmask == network & netmask`
pub fn network_contains(address: &str, network: &str, netmask: &str) -> bool {
    let (Some(address), Some(network), Some(netmask)) = (
        parse_octets(address),
        parse_octets(network),
        parse_octets(netmask),
    ) else {
        return false;
    };

    address
        .iter()
        .zip(network.iter())
        .zip(netmask.iter())
        .all(|((a, n), m)| (a & m) == (n & m))
}

/// A bare name without any domain part
pub fn is_plain_host_name(hostname: &str) -> bool {
    !hostname.contains('.')
}

/// Number of dot-separated labels minus one
pub fn host_name_domain_level(hostname: &str) -> usize {
    hostname.split('.').count() - 1
}

/// Case-insensitive trailing-substring test.
///
/// This is not label aligned: `evilzju.edu.cn` is in domain `zju.edu.cn`.
/// Use [`is_host_name_in_domain_strict`] for subdomain semantics.
pub fn is_host_name_in_domain(hostname: &str, domain: &str) -> bool {
    hostname.to_lowercase().ends_with(&domain.to_lowercase())
}

/// Case-insensitive test that `hostname` is `domain` or one of its subdomains
pub fn is_host_name_in_domain_strict(hostname: &str, domain: &str) -> bool {
    let hostname = hostname.to_lowercase();
    let domain = domain.to_lowercase();

    match hostname.strip_suffix(domain.as_str()) {
        Some("") => true,
        Some(rest) => rest.ends_with('.'),
        None => false,
    }
}

/// Ordered list of internal domain suffixes
#[derive(Debug, Clone, Default)]
pub struct HostMatcher {
    domains: Vec<String>,
    mode: DomainMatch,
}

impl HostMatcher {
    /// Create a new empty matcher
    pub fn new(mode: DomainMatch) -> Self {
        Self {
            domains: Vec::new(),
            mode,
        }
    }

    /// Add a domain suffix, checked after all previously added ones
    pub fn add_domain(&mut self, domain: &str) {
        self.domains.push(domain.to_string());
    }

    /// First configured domain the hostname falls under
    pub fn matching_domain(&self, host: &str) -> Option<&str> {
        self.domains
            .iter()
            .find(|domain| match self.mode {
                DomainMatch::Suffix => is_host_name_in_domain(host, domain),
                DomainMatch::Label => is_host_name_in_domain_strict(host, domain),
            })
            .map(String::as_str)
    }
}

/// Membership set of domains, looked up once per suffix level of a host
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    domains: HashSet<String>,
}

impl DomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str) {
        self.domains.insert(domain.to_ascii_lowercase());
    }

    /// Walk `a.b.c`, `b.c`, `c` and return the first member found
    pub fn find(&self, host: &str) -> Option<&str> {
        let host = host.to_ascii_lowercase();
        let mut candidate = host.as_str();

        loop {
            if let Some(domain) = self.domains.get(candidate) {
                return Some(domain.as_str());
            }

            match candidate.find('.') {
                Some(pos) => candidate = &candidate[pos + 1..],
                None => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DomainSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = DomainSet::new();
        for domain in iter {
            set.insert(domain.as_ref());
        }
        set
    }
}
