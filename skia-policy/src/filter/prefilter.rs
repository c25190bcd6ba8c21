//! Destinations that never reach the policy engine

use crate::config::schema::BypassConfig;
use crate::error::{PolicyError, Result, ValidationError};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Host-side bypass for loopback, private ranges and local names
#[derive(Debug, Clone, Default)]
pub struct BypassFilter {
    networks: Vec<Ipv4Net>,
    local_names: Vec<String>,
}

impl BypassFilter {
    pub fn from_config(config: &BypassConfig) -> Result<Self> {
        let networks = config
            .networks
            .iter()
            .map(|cidr| {
                cidr.parse::<Ipv4Net>()
                    .map_err(|_| PolicyError::from(ValidationError::InvalidCidr { cidr: cidr.clone() }))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut local_names = Vec::new();
        if config.localhost {
            local_names.push("localhost".to_string());
            if let Some(name) = local_hostname() {
                local_names.push(name);
            }
        }

        Ok(Self {
            networks,
            local_names,
        })
    }

    /// Add another name that is always local
    pub fn add_local_name(&mut self, name: impl Into<String>) {
        self.local_names.push(name.into());
    }

    /// True if a connection to this address must not be proxied
    pub fn bypass_addr(&self, addr: Ipv4Addr) -> bool {
        self.networks.iter().any(|net| net.contains(&addr))
    }

    /// True if a connection to this name must not be proxied.
    ///
    /// Literal IPv4 names are judged by [`bypass_addr`] alone, so a public
    /// literal still reaches the policy.
    ///
    /// [`bypass_addr`]: BypassFilter::bypass_addr
    pub fn bypass_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }

        if let Ok(addr) = name.parse::<Ipv4Addr>() {
            return self.bypass_addr(addr);
        }

        self.local_names.iter().any(|local| local == name)
    }
}

/// This machine's hostname, from the environment or the kernel
fn local_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }

    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| std::fs::read_to_string("/etc/hostname"))
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
