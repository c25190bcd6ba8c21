//! Resolver backed by the operating system

use super::Resolver;
use std::net::{ToSocketAddrs, UdpSocket};
use tracing::debug;

/// Selects the outbound route; no packet is sent to it
const ROUTE_TARGET: &str = "8.8.8.8:53";

/// Resolves through the OS resolver; the primary address is whatever local
/// address the kernel picks for an outbound route.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for SystemResolver {
    fn primary_addresses(&self) -> Vec<String> {
        let local = UdpSocket::bind("0.0.0.0:0").and_then(|socket| {
            socket.connect(ROUTE_TARGET)?;
            socket.local_addr()
        });

        match local {
            Ok(addr) => vec![addr.ip().to_string()],
            Err(e) => {
                debug!("No primary address: {}", e);
                Vec::new()
            }
        }
    }

    fn host_addresses(&self, host: &str) -> Vec<String> {
        match (host, 0).to_socket_addrs() {
            Ok(addrs) => addrs.map(|addr| addr.ip().to_string()).collect(),
            Err(e) => {
                debug!("Lookup of {} failed: {}", host, e);
                Vec::new()
            }
        }
    }
}
