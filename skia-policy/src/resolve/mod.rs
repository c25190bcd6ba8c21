//! Name resolution capabilities and the per-evaluation resolution cache

pub mod cycle;
pub mod system;

pub use cycle::ResolutionCycle;
pub use system::SystemResolver;

use std::sync::Arc;

/// Address lookups supplied by the host environment.
///
/// Both calls return addresses in any textual form; callers keep only
/// IPv4-shaped entries. An empty result means nothing was found.
pub trait Resolver {
    /// Addresses of the local machine's primary interface
    fn primary_addresses(&self) -> Vec<String>;

    /// DNS-style lookup of `host`
    fn host_addresses(&self, host: &str) -> Vec<String>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn primary_addresses(&self) -> Vec<String> {
        (**self).primary_addresses()
    }

    fn host_addresses(&self, host: &str) -> Vec<String> {
        (**self).host_addresses(host)
    }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn primary_addresses(&self) -> Vec<String> {
        (**self).primary_addresses()
    }

    fn host_addresses(&self, host: &str) -> Vec<String> {
        (**self).host_addresses(host)
    }
}
