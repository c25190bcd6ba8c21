//! Configuration validation

use super::schema::{default_config_version, BypassConfig, Config, PolicyConfig, ProxyRef};
use crate::error::{Result, ValidationError};
use crate::filter::matcher::parse_octets;
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::Ipv4Addr;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate entire configuration
    pub fn validate(config: &Config) -> Result<()> {
        Self::check_version(&config.common.config_version)?;
        if let Some(policy) = &config.policy {
            Self::validate_policy(policy)?;
        }
        if let Some(bypass) = &config.bypass {
            Self::validate_bypass(bypass)?;
        }
        Ok(())
    }

    /// Validate the rule tables on their own
    pub fn validate_policy(policy: &PolicyConfig) -> Result<()> {
        Self::validate_proxies(policy)?;
        Self::validate_networks(policy)?;
        Self::validate_domains(&policy.internal_domains)?;
        Self::validate_domains(&policy.blocked_domains.domains)?;
        Self::validate_references(policy)?;
        Ok(())
    }

    fn check_version(version: &str) -> Result<()> {
        if version != default_config_version() {
            return Err(ValidationError::UnsupportedVersion {
                version: version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Proxy hosts must be IPv4 literals with a usable port, names unique
    fn validate_proxies(policy: &PolicyConfig) -> Result<()> {
        let mut names = HashSet::new();

        for proxy in &policy.proxies {
            if proxy.host.parse::<Ipv4Addr>().is_err() {
                return Err(ValidationError::InvalidAddress {
                    value: proxy.host.clone(),
                }
                .into());
            }

            if !(1..=65535).contains(&proxy.port) {
                return Err(ValidationError::InvalidPort {
                    proxy: proxy.label(),
                }
                .into());
            }

            if let Some(name) = &proxy.name {
                if !names.insert(name.as_str()) {
                    return Err(ValidationError::DuplicateProxy { name: name.clone() }.into());
                }
            }
        }

        Ok(())
    }

    fn validate_networks(policy: &PolicyConfig) -> Result<()> {
        for entry in &policy.internal_networks {
            if parse_octets(&entry.network).is_none() || parse_octets(&entry.netmask).is_none() {
                return Err(ValidationError::InvalidNetwork {
                    network: entry.network.clone(),
                    netmask: entry.netmask.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn validate_domains(domains: &[String]) -> Result<()> {
        for domain in domains {
            if domain.is_empty() || domain.chars().any(|c| c.is_whitespace() || c == '\0') {
                return Err(ValidationError::InvalidDomain {
                    domain: domain.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Every rule that routes through a proxy must name one that exists
    fn validate_references(policy: &PolicyConfig) -> Result<()> {
        if !policy.forced_apps.apps.is_empty() {
            Self::check_reference(policy, &policy.forced_apps.proxy, "forced_apps")?;
        }

        for (app, reference) in &policy.app_overrides {
            Self::check_reference(policy, reference, &format!("app_overrides.{}", app))?;
        }

        if !policy.blocked_domains.domains.is_empty() && policy.proxies.is_empty() {
            return Err(ValidationError::NoProxies {
                rule: "blocked_domains".to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn check_reference(policy: &PolicyConfig, reference: &ProxyRef, rule: &str) -> Result<()> {
        if policy.proxies.is_empty() {
            return Err(ValidationError::NoProxies {
                rule: rule.to_string(),
            }
            .into());
        }

        if policy.proxy_index(reference).is_none() {
            return Err(ValidationError::UnknownProxy {
                reference: format!("{} in {}", reference, rule),
            }
            .into());
        }

        Ok(())
    }

    fn validate_bypass(bypass: &BypassConfig) -> Result<()> {
        for cidr in &bypass.networks {
            if cidr.parse::<Ipv4Net>().is_err() {
                return Err(ValidationError::InvalidCidr { cidr: cidr.clone() }.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{InternalNetwork, ProxyEndpointConfig};
    use crate::config::ConfigLoader;
    use crate::error::PolicyError;

    fn proxy(name: Option<&str>, host: &str, port: u32) -> ProxyEndpointConfig {
        ProxyEndpointConfig {
            name: name.map(str::to_string),
            host: host.to_string(),
            port,
        }
    }

    fn validation_error(result: Result<()>) -> ValidationError {
        match result {
            Err(PolicyError::Validation(e)) => e,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_is_valid() {
        let config = ConfigLoader::load_builtin().unwrap();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_bad_version() {
        let mut config = Config::default();
        config.common.config_version = "2.0".to_string();

        assert_eq!(
            validation_error(ConfigValidator::validate(&config)),
            ValidationError::UnsupportedVersion {
                version: "2.0".to_string()
            }
        );
    }

    #[test]
    fn test_proxy_host_must_be_ipv4() {
        let mut policy = PolicyConfig::default();
        policy.proxies.push(proxy(None, "proxy.example.com", 1080));

        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::InvalidAddress { .. }
        ));
    }

    #[test]
    fn test_proxy_port_range() {
        let mut policy = PolicyConfig::default();
        policy.proxies.push(proxy(Some("zero"), "127.0.0.1", 0));
        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::InvalidPort { .. }
        ));

        policy.proxies[0].port = 70000;
        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::InvalidPort { .. }
        ));
    }

    #[test]
    fn test_duplicate_proxy_name() {
        let mut policy = PolicyConfig::default();
        policy.proxies.push(proxy(Some("a"), "127.0.0.1", 2000));
        policy.proxies.push(proxy(Some("a"), "127.0.0.1", 2001));

        assert_eq!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::DuplicateProxy {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_bad_network_octets() {
        let mut policy = PolicyConfig::default();
        policy.internal_networks.push(InternalNetwork {
            network: "10.0.0.256".to_string(),
            netmask: "255.0.0.0".to_string(),
        });

        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::InvalidNetwork { .. }
        ));

        policy.internal_networks[0] = InternalNetwork {
            network: "10.0.0".to_string(),
            netmask: "255.0.0.0".to_string(),
        };
        assert!(ConfigValidator::validate_policy(&policy).is_err());
    }

    #[test]
    fn test_bad_domain() {
        let mut policy = PolicyConfig::default();
        policy.internal_domains.push("bad domain.org".to_string());

        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::InvalidDomain { .. }
        ));
    }

    #[test]
    fn test_unknown_proxy_reference() {
        let mut policy = PolicyConfig::default();
        policy.proxies.push(proxy(Some("primary"), "127.0.0.1", 2000));
        policy
            .app_overrides
            .insert("org.example.App".to_string(), ProxyRef::Name("missing".to_string()));

        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::UnknownProxy { .. }
        ));

        policy
            .app_overrides
            .insert("org.example.App".to_string(), ProxyRef::Index(1));
        assert!(ConfigValidator::validate_policy(&policy).is_err());

        policy
            .app_overrides
            .insert("org.example.App".to_string(), ProxyRef::Index(0));
        assert!(ConfigValidator::validate_policy(&policy).is_ok());
    }

    #[test]
    fn test_blocked_domains_need_proxies() {
        let mut policy = PolicyConfig::default();
        policy.blocked_domains.domains.push("example.com".to_string());

        assert_eq!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::NoProxies {
                rule: "blocked_domains".to_string()
            }
        );
    }

    #[test]
    fn test_forced_apps_without_proxies() {
        let mut policy = PolicyConfig::default();
        policy.forced_apps.apps.push("org.example.App".to_string());

        assert!(matches!(
            validation_error(ConfigValidator::validate_policy(&policy)),
            ValidationError::NoProxies { .. }
        ));
    }

    #[test]
    fn test_bad_bypass_cidr() {
        let mut config = Config::default();
        config.bypass = Some(BypassConfig {
            networks: vec!["10.0.0.0/33".to_string()],
            localhost: true,
        });

        assert!(matches!(
            validation_error(ConfigValidator::validate(&config)),
            ValidationError::InvalidCidr { .. }
        ));
    }
}
