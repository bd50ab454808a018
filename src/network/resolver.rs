use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;

use crate::core::{Error, Result};

/// Resolves a probe target to an IPv4 address
///
/// Dotted-quad literals are returned as-is; anything else goes through the
/// system resolver configuration and the first IPv4 answer wins.
pub async fn resolve_target(target: &str) -> Result<Ipv4Addr> {
    let target = target.trim();

    if let Ok(addr) = target.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    if target.parse::<Ipv6Addr>().is_ok() {
        return Err(Error::resolve(format!(
            "IPv6 targets are not supported: {}",
            target
        )));
    }

    if target.is_empty() {
        return Err(Error::resolve("Empty target"));
    }

    let resolver = TokioAsyncResolver::tokio_from_system_conf()
        .map_err(|e| Error::resolve(format!("Failed to load resolver configuration: {}", e)))?;

    let lookup = resolver
        .lookup_ip(target)
        .await
        .map_err(|e| Error::resolve(format!("Failed to resolve {}: {}", target, e)))?;

    let addr = lookup
        .iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::resolve(format!("No IPv4 address for {}", target)))?;

    debug!(host = target, %addr, "resolved target");
    Ok(addr)
}
