// # Host-side Traits
//
// Interfaces for the host's neighbor cache, its name resolution and the
// remote guest configuration channel.
//
// ## Implementations
//
// - `ip neigh` / `ping` / `ssh`: `vmdns-host-libvirt` crate
// - `SystemResolver` (below): the host's standard resolver via tokio

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};

/// One row of the host's IP neighbor table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub address: IpAddr,
    /// Link-layer address, lower-case; absent for FAILED/INCOMPLETE entries
    pub mac: Option<String>,
    pub device: Option<String>,
    pub state: Option<String>,
}

impl NeighborEntry {
    /// Whether this entry maps `mac` (compared case-insensitively)
    pub fn has_mac(&self, mac: &str) -> bool {
        self.mac
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(mac))
    }
}

/// Trait for reading (and priming) the host's neighbor cache
#[async_trait]
pub trait NeighborTable: Send + Sync {
    /// Current neighbor entries
    async fn entries(&self) -> Result<Vec<NeighborEntry>, crate::Error>;

    /// Fire-and-forget probes of `targets` to populate the cache
    ///
    /// Must return without waiting for any probe to finish. Outcomes of
    /// individual probes are discarded.
    fn prime(&self, targets: &[Ipv4Addr]);
}

/// Trait for the host's standard name resolution
#[async_trait]
pub trait LocalResolver: Send + Sync {
    /// First IPv4 address `hostname` resolves to; resolution failure is absence
    async fn lookup_ipv4(&self, hostname: &str) -> Option<Ipv4Addr>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl LocalResolver for SystemResolver {
    async fn lookup_ipv4(&self, hostname: &str) -> Option<Ipv4Addr> {
        match tokio::net::lookup_host((hostname, 0)).await {
            Ok(addrs) => addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(v4) => Some(v4),
                    IpAddr::V6(_) => None,
                })
                .next(),
            Err(e) => {
                tracing::debug!("Local resolution of {} failed: {}", hostname, e);
                None
            }
        }
    }
}

/// Trait for the post-resolution guest configuration step
#[async_trait]
pub trait GuestConfigurator: Send + Sync {
    /// Set the guest's hostname and restart it
    async fn set_hostname(&self, address: Ipv4Addr, hostname: &str) -> Result<(), crate::Error>;
}
