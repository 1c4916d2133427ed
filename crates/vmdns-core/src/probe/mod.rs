//! Guest network prober
//!
//! Finds a booting guest's IPv4 address by trying an ordered list of
//! discovery strategies. Each strategy observes the guest through a different
//! channel (guest agent, hypervisor lease tracking, host neighbor cache), and
//! any of them may be blind for a while during boot.
//!
//! ## Ordering
//!
//! ```text
//! 1. agent-interfaces     guest agent, interface list
//! 2. lease-interfaces     hypervisor DHCP lease view, no agent needed
//! 3. agent-network-json   agent ping + guest-network-get-interfaces
//! 4. neighbor-table       MAC from domain XML → host ARP cache
//! ```
//!
//! The first strategy that yields a usable address wins; later strategies are
//! not invoked. A strategy that fails yields absence, never an error.

pub mod parse;
pub mod strategies;

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

use crate::model::VmId;
use crate::traits::{Hypervisor, NeighborTable};

pub use strategies::{
    AgentInterfaceStrategy, AgentNetworkStrategy, LeaseInterfaceStrategy, NeighborPriming,
    NeighborTableStrategy,
};

/// One way of observing a guest's address
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name used in progress lines
    fn name(&self) -> &'static str;

    /// Attempt discovery; `None` on any failure or when nothing usable is seen
    async fn discover(&self, vm: &VmId) -> Option<Ipv4Addr>;
}

/// Anything that can be polled for a guest address
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, vm: &VmId) -> Option<Ipv4Addr>;
}

/// Address found by a probe and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHit {
    pub address: Ipv4Addr,
    pub strategy: &'static str,
}

/// Ordered list of discovery strategies
pub struct GuestProber {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl GuestProber {
    /// Create a prober over `strategies`, tried in the given order
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard four-strategy chain
    ///
    /// `priming` enables the ping sweep before the neighbor-table lookup.
    pub fn standard(
        hypervisor: Arc<dyn Hypervisor>,
        neighbors: Arc<dyn NeighborTable>,
        priming: Option<NeighborPriming>,
    ) -> Self {
        Self::new(vec![
            Box::new(AgentInterfaceStrategy::new(hypervisor.clone())),
            Box::new(LeaseInterfaceStrategy::new(hypervisor.clone())),
            Box::new(AgentNetworkStrategy::new(hypervisor.clone())),
            Box::new(NeighborTableStrategy::new(hypervisor, neighbors, priming)),
        ])
    }

    /// Names of the configured strategies, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies in order and stop at the first hit
    pub async fn probe_detailed(&self, vm: &VmId) -> Option<ProbeHit> {
        for strategy in &self.strategies {
            match strategy.discover(vm).await {
                Some(address) => {
                    debug!("{}: {} reported {}", vm, strategy.name(), address);
                    return Some(ProbeHit {
                        address,
                        strategy: strategy.name(),
                    });
                }
                None => debug!("{}: {} found nothing", vm, strategy.name()),
            }
        }
        None
    }
}

#[async_trait]
impl Probe for GuestProber {
    async fn probe(&self, vm: &VmId) -> Option<Ipv4Addr> {
        self.probe_detailed(vm).await.map(|hit| hit.address)
    }
}

/// First candidate that parses as a usable IPv4 address
///
/// Candidates may carry a `/prefix` suffix. Loopback (127.0.0.0/8) and the
/// unspecified address are never usable: some channels report them next to
/// the real address.
pub fn first_usable_ipv4<I, S>(candidates: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates.into_iter().find_map(|candidate| {
        let raw = candidate.as_ref().trim();
        let host = raw.split_once('/').map_or(raw, |(host, _)| host);
        host.parse::<Ipv4Addr>()
            .ok()
            .filter(|addr| is_usable(*addr))
    })
}

/// Whether `addr` may be reported as a guest address
pub fn is_usable(addr: Ipv4Addr) -> bool {
    !addr.is_loopback() && !addr.is_unspecified()
}
