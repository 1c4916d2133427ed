//! The four discovery strategies
//!
//! Every strategy swallows collaborator errors (logged at debug) and reports
//! absence instead: during boot each channel is expected to be blind for a
//! while, and the polling controller will simply ask again.

use async_trait::async_trait;
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{DiscoveryStrategy, first_usable_ipv4, is_usable, parse};
use crate::model::{SweepSubnet, VmId};
use crate::traits::{GuestInterface, Hypervisor, IpType, NeighborTable};

fn ipv4_candidates(interfaces: &[GuestInterface]) -> impl Iterator<Item = &str> {
    interfaces
        .iter()
        .flat_map(|iface| iface.addresses.iter())
        .filter(|addr| addr.ip_type == IpType::Ipv4)
        .map(|addr| addr.address.as_str())
}

/// Strategy 1: interface addresses reported by the guest agent
pub struct AgentInterfaceStrategy {
    hypervisor: Arc<dyn Hypervisor>,
}

impl AgentInterfaceStrategy {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl DiscoveryStrategy for AgentInterfaceStrategy {
    fn name(&self) -> &'static str {
        "agent-interfaces"
    }

    async fn discover(&self, vm: &VmId) -> Option<Ipv4Addr> {
        match self.hypervisor.domain_interfaces(vm, true).await {
            Ok(interfaces) => first_usable_ipv4(ipv4_candidates(&interfaces)),
            Err(e) => {
                debug!("{}: agent interface query failed: {}", vm, e);
                None
            }
        }
    }
}

/// Strategy 2: interface addresses from the hypervisor's lease tracking
///
/// Lower fidelity than the agent view but needs no cooperation from the guest.
pub struct LeaseInterfaceStrategy {
    hypervisor: Arc<dyn Hypervisor>,
}

impl LeaseInterfaceStrategy {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl DiscoveryStrategy for LeaseInterfaceStrategy {
    fn name(&self) -> &'static str {
        "lease-interfaces"
    }

    async fn discover(&self, vm: &VmId) -> Option<Ipv4Addr> {
        match self.hypervisor.domain_interfaces(vm, false).await {
            Ok(interfaces) => first_usable_ipv4(ipv4_candidates(&interfaces)),
            Err(e) => {
                debug!("{}: lease interface query failed: {}", vm, e);
                None
            }
        }
    }
}

/// Strategy 3: full interface enumeration through the guest agent
///
/// Only attempted when the agent answers a liveness ping.
pub struct AgentNetworkStrategy {
    hypervisor: Arc<dyn Hypervisor>,
}

impl AgentNetworkStrategy {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl DiscoveryStrategy for AgentNetworkStrategy {
    fn name(&self) -> &'static str {
        "agent-network-json"
    }

    async fn discover(&self, vm: &VmId) -> Option<Ipv4Addr> {
        if !self.hypervisor.guest_agent_ping(vm).await {
            debug!("{}: guest agent not answering", vm);
            return None;
        }

        let command = json!({ "execute": "guest-network-get-interfaces" });
        match self.hypervisor.guest_agent_exec(vm, &command).await {
            Ok(reply) => first_usable_ipv4(parse::agent_ipv4_addresses(&reply)),
            Err(e) => {
                debug!("{}: guest-network-get-interfaces failed: {}", vm, e);
                None
            }
        }
    }
}

/// Ping sweep performed before a neighbor-table lookup misses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborPriming {
    pub subnet: SweepSubnet,
    pub settle: Duration,
}

/// Strategy 4: the VM's MAC address looked up in the host neighbor table
///
/// Only works once the host has exchanged traffic with the guest. With
/// priming enabled, a lookup miss triggers a ping sweep of the subnet, a
/// fixed settle delay and a second lookup.
pub struct NeighborTableStrategy {
    hypervisor: Arc<dyn Hypervisor>,
    neighbors: Arc<dyn NeighborTable>,
    priming: Option<NeighborPriming>,
}

impl NeighborTableStrategy {
    pub fn new(
        hypervisor: Arc<dyn Hypervisor>,
        neighbors: Arc<dyn NeighborTable>,
        priming: Option<NeighborPriming>,
    ) -> Self {
        Self {
            hypervisor,
            neighbors,
            priming,
        }
    }

    async fn lookup(&self, vm: &VmId, macs: &[String]) -> Option<Ipv4Addr> {
        let entries = match self.neighbors.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("{}: neighbor table read failed: {}", vm, e);
                return None;
            }
        };

        macs.iter().find_map(|mac| {
            entries
                .iter()
                .filter(|entry| entry.has_mac(mac))
                .find_map(|entry| match entry.address {
                    IpAddr::V4(v4) if is_usable(v4) => Some(v4),
                    _ => None,
                })
        })
    }
}

#[async_trait]
impl DiscoveryStrategy for NeighborTableStrategy {
    fn name(&self) -> &'static str {
        "neighbor-table"
    }

    async fn discover(&self, vm: &VmId) -> Option<Ipv4Addr> {
        let xml = match self.hypervisor.domain_definition_xml(vm).await {
            Ok(xml) => xml,
            Err(e) => {
                debug!("{}: domain definition unavailable: {}", vm, e);
                return None;
            }
        };

        let macs = parse::mac_addresses(&xml);
        if macs.is_empty() {
            debug!("{}: no MAC address in domain definition", vm);
            return None;
        }

        if let Some(addr) = self.lookup(vm, &macs).await {
            return Some(addr);
        }

        let priming = self.priming?;
        let targets = priming.subnet.hosts();
        debug!(
            "{}: priming neighbor cache with {} pings on {}",
            vm,
            targets.len(),
            priming.subnet
        );
        self.neighbors.prime(&targets);
        tokio::time::sleep(priming.settle).await;

        self.lookup(vm, &macs).await
    }
}
