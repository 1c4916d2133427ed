// # Hypervisor Trait
//
// Defines the interface to the hypervisor control plane and to the guest
// agent channel.
//
// ## Implementations
//
// - virsh / virt-clone: `vmdns-host-libvirt` crate
//
// ## Failure model
//
// Control operations (`start_domain`, `clone_domain`) return errors that end
// the run. Introspection operations used by discovery strategies may fail at
// any time while a guest boots; the prober treats those failures as absence.

use async_trait::async_trait;

use crate::model::VmId;

/// Coarse run state of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    Running,
    Stopped,
    /// Paused, crashed, in transition, or unparseable
    Unknown,
}

/// Address family reported for an interface address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpType {
    Ipv4,
    Ipv6,
}

/// One address on a guest interface, as reported (may carry a `/prefix`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub ip_type: IpType,
    pub address: String,
}

impl InterfaceAddress {
    pub fn new(ip_type: IpType, address: impl Into<String>) -> Self {
        Self {
            ip_type,
            address: address.into(),
        }
    }
}

/// A guest network interface and its addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInterface {
    pub name: String,
    pub addresses: Vec<InterfaceAddress>,
}

/// Trait for hypervisor implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Current run state of the domain
    async fn domain_state(&self, vm: &VmId) -> Result<DomainState, crate::Error>;

    /// Start a defined, stopped domain
    async fn start_domain(&self, vm: &VmId) -> Result<(), crate::Error>;

    /// Clone `template` into a new domain named `new_name`
    ///
    /// # Returns
    ///
    /// The MAC address assigned to the clone's first interface
    async fn clone_domain(&self, template: &str, new_name: &VmId) -> Result<String, crate::Error>;

    /// Interface addresses as seen by the guest agent (`via_agent = true`) or
    /// by the hypervisor's own lease tracking (`via_agent = false`)
    async fn domain_interfaces(
        &self,
        vm: &VmId,
        via_agent: bool,
    ) -> Result<Vec<GuestInterface>, crate::Error>;

    /// The domain's XML definition
    async fn domain_definition_xml(&self, vm: &VmId) -> Result<String, crate::Error>;

    /// Whether the guest agent answers a liveness ping
    async fn guest_agent_ping(&self, vm: &VmId) -> bool;

    /// Send a raw guest agent command and return its parsed JSON reply
    async fn guest_agent_exec(
        &self,
        vm: &VmId,
        command: &serde_json::Value,
    ) -> Result<serde_json::Value, crate::Error>;
}
