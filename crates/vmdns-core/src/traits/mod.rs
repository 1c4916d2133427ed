//! Collaborator traits for vmdns
//!
//! The core only talks to the outside world through these interfaces.
//!
//! - [`Hypervisor`]: domain control and guest introspection
//! - [`NeighborTable`]: the host's IP neighbor (ARP) cache
//! - [`DnsProvider`]: the authoritative DNS provider API
//! - [`LocalResolver`]: the host's standard name resolution
//! - [`GuestConfigurator`]: post-resolution hostname change on the guest

pub mod hypervisor;
pub mod host;
pub mod dns_provider;

pub use hypervisor::{DomainState, GuestInterface, Hypervisor, InterfaceAddress, IpType};
pub use host::{GuestConfigurator, LocalResolver, NeighborEntry, NeighborTable, SystemResolver};
pub use dns_provider::{DnsProvider, DnsProviderFactory, RecordPayload};
