// # vmdns-core
//
// Core library for bringing a VM up and publishing its address in DNS.
//
// ## Architecture Overview
//
// This library provides the core functionality for VM address publication:
// - **Hypervisor**: Trait for starting, cloning and inspecting domains
// - **NeighborTable / LocalResolver / GuestConfigurator**: Host-side collaborators
// - **GuestProber**: Ordered discovery strategies for a guest's IPv4 address
// - **PollingController**: Bounded, fixed-delay polling of a prober
// - **DnsProvider**: Trait for reading and writing A records via provider APIs
// - **VmDnsEngine**: Core engine that orchestrates provision → discover → reconcile
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from host and provider implementations
// 2. **Pure Decisions**: Whether to write a record is decided without I/O
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A converged record is never written

pub mod traits;
pub mod model;
pub mod probe;
pub mod poll;
pub mod dns;
pub mod engine;
pub mod registry;
pub mod config;
pub mod credentials;
pub mod error;

// Re-export core types for convenience
pub use traits::{
    DnsProvider, DnsProviderFactory, GuestConfigurator, Hypervisor, LocalResolver, NeighborTable,
    SystemResolver,
};
pub use model::{DnsRecord, DnsRecordView, DnsZone, RecordName, SweepSubnet, VmId};
pub use probe::{DiscoveryStrategy, GuestProber, Probe};
pub use poll::PollingController;
pub use dns::{ReconciliationDecision, UpsertOutcome};
pub use engine::{RunReport, VmDnsEngine, Workflow};
pub use registry::ProviderRegistry;
pub use config::{EngineConfig, HostConfig, MismatchPolicy, ProviderConfig, VmdnsConfig};
pub use error::{Error, Result};
