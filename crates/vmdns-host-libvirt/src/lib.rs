// # vmdns Host Integrations (libvirt, Linux)
//
// Implementations of the vmdns-core host traits on top of the standard
// command-line tools of a KVM host:
//
// - `VirshHypervisor`: `virsh` and `virt-clone` against a libvirt URI
// - `IpNeighborTable`: `ip neigh` reads, `ping` sweeps to prime the cache
// - `SshGuestConfigurator`: hostname change + reboot over `ssh`
//
// ## Platform Requirements
//
// - Linux with iproute2 and iputils
// - libvirt client tools (`virsh`, `virt-clone`)
// - `qemu-guest-agent` inside guests for the agent discovery channels
//
// Every command runs with stdin closed and is killed if its future is
// dropped, so no child outlives the run.

pub mod command;
pub mod neighbor;
pub mod parse;
pub mod ssh;
pub mod virsh;

pub use command::CommandError;
pub use neighbor::IpNeighborTable;
pub use ssh::SshGuestConfigurator;
pub use virsh::VirshHypervisor;
