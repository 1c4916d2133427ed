//! Parsers for the text output of virsh and iproute2

use std::net::IpAddr;
use vmdns_core::traits::{DomainState, GuestInterface, InterfaceAddress, IpType, NeighborEntry};

/// Parse `virsh domstate` output
pub fn domain_state(output: &str) -> DomainState {
    match output.trim() {
        "running" | "idle" => DomainState::Running,
        "shut off" | "crashed" => DomainState::Stopped,
        _ => DomainState::Unknown,
    }
}

/// Parse the table printed by `virsh domifaddr`
///
/// ```text
///  Name       MAC address          Protocol     Address
/// -------------------------------------------------------------------------------
///  lo         00:00:00:00:00:00    ipv4         127.0.0.1/8
///  -          -                    ipv6         ::1/128
///  enp1s0     52:54:00:ab:cd:ef    ipv4         192.168.122.45/24
/// ```
///
/// A `-` in the name column continues the previous interface.
pub fn domifaddr(output: &str) -> Vec<GuestInterface> {
    let mut interfaces: Vec<GuestInterface> = Vec::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, _mac, protocol, address] = fields[..] else {
            continue;
        };

        let ip_type = match protocol {
            "ipv4" => IpType::Ipv4,
            "ipv6" => IpType::Ipv6,
            _ => continue,
        };
        let entry = InterfaceAddress::new(ip_type, address);

        match (name, interfaces.last_mut()) {
            ("-", Some(current)) => current.addresses.push(entry),
            ("-", None) => continue,
            _ => interfaces.push(GuestInterface {
                name: name.to_string(),
                addresses: vec![entry],
            }),
        }
    }

    interfaces
}

/// Parse `ip neigh show` output
///
/// ```text
/// 192.168.122.45 dev virbr0 lladdr 52:54:00:ab:cd:ef REACHABLE
/// 192.168.122.9 dev virbr0 FAILED
/// ```
pub fn neighbor_entries(output: &str) -> Vec<NeighborEntry> {
    output.lines().filter_map(neighbor_entry).collect()
}

fn neighbor_entry(line: &str) -> Option<NeighborEntry> {
    let mut tokens = line.split_whitespace();
    let address: IpAddr = tokens.next()?.parse().ok()?;

    let mut entry = NeighborEntry {
        address,
        mac: None,
        device: None,
        state: None,
    };

    while let Some(token) = tokens.next() {
        match token {
            "dev" => entry.device = tokens.next().map(str::to_string),
            "lladdr" => entry.mac = tokens.next().map(str::to_ascii_lowercase),
            state if state.chars().all(|c| c.is_ascii_uppercase()) => {
                entry.state = Some(state.to_string())
            }
            _ => {}
        }
    }

    Some(entry)
}
