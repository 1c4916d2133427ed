//! Value types shared by the prober, the DNS resolver and the engine
//!
//! Everything here is owned by a single run: nothing is persisted between
//! invocations except what the DNS provider itself stores.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Name of a VM as known to the hypervisor
///
/// By convention this is also the left-hand label of the VM's DNS name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmId(String);

impl VmId {
    /// Create a VM identifier, rejecting empty or whitespace-only names
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_input("VM name cannot be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::invalid_input(format!(
                "VM name cannot contain whitespace: '{}'",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VmId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A provider zone, resolved once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    /// Provider-specific zone identifier
    pub id: String,
    /// Domain name of the zone (e.g. "example.com")
    pub name: String,
}

/// An A record as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record identifier
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record content (the address)
    pub content: String,
    /// Time-to-live in seconds, if reported
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Whether the provider proxies traffic for this record, if reported
    #[serde(default)]
    pub proxied: Option<bool>,
}

/// The authoritative provider's view of one A record
///
/// `record_id` is required to update and absent when the record must be
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsRecordView {
    pub record_id: Option<String>,
    pub current_value: Option<String>,
}

impl DnsRecordView {
    /// DNS record type this view describes; only A records are managed
    pub const RECORD_TYPE: &'static str = "A";

    /// View of a record the provider does not have
    pub fn absent() -> Self {
        Self::default()
    }

    /// View of an existing record
    pub fn existing(record_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            record_id: Some(record_id.into()),
            current_value: Some(value.into()),
        }
    }

    /// Whether the provider's value already equals `address`
    pub fn matches(&self, address: Ipv4Addr) -> bool {
        self.current_value
            .as_deref()
            .is_some_and(|value| value.trim() == address.to_string())
    }
}

impl From<&DnsRecord> for DnsRecordView {
    fn from(record: &DnsRecord) -> Self {
        Self::existing(record.id.clone(), record.content.clone())
    }
}

/// Short record name and FQDN derived from a VM identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordName {
    /// Name relative to the zone (e.g. "web1")
    pub short: String,
    /// Fully qualified name (e.g. "web1.example.com")
    pub fqdn: String,
}

impl RecordName {
    /// Derive the record name for `vm` inside `domain`
    ///
    /// An identifier that already ends with `.{domain}` is used as the FQDN
    /// unchanged and the suffix is stripped for the short name. Any other
    /// identifier becomes the short name verbatim with the domain appended.
    pub fn derive(vm: &VmId, domain: &str) -> Self {
        let domain = domain.trim().trim_end_matches('.');
        let id = vm.as_str();
        let suffix_len = domain.len() + 1;

        if id.len() > suffix_len && id.is_char_boundary(id.len() - suffix_len) {
            let split = id.len() - suffix_len;
            let (head, tail) = id.split_at(split);
            if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(domain) {
                return Self {
                    short: head.to_string(),
                    fqdn: id.to_string(),
                };
            }
        }

        Self {
            short: id.to_string(),
            fqdn: format!("{}.{}", id, domain),
        }
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn)
    }
}

/// An IPv4 subnet swept to populate the host's neighbor cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSubnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl SweepSubnet {
    /// Smallest prefix accepted; keeps a sweep at most 65534 pings
    pub const MIN_PREFIX: u8 = 16;
    /// Largest prefix accepted; a /31 or /32 has no host range to sweep
    pub const MAX_PREFIX: u8 = 30;

    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if !(Self::MIN_PREFIX..=Self::MAX_PREFIX).contains(&prefix_len) {
            return Err(Error::invalid_input(format!(
                "Sweep subnet prefix must be between /{} and /{}. Got: /{}",
                Self::MIN_PREFIX,
                Self::MAX_PREFIX,
                prefix_len
            )));
        }
        let mask = u32::MAX << (32 - prefix_len);
        Ok(Self {
            network: Ipv4Addr::from(u32::from(address) & mask),
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// All host addresses (network and broadcast excluded)
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        let base = u32::from(self.network);
        let size = 1u32 << (32 - self.prefix_len);
        (1..size - 1).map(|offset| Ipv4Addr::from(base + offset)).collect()
    }
}

impl FromStr for SweepSubnet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::invalid_input(format!("Subnet must be in CIDR form: '{}'", s)))?;
        let address: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid subnet address: '{}'", addr)))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid subnet prefix: '{}'", prefix)))?;
        Self::new(address, prefix_len)
    }
}

impl fmt::Display for SweepSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}
