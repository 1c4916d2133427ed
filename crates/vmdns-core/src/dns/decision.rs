//! Reconciliation decision
//!
//! Pure classification of (VM address, local view, provider view) into
//! exactly one of Skip, Create or Update. Rules, first match wins:
//!
//! 1. local view present and different from the VM address → write
//!    (only under [`MismatchPolicy::LocalForcesUpdate`])
//! 2. provider has no value → Create
//! 3. provider value differs → Update
//! 4. otherwise → Skip
//!
//! A "write" is an Update when the provider holds a record id and a Create
//! otherwise, since an update needs an id to target.

use std::fmt;
use std::net::Ipv4Addr;

use crate::config::MismatchPolicy;
use crate::model::{DnsRecordView, RecordName};

/// What to do with the provider's record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationDecision {
    /// Already converged; no network call
    Skip,
    /// No record exists
    Create {
        fqdn: String,
        name: String,
        address: Ipv4Addr,
    },
    /// A record exists but must change
    Update {
        record_id: String,
        fqdn: String,
        name: String,
        address: Ipv4Addr,
    },
}

impl ReconciliationDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, ReconciliationDecision::Skip)
    }
}

impl fmt::Display for ReconciliationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationDecision::Skip => f.write_str("skip"),
            ReconciliationDecision::Create { fqdn, address, .. } => {
                write!(f, "create {} -> {}", fqdn, address)
            }
            ReconciliationDecision::Update {
                record_id,
                fqdn,
                address,
                ..
            } => write!(f, "update {} ({}) -> {}", fqdn, record_id, address),
        }
    }
}

/// Decide how to bring the provider's record in line with `address`
pub fn decide(
    address: Ipv4Addr,
    local_view: Option<Ipv4Addr>,
    provider_view: &DnsRecordView,
    record: &RecordName,
    policy: MismatchPolicy,
) -> ReconciliationDecision {
    let local_mismatch = local_view.is_some_and(|local| local != address);

    if local_mismatch && policy == MismatchPolicy::LocalForcesUpdate {
        return write(address, provider_view, record);
    }

    // Covers both an absent value (create) and a different one (update)
    if !provider_view.matches(address) {
        return write(address, provider_view, record);
    }

    ReconciliationDecision::Skip
}

fn write(
    address: Ipv4Addr,
    provider_view: &DnsRecordView,
    record: &RecordName,
) -> ReconciliationDecision {
    match &provider_view.record_id {
        Some(record_id) => ReconciliationDecision::Update {
            record_id: record_id.clone(),
            fqdn: record.fqdn.clone(),
            name: record.short.clone(),
            address,
        },
        None => ReconciliationDecision::Create {
            fqdn: record.fqdn.clone(),
            name: record.short.clone(),
            address,
        },
    }
}
