//! DNS state resolver
//!
//! Gathers the two independent views of a record's current value: the
//! authoritative provider (source of truth for mutations, and of the record
//! id) and the host's own resolver (an early mismatch signal only).

use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{DnsRecordView, DnsZone};
use crate::traits::{DnsProvider, LocalResolver};

pub struct DnsStateResolver<'a> {
    provider: &'a dyn DnsProvider,
    local: &'a dyn LocalResolver,
}

impl<'a> DnsStateResolver<'a> {
    pub fn new(provider: &'a dyn DnsProvider, local: &'a dyn LocalResolver) -> Self {
        Self { provider, local }
    }

    /// Resolve the zone for `domain`
    ///
    /// A pre-configured zone id skips the lookup. A provider without a
    /// matching zone is a misconfiguration: `Error::ZoneResolution`.
    pub async fn resolve_zone(&self, domain: &str, zone_id: Option<&str>) -> Result<DnsZone> {
        if let Some(id) = zone_id {
            debug!("Using pre-configured zone ID for {}", domain);
            return Ok(DnsZone {
                id: id.to_string(),
                name: domain.to_string(),
            });
        }

        match self.provider.find_zone(domain).await {
            Ok(Some(zone)) => Ok(zone),
            Ok(None) | Err(Error::NotFound(_)) => Err(Error::zone_resolution(domain)),
            Err(e) => Err(e),
        }
    }

    /// The provider's current A record for `fqdn`
    ///
    /// When the provider holds several A records for the name, the first one
    /// is managed and the rest are reported.
    pub async fn current_record(&self, zone: &DnsZone, fqdn: &str) -> Result<DnsRecordView> {
        let records = self.provider.list_a_records(zone, fqdn).await?;

        if records.len() > 1 {
            warn!(
                "{} has {} A records in zone {}; only {} is managed",
                fqdn,
                records.len(),
                zone.name,
                records[0].id
            );
        }

        Ok(records
            .first()
            .map(DnsRecordView::from)
            .unwrap_or_else(DnsRecordView::absent))
    }

    /// What the host's resolver currently answers for `fqdn`
    pub async fn local_view(&self, fqdn: &str) -> Option<Ipv4Addr> {
        self.local.lookup_ipv4(fqdn).await
    }
}
