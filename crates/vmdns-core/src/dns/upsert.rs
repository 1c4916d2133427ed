//! Record upsert
//!
//! Turns a [`ReconciliationDecision`] into at most one provider mutation.
//! Skip never touches the network. Retries are not done here; the engine
//! repeats `apply` for retryable errors.

use std::net::Ipv4Addr;
use tracing::info;

use crate::config::EngineConfig;
use crate::dns::ReconciliationDecision;
use crate::error::Result;
use crate::model::{DnsRecordView, DnsZone};
use crate::traits::{DnsProvider, RecordPayload};

/// Result of applying a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Nothing to do
    Skipped,
    /// Record created with the returned id
    Created { record_id: String },
    /// Record updated
    Updated { record_id: String },
    /// Dry-run: the mutation was logged, not sent
    DryRun,
}

pub struct RecordUpserter<'a> {
    provider: &'a dyn DnsProvider,
    zone: &'a DnsZone,
    ttl: u32,
    proxied: bool,
    dry_run: bool,
}

impl<'a> RecordUpserter<'a> {
    pub fn new(provider: &'a dyn DnsProvider, zone: &'a DnsZone, config: &EngineConfig) -> Self {
        Self {
            provider,
            zone,
            ttl: config.record_ttl,
            proxied: config.proxied,
            dry_run: config.dry_run,
        }
    }

    fn payload(&self, name: &str, address: Ipv4Addr) -> RecordPayload {
        RecordPayload {
            record_type: DnsRecordView::RECORD_TYPE,
            name: name.to_string(),
            content: address.to_string(),
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }

    /// Apply `decision` against the provider
    pub async fn apply(&self, decision: &ReconciliationDecision) -> Result<UpsertOutcome> {
        match decision {
            ReconciliationDecision::Skip => Ok(UpsertOutcome::Skipped),

            ReconciliationDecision::Create {
                fqdn,
                name,
                address,
            } => {
                let payload = self.payload(name, *address);
                if self.dry_run {
                    info!(
                        "[DRY-RUN] Would create {} in zone {} with payload: {}",
                        fqdn,
                        self.zone.name,
                        serde_json::to_string(&payload)?
                    );
                    return Ok(UpsertOutcome::DryRun);
                }

                info!("Creating DNS record {} -> {}", fqdn, address);
                let record = self.provider.create_a_record(self.zone, &payload).await?;
                info!("DNS record created: {} -> {} (id {})", fqdn, address, record.id);
                Ok(UpsertOutcome::Created {
                    record_id: record.id,
                })
            }

            ReconciliationDecision::Update {
                record_id,
                fqdn,
                name,
                address,
            } => {
                let payload = self.payload(name, *address);
                if self.dry_run {
                    info!(
                        "[DRY-RUN] Would update {} (id {}) with payload: {}",
                        fqdn,
                        record_id,
                        serde_json::to_string(&payload)?
                    );
                    return Ok(UpsertOutcome::DryRun);
                }

                info!("Updating DNS record {} -> {}", fqdn, address);
                self.provider
                    .update_a_record(self.zone, record_id, &payload)
                    .await?;
                info!("DNS record updated: {} -> {}", fqdn, address);
                Ok(UpsertOutcome::Updated {
                    record_id: record_id.clone(),
                })
            }
        }
    }
}
