//! Core vmdns engine
//!
//! The VmDnsEngine is responsible for:
//! - Bringing the VM up (start it, or clone it from a template and start it)
//! - Discovering its address through the prober and the polling controller
//! - Reconciling the provider's A record against that address
//! - Handing the address to the guest configuration step after a clone
//!
//! ## Architecture
//!
//! ```text
//!  prepare()        provision()        discover()           reconcile()
//! ┌──────────┐    ┌────────────┐    ┌───────────────┐    ┌───────────────────┐
//! │ zone +   │───▶│ Hypervisor │───▶│ Polling       │───▶│ DnsStateResolver  │
//! │ record   │    │ start/clone│    │ Controller    │    │ decide()          │
//! │ name     │    └────────────┘    │  └ GuestProber│    │ RecordUpserter    │
//! └──────────┘                      └───────────────┘    └───────────────────┘
//! ```
//!
//! Every stage receives what it needs as arguments ([`RunContext`], the
//! resolved address); nothing is kept in shared mutable state.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::VmdnsConfig;
use crate::dns::{DnsStateResolver, RecordUpserter, ReconciliationDecision, UpsertOutcome, decide};
use crate::error::{Error, Result};
use crate::model::{DnsZone, RecordName, VmId};
use crate::poll::PollingController;
use crate::probe::{GuestProber, NeighborPriming};
use crate::traits::{
    DnsProvider, DomainState, GuestConfigurator, Hypervisor, LocalResolver, NeighborTable,
};

/// How the VM is brought up before discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Start an existing domain (no-op if it already runs)
    Start,
    /// Clone `template` into a new domain, start it, set its hostname
    Clone { template: String },
}

impl Workflow {
    fn is_clone(&self) -> bool {
        matches!(self, Workflow::Clone { .. })
    }
}

/// Values established before the VM is touched and read by later stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub vm: VmId,
    pub zone: DnsZone,
    pub record: RecordName,
}

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub decision: ReconciliationDecision,
    pub outcome: UpsertOutcome,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub vm: VmId,
    pub address: Ipv4Addr,
    pub fqdn: String,
    pub reconciliation: Reconciliation,
    pub hostname_set: bool,
}

/// Core vmdns engine
///
/// ## Lifecycle
///
/// 1. Create with [`VmDnsEngine::new()`]
/// 2. Call [`VmDnsEngine::run()`] once per VM
///
/// The individual stages are public so callers (and tests) can run them
/// separately.
pub struct VmDnsEngine {
    hypervisor: Arc<dyn Hypervisor>,
    neighbors: Arc<dyn NeighborTable>,
    provider: Box<dyn DnsProvider>,
    resolver: Box<dyn LocalResolver>,
    guest: Box<dyn GuestConfigurator>,
    config: VmdnsConfig,
}

impl VmDnsEngine {
    /// Create a new engine
    ///
    /// # Errors
    ///
    /// `Error::Config` if `config` does not validate.
    pub fn new(
        hypervisor: Arc<dyn Hypervisor>,
        neighbors: Arc<dyn NeighborTable>,
        provider: Box<dyn DnsProvider>,
        resolver: Box<dyn LocalResolver>,
        guest: Box<dyn GuestConfigurator>,
        config: VmdnsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            hypervisor,
            neighbors,
            provider,
            resolver,
            guest,
            config,
        })
    }

    pub fn config(&self) -> &VmdnsConfig {
        &self.config
    }

    /// Run the full workflow for `vm`
    pub async fn run(&self, vm: &VmId, workflow: &Workflow) -> Result<RunReport> {
        let ctx = self.prepare(vm).await?;
        self.provision(vm, workflow).await?;
        let address = self.discover(vm, workflow).await?;
        let reconciliation = self.reconcile(&ctx, address).await?;

        let hostname_set = if workflow.is_clone() {
            self.configure_guest(&ctx, address).await?
        } else {
            false
        };

        Ok(RunReport {
            vm: vm.clone(),
            address,
            fqdn: ctx.record.fqdn.clone(),
            reconciliation,
            hostname_set,
        })
    }

    /// Resolve the zone and derive the record name
    ///
    /// Runs before anything touches the VM so a misconfigured domain fails
    /// the run without side effects.
    pub async fn prepare(&self, vm: &VmId) -> Result<RunContext> {
        let domain = self.config.provider.domain();
        let resolver = DnsStateResolver::new(self.provider.as_ref(), self.resolver.as_ref());
        let zone = resolver
            .resolve_zone(domain, self.config.provider.zone_id())
            .await?;
        info!("Using zone {} ({})", zone.name, zone.id);

        Ok(RunContext {
            vm: vm.clone(),
            record: RecordName::derive(vm, domain),
            zone,
        })
    }

    /// Start the VM, cloning it first for [`Workflow::Clone`]
    pub async fn provision(&self, vm: &VmId, workflow: &Workflow) -> Result<()> {
        match workflow {
            Workflow::Start => match self.hypervisor.domain_state(vm).await? {
                DomainState::Running => {
                    info!("VM {} is already running", vm);
                    Ok(())
                }
                state => {
                    info!("Starting VM {} (state: {:?})", vm, state);
                    self.hypervisor.start_domain(vm).await
                }
            },
            Workflow::Clone { template } => {
                info!("Cloning {} from template {}", vm, template);
                let mac = self.hypervisor.clone_domain(template, vm).await?;
                info!("Clone {} created with MAC {}", vm, mac);
                info!("Starting VM {}", vm);
                self.hypervisor.start_domain(vm).await
            }
        }
    }

    /// Poll the prober until the VM reports an address
    pub async fn discover(&self, vm: &VmId, workflow: &Workflow) -> Result<Ipv4Addr> {
        let priming = self.priming_for(workflow)?;
        let prober = GuestProber::standard(
            self.hypervisor.clone(),
            self.neighbors.clone(),
            priming,
        );
        debug!("Discovery strategies: {}", prober.strategy_names().join(", "));

        PollingController::from_config(&self.config.engine)
            .resolve(&prober, vm)
            .await
    }

    fn priming_for(&self, workflow: &Workflow) -> Result<Option<NeighborPriming>> {
        if !workflow.is_clone() {
            return Ok(None);
        }
        Ok(self.config.host.sweep_subnet()?.map(|subnet| NeighborPriming {
            subnet,
            settle: Duration::from_secs(self.config.host.sweep_settle_secs),
        }))
    }

    /// Compare `address` against both DNS views and apply the decision
    ///
    /// A mutation can land even when its reply is lost. Every retry re-reads
    /// the provider record and decides again.
    pub async fn reconcile(&self, ctx: &RunContext, address: Ipv4Addr) -> Result<Reconciliation> {
        let fqdn = &ctx.record.fqdn;
        let resolver = DnsStateResolver::new(self.provider.as_ref(), self.resolver.as_ref());

        let local_view = resolver.local_view(fqdn).await;
        match local_view {
            Some(local) if local != address => {
                info!("Local DNS answers {} for {}, VM has {}", local, fqdn, address)
            }
            Some(local) => debug!("Local DNS answers {} for {}", local, fqdn),
            None => debug!("Local DNS has no answer for {}", fqdn),
        }

        let upserter = RecordUpserter::new(self.provider.as_ref(), &ctx.zone, &self.config.engine);
        let max_retries = self.config.engine.max_retries;
        let delay = Duration::from_secs(self.config.engine.retry_delay_secs);

        let mut attempt = 0;
        loop {
            let result = match self.plan(&resolver, ctx, address, local_view).await {
                Ok(decision) => upserter
                    .apply(&decision)
                    .await
                    .map(|outcome| Reconciliation { decision, outcome }),
                Err(e) => Err(e),
            };

            match result {
                Ok(reconciliation) => return Ok(reconciliation),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        "DNS reconciliation failed ({}), retry {}/{} in {}s",
                        e,
                        attempt,
                        max_retries,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the provider record and decide against it
    async fn plan(
        &self,
        resolver: &DnsStateResolver<'_>,
        ctx: &RunContext,
        address: Ipv4Addr,
        local_view: Option<Ipv4Addr>,
    ) -> Result<ReconciliationDecision> {
        let fqdn = &ctx.record.fqdn;
        let provider_view = resolver.current_record(&ctx.zone, fqdn).await?;
        debug!("Provider view of {}: {:?}", fqdn, provider_view);

        let decision = decide(
            address,
            local_view,
            &provider_view,
            &ctx.record,
            self.config.engine.mismatch_policy,
        );
        info!("Decision for {}: {}", fqdn, decision);
        Ok(decision)
    }

    /// Set the guest hostname; returns whether it was actually changed
    async fn configure_guest(&self, ctx: &RunContext, address: Ipv4Addr) -> Result<bool> {
        let hostname = &ctx.record.short;
        if self.config.engine.dry_run {
            info!("[DRY-RUN] Would set hostname of {} to {}", address, hostname);
            return Ok(false);
        }

        info!("Setting hostname of {} to {}", address, hostname);
        self.guest
            .set_hostname(address, hostname)
            .await
            .map_err(|e| match e {
                Error::GuestConfiguration { .. } => e,
                other => Error::guest(address.to_string(), other.to_string()),
            })?;
        info!("Hostname set; {} is rebooting", ctx.vm);
        Ok(true)
    }
}
