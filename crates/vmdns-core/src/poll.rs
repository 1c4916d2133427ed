//! Polling controller
//!
//! Drives a [`Probe`] in a bounded loop with a fixed delay between empty
//! probes. No backoff: the budget (12 × 10s by default) matches the boot wait
//! of a freshly started guest. There is no cancellation path once polling
//! starts; a caller wanting one wraps the future externally.

use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::VmId;
use crate::probe::Probe;

/// State of one polling iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// Attempt budget
    pub max_attempts: u32,
    /// Address seen by this attempt, if any
    pub resolved: Option<Ipv4Addr>,
}

impl DiscoveryAttempt {
    fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Bounded, fixed-interval retry loop around a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingController {
    max_attempts: u32,
    delay: Duration,
}

impl PollingController {
    /// Default probe budget
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;

    /// Default delay between empty probes
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

    /// Create a controller; a zero budget is raised to one probe
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.poll_delay_secs),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Probe until an address appears or the budget is spent
    ///
    /// # Returns
    ///
    /// - `Ok(addr)`: as soon as a probe yields an address
    /// - `Err(Error::DiscoveryTimeout)`: after `max_attempts` empty probes
    pub async fn resolve(&self, probe: &dyn Probe, vm: &VmId) -> Result<Ipv4Addr> {
        let mut attempt = DiscoveryAttempt {
            attempt: 0,
            max_attempts: self.max_attempts,
            resolved: None,
        };

        loop {
            attempt.attempt += 1;
            attempt.resolved = probe.probe(vm).await;

            if let Some(addr) = attempt.resolved {
                info!(
                    "VM {} has address {} (attempt {}/{})",
                    vm, addr, attempt.attempt, attempt.max_attempts
                );
                return Ok(addr);
            }

            if attempt.is_last() {
                return Err(Error::DiscoveryTimeout {
                    vm: vm.to_string(),
                    attempts: attempt.attempt,
                });
            }

            info!(
                "Waiting for {} to report an address ({}/{}), retrying in {}s",
                vm,
                attempt.attempt,
                attempt.max_attempts,
                self.delay.as_secs()
            );
            debug!("{:?}", attempt);
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for PollingController {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}
