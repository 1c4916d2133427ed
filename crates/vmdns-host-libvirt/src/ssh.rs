//! Guest hostname configuration over SSH

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};
use vmdns_core::traits::GuestConfigurator;
use vmdns_core::{Error, Result};

use crate::command::execute;

const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Sets the hostname with `hostnamectl` and reboots the guest
#[derive(Debug, Clone)]
pub struct SshGuestConfigurator {
    user: String,
    identity: Option<PathBuf>,
}

impl SshGuestConfigurator {
    pub fn new(user: impl Into<String>, identity: Option<PathBuf>) -> Self {
        Self {
            user: user.into(),
            identity,
        }
    }

    fn ssh(&self, address: Ipv4Addr) -> Command {
        let mut command = Command::new("ssh");
        command
            .args(["-o", "BatchMode=yes"])
            .args(["-o", "StrictHostKeyChecking=accept-new"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", CONNECT_TIMEOUT_SECS));
        if let Some(identity) = &self.identity {
            command.arg("-i").arg(identity);
        }
        command.arg(format!("{}@{}", self.user, address));
        command
    }

    /// Drop any known_hosts entry for `address`
    ///
    /// A clone boots with freshly generated host keys, and DHCP may hand it an
    /// address a previous guest used, so the old key must not be trusted.
    fn forget_host_key(address: Ipv4Addr) -> Command {
        let mut command = Command::new("ssh-keygen");
        command.arg("-R").arg(address.to_string());
        command
    }
}

/// Hostnames reach a remote shell, so only DNS label characters pass
fn check_hostname(hostname: &str) -> Result<()> {
    let valid = !hostname.is_empty()
        && hostname.len() <= 253
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !hostname.starts_with('-');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "'{}' is not a valid hostname",
            hostname
        )))
    }
}

#[async_trait]
impl GuestConfigurator for SshGuestConfigurator {
    async fn set_hostname(&self, address: Ipv4Addr, hostname: &str) -> Result<()> {
        check_hostname(hostname).map_err(|e| Error::guest(address.to_string(), e.to_string()))?;

        // Fails harmlessly when no entry or no known_hosts file exists
        if let Err(e) = execute(&mut Self::forget_host_key(address)).await {
            debug!("ssh-keygen -R {} reported: {}", address, e);
        }

        execute(self.ssh(address).args(["hostnamectl", "set-hostname", hostname]))
            .await
            .map_err(|e| Error::guest(address.to_string(), e.to_string()))?;
        info!("Hostname of {} set to {}", address, hostname);

        // The connection drops as the guest goes down
        if let Err(e) = execute(self.ssh(address).arg("reboot")).await {
            debug!("reboot of {} reported: {}", address, e);
        }
        Ok(())
    }
}
