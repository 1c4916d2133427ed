//! Hypervisor control through `virsh` and `virt-clone`

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;
use vmdns_core::model::VmId;
use vmdns_core::probe::parse::mac_addresses;
use vmdns_core::traits::{DomainState, GuestInterface, Hypervisor};
use vmdns_core::{Error, Result};

use crate::command::{CommandError, execute};
use crate::parse;

/// Seconds virsh waits for a guest agent reply
const AGENT_TIMEOUT_SECS: &str = "5";

/// libvirt hypervisor driven through its command-line clients
#[derive(Debug, Clone)]
pub struct VirshHypervisor {
    uri: String,
}

impl VirshHypervisor {
    /// Connect to the libvirt daemon at `uri` (e.g. `qemu:///system`)
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn virsh(&self) -> Command {
        let mut command = Command::new("virsh");
        command.arg("-c").arg(&self.uri);
        command
    }

    async fn run_virsh(&self, args: &[&str]) -> std::result::Result<String, CommandError> {
        execute(self.virsh().args(args)).await
    }

    async fn agent_command(&self, vm: &VmId, command: &Value) -> std::result::Result<String, CommandError> {
        let payload = command.to_string();
        self.run_virsh(&[
            "qemu-agent-command",
            vm.as_str(),
            "--timeout",
            AGENT_TIMEOUT_SECS,
            payload.as_str(),
        ])
        .await
    }
}

fn hypervisor_error(action: &str, vm: &str, e: CommandError) -> Error {
    Error::hypervisor(format!("{} {}: {}", action, vm, e))
}

#[async_trait]
impl Hypervisor for VirshHypervisor {
    async fn domain_state(&self, vm: &VmId) -> Result<DomainState> {
        let output = self
            .run_virsh(&["domstate", vm.as_str()])
            .await
            .map_err(|e| hypervisor_error("cannot query state of", vm.as_str(), e))?;
        Ok(parse::domain_state(&output))
    }

    async fn start_domain(&self, vm: &VmId) -> Result<()> {
        self.run_virsh(&["start", vm.as_str()])
            .await
            .map_err(|e| hypervisor_error("cannot start", vm.as_str(), e))?;
        Ok(())
    }

    async fn clone_domain(&self, template: &str, new_name: &VmId) -> Result<String> {
        let mut command = Command::new("virt-clone");
        command
            .arg("--connect")
            .arg(&self.uri)
            .args(["--original", template, "--name", new_name.as_str(), "--auto-clone"]);

        execute(&mut command).await.map_err(|e| {
            Error::hypervisor(format!(
                "cannot clone {} from {}: {}",
                new_name, template, e
            ))
        })?;

        let xml = self.domain_definition_xml(new_name).await?;
        mac_addresses(&xml).into_iter().next().ok_or_else(|| {
            Error::hypervisor(format!("clone {} has no network interface", new_name))
        })
    }

    async fn domain_interfaces(&self, vm: &VmId, via_agent: bool) -> Result<Vec<GuestInterface>> {
        let source = if via_agent { "agent" } else { "lease" };
        let output = self
            .run_virsh(&["domifaddr", vm.as_str(), "--source", source])
            .await
            .map_err(|e| hypervisor_error("cannot list interfaces of", vm.as_str(), e))?;
        Ok(parse::domifaddr(&output))
    }

    async fn domain_definition_xml(&self, vm: &VmId) -> Result<String> {
        self.run_virsh(&["dumpxml", vm.as_str()])
            .await
            .map_err(|e| hypervisor_error("cannot read definition of", vm.as_str(), e))
    }

    async fn guest_agent_ping(&self, vm: &VmId) -> bool {
        let ping = serde_json::json!({ "execute": "guest-ping" });
        match self.agent_command(vm, &ping).await {
            Ok(_) => true,
            Err(e) => {
                debug!("{}: guest-ping failed: {}", vm, e);
                false
            }
        }
    }

    async fn guest_agent_exec(&self, vm: &VmId, command: &Value) -> Result<Value> {
        let output = self
            .agent_command(vm, command)
            .await
            .map_err(|e| hypervisor_error("guest agent command failed on", vm.as_str(), e))?;
        Ok(serde_json::from_str(output.trim())?)
    }
}
