//! External command execution

use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Failure to run an external tool
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be spawned (not installed, no permission)
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

fn program_name(command: &Command) -> String {
    command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned()
}

/// Run `command` to completion and return its stdout
///
/// A non-zero exit is an error carrying the trimmed stderr.
pub async fn execute(command: &mut Command) -> Result<String, CommandError> {
    let program = program_name(command);
    tracing::trace!("Executing {:?}", command.as_std());

    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
