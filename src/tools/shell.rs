//! Shell tool: runs a command under the security policy.
//!
//! Every invocation goes through [`SecurityPolicy::require_approval`]
//! before anything is spawned; denials come back as plain-text results so
//! the model sees them as tool output rather than a crash.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::io::IoContext;
use crate::security::SecurityPolicy;

const EXEC_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ShellInput {
    command: String,
}

/// Runs a shell command, gated by the policy.
pub async fn execute(input: &Value, policy: &SecurityPolicy, io: &IoContext) -> Result<String> {
    let input: ShellInput =
        serde_json::from_value(input.clone()).context("Invalid input for shell tool")?;

    let command = input.command.trim();
    if command.is_empty() {
        return Ok("Error: Command cannot be empty.".to_string());
    }

    if !policy.require_approval("shell", command, io).await? {
        tracing::info!(command, "shell command denied");
        return Ok("Error: Command execution denied by user or security policy.".to_string());
    }

    run_command(command).await
}

async fn run_command(command: &str) -> Result<String> {
    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to execute command '{command}'"))?;

    let output = match tokio::time::timeout(EXEC_TIMEOUT, child.wait_with_output()).await {
        Ok(result) => {
            result.with_context(|| format!("Failed to execute command '{command}'"))?
        }
        Err(_) => {
            return Ok(format!(
                "Error: Command timed out after {} seconds",
                EXEC_TIMEOUT.as_secs()
            ));
        }
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(format!(
        "Exit Code: {}\nOutput:\n{}",
        output.status.code().unwrap_or(-1),
        combined
    ))
}
