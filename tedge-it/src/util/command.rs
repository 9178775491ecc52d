use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{HarnessError, Result};

/// Run a host command, failing if it does not finish within `timeout_duration`.
pub async fn safe_run_command(mut cmd: Command, timeout_duration: Duration) -> Result<Output> {
    cmd.kill_on_drop(true);
    match timeout(timeout_duration, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(HarnessError::Runtime(format!(
            "I/O error while running command: {err}"
        ))),
        Err(_) => Err(HarnessError::Runtime("Command timed out".to_string())),
    }
}

/// Run a `docker` CLI command and hand back its raw output, whatever the exit code.
pub async fn docker_output<S: AsRef<str>>(args: &[S], timeout_duration: Duration) -> Result<Output> {
    let mut cmd = Command::new("docker");
    cmd.args(args.iter().map(AsRef::as_ref))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    safe_run_command(cmd, timeout_duration).await
}

/// Run a `docker` CLI command and return stdout, mapping a non-zero exit to an error.
pub async fn docker(args: &[&str]) -> Result<String> {
    let output = docker_output(args, Duration::from_secs(120)).await?;
    if !output.status.success() {
        return Err(HarnessError::Runtime(format!(
            "docker {} failed (exit code: {:?}): {}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a `docker` CLI command feeding `input` to its stdin.
pub async fn docker_with_stdin(args: &[&str], input: &[u8]) -> Result<String> {
    let mut child = Command::new("docker")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| HarnessError::Runtime(format!("Failed to run docker: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
        // closing stdin lets docker see the end of the stream
        drop(stdin);
    }

    let output = timeout(Duration::from_secs(120), child.wait_with_output())
        .await
        .map_err(|_| HarnessError::Runtime("Command timed out".to_string()))??;

    if !output.status.success() {
        return Err(HarnessError::Runtime(format!(
            "docker {} failed (exit code: {:?}): {}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
