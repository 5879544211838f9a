//! Forwarding of llama-server output into tracing.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tracing::debug;

/// Spawn one task per piped stream that logs each line at debug level.
///
/// The tasks end when the child closes its pipes.
pub fn forward_output(child: &mut Child, port: u16) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "ggchat::llama_server", port, stream = "stdout", "{line}");
            }
            debug!(port, "stdout reader task exiting");
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "ggchat::llama_server", port, stream = "stderr", "{line}");
            }
            debug!(port, "stderr reader task exiting");
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_pipes_are_taken() {
        let mut child = Command::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        forward_output(&mut child, 1234);
        assert!(child.stdout.is_none());
        assert!(child.stderr.is_none());
        assert!(child.wait().await.unwrap().success());
    }
}
