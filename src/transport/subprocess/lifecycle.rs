//! Lifecycle management for subprocess transport (connect, close)

use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::error::{ClaudeError, Result};
use crate::transport::TransportStatus;

use super::reader::spawn_reader;
use super::transport::SubprocessTransport;

/// Grace period for the child to exit after stdin closes
const EXIT_GRACE: Duration = Duration::from_secs(5);

impl SubprocessTransport {
    /// Spawn the CLI process and set up stdio pipes
    ///
    /// # Errors
    /// Returns `CliNotFound` when the executable does not exist, `Connection`
    /// for any other spawn failure
    pub(super) async fn connect_impl(&mut self) -> Result<()> {
        if self.closed {
            return Err(ClaudeError::transport("Transport already closed"));
        }
        if self.started {
            return Ok(());
        }

        let mut cmd = self.spec.to_command();
        // Piped stderr keeps the child away from the parent terminal
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if let Some(ref cwd) = self.spec.cwd
                && !cwd.exists()
            {
                return ClaudeError::connection(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                ));
            }
            if e.kind() == std::io::ErrorKind::NotFound {
                return ClaudeError::CliNotFound(format!(
                    "{}: {e}",
                    self.spec.program.display()
                ));
            }
            ClaudeError::connection(format!("Failed to start Claude Code: {e}"))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stderr handle"))?;

        log::debug!(
            "Spawned {} (pid {:?})",
            self.spec.program.display(),
            child.id()
        );

        let callback = self.stderr_callback.clone();
        let max_line = self.max_buffer_size;
        let stderr_task = tokio::spawn(async move {
            let mut lines = FramedRead::new(stderr, LinesCodec::new_with_max_length(max_line));
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => match callback {
                        Some(ref callback) => callback(line),
                        None => log::debug!(target: "claude_cli::stderr", "{line}"),
                    },
                    Err(e) => {
                        log::debug!(target: "claude_cli::stderr", "stderr closed: {e}");
                        break;
                    }
                }
            }
        });

        *self.process.lock().await = Some(child);
        *self.status.lock() = TransportStatus::Connected;

        self.reader_task = Some(spawn_reader(
            stdout,
            std::sync::Arc::clone(&self.fanout),
            std::sync::Arc::clone(&self.status),
            std::sync::Arc::clone(&self.process),
            self.max_buffer_size,
        ));
        self.stdin = Some(stdin);
        self.stderr_task = Some(stderr_task);
        self.started = true;

        Ok(())
    }

    /// Close the transport and clean up resources
    ///
    /// # Errors
    /// Returns error if waiting for the child fails
    pub(super) async fn close_impl(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        {
            let mut status = self.status.lock();
            if *status == TransportStatus::Connected {
                *status = TransportStatus::Disconnected;
            }
        }

        // Closing stdin asks the CLI to exit on its own
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.fanout.close();

        if let Some(mut child) = self.process.lock().await.take() {
            match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => {
                    log::debug!("CLI exited with {status}");
                }
                Ok(Err(e)) => {
                    return Err(ClaudeError::Io(e));
                }
                Err(_) => {
                    log::warn!("CLI did not exit within {EXIT_GRACE:?}, killing it");
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                }
            }
        }

        Ok(())
    }

    /// Handle Drop cleanup
    pub(super) fn drop_impl(&mut self) {
        drop(self.stdin.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        if let Ok(mut guard) = self.process.try_lock()
            && let Some(mut child) = guard.take()
        {
            let _ = child.start_kill();
        }
    }
}
