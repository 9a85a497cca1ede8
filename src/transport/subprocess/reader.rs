//! Stdout read loop for subprocess transport

use std::io;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::transport::{Fanout, TransportEvent, TransportStatus};

/// Read stdout line by line and publish every complete line
///
/// Over-long and non-UTF-8 lines are logged and dropped. At EOF the child is
/// reaped and its exit code published as the final event.
pub(super) fn spawn_reader(
    stdout: ChildStdout,
    fanout: Arc<Fanout>,
    status: Arc<Mutex<TransportStatus>>,
    process: Arc<tokio::sync::Mutex<Option<Child>>>,
    max_line: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(max_line));
        // The codec yields one `None` after a decode error before reading on
        let mut recovering = false;

        loop {
            match lines.next().await {
                Some(Ok(line)) => {
                    recovering = false;
                    let line = line.trim();
                    if !line.is_empty() {
                        fanout.publish(TransportEvent::Line(line.to_string()));
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    log::warn!("Dropping stdout line over {max_line} bytes");
                    recovering = true;
                }
                Some(Err(LinesCodecError::Io(e))) if e.kind() == io::ErrorKind::InvalidData => {
                    log::warn!("Dropping non UTF-8 stdout line");
                    recovering = true;
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    log::error!("Reading CLI stdout failed: {e}");
                    *status.lock() = TransportStatus::Error;
                    fanout.finish(TransportEvent::Failed(e.to_string()));
                    return;
                }
                None if recovering => recovering = false,
                None => break,
            }
        }

        let code = match process.lock().await.take() {
            Some(mut child) => match child.wait().await {
                Ok(exit) => exit.code(),
                Err(e) => {
                    log::warn!("Failed to reap CLI process: {e}");
                    None
                }
            },
            None => None,
        };

        {
            let mut status = status.lock();
            *status = if code.unwrap_or(0) == 0 {
                TransportStatus::Disconnected
            } else {
                TransportStatus::Error
            };
        }
        log::info!("CLI stdout closed (exit code {code:?})");
        fanout.finish(TransportEvent::Exited(code));
    })
}
