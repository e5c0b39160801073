//! Decoder supervision
//!
//! Wraps an external decoder (ffmpeg by default) as a supervised child
//! process: encoded bytes go in on stdin, 16-bit LE PCM mono 16kHz comes out
//! on stdout, and stderr is drained continuously and logged at warning
//! level. Grounded in `audio_processing.py`'s `create_ffmpeg_process` plus
//! its stdout/stderr pump tasks, restructured around `tokio::process`.

use liveasr_config::DecoderConfig;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

#[derive(Error, Debug)]
pub enum DecoderError {
    #[error("failed to spawn decoder process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("decoder stdin closed")]
    StdinClosed,
}

/// Upstream read size from the decoder's stdout.
const READ_CHUNK: usize = 4096;

/// A running decoder subprocess plus the tasks pumping its stdout/stderr.
///
/// `write` feeds encoded bytes to stdin in FIFO order; `pcm_rx` yields
/// fixed 4096-byte PCM reads; stderr lines are logged as they arrive.
pub struct Decoder {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl Decoder {
    /// Spawn the decoder and start its stdout/stderr pump tasks.
    ///
    /// Returns the decoder handle plus the receiving end of the PCM queue;
    /// the queue is bounded so a slow segmenter applies backpressure to the
    /// pump rather than unbounded buffering, but never drops a read.
    pub fn spawn(
        config: &DecoderConfig,
        stream_id: &str,
    ) -> Result<(Self, mpsc::Receiver<Vec<u8>>), DecoderError> {
        let mut command = Command::new(&config.binary);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(DecoderError::Spawn)?;
        tracing::info!(stream_id, pid = child.id(), "decoder process spawned");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let (pcm_tx, pcm_rx) = mpsc::channel(64);
        let stream_id_owned = stream_id.to_string();
        tokio::spawn(pump_stdout(stream_id_owned.clone(), stdout, pcm_tx));
        tokio::spawn(pump_stderr(stream_id_owned, stderr));

        Ok((Self { child, stdin }, pcm_rx))
    }

    /// Write an arbitrary-sized chunk of encoded bytes to the decoder's stdin.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), DecoderError> {
        let stdin = self.stdin.as_mut().ok_or(DecoderError::StdinClosed)?;
        stdin
            .write_all(bytes)
            .await
            .map_err(|_| DecoderError::StdinClosed)
    }

    /// Close stdin and await process exit with a bounded timeout, forcibly
    /// killing the child if it does not exit in time.
    pub async fn shutdown(mut self, teardown_timeout_ms: u64) {
        self.stdin.take();
        match timeout(
            Duration::from_millis(teardown_timeout_ms),
            self.child.wait(),
        )
        .await
        {
            Ok(Ok(status)) => tracing::info!(?status, "decoder exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "error waiting for decoder exit"),
            Err(_) => {
                tracing::warn!("decoder did not exit within teardown timeout, killing");
                let _ = self.child.kill().await;
            }
        }
    }
}

async fn pump_stdout(
    stream_id: String,
    mut stdout: tokio::process::ChildStdout,
    tx: mpsc::Sender<Vec<u8>>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => {
                tracing::info!(stream_id, "decoder stdout closed");
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(stream_id, error = %e, "decoder stdout read error");
                break;
            }
        }
    }
}

async fn pump_stderr(stream_id: String, stderr: tokio::process::ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    loop {
        line.clear();
        use tokio::io::AsyncBufReadExt;
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => tracing::warn!(stream_id, "decoder: {}", line.trim_end()),
            Err(e) => {
                tracing::warn!(stream_id, error = %e, "decoder stderr read error");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_failure_surfaces_as_error() {
        let config = DecoderConfig {
            binary: "this-binary-does-not-exist-liveasr".to_string(),
            args: vec![],
            teardown_timeout_ms: 100,
        };
        let result = Decoder::spawn(&config, "test-stream");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn write_after_shutdown_fails() {
        let config = DecoderConfig {
            binary: "cat".to_string(),
            args: vec![],
            teardown_timeout_ms: 500,
        };
        let (mut decoder, _rx) = Decoder::spawn(&config, "test-stream").expect("cat exists");
        decoder.write(b"hello").await.expect("write while alive");
        decoder.shutdown(500).await;
    }
}
