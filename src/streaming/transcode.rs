//! Transcoder process lifecycle.
//!
//! A [`TranscodeJob`] owns one ffmpeg child. Its stdout becomes the response
//! body, its stderr is logged and the last lines are kept for error
//! messages. Dropping the job before the process has exited kills it, which
//! is what happens when the client disconnects mid-stream.

use std::collections::VecDeque;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use super::gate::{FinalizeSource, ResponseGate};

/// Stderr lines retained for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder exited with {status} before producing output: {diagnostics}")]
    EarlyExit {
        status: ExitStatus,
        diagnostics: String,
    },

    #[error("failed to read transcoder output: {0}")]
    Io(#[from] std::io::Error),
}

type StderrTail = Arc<Mutex<VecDeque<String>>>;

pub struct TranscodeJob {
    gate: Arc<ResponseGate>,
    child: Child,
    stdout: ReaderStream<ChildStdout>,
    stderr_tail: StderrTail,
    stderr_task: Option<JoinHandle<()>>,
    exited: bool,
}

impl TranscodeJob {
    /// Start the transcoder with stdin closed and both output pipes captured.
    pub fn spawn(
        program: &Path,
        args: &[String],
        gate: Arc<ResponseGate>,
    ) -> Result<Self, TranscodeError> {
        let program_name = program.display().to_string();
        let spawn_error = |source| TranscodeError::Spawn {
            program: program_name.clone(),
            source,
        };

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                gate.finalize(FinalizeSource::ProcessError);
                return Err(spawn_error(e));
            }
        };

        let Some(stdout) = child.stdout.take() else {
            gate.finalize(FinalizeSource::ProcessError);
            return Err(spawn_error(std::io::Error::other("stdout was not captured")));
        };

        let stderr_tail: StderrTail = Arc::new(Mutex::new(VecDeque::with_capacity(
            STDERR_TAIL_LINES,
        )));
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_stderr(stderr, Arc::clone(&stderr_tail))));

        tracing::info!(pid = child.id(), program = %program_name, "transcoder started");

        Ok(Self {
            gate,
            child,
            stdout: ReaderStream::new(stdout),
            stderr_tail,
            stderr_task,
            exited: false,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Last stderr lines, joined.
    pub fn diagnostics(&self) -> String {
        let tail = self.stderr_tail.lock();
        if tail.is_empty() {
            "no diagnostics".to_string()
        } else {
            tail.iter().cloned().collect::<Vec<_>>().join("\n")
        }
    }

    async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.exited = true;
        // Stderr closes with the process; drain it so diagnostics are complete.
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
        Ok(status)
    }

    /// Wait for the first output chunk.
    ///
    /// Until this returns the response has not been committed, so a process
    /// that dies without output can still be answered with an error status.
    /// A process that exits cleanly without output yields an empty chunk.
    pub async fn first_chunk(&mut self) -> Result<Bytes, TranscodeError> {
        match self.stdout.next().await {
            Some(Ok(chunk)) => Ok(chunk),
            Some(Err(e)) => {
                self.gate.finalize(FinalizeSource::ProcessError);
                Err(TranscodeError::Io(e))
            }
            None => {
                let status = match self.wait().await {
                    Ok(status) => status,
                    Err(e) => {
                        self.gate.finalize(FinalizeSource::ProcessError);
                        return Err(TranscodeError::Io(e));
                    }
                };
                if status.success() {
                    Ok(Bytes::new())
                } else {
                    self.gate.finalize(FinalizeSource::ProcessExit);
                    Err(TranscodeError::EarlyExit {
                        status,
                        diagnostics: self.diagnostics(),
                    })
                }
            }
        }
    }

    /// Turn the job into a response body stream, starting with `first`.
    ///
    /// Once this stream is handed to the server, status and headers are
    /// gone: failures from here on are logged, never turned into a new
    /// response.
    pub fn into_stream(
        self,
        first: Bytes,
    ) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        let mut job = self;
        async_stream::stream! {
            if !first.is_empty() {
                yield Ok(first);
            }

            while let Some(chunk) = job.stdout.next().await {
                match chunk {
                    Ok(bytes) => yield Ok(bytes),
                    Err(e) => {
                        if job.gate.finalize(FinalizeSource::ProcessError) {
                            tracing::error!(error = %e, "transcoder output failed after headers were sent");
                        }
                        yield Err(e);
                        return;
                    }
                }
            }

            match job.wait().await {
                Ok(status) if status.success() => {
                    if job.gate.finalize(FinalizeSource::ProcessExit) {
                        tracing::info!("transcode completed");
                    }
                }
                Ok(status) => {
                    if job.gate.finalize(FinalizeSource::ProcessExit) {
                        tracing::error!(
                            %status,
                            diagnostics = %job.diagnostics(),
                            "transcoder failed after headers were sent"
                        );
                    }
                    // Abort the body so a truncated file never looks complete.
                    yield Err(std::io::Error::other(format!("transcoder exited with {status}")));
                }
                Err(e) => {
                    if job.gate.finalize(FinalizeSource::ProcessError) {
                        tracing::error!(error = %e, "failed to wait for transcoder");
                    }
                    yield Err(e);
                }
            }
        }
    }
}

impl Drop for TranscodeJob {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        let disconnected = self.gate.finalize(FinalizeSource::ClientDisconnect);
        let pid = self.child.id();
        match self.child.start_kill() {
            Ok(()) if disconnected && self.gate.headers_sent() => {
                tracing::warn!(?pid, "client disconnected, killed transcoder")
            }
            Ok(()) if disconnected => {
                tracing::warn!(?pid, "request abandoned before the response was committed, killed transcoder")
            }
            Ok(()) => tracing::debug!(?pid, "killed transcoder"),
            Err(e) => tracing::warn!(?pid, error = %e, "failed to kill transcoder"),
        }
    }
}

async fn collect_stderr(stderr: ChildStderr, tail: StderrTail) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                tracing::debug!(target: "tubeforged::ffmpeg", "{}", line);
                let mut tail = tail.lock();
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading transcoder stderr");
                break;
            }
        }
    }
}
