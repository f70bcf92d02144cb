//! Search process management.
//!
//! One spawned process per running session. Stdout is delivered as raw
//! chunks through a per-process channel; an output gate drops (never queues)
//! chunks once a restart has been requested, so stale output can never reach
//! a classifier whose state is about to be discarded.

use crate::{InvocationSpec, Result, RgviewError};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by a managed search process.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// A chunk of output, delivered in arrival order at arbitrary byte
    /// boundaries. Stderr lines travel through the same channel so the
    /// classifier surfaces them as diagnostics.
    Output(String),
    /// Process ended. `diagnostics` is the collected stderr, used to decide
    /// whether exit code 1 meant zero matches or a real failure.
    Exited {
        code: Option<i32>,
        diagnostics: String,
    },
}

/// Handle to one running search process.
///
/// The process handle lives only while its session is Running or Settling; a
/// session holds at most one at a time.
pub struct SearchProcess {
    pid: Option<u32>,
    /// While true, reader tasks forward chunks; once false they drop them.
    gate: Arc<AtomicBool>,
    /// Set by the reader task after the child has been reaped.
    done: Arc<AtomicBool>,
}

impl SearchProcess {
    /// Launch the process described by `spec` and start its reader tasks.
    pub fn spawn(spec: &InvocationSpec) -> Result<(Self, mpsc::UnboundedReceiver<ProcessEvent>)> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(target: "rgview::process", "launching: {}", spec.display());

        let mut child = cmd.spawn().map_err(|e| {
            error!(target: "rgview::process", "spawn failed: {e}");
            RgviewError::ProcessSpawnFailed(format!("{}: {e}", spec.program.display()))
        })?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RgviewError::ProcessSpawnFailed("stdout not captured".into()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(AtomicBool::new(true));
        let done = Arc::new(AtomicBool::new(false));
        let diagnostics = Arc::new(std::sync::Mutex::new(String::new()));

        let mut stderr_task = None;
        if let Some(stderr) = stderr {
            let tx = tx.clone();
            let gate = gate.clone();
            let diagnostics = diagnostics.clone();
            stderr_task = Some(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "rgview::process", "stderr: {line}");
                    if let Ok(mut diag) = diagnostics.lock() {
                        // Bounded: enough for an error report, not a flood.
                        if diag.len() < 4096 {
                            diag.push_str(&line);
                            diag.push('\n');
                        }
                    }
                    if gate.load(Ordering::SeqCst) {
                        let _ = tx.send(ProcessEvent::Output(format!("{line}\n")));
                    }
                }
            }));
        }

        {
            let gate = gate.clone();
            let done = done.clone();
            tokio::spawn(async move {
                let mut stdout = stdout;
                let mut buf = [0u8; 8192];
                // Carries an incomplete trailing UTF-8 sequence to the next
                // read so chunk boundaries never corrupt multibyte text.
                let mut carry: Vec<u8> = Vec::new();
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            carry.extend_from_slice(&buf[..n]);
                            // Hold back only a genuinely incomplete trailing
                            // sequence; invalid bytes are replaced rather
                            // than carried forever.
                            let valid = match std::str::from_utf8(&carry) {
                                Ok(_) => carry.len(),
                                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                                Err(_) => carry.len(),
                            };
                            if valid > 0 && gate.load(Ordering::SeqCst) {
                                let chunk =
                                    String::from_utf8_lossy(&carry[..valid]).into_owned();
                                let _ = tx.send(ProcessEvent::Output(chunk));
                            }
                            carry.drain(..valid);
                        }
                        Err(e) => {
                            error!(target: "rgview::process", "stdout read error: {e}");
                            break;
                        }
                    }
                }
                let code = child.wait().await.ok().and_then(|s| s.code());
                done.store(true, Ordering::SeqCst);
                debug!(target: "rgview::process", "process exited with code {code:?}");
                // Let the stderr reader finish so the diagnostics are
                // complete before anyone classifies the exit.
                if let Some(task) = stderr_task {
                    let _ = task.await;
                }
                let diagnostics = diagnostics
                    .lock()
                    .map(|d| d.clone())
                    .unwrap_or_default();
                // Exit notification bypasses the gate: the state machine
                // still needs it, and a replaced session no longer listens.
                let _ = tx.send(ProcessEvent::Exited { code, diagnostics });
            });
        }

        Ok((Self { pid, gate, done }, rx))
    }

    /// Stop delivering output notifications. Chunks arriving afterwards are
    /// dropped, not queued.
    pub fn disable_output(&self) {
        self.gate.store(false, Ordering::SeqCst);
    }

    /// Request graceful termination. Cooperative only; there is no forced
    /// kill escalation.
    pub fn interrupt(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            debug!(target: "rgview::process", "sending SIGINT to {pid}");
            unsafe {
                libc::kill(pid as i32, libc::SIGINT);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.pid;
        }
    }

    /// Whether the child has been reaped.
    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}
