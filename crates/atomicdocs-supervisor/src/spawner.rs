//! Launching the documentation binary.

use std::path::Path;
use std::process::Stdio;

use atomicdocs_telemetry::logging::fields::SUBPROCESS_TARGET;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{SupervisorError, SupervisorResult};

/// A launched subprocess.
#[derive(Debug)]
pub struct SpawnedProcess {
    pid: Option<u32>,
    child: Option<Child>,
}

impl SpawnedProcess {
    /// Wrap a running child.
    pub fn from_child(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Some(child),
        }
    }

    /// A process record without a handle, for spawners that do not own one.
    pub fn detached(pid: Option<u32>) -> Self {
        Self { pid, child: None }
    }

    /// OS process id, when known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn into_child(self) -> Option<Child> {
        self.child
    }
}

/// Starts the documentation binary.
pub trait Spawner: Send + Sync + 'static {
    /// Launch `binary` with no arguments.
    fn spawn(&self, binary: &Path) -> SupervisorResult<SpawnedProcess>;
}

/// Spawns a real OS process.
///
/// The child gets no stdin. Its stdout and stderr are forwarded line by line
/// to `tracing` at debug level. It stays in the host's process group, so a
/// terminal interrupt reaches both. It is killed when its handle is dropped,
/// which for the process-wide supervisor only happens on explicit shutdown.
/// Must be called from within a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn(&self, binary: &Path) -> SupervisorResult<SpawnedProcess> {
        let mut cmd = Command::new(binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SupervisorError::spawn(binary, e))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, "stderr"));
        }

        Ok(SpawnedProcess::from_child(child))
    }
}

async fn forward_lines<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: SUBPROCESS_TARGET, stream, "{}", line);
    }
}
