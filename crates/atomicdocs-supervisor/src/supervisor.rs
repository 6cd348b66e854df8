//! The subprocess supervisor.
//!
//! At most one documentation subprocess is launched per [`Supervisor`], no
//! matter how many times [`Supervisor::ensure_started`] is called. Readiness
//! is declared after a fixed settle delay, whether or not the launch
//! succeeded; callers that contact a dead subprocess get their own errors.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use atomicdocs_core::SubprocessSettings;
use atomicdocs_telemetry::metrics::record_spawn;
use parking_lot::Mutex;
use tokio::process::Child;
use tracing::{debug, error, info};

use crate::ready::ReadySignal;
use crate::spawner::{ProcessSpawner, Spawner};

/// Observable lifecycle of the documentation subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubprocessState {
    /// No launch has been attempted.
    NotStarted,
    /// The binary was launched.
    Running {
        /// OS process id, when known.
        pid: Option<u32>,
    },
    /// The launch failed.
    Failed {
        /// Error text.
        reason: String,
    },
}

struct Launched {
    ready: ReadySignal,
    state: SubprocessState,
    binary: PathBuf,
    child: Mutex<Option<Child>>,
}

/// Launches the documentation binary once and tracks its readiness.
pub struct Supervisor {
    spawner: Arc<dyn Spawner>,
    ready_delay: Duration,
    launched: OnceLock<Launched>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("ready_delay", &self.ready_delay)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// A supervisor that launches real processes.
    pub fn new(ready_delay: Duration) -> Self {
        Self::with_spawner(ProcessSpawner, ready_delay)
    }

    /// A supervisor using settings from the gateway configuration.
    pub fn from_settings(settings: &SubprocessSettings) -> Self {
        Self::new(settings.ready_delay)
    }

    /// A supervisor with a custom spawner.
    pub fn with_spawner<S: Spawner>(spawner: S, ready_delay: Duration) -> Self {
        Self {
            spawner: Arc::new(spawner),
            ready_delay,
            launched: OnceLock::new(),
        }
    }

    /// The process-wide supervisor.
    ///
    /// The first caller's `ready_delay` wins. It is never dropped, so its
    /// child is only killed by [`Supervisor::shutdown`]; otherwise the child
    /// shares the host's process group and receives the same terminal signals.
    pub fn global(ready_delay: Duration) -> &'static Self {
        static GLOBAL: OnceLock<Supervisor> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(ready_delay))
    }

    /// Launch `binary` if nothing has been launched yet.
    ///
    /// Every call returns a handle to the same readiness signal. Must be
    /// called from within a Tokio runtime.
    pub fn ensure_started(&self, binary: &Path) -> ReadySignal {
        self.launched
            .get_or_init(|| self.launch(binary))
            .ready
            .clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubprocessState {
        self.launched
            .get()
            .map_or(SubprocessState::NotStarted, |launched| launched.state.clone())
    }

    /// The binary that was launched, if any.
    pub fn binary(&self) -> Option<&Path> {
        self.launched.get().map(|launched| launched.binary.as_path())
    }

    /// The readiness signal, if a launch has been attempted.
    pub fn ready_signal(&self) -> Option<ReadySignal> {
        self.launched.get().map(|launched| launched.ready.clone())
    }

    /// Ask the subprocess to terminate.
    pub fn shutdown(&self) {
        let Some(launched) = self.launched.get() else {
            return;
        };
        if let Some(mut child) = launched.child.lock().take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "documentation subprocess already exited");
            }
        }
    }

    fn launch(&self, binary: &Path) -> Launched {
        let (ready, trigger) = ReadySignal::pending();

        let (state, child) = match self.spawner.spawn(binary) {
            Ok(process) => {
                info!(binary = %binary.display(), pid = ?process.pid(), "documentation subprocess started");
                record_spawn(true);
                (SubprocessState::Running { pid: process.pid() }, process.into_child())
            }
            Err(e) => {
                error!(error = %e, "Failed to start AtomicDocs");
                record_spawn(false);
                (SubprocessState::Failed { reason: e.to_string() }, None)
            }
        };

        let delay = self.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.fire();
            debug!("documentation subprocess marked ready");
        });

        Launched {
            ready,
            state,
            binary: binary.to_path_buf(),
            child: Mutex::new(child),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SupervisorError, SupervisorResult};
    use crate::spawner::SpawnedProcess;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingSpawner {
        calls: Arc<AtomicUsize>,
    }

    impl Spawner for CountingSpawner {
        fn spawn(&self, _binary: &Path) -> SupervisorResult<SpawnedProcess> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SpawnedProcess::detached(Some(1000 + n as u32)))
        }
    }

    struct FailingSpawner;

    impl Spawner for FailingSpawner {
        fn spawn(&self, binary: &Path) -> SupervisorResult<SpawnedProcess> {
            Err(SupervisorError::spawn(
                binary,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_once() {
        let spawner = CountingSpawner::default();
        let supervisor = Supervisor::with_spawner(spawner.clone(), Duration::from_millis(500));
        assert_eq!(supervisor.state(), SubprocessState::NotStarted);

        let first = supervisor.ensure_started(Path::new("bin/atomicdocs-linux-x64"));
        let second = supervisor.ensure_started(Path::new("bin/atomicdocs-linux-x64"));

        assert_eq!(spawner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.state(), SubprocessState::Running { pid: Some(1000) });
        assert!(!first.is_ready());
        assert!(second.wait().await);
        assert!(first.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_delay() {
        let supervisor = Supervisor::with_spawner(CountingSpawner::default(), Duration::from_millis(500));
        let ready = supervisor.ensure_started(Path::new("atomicdocs"));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(!ready.is_ready());
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert!(ready.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_launch_still_becomes_ready() {
        let supervisor = Supervisor::with_spawner(FailingSpawner, Duration::from_millis(500));
        let ready = supervisor.ensure_started(Path::new("missing"));

        assert!(matches!(supervisor.state(), SubprocessState::Failed { .. }));
        assert!(ready.wait().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers() {
        let spawner = CountingSpawner::default();
        let supervisor = Arc::new(Supervisor::with_spawner(spawner.clone(), Duration::ZERO));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let supervisor = Arc::clone(&supervisor);
            handles.push(tokio::spawn(async move {
                supervisor.ensure_started(Path::new("atomicdocs")).wait().await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(spawner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_launch() {
        let supervisor = Supervisor::with_spawner(CountingSpawner::default(), Duration::ZERO);
        supervisor.shutdown();
        assert!(supervisor.ready_signal().is_none());
        assert!(supervisor.binary().is_none());
    }
}
