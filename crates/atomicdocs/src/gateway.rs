//! The documentation gateway.
//!
//! A [`DocsGateway`] ties the pieces together for one host application:
//! it makes sure the documentation subprocess is running, builds the
//! interception middleware for the host's shape and ships the host's routes
//! once the subprocess is ready.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use atomicdocs_bridge::{ProxyBridge, RegistrationClient, RegistrationOutcome, RetryPolicy};
use atomicdocs_core::{GatewayConfig, RegistrationPayload};
use atomicdocs_host::{HostApp, HostKind};
use atomicdocs_supervisor::{ReadySignal, Supervisor};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::adapters::extract_routes;
use crate::error::GatewayResult;
use crate::middleware::{for_host, GatewayMiddleware};

/// Installs documentation support into host applications.
///
/// Cloning is cheap and shares the readiness signal and HTTP clients.
#[derive(Debug, Clone)]
pub struct DocsGateway {
    config: Arc<GatewayConfig>,
    binary: Option<PathBuf>,
    ready: ReadySignal,
    bridge: Arc<ProxyBridge>,
    registrar: RegistrationClient,
}

impl DocsGateway {
    /// Start the process-wide documentation subprocess and build a gateway.
    ///
    /// Fails only if the configuration is invalid or no binary exists for
    /// this platform. Must be called from within a Tokio runtime.
    pub fn start(config: GatewayConfig) -> GatewayResult<Self> {
        let supervisor = Supervisor::global(config.subprocess.ready_delay);
        Self::with_supervisor(config, supervisor)
    }

    /// Build a gateway that launches through `supervisor`.
    pub fn with_supervisor(config: GatewayConfig, supervisor: &Supervisor) -> GatewayResult<Self> {
        config.validate()?;
        let binary = config.resolver().resolve()?;
        let ready = supervisor.ensure_started(&binary);
        Self::build(config, Some(binary), ready)
    }

    /// Build a gateway for a subprocess managed elsewhere.
    pub fn with_ready_signal(config: GatewayConfig, ready: ReadySignal) -> GatewayResult<Self> {
        config.validate()?;
        Self::build(config, None, ready)
    }

    fn build(config: GatewayConfig, binary: Option<PathBuf>, ready: ReadySignal) -> GatewayResult<Self> {
        let bridge = Arc::new(ProxyBridge::new(&config)?);
        let registrar = RegistrationClient::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            binary,
            ready,
            bridge,
            registrar,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The launched binary, when this gateway launched one.
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// Readiness of the documentation subprocess.
    pub fn ready_signal(&self) -> &ReadySignal {
        &self.ready
    }

    /// Build the interception middleware for `app`.
    ///
    /// The host's kind is detected once here. `port` overrides the port
    /// reported to the subprocess; without it the host's own setting or the
    /// request's local port is used.
    ///
    /// Table-based hosts given a `port` also get one automatic registration
    /// attempt after the configured delay, skipped if the subprocess is not
    /// ready by then.
    pub fn install<A>(&self, app: &A, port: Option<u16>) -> GatewayMiddleware
    where
        A: HostApp + Clone + 'static,
    {
        let kind = HostKind::detect(app);
        debug!(kind = kind.as_str(), "installing documentation middleware");

        if let (HostKind::TableBased, Some(port)) = (kind, port) {
            self.schedule_auto_registration(app.clone(), port);
        }

        for_host(kind, app, Arc::clone(&self.bridge), port)
    }

    /// Register `app`'s routes once the subprocess is ready.
    ///
    /// Call after the host starts listening on `port`. Routes are extracted
    /// when readiness is observed; the attempt is abandoned after the
    /// configured number of attempts.
    pub fn register<A>(&self, app: &A, port: u16) -> JoinHandle<RegistrationOutcome>
    where
        A: HostApp + Clone + 'static,
    {
        let app = app.clone();
        let registrar = self.registrar.clone();
        let ready = self.ready.clone();
        let policy = RetryPolicy::from(&self.config.registration);
        let mount = self.config.mount();
        let docs_url = self.docs_url(port);

        tokio::spawn(async move {
            let mut count = 0;
            let outcome = registrar
                .register_when_ready(&ready, policy, || {
                    let routes = extract_routes(&app, &mount);
                    count = routes.len();
                    RegistrationPayload::new(routes, port)
                })
                .await;

            if let RegistrationOutcome::Sent { .. } = outcome {
                info!(routes = count, "Registered {} routes with AtomicDocs", count);
                info!("Docs: {}", docs_url);
            }
            outcome
        })
    }

    /// The documentation URL for a host listening on `port`.
    pub fn docs_url(&self, port: u16) -> String {
        format!("http://localhost:{}{}", port, self.config.mount().prefix())
    }

    fn schedule_auto_registration<A>(&self, app: A, port: u16)
    where
        A: HostApp + 'static,
    {
        let registrar = self.registrar.clone();
        let ready = self.ready.clone();
        let delay = self.config.registration.auto_delay;
        let mount = self.config.mount();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let routes = extract_routes(&app, &mount);
            let count = routes.len();
            let outcome = registrar
                .register_if_ready(&ready, RegistrationPayload::new(routes, port))
                .await;
            debug!(routes = count, ?outcome, "automatic registration finished");
        });
    }
}
