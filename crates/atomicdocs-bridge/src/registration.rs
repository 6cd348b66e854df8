//! Shipping the route inventory to the documentation subprocess.
//!
//! Registration is best-effort: every failure ends in a log line and a
//! metric, never an error in the host.

use std::time::Duration;

use atomicdocs_core::{GatewayConfig, RegistrationPayload, RegistrationSettings};
use atomicdocs_supervisor::ReadySignal;
use atomicdocs_telemetry::metrics::{record_registration, RegistrationMetric};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::BridgeResult;

/// How long to keep polling for readiness before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between readiness checks.
    pub poll_interval: Duration,
    /// Readiness checks before the registration is abandoned.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RegistrationSettings::default())
    }
}

impl From<&RegistrationSettings> for RetryPolicy {
    fn from(settings: &RegistrationSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            max_attempts: settings.max_attempts.max(1),
        }
    }
}

/// What happened to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The payload was delivered.
    Sent {
        /// Readiness checks performed, including the successful one.
        attempts: u32,
    },
    /// The payload was sent but delivery failed.
    Failed {
        /// Readiness checks performed.
        attempts: u32,
    },
    /// The subprocess was not ready and no retry was made.
    Skipped,
    /// The subprocess never became ready within the retry limit.
    Abandoned {
        /// Readiness checks performed.
        attempts: u32,
    },
}

/// Posts registration payloads to the documentation subprocess.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    client: Client,
    endpoint: String,
}

impl RegistrationClient {
    /// A client posting to `endpoint`, giving up on a request after `timeout`.
    ///
    /// Proxy environment variables are ignored.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> BridgeResult<Self> {
        let client = Client::builder().no_proxy().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// A client built from the gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> BridgeResult<Self> {
        Self::new(config.registration_url(), config.registration.timeout)
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Registration endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post `payload` as one buffered JSON request.
    pub async fn send(&self, payload: &RegistrationPayload) -> BridgeResult<StatusCode> {
        let body = payload.to_json_vec()?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }

    /// Send `payload` in the background, swallowing every error.
    pub fn dispatch(&self, payload: RegistrationPayload) -> tokio::task::JoinHandle<bool> {
        let client = self.clone();
        tokio::spawn(async move { client.deliver(&payload).await })
    }

    /// Poll `ready` every `policy.poll_interval` and send exactly once when
    /// it flips.
    ///
    /// The payload is built only when the subprocess is ready, so routes
    /// declared while waiting are included. Gives up after
    /// `policy.max_attempts` checks.
    pub async fn register_when_ready<F>(
        &self,
        ready: &ReadySignal,
        policy: RetryPolicy,
        payload: F,
    ) -> RegistrationOutcome
    where
        F: FnOnce() -> RegistrationPayload,
    {
        let max_attempts = policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if ready.is_ready() {
                return if self.deliver(&payload()).await {
                    RegistrationOutcome::Sent { attempts: attempt }
                } else {
                    RegistrationOutcome::Failed { attempts: attempt }
                };
            }
            if attempt < max_attempts {
                tokio::time::sleep(policy.poll_interval).await;
            }
        }

        warn!("registration abandoned after {} attempts", max_attempts);
        record_registration(RegistrationMetric::Abandoned);
        RegistrationOutcome::Abandoned {
            attempts: max_attempts,
        }
    }

    /// Send `payload` only if `ready` has already flipped.
    pub async fn register_if_ready(
        &self,
        ready: &ReadySignal,
        payload: RegistrationPayload,
    ) -> RegistrationOutcome {
        if !ready.is_ready() {
            warn!("documentation subprocess not ready, skipping automatic registration");
            record_registration(RegistrationMetric::Skipped);
            return RegistrationOutcome::Skipped;
        }

        if self.deliver(&payload).await {
            RegistrationOutcome::Sent { attempts: 1 }
        } else {
            RegistrationOutcome::Failed { attempts: 1 }
        }
    }

    async fn deliver(&self, payload: &RegistrationPayload) -> bool {
        match self.send(payload).await {
            Ok(status) => {
                if !status.is_success() {
                    debug!(%status, "registration answered with non-success status");
                }
                record_registration(RegistrationMetric::Sent);
                true
            }
            Err(e) => {
                debug!(error = %e, endpoint = %self.endpoint, "registration failed");
                record_registration(RegistrationMetric::Failed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomicdocs_core::RouteDescriptor;

    fn payload() -> RegistrationPayload {
        RegistrationPayload::new(
            vec![RouteDescriptor::new("GET", "/users", "").unwrap()],
            6767,
        )
    }

    fn unreachable_client() -> RegistrationClient {
        let port = atomicdocs_test::unused_port();
        RegistrationClient::new(
            format!("http://127.0.0.1:{port}/api/register"),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 300);
    }

    #[tokio::test]
    async fn test_skipped_when_not_ready() {
        let (ready, _trigger) = ReadySignal::pending();
        let outcome = unreachable_client().register_if_ready(&ready, payload()).await;
        assert_eq!(outcome, RegistrationOutcome::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_after_max_attempts() {
        let (ready, _trigger) = ReadySignal::pending();
        let policy = RetryPolicy {
            poll_interval: Duration::from_millis(100),
            max_attempts: 5,
        };

        let mut built = false;
        let outcome = unreachable_client()
            .register_when_ready(&ready, policy, || {
                built = true;
                payload()
            })
            .await;

        assert_eq!(outcome, RegistrationOutcome::Abandoned { attempts: 5 });
        assert!(!built);
    }

    #[tokio::test]
    async fn test_connection_error_is_swallowed() {
        let outcome = unreachable_client()
            .register_if_ready(&ReadySignal::ready(), payload())
            .await;
        assert_eq!(outcome, RegistrationOutcome::Failed { attempts: 1 });

        let delivered = unreachable_client().dispatch(payload()).await.unwrap();
        assert!(!delivered);
    }
}
