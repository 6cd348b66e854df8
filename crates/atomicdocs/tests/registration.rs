//! Manual and automatic route registration.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atomicdocs::{DocsGateway, GatewayConfig, ReadySignal, RegistrationOutcome, Supervisor};
use atomicdocs_host::{HostRequest, ResponseWriter};
use atomicdocs_supervisor::{SpawnedProcess, Spawner, SupervisorResult};
use atomicdocs_test::{products_table_app, users_stack_app, MockDocsServer, PRODUCTS_PORT, USERS_PORT};

fn config(port: u16) -> GatewayConfig {
    GatewayConfig::builder()
        .subprocess_host("127.0.0.1")
        .subprocess_port(port)
        .poll_interval(Duration::from_millis(20))
        .auto_register_delay(Duration::from_millis(50))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_manual_registration_waits_for_readiness() {
    let mock = MockDocsServer::start().await.unwrap();
    let (ready, trigger) = ReadySignal::pending();
    let gateway = DocsGateway::with_ready_signal(config(mock.port()), ready).unwrap();

    let app = users_stack_app();
    gateway.install(&app, None).apply_to_stack(&app).unwrap();
    let handle = gateway.register(&app, USERS_PORT);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(mock.registrations().is_empty());

    app.put("/users/:id", |_: &HostRequest, res: &mut ResponseWriter| res.send("ok"));
    trigger.fire();

    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Sent { attempts } if attempts > 1));
    assert!(mock.wait_for_registrations(1, Duration::from_secs(2)).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let registrations = mock.registrations();
    assert_eq!(registrations.len(), 1);

    let payload = &registrations[0];
    assert_eq!(payload.port, USERS_PORT);
    let pairs: Vec<_> = payload
        .routes
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("GET", "/users"),
            ("POST", "/users"),
            ("GET", "/users/:id"),
            ("DELETE", "/users/:id"),
            ("GET", "/profile"),
            ("PUT", "/users/:id"),
        ]
    );
}

#[tokio::test]
async fn test_manual_registration_abandoned() {
    let mock = MockDocsServer::start().await.unwrap();
    let (ready, _trigger) = ReadySignal::pending();
    let config = GatewayConfig::builder()
        .subprocess_host("127.0.0.1")
        .subprocess_port(mock.port())
        .poll_interval(Duration::from_millis(5))
        .max_register_attempts(3)
        .build()
        .unwrap();
    let gateway = DocsGateway::with_ready_signal(config, ready).unwrap();

    let outcome = gateway.register(&users_stack_app(), USERS_PORT).await.unwrap();
    assert_eq!(outcome, RegistrationOutcome::Abandoned { attempts: 3 });
    assert!(mock.registrations().is_empty());
}

#[tokio::test]
async fn test_slow_registration_fails_within_deadline() {
    let mock = MockDocsServer::start().await.unwrap();
    mock.set_register_delay(Duration::from_secs(3));
    let config = GatewayConfig::builder()
        .subprocess_host("127.0.0.1")
        .subprocess_port(mock.port())
        .register_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let gateway = DocsGateway::with_ready_signal(config, ReadySignal::ready()).unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        gateway.register(&users_stack_app(), USERS_PORT),
    )
    .await
    .expect("registration outlived its deadline")
    .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Failed { attempts: 1 });
}

#[tokio::test]
async fn test_automatic_registration_for_table_hosts() {
    let mock = MockDocsServer::start().await.unwrap();
    let gateway = DocsGateway::with_ready_signal(config(mock.port()), ReadySignal::ready()).unwrap();

    let app = products_table_app();
    gateway
        .install(&app, Some(PRODUCTS_PORT))
        .apply_to_table(&app)
        .unwrap();

    assert!(mock.wait_for_registrations(1, Duration::from_secs(2)).await);
    let payload = &mock.registrations()[0];
    assert_eq!(payload.port, PRODUCTS_PORT);
    assert!(payload
        .routes
        .iter()
        .any(|r| r.method == "GET" && r.path == "/products/:id"));
    assert!(payload.routes.iter().all(|r| r.method != "ALL"));
}

#[tokio::test]
async fn test_automatic_registration_skipped_when_not_ready() {
    let mock = MockDocsServer::start().await.unwrap();
    let (ready, trigger) = ReadySignal::pending();
    let gateway = DocsGateway::with_ready_signal(config(mock.port()), ready).unwrap();

    let app = products_table_app();
    gateway
        .install(&app, Some(PRODUCTS_PORT))
        .apply_to_table(&app)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    trigger.fire();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(mock.registrations().is_empty());
}

#[derive(Clone, Default)]
struct CountingSpawner {
    calls: Arc<AtomicUsize>,
}

impl Spawner for CountingSpawner {
    fn spawn(&self, _binary: &Path) -> SupervisorResult<SpawnedProcess> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SpawnedProcess::detached(None))
    }
}

#[tokio::test]
async fn test_gateways_share_one_subprocess() {
    let spawner = CountingSpawner::default();
    let supervisor = Supervisor::with_spawner(spawner.clone(), Duration::from_millis(10));
    let config = GatewayConfig::builder().bin_dir("/opt/atomicdocs/bin").build().unwrap();

    let first = DocsGateway::with_supervisor(config.clone(), &supervisor).unwrap();
    let second = DocsGateway::with_supervisor(config, &supervisor).unwrap();

    assert_eq!(spawner.calls.load(Ordering::SeqCst), 1);
    assert!(first
        .binary()
        .unwrap()
        .starts_with("/opt/atomicdocs/bin"));
    assert!(second.ready_signal().wait().await);
    assert!(first.ready_signal().is_ready());
}
