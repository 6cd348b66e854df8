//! Subprocess traffic ignores proxy environment variables.
//!
//! Kept in its own test binary: the environment is process-wide.

use std::time::Duration;

use atomicdocs::{DocsGateway, GatewayConfig, ReadySignal, RegistrationOutcome};
use atomicdocs_host::HostRequest;
use atomicdocs_test::{unused_port, users_stack_app, MockDocsServer, TestResponse, USERS_PORT};

#[tokio::test]
async fn test_dead_proxy_in_environment_is_bypassed() {
    let dead_proxy = format!("http://127.0.0.1:{}", unused_port());
    for key in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"] {
        std::env::set_var(key, &dead_proxy);
    }
    for key in ["NO_PROXY", "no_proxy"] {
        std::env::remove_var(key);
    }

    let mock = MockDocsServer::start().await.unwrap();
    let config = GatewayConfig::builder()
        .subprocess_host("127.0.0.1")
        .subprocess_port(mock.port())
        .proxy_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let gateway = DocsGateway::with_ready_signal(config, ReadySignal::ready()).unwrap();

    let app = users_stack_app();
    gateway.install(&app, None).apply_to_stack(&app).unwrap();

    let response = TestResponse::from_http(app.dispatch(HostRequest::get("/docs")).await)
        .await
        .unwrap();
    response.assert_status(200).assert_body_contains("AtomicDocs");

    let outcome = gateway.register(&app, USERS_PORT).await.unwrap();
    assert_eq!(outcome, RegistrationOutcome::Sent { attempts: 1 });
    assert!(mock.wait_for_registrations(1, Duration::from_secs(2)).await);
}
