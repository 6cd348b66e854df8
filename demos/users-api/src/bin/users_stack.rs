//! Stack-based users API with documentation at `/docs`.

use std::net::SocketAddr;

use anyhow::Context as _;
use atomicdocs::telemetry::{init_logging, init_metrics, render_metrics, LogConfig};
use atomicdocs::{DocsGateway, GatewayConfig};
use atomicdocs_host::{serve, HostRequest, ResponseWriter, StackApp};
use http::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

const PORT: u16 = 6767;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::default().with_env_overrides();
    init_logging(&LogConfig::from(&config.logging)).context("failed to initialize logging")?;
    init_metrics().context("failed to initialize metrics")?;

    let gateway = DocsGateway::start(config).context("failed to start AtomicDocs")?;

    let app = StackApp::new();
    gateway.install(&app, None).apply_to_stack(&app)?;

    app.get("/users", |_: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!([{ "id": 1, "name": "John" }]));
    });
    app.post("/users", |req: &HostRequest, res: &mut ResponseWriter| {
        let body: serde_json::Value = serde_json::from_slice(req.body()).unwrap_or_default();
        res.json(&json!({ "id": 2, "name": body.get("name") }));
    });
    app.get("/users/:id", |req: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!({ "id": req.param("id"), "name": "John" }));
    });
    app.delete("/users/:id", |_: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!({ "deleted": true }));
    });
    app.get("/metrics", |_: &HostRequest, res: &mut ResponseWriter| {
        res.send_text(StatusCode::OK, render_metrics().unwrap_or_default());
    });
    app.set("port", PORT);

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));
    let listener = TcpListener::bind(addr).await?;
    info!("App: http://localhost:{}", PORT);
    info!("Docs: {}", gateway.docs_url(PORT));

    gateway.register(&app, PORT);
    serve::serve_stack(listener, app).await?;
    Ok(())
}
