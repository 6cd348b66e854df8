//! Table-based products API with documentation at `/docs`.

use std::net::SocketAddr;

use anyhow::Context as _;
use atomicdocs::telemetry::{init_logging, LogConfig};
use atomicdocs::{DocsGateway, GatewayConfig};
use atomicdocs_host::{serve, Context, TableApp};
use serde_json::json;
use tracing::info;

const PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::default().with_env_overrides();
    init_logging(&LogConfig::from(&config.logging)).context("failed to initialize logging")?;

    let gateway = DocsGateway::start(config).context("failed to start AtomicDocs")?;

    let app = TableApp::new();
    gateway.install(&app, Some(PORT)).apply_to_table(&app)?;

    app.get("/products", |ctx: &Context| ctx.json(&json!([{ "id": 1, "name": "Widget" }])));
    app.post("/products", |ctx: &Context| ctx.json(&json!({ "id": 2, "name": "New Product" })));
    app.get("/products/:id", |ctx: &Context| {
        ctx.json(&json!({ "id": ctx.param("id"), "name": "Widget" }))
    });
    app.put("/products/:id", |ctx: &Context| ctx.json(&json!({ "updated": true })));

    info!("Products app on http://localhost:{}", PORT);
    serve::bind_table(SocketAddr::from(([0, 0, 0, 0], PORT)), app).await?;
    Ok(())
}
