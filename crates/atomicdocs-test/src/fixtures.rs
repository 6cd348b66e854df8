//! Ready-made host applications.

use atomicdocs_host::{Context, HostRequest, ResponseWriter, StackApp, TableApp};
use http::StatusCode;
use serde_json::json;

/// Port the users fixture records in its settings.
pub const USERS_PORT: u16 = 6767;

/// Port the products fixture is expected to listen on.
pub const PRODUCTS_PORT: u16 = 3000;

/// A stack-based users API with four routes and a `/profile` page.
///
/// The `port` setting is recorded as [`USERS_PORT`].
pub fn users_stack_app() -> StackApp {
    let app = StackApp::new();

    app.get("/users", |_: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!([{ "id": 1, "name": "John" }]));
    });
    app.post("/users", |req: &HostRequest, res: &mut ResponseWriter| {
        let name = serde_json::from_slice::<serde_json::Value>(req.body())
            .ok()
            .and_then(|body| body.get("name").cloned())
            .unwrap_or(serde_json::Value::Null);
        res.json(&json!({ "id": 2, "name": name }));
    });
    app.get("/users/:id", |req: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!({ "id": req.param("id"), "name": "John" }));
    });
    app.delete("/users/:id", |_: &HostRequest, res: &mut ResponseWriter| {
        res.json(&json!({ "deleted": true }));
    });
    app.get("/profile", |_: &HostRequest, res: &mut ResponseWriter| {
        res.send("<h1>Profile</h1>");
    });

    app.set("port", USERS_PORT);
    app
}

/// A table-based products API with four routes and a health check.
pub fn products_table_app() -> TableApp {
    let app = TableApp::new();

    app.get("/products", |ctx: &Context| {
        ctx.json(&json!([{ "id": 1, "name": "Widget" }]))
    });
    app.post("/products", |ctx: &Context| {
        ctx.json(&json!({ "id": 2, "name": "New Product" }))
    });
    app.get("/products/:id", |ctx: &Context| {
        ctx.json(&json!({ "id": ctx.param("id"), "name": "Widget" }))
    });
    app.put("/products/:id", |ctx: &Context| ctx.json(&json!({ "updated": true })));
    app.get("/health", |ctx: &Context| ctx.text(StatusCode::OK, "ok"));

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestResponse;

    #[tokio::test]
    async fn test_users_fixture() {
        let app = users_stack_app();
        assert_eq!(app.port(), Some(USERS_PORT));

        let response = TestResponse::from_http(app.dispatch(HostRequest::get("/users/9")).await)
            .await
            .unwrap();
        response.assert_status(200);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["id"], "9");
    }

    #[tokio::test]
    async fn test_products_fixture() {
        let app = products_table_app();
        assert_eq!(app.routes().len(), 5);

        let response = TestResponse::from_http(app.dispatch(HostRequest::get("/health")).await)
            .await
            .unwrap();
        response.assert_status(200).assert_body_contains("ok");
    }
}
