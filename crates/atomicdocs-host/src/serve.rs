//! Serving host applications over HTTP/1.1.

use std::convert::Infallible;
use std::net::SocketAddr;

use http::{Request, Response, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::body::{self, StreamingBody};
use crate::request::HostRequest;
use crate::stack::StackApp;
use crate::table::TableApp;

/// Bind `addr` and serve `app` until the listener fails.
pub async fn bind_stack(addr: SocketAddr, app: StackApp) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "stack host listening");
    serve_stack(listener, app).await
}

/// Bind `addr` and serve `app` until the listener fails.
pub async fn bind_table(addr: SocketAddr, app: TableApp) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "table host listening");
    serve_table(listener, app).await
}

/// Serve a stack-based host on an already bound listener.
pub async fn serve_stack(listener: TcpListener, app: StackApp) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let local_port = stream.local_addr().ok().map(|addr| addr.port());
        let app = app.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let app = app.clone();
                async move {
                    let response = match HostRequest::from_http(req, local_port).await {
                        Ok(request) => app.dispatch(request).await,
                        Err(e) => bad_request(&e),
                    };
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Serve a table-based host on an already bound listener.
pub async fn serve_table(listener: TcpListener, app: TableApp) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let local_port = stream.local_addr().ok().map(|addr| addr.port());
        let app = app.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let app = app.clone();
                async move {
                    let response = match HostRequest::from_http(req, local_port).await {
                        Ok(request) => app.dispatch(request).await.map(body::full_from),
                        Err(e) => bad_request(&e),
                    };
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

fn bad_request(e: &hyper::Error) -> Response<StreamingBody> {
    debug!(error = %e, "failed to read request body");
    let mut response = Response::new(body::full("Bad Request"));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}
