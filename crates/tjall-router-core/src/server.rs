//! HTTP server implementation

use crate::config::Mode;
use crate::error::{BoxError, RouterError};
use crate::request::Request;
use crate::response::HttpResponse;
use crate::router::Router;
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Bind `addr` and serve `router` until the listener fails
pub async fn serve(router: Router, addr: &str) -> Result<(), BoxError> {
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    serve_listener(router, listener).await
}

/// Serve `router` on an already bound listener
pub async fn serve_listener(router: Router, listener: TcpListener) -> Result<(), BoxError> {
    let router = Arc::new(router);
    info!(addr = %listener.local_addr()?, mode = %router.mode(), "Tjall router listening");

    loop {
        let (stream, _remote_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let router = router.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: hyper::Request<Incoming>| {
                let router = router.clone();
                async move { Ok::<_, Infallible>(handle_request(router, req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Connection error: {}", err);
            }
        });
    }
}

/// Handle a single HTTP request
async fn handle_request(router: Arc<Router>, req: hyper::Request<Incoming>) -> HttpResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = std::time::Instant::now();

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(error = %err, "Failed to read request body");
            let response = plain_response(StatusCode::BAD_REQUEST, "Failed to read request body".to_string());
            log_request(&method, &path, response.status(), start);
            return response;
        }
    };

    let response = match router.run(Request::new(parts, body)).await {
        Ok(response) => response,
        Err(err) => fatal_response(err, router.mode()),
    };

    log_request(&method, &path, response.status(), start);
    response
}

/// Failures the router could not render itself; details only reach the client in dev mode
fn fatal_response(err: RouterError, mode: Mode) -> HttpResponse {
    error!(error = %err, "Request aborted");
    let message = if mode.is_dev() {
        err.to_string()
    } else {
        "Internal server error".to_string()
    };
    plain_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn plain_response(status: StatusCode, message: String) -> HttpResponse {
    let mut response = http::Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Log request completion
fn log_request(method: &http::Method, path: &str, status: StatusCode, start: std::time::Instant) {
    let elapsed = start.elapsed();

    if status.is_success() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
