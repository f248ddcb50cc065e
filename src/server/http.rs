//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::key_source::KeySource;
use crate::routes;
use crate::signing::SigningService;
use crate::types::SignerError;

/// Request bodies above this size are rejected
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub signing: Arc<SigningService>,
    /// Where admin re-activation reloads the key from
    pub key_source: Option<Arc<dyn KeySource>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        signing: Arc<SigningService>,
        key_source: Option<Arc<dyn KeySource>>,
    ) -> Self {
        Self {
            args,
            signing,
            key_source,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server and run until Ctrl-C
pub async fn run(state: Arc<AppState>) -> Result<(), SignerError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Session signer listening on {}", state.args.listen);

    if !state.args.admin_enabled() {
        info!("API_KEY_ADMIN not set - session admin routes disabled");
    }

    serve(listener, state, shutdown_signal()).await
}

/// Accept connections on `listener` until `shutdown` resolves, then destroy
/// the session.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), SignerError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    state.signing.destroy().await;
    info!("Session destroyed on shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed
        error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, "/health") => routes::health_check(state).await,

        (Method::GET, "/version") => routes::version_info(),

        (Method::GET, "/v1/session") => routes::handle_session_status(state).await,

        (Method::POST, "/v1/orders/sign") => match read_body(req.into_body()).await {
            Ok(body) => routes::handle_sign_order(state, body).await,
            Err(e) => routes::error_response(e),
        },

        (Method::POST, "/v1/session/activate") => {
            let (parts, body) = req.into_parts();
            match read_body(body).await {
                Ok(body) => routes::handle_activate(state, &parts.headers, body).await,
                Err(e) => routes::error_response(e),
            }
        }

        (Method::DELETE, "/v1/session") => routes::handle_destroy(state, req.headers()).await,

        _ => not_found_response(&path),
    };

    Ok(response)
}

async fn read_body(body: Incoming) -> Result<Bytes, SignerError> {
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            Err(SignerError::InvalidInput(format!(
                "request body unreadable or larger than {} bytes",
                MAX_BODY_BYTES
            )))
        }
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::error_response(SignerError::NotFound(path.to_string()))
}
