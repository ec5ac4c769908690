use crate::cert_cache::CertCache;
use anyhow::Result as AnyResult;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const PEM_SUFFIX: &str = ".pem";
const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

#[derive(Clone, Debug)]
pub struct CertServer {
    cache: Arc<CertCache>,
}

impl CertServer {
    pub fn new(cache: Arc<CertCache>) -> Self {
        Self { cache }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/keys/:cert_file", get(Self::handle_cert))
            .route("/metrics", get(Self::handle_metrics))
            .fallback(Self::handle_unknown)
            .with_state(self.cache.clone())
    }

    pub async fn run(&self, listen: SocketAddr, cancel: CancellationToken) -> AnyResult<()> {
        let listener = TcpListener::bind(listen).await?;
        info!("Serving certificates on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        Ok(())
    }

    async fn handle_cert(
        State(cache): State<Arc<CertCache>>,
        Path(cert_file): Path<String>,
    ) -> Response {
        let Some(cert_id) = cert_file.strip_suffix(PEM_SUFFIX) else {
            warn!("Unhandled path requested: /keys/{}", cert_file);
            return StatusCode::NOT_FOUND.into_response();
        };

        match cache.lookup(cert_id) {
            Some(cert) => {
                debug!("Requested certificate found: {}", cert_id);
                ([(header::CONTENT_TYPE, PEM_CONTENT_TYPE)], cert).into_response()
            }
            None => {
                warn!("Requested certificate not found: {}", cert_id);
                StatusCode::NOT_FOUND.into_response()
            }
        }
    }

    async fn handle_metrics(State(cache): State<Arc<CertCache>>) -> Result<String, StatusCode> {
        cache.metrics().encode().map_err(|e| {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }

    async fn handle_unknown(method: Method, uri: Uri) -> StatusCode {
        warn!("Unhandled path requested: {} {}", method, uri);
        StatusCode::NOT_FOUND
    }
}
