use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use axum::routing::future::RouteFuture;
use axum::Router;
use cas_store::BlobStore;
use tokio::net::TcpListener;
use tower::Service;
use tower_http::trace::TraceLayer;

use crate::auth::{CredentialAuthorizer, CredentialPair};
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router::build_router;
use crate::state::AppState;

/// The CAS HTTP service.
///
/// Wraps a [`BlobStore`] with the routing and path-credential gate. The
/// router is built once at construction; cloning the server is cheap and
/// every clone shares the same store and credentials.
#[derive(Clone)]
pub struct CasServer {
    credentials: Arc<CredentialAuthorizer>,
    router: Router,
}

impl CasServer {
    /// A server over `store` with no credentials configured yet. Every
    /// request is rejected until both keys are set.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_credentials(store, CredentialPair::default())
    }

    pub fn with_credentials(store: Arc<dyn BlobStore>, credentials: CredentialPair) -> Self {
        let credentials = Arc::new(CredentialAuthorizer::new(credentials));
        let state = AppState::new(store, credentials.clone());
        Self {
            credentials,
            router: build_router(state),
        }
    }

    pub fn from_config(config: &ServerConfig, store: Arc<dyn BlobStore>) -> Self {
        Self::with_credentials(store, config.credentials())
    }

    pub fn set_access_key(&self, access_key: impl Into<String>) {
        self.credentials.set_access_key(access_key);
    }

    pub fn set_secret_key(&self, secret_key: impl Into<String>) {
        self.credentials.set_secret_key(secret_key);
    }

    pub fn set_credentials(&self, credentials: CredentialPair) {
        self.credentials.replace(credentials);
    }

    pub fn credentials(&self) -> Arc<CredentialPair> {
        self.credentials.snapshot()
    }

    /// The underlying router (useful for testing or nesting).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind `addr` and serve until Ctrl-C.
    pub async fn serve(self, addr: SocketAddr) -> ServerResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        tracing::info!("CAS server listening on {}", listener.local_addr()?);
        let app = self.router.layer(TraceLayer::new_for_http());
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        tracing::info!("CAS server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for CasServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasServer")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Service<Request> for CasServer {
    type Response = Response;
    type Error = Infallible;
    type Future = RouteFuture<Infallible>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Service::<Request<Body>>::poll_ready(&mut self.router, cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.router.call(request)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_store::InMemoryBlobStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn store() -> Arc<dyn BlobStore> {
        Arc::new(InMemoryBlobStore::new())
    }

    #[test]
    fn starts_without_credentials() {
        let server = CasServer::new(store());
        assert_eq!(*server.credentials(), CredentialPair::default());
    }

    #[test]
    fn setters_update_credentials() {
        let server = CasServer::new(store());
        server.set_access_key("u");
        server.set_secret_key("p");
        assert_eq!(*server.credentials(), CredentialPair::new("u", "p"));

        // Clones share the same configuration.
        let clone = server.clone();
        clone.set_credentials(CredentialPair::new("v", "q"));
        assert_eq!(*server.credentials(), CredentialPair::new("v", "q"));
    }

    #[test]
    fn from_config_applies_credentials() {
        let config = ServerConfig {
            access_key: "a".into(),
            secret_key: "b".into(),
            ..Default::default()
        };
        let server = CasServer::from_config(&config, store());
        assert_eq!(*server.credentials(), CredentialPair::new("a", "b"));
    }

    #[test]
    fn debug_hides_secret() {
        let server = CasServer::with_credentials(store(), CredentialPair::new("u", "hunter2"));
        let debug = format!("{server:?}");
        assert!(debug.contains("CasServer"));
        assert!(!debug.contains("hunter2"));
    }

    async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        conn.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let server = CasServer::with_credentials(store(), CredentialPair::new("u", "p"));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(listener, async move {
            let _ = stop_rx.await;
        }));

        let put = roundtrip(
            addr,
            "PUT /u/p/foo HTTP/1.1\r\nHost: test\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(put.starts_with("HTTP/1.1 204"), "{put}");

        let chunked = roundtrip(
            addr,
            "PUT /u/p/bar HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n3\r\nabc\r\n0\r\n\r\n",
        )
        .await;
        assert!(chunked.starts_with("HTTP/1.1 204"), "{chunked}");

        let no_body = roundtrip(
            addr,
            "PUT /u/p/baz HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(no_body.starts_with("HTTP/1.1 400"), "{no_body}");
        assert!(no_body.ends_with("No body provided"), "{no_body}");

        let get = roundtrip(
            addr,
            "GET /u/p/foo HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(get.starts_with("HTTP/1.1 200"), "{get}");
        assert!(get.to_ascii_lowercase().contains("content-length: 5"), "{get}");
        assert!(get.ends_with("\r\n\r\nhello"), "{get}");

        let get_chunked = roundtrip(
            addr,
            "GET /u/p/bar HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(get_chunked.ends_with("\r\n\r\nabc"), "{get_chunked}");

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
