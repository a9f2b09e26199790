//! The HTTP server, handler and routes.
//!
//! This file itself contains fairly little business logic and just sets up the
//! `hyper` server and catches errors. The main logic is in `handlers.rs`.

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::Full;
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::{conn::auto, graceful::GracefulShutdown},
};
use std::{
    convert::Infallible,
    future::Future,
    net::{IpAddr, SocketAddr},
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpListener;

use crate::{api, config::Config, prelude::*, store::Store};
use self::{
    handlers::handle,
    response::internal_server_error,
};


mod handlers;
mod log;
mod response;
mod ws;



/// HTTP server configuration.
#[derive(Debug, Clone, confique::Config)]
pub(crate) struct HttpConfig {
    /// The TCP port the HTTP server should listen on.
    #[config(default = 4000)]
    pub(crate) port: u16,

    /// The bind address to listen on.
    #[config(default = "127.0.0.1")]
    pub(crate) address: IpAddr,

    /// Path of the GraphQL endpoint for queries and mutations (`POST` and
    /// `GET`).
    #[config(default = "/graphql")]
    pub(crate) graphql_path: String,

    /// Path on which WebSocket connections for GraphQL subscriptions are
    /// accepted. Both the `graphql-ws` and the `graphql-transport-ws`
    /// protocols are supported. May be the same as `graphql_path`.
    #[config(default = "/graphql")]
    pub(crate) subscriptions_path: String,

    /// Whether to serve the interactive GraphiQL IDE at `/~graphiql`.
    #[config(default = true)]
    pub(crate) graphiql: bool,

    /// Value of the `Access-Control-Allow-Origin` header added to all
    /// responses. Set to an empty string to not send any CORS headers.
    #[config(default = "*")]
    pub(crate) cors_allowed_origin: String,

    /// Maximum size of a request body in bytes. Larger requests are rejected
    /// with "413 Payload Too Large".
    #[config(default = 1_048_576)]
    pub(crate) max_body_size: usize,

    /// How long to wait for open connections to finish when shutting down.
    #[config(default = "10s", deserialize_with = crate::config::deserialize_duration)]
    pub(crate) shutdown_timeout: Duration,

    /// Interval in which keep-alive messages are sent over subscription
    /// WebSocket connections. "0" disables keep-alive messages.
    #[config(default = "15s", deserialize_with = crate::config::deserialize_duration)]
    pub(crate) ws_keep_alive_interval: Duration,
}

impl HttpConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("graphql_path", &self.graphql_path),
            ("subscriptions_path", &self.subscriptions_path),
        ] {
            if !path.starts_with('/') {
                bail!("'http.{name}' has to start with '/', but is '{path}'");
            }
        }

        Ok(())
    }
}


// Our responses always have the full body in memory.
type Response<T = Full<Bytes>> = hyper::Response<T>;
type Request<T = Incoming> = hyper::Request<T>;


/// Context that the request handler has access to.
struct Context {
    api_root: Arc<api::RootNode>,
    store: Arc<Store>,
    config: Arc<Config>,
}


/// Starts the HTTP server. The future returned by this function must be awaited
/// to actually run it. It resolves once the server was shut down via Ctrl+C or
/// `SIGTERM`.
pub(crate) async fn serve(
    config: Config,
    api_root: api::RootNode,
    store: Arc<Store>,
) -> Result<()> {
    let ctx = Arc::new(Context {
        api_root: Arc::new(api_root),
        store,
        config: Arc::new(config),
    });

    let addr = SocketAddr::new(ctx.config.http.address, ctx.config.http.port);
    let listener = TcpListener::bind(addr).await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!("Listening on http://{}{}", listener.local_addr()?, ctx.config.http.graphql_path);

    run(listener, ctx, shutdown_signal()).await;
    Ok(())
}

/// Accepts connections on `listener` until `shutdown` resolves, then waits for
/// open connections, at most `shutdown_timeout`.
async fn run(listener: TcpListener, ctx: Arc<Context>, shutdown: impl Future<Output = ()>) {
    let shutdown_timeout = ctx.config.http.shutdown_timeout;
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            conn = listener.accept() => match conn {
                Ok(conn) => conn,
                Err(e) => {
                    // These are usually per-connection errors (e.g. the peer
                    // already hung up) and no reason to stop the server.
                    warn!("Failed to accept connection: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };
        trace!("Accepted connection from {peer}");

        // All our logic is encoded in the function `handle`. Upgrades have to
        // be enabled for WebSocket subscriptions to work.
        let ctx = Arc::clone(&ctx);
        let service = service_fn(move |req| {
            handle_internal_errors(handle(req, Arc::clone(&ctx)))
        });
        let conn = auto::Builder::new(TokioExecutor::new())
            .serve_connection_with_upgrades(TokioIo::new(stream), service)
            .into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Error serving connection from {peer}: {e}");
            }
        });
    }

    info!("Shutting down HTTP server ...");
    tokio::select! {
        _ = graceful.shutdown() => debug!("All connections closed"),
        _ = tokio::time::sleep(shutdown_timeout) => {
            warn!(
                "Some connections were still open after {:?}, shutting down anyway",
                shutdown_timeout,
            );
        }
    }
}

/// Resolves on Ctrl+C or, on Unix, on `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// This just wraps another future and catches all panics that might occur when
/// resolving/polling that given future. This ensures that we always answer with
/// `500` instead of just crashing the thread and closing the connection.
async fn handle_internal_errors(
    future: impl Future<Output = Response>,
) -> Result<Response, Infallible> {
    // The `AssertUnwindSafe` is unfortunately necessary. What we are basically
    // saying here is: "if the future panicks, the global/remaining application
    // state is not 'broken'. It is safe to continue with the program in case
    // of a panic." The store recovers from poisoned locks, so that holds.
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(response) => Ok(response),
        Err(panic) => {
            // The `panic` information is just an `Any` object representing the
            // value the panic was invoked with. For most panics (which use
            // `panic!` like `println!`), this is either `&str` or `String`.
            let msg = panic.downcast_ref::<String>()
                .map(|s| s.as_str())
                .or(panic.downcast_ref::<&str>().map(|s| *s));

            match msg {
                Some(msg) => error!("INTERNAL SERVER ERROR: HTTP handler panicked: '{}'", msg),
                None => error!("INTERNAL SERVER ERROR: HTTP handler panicked"),
            }

            Ok(internal_server_error())
        }
    }
}
