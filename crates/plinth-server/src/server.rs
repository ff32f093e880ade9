//! HTTP server with graceful shutdown.
//!
//! # Architecture
//!
//! - The accept loop runs on its own task and spawns one task per connection.
//! - The main flow waits for either the [`ShutdownSignal`] or a failure of
//!   the accept loop.
//! - On stop, accepting ends, every connection is asked to finish its
//!   in-flight request, and the server waits up to the shutdown timeout for
//!   them to close. Connections still open after that are closed forcibly.
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http::StatusCode;
//! use plinth_core::{Request, Response, ResponseExt};
//! use plinth_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .handler(|_req: Request| async { Response::text(StatusCode::OK, "hello") })
//!         .build()?;
//!
//!     let outcome = server.run().await?;
//!     println!("stopped: {outcome:?}");
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use plinth_core::{boxed, BoxFuture, BoxHandler, Handler, Request, Response, ResponseExt};
use plinth_middleware::{Middleware, TransportChain};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::event::{tracing_listener, Event, EventListener};
use crate::shutdown::{ConnectionGuard, ConnectionTracker, ShutdownReason, ShutdownSignal};
use crate::signal::{Signal, SignalListener};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// How the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection finished within the shutdown timeout.
    Graceful,
    /// The timeout expired and connections were closed forcibly.
    Forced {
        /// Connections still open when the timeout expired.
        remaining: usize,
    },
}

/// The Plinth HTTP server.
///
/// Serves one transport [`Handler`], typically a
/// [`RouterService`](https://docs.rs/plinth-router), wrapped in the
/// configured transport middleware.
pub struct Server {
    config: ServerConfig,
    handler: BoxHandler,
    events: EventListener,
}

impl Server {
    /// Starts building a server.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Registers the configured signals, binds, and serves until a signal
    /// arrives or the accept loop fails.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid, signal registration or binding
    /// fails, or the accept loop hits a non-recoverable error.
    pub async fn run(self) -> Result<ShutdownOutcome, ServerError> {
        let addr = self.config.socket_addr()?;
        let mut signals =
            SignalListener::register(self.config.signals()).map_err(ServerError::Signal)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let shutdown = ShutdownSignal::new();
        let watcher = {
            let shutdown = shutdown.clone();
            let events = Arc::clone(&self.events);
            tokio::spawn(async move {
                let signal: Signal = signals.recv().await;
                events(&Event::SignalReceived(signal));
                shutdown.trigger(ShutdownReason::Signal(signal));
            })
        };

        let result = self.serve(listener, shutdown).await;
        watcher.abort();
        result
    }

    /// Serves connections from `listener` until `shutdown` is triggered or
    /// the accept loop fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Accept`] if the accept loop failed. Connections
    /// are drained the same way before returning.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<ShutdownOutcome, ServerError> {
        self.serve_from(listener, shutdown).await
    }

    async fn serve_from<L: Accept>(
        self,
        listener: L,
        shutdown: ShutdownSignal,
    ) -> Result<ShutdownOutcome, ServerError> {
        let Self {
            config,
            handler,
            events,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            events(&Event::Listening { addr });
        }

        let tracker = ConnectionTracker::new();
        let force_close = ShutdownSignal::new();
        let connections = Connections {
            handler,
            http: http_builder(&config),
            max_body_bytes: config.max_body_bytes(),
            drain: shutdown.clone(),
            force_close: force_close.clone(),
        };

        let mut accept_task = tokio::spawn(accept_loop(listener, tracker.clone(), connections));

        let failure = tokio::select! {
            _ = shutdown.recv() => None,
            joined = &mut accept_task => Some(match joined {
                Ok(err) => err,
                Err(join_err) => io::Error::other(join_err),
            }),
        };
        if failure.is_none() {
            // Dropping the task closes the listening socket.
            accept_task.abort();
            let _ = accept_task.await;
        }

        if let Some(err) = &failure {
            events(&Event::ServerFailed(err.to_string()));
            shutdown.trigger(ShutdownReason::ServerError);
        }

        let timeout = config.shutdown_timeout();
        events(&Event::ShutdownStarted {
            reason: shutdown.reason().unwrap_or(ShutdownReason::Requested),
            timeout,
            active: tracker.active_connections(),
        });

        let outcome = if tokio::time::timeout(timeout, tracker.wait_idle())
            .await
            .is_ok()
        {
            events(&Event::ShutdownCompleted);
            ShutdownOutcome::Graceful
        } else {
            let remaining = tracker.active_connections();
            events(&Event::ForcedClose { remaining });
            force_close.trigger(ShutdownReason::Requested);
            ShutdownOutcome::Forced { remaining }
        };

        match failure {
            Some(err) => Err(ServerError::Accept(err)),
            None => Ok(outcome),
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    events: EventListener,
    middleware: TransportChain,
    handler: Option<BoxHandler>,
}

impl ServerBuilder {
    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Replaces the set of signals that trigger shutdown.
    #[must_use]
    pub fn signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.config.signals = signals.into_iter().collect();
        self
    }

    /// Sets the lifecycle event callback. Defaults to logging via `tracing`.
    #[must_use]
    pub fn event_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events = Arc::new(listener);
        self
    }

    /// Appends a transport middleware.
    #[must_use]
    pub fn middleware<M: Middleware<BoxHandler>>(mut self, middleware: M) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends every middleware of `chain`.
    #[must_use]
    pub fn middlewares(mut self, chain: &TransportChain) -> Self {
        self.middleware.extend(chain);
        self
    }

    /// Sets the handler that serves every request.
    #[must_use]
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handler = Some(boxed(handler));
        self
    }

    /// Builds the server, wrapping the handler in the transport middleware.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MissingHandler`] if no handler was set.
    pub fn build(self) -> Result<Server, ServerError> {
        let handler = self.handler.ok_or(ServerError::MissingHandler)?;
        Ok(Server {
            config: self.config,
            handler: self.middleware.then(answer_rejected_bodies(handler)),
            events: self.events,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: ServerConfig::default(),
            events: tracing_listener(),
            middleware: TransportChain::new(),
            handler: None,
        }
    }
}

fn http_builder(config: &ServerConfig) -> http1::Builder {
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(config.keep_alive())
        .header_read_timeout(config.header_read_timeout());
    builder
}

/// Everything a connection task needs.
#[derive(Clone)]
struct Connections {
    handler: BoxHandler,
    http: http1::Builder,
    max_body_bytes: usize,
    drain: ShutdownSignal,
    force_close: ShutdownSignal,
}

/// Source of incoming connections.
trait Accept: Send + Sync + 'static {
    fn accept(&self) -> BoxFuture<'_, io::Result<(TcpStream, SocketAddr)>>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    fn accept(&self) -> BoxFuture<'_, io::Result<(TcpStream, SocketAddr)>> {
        Box::pin(Self::accept(self))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Self::local_addr(self)
    }
}

/// Accepts until a non-recoverable error, which it returns.
async fn accept_loop<L: Accept>(
    listener: L,
    tracker: ConnectionTracker,
    connections: Connections,
) -> io::Error {
    let mut backoff = ACCEPT_BACKOFF_MIN;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                backoff = ACCEPT_BACKOFF_MIN;
                let guard = tracker.acquire();
                tokio::spawn(connections.clone().serve(stream, peer, guard));
            }
            Err(err) if is_transient(&err) => {
                tracing::warn!(error = %err, backoff = ?backoff, "Accept failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
            }
            Err(err) => return err,
        }
    }
}

/// Errors tied to a single connection or to temporary resource exhaustion.
fn is_transient(err: &io::Error) -> bool {
    // EMFILE and ENFILE share these numbers on Linux and the BSDs.
    const EMFILE: i32 = 24;
    const ENFILE: i32 = 23;

    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || (cfg!(unix) && matches!(err.raw_os_error(), Some(EMFILE | ENFILE)))
}

impl Connections {
    async fn serve(self, stream: TcpStream, peer: SocketAddr, _guard: ConnectionGuard) {
        let Self {
            handler,
            http,
            max_body_bytes,
            drain,
            force_close,
        } = self;

        let service = service_fn(move |request: http::Request<Incoming>| {
            let handler = Arc::clone(&handler);
            async move { Ok::<_, Infallible>(handle(request, handler, max_body_bytes).await) }
        });

        let conn = http.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let drain = drain.recv();
        tokio::pin!(drain);
        let killed = force_close.recv();
        tokio::pin!(killed);
        let mut draining = false;

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        tracing::debug!(%peer, error = %err, "Connection error");
                    }
                    break;
                }
                _ = &mut drain, if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
                _ = &mut killed => {
                    tracing::debug!(%peer, "Connection closed forcibly");
                    break;
                }
            }
        }
    }
}

/// A request body the server could not buffer.
///
/// Carried in the request extensions so the rejection is answered inside the
/// transport chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyRejection {
    TooLarge { limit: usize },
    Unreadable,
}

impl BodyRejection {
    fn into_response(self) -> Response {
        match self {
            Self::TooLarge { limit } => Response::json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                &format!("request body exceeds {limit} bytes"),
            ),
            Self::Unreadable => Response::json_error(
                StatusCode::BAD_REQUEST,
                "BODY_READ_ERROR",
                "failed to read request body",
            ),
        }
    }
}

/// Innermost transport stage: answers a [`BodyRejection`] in place of the
/// handler.
fn answer_rejected_bodies(handler: BoxHandler) -> BoxHandler {
    boxed(move |request: Request| -> BoxFuture<'static, Response> {
        match request.extensions().get::<BodyRejection>().copied() {
            Some(rejection) => Box::pin(async move { rejection.into_response() }),
            None => handler.call(request),
        }
    })
}

/// Buffers the body under the size limit, then runs the handler. A body
/// that cannot be buffered is replaced by an empty one and marked.
async fn handle(request: http::Request<Incoming>, handler: BoxHandler, limit: usize) -> Response {
    let (parts, body) = request.into_parts();

    let request = match Limited::new(body, limit).collect().await {
        Ok(collected) => Request::from_parts(parts, collected.to_bytes()),
        Err(err) => {
            let rejection = if err.is::<http_body_util::LengthLimitError>() {
                BodyRejection::TooLarge { limit }
            } else {
                tracing::debug!(error = %err, "Failed to read request body");
                BodyRejection::Unreadable
            };
            let mut request = Request::from_parts(parts, Bytes::new());
            request.extensions_mut().insert(rejection);
            request
        }
    };

    handler.call(request).await
}
