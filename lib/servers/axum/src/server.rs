//  SERVER.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:28:29
//  Last edited:
//    17 Oct 2026, 10:18:45
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the server itself, including its lifecycle.
//

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::Router;
use axum_rpc_server_spec::{ReflectionResponse, CALL_PATH, REFLECTION_PATH};
use error_trace::{trace, ErrorTrace as _};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use specifications::{AuthResolver, RpcService, Server};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_service::Service as _;
use tracing::{debug, info, span, warn, Instrument as _, Level};

use crate::chain::{InterceptorChain, Stage};
use crate::paths::{self, Dispatcher};


/***** CONSTANTS *****/
/// The default time a call may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);





/***** ERRORS *****/
/// Defines errors emitted by the [`AxumServer`].
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to accept new connections.
    #[error("Failed to accept new connections on {addr}")]
    Accept {
        addr: SocketAddr,
        #[source]
        err:  io::Error,
    },
    /// Failed to bind the listener.
    #[error("Failed to bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        err:  io::Error,
    },
}





/***** HELPER FUNCTIONS *****/
/// Returns whether an accept error concerns only the one connection, rather than the listener.
#[inline]
fn is_connection_error(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset)
}





/***** AUXILLARY *****/
/// The lifecycle of an [`AxumServer`].
///
/// A server only ever moves forward through these states:
/// `Created -> Listening -> Serving -> Draining -> Stopped`. If binding fails, it moves from
/// `Created` to `Stopped` directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServiceState {
    /// The server has not started yet.
    Created,
    /// The listener is bound, but no connections are accepted yet.
    Listening { addr: SocketAddr },
    /// Connections are accepted and served.
    Serving { addr: SocketAddr },
    /// No new connections are accepted; in-flight calls are completing.
    Draining,
    /// Everything is done and the listener is released.
    Stopped,
}
impl ServiceState {
    /// Returns the address the server is bound to, if it is.
    #[inline]
    pub fn addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Listening { addr } | Self::Serving { addr } => Some(*addr),
            _ => None,
        }
    }
}





/***** LIBRARY *****/
/// Defines the RPC backend's [`axum`] [`Server`].
pub struct AxumServer<A, S> {
    /// The address on which to bind the server.
    pub(crate) addr:    SocketAddr,
    /// The auth resolver for authorizing calls. If [`None`], calls are not authorized at all.
    pub(crate) auth:    Option<Arc<A>>,
    /// The business logic to dispatch calls to.
    pub(crate) service: Arc<S>,
    /// How long a call may take.
    timeout: Duration,
    /// Whether to serve the [`REFLECTION_PATH`].
    reflection: bool,
    /// Whether to log payloads.
    dump: bool,
    /// Publishes the [`ServiceState`].
    state: watch::Sender<ServiceState>,
}
impl<A, S> AxumServer<A, S> {
    /// Constructor for the AxumServer.
    ///
    /// # Arguments
    /// - `addr`: The address on which to listen once [`serve()`](AxumServer::serve())ing.
    /// - `auth`: The [`AuthResolver`] used to authorize incoming calls. If [`None`], the chain
    ///   has no authorization stage.
    /// - `service`: The [`RpcService`] that calls are dispatched to.
    ///
    /// # Returns
    /// A new AxumServer, ready to serve its opponents.
    #[inline]
    pub fn new(addr: impl Into<SocketAddr>, auth: Option<A>, service: S) -> Self {
        let (state, _) = watch::channel(ServiceState::Created);
        Self {
            addr: addr.into(),
            auth: auth.map(Arc::new),
            service: Arc::new(service),
            timeout: DEFAULT_TIMEOUT,
            reflection: false,
            dump: false,
            state,
        }
    }

    /// Sets how long a call may take before it's answered with a deadline error. Zero means no
    /// limit.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether to describe the served API on the [`REFLECTION_PATH`].
    #[inline]
    pub fn with_reflection(mut self, reflection: bool) -> Self {
        self.reflection = reflection;
        self
    }

    /// Sets whether to log the payloads of every call and response.
    #[inline]
    pub fn with_payload_dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    /// Returns the address on which this server will listen.
    #[inline]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Returns the interceptor chain that calls to this server pass through.
    #[inline]
    pub fn chain(&self) -> InterceptorChain { InterceptorChain::new(self.auth.is_some(), self.dump) }

    /// Returns a receiver that observes the [`ServiceState`] of this server.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> { self.state.subscribe() }
}
impl<A, S> AxumServer<A, S>
where
    A: 'static + Send + Sync + AuthResolver,
    A::ClientError: 'static + Send,
    A::ServerError: 'static + Send,
    S: RpcService,
{
    /// Builds the routes of this server.
    ///
    /// Calls go through the [`chain()`](AxumServer::chain()); reflection, if enabled, does not.
    ///
    /// # Returns
    /// A [`Router`] that can be served.
    pub fn router(&self) -> Router {
        let calls: Router = Router::new()
            .route(CALL_PATH.path, CALL_PATH.handler(paths::dispatch::<S>))
            .fallback(paths::not_found)
            .method_not_allowed_fallback(paths::not_found)
            .with_state(Dispatcher { service: self.service.clone(), timeout: self.timeout });
        let calls: Router = self.chain().apply(calls, self);

        if self.reflection {
            debug!("Serving reflection on {:?}", REFLECTION_PATH.path);
            let reflection: Arc<ReflectionResponse> = Arc::new(paths::describe(&*self.service));
            calls.merge(Router::new().route(REFLECTION_PATH.path, REFLECTION_PATH.handler(paths::reflect)).with_state(reflection))
        } else {
            calls
        }
    }
}
impl<A, S> Server for AxumServer<A, S>
where
    A: 'static + Send + Sync + AuthResolver,
    A::ClientError: 'static + Send,
    A::ServerError: 'static + Send,
    S: RpcService,
{
    type Error = Error;

    fn serve(self, shutdown: CancellationToken) -> impl Future<Output = Result<(), Self::Error>> {
        let span = span!(Level::INFO, "AxumServer::serve", addr = %self.addr, service = self.service.name());
        async move {
            // First, define the axum paths
            debug!("Building axum paths...");
            let chain: InterceptorChain = self.chain();
            debug!("Interceptor chain: {}", chain.stages().iter().map(ToString::to_string).collect::<Vec<String>>().join(" -> "));
            if chain.contains(Stage::PayloadDump) {
                warn!("Payload dumping is enabled; payloads of all calls (including any secrets in them) are logged");
            }
            let router: Router = self.router();

            // Bind the listener
            let listener: TcpListener = match TcpListener::bind(self.addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    self.state.send_replace(ServiceState::Stopped);
                    return Err(Error::Bind { addr: self.addr, err });
                },
            };
            let addr: SocketAddr = listener.local_addr().unwrap_or(self.addr);
            self.state.send_replace(ServiceState::Listening { addr });

            // Watch for the shutdown signal; the drain token is also fired if we stop on our own
            let drain: CancellationToken = CancellationToken::new();
            let watcher = tokio::spawn({
                let drain: CancellationToken = drain.clone();
                let state: watch::Sender<ServiceState> = self.state.clone();
                async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("Shutdown requested; no longer accepting new calls");
                            drain.cancel();
                            state.send_replace(ServiceState::Draining);
                        },
                        _ = drain.cancelled() => {},
                    }
                }
            });

            // Serve connections until told otherwise
            info!("Serving on {addr}");
            self.state.send_replace(ServiceState::Serving { addr });
            let graceful = GracefulShutdown::new();
            let builder = Builder::new(TokioExecutor::new());
            let res: Result<(), Error> = loop {
                let (stream, client): (TcpStream, SocketAddr) = tokio::select! {
                    biased;
                    _ = drain.cancelled() => break Ok(()),
                    res = listener.accept() => match res {
                        Ok(res) => res,
                        Err(err) if is_connection_error(&err) => {
                            debug!("{}", trace!(("Failed to accept connection"), err));
                            continue;
                        },
                        Err(err) => break Err(Error::Accept { addr, err }),
                    },
                };
                debug!("Accepted connection from {client}");

                let router: Router = router.clone();
                let service = hyper::service::service_fn(move |mut req: hyper::Request<Incoming>| {
                    req.extensions_mut().insert(ConnectInfo(client));
                    router.clone().call(req)
                });
                let conn = graceful.watch(builder.serve_connection_with_upgrades(TokioIo::new(stream), service).into_owned());
                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        debug!("Connection with {client} ended abnormally: {}", err.trace());
                    }
                });
            };

            // Let everything that is in flight finish
            self.state.send_replace(ServiceState::Draining);
            drain.cancel();
            debug!("Draining in-flight calls...");
            graceful.shutdown().await;
            drop(listener);
            if let Err(err) = watcher.await {
                warn!("{}", trace!(("Shutdown watcher did not stop cleanly"), err));
            }
            self.state.send_replace(ServiceState::Stopped);
            info!("Stopped serving on {addr}");
            res
        }
        .instrument(span)
    }
}
