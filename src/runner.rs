//  RUNNER.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 10:44:02
//  Last edited:
//    17 Oct 2026, 16:20:31
//  Auto updated?
//    Yes
//
//  Description:
//!   Brings everything up in the right order: the store first, then the
//!   key material, then the server.
//

use std::error::Error as StdError;

use axum_rpc_server::AxumServer;
use jwk_auth::keyresolver::{KeySource, SelectError};
use jwk_auth::{Authorizer, AuthorizerConfig};
use specifications::{RpcService, Server as _, StoreConnector};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, span, Instrument as _, Level};

use crate::buildinfo;
use crate::config::Configuration;


/***** ERRORS *****/
/// Defines everything that can stop the backend from starting or serving.
#[derive(Debug, Error)]
pub enum Error {
    /// The store parameters did not make a descriptor.
    #[error("Failed to build store connection descriptor")]
    Descriptor {
        #[source]
        err: Box<dyn 'static + Send + Sync + StdError>,
    },
    /// The store could not be reached.
    #[error("Failed to connect to store")]
    Dial {
        #[source]
        err: Box<dyn 'static + Send + Sync + StdError>,
    },
    /// The store could not be brought up to date.
    #[error("Failed to bootstrap store")]
    Bootstrap {
        #[source]
        err: Box<dyn 'static + Send + Sync + StdError>,
    },
    /// The key source configuration was illegal.
    #[error("Failed to select key source")]
    KeySource {
        #[source]
        err: SelectError,
    },
    /// The initial key material could not be obtained.
    #[error("Failed to create authorizer")]
    Authorizer {
        #[source]
        err: jwk_auth::ServerError,
    },
    /// The server failed.
    #[error("Failed to serve")]
    Serve {
        #[source]
        err: axum_rpc_server::Error,
    },
}





/***** LIBRARY *****/
/// The server that [`prepare()`] assembles.
pub type Backend<S> = AxumServer<Authorizer<KeySource>, S>;



/// Assembles a server without opening any socket.
///
/// In order, this:
/// 1. builds the store's connection descriptor;
/// 2. dials the store;
/// 3. bootstraps its schema;
/// 4. builds the service around the store handle;
/// 5. selects a key source and, if there is one, resolves its keys into an [`Authorizer`];
/// 6. builds the server with the configured timeout, reflection and payload dumping.
///
/// # Arguments
/// - `config`: The resolved [`Configuration`].
/// - `connector`: The [`StoreConnector`] for the store.
/// - `make_service`: Builds the [`RpcService`] to serve from the store handle.
/// - `cancel`: Aborts the bootstrap and stops key refreshing when cancelled.
///
/// # Errors
/// This function errors if any of the steps fails. Later steps are then not attempted.
pub async fn prepare<C, S, F>(config: &Configuration, connector: &C, make_service: F, cancel: &CancellationToken) -> Result<Backend<S>, Error>
where
    C: StoreConnector,
    S: RpcService,
    F: FnOnce(C::Handle) -> S,
{
    let span = span!(Level::INFO, "prepare", addr = %config.addr);
    async move {
        // Get the store up
        debug!("Preparing store...");
        let descriptor: String = connector.build_connection_descriptor(&config.store).map_err(|err| Error::Descriptor { err: Box::new(err) })?;
        let handle: C::Handle = connector.dial(&descriptor).await.map_err(|err| Error::Dial { err: Box::new(err) })?;
        connector.bootstrap(&handle, cancel).await.map_err(|err| Error::Bootstrap { err: Box::new(err) })?;
        let service: S = make_service(handle);
        info!("Store ready; serving {:?}", service.name());

        // Find the keys
        let source: Option<KeySource> =
            KeySource::select(config.public_key_file.as_deref(), config.jwks_endpoint.as_deref(), config.jwks_key_id.as_deref())
                .map_err(|err| Error::KeySource { err })?;
        let auth: Option<Authorizer<KeySource>> = match source {
            Some(source) => {
                let config = AuthorizerConfig {
                    refresh_interval:  config.key_refresh_interval,
                    required_scopes:   service.auth_scopes(),
                    required_audience: config.jwt_audience.clone(),
                };
                Some(Authorizer::new(source, config, cancel).await.map_err(|err| Error::Authorizer { err })?)
            },
            None => None,
        };

        // Build the server
        Ok(AxumServer::new(config.addr, auth, service)
            .with_timeout(config.timeout)
            .with_reflection(config.reflect_api)
            .with_payload_dump(config.dump_requests))
    }
    .instrument(span)
    .await
}

/// Prepares and then serves the backend until `cancel` is cancelled.
///
/// # Errors
/// This function errors if [`prepare()`] fails or the server fails.
pub async fn run_server<C, S, F>(config: &Configuration, connector: &C, make_service: F, cancel: CancellationToken) -> Result<(), Error>
where
    C: StoreConnector,
    S: RpcService,
    F: FnOnce(C::Handle) -> S,
{
    info!("{}", buildinfo::describe());
    let server: Backend<S> = prepare(config, connector, make_service, &cancel).await?;
    server.serve(cancel).await.map_err(|err| Error::Serve { err })
}
