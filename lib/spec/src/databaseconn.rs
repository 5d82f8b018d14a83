//  DATABASECONN.rs
//    by Lut99
//
//  Created:
//    18 Oct 2024, 17:38:33
//  Last edited:
//    14 Oct 2026, 11:02:18
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines an interface to the backend store that the business logic
//!   runs against.
//

use std::error::Error;
use std::future::Future;

use tokio_util::sync::CancellationToken;


/***** AUXILLARY *****/
/// The parameters from which a connection descriptor to the backend store is built.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionParams {
    /// The host to connect to.
    pub host: String,
    /// The port to connect to.
    pub port: u16,
    /// The user to authenticate as.
    pub user: String,
    /// The SSL mode to use (e.g., `disable` or `verify-full`).
    pub ssl_mode: String,
    /// The directory with the SSL certificates. Only needed if `ssl_mode` is not `disable`.
    pub ssl_dir: String,
    /// The name with which our connections are tagged in the store.
    pub application_name: String,
}





/***** LIBRARY *****/
/// Defines how the backend connects to, and prepares, the store that the business logic uses.
///
/// Every step is fatal to startup when it fails: the backend never serves against a store that is
/// unreachable or not bootstrapped.
pub trait StoreConnector {
    /// The handle to a dialed store, passed to the business logic.
    type Handle;
    /// Errors for when the [`ConnectionParams`] make no sense.
    type ConfigError: 'static + Send + Sync + Error;
    /// Errors for when the store could not be reached.
    type ConnectionError: 'static + Send + Sync + Error;
    /// Errors for when the store could not be bootstrapped.
    type SchemaError: 'static + Send + Sync + Error;


    /// Builds the descriptor (e.g., a URI) used to dial the store.
    ///
    /// # Arguments
    /// - `params`: The [`ConnectionParams`] to build the descriptor from.
    ///
    /// # Returns
    /// A string that can be given to [`StoreConnector::dial()`].
    ///
    /// # Errors
    /// This function errors if the parameters are incomplete or contradictory.
    fn build_connection_descriptor(&self, params: &ConnectionParams) -> Result<String, Self::ConfigError>;

    /// Opens a connection to the store.
    ///
    /// # Arguments
    /// - `descriptor`: The descriptor as built by [`StoreConnector::build_connection_descriptor()`].
    ///
    /// # Returns
    /// A [`StoreConnector::Handle`] to the connected store.
    ///
    /// # Errors
    /// This function errors if the store could not be reached.
    fn dial(&self, descriptor: &str) -> impl Send + Future<Output = Result<Self::Handle, Self::ConnectionError>>;

    /// Runs first-time setup against a freshly dialed store.
    ///
    /// # Arguments
    /// - `handle`: The [`StoreConnector::Handle`] returned by [`StoreConnector::dial()`].
    /// - `cancel`: A [`CancellationToken`] that aborts the bootstrap when fired.
    ///
    /// # Errors
    /// This function errors if the schema could not be set up (or if it was cancelled).
    fn bootstrap(&self, handle: &Self::Handle, cancel: &CancellationToken) -> impl Send + Future<Output = Result<(), Self::SchemaError>>;
}
