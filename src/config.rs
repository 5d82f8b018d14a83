//  CONFIG.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 09:02:44
//  Last edited:
//    17 Oct 2026, 15:31:09
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the command-line arguments of the backend and the
//!   configuration they resolve to.
//

use std::net::{AddrParseError, Ipv4Addr, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use specifications::ConnectionParams;
use thiserror::Error;
use tracing::warn;


/***** ERRORS *****/
/// Defines errors that occur when resolving [`Arguments`] into a [`Configuration`].
#[derive(Debug, Error)]
pub enum Error {
    /// The given listen address was not an address.
    #[error("Illegal listen address {raw:?}")]
    IllegalAddress {
        raw: String,
        #[source]
        err: AddrParseError,
    },
    /// The given listen port (in `:PORT`-form) was not a port.
    #[error("Illegal listen port in address {raw:?}")]
    IllegalPort {
        raw: String,
        #[source]
        err: ParseIntError,
    },
}





/***** HELPER FUNCTIONS *****/
/// Parses a listen address, where a bare `:PORT` means "every interface".
fn parse_addr(raw: &str) -> Result<SocketAddr, Error> {
    match raw.strip_prefix(':') {
        Some(port) => {
            let port: u16 = port.parse().map_err(|err| Error::IllegalPort { raw: raw.into(), err })?;
            Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        },
        None => raw.parse().map_err(|err| Error::IllegalAddress { raw: raw.into(), err }),
    }
}

/// Turns an empty string into [`None`].
#[inline]
fn non_empty(raw: Option<String>) -> Option<String> { raw.filter(|raw| !raw.is_empty()) }





/***** ARGUMENTS *****/
/// Defines the arguments for the backend.
///
/// Every argument can also be given as an `RPC_BACKEND_*` environment variable.
#[derive(Debug, Parser)]
#[clap(name = "rpc-backend", version, about)]
pub struct Arguments {
    /// The address on which to listen for calls. A bare `:PORT` listens on every interface.
    #[clap(long, env = "RPC_BACKEND_ADDR", default_value = ":8081")]
    pub addr: String,
    /// Path to a PEM-encoded RSA public key to verify JWTs with. Takes precedence over the JWKS.
    #[clap(long, env = "RPC_BACKEND_PUBLIC_KEY_FILE")]
    pub public_key_file: Option<String>,
    /// URL pointing to an endpoint serving a JSON Web Key Set.
    #[clap(long, env = "RPC_BACKEND_JWKS_ENDPOINT")]
    pub jwks_endpoint: Option<String>,
    /// ID of the key to use in the JSON Web Key Set.
    #[clap(long, env = "RPC_BACKEND_JWKS_KEY_ID")]
    pub jwks_key_id: Option<String>,
    /// How often to refresh the keys used for JWT verification, in seconds. Zero disables
    /// refreshing.
    #[clap(long, env = "RPC_BACKEND_KEY_REFRESH_TIMEOUT", default_value_t = 60)]
    pub key_refresh_timeout: u64,
    /// How long a call may take, in seconds. Zero disables the deadline.
    #[clap(long, env = "RPC_BACKEND_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,
    /// Whether to describe the served API on `GET /reflection`.
    #[clap(long, env = "RPC_BACKEND_REFLECT_API")]
    pub reflect_api: bool,
    /// Whether to log the payloads of every call and response.
    #[clap(long, env = "RPC_BACKEND_DUMP_REQUESTS")]
    pub dump_requests: bool,
    /// The log level (trace, debug, info, warn or error). `RUST_LOG` overrides it.
    #[clap(long, env = "RPC_BACKEND_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    /// The log format (console or json).
    #[clap(long, env = "RPC_BACKEND_LOG_FORMAT", default_value = "console")]
    pub log_format: String,
    /// The audience (`aud`-claim) that JWTs must be issued for. Empty disables the check.
    #[clap(long, env = "RPC_BACKEND_JWT_AUDIENCE", default_value = "")]
    pub jwt_audience: String,

    /// The CockroachDB host to connect to.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_HOST", default_value = "")]
    pub cockroach_host: String,
    /// The CockroachDB port to connect to.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_PORT", default_value_t = 26257)]
    pub cockroach_port: u16,
    /// The SSL mode of the CockroachDB connection.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_SSL_MODE", default_value = "disable")]
    pub cockroach_ssl_mode: String,
    /// The user to authenticate to CockroachDB as.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_USER", default_value = "root")]
    pub cockroach_user: String,
    /// Directory with the SSL certificates. Must contain `ca.crt`, `client.<user>.crt` and
    /// `client.<user>.key`.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_SSL_DIR", default_value = "")]
    pub cockroach_ssl_dir: String,
    /// The application name with which our connections to CockroachDB are tagged.
    #[clap(long, env = "RPC_BACKEND_COCKROACH_APPLICATION_NAME", default_value = "dss")]
    pub cockroach_application_name: String,
}
impl Arguments {
    /// Resolves these arguments into a [`Configuration`].
    ///
    /// Warns if no JWT audience is configured.
    ///
    /// # Errors
    /// This function errors if the listen address is not an address.
    pub fn resolve(self) -> Result<Configuration, Error> {
        if self.jwt_audience.is_empty() {
            warn!("No JWT audience configured; tokens are accepted regardless of their 'aud' claim");
        }
        Ok(Configuration {
            addr: parse_addr(&self.addr)?,
            public_key_file: non_empty(self.public_key_file).map(PathBuf::from),
            jwks_endpoint: non_empty(self.jwks_endpoint),
            jwks_key_id: non_empty(self.jwks_key_id),
            key_refresh_interval: Duration::from_secs(self.key_refresh_timeout),
            timeout: Duration::from_secs(self.timeout),
            reflect_api: self.reflect_api,
            dump_requests: self.dump_requests,
            jwt_audience: self.jwt_audience,
            store: ConnectionParams {
                host: self.cockroach_host,
                port: self.cockroach_port,
                user: self.cockroach_user,
                ssl_mode: self.cockroach_ssl_mode,
                ssl_dir: self.cockroach_ssl_dir,
                application_name: self.cockroach_application_name,
            },
        })
    }
}





/***** LIBRARY *****/
/// The resolved, immutable configuration of the backend.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Where to listen for calls.
    pub addr: SocketAddr,
    /// Path to a PEM-encoded public key, if any.
    pub public_key_file: Option<PathBuf>,
    /// URL of a JWKS endpoint, if any.
    pub jwks_endpoint: Option<String>,
    /// ID of the key to use from the JWKS, if any.
    pub jwks_key_id: Option<String>,
    /// How often key material is refreshed.
    pub key_refresh_interval: Duration,
    /// How long a call may take.
    pub timeout: Duration,
    /// Whether to serve reflection.
    pub reflect_api: bool,
    /// Whether to log payloads.
    pub dump_requests: bool,
    /// The audience JWTs must be issued for. Empty if not checked.
    pub jwt_audience: String,
    /// How to reach the store.
    pub store: ConnectionParams,
}





/***** TESTS *****/
