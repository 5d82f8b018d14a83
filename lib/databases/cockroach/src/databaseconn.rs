//  DATABASECONN.rs
//    by Lut99
//
//  Created:
//    14 Oct 2026, 10:03:12
//  Last edited:
//    16 Oct 2026, 14:11:37
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the actual [`StoreConnector`].
//

use std::str::FromStr;
use std::time::Duration;

use specifications::{ConnectionParams, StoreConnector};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, span, Instrument as _, Level};


/***** CONSTANTS *****/
/// The application name used when none is given.
pub const DEFAULT_APPLICATION_NAME: &str = "dss";

/// The schema bootstrapped by [`CockroachConnector::bootstrap()`].
const BOOTSTRAP_SCHEMA: &str = include_str!("../migrations/2026-10-14-101500_bootstrap_schema.sql");

/// The version recorded by [`BOOTSTRAP_SCHEMA`].
pub const SCHEMA_VERSION: &str = "v1.0.0";





/***** ERRORS *****/
/// Defines errors for when the [`ConnectionParams`] make no sense.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The given SSL mode is not one that we know.
    #[error("Unknown SSL mode {raw:?} (expected one of {})", SslMode::ALL.iter().map(|m| format!("{:?}", m.as_str())).collect::<Vec<String>>().join(", "))]
    IllegalSslMode { raw: String },
    /// A parameter that must be given was not.
    #[error("Missing required connection parameter {name:?}")]
    MissingParam { name: &'static str },
}

/// Defines errors for when the store could not be reached.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Failed to open the pool (and its first connection).
    #[error("Failed to connect to CockroachDB at {host}")]
    Connect {
        host: String,
        #[source]
        err:  sqlx::Error,
    },
}

/// Defines errors for when the store could not be bootstrapped or used.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The bootstrap was aborted before it completed.
    #[error("Bootstrap of the CockroachDB schema was cancelled")]
    Cancelled,
    /// Failed to apply the schema.
    #[error("Failed to apply schema {version} to CockroachDB")]
    Apply {
        version: &'static str,
        #[source]
        err:     sqlx::Error,
    },
    /// The store did not answer a ping.
    #[error("Failed to ping CockroachDB")]
    Ping {
        #[source]
        err: sqlx::Error,
    },
}





/***** AUXILLARY *****/
/// The SSL modes understood by the PostgreSQL wire protocol.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}
impl SslMode {
    /// All the modes, in order of strictness.
    pub const ALL: [Self; 6] = [Self::Disable, Self::Allow, Self::Prefer, Self::Require, Self::VerifyCa, Self::VerifyFull];

    /// Returns the mode as it appears in a connection URI.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }
}
impl FromStr for SslMode {
    type Err = ConfigError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == s).ok_or_else(|| ConfigError::IllegalSslMode { raw: s.into() })
    }
}





/***** LIBRARY *****/
/// A [`StoreConnector`] that connects to CockroachDB over the PostgreSQL wire protocol.
#[derive(Clone, Debug)]
pub struct CockroachConnector {
    /// The maximum number of connections in the pool.
    max_connections: u32,
    /// How long to wait for a connection before giving up.
    acquire_timeout: Duration,
}
impl Default for CockroachConnector {
    #[inline]
    fn default() -> Self { Self { max_connections: 10, acquire_timeout: Duration::from_secs(10) } }
}
impl CockroachConnector {
    /// Constructor for the CockroachConnector.
    ///
    /// # Arguments
    /// - `max_connections`: The maximum number of connections kept open to the store.
    /// - `acquire_timeout`: How long to wait for a (first) connection before giving up.
    ///
    /// # Returns
    /// A new CockroachConnector.
    #[inline]
    pub fn new(max_connections: u32, acquire_timeout: Duration) -> Self { Self { max_connections, acquire_timeout } }
}
impl StoreConnector for CockroachConnector {
    type ConfigError = ConfigError;
    type ConnectionError = ConnectionError;
    type Handle = CockroachStore;
    type SchemaError = SchemaError;

    fn build_connection_descriptor(&self, params: &ConnectionParams) -> Result<String, Self::ConfigError> {
        if params.host.is_empty() {
            return Err(ConfigError::MissingParam { name: "host" });
        }
        if params.port == 0 {
            return Err(ConfigError::MissingParam { name: "port" });
        }
        if params.user.is_empty() {
            return Err(ConfigError::MissingParam { name: "user" });
        }
        if params.ssl_mode.is_empty() {
            return Err(ConfigError::MissingParam { name: "ssl_mode" });
        }
        let ssl_mode: SslMode = params.ssl_mode.parse()?;
        let app: &str = if params.application_name.is_empty() { DEFAULT_APPLICATION_NAME } else { &params.application_name };

        let mut descriptor: String = format!(
            "postgresql://{}@{}:{}?application_name={}&sslmode={}",
            params.user,
            params.host,
            params.port,
            app,
            ssl_mode.as_str()
        );
        if ssl_mode != SslMode::Disable {
            if params.ssl_dir.is_empty() {
                return Err(ConfigError::MissingParam { name: "ssl_dir" });
            }
            let dir: &str = params.ssl_dir.trim_end_matches('/');
            descriptor.push_str(&format!(
                "&sslrootcert={dir}/ca.crt&sslcert={dir}/client.{user}.crt&sslkey={dir}/client.{user}.key",
                user = params.user
            ));
        }
        Ok(descriptor)
    }

    fn dial(&self, descriptor: &str) -> impl Send + std::future::Future<Output = Result<Self::Handle, Self::ConnectionError>> {
        // Only the host ends up in logs and errors; the rest may point at key material
        let host: String = descriptor.split_once('@').and_then(|(_, rest)| rest.split(['?', '/']).next()).unwrap_or("<unknown>").into();
        let span = span!(Level::INFO, "CockroachConnector::dial", host = %host);
        let options: PgPoolOptions = PgPoolOptions::new().max_connections(self.max_connections).acquire_timeout(self.acquire_timeout);
        let descriptor: String = descriptor.into();
        async move {
            debug!("Opening connection pool...");
            let pool: PgPool = options.connect(&descriptor).await.map_err(|err| ConnectionError::Connect { host: host.clone(), err })?;
            info!("Connected to CockroachDB at {host}");
            Ok(CockroachStore { pool })
        }
        .instrument(span)
    }

    async fn bootstrap(&self, handle: &Self::Handle, cancel: &CancellationToken) -> Result<(), Self::SchemaError> {
        debug!("Applying schema {SCHEMA_VERSION}...");
        tokio::select! {
            _ = cancel.cancelled() => return Err(SchemaError::Cancelled),
            res = sqlx::raw_sql(BOOTSTRAP_SCHEMA).execute(&handle.pool) => {
                res.map_err(|err| SchemaError::Apply { version: SCHEMA_VERSION, err })?;
            },
        }
        info!("Bootstrapped CockroachDB schema {SCHEMA_VERSION}");
        Ok(())
    }
}



/// The handle to a dialed (and, after [`CockroachConnector::bootstrap()`], ready) CockroachDB.
///
/// Cloning is cheap; all clones share one pool.
#[derive(Clone, Debug)]
pub struct CockroachStore {
    /// The pool of connections.
    pool: PgPool,
}
impl CockroachStore {
    /// Checks whether the store still answers.
    ///
    /// # Errors
    /// This function errors if no connection could be acquired or the store did not answer.
    pub async fn ping(&self) -> Result<(), SchemaError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|err| SchemaError::Ping { err })?;
        Ok(())
    }

    /// Returns the pool for running queries against the store.
    #[inline]
    pub fn pool(&self) -> &PgPool { &self.pool }
}





/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "crdb.local".into(),
            port: 26257,
            user: "root".into(),
            ssl_mode: "disable".into(),
            ssl_dir: String::new(),
            application_name: "dss".into(),
        }
    }

    #[test]
    fn insecure_descriptor() {
        let descriptor = CockroachConnector::default().build_connection_descriptor(&params()).unwrap();
        assert_eq!(descriptor, "postgresql://root@crdb.local:26257?application_name=dss&sslmode=disable");
    }

    #[test]
    fn secure_descriptor_points_at_client_certificates() {
        let params = ConnectionParams { ssl_mode: "verify-full".into(), ssl_dir: "/certs/".into(), user: "dss_user".into(), ..params() };
        let descriptor = CockroachConnector::default().build_connection_descriptor(&params).unwrap();
        assert_eq!(
            descriptor,
            "postgresql://dss_user@crdb.local:26257?application_name=dss&sslmode=verify-full&sslrootcert=/certs/ca.crt&sslcert=/certs/client.dss_user.crt&sslkey=/certs/client.dss_user.key"
        );
    }

    #[test]
    fn secure_descriptor_needs_ssl_dir() {
        let params = ConnectionParams { ssl_mode: "require".into(), ..params() };
        assert!(matches!(
            CockroachConnector::default().build_connection_descriptor(&params),
            Err(ConfigError::MissingParam { name: "ssl_dir" })
        ));
    }

    #[test]
    fn missing_params_are_rejected() {
        let conn = CockroachConnector::default();
        assert!(matches!(conn.build_connection_descriptor(&ConnectionParams { host: String::new(), ..params() }), Err(ConfigError::MissingParam { name: "host" })));
        assert!(matches!(conn.build_connection_descriptor(&ConnectionParams { port: 0, ..params() }), Err(ConfigError::MissingParam { name: "port" })));
        assert!(matches!(conn.build_connection_descriptor(&ConnectionParams { user: String::new(), ..params() }), Err(ConfigError::MissingParam { name: "user" })));
        assert!(matches!(
            conn.build_connection_descriptor(&ConnectionParams { ssl_mode: String::new(), ..params() }),
            Err(ConfigError::MissingParam { name: "ssl_mode" })
        ));
    }

    #[test]
    fn unknown_ssl_mode_is_rejected() {
        let params = ConnectionParams { ssl_mode: "sometimes".into(), ..params() };
        match CockroachConnector::default().build_connection_descriptor(&params) {
            Err(err @ ConfigError::IllegalSslMode { .. }) => assert!(err.to_string().contains("\"verify-full\"")),
            other => panic!("Expected illegal SSL mode, got {other:?}"),
        }
    }

    #[test]
    fn empty_application_name_defaults() {
        let params = ConnectionParams { application_name: String::new(), ..params() };
        let descriptor = CockroachConnector::default().build_connection_descriptor(&params).unwrap();
        assert!(descriptor.contains("application_name=dss&"));
    }

    #[tokio::test]
    async fn unreachable_store_fails_to_dial() {
        let conn = CockroachConnector::new(1, Duration::from_millis(200));
        // Nothing listens on port 1
        match conn.dial("postgresql://root@127.0.0.1:1?sslmode=disable").await {
            Err(ConnectionError::Connect { host, .. }) => assert_eq!(host, "127.0.0.1:1"),
            Ok(_) => panic!("Expected connection error, got a store"),
        }
    }
}
