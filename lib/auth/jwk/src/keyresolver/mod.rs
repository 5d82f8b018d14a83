//  KEYRESOLVER.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:58:43
//  Last edited:
//    15 Oct 2026, 13:02:09
//  Auto updated?
//    Yes
//
//  Description:
//!   Provides resolvers for the key material used to verify JWTs.
//

// Modules
pub mod file;
pub mod jwks;

// Imports
use std::error::Error;
use std::future::Future;
use std::path::Path;

pub use file::FileKeyResolver;
use jsonwebtoken::DecodingKey;
pub use jwks::JwksResolver;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;


/***** ERRORS *****/
/// Defines errors that occur when selecting a [`KeySource`].
#[derive(Debug, Error)]
pub enum SelectError {
    /// The given JWKS endpoint was not a valid URI.
    #[error("Illegal JWKS endpoint {raw:?}")]
    IllegalEndpoint {
        raw: String,
        #[source]
        err: url::ParseError,
    },
}

/// Defines errors that occur when a [`KeySource`] fails to resolve.
#[derive(Debug, Error)]
pub enum KeySourceError {
    /// The file-backed resolver failed.
    #[error(transparent)]
    File(#[from] file::Error),
    /// The JWKS resolver failed.
    #[error(transparent)]
    Jwks(#[from] jwks::Error),
}





/***** LIBRARY *****/
/// The trait implemented by various sources of key material.
///
/// Note that the KeyResolver is intended to be used in a distributed context. As such, any
/// reference to `self` is done immutably only.
pub trait KeyResolver {
    /// Errors produced by the KeyResolver.
    type Error: 'static + Send + Sync + Error;


    /// Obtains the keys that may be used to verify JWTs right now.
    ///
    /// This is called once at startup and then periodically by the
    /// [`Authorizer`](crate::Authorizer), so implementations should go to their source every
    /// time instead of caching.
    ///
    /// # Returns
    /// A list of [`DecodingKey`]s. A JWT is accepted if any of them verifies it.
    ///
    /// # Errors
    /// This function may error if we failed to obtain the keys somehow.
    fn resolve(&self) -> impl Send + Future<Output = Result<Vec<DecodingKey>, Self::Error>>;
}



/// The key source selected for this process.
#[derive(Clone, Debug)]
pub enum KeySource {
    /// Keys are read from a PEM file on disk.
    File(FileKeyResolver),
    /// Keys are fetched from a remote JSON Web Key Set.
    Jwks(JwksResolver),
}
impl KeySource {
    /// Selects at most one key source from the (mutually exclusive) configuration inputs.
    ///
    /// The priority is fixed:
    /// 1. If `public_key_file` is given, that file is used;
    /// 2. else, if both `jwks_endpoint` and `jwks_key_id` are given, that key in that set is used;
    /// 3. else, there is no key source, and calls will not be authorized at all.
    ///
    /// Sources are never combined. Empty strings count as "not given".
    ///
    /// # Arguments
    /// - `public_key_file`: The path to a PEM-encoded public key, if any.
    /// - `jwks_endpoint`: The URI of a JWKS endpoint, if any.
    /// - `jwks_key_id`: The ID of the key to use in the JWKS, if any.
    ///
    /// # Returns
    /// The selected [`KeySource`], or [`None`] if nothing was configured.
    ///
    /// # Errors
    /// This function errors if the JWKS source is selected but the endpoint is not a valid URI.
    pub fn select(public_key_file: Option<&Path>, jwks_endpoint: Option<&str>, jwks_key_id: Option<&str>) -> Result<Option<Self>, SelectError> {
        let jwks_endpoint: Option<&str> = jwks_endpoint.filter(|e| !e.is_empty());
        let jwks_key_id: Option<&str> = jwks_key_id.filter(|k| !k.is_empty());
        match (public_key_file.filter(|p| !p.as_os_str().is_empty()), jwks_endpoint, jwks_key_id) {
            (Some(path), _, _) => {
                if jwks_endpoint.is_some() {
                    warn!("Both a public key file and a JWKS endpoint are configured; using the public key file {:?}", path.display());
                }
                debug!("Using file-backed key resolver over {:?}", path.display());
                Ok(Some(Self::File(FileKeyResolver::new(path))))
            },
            (None, Some(endpoint), Some(key_id)) => {
                let endpoint: Url = Url::parse(endpoint).map_err(|err| SelectError::IllegalEndpoint { raw: endpoint.into(), err })?;
                debug!("Using JWKS key resolver over {endpoint} (key ID {key_id:?})");
                Ok(Some(Self::Jwks(JwksResolver::new(endpoint, key_id))))
            },
            _ => {
                warn!("No key source configured; operating without authorizing interceptor (calls are NOT authenticated)");
                Ok(None)
            },
        }
    }
}
impl KeyResolver for KeySource {
    type Error = KeySourceError;

    #[inline]
    async fn resolve(&self) -> Result<Vec<DecodingKey>, Self::Error> {
        match self {
            Self::File(resv) => Ok(resv.resolve().await?),
            Self::Jwks(resv) => Ok(resv.resolve().await?),
        }
    }
}





/***** TESTS *****/
