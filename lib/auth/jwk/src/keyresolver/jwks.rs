//  JWKS.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 11:16:54
//  Last edited:
//    15 Oct 2026, 12:57:13
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a resolver that finds a key by ID in a remote JSON Web
//!   Key Set.
//

use std::time::Duration;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use thiserror::Error;
use tracing::{debug, Instrument as _, Level, span};
use url::Url;

use super::KeyResolver;


/***** CONSTANTS *****/
/// How long we wait for the JWKS endpoint before giving up on a fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);





/***** ERRORS *****/
/// Defines the errors originating from the [`JwksResolver`].
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build the HTTP client.
    #[error("Failed to build HTTP client for JWKS endpoint {endpoint}")]
    Client {
        endpoint: Url,
        #[source]
        err:      reqwest::Error,
    },
    /// Failed to send the request or receive the response.
    #[error("Failed to fetch JWKS from {endpoint}")]
    Fetch {
        endpoint: Url,
        #[source]
        err:      reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("JWKS endpoint {endpoint} returned {status}")]
    Status { endpoint: Url, status: reqwest::StatusCode },
    /// The body was not a JSON Web Key Set.
    #[error("Failed to deserialize JWKS from {endpoint}")]
    Deserialize {
        endpoint: Url,
        #[source]
        err:      reqwest::Error,
    },
    /// The key set did not contain the key we are looking for.
    #[error("Unknown key with ID {kid:?} in JWKS from {endpoint}")]
    UnknownKeyId { endpoint: Url, kid: String },
    /// The key was found but could not be used for verification.
    #[error("Key with ID {kid:?} in JWKS from {endpoint} is not a usable verification key")]
    KeyDecode {
        endpoint: Url,
        kid:      String,
        #[source]
        err:      jsonwebtoken::errors::Error,
    },
}





/***** LIBRARY *****/
/// Resolves one key, by ID, from a remote JSON Web Key Set.
#[derive(Clone, Debug)]
pub struct JwksResolver {
    /// The endpoint serving the key set.
    endpoint: Url,
    /// The ID (`kid`) of the key to use from the set.
    key_id:   String,
    /// The client used to fetch the set. [`None`] if building it failed, in which case it is
    /// rebuilt on every resolve.
    client:   Option<reqwest::Client>,
}
impl JwksResolver {
    /// Constructor for the JwksResolver.
    ///
    /// # Arguments
    /// - `endpoint`: The [`Url`] of the JWKS endpoint.
    /// - `key_id`: The ID of the key to pick from the set.
    ///
    /// # Returns
    /// A new JwksResolver. Note that the endpoint is not contacted until it is resolved.
    #[inline]
    pub fn new(endpoint: Url, key_id: impl Into<String>) -> Self {
        let client: Option<reqwest::Client> = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build().ok();
        Self { endpoint, key_id: key_id.into(), client }
    }

    /// Returns the endpoint of the key set.
    #[inline]
    pub fn endpoint(&self) -> &Url { &self.endpoint }

    /// Returns the ID of the key used from the set.
    #[inline]
    pub fn key_id(&self) -> &str { &self.key_id }
}
impl KeyResolver for JwksResolver {
    type Error = Error;

    fn resolve(&self) -> impl Send + std::future::Future<Output = Result<Vec<DecodingKey>, Self::Error>> {
        let span = span!(Level::DEBUG, "JwksResolver::resolve", endpoint = %self.endpoint, kid = %self.key_id);
        async move {
            let client: reqwest::Client = match &self.client {
                Some(client) => client.clone(),
                None => reqwest::Client::builder()
                    .timeout(FETCH_TIMEOUT)
                    .build()
                    .map_err(|err| Error::Client { endpoint: self.endpoint.clone(), err })?,
            };

            // Fetch the set
            debug!("Fetching JWKS...");
            let res = client.get(self.endpoint.clone()).send().await.map_err(|err| Error::Fetch { endpoint: self.endpoint.clone(), err })?;
            if !res.status().is_success() {
                return Err(Error::Status { endpoint: self.endpoint.clone(), status: res.status() });
            }
            let set: JwkSet = res.json().await.map_err(|err| Error::Deserialize { endpoint: self.endpoint.clone(), err })?;
            debug!("JWKS contains {} key(s)", set.keys.len());

            // Get the key
            let key: &Jwk = match set.find(&self.key_id) {
                Some(key) => key,
                None => return Err(Error::UnknownKeyId { endpoint: self.endpoint.clone(), kid: self.key_id.clone() }),
            };
            let key: DecodingKey =
                DecodingKey::from_jwk(key).map_err(|err| Error::KeyDecode { endpoint: self.endpoint.clone(), kid: self.key_id.clone(), err })?;
            Ok(vec![key])
        }
        .instrument(span)
    }
}
