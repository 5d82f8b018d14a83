//  AUTHORIZER.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:37:53
//  Last edited:
//    16 Oct 2026, 09:41:26
//  Auto updated?
//    Yes
//
//  Description:
//!   Provides the actual [`AuthResolver`] implementation, which verifies
//!   bearer tokens against key material that is refreshed in the
//!   background.
//

use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use error_trace::trace;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Deserializer};
use specifications::{AuthResolver, Code, HttpError, Principal, Scope};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::keyresolver::KeyResolver;


/***** CONSTANTS *****/
/// The algorithms we accept tokens to be signed with.
const ALGORITHMS: [Algorithm; 6] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512, Algorithm::PS256, Algorithm::PS384, Algorithm::PS512];





/***** ERRORS *****/
/// Represents server-side errors which the client can't fix.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The embedded [`KeyResolver`] failed to resolve key material.
    #[error("Failed to resolve key material")]
    KeyResolve {
        #[source]
        err: Box<dyn 'static + Send + Sync + Error>,
    },
    /// There is no key material to verify tokens with.
    #[error("No key material available to verify tokens with")]
    NoKeys,
}

/// Represents client-side errors which the server can't fix.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The given 'Authorization'-header did not contain valid UTF-8.
    #[error("Value of header {header:?} in call is non-UTF-8")]
    AuthHeaderNonUtf8 {
        header: &'static str,
        #[source]
        err:    http::header::ToStrError,
    },
    /// No 'Authorization' header found in the call.
    #[error("Missing header {header:?} in call")]
    AuthHeaderNotFound { header: &'static str },
    /// The JWT extracted from the 'Authorization'-header was not a valid JWT.
    #[error("Illegal JWT in header {header:?} in call")]
    IllegalJwt {
        header: &'static str,
        #[source]
        err:    jsonwebtoken::errors::Error,
    },
    /// The JWT's subject claim was empty.
    #[error("JWT in header {header:?} has an empty subject")]
    JwtEmptySubject { header: &'static str },
    /// None of the trusted keys verified the JWT's signature.
    #[error("JWT in header {header:?} is not signed by a trusted key")]
    JwtUntrusted {
        header: &'static str,
        #[source]
        err:    Option<jsonwebtoken::errors::Error>,
    },
    /// Failed to validate the JWT in the given header.
    #[error("Failed to validate JWT in header {header:?}")]
    JwtValidate {
        header: &'static str,
        #[source]
        err:    jsonwebtoken::errors::Error,
    },
    /// The given 'Authorization'-header was missing the 'Bearer '-part.
    #[error("Missing \"Bearer \" in header {header:?} in call")]
    MissingBearer { header: &'static str },
    /// The JWT did not grant all the scopes required for the method.
    #[error("Missing required scope(s) {} for method {method:?}", missing.iter().map(|s| format!("{:?}", s.as_str())).collect::<Vec<String>>().join(", "))]
    MissingScopes { method: String, missing: Vec<Scope> },
}
impl HttpError for ClientError {
    #[inline]
    fn code(&self) -> Code {
        use ClientError::*;
        match self {
            AuthHeaderNonUtf8 { .. }
            | AuthHeaderNotFound { .. }
            | IllegalJwt { .. }
            | JwtEmptySubject { .. }
            | JwtUntrusted { .. }
            | JwtValidate { .. }
            | MissingBearer { .. } => Code::Unauthenticated,
            MissingScopes { .. } => Code::PermissionDenied,
        }
    }
}





/***** HELPER FUNCTIONS *****/
/// Given a (potentially present) `Authorization`-header, attempts to extract the JWT from it.
///
/// # Arguments
/// - `name`: The name of the Authorization header. Only used for debugging in this function.
/// - `value`: The [`HeaderValue`] representing what is in the header (or [`None`]) if it isn't
///   present!).
///
/// # Returns
/// A [`str`] representation of the token.
///
/// # Errors
/// This function may error if the header isn't present, or doesn't bear a token (e.g., missing
/// "Bearer" in the token field).
fn extract_jwt<'h>(name: &'static str, value: Option<&'h HeaderValue>) -> Result<&'h str, ClientError> {
    // Get the header value as a string
    let header_val: &str = match value {
        Some(v) => match v.to_str() {
            Ok(v) => v,
            Err(err) => return Err(ClientError::AuthHeaderNonUtf8 { header: name, err }),
        },
        None => {
            return Err(ClientError::AuthHeaderNotFound { header: name });
        },
    };

    // Split on the bearer thingy
    match header_val.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ClientError::MissingBearer { header: name }),
    }
}

/// Deserializes the space-separated `scope` claim into a set of [`Scope`]s.
fn deserialize_scopes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<Scope>, D::Error> {
    let raw: String = String::deserialize(deserializer)?;
    Ok(raw.split_whitespace().map(Scope::from).collect())
}

/// Returns whether a verification error means "try the next key" rather than "reject".
#[inline]
fn is_key_mismatch(err: &jsonwebtoken::errors::Error) -> bool {
    matches!(err.kind(), ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat)
}





/***** AUXILLARY *****/
/// The claims we need from a JWT. Standard claims (`exp`, `nbf`, `aud`) are checked by
/// [`jsonwebtoken`] itself.
#[derive(Debug, Deserialize)]
struct Claims {
    /// The subject that the token was issued to.
    sub:   String,
    /// The scopes granted by the token.
    #[serde(default, deserialize_with = "deserialize_scopes")]
    scope: BTreeSet<Scope>,
}



/// Configures an [`Authorizer`].
#[derive(Clone, Debug)]
pub struct AuthorizerConfig {
    /// How often the key material is refreshed. A zero interval disables refreshing.
    pub refresh_interval:  Duration,
    /// Maps full method names to the scopes a token must _all_ carry to call them.
    pub required_scopes:   HashMap<String, Vec<Scope>>,
    /// The audience (`aud`-claim) that tokens must be issued for. An empty string disables the
    /// audience check.
    pub required_audience: String,
}



/// The state shared between all clones of an [`Authorizer`] and its refresh task.
struct Inner<K> {
    /// The source of key material.
    resolver: K,
    /// The last-known-good key material.
    keys: ArcSwap<Vec<DecodingKey>>,
    /// Maps full method names to required scopes.
    required_scopes: HashMap<String, Vec<Scope>>,
    /// How we validate tokens.
    validation: Validation,
}



/// Refreshes the key material in `inner` every `period` until cancelled.
///
/// Failures are logged and retried on the next tick; the previous key material stays in use.
async fn refresh_keys<K: KeyResolver>(inner: Arc<Inner<K>>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {},
        }

        let res = tokio::select! {
            _ = cancel.cancelled() => break,
            res = inner.resolver.resolve() => res,
        };
        match res {
            Ok(keys) if !keys.is_empty() => {
                debug!("Refreshed key material ({} key(s))", keys.len());
                inner.keys.store(Arc::new(keys));
            },
            Ok(_) => warn!("Key source returned no keys; keeping previous key material"),
            Err(err) => warn!("{}", trace!(("Failed to refresh key material; keeping previous key material"), err)),
        }
    }
    debug!("Key refresh task stopped");
}





/***** LIBRARY *****/
/// Authorizes calls by verifying the bearer JWT in their headers.
///
/// Cloning is cheap and all clones share the same key material. The background refresh stops when
/// the last clone is dropped (or when the token given to [`Authorizer::new()`] is cancelled).
pub struct Authorizer<K> {
    /// The shared state.
    inner:    Arc<Inner<K>>,
    /// Stops the refresh task once the last clone is gone.
    _refresh: Arc<DropGuard>,
}
impl<K> Clone for Authorizer<K> {
    #[inline]
    fn clone(&self) -> Self { Self { inner: self.inner.clone(), _refresh: self._refresh.clone() } }
}
impl<K> Authorizer<K>
where
    K: 'static + Send + Sync + KeyResolver,
{
    /// Constructor for the Authorizer.
    ///
    /// Resolves the key material once and then spawns a task refreshing it every
    /// `config.refresh_interval`.
    ///
    /// # Arguments
    /// - `resolver`: Something implementing [`KeyResolver`] that provides the keys to verify JWTs
    ///   with.
    /// - `config`: The [`AuthorizerConfig`] with the scope and audience requirements.
    /// - `cancel`: A [`CancellationToken`] that stops the refresh task when cancelled.
    ///
    /// # Returns
    /// A new instance of Self, ready to rumble.
    ///
    /// # Errors
    /// This function errors if the initial key material could not be resolved.
    pub async fn new(resolver: K, config: AuthorizerConfig, cancel: &CancellationToken) -> Result<Self, ServerError> {
        let AuthorizerConfig { refresh_interval, required_scopes, required_audience } = config;

        // Build the validation rules
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = ALGORITHMS.to_vec();
        validation.validate_nbf = true;
        validation.leeway = 0;
        if required_audience.is_empty() {
            debug!("No required JWT audience configured; not checking 'aud' claims");
            validation.validate_aud = false;
            validation.set_required_spec_claims(&["exp", "sub"]);
        } else {
            validation.set_audience(&[&required_audience]);
            validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        }

        // Resolve the first batch of keys
        let keys: Vec<DecodingKey> = resolver.resolve().await.map_err(|err| ServerError::KeyResolve { err: Box::new(err) })?;
        if keys.is_empty() {
            return Err(ServerError::NoKeys);
        }
        info!("Resolved {} key(s) for JWT verification", keys.len());
        let inner = Arc::new(Inner { resolver, keys: ArcSwap::from_pointee(keys), required_scopes, validation });

        // Start refreshing them
        let token: CancellationToken = cancel.child_token();
        if refresh_interval.is_zero() {
            warn!("Key refresh interval is zero; key material will never be refreshed");
        } else {
            tokio::spawn(refresh_keys(inner.clone(), refresh_interval, token.clone()));
        }
        Ok(Self { inner, _refresh: Arc::new(token.drop_guard()) })
    }
}
impl<K> AuthResolver for Authorizer<K>
where
    K: Send + Sync,
{
    type ClientError = ClientError;
    type ServerError = ServerError;

    async fn authorize(&self, method: &str, headers: &HeaderMap) -> Result<Result<Principal, Self::ClientError>, Self::ServerError> {
        let header: &'static str = AUTHORIZATION.as_str();

        // Fetch the JWT from the header
        let raw_jwt: &str = match extract_jwt(header, headers.get(AUTHORIZATION)) {
            Ok(jwt) => jwt,
            Err(err) => return Ok(Err(err)),
        };
        let jwt_header: Header = match jsonwebtoken::decode_header(raw_jwt) {
            Ok(jwt_header) => jwt_header,
            Err(err) => return Ok(Err(ClientError::IllegalJwt { header, err })),
        };
        debug!("JWT header: alg={:?}, kid={:?}", jwt_header.alg, jwt_header.kid);

        // Try every trusted key
        let keys: Arc<Vec<DecodingKey>> = self.inner.keys.load_full();
        if keys.is_empty() {
            return Err(ServerError::NoKeys);
        }
        let mut mismatch: Option<jsonwebtoken::errors::Error> = None;
        let mut claims: Option<Claims> = None;
        for key in keys.iter() {
            match jsonwebtoken::decode::<Claims>(raw_jwt, key, &self.inner.validation) {
                Ok(data) => {
                    claims = Some(data.claims);
                    break;
                },
                Err(err) if is_key_mismatch(&err) => mismatch = Some(err),
                Err(err) => return Ok(Err(ClientError::JwtValidate { header, err })),
            }
        }
        let claims: Claims = match claims {
            Some(claims) => claims,
            None => return Ok(Err(ClientError::JwtUntrusted { header, err: mismatch })),
        };
        if claims.sub.is_empty() {
            return Ok(Err(ClientError::JwtEmptySubject { header }));
        }
        let principal = Principal { subject: claims.sub, scopes: claims.scope };

        // Check the scopes
        if let Some(required) = self.inner.required_scopes.get(method) {
            let missing: Vec<Scope> = required.iter().filter(|scope| !principal.has_scope(scope.as_str())).cloned().collect();
            if !missing.is_empty() {
                return Ok(Err(ClientError::MissingScopes { method: method.into(), missing }));
            }
        }

        debug!("Authorized subject {:?} for {method:?}", principal.subject);
        Ok(Ok(principal))
    }
}





/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_is_required() {
        let value = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert!(matches!(extract_jwt("authorization", Some(&value)), Err(ClientError::MissingBearer { .. })));
        let value = HeaderValue::from_static("Bearer ");
        assert!(matches!(extract_jwt("authorization", Some(&value)), Err(ClientError::MissingBearer { .. })));
        assert!(matches!(extract_jwt("authorization", None), Err(ClientError::AuthHeaderNotFound { .. })));
        let value = HeaderValue::from_static("Bearer a.b.c");
        assert_eq!(extract_jwt("authorization", Some(&value)).unwrap(), "a.b.c");
    }

    #[test]
    fn scope_claim_is_space_separated() {
        let claims: Claims = serde_json::from_str(r#"{"sub": "uss1", "scope": "read  write\tadmin"}"#).unwrap();
        assert_eq!(claims.scope.len(), 3);
        assert!(claims.scope.contains("write"));

        let claims: Claims = serde_json::from_str(r#"{"sub": "uss1"}"#).unwrap();
        assert!(claims.scope.is_empty());
    }

    #[test]
    fn only_scope_errors_are_permission_denied() {
        let err = ClientError::MissingScopes { method: "/svc/Method".into(), missing: vec![Scope::from("read")] };
        assert_eq!(err.code(), Code::PermissionDenied);
        assert_eq!(err.to_string(), "Missing required scope(s) \"read\" for method \"/svc/Method\"");
        assert_eq!(ClientError::MissingBearer { header: "authorization" }.code(), Code::Unauthenticated);
    }
}
