//  AUTHORIZER.rs
//    by Lut99
//
//  Created:
//    16 Oct 2026, 10:14:37
//  Last edited:
//    16 Oct 2026, 12:30:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Tests the [`Authorizer`] against file-backed and scripted key
//!   resolvers.
//

mod common;

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{bearer, keys_dir, mint, now, WarningCollector};
use http::HeaderMap;
use jsonwebtoken::DecodingKey;
use jwk_auth::keyresolver::{FileKeyResolver, KeyResolver};
use jwk_auth::{Authorizer, AuthorizerConfig, ClientError, ServerError};
use serde_json::json;
use specifications::{AuthResolver, Code, HttpError, Scope};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt as _;


/***** HELPERS *****/
const METHOD: &str = "/dss.Discovery/SearchSubscriptions";
const AUDIENCE: &str = "dss.example.com";

fn config(audience: &str, refresh_interval: Duration) -> AuthorizerConfig {
    AuthorizerConfig {
        refresh_interval,
        required_scopes: HashMap::from([(METHOD.to_string(), vec![Scope::from("read")])]),
        required_audience: audience.into(),
    }
}

async fn file_authorizer(audience: &str) -> Authorizer<FileKeyResolver> {
    let resv = FileKeyResolver::new(keys_dir().join("primary.pub.pem"));
    Authorizer::new(resv, config(audience, Duration::ZERO), &CancellationToken::new()).await.unwrap()
}

async fn client_error<A: AuthResolver>(auth: &A, headers: &HeaderMap) -> A::ClientError
where
    A::ServerError: std::fmt::Debug,
{
    match auth.authorize(METHOD, headers).await.unwrap() {
        Ok(principal) => panic!("Expected call to be rejected, but it was authorized as {principal:?}"),
        Err(err) => err,
    }
}

fn load_key(name: &str) -> DecodingKey { DecodingKey::from_rsa_pem(&std::fs::read(keys_dir().join(format!("{name}.pub.pem"))).unwrap()).unwrap() }


/// Serves the primary key once, then fails forever.
#[derive(Default)]
struct FlakyResolver {
    calls: Arc<AtomicUsize>,
}
impl KeyResolver for FlakyResolver {
    type Error = io::Error;

    async fn resolve(&self) -> Result<Vec<DecodingKey>, Self::Error> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(vec![load_key("primary")])
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "key server is down"))
        }
    }
}

/// Serves the primary key until `rotated` is set, then serves the rotated key.
#[derive(Default)]
struct RotatingResolver {
    rotated: Arc<AtomicBool>,
}
impl KeyResolver for RotatingResolver {
    type Error = io::Error;

    async fn resolve(&self) -> Result<Vec<DecodingKey>, Self::Error> {
        Ok(vec![load_key(if self.rotated.load(Ordering::SeqCst) { "rotated" } else { "primary" })])
    }
}

/// Never resolves anything.
struct BrokenResolver;
impl KeyResolver for BrokenResolver {
    type Error = io::Error;

    async fn resolve(&self) -> Result<Vec<DecodingKey>, Self::Error> { Err(io::Error::new(io::ErrorKind::NotFound, "no keys here")) }
}





/***** TESTS *****/
#[tokio::test]
async fn valid_token_yields_principal() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read write", "aud": AUDIENCE, "exp": now() + 600 }));
    let principal = auth.authorize(METHOD, &bearer(&token)).await.unwrap().unwrap();
    assert_eq!(principal.subject, "uss1");
    assert!(principal.has_scope("read"));
    assert!(principal.has_scope("write"));
}

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let auth = file_authorizer(AUDIENCE).await;
    let err = client_error(&auth, &HeaderMap::new()).await;
    assert!(matches!(err, ClientError::AuthHeaderNotFound { .. }));
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn garbage_token_is_unauthenticated() {
    let auth = file_authorizer(AUDIENCE).await;
    let err = client_error(&auth, &bearer("definitely-not-a-jwt")).await;
    assert!(matches!(err, ClientError::IllegalJwt { .. }));
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn expired_token_is_rejected_regardless_of_scopes_and_audience() {
    let auth = file_authorizer(AUDIENCE).await;

    // Everything right except the expiry
    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "aud": AUDIENCE, "exp": now() - 3600 }));
    let err = client_error(&auth, &bearer(&token)).await;
    assert!(matches!(err, ClientError::JwtValidate { .. }), "{err:?}");
    assert_eq!(err.code(), Code::Unauthenticated);

    // Everything wrong, but it's the expiry that is reported
    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "", "aud": "someone-else", "exp": now() - 3600 }));
    let err = client_error(&auth, &bearer(&token)).await;
    assert!(matches!(&err, ClientError::JwtValidate { err, .. } if matches!(err.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)));
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn recently_expired_token_gets_no_grace_period() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "aud": AUDIENCE, "exp": now() - 30 }));
    let err = client_error(&auth, &bearer(&token)).await;
    assert!(matches!(&err, ClientError::JwtValidate { err, .. } if matches!(err.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)), "{err:?}");
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn missing_scope_is_permission_denied() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "write", "aud": AUDIENCE, "exp": now() + 600 }));
    let err = client_error(&auth, &bearer(&token)).await;
    match &err {
        ClientError::MissingScopes { method, missing } => {
            assert_eq!(method, METHOD);
            assert_eq!(missing, &vec![Scope::from("read")]);
        },
        other => panic!("Expected missing scopes, got {other:?}"),
    }
    assert_eq!(err.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn methods_without_requirements_need_no_scopes() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("primary", None, json!({ "sub": "uss1", "aud": AUDIENCE, "exp": now() + 600 }));
    assert!(auth.authorize("/dss.Discovery/Other", &bearer(&token)).await.unwrap().is_ok());
}

#[tokio::test]
async fn audience_is_enforced_when_configured() {
    let auth = file_authorizer(AUDIENCE).await;

    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "aud": "someone-else", "exp": now() + 600 }));
    assert_eq!(client_error(&auth, &bearer(&token)).await.code(), Code::Unauthenticated);

    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "exp": now() + 600 }));
    assert_eq!(client_error(&auth, &bearer(&token)).await.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn empty_audience_accepts_any_audience() {
    let auth = file_authorizer("").await;

    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "aud": "anyone", "exp": now() + 600 }));
    assert!(auth.authorize(METHOD, &bearer(&token)).await.unwrap().is_ok());
}

#[tokio::test]
async fn token_signed_by_untrusted_key_is_rejected() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("rotated", None, json!({ "sub": "uss1", "scope": "read", "aud": AUDIENCE, "exp": now() + 600 }));
    let err = client_error(&auth, &bearer(&token)).await;
    assert!(matches!(err, ClientError::JwtUntrusted { .. }), "{err:?}");
}

#[tokio::test]
async fn empty_subject_is_rejected() {
    let auth = file_authorizer(AUDIENCE).await;
    let token = mint("primary", None, json!({ "sub": "", "scope": "read", "aud": AUDIENCE, "exp": now() + 600 }));
    assert!(matches!(client_error(&auth, &bearer(&token)).await, ClientError::JwtEmptySubject { .. }));
}

#[tokio::test]
async fn initial_resolve_failure_is_fatal() {
    match Authorizer::new(BrokenResolver, config(AUDIENCE, Duration::from_secs(60)), &CancellationToken::new()).await {
        Err(ServerError::KeyResolve { .. }) => {},
        Err(err) => panic!("Expected key resolve error, got {err:?}"),
        Ok(_) => panic!("Expected key resolve error, got an authorizer"),
    }
}

#[tokio::test]
async fn failed_refresh_keeps_previous_keys() {
    let collector = WarningCollector::default();
    let warnings = collector.warnings.clone();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collector));

    let resv = FlakyResolver::default();
    let calls = resv.calls.clone();
    let auth = Authorizer::new(resv, config(AUDIENCE, Duration::from_millis(20)), &CancellationToken::new()).await.unwrap();

    // Let a couple of refreshes fail
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2, "refresh never ran");
    assert!(warnings.lock().unwrap().iter().any(|w| w.contains("Failed to refresh key material")), "{:?}", warnings.lock().unwrap());

    let token = mint("primary", None, json!({ "sub": "uss1", "scope": "read", "aud": AUDIENCE, "exp": now() + 600 }));
    assert!(auth.authorize(METHOD, &bearer(&token)).await.unwrap().is_ok());
}

#[tokio::test]
async fn refresh_picks_up_rotated_keys() {
    let resv = RotatingResolver::default();
    let rotated = resv.rotated.clone();
    let auth = Authorizer::new(resv, config(AUDIENCE, Duration::from_millis(20)), &CancellationToken::new()).await.unwrap();

    let token = mint("rotated", None, json!({ "sub": "uss1", "scope": "read", "aud": AUDIENCE, "exp": now() + 600 }));
    assert!(auth.authorize(METHOD, &bearer(&token)).await.unwrap().is_err());

    rotated.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(auth.authorize(METHOD, &bearer(&token)).await.unwrap().is_ok());
}

#[tokio::test]
async fn refresh_stops_when_cancelled() {
    let resv = FlakyResolver::default();
    let calls = resv.calls.clone();
    let cancel = CancellationToken::new();
    let _auth = Authorizer::new(resv, config(AUDIENCE, Duration::from_millis(10)), &cancel).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_cancel = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_cancel);
}

#[tokio::test]
async fn refresh_stops_when_last_clone_is_dropped() {
    let resv = FlakyResolver::default();
    let calls = resv.calls.clone();
    let auth = Authorizer::new(resv, config(AUDIENCE, Duration::from_millis(10)), &CancellationToken::new()).await.unwrap();
    let clone = auth.clone();

    drop(auth);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(calls.load(Ordering::SeqCst) > 1, "refresh should still run while a clone is alive");

    drop(clone);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_drop = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_drop);
}
