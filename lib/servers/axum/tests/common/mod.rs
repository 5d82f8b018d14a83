//  MOD.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 10:31:12
//  Last edited:
//    17 Oct 2026, 11:48:36
//  Auto updated?
//    Yes
//
//  Description:
//!   Shared fakes for the `axum-rpc-server` integration tests.
//

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::response::Response;
use serde_json::{json, Value};
use specifications::{full_method, AuthResolver, Call, Code, HttpError, InvalidPayload, Principal, RpcService, Scope};
use thiserror::Error;
use tokio::sync::Notify;


/***** AUTH *****/
#[derive(Debug, Error)]
pub enum FakeAuthError {
    #[error("Missing token")]
    Missing,
    #[error("Token does not grant {0:?}")]
    MissingScope(&'static str),
}
impl HttpError for FakeAuthError {
    fn code(&self) -> Code {
        match self {
            Self::Missing => Code::Unauthenticated,
            Self::MissingScope(_) => Code::PermissionDenied,
        }
    }
}

#[derive(Debug, Error)]
#[error("Key material unavailable")]
pub struct FakeAuthFailure;

/// Knows three tokens: `alice` (scope `read`), `bob` (no scopes) and `broken` (server error).
pub struct FakeAuth;
impl AuthResolver for FakeAuth {
    type ClientError = FakeAuthError;
    type ServerError = FakeAuthFailure;

    async fn authorize(&self, method: &str, headers: &HeaderMap) -> Result<Result<Principal, Self::ClientError>, Self::ServerError> {
        let principal: Principal = match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("Bearer alice") => Principal { subject: "alice".into(), scopes: BTreeSet::from([Scope::from("read")]) },
            Some("Bearer bob") => Principal { subject: "bob".into(), scopes: BTreeSet::new() },
            Some("Bearer broken") => return Err(FakeAuthFailure),
            _ => return Ok(Err(FakeAuthError::Missing)),
        };
        if method.starts_with("/test.Echo/") && !principal.has_scope("read") {
            return Ok(Err(FakeAuthError::MissingScope("read")));
        }
        Ok(Ok(principal))
    }
}



/***** SERVICE *****/
#[derive(Debug, Error)]
pub enum EchoError {
    #[error("Database password is hunter2")]
    Secret,
    #[error("Nothing to see here")]
    Unavailable,
}
impl HttpError for EchoError {
    fn code(&self) -> Code {
        match self {
            Self::Secret => Code::Internal,
            Self::Unavailable => Code::Unavailable,
        }
    }
}

/// A service with methods for every way a call can go.
#[derive(Default)]
pub struct EchoService {
    /// Notified when a `Slow` call has started.
    pub started: Arc<Notify>,
    /// How long `Slow` takes.
    pub slow:    Duration,
}
impl RpcService for EchoService {
    type Error = EchoError;

    fn name(&self) -> &str { "test.Echo" }

    fn methods(&self) -> &[&'static str] { &["Echo", "Whoami", "Slow", "Fail", "Unavailable", "Panic"] }

    fn auth_scopes(&self) -> HashMap<String, Vec<Scope>> {
        self.methods().iter().map(|m| (full_method(self.name(), m), vec![Scope::from("read")])).collect()
    }

    fn validate(&self, method: &str, payload: &Value) -> Result<(), InvalidPayload> {
        if method == "Echo" && !payload.get("message").is_some_and(Value::is_string) {
            return Err(InvalidPayload { method: full_method(self.name(), method), reason: "missing string field \"message\"".into() });
        }
        Ok(())
    }

    async fn call(&self, method: &str, call: Call) -> Result<Value, Self::Error> {
        match method {
            "Echo" => Ok(call.payload),
            "Whoami" => Ok(json!({ "subject": call.principal.map(|p| p.subject) })),
            "Slow" => {
                self.started.notify_one();
                tokio::time::sleep(self.slow).await;
                Ok(json!({ "slept_ms": self.slow.as_millis() as u64 }))
            },
            "Fail" => Err(EchoError::Secret),
            "Unavailable" => Err(EchoError::Unavailable),
            _ => panic!("Method {method:?} exploded"),
        }
    }
}



/***** HTTP *****/
/// Builds a call to the given method.
pub fn call(method: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut req = Request::post(format!("/test.Echo/{method}"));
    if let Some(token) = token {
        req = req.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    req.body(Body::from(body.to_string())).unwrap()
}

/// Reads a response body as JSON.
pub async fn json_body(res: Response) -> Value {
    let raw = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&raw).unwrap_or_else(|err| panic!("Body {:?} is not JSON: {err}", String::from_utf8_lossy(&raw)))
}
