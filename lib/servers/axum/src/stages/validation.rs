//  VALIDATION.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 15:20:54
//  Last edited:
//    16 Oct 2026, 16:21:08
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the payload validation stage of the interceptor chain.
//

use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use serde_json::{Map, Value};
use specifications::{Code, RpcService};
use tracing::debug;

use crate::paths::lookup;
use crate::rejection::Rejection;


/***** CONSTANTS *****/
/// The largest payload we accept, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;





/***** AUXILLARY *****/
/// The parsed, validated payload of a call, as left in the request's extensions.
#[derive(Clone, Debug)]
pub struct Payload(pub Value);





/***** LIBRARY *****/
/// Parses the payload of the call as JSON and lets the [`RpcService`] validate it.
///
/// An empty body counts as an empty object. Calls to methods that the service does not know, or
/// that do not use `POST`, are only parsed, as they are rejected by dispatch later.
pub async fn validate<S: RpcService>(State(service): State<Arc<S>>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    // Parse the body
    let raw: Bytes = match to_bytes(body, MAX_PAYLOAD_SIZE).await {
        Ok(raw) => raw,
        Err(err) => {
            return Rejection::new(Code::InvalidArgument, format!("Failed to read payload (at most {MAX_PAYLOAD_SIZE} bytes): {err}")).into_response();
        },
    };
    let payload: Value = if raw.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice(&raw) {
            Ok(payload) => payload,
            Err(err) => return Rejection::new(Code::InvalidArgument, format!("Payload is not valid JSON: {err}")).into_response(),
        }
    };

    // Validate it
    if let Some(method) = lookup(&*service, parts.uri.path()).filter(|_| parts.method == Method::POST) {
        if let Err(err) = service.validate(method, &payload) {
            debug!("Payload for {method:?} is invalid: {}", err.reason);
            return Rejection::new(Code::InvalidArgument, err.to_string()).into_response();
        }
    }

    parts.extensions.insert(Payload(payload));
    next.run(Request::from_parts(parts, Body::from(raw))).await
}
