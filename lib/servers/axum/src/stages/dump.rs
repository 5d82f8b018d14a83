//  DUMP.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 15:44:18
//  Last edited:
//    15 Oct 2026, 15:59:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the (debug-only) payload dump stage of the interceptor
//!   chain.
//

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use error_trace::trace;
use specifications::Code;
use tracing::{error, info};

use super::validation::MAX_PAYLOAD_SIZE;
use crate::rejection::Rejection;


/***** LIBRARY *****/
/// Logs the payloads of the call and its response.
pub async fn dump(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let raw = match to_bytes(body, MAX_PAYLOAD_SIZE).await {
        Ok(raw) => raw,
        Err(err) => return Rejection::new(Code::InvalidArgument, format!("Failed to read payload: {err}")).into_response(),
    };
    info!("Request payload for {:?}: {}", parts.uri.path(), String::from_utf8_lossy(&raw));
    let res: Response = next.run(Request::from_parts(parts, Body::from(raw))).await;

    let (parts, body) = res.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(raw) => {
            info!("Response payload ({}): {}", parts.status, String::from_utf8_lossy(&raw));
            Response::from_parts(parts, Body::from(raw))
        },
        Err(err) => {
            error!("{}", trace!(("Failed to read response payload"), err));
            Rejection::internal(format!("Failed to read response payload: {err}")).into_response()
        },
    }
}
