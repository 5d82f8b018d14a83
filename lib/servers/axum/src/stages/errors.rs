//  ERRORS.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 14:48:09
//  Last edited:
//    16 Oct 2026, 16:10:33
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the error normalization stage of the interceptor chain.
//

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use futures::FutureExt as _;
use specifications::Code;
use tracing::{debug, error};

use crate::rejection::{code_for_status, Rejection, INTERNAL_MESSAGE};


/***** CONSTANTS *****/
/// How much of a bare error body we are willing to keep as message.
const MAX_BARE_MESSAGE_SIZE: usize = 16 * 1024;





/***** HELPER FUNCTIONS *****/
/// Extracts something printable from a panic payload.
fn panic_message<'a>(payload: &'a (dyn 'static + Any + Send)) -> &'a str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}





/***** LIBRARY *****/
/// Makes sure every response leaving the pipeline is either a success or an
/// [`ErrorResponse`](axum_rpc_server_spec::ErrorResponse).
///
/// In particular:
/// - panics in later stages (or the business logic) become internal errors;
/// - the messages of internal [`Rejection`]s are logged and then replaced by [`INTERNAL_MESSAGE`];
/// - error responses that did not come from a [`Rejection`] are converted to one.
pub async fn normalize(request: Request, next: Next) -> Response {
    let method: String = request.uri().path().into();

    // Run the rest, catching anything that goes wrong
    let res: Response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            error!("Call to {method:?} panicked: {}", panic_message(&*payload));
            return Rejection::internal(INTERNAL_MESSAGE).into_response();
        },
    };

    // Known rejections only need to be censored
    if let Some(rejection) = res.extensions().get::<Rejection>() {
        if rejection.code == Code::Internal && rejection.message != INTERNAL_MESSAGE {
            error!("Call to {method:?} failed: {}", rejection.message);
            return Rejection::internal(INTERNAL_MESSAGE).into_response();
        }
        return res;
    }

    // Bare errors are converted
    let status: StatusCode = res.status();
    match code_for_status(status) {
        None => res,
        Some(Code::Internal) => {
            error!("Call to {method:?} failed with bare status {status}");
            Rejection::internal(INTERNAL_MESSAGE).into_response()
        },
        Some(code) => {
            debug!("Converting bare status {status} for call to {method:?} to {code}");
            let message: String = match to_bytes(res.into_body(), MAX_BARE_MESSAGE_SIZE).await {
                Ok(body) if !body.is_empty() => String::from_utf8_lossy(&body).into_owned(),
                _ => status.canonical_reason().unwrap_or("Unknown error").into(),
            };
            Rejection::new(code, message).into_response()
        },
    }
}
