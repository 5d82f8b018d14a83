//  REJECTION.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 14:20:31
//  Last edited:
//    16 Oct 2026, 15:40:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines how any stage of the pipeline refuses a call.
//

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_rpc_server_spec::ErrorResponse;
use error_trace::ErrorTrace as _;
use specifications::{Code, HttpError};


/***** CONSTANTS *****/
/// The message that replaces the details of internal errors.
pub const INTERNAL_MESSAGE: &str = "An internal error occurred";





/***** HELPER FUNCTIONS *****/
/// Maps an HTTP status that was produced without a [`Rejection`] to the closest [`Code`].
///
/// # Returns
/// The [`Code`], or [`None`] if the status is not an error.
pub fn code_for_status(status: StatusCode) -> Option<Code> {
    match status {
        s if !s.is_client_error() && !s.is_server_error() => None,
        StatusCode::UNAUTHORIZED => Some(Code::Unauthenticated),
        StatusCode::FORBIDDEN => Some(Code::PermissionDenied),
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => Some(Code::NotFound),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Some(Code::DeadlineExceeded),
        StatusCode::SERVICE_UNAVAILABLE => Some(Code::Unavailable),
        s if s.is_client_error() => Some(Code::InvalidArgument),
        _ => Some(Code::Internal),
    }
}





/***** LIBRARY *****/
/// A refused call.
///
/// Rendered as an [`ErrorResponse`] with the status of its [`Code`]. The rejection is also left in
/// the response's extensions, such that the error normalization stage can recognise it.
#[derive(Clone, Debug)]
pub struct Rejection {
    /// The status of the call.
    pub code:    Code,
    /// What went wrong. Replaced by [`INTERNAL_MESSAGE`] before it reaches the client if `code`
    /// is [`Code::Internal`].
    pub message: String,
}
impl Rejection {
    /// Constructor for the Rejection.
    #[inline]
    pub fn new(code: Code, message: impl Into<String>) -> Self { Self { code, message: message.into() } }

    /// Constructor for a Rejection from some [`HttpError`], including its sources in the message.
    #[inline]
    pub fn from_error<E: HttpError>(err: &E) -> Self { Self { code: err.code(), message: err.trace().to_string() } }

    /// Constructor for an internal Rejection.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self { Self::new(Code::Internal, message) }
}
impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status: StatusCode = self.code.status_code();
        let body = Json(ErrorResponse { code: self.code, message: self.message.clone() });
        let mut res: Response = (status, body).into_response();
        res.extensions_mut().insert(self);
        res
    }
}





/***** TESTS *****/
