//  AUTHRESOLVER.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:31:06
//  Last edited:
//    14 Oct 2026, 10:40:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the [`AuthResolver`] trait, which can take the headers of an
//!   incoming call and use them to authorize it.
//

use std::convert::Infallible;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::future::Future;

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::metadata::Principal;


/***** AUXILLARY *****/
/// The status codes that may cross the service boundary.
///
/// These follow the canonical RPC codes, restricted to the ones the pipeline actually produces.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    /// The request payload was structurally invalid.
    InvalidArgument,
    /// The caller could not be identified (no, malformed or expired token).
    Unauthenticated,
    /// The caller was identified but lacks the rights for this call.
    PermissionDenied,
    /// The called service or method does not exist.
    NotFound,
    /// The call did not complete within its deadline.
    DeadlineExceeded,
    /// The service is temporarily unable to handle the call.
    Unavailable,
    /// Something went wrong on our side. Never carries details to the client.
    Internal,
}
impl Code {
    /// Returns the HTTP [`StatusCode`] used to transport this code.
    #[inline]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns whether this code is the server's fault.
    #[inline]
    pub const fn is_server_side(&self) -> bool { matches!(self, Self::Unavailable | Self::Internal) }
}
impl Display for Code {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::DeadlineExceeded => write!(f, "DEADLINE_EXCEEDED"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}



/// Extends an [`Error`] with the ability to associate status codes with it.
pub trait HttpError: Error {
    /// Returns the [`Code`] associated with this error.
    fn code(&self) -> Code;

    /// Returns the HTTP status code associated with this error.
    ///
    /// # Returns
    /// A [`StatusCode`].
    #[inline]
    fn status_code(&self) -> StatusCode { self.code().status_code() }
}

impl HttpError for Infallible {
    #[inline]
    fn code(&self) -> Code { match *self {} }
}





/***** LIBRARY *****/
/// A resolver that takes the metadata of an incoming call and (hopefully) authorizes it.
///
/// Note that the AuthResolver is intended to be used in a distributed context. As such, any
/// reference to `self` is done immutably only.
pub trait AuthResolver {
    /// Client-side errors produced by the AuthResolver.
    type ClientError: HttpError;
    /// Server-side errors produced by the AuthResolver.
    type ServerError: Error;


    /// Resolves the given call to the [`Principal`] that made it.
    ///
    /// # Arguments
    /// - `method`: The full name of the called method (e.g., `/build.BuildInfo/Describe`). Used to
    ///   find which scopes are required.
    /// - `headers`: The headers of the call to resolve.
    ///
    /// # Returns
    /// A [`Principal`] describing who made the call.
    ///
    /// # Errors
    /// This function can error when it fails to authorize the user. There are two levels at which
    /// it can do so:
    /// - The _outer_ [`Result`] is used to indicate _server_ errors (e.g., no keys available); and
    /// - The _inner_ [`Result`] is used to indicate _user_ errors (e.g., no token, wrong scope).
    ///
    /// The first will always result in a (vague) internal error to the user, whereas the second
    /// may communicate its own [`Code`].
    fn authorize(&self, method: &str, headers: &HeaderMap) -> impl Send + Future<Output = Result<Result<Principal, Self::ClientError>, Self::ServerError>>;
}





/***** TESTS *****/
