//  AUTH.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 11:58:43
//  Last edited:
//    16 Oct 2026, 16:02:51
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the authorization stage of the interceptor chain.
//

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use error_trace::ErrorTrace as _;
use specifications::{AuthResolver, Code, HttpError, Principal};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::rejection::Rejection;


/***** ERRORS *****/
/// Simple wrapper for erroring and freezing the result.
#[derive(Debug, Error)]
enum Error<E> {
    #[error("Failed to authorize incoming call")]
    AuthorizeFailed {
        #[source]
        err: E,
    },
}
impl<E: 'static + HttpError> HttpError for Error<E> {
    #[inline]
    fn code(&self) -> Code {
        match self {
            Self::AuthorizeFailed { err } => err.code(),
        }
    }
}





/***** LIBRARY *****/
/// Authorizes the call with the given [`AuthResolver`].
///
/// On success, the resolved [`Principal`] is inserted into the request's extensions for the next
/// stages (and the business logic) to find. Client errors reject the call with their own
/// [`Code`]; server errors reject it as internal.
pub async fn authorize<A>(State(auth): State<Arc<A>>, request: Request, next: Next) -> Response
where
    A: 'static + Send + Sync + AuthResolver,
    A::ClientError: 'static + Send,
    A::ServerError: 'static + Send,
{
    let method: String = request.uri().path().into();

    // Do the auth thingy
    let (mut parts, body) = request.into_parts();
    let res = auth.authorize(&method, &parts.headers).await;
    let principal: Principal = match res {
        Ok(Ok(principal)) => principal,
        Ok(Err(err)) => {
            let err = Error::AuthorizeFailed { err };
            info!("Refused call to {method:?}: {}", err.trace());
            return Rejection::from_error(&err).into_response();
        },
        Err(err) => {
            let err = Error::AuthorizeFailed { err };
            error!("Failed to authorize call to {method:?}: {}", err.trace());
            return Rejection::internal(err.trace().to_string()).into_response();
        },
    };

    // If we found a principal, then inject it in the request as an extension; then continue
    debug!("Authorized call to {method:?} by {:?}", principal.subject);
    parts.extensions.insert(principal);
    next.run(Request::from_parts(parts, body)).await
}
