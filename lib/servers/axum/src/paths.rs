//  PATHS.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 11:56:03
//  Last edited:
//    16 Oct 2026, 16:40:27
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the handlers for the call and reflection paths.
//

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::response::{IntoResponse as _, Response};
use axum::Json;
use axum_rpc_server_spec::{MethodDescription, ReflectionResponse, ServiceDescription};
use error_trace::ErrorTrace as _;
use specifications::{full_method, Call, Code, HttpError as _, Principal, RpcService};
use tracing::{debug, error};

use crate::rejection::Rejection;
use crate::stages::validation::Payload;


/***** HELPER FUNCTIONS *****/
/// Finds the method of `service` that is called by a request to `path`.
///
/// # Returns
/// The name of the method, or [`None`] if the path does not point to a method of this service.
pub(crate) fn lookup<S: ?Sized + RpcService>(service: &S, path: &str) -> Option<&'static str> {
    let (name, method) = path.strip_prefix('/')?.split_once('/')?;
    if name != service.name() {
        return None;
    }
    service.methods().iter().find(|m| **m == method).copied()
}

/// Builds the reflection of the given service.
pub(crate) fn describe<S: ?Sized + RpcService>(service: &S) -> ReflectionResponse {
    let mut scopes = service.auth_scopes();
    let methods: Vec<MethodDescription> = service
        .methods()
        .iter()
        .map(|method| {
            let full_name: String = full_method(service.name(), method);
            MethodDescription { name: (*method).into(), required_scopes: scopes.remove(&full_name).unwrap_or_default(), full_name }
        })
        .collect();
    ReflectionResponse { services: vec![ServiceDescription { name: service.name().into(), methods }] }
}





/***** LIBRARY *****/
/// The state of the call handler.
pub(crate) struct Dispatcher<S> {
    /// The business logic.
    pub(crate) service: Arc<S>,
    /// How long a call may take. Zero means forever.
    pub(crate) timeout: Duration,
}
impl<S> Clone for Dispatcher<S> {
    #[inline]
    fn clone(&self) -> Self { Self { service: self.service.clone(), timeout: self.timeout } }
}



/// Handler for `POST /{service}/{method}` (i.e., calling the business logic).
pub(crate) async fn dispatch<S: RpcService>(State(this): State<Dispatcher<S>>, request: Request) -> Response {
    let path: String = request.uri().path().into();
    let method: &'static str = match lookup(&*this.service, &path) {
        Some(method) => method,
        None => return Rejection::new(Code::NotFound, format!("Unknown method {path:?}")).into_response(),
    };

    // Collect what the pipeline left for us
    let (mut parts, _) = request.into_parts();
    let payload = match parts.extensions.remove::<Payload>() {
        Some(Payload(payload)) => payload,
        None => return Rejection::internal(format!("No validated payload found for call to {path:?}")).into_response(),
    };
    let principal: Option<Principal> = parts.extensions.remove::<Principal>();

    // Run the business logic
    debug!("Dispatching call to {path:?}...");
    let call = this.service.call(method, Call { principal, payload });
    let res = if this.timeout.is_zero() {
        call.await
    } else {
        match tokio::time::timeout(this.timeout, call).await {
            Ok(res) => res,
            Err(_) => {
                return Rejection::new(Code::DeadlineExceeded, format!("Call to {path:?} did not complete within {:?}", this.timeout)).into_response();
            },
        }
    };
    match res {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            if err.code().is_server_side() {
                error!("Call to {path:?} failed: {}", err.trace());
            }
            Rejection::from_error(&err).into_response()
        },
    }
}

/// Handler for everything that is not a method (or reflection).
pub(crate) async fn not_found(uri: Uri) -> Response { Rejection::new(Code::NotFound, format!("Unknown method {:?}", uri.path())).into_response() }

/// Handler for `GET /reflection`.
pub(crate) async fn reflect(State(reflection): State<Arc<ReflectionResponse>>) -> Json<ReflectionResponse> { Json((*reflection).clone()) }
