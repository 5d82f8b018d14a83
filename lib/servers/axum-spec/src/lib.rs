//  LIB.rs
//    by Lut99
//
//  Created:
//    06 Dec 2024, 17:59:58
//  Last edited:
//    16 Oct 2026, 15:02:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Pseudo-server that defines the call and reflection endpoint
//!   locations and bodies for the `axum-rpc-server`.
//

#[cfg(feature = "axum")]
use std::convert::Infallible;

#[cfg(feature = "axum")]
use axum::handler::Handler;
#[cfg(feature = "axum")]
use axum::routing::method_routing::on;
#[cfg(feature = "axum")]
use axum::routing::{MethodFilter, MethodRouter};
use http::Method;
use serde::{Deserialize, Serialize};
use specifications::{Code, Scope};


/***** AUXILLARY *****/
/// Defines where to find an endpoint in the API.
#[derive(Clone, Debug)]
pub struct EndpointPath {
    /// The method to apply.
    pub method: Method,
    /// The path where to find it.
    ///
    /// Path segments wrapped in curly brackets (e.g., `/{service}/{method}`) match any segment.
    pub path:   &'static str,
}
impl EndpointPath {
    /// Runs the appropriate [`axum`] function on this endpointpath.
    ///
    /// Extension methods cannot be filtered on, so endpoints using one match no requests at all.
    ///
    /// # Arguments
    /// - `handler`: Some handler to call when the path + method is matched.
    ///
    /// # Returns
    /// A new [`MethodRouter`] that encodes to axum when to call the given `handler`.
    #[cfg(feature = "axum")]
    pub fn handler<H, T, S>(&self, handler: H) -> MethodRouter<S, Infallible>
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        match MethodFilter::try_from(self.method.clone()) {
            Ok(filter) => on(filter, handler),
            Err(_) => MethodRouter::new(),
        }
    }
}





/***** LIBRARY *****/
/// Path of the endpoint through which every method of the service is called.
///
/// The body of the request is the JSON payload of the call. The body of a successful response is
/// the JSON result; any other response carries an [`ErrorResponse`].
pub const CALL_PATH: EndpointPath = EndpointPath { method: Method::POST, path: "/{service}/{method}" };

/// Replied when a call fails anywhere in the pipeline.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// The status of the call.
    pub code:    Code,
    /// A message that is safe to show to the client.
    pub message: String,
}



/// Path of the endpoint to describe the served API. Only present if reflection is enabled.
pub const REFLECTION_PATH: EndpointPath = EndpointPath { method: Method::GET, path: "/reflection" };

/// Replied when [reflecting](axum-rpc-server::AxumServer::with_reflection()) on the API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReflectionResponse {
    /// The services that are served.
    pub services: Vec<ServiceDescription>,
}

/// Describes a single service in a [`ReflectionResponse`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServiceDescription {
    /// The name of the service.
    pub name:    String,
    /// The methods it provides.
    pub methods: Vec<MethodDescription>,
}

/// Describes a single method in a [`ServiceDescription`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MethodDescription {
    /// The name of the method.
    pub name: String,
    /// The full name of the method, i.e., its path.
    pub full_name: String,
    /// The scopes a caller must all have.
    pub required_scopes: Vec<Scope>,
}





/***** TESTS *****/
