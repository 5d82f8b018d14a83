//  SERVICE.rs
//    by Lut99
//
//  Created:
//    14 Oct 2026, 11:10:02
//  Last edited:
//    15 Oct 2026, 09:48:13
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the interface to the business logic that the backend
//!   dispatches authorized, validated calls to.
//

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::authresolver::HttpError;
use crate::metadata::{Principal, Scope};


/***** ERRORS *****/
/// Returned by [`RpcService::validate()`] when a payload is structurally invalid.
#[derive(Debug, Error)]
#[error("Invalid payload for method {method:?}: {reason}")]
pub struct InvalidPayload {
    /// The full name of the method that was called.
    pub method: String,
    /// Why the payload was rejected. This is shown to the client.
    pub reason: String,
}





/***** HELPER FUNCTIONS *****/
/// Builds the full name of a method (`/<service>/<method>`).
///
/// # Arguments
/// - `service`: The name of the service that has the method.
/// - `method`: The name of the method within that service.
///
/// # Returns
/// A [`String`] like `/build.BuildInfo/Describe`.
#[inline]
pub fn full_method(service: &str, method: &str) -> String { format!("/{service}/{method}") }





/***** LIBRARY *****/
/// A single call, as handed to the business logic after it passed the pipeline.
#[derive(Clone, Debug)]
pub struct Call {
    /// Who made the call. [`None`] if the backend runs without authorization.
    pub principal: Option<Principal>,
    /// The (already validated) request payload.
    pub payload:   Value,
}



/// The business logic, as far as the backend is concerned.
///
/// Note that the RpcService is intended to be used in a distributed context. As such, any
/// reference to `self` is done immutably only.
pub trait RpcService: 'static + Send + Sync {
    /// Errors returned by the business logic.
    type Error: 'static + Send + Sync + HttpError;


    /// Returns the name of the service (e.g., `build.BuildInfo`).
    fn name(&self) -> &str;

    /// Returns the names of the methods provided by this service (e.g., `Describe`).
    fn methods(&self) -> &[&'static str];

    /// Returns the scopes required per method.
    ///
    /// # Returns
    /// A map of full method names (see [`full_method()`]) to the scopes a caller must _all_ have.
    /// Methods that do not appear require no scopes.
    fn auth_scopes(&self) -> HashMap<String, Vec<Scope>>;

    /// Checks whether the given payload makes sense for the given method.
    ///
    /// Only called for methods listed in [`RpcService::methods()`]. Like for
    /// [`RpcService::call()`], `method` is the name, not the full name.
    ///
    /// # Errors
    /// This function errors if the payload is structurally invalid.
    #[inline]
    fn validate(&self, method: &str, payload: &Value) -> Result<(), InvalidPayload> {
        let _ = (method, payload);
        Ok(())
    }

    /// Handles a call.
    ///
    /// # Arguments
    /// - `method`: The name (not the full name) of the method to call.
    /// - `call`: The [`Call`] to handle.
    ///
    /// # Returns
    /// The response payload.
    ///
    /// # Errors
    /// This function errors if the business logic fails. The error's [`Code`](crate::Code) decides
    /// what the client sees.
    fn call(&self, method: &str, call: Call) -> impl Send + Future<Output = Result<Value, Self::Error>>;
}





/***** TESTS *****/
