//  BUILDINFO.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 10:05:37
//  Last edited:
//    17 Oct 2026, 16:02:18
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the built-in `build.BuildInfo` service, which tells
//!   callers what is running and whether its store is reachable.
//

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FResult};
use std::future::Future;

use cockroach_database::CockroachStore;
use error_trace::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use specifications::{full_method, Call, Code, HttpError, InvalidPayload, RpcService, Scope};
use thiserror::Error;
use tracing::{debug, warn};


/***** CONSTANTS *****/
/// The name under which the service is served.
pub const SERVICE_NAME: &str = "build.BuildInfo";
/// The scope needed to call any of its methods.
pub const READ_SCOPE: &str = "build.read";





/***** ERRORS *****/
/// Defines the errors of the [`BuildInfo`] service.
#[derive(Debug, Error)]
pub enum BuildInfoError {
    /// A method was called that we do not have.
    #[error("Unknown method {method:?} on {SERVICE_NAME}")]
    UnknownMethod { method: String },
    /// Failed to serialize a response.
    #[error("Failed to serialize response to {method:?}")]
    Serialize {
        method: &'static str,
        #[source]
        err:    serde_json::Error,
    },
}
impl HttpError for BuildInfoError {
    #[inline]
    fn code(&self) -> Code {
        match self {
            Self::UnknownMethod { .. } => Code::NotFound,
            Self::Serialize { .. } => Code::Internal,
        }
    }
}





/***** LIBRARY *****/
/// Something that can tell whether the store behind it still answers.
pub trait HealthCheck {
    /// Returns whether the store answered.
    fn healthy(&self) -> impl Send + Future<Output = bool>;
}
impl HealthCheck for CockroachStore {
    async fn healthy(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!("{}", trace!(("Store health check failed"), err));
                false
            },
        }
    }
}



/// What is running.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BuildDescription {
    /// The name of the binary's package.
    pub name:    String,
    /// Its version.
    pub version: String,
}
impl Display for BuildDescription {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult { write!(f, "{} v{}", self.name, self.version) }
}

/// Describes the running build.
#[inline]
pub fn describe() -> BuildDescription { BuildDescription { name: env!("CARGO_PKG_NAME").into(), version: env!("CARGO_PKG_VERSION").into() } }



/// The answer to `Describe`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DescribeResponse {
    #[serde(flatten)]
    pub build: BuildDescription,
    /// Whether the store answered a ping.
    pub store_healthy: bool,
}



/// Serves [`describe()`] together with the health of a store.
pub struct BuildInfo<H> {
    /// The store to check the health of.
    store: H,
}
impl<H> BuildInfo<H> {
    /// Constructor for the BuildInfo.
    #[inline]
    pub fn new(store: H) -> Self { Self { store } }
}
impl<H> RpcService for BuildInfo<H>
where
    H: 'static + Send + Sync + HealthCheck,
{
    type Error = BuildInfoError;

    #[inline]
    fn name(&self) -> &str { SERVICE_NAME }

    #[inline]
    fn methods(&self) -> &[&'static str] { &["Describe"] }

    fn auth_scopes(&self) -> HashMap<String, Vec<Scope>> {
        self.methods().iter().map(|method| (full_method(SERVICE_NAME, method), vec![Scope::from(READ_SCOPE)])).collect()
    }

    fn validate(&self, method: &str, payload: &Value) -> Result<(), InvalidPayload> {
        match payload {
            Value::Object(fields) if fields.is_empty() => Ok(()),
            Value::Object(_) => Err(InvalidPayload { method: full_method(SERVICE_NAME, method), reason: "expected no fields".into() }),
            _ => Err(InvalidPayload { method: full_method(SERVICE_NAME, method), reason: "expected an empty object".into() }),
        }
    }

    async fn call(&self, method: &str, call: Call) -> Result<Value, Self::Error> {
        match method {
            "Describe" => {
                debug!("Describing build for {:?}", call.principal.as_ref().map(|p| p.subject.as_str()).unwrap_or("<anonymous>"));
                let res = DescribeResponse { build: describe(), store_healthy: self.store.healthy().await };
                serde_json::to_value(&res).map_err(|err| BuildInfoError::Serialize { method: "Describe", err })
            },
            method => Err(BuildInfoError::UnknownMethod { method: method.into() }),
        }
    }
}





/***** TESTS *****/
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Fixed(bool);
    impl HealthCheck for Fixed {
        async fn healthy(&self) -> bool { self.0 }
    }

    #[test]
    fn describes_this_package() {
        let desc = describe();
        assert_eq!(desc.name, "rpc-backend");
        assert_eq!(desc.to_string(), format!("rpc-backend v{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn describe_needs_read_scope() {
        let scopes = BuildInfo::new(Fixed(true)).auth_scopes();
        assert_eq!(scopes.get("/build.BuildInfo/Describe"), Some(&vec![Scope::from("build.read")]));
    }

    #[test]
    fn only_empty_objects_are_valid() {
        let service = BuildInfo::new(Fixed(true));
        assert!(service.validate("Describe", &json!({})).is_ok());
        assert!(service.validate("Describe", &json!({ "verbose": true })).is_err());
        assert!(service.validate("Describe", &json!([])).is_err());
    }

    #[tokio::test]
    async fn reports_store_health() {
        let call = || Call { principal: None, payload: json!({}) };
        let res: DescribeResponse = serde_json::from_value(BuildInfo::new(Fixed(false)).call("Describe", call()).await.unwrap()).unwrap();
        assert_eq!(res.build, describe());
        assert!(!res.store_healthy);

        let res = BuildInfo::new(Fixed(true)).call("Describe", call()).await.unwrap();
        assert_eq!(res["store_healthy"], json!(true));
        assert_eq!(res["name"], json!("rpc-backend"));
    }

    #[tokio::test]
    async fn unknown_methods_are_not_found() {
        let err = BuildInfo::new(Fixed(true)).call("Explode", Call { principal: None, payload: json!({}) }).await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn serialize_failures_are_internal() {
        let err = BuildInfoError::Serialize { method: "Describe", err: serde_json::from_str::<Value>("{").unwrap_err() };
        assert_eq!(err.code(), Code::Internal);
    }
}
