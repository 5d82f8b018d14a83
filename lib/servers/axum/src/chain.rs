//  CHAIN.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 13:51:16
//  Last edited:
//    16 Oct 2026, 16:52:03
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the ordered chain of interceptors that every call passes
//!   through before it reaches the business logic.
//

use std::fmt::{Display, Formatter, Result as FResult};

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use specifications::{AuthResolver, RpcService};
use tracing::warn;

use crate::server::AxumServer;
use crate::stages;


/***** AUXILLARY *****/
/// A single interceptor in the [`InterceptorChain`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Turns every failure into a well-formed error response. See [`stages::errors::normalize()`].
    ErrorNormalization,
    /// Logs every call. See [`stages::logging::log()`].
    RequestLogging,
    /// Authorizes the caller. See [`stages::auth::authorize()`].
    Authorization,
    /// Validates the payload. See [`stages::validation::validate()`].
    Validation,
    /// Logs payloads. See [`stages::dump::dump()`].
    PayloadDump,
}
impl Display for Stage {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        match self {
            Self::ErrorNormalization => write!(f, "error normalization"),
            Self::RequestLogging => write!(f, "request logging"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::PayloadDump => write!(f, "payload dump"),
        }
    }
}





/***** LIBRARY *****/
/// The fixed, ordered list of [`Stage`]s a call passes through.
///
/// The order is always:
/// 1. [`Stage::ErrorNormalization`]
/// 2. [`Stage::RequestLogging`]
/// 3. [`Stage::Authorization`] (only if there is something to authorize with)
/// 4. [`Stage::Validation`]
/// 5. [`Stage::PayloadDump`] (only if asked for)
///
/// where the first is outermost, i.e., sees the call first and the response last.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterceptorChain {
    /// The stages, outermost first.
    stages: Vec<Stage>,
}
impl InterceptorChain {
    /// Constructor for the InterceptorChain.
    ///
    /// # Arguments
    /// - `with_authorization`: Whether to include [`Stage::Authorization`].
    /// - `with_payload_dump`: Whether to include [`Stage::PayloadDump`].
    ///
    /// # Returns
    /// A new InterceptorChain that can no longer be changed.
    pub fn new(with_authorization: bool, with_payload_dump: bool) -> Self {
        let mut stages: Vec<Stage> = Vec::with_capacity(5);
        stages.push(Stage::ErrorNormalization);
        stages.push(Stage::RequestLogging);
        if with_authorization {
            stages.push(Stage::Authorization);
        }
        stages.push(Stage::Validation);
        if with_payload_dump {
            stages.push(Stage::PayloadDump);
        }
        Self { stages }
    }

    /// Returns the stages in this chain, outermost first.
    #[inline]
    pub fn stages(&self) -> &[Stage] { &self.stages }

    /// Returns whether the given stage is part of this chain.
    #[inline]
    pub fn contains(&self, stage: Stage) -> bool { self.stages.contains(&stage) }

    /// Wraps the given router in this chain.
    ///
    /// # Arguments
    /// - `router`: The [`Router`] with the routes that should be behind the chain.
    /// - `server`: The [`AxumServer`] that provides the auth resolver and the service.
    ///
    /// # Returns
    /// A new [`Router`] where every route (and the fallback) passes through the stages.
    pub fn apply<A, S>(&self, router: Router, server: &AxumServer<A, S>) -> Router
    where
        A: 'static + Send + Sync + AuthResolver,
        A::ClientError: 'static + Send,
        A::ServerError: 'static + Send,
        S: RpcService,
    {
        // Layers wrap everything added before them, so the innermost goes first
        let mut router: Router = router;
        for stage in self.stages.iter().rev() {
            router = match stage {
                Stage::ErrorNormalization => router.layer(from_fn(stages::errors::normalize)),
                Stage::RequestLogging => router.layer(from_fn(stages::logging::log)),
                Stage::Authorization => match &server.auth {
                    Some(auth) => router.layer(from_fn_with_state(auth.clone(), stages::auth::authorize::<A>)),
                    None => {
                        warn!("Interceptor chain asks for {stage}, but the server has no auth resolver; skipping it");
                        router
                    },
                },
                Stage::Validation => router.layer(from_fn_with_state(server.service.clone(), stages::validation::validate::<S>)),
                Stage::PayloadDump => router.layer(from_fn(stages::dump::dump)),
            };
        }
        router
    }
}





/***** TESTS *****/
