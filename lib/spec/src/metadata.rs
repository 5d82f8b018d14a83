//  METADATA.rs
//    by Lut99
//
//  Created:
//    18 Oct 2024, 17:50:16
//  Last edited:
//    14 Oct 2026, 10:21:37
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines metadata that is associated with every authorized call.
//

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FResult};

use serde::{Deserialize, Serialize};


/***** LIBRARY *****/
/// A named permission that a token must carry to be allowed to call a method.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Scope(pub String);
impl Scope {
    /// Constructor for the Scope.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }

    /// Returns the name of this scope.
    #[inline]
    pub fn as_str(&self) -> &str { &self.0 }
}
impl Display for Scope {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult { write!(f, "{}", self.0) }
}
impl Borrow<str> for Scope {
    #[inline]
    fn borrow(&self) -> &str { &self.0 }
}
impl From<&str> for Scope {
    #[inline]
    fn from(value: &str) -> Self { Self(value.into()) }
}



/// Defines who made a call, as far as the authorizer could tell.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Principal {
    /// The subject (`sub`-claim) of the token that authorized the call.
    pub subject: String,
    /// The scopes granted to this principal.
    pub scopes:  BTreeSet<Scope>,
}
impl Principal {
    /// Returns whether this principal was granted the given scope.
    #[inline]
    pub fn has_scope(&self, scope: &str) -> bool { self.scopes.contains(scope) }
}
