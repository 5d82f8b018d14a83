//  LIB.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:37:34
//  Last edited:
//    15 Oct 2026, 13:20:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a JSON Web Token (JWT) / JSON Web Key (JWK)-based scheme
//!   for the `AuthResolver`, backed by key material that is refreshed in
//!   the background.
//

// Modules
mod authorizer;
pub mod keyresolver;

// Use some of it into the main namespace
pub use authorizer::*;
