//  MOD.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 14:40:55
//  Last edited:
//    15 Oct 2026, 15:44:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the individual stages of the
//!   [`InterceptorChain`](crate::InterceptorChain).
//

pub mod auth;
pub mod dump;
pub mod errors;
pub mod logging;
pub mod validation;
