//  LIB.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 10:25:43
//  Last edited:
//    16 Oct 2026, 16:55:10
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the interceptor chain, dispatch and lifecycle of the RPC
//!   backend on top of `axum`.
//

// Modules
mod chain;
mod paths;
pub mod rejection;
mod server;
pub mod stages;

// Re-exports
pub use axum_rpc_server_spec as spec;
// Use local parts
pub use chain::*;
pub use server::*;
