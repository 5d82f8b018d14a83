//  LIB.rs
//    by Lut99
//
//  Created:
//    18 Oct 2024, 17:31:50
//  Last edited:
//    17 Oct 2026, 15:10:22
//  Auto updated?
//    Yes
//
//  Description:
//!   Bootstraps a store and serves an RPC service behind an authorizing
//!   interceptor chain.
//

// Declare modules
pub mod buildinfo;
pub mod config;
pub mod logging;
pub mod runner;

// Import the libraries
pub mod servers {
    pub use axum_rpc_server as axum;
}

pub mod auth {
    pub use jwk_auth as jwk;
}

pub mod databases {
    pub use cockroach_database as cockroach;
}

pub use specifications as spec;
