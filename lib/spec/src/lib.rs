//  LIB.rs
//    by Lut99
//
//  Created:
//    18 Oct 2024, 17:38:02
//  Last edited:
//    14 Oct 2026, 10:12:51
//  Auto updated?
//    Yes
//
//  Description:
//!   Provides public interfaces for things to be compatible with the
//!   RPC backend library.
//

// Declare modules
pub mod authresolver;
pub mod databaseconn;
pub mod metadata;
pub mod server;
pub mod service;

// Import some things into the main scope
pub use authresolver::{AuthResolver, Code, HttpError};
pub use databaseconn::{ConnectionParams, StoreConnector};
pub use metadata::{Principal, Scope};
pub use server::Server;
pub use service::{full_method, Call, InvalidPayload, RpcService};
