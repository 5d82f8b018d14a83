//  LIB.rs
//    by Lut99
//
//  Created:
//    14 Oct 2026, 10:02:51
//  Last edited:
//    14 Oct 2026, 10:02:51
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the `StoreConnector` for a CockroachDB backend.
//

// Declare modules
mod databaseconn;

// Import some of it
pub use databaseconn::*;
