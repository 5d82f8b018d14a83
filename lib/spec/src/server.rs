//  SERVER.rs
//    by Lut99
//
//  Created:
//    23 Oct 2024, 11:37:44
//  Last edited:
//    14 Oct 2026, 11:06:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements some abstraction over something waiting for calls and
//!   dispatching them to the business logic.
//

use std::error::Error;
use std::future::Future;

use tokio_util::sync::CancellationToken;


/***** LIBRARY *****/
/// Abstracts over the "frontend" of the backend; i.e., some API or other interface that listens for
/// calls and hands them to the business logic as necessary.
pub trait Server {
    /// The type of errors emitted by this server.
    type Error: Error;


    /// Runs this server.
    ///
    /// This will hijack the current codeflow and keep serving until the given `shutdown` token is
    /// cancelled. At that point, no new calls are accepted, but the ones in flight are allowed to
    /// complete before this function returns.
    ///
    /// # Arguments
    /// - `shutdown`: An externally owned [`CancellationToken`] that is only observed, never
    ///   cancelled, by the server.
    ///
    /// # Errors
    /// This function may error if the server failed to listen of if a fatal server errors comes
    /// along as it serves. However, client-side errors should not trigger errors at this level.
    fn serve(self, shutdown: CancellationToken) -> impl Future<Output = Result<(), Self::Error>>;
}
