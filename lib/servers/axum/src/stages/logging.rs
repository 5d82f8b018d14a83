//  LOGGING.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 15:01:27
//  Last edited:
//    16 Oct 2026, 09:12:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the request logging stage of the interceptor chain.
//

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::field::{display, Empty};
use tracing::{debug, info, span, Instrument as _, Level};

use crate::rejection::Rejection;


/***** LIBRARY *****/
/// Wraps the call in a span and logs its outcome. Never touches the call itself.
pub async fn log(request: Request, next: Next) -> Response {
    let span = span!(Level::INFO, "call", method = %request.uri().path(), client = Empty);
    if let Some(ConnectInfo(client)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        span.record("client", display(client));
    }

    async move {
        debug!("Handling call...");
        let start: Instant = Instant::now();
        let res: Response = next.run(request).await;
        let elapsed: Duration = start.elapsed();
        match res.extensions().get::<Rejection>() {
            Some(rejection) => info!(status = res.status().as_u16(), code = %rejection.code, ?elapsed, "Call rejected"),
            None => info!(status = res.status().as_u16(), ?elapsed, "Call completed"),
        }
        res
    }
    .instrument(span)
    .await
}
