//  MAIN.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 11:10:54
//  Last edited:
//    17 Oct 2026, 16:31:07
//  Auto updated?
//    Yes
//
//  Description:
//!   Entrypoint of the `rpc-backend` binary.
//

use clap::Parser as _;
use error_trace::{trace, ErrorTrace as _};
use rpc_backend::buildinfo::BuildInfo;
use rpc_backend::config::{Arguments, Configuration};
use rpc_backend::databases::cockroach::CockroachConnector;
use rpc_backend::logging;
use rpc_backend::runner;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/***** HELPER FUNCTIONS *****/
/// Resolves once the process is asked to stop.
#[cfg(unix)]
async fn stop_requested() {
    use tokio::signal::unix::{signal, SignalKind};

    /// Waits for the given signal, or forever if it cannot be listened to.
    async fn wait_for(kind: SignalKind, name: &str) {
        match signal(kind) {
            Ok(mut sign) => {
                sign.recv().await;
                debug!("Received {name}");
            },
            Err(err) => {
                warn!("{}", trace!(("Failed to register {name} signal handler"), err));
                std::future::pending::<()>().await;
            },
        }
    }

    tokio::select! {
        _ = wait_for(SignalKind::interrupt(), "SIGINT") => {},
        _ = wait_for(SignalKind::terminate(), "SIGTERM") => {},
    }
}

/// Resolves once the process is asked to stop.
#[cfg(not(unix))]
async fn stop_requested() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => debug!("Received Ctrl+C"),
        Err(err) => {
            warn!("{}", trace!(("Failed to register Ctrl+C handler"), err));
            std::future::pending::<()>().await;
        },
    }
}





/***** ENTRYPOINT *****/
#[tokio::main]
async fn main() {
    // Parse the arguments
    let args = Arguments::parse();

    // Setup the logger
    if let Err(err) = logging::configure(&args.log_level, &args.log_format) {
        eprintln!("ERROR: {}", err.trace());
        std::process::exit(1);
    }
    info!("{} - v{}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));

    // Resolve the configuration
    let config: Configuration = match args.resolve() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err.trace());
            std::process::exit(1);
        },
    };

    // Stop when told to
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel: CancellationToken = cancel.clone();
        async move {
            stop_requested().await;
            cancel.cancel();
        }
    });

    // Run the thing
    match runner::run_server(&config, &CockroachConnector::default(), BuildInfo::new, cancel).await {
        Ok(()) => info!("Shutting down gracefully"),
        Err(err) => {
            error!("{}", err.trace());
            std::process::exit(1);
        },
    }
}
