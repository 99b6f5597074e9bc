//! Kiln execution server binary.
//!
//! Binds the rendezvous address given on the command line and serves
//! fragment-execution requests until a `shutdown` command or a termination
//! signal arrives. Session state lives only in this process; it is gone on
//! exit. Diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use kiln_core::{make_addr, Endpoint, ExecServer, Session, SessionConfig};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "kiln-server")]
#[command(about = "Persistent code-execution server over a local socket")]
struct Args {
    /// Rendezvous address path: a socket path, or the discovery file on
    /// platforms without local-domain sockets
    #[arg(required_unless_present = "make_addr")]
    address: Option<PathBuf>,

    /// Print a freshly generated rendezvous path and exit
    #[arg(long = "make-addr")]
    make_addr: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors exit 1, matching the client contract.
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if args.make_addr {
        println!("{}", make_addr().display());
        return Ok(());
    }

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let Some(address) = args.address else {
        // clap's required_unless_present already enforces this.
        anyhow::bail!("missing rendezvous address");
    };

    info!("Starting kiln execution server");

    let endpoint = Endpoint::new(&address);
    let session = Arc::new(Session::standard(SessionConfig::default()));

    tokio::select! {
        result = ExecServer::serve(endpoint.clone(), session) => {
            // Either a bind/setup failure, or a shutdown command that has
            // already been acknowledged and cleaned up; exit right away,
            // without draining anything.
            result?;
        }
        _ = shutdown_signal() => {
            info!("termination signal received, exiting");
            if let Err(e) = endpoint.cleanup() {
                warn!("failed to remove rendezvous artifact: {e}");
            }
        }
    }

    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
