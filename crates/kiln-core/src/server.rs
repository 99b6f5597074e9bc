//! Transport listener and connection lifecycle.
//!
//! Binds the rendezvous endpoint, then runs an accept loop on the tokio
//! runtime. Concurrent workers are capped by a semaphore; each accepted
//! connection is served by its own task that reads exactly one request,
//! dispatches it, writes exactly one reply, and closes.
//!
//! The `shutdown` command is deliberately abrupt: the worker acknowledges,
//! the listener closes, the rendezvous artifact is removed, and
//! [`ExecServer::serve`] returns so the hosting binary can exit at once.
//! In-flight work on other connections is not drained.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{KilnError, Result};
use crate::protocol::{decode_request, read_frame, write_frame, Reply, Request, RequestKind};
use crate::rendezvous::{Endpoint, RendezvousStream};
use crate::session::Session;

/// The reply for one request, plus whether the server should stop.
pub struct Dispatched {
    pub reply: Reply,
    pub shutdown: bool,
}

/// Seam between the transport and the session state: maps one request to
/// one reply.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(&self, request: Request) -> Dispatched;
}

#[async_trait]
impl Dispatch for Session {
    async fn dispatch(&self, request: Request) -> Dispatched {
        match request.kind() {
            RequestKind::Execute(code) => {
                let outcome = self.execute(code).await;
                Dispatched {
                    reply: Reply::Execute {
                        stdout: outcome.stdout,
                        stderr: outcome.stderr,
                        locals: outcome.locals,
                    },
                    shutdown: false,
                }
            }
            RequestKind::ShowVars => Dispatched {
                reply: Reply::Bindings {
                    locals: self.bindings_catalog(),
                },
                shutdown: false,
            },
            RequestKind::Shutdown => Dispatched {
                reply: Reply::shutdown_ack(),
                shutdown: true,
            },
            RequestKind::Unknown => Dispatched {
                reply: Reply::error("Unknown request"),
                shutdown: false,
            },
        }
    }
}

/// The execution server: accept loop plus per-connection workers.
pub struct ExecServer;

impl ExecServer {
    /// Bind the endpoint and serve until a `shutdown` command arrives.
    ///
    /// Returns `Ok(())` after a shutdown command has been acknowledged and
    /// the rendezvous artifact removed; the caller is expected to exit the
    /// process immediately. Errors are bind/setup failures.
    pub async fn serve<D: Dispatch>(endpoint: Endpoint, dispatch: Arc<D>) -> Result<()> {
        let listener = endpoint.bind().await?;
        info!(
            address = %endpoint.path().display(),
            transport = endpoint.transport_kind(),
            "execution server listening"
        );

        let endpoint = Arc::new(endpoint);
        let permits = Arc::new(Semaphore::new(ServerConfig::MAX_CONNECTIONS));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        loop {
            let permit = tokio::select! {
                permit = permits.clone().acquire_owned() => {
                    permit.map_err(|_| KilnError::Other("connection semaphore closed".to_string()))?
                }
                _ = shutdown_rx.changed() => break,
            };
            let stream = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                },
                _ = shutdown_rx.changed() => break,
            };

            let dispatch = dispatch.clone();
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                match handle_connection(stream, &*dispatch).await {
                    Ok(true) => {
                        let _ = shutdown_tx.send(true);
                    }
                    Ok(false) => {}
                    Err(e) => debug!("connection ended: {e}"),
                }
                drop(permit);
            });
        }

        info!("shutdown command received, closing listener");
        if let Err(e) = endpoint.cleanup() {
            warn!("failed to remove rendezvous artifact: {e}");
        }
        Ok(())
    }
}

/// Serve one connection: one request in, one reply out. Returns whether a
/// shutdown was requested and acknowledged.
async fn handle_connection<D: Dispatch>(
    mut stream: RendezvousStream,
    dispatch: &D,
) -> Result<bool> {
    let Some(frame) = read_frame(&mut stream).await? else {
        return Ok(false); // peer closed without sending a request
    };

    let (reply, shutdown) = match decode_request(&frame) {
        Ok(request) => {
            let dispatched = dispatch.dispatch(request).await;
            (dispatched.reply, dispatched.shutdown)
        }
        // Protocol faults get a best-effort reply before the drop.
        Err(e) => (Reply::error(format!("Server error: {e}")), false),
    };

    send_reply(&mut stream, &reply).await?;
    Ok(shutdown)
}

async fn send_reply(stream: &mut RendezvousStream, reply: &Reply) -> Result<()> {
    let bytes = serde_json::to_vec(reply)?;
    write_frame(stream, &bytes).await
}
