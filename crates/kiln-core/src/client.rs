//! Client stub: resolves the rendezvous address, sends exactly one request,
//! and returns the reply for the caller to render.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KilnError, Result};
use crate::protocol::{read_frame, write_frame, Request};
use crate::rendezvous::Endpoint;

/// Loosely-typed view of a reply. Rendering prints whichever fields are
/// present, so the view keeps them all optional instead of committing to
/// one reply shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyView {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub locals: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ReplyView {
    /// True when neither output stream carries text, which is when a
    /// binding listing (if any) gets printed instead.
    pub fn is_silent(&self) -> bool {
        !self.stdout.as_deref().is_some_and(|s| !s.is_empty())
            && !self.stderr.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// One-shot client for the execution server.
pub struct ExecClient {
    endpoint: Endpoint,
}

impl ExecClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: Endpoint::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.endpoint.path()
    }

    /// Send exactly one request and wait for exactly one reply.
    ///
    /// `Ok(None)` means the server closed the connection without answering.
    /// Connection failures surface as [`KilnError::Connection`]; they are
    /// never retried here.
    pub async fn send(&self, request: &Request) -> Result<Option<ReplyView>> {
        let mut stream = self.endpoint.connect().await?;
        let bytes = serde_json::to_vec(request)?;
        write_frame(&mut stream, &bytes).await?;

        let Some(frame) = read_frame(&mut stream).await? else {
            return Ok(None);
        };
        let reply: ReplyView = serde_json::from_slice(&frame).map_err(|e| KilnError::Json {
            message: format!("failed to parse server reply: {e}"),
            source: Some(e),
        })?;
        debug!(path = %self.endpoint.path().display(), "received reply");
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ExecServer;
    use crate::session::{Session, SessionConfig};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn started_server(tmp: &TempDir) -> (ExecClient, tokio::task::JoinHandle<crate::error::Result<()>>) {
        let path = tmp.path().join("kiln_client_test.sock");
        let endpoint = Endpoint::new(&path);
        let session = Arc::new(Session::standard(SessionConfig::default()));
        let server = tokio::spawn(ExecServer::serve(endpoint.clone(), session));
        for _ in 0..100 {
            if endpoint.path().exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        (ExecClient::new(path), server)
    }

    #[tokio::test]
    async fn test_execute_and_listing_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let (client, server) = started_server(&tmp).await;

        let reply = client
            .send(&Request::execute("greeting = 'hi'"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.stdout.as_deref(), Some(""));
        assert!(reply.is_silent());

        let reply = client.send(&Request::show_vars()).await.unwrap().unwrap();
        let locals = reply.locals.unwrap();
        assert_eq!(locals["greeting"], "str");

        server.abort();
    }

    #[tokio::test]
    async fn test_fault_arrives_in_stderr() {
        let tmp = TempDir::new().unwrap();
        let (client, server) = started_server(&tmp).await;

        let reply = client
            .send(&Request::execute("1 / 0"))
            .await
            .unwrap()
            .unwrap();
        assert!(reply
            .stderr
            .as_deref()
            .unwrap()
            .contains("ZeroDivisionError: division by zero"));
        assert!(!reply.is_silent());

        server.abort();
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let tmp = TempDir::new().unwrap();
        let client = ExecClient::new(tmp.path().join("absent.sock"));
        let err = client.send(&Request::show_vars()).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_server_closing_without_reply_yields_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kiln_mute.sock");
        let endpoint = Endpoint::new(&path);
        let listener = endpoint.bind().await.unwrap();
        let mute = tokio::spawn(async move {
            let mut stream = listener.accept().await.unwrap();
            // Consume the request, then close without answering.
            let _ = crate::protocol::read_frame(&mut stream).await;
            drop(stream);
        });

        let client = ExecClient::new(&path);
        let reply = client.send(&Request::show_vars()).await.unwrap();
        assert!(reply.is_none());
        mute.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_roundtrip_via_client() {
        let tmp = TempDir::new().unwrap();
        let (client, server) = started_server(&tmp).await;

        let reply = client.send(&Request::shutdown()).await.unwrap().unwrap();
        assert_eq!(reply.status.as_deref(), Some("shutting down"));
        server.await.unwrap().unwrap();
        assert!(client.send(&Request::show_vars()).await.is_err());
    }
}
