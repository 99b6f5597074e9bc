//! Address broker: the rendezvous endpoint clients use to reach a server.
//!
//! One bind/connect contract, two implementations selected at startup:
//!
//! - Unix family: the identity is a filesystem path bound as a Unix domain
//!   socket; any stale artifact at that path is removed before binding.
//! - Platforms without local-domain sockets: a loopback TCP socket on an
//!   OS-assigned port, with `host:port` text written to the path for the
//!   client to discover.
//!
//! The artifact is the only state this system ever persists.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;
use uuid::Uuid;

use crate::config::{ClientConfig, RendezvousConfig};
use crate::error::{KilnError, Result};

/// Generate a fresh, collision-resistant rendezvous path in the system
/// temp directory.
pub fn make_addr() -> PathBuf {
    let suffix = if cfg!(unix) {
        RendezvousConfig::SOCKET_SUFFIX
    } else {
        RendezvousConfig::ADDR_SUFFIX
    };
    let id = Uuid::new_v4().simple().to_string();
    let name = format!("{}{}{}", RendezvousConfig::FILE_PREFIX, &id[..12], suffix);
    std::env::temp_dir().join(name)
}

/// A rendezvous endpoint identity. Cheap to clone; binding or connecting
/// produces the live socket objects.
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: PathBuf,
}

impl Endpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Human-readable transport name for startup logging.
    pub fn transport_kind(&self) -> &'static str {
        if cfg!(unix) {
            "unix socket"
        } else {
            "tcp"
        }
    }

    /// Bind the endpoint, removing any stale artifact first.
    #[cfg(unix)]
    pub async fn bind(&self) -> Result<RendezvousListener> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| KilnError::io_with_path(e, &self.path))?;
            debug!(path = %self.path.display(), "removed stale rendezvous artifact");
        }
        let listener = UnixListener::bind(&self.path)
            .map_err(|e| KilnError::io_with_path(e, &self.path))?;
        Ok(RendezvousListener::Unix(listener))
    }

    /// Bind a loopback TCP socket and write its address to the path.
    #[cfg(not(unix))]
    pub async fn bind(&self) -> Result<RendezvousListener> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        std::fs::write(&self.path, format!("127.0.0.1:{port}"))
            .map_err(|e| KilnError::io_with_path(e, &self.path))?;
        debug!(path = %self.path.display(), port, "wrote rendezvous discovery file");
        Ok(RendezvousListener::Tcp(listener))
    }

    /// Connect to a bound endpoint. Missing artifacts and refused
    /// connections surface as [`KilnError::Connection`].
    #[cfg(unix)]
    pub async fn connect(&self) -> Result<RendezvousStream> {
        let stream = tokio::time::timeout(
            ClientConfig::CONNECT_TIMEOUT,
            UnixStream::connect(&self.path),
        )
        .await
        .map_err(|_| KilnError::connection(&self.path, "connection timed out"))?
        .map_err(|e| KilnError::connection(&self.path, e.to_string()))?;
        Ok(RendezvousStream::Unix(stream))
    }

    /// Read the discovery file and connect to the address inside it.
    #[cfg(not(unix))]
    pub async fn connect(&self) -> Result<RendezvousStream> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| KilnError::connection(&self.path, e.to_string()))?;
        let addr = text.trim();
        let stream = tokio::time::timeout(
            ClientConfig::CONNECT_TIMEOUT,
            TcpStream::connect(addr.to_string()),
        )
        .await
        .map_err(|_| KilnError::connection(&self.path, "connection timed out"))?
        .map_err(|e| KilnError::connection(&self.path, e.to_string()))?;
        Ok(RendezvousStream::Tcp(stream))
    }

    /// Remove the rendezvous artifact. An already-absent artifact is fine.
    pub fn cleanup(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| KilnError::io_with_path(e, &self.path))?;
            debug!(path = %self.path.display(), "removed rendezvous artifact");
        }
        Ok(())
    }
}

/// A bound listener, Unix or TCP depending on the platform.
pub enum RendezvousListener {
    #[cfg(unix)]
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl RendezvousListener {
    pub async fn accept(&self) -> Result<RendezvousStream> {
        match self {
            #[cfg(unix)]
            RendezvousListener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(RendezvousStream::Unix(stream))
            }
            RendezvousListener::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(RendezvousStream::Tcp(stream))
            }
        }
    }
}

/// A connected bidirectional stream, unified across both transports.
#[derive(Debug)]
pub enum RendezvousStream {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl AsyncRead for RendezvousStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            RendezvousStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            RendezvousStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for RendezvousStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            #[cfg(unix)]
            RendezvousStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            RendezvousStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            RendezvousStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
            RendezvousStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            #[cfg(unix)]
            RendezvousStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            RendezvousStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn endpoint_in(dir: &TempDir) -> Endpoint {
        Endpoint::new(dir.path().join("kiln_test.sock"))
    }

    #[test]
    fn test_make_addr_shape_and_uniqueness() {
        let a = make_addr();
        let b = make_addr();
        assert_ne!(a, b);
        assert!(a.starts_with(std::env::temp_dir()));
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(RendezvousConfig::FILE_PREFIX));
        #[cfg(unix)]
        assert!(name.ends_with(RendezvousConfig::SOCKET_SUFFIX));
    }

    #[tokio::test]
    async fn test_bind_connect_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let endpoint = endpoint_in(&tmp);
        let listener = endpoint.bind().await.unwrap();

        let client_endpoint = endpoint.clone();
        let client = tokio::spawn(async move {
            let mut stream = client_endpoint.connect().await.unwrap();
            stream.write_all(b"ping").await.unwrap();
            stream.flush().await.unwrap();
        });

        let mut server_side = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        server_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_artifact_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let endpoint = endpoint_in(&tmp);

        // First bind leaves its artifact behind when dropped uncleanly.
        {
            let _listener = endpoint.bind().await.unwrap();
        }
        #[cfg(unix)]
        assert!(endpoint.path().exists());

        // A fresh server on the same path succeeds anyway.
        let _listener = endpoint.bind().await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_removes_artifact_and_tolerates_absence() {
        let tmp = TempDir::new().unwrap();
        let endpoint = endpoint_in(&tmp);
        let _listener = endpoint.bind().await.unwrap();

        endpoint.cleanup().unwrap();
        assert!(!endpoint.path().exists());
        endpoint.cleanup().unwrap(); // second cleanup is a no-op
    }

    #[tokio::test]
    async fn test_connect_to_missing_endpoint_is_connection_error() {
        let tmp = TempDir::new().unwrap();
        let endpoint = endpoint_in(&tmp);
        let err = endpoint.connect().await.unwrap_err();
        assert!(err.is_connection());
    }
}
