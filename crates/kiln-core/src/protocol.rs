//! Wire protocol: framing and typed payloads.
//!
//! Frame format: 4-byte big-endian length prefix followed by that many
//! bytes of UTF-8 JSON.
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```
//!
//! A clean end of stream before or inside a frame is "no message"
//! (`Ok(None)`), which callers treat as the peer closing the connection.
//! Undecodable payloads are protocol errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::ProtocolConfig;
use crate::error::{KilnError, Result};

/// Acknowledgment text sent for a `shutdown` command.
pub const STATUS_SHUTTING_DOWN: &str = "shutting down";

/// One request per connection: a source fragment or a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// What a request asks for. `code` wins when both keys are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind<'a> {
    Execute(&'a str),
    ShowVars,
    Shutdown,
    Unknown,
}

impl Request {
    pub fn execute(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            command: None,
        }
    }

    pub fn show_vars() -> Self {
        Self {
            code: None,
            command: Some("show_vars".to_string()),
        }
    }

    pub fn shutdown() -> Self {
        Self {
            code: None,
            command: Some("shutdown".to_string()),
        }
    }

    pub fn kind(&self) -> RequestKind<'_> {
        if let Some(code) = &self.code {
            return RequestKind::Execute(code);
        }
        match self.command.as_deref() {
            Some("show_vars") => RequestKind::ShowVars,
            Some("shutdown") => RequestKind::Shutdown,
            _ => RequestKind::Unknown,
        }
    }
}

/// One reply per connection. Serialized shapes match the wire contract:
/// execute replies carry `stdout`/`stderr`/`locals` (array), `show_vars`
/// carries `locals` (object), `shutdown` carries `status`, and unknown
/// requests or server-side failures carry a bare `stderr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Execute {
        stdout: String,
        stderr: String,
        locals: Vec<String>,
    },
    Bindings {
        locals: BTreeMap<String, String>,
    },
    Shutdown {
        status: String,
    },
    Error {
        stderr: String,
    },
}

impl Reply {
    pub fn shutdown_ack() -> Self {
        Reply::Shutdown {
            status: STATUS_SHUTTING_DOWN.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            stderr: message.into(),
        }
    }
}

/// Read a length-prefixed frame from an async reader.
///
/// Returns `None` on clean EOF (peer closed connection), including EOF in
/// the middle of a payload.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > ProtocolConfig::MAX_FRAME_LEN {
        return Err(KilnError::protocol(format!(
            "frame size {} exceeds maximum {}",
            len,
            ProtocolConfig::MAX_FRAME_LEN
        )));
    }

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    Ok(Some(payload))
}

/// Write a length-prefixed frame to an async writer.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Decode a frame payload as a request. Invalid UTF-8 or JSON is a
/// protocol error.
pub fn decode_request(payload: &[u8]) -> Result<Request> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| KilnError::protocol("invalid UTF-8 in frame payload"))?;
    serde_json::from_str(text)
        .map_err(|e| KilnError::protocol(format!("undecodable request payload: {e}")))
}
