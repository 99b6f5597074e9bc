//! Kiln Core - a persistent code-execution workbench over local sockets.
//!
//! A client sends a fragment of source text; the server evaluates it
//! against an environment that persists across requests within one session
//! and returns captured output plus the set of currently-bound names. A
//! calling tool can build up computation incrementally (define a value
//! once, reference it in later calls) without restarting an interpreter
//! per call.
//!
//! The pieces, leaves first:
//!
//! - [`protocol`]: length-prefixed JSON frames plus typed payloads.
//! - [`engine`]: the embedded, sandboxed fragment evaluator behind the
//!   pluggable [`engine::Evaluator`] seam.
//! - [`session`]: the single shared evaluation state and its lock.
//! - [`rendezvous`]: endpoint discovery (Unix socket, or loopback TCP
//!   with a discovery file where local sockets are unavailable).
//! - [`server`]: accept loop and per-connection workers.
//! - [`client`]: one-shot client stub.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kiln_core::{ExecServer, Endpoint, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> kiln_core::Result<()> {
//!     let endpoint = Endpoint::new("/tmp/kiln_demo.sock");
//!     let session = Arc::new(Session::standard(SessionConfig::default()));
//!     ExecServer::serve(endpoint, session).await
//! }
//! ```
//!
//! Not a hardened sandbox: the engine's allow-listed capability set bounds
//! what fragments can reach, but it is not a genuine isolation boundary.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod rendezvous;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use client::{ExecClient, ReplyView};
pub use engine::{CapabilitySet, EvalSink, Evaluator, Fault, FaultKind, ScriptEngine, Value};
pub use error::{KilnError, Result};
pub use protocol::{Reply, Request, RequestKind};
pub use rendezvous::{make_addr, Endpoint};
pub use server::{Dispatch, Dispatched, ExecServer};
pub use session::{ExecOutcome, Session, SessionConfig, Visibility};
