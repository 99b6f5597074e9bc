//! Centralized configuration constants for Kiln.

use std::time::Duration;

/// Wire protocol limits.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// Maximum accepted frame payload size. A declared length above this is
    /// a protocol fault, not an allocation.
    pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024; // 16MB
}

/// Server-side transport configuration.
pub struct ServerConfig;

impl ServerConfig {
    /// Upper bound on concurrently served connections. Excess connections
    /// queue in the listener backlog until a worker permit frees up.
    pub const MAX_CONNECTIONS: usize = 64;
}

/// Client-side transport configuration.
pub struct ClientConfig;

impl ClientConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Session namespace conventions.
pub struct NamespaceConfig;

impl NamespaceConfig {
    /// Names starting with this prefix are internal: discarded at merge
    /// unless explicitly retained, and never listed unless retained.
    pub const HIDDEN_PREFIX: char = '_';
}

/// Rendezvous address naming.
pub struct RendezvousConfig;

impl RendezvousConfig {
    pub const FILE_PREFIX: &'static str = "kiln_";
    /// Suffix for Unix domain socket paths.
    pub const SOCKET_SUFFIX: &'static str = ".sock";
    /// Suffix for host:port discovery files on platforms without local sockets.
    pub const ADDR_SUFFIX: &'static str = ".addr";
}
