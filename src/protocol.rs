//! Shared protocol constants for the trace framed transport

// Protocol header constants
pub const MAGIC: &[u8; 4] = b"TRCE";
pub const VERSION: u16 = 1;

/// Frame header length: MAGIC (4) | VERSION (2) | TYPE (1) | LENGTH (4)
pub const HEADER_LEN: usize = 11;

// Maximum frame payload size (64MB) - prevents memory exhaustion from a bad length
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

// Frame type IDs (keep numeric stable)
pub mod frame {
    /// Client -> server: JSON `{route, params}` opening a route
    pub const OPEN: u8 = 1;
    pub const OK: u8 = 2;
    /// UTF-8 error message, server -> client
    pub const ERROR: u8 = 3;
    /// JSON-encoded file record
    pub const MESSAGE: u8 = 4;
    /// Raw file content, possibly right-padded with NUL bytes.
    /// An empty BLOCK ends the stream.
    pub const BLOCK: u8 = 5;
}

// Server routes
pub mod route {
    /// List exchange: client sends its inventory, server replies with what is missing
    pub const SYNC: &str = "/sync";
    /// Single-file download, parameterized by `file`
    pub const DOWNLOAD: &str = "/download";

    pub const FILE_PARAM: &str = "file";
}
