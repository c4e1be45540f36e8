//! `FileAccess`: boundary capability for raw filesystem stat/read, kept
//! separate from `ContentExtractor` because the analyzer needs raw bytes
//! and stat metadata (for TOCTOU detection and size caps) independent of
//! any format-specific extraction.

use async_trait::async_trait;

use crate::error::Result;

/// Minimal stat info the analyzer reasons about.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,
    /// Modification time, milliseconds since the Unix epoch.
    pub mtime_ms: i64,
}

/// Boundary capability for raw file access. Implementations must surface
/// `Error::FileNotFound` for a missing path and `Error::FileDeletedDuringRead`
/// when a file present at `stat` time vanishes before `read_bytes` returns.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Stat a path without reading its contents.
    async fn stat(&self, path: &str) -> Result<FileStat>;

    /// Read a path's full contents.
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;
}
