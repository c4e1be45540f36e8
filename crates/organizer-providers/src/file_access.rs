//! `tokio::fs`-backed `FileAccess`: raw stat/read with TOCTOU detection.

use async_trait::async_trait;
use organizer_domain::ports::file_access::FileStat;
use organizer_domain::ports::FileAccess;
use organizer_domain::{Error, Result};

/// Plain filesystem-backed `FileAccess`. No caching, no retries: callers
/// (the analyzer pipeline) own the stat-then-read TOCTOU contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileAccess;

#[async_trait]
impl FileAccess for TokioFileAccess {
    async fn stat(&self, path: &str) -> Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await.map_err(|source| io_error(path, source))?;
        let mtime_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(FileStat { size: metadata.len(), mtime_ms })
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::FileDeletedDuringRead { path: path.to_string() })
            }
            Err(source) => Err(io_error(path, source)),
        }
    }
}

fn io_error(path: &str, source: std::io::Error) -> Error {
    if source.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound { path: path.to_string() }
    } else {
        Error::Io { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stats_and_reads_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let access = TokioFileAccess;
        let path_str = path.to_str().unwrap();
        let stat = access.stat(path_str).await.unwrap();
        assert_eq!(stat.size, 5);

        let bytes = access.read_bytes(path_str).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn stat_on_missing_path_is_file_not_found() {
        let access = TokioFileAccess;
        let result = access.stat("/does/not/exist/at/all.txt").await;
        assert!(matches!(result, Err(Error::FileNotFound {.. })));
    }

    #[tokio::test]
    async fn read_after_deletion_is_toctou() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        tokio::fs::write(&path, b"x").await.unwrap();
        let path_str = path.to_str().unwrap().to_string();

        let access = TokioFileAccess;
        access.stat(&path_str).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        let result = access.read_bytes(&path_str).await;
        assert!(matches!(result, Err(Error::FileDeletedDuringRead {.. })));
    }
}
