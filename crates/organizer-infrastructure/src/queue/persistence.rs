//! Atomic sidecar persistence: `write-tmp-then-rename`, with corrupt files
//! quarantined rather than silently dropped.

use std::path::{Path, PathBuf};

use organizer_domain::ports::Clock;
use organizer_domain::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Write `value` to `path` atomically: serialize to `path.tmp.<now_ms>`,
/// then rename over `path`. An empty `value` (per `is_empty`) unlinks the
/// sidecar instead of writing an empty file.
pub async fn write_atomic<T: Serialize + Send + Sync>(
    path: &Path,
    value: &T,
    is_empty: bool,
    clock: &dyn Clock,
) -> Result<()> {
    if is_empty {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(Error::Io { source: error }),
        }
        return Ok(());
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = tmp_path(path, clock.now_ms());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp_path, &json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn tmp_path(path: &Path, now_ms: i64) -> PathBuf {
    let mut name = path.file_name().and_then(|n| n.to_str()).unwrap_or("sidecar").to_string();
    name.push_str(&format!(".tmp.{now_ms}"));
    path.with_file_name(name)
}

fn corrupt_path(path: &Path, now_ms: i64) -> PathBuf {
    let mut name = path.file_name().and_then(|n| n.to_str()).unwrap_or("sidecar").to_string();
    name.push_str(&format!(".corrupt.{now_ms}"));
    path.with_file_name(name)
}

/// Load `path` as `T`, returning `default` if the file does not exist. A
/// corrupt (unparseable) file is renamed aside as `*.corrupt.<now_ms>` and
/// `default` is returned rather than propagating the parse error.
pub async fn load_or_default<T: DeserializeOwned + Send + Sync>(
    path: &Path,
    default: T,
    clock: &dyn Clock,
) -> Result<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(default),
        Err(error) => return Err(Error::Io { source: error }),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "sidecar corrupt, quarantining");
            let quarantined = corrupt_path(path, clock.now_ms());
            let _ = tokio::fs::rename(path, &quarantined).await;
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::ports::clock::SystemClock;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn roundtrips_through_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_embeddings.json");
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), 1);

        write_atomic(&path, &value, false, &SystemClock).await.unwrap();
        let loaded: BTreeMap<String, i32> = load_or_default(&path, BTreeMap::new(), &SystemClock).await.unwrap();
        assert_eq!(loaded, value);
    }

    #[tokio::test]
    async fn empty_write_unlinks_the_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_embeddings.json");
        let value: Vec<i32> = vec![1];
        write_atomic(&path, &value, false, &SystemClock).await.unwrap();
        assert!(path.exists());

        write_atomic(&path, &Vec::<i32>::new(), true, &SystemClock).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: Vec<i32> = load_or_default(&path, Vec::new(), &SystemClock).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_quarantined_and_default_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_embeddings.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let loaded: Vec<i32> = load_or_default(&path, Vec::new(), &SystemClock).await.unwrap();
        assert!(loaded.is_empty());
        assert!(!path.exists());

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut found_corrupt = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().contains(".corrupt.") {
                found_corrupt = true;
            }
        }
        assert!(found_corrupt);
    }
}
