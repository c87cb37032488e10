use anyhow::{Context, Result};
use async_trait::async_trait;

/// Byte storage for assets read by the pipeline and artifacts it writes.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Storage on the local file system, paths relative to `root`.
pub struct NativeStorage {
    root: std::path::PathBuf,
}

impl NativeStorage {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> std::path::PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Storage for NativeStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read {}", full.display()))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Failed to write {}", full.display()))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if tokio::fs::try_exists(&full).await? {
            if full.is_dir() {
                tokio::fs::remove_dir_all(&full).await?;
            } else {
                tokio::fs::remove_file(&full).await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_storage_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path());

        storage.write("nested/title.txt", b"Hello").await?;
        assert!(storage.exists("nested/title.txt").await?);
        assert_eq!(storage.read("/nested/title.txt").await?, b"Hello");

        storage.delete("nested").await?;
        assert!(!storage.exists("nested/title.txt").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path());
        assert!(storage.read("missing.md").await.is_err());
        Ok(())
    }
}
