use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Filesystem storage rooted at `base_path`. Absolute paths passed to it are
/// used as they are.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::rename(self.resolve(from), self.resolve(to)).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy());

        storage.write_file("signatures/a.png", b"png").await.unwrap();
        assert_eq!(
            std::fs::read(temp_dir.path().join("signatures/a.png")).unwrap(),
            b"png"
        );
    }

    #[tokio::test]
    async fn test_rename_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy());

        storage.write_file(".a.json.tmp", b"{}").await.unwrap();
        storage.rename(".a.json.tmp", "a.json").await.unwrap();
        assert!(!temp_dir.path().join(".a.json.tmp").exists());
        assert!(temp_dir.path().join("a.json").exists());
        assert!(storage.exists("a.json").await.unwrap());

        storage.remove_file("a.json").await.unwrap();
        assert!(!temp_dir.path().join("a.json").exists());
        assert!(!storage.exists("a.json").await.unwrap());
        // removing a missing file is not an error
        storage.remove_file("a.json").await.unwrap();
    }
}
