use crate::core::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// Filesystem storage. Reads resolve against the working directory,
/// writes land under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("nested").to_string_lossy().to_string();
        let storage = LocalStorage::new(base.clone());

        storage.write_file("a/report.txt", b"hello").await.unwrap();

        let written = Path::new(&base).join("a/report.txt");
        let read_back = storage
            .read_file(&written.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(read_back, b"hello");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let storage = LocalStorage::new(".".to_string());
        let err = storage.read_file("/definitely/not/here.txt").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::ReportError::IoError(_)));
    }
}
