//! Artifact storage for uploaded inputs and produced transcripts.
//!
//! Artifacts are addressed by a flat *locator* relative to a backend's root
//! directory. Locators never contain path separators or `..`, so a backend
//! cannot be tricked into reading or writing outside its root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use scribe_core::{defaults, sanitize_filename, Error, Result};

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given locator, replacing any previous content.
    async fn write(&self, locator: &str, data: &[u8]) -> Result<()>;

    /// Read the artifact stored under the locator.
    ///
    /// Returns [`Error::NotFound`] when nothing is stored there.
    async fn read(&self, locator: &str) -> Result<Vec<u8>>;

    async fn exists(&self, locator: &str) -> Result<bool>;

    /// Delete the artifact. Deleting a missing artifact is not an error.
    async fn delete(&self, locator: &str) -> Result<()>;
}

/// Storage directories.
///
/// | Variable | Default |
/// |----------|---------|
/// | `UPLOAD_DIR` | `./data/uploads` |
/// | `OUTPUT_DIR` | `./data/transcriptions` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = non_empty_env("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_env("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Locator for a freshly uploaded artifact: `{uuidv7}_{sanitized filename}`.
pub fn upload_locator(filename: Option<&str>) -> String {
    let mut name = filename
        .map(sanitize_filename)
        .unwrap_or_else(|| defaults::UNNAMED_UPLOAD.to_string());
    while name.contains("..") {
        name = name.replace("..", ".");
    }
    format!("{}_{}", Uuid::now_v7(), name)
}

/// Filesystem storage backend rooted at a single directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, locator: &str) -> Result<PathBuf> {
        let valid = !locator.is_empty()
            && !locator.starts_with('.')
            && !locator.contains(['/', '\\', '\0'])
            && !locator.contains("..");
        if !valid {
            return Err(Error::InvalidInput(format!(
                "Invalid storage locator: {:?}",
                locator
            )));
        }
        Ok(self.base_path.join(locator))
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Run at startup so permission problems and missing mounts surface
    /// before the first job is accepted.
    pub async fn validate(&self) -> Result<()> {
        let probe = self.base_path.join(".health-check");
        let storage_err =
            |op: &str, e: std::io::Error| Error::Storage(format!("{}({:?}): {}", op, probe, e));

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| storage_err("create_dir_all", e))?;

        let data = b"storage-health-check";
        fs::write(&probe, data)
            .await
            .map_err(|e| storage_err("write", e))?;

        let read_back = fs::read(&probe).await.map_err(|e| storage_err("read", e))?;
        if read_back != data {
            return Err(Error::Storage(format!(
                "read-back mismatch in {}",
                self.base_path.display()
            )));
        }

        fs::remove_file(&probe)
            .await
            .map_err(|e| storage_err("remove_file", e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, locator: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(locator)?;
        debug!(locator, full_path = %full_path.display(), size = data.len(), "storage: write");

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(dir = %self.base_path.display(), error = %e, "storage: create_dir_all failed");
            Error::Storage(format!("Failed to create {}: {}", self.base_path.display(), e))
        })?;

        // Temp file + rename so readers never observe a partial artifact
        let temp_path = self.base_path.join(format!(".{}.tmp", locator));
        if let Err(e) = write_and_rename(&temp_path, &full_path, data).await {
            warn!(
                temp_path = %temp_path.display(),
                full_path = %full_path.display(),
                error = %e,
                "storage: write failed, removing temp file"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!("Failed to store {}: {}", locator, e)));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, locator: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(locator)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Artifact {} not found", locator)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, locator: &str) -> Result<bool> {
        let full_path = self.full_path(locator)?;
        Ok(fs::try_exists(full_path).await?)
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let full_path = self.full_path(locator)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }
}

async fn write_and_rename(temp_path: &Path, full_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, full_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_exists_delete() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        assert!(!backend.exists("a.txt").await.unwrap());
        backend.write("a.txt", b"hello").await.unwrap();
        assert!(backend.exists("a.txt").await.unwrap());
        assert_eq!(backend.read("a.txt").await.unwrap(), b"hello");

        backend.write("a.txt", b"replaced").await.unwrap();
        assert_eq!(backend.read("a.txt").await.unwrap(), b"replaced");

        backend.delete("a.txt").await.unwrap();
        assert!(!backend.exists("a.txt").await.unwrap());
        backend.delete("a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        let err = backend.read("missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        // A non-empty directory at the target path makes the rename fail
        std::fs::create_dir(dir.path().join("taken.txt")).unwrap();
        std::fs::write(dir.path().join("taken.txt").join("inner"), b"x").unwrap();

        let err = backend.write("taken.txt", b"data").await.unwrap_err();
        assert!(matches!(err, Error::Storage(ref m) if m.contains("taken.txt")));
        assert!(!dir.path().join(".taken.txt.tmp").exists());
        assert!(dir.path().join("taken.txt").is_dir());
    }

    #[tokio::test]
    async fn test_write_creates_base_directory() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("nested").join("out"));
        backend.write("x.txt", b"1").await.unwrap();
        assert!(dir.path().join("nested/out/x.txt").exists());
    }

    #[tokio::test]
    async fn test_rejects_escaping_locators() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        for locator in ["", "../x", "a/b", "a\\b", "/etc/passwd", ".hidden", "a..b"] {
            let err = backend.write(locator, b"x").await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{:?}", locator);
            assert!(backend.read(locator).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("fresh"));
        backend.validate().await.unwrap();
        assert!(!dir.path().join("fresh/.health-check").exists());
    }

    #[test]
    fn test_upload_locator_format() {
        let locator = upload_locator(Some("my talk.wav"));
        let (id, name) = locator.split_once('_').unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(name, "my_talk.wav");

        let unnamed = upload_locator(None);
        assert!(unnamed.ends_with(defaults::UNNAMED_UPLOAD));
        assert_ne!(upload_locator(Some("a.wav")), upload_locator(Some("a.wav")));
    }

    #[test]
    fn test_upload_locator_strips_directories() {
        let locator = upload_locator(Some("../../etc/passwd"));
        assert!(!locator.contains('/'));
        assert!(locator.ends_with("_passwd"));

        let dotted = upload_locator(Some("take...two.wav"));
        assert!(!dotted.contains(".."));
        assert!(dotted.ends_with("_take.two.wav"));
    }

    #[test]
    fn test_storage_config_builders() {
        let config = StorageConfig::default()
            .with_upload_dir("/tmp/in")
            .with_output_dir("/tmp/out");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/in"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.upload_dir, PathBuf::from(defaults::UPLOAD_DIR));
        assert_eq!(config.output_dir, PathBuf::from(defaults::OUTPUT_DIR));
    }
}
