use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Debug)]
pub enum UploadError {
    IoError(std::io::Error),
    InvalidName(String),
    UnsupportedFileType(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::IoError(err) => write!(f, "IO error: {}", err),
            UploadError::InvalidName(name) => write!(f, "Invalid file name: {:?}", name),
            UploadError::UnsupportedFileType(ext) => write!(f, "Unsupported file type: {}", ext),
        }
    }
}

impl Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::IoError(err)
    }
}

/// Where uploaded database files live and which one a request should use.
///
/// Files keep their original names inside a single directory. Nothing is
/// namespaced per session and nothing is ever cleaned up.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    extension: String,
    fallback: PathBuf,
}

impl UploadStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.upload_dir),
            extension: config.allowed_extension.trim_start_matches('.').to_string(),
            fallback: PathBuf::from(&config.fallback_path),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Maps a client-supplied name to a path inside the upload directory.
    /// Only the last path component is kept.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf, UploadError> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::InvalidName(file_name.to_string()))?;

        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !extension.eq_ignore_ascii_case(&self.extension) {
            return Err(UploadError::UnsupportedFileType(if extension.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{}", extension)
            }));
        }

        Ok(self.dir.join(name))
    }

    /// Writes the upload, overwriting any file of the same name, and returns
    /// the name it was stored under.
    pub async fn save(&self, file_name: &str, contents: &[u8]) -> Result<String, UploadError> {
        let path = self.resolve(file_name)?;
        if !self.dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        tokio::fs::write(&path, contents).await?;

        info!("Stored uploaded database at {} ({} bytes)", path.display(), contents.len());

        Ok(path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string()))
    }

    /// The database a request runs against: the uploaded file when there is
    /// one, otherwise the fallback.
    pub fn database_for(&self, uploaded: Option<&str>) -> Result<PathBuf, UploadError> {
        match uploaded {
            Some(name) => self.resolve(name),
            None => Ok(self.fallback.clone()),
        }
    }
}
