//! Product image storage.

use crate::config::UploadConfig;
use chrono::Utc;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// An uploaded image as received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum ImageError {
    /// Extension not in the allow-list
    UnsupportedType(String),
    /// Upload larger than the configured limit
    TooLarge { size: usize, limit: usize },
    /// Reference does not point into the image store
    InvalidReference(String),
    Io(io::Error),
}

impl ImageError {
    /// Rejections the client caused, as opposed to server-side I/O failures
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImageError::Io(_))
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedType(name) => {
                write!(f, "'{name}' is not an image (allowed: png, jpg, jpeg, gif)")
            }
            ImageError::TooLarge { size, limit } => {
                write!(f, "image is {size} bytes; the limit is {limit} bytes")
            }
            ImageError::InvalidReference(r) => write!(f, "invalid image reference '{r}'"),
            ImageError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<io::Error> for ImageError {
    fn from(err: io::Error) -> Self {
        ImageError::Io(err)
    }
}

/// Where product images live
///
/// `store` returns the public reference recorded on the product; `remove` takes that same
/// reference back. Removing an image that is already gone succeeds.
pub trait ImageStore: Send + Sync {
    fn store(&self, upload: &ImageUpload) -> Result<String, ImageError>;
    fn remove(&self, reference: &str) -> Result<(), ImageError>;
}

/// Images as files in one directory, referenced as `<url_prefix>/<file name>`
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl DiskImageStore {
    /// Create the store, making the upload directory if needed
    pub fn new(config: &UploadConfig) -> Result<Self, ImageError> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            dir: config.dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check(&self, upload: &ImageUpload) -> Result<(), ImageError> {
        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.allowed_extensions.contains(&extension) {
            return Err(ImageError::UnsupportedType(upload.file_name.clone()));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                size: upload.bytes.len(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Resolve a public reference to a path inside the upload directory
    fn path_for(&self, reference: &str) -> Result<PathBuf, ImageError> {
        let file_name = reference
            .strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ImageError::InvalidReference(reference.to_string()))?;
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.starts_with('.')
        {
            return Err(ImageError::InvalidReference(reference.to_string()));
        }
        Ok(self.dir.join(file_name))
    }
}

/// Keep the client's base name but only path-safe characters
fn sanitize(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl ImageStore for DiskImageStore {
    fn store(&self, upload: &ImageUpload) -> Result<String, ImageError> {
        self.check(upload)?;
        let unique = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &unique[..8],
            sanitize(&upload.file_name)
        );
        fs::write(self.dir.join(&file_name), &upload.bytes)?;
        log::debug!("stored image {} ({} bytes)", file_name, upload.bytes.len());
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    fn remove(&self, reference: &str) -> Result<(), ImageError> {
        match fs::remove_file(self.path_for(reference)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
