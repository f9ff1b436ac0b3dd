use async_trait::async_trait;
use rand::Rng;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt};

use crate::uploads::ImageUpload;

/// Extension used when the uploaded file's original name has none.
pub const DEFAULT_EXTENSION: &str = ".jpg";

// Regenerating a name after a collision is cheap; giving up after a few tries
// means the content directory is in a state we should not paper over.
const MAX_NAME_ATTEMPTS: usize = 3;

// 1. ImageStore Contract
/// ImageStore
///
/// Owns the content directory that holds uploaded images. Handlers talk to
/// this trait only, so the disk layout stays in one place.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Creates the content directory if it does not exist. Called at startup.
    async fn ensure_dir(&self) -> io::Result<()>;

    /// Writes an already validated upload under a freshly generated name and
    /// returns that name (relative to the content directory).
    async fn save(&self, upload: &ImageUpload) -> io::Result<String>;

    /// Removes a stored image. A file that is already gone counts as removed.
    async fn remove(&self, filename: &str) -> io::Result<()>;
}

/// ImageStoreState
///
/// The shared handle to the image store held in the application state.
pub type ImageStoreState = Arc<dyn ImageStore>;

// 2. The Disk Implementation
/// DiskImageStore
///
/// Stores images as plain files in a single directory.
#[derive(Clone, Debug)]
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a stored filename to its path. Names containing directory
    /// components never resolve, so a bad row cannot reach outside the root.
    pub fn path_of(&self, filename: &str) -> Option<PathBuf> {
        let name = sanitize_filename(filename)?;
        Some(self.root.join(name))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// save
    ///
    /// Opens with `create_new` so a name collision is detected instead of
    /// silently overwriting another submission's image.
    async fn save(&self, upload: &ImageUpload) -> io::Result<String> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = generate_filename(upload.original_name.as_deref());
            let path = self.root.join(&filename);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(%filename, "Generated image name already taken, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = write_all(&mut file, &upload.data).await {
                drop(file);
                // No partial file may outlive a failed write.
                let _ = fs::remove_file(&path).await;
                return Err(e);
            }

            tracing::debug!(%filename, bytes = upload.data.len(), "Stored uploaded image");
            return Ok(filename);
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            "could not generate an unused image filename",
        ))
    }

    async fn remove(&self, filename: &str) -> io::Result<()> {
        let Some(path) = self.path_of(filename) else {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("refusing to remove non-plain filename {filename:?}"),
            ));
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

/// generate_filename
///
/// `{unix millis}-{random in [0, 1e9)}{extension}`. The extension is copied
/// from the original name (dot included), or `.jpg` when there is none.
/// Collisions are unlikely, not impossible; `save` guards against overwrites.
pub fn generate_filename(original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{suffix}{}", extension_of(original_name))
}

/// The extension of an uploaded file's original name, including the leading dot.
pub fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// sanitize_filename
///
/// Accepts only a single, plain path segment. Anything with a separator or a
/// `.`/`..` component is rejected.
fn sanitize_filename(filename: &str) -> Option<&str> {
    let is_plain = !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\']);
    is_plain.then_some(filename)
}
