use std::path::{Path, PathBuf};

use log::info;

use crate::error::Error;

/// File extensions accepted for uploads, compared case-insensitively.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Saves uploaded images to a directory, keyed by their filename.
///
/// Uploading a file with an existing name replaces the old file.
/// Nothing is ever deleted from the directory by this program.
#[derive(Debug, Clone)]
pub struct UploadStore
{
    root: PathBuf,
}

impl UploadStore
{
    /// Creates the upload directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error>
    {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(UploadStore { root })
    }

    pub fn root(&self) -> &Path
    {
        &self.root
    }

    /// Writes the upload to `<root>/<filename>` and returns the full path.
    ///
    /// Only the last component of the client-supplied filename is used,
    /// so "../../etc/passwd.png" is stored as "passwd.png".
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, Error>
    {
        let path = self.path_for(filename)?;
        std::fs::write(&path, bytes)?;
        info!("Saved upload {:?} ({} bytes)", path, bytes.len());
        Ok(path)
    }

    /// The path an upload with this filename is stored at.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, Error>
    {
        // Accept both separators; the filename comes from the client, not from this OS.
        let name = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::InvalidFilename(filename.to_string()));
        }

        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedFileType(name.to_string()));
        }

        Ok(self.root.join(name))
    }
}
