use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const FRESHNESS_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];
pub const OCR_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("File too large")]
    FileTooLarge,
    #[error("Malformed upload: {0}")]
    Malformed(String),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Local directory that receives every uploaded image.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn create(dir: &Path, max_bytes: usize) -> Result<Self, UploadError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn validate_size(&self, len: usize) -> Result<(), UploadError> {
        if len > self.max_bytes {
            return Err(UploadError::FileTooLarge);
        }
        Ok(())
    }

    /// Writes the upload as `<hash prefix>_<sanitized name>` and returns its path.
    /// The file only appears once it is complete.
    pub fn save(&self, data: &[u8], filename: &str) -> Result<PathBuf, UploadError> {
        self.validate_size(data.len())?;

        let mut name = secure_filename(filename);
        if name.is_empty() {
            name = Uuid::new_v4().to_string();
        }
        let path = self
            .dir
            .join(format!("{}_{}", &content_hash(data)[..12], name));

        // Same bytes under the same name may be in flight elsewhere; readers
        // keep the old inode while the rename swaps in the new one.
        let partial = self.dir.join(format!(".{}.part", Uuid::new_v4()));
        if let Err(e) = std::fs::write(&partial, data) {
            std::fs::remove_file(&partial).ok();
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&partial, &path) {
            std::fs::remove_file(&partial).ok();
            return Err(e.into());
        }
        log::debug!("Stored upload {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}

pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn allowed_file(filename: &str, allowed: &[&str]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            allowed.contains(&extension.as_str())
        }
        None => false,
    }
}

/// Reduces a client-supplied name to a safe, flat, ASCII file name.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(allowed_file("Banana.JPG", FRESHNESS_EXTENSIONS));
        assert!(allowed_file("label.webp", FRESHNESS_EXTENSIONS));
        assert!(!allowed_file("label.webp", OCR_EXTENSIONS));
        assert!(!allowed_file("notes.txt", FRESHNESS_EXTENSIONS));
        assert!(!allowed_file("png", FRESHNESS_EXTENSIONS));
    }

    #[test]
    fn secure_filename_strips_paths_and_odd_characters() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("my photo (1).png"), "my_photo_1.png");
        assert_eq!(secure_filename("C:\\Users\\me\\milk.jpg"), "C_Users_me_milk.jpg");
        assert_eq!(secure_filename("fraîche.jpg"), "frache.jpg");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn save_writes_under_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::create(&dir.path().join("uploads"), 1024).unwrap();

        let path = store.save(b"pixels", "../apple.png").unwrap();
        assert!(path.starts_with(dir.path().join("uploads")));
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("_apple.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
    }

    #[test]
    fn same_name_different_content_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::create(dir.path(), 1024).unwrap();
        let first = store.save(b"one", "photo.jpg").unwrap();
        let second = store.save(b"two", "photo.jpg").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unnamed_upload_gets_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::create(dir.path(), 1024).unwrap();
        let path = store.save(b"data", "???").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::create(dir.path(), 4).unwrap();
        assert!(matches!(
            store.save(b"too many bytes", "x.png"),
            Err(UploadError::FileTooLarge)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn resubmission_does_not_rewrite_an_open_file() {
        use std::io::Read;
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::create(dir.path(), 1024).unwrap();
        let first = store.save(b"same pixels", "photo.jpg").unwrap();
        let mut reader = std::fs::File::open(&first).unwrap();
        let first_inode = reader.metadata().unwrap().ino();

        let second = store.save(b"same pixels", "photo.jpg").unwrap();
        assert_eq!(first, second);
        assert_ne!(std::fs::metadata(&second).unwrap().ino(), first_inode);

        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"same pixels");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
