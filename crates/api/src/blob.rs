//! Attachment blob storage
//!
//! Saves uploaded files under a local directory (point it at a mounted
//! volume in deployment) and hands back a URL usable directly inside
//! message attachments. Files are addressed by generated name only.

use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};

/// Filesystem-backed blob store for chat attachments
#[derive(Debug, Clone)]
pub struct BlobStorage {
    root: PathBuf,
    public_base: String,
}

impl BlobStorage {
    pub fn new(root: impl AsRef<Path>, public_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base: format!("{}/uploads", public_url.trim_end_matches('/')),
        }
    }

    /// Save a blob under a generated name, returning `(name, public_url)`.
    /// The original filename never reaches the filesystem; only its
    /// extension survives into the generated name.
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> std::io::Result<(String, String)> {
        let name = generate_name(original_filename);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), bytes).await?;

        let url = format!("{}/{}", self.public_base, name);
        tracing::debug!(blob = %name, size = bytes.len(), "Stored attachment blob");
        Ok((name, url))
    }

    /// Delete a previously stored blob. Used for orphan cleanup when the
    /// owning session turns out not to exist.
    pub async fn delete(&self, name: &str) -> std::io::Result<()> {
        // Generated names are a single path component; reject anything else
        if name.contains('/') || name.contains("..") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "invalid blob name",
            ));
        }
        tokio::fs::remove_file(self.root.join(name)).await
    }
}

/// Random 24-char alphanumeric name, keeping the upload's extension so
/// served files get a sensible content type.
fn generate_name(original_filename: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();

    match Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("{}.{}", token, ext.to_ascii_lowercase()),
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_keeps_extension() {
        let name = generate_name("invoice.PDF");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 24 + 4);
    }

    #[test]
    fn test_generated_name_drops_suspect_extension() {
        let name = generate_name("weird.name.with/../slashes");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let store = BlobStorage::new("/tmp/stayline-test-uploads", "http://localhost:3000");
        let err = store.delete("../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
