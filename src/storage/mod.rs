// Filesystem-backed blob store with signed-URL retrieval.
// Blob paths are relative, fresh per version; a put never overwrites.
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Signed links expire after one hour; they are generated on demand at read
/// time and never persisted.
pub const SIGNED_URL_TTL_SECS: i64 = 3600;

const TRACKING_PREFIX: &str = "REC";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob path already exists: {0}")]
    AlreadyExists(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The storage collaborator the workflow engine talks to.
pub trait BlobStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError>;
    fn get(&self, blob_ref: &str) -> Result<Vec<u8>, StorageError>;
    fn delete(&self, blob_ref: &str) -> Result<(), StorageError>;
    /// Single attempt; callers treat a failure as "unavailable", not fatal.
    fn signed_url(&self, blob_ref: &str, ttl_secs: i64) -> Result<String, StorageError>;
}

pub struct FsBlobStore {
    root: PathBuf,
    signing_key: String,
}

impl FsBlobStore {
    pub fn new(root: PathBuf, signing_key: String) -> Self {
        Self { root, signing_key }
    }

    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    fn resolve(&self, blob_ref: &str) -> Result<PathBuf, StorageError> {
        if blob_ref.is_empty()
            || Path::new(blob_ref).is_absolute()
            || blob_ref.split('/').any(|c| c == "..")
        {
            return Err(StorageError::InvalidPath(blob_ref.to_string()));
        }
        Ok(self.root.join(blob_ref))
    }

    fn signature(&self, blob_ref: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_key.as_bytes());
        hasher.update(b":");
        hasher.update(blob_ref.as_bytes());
        hasher.update(b":");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_signature(&self, blob_ref: &str, expires: i64, sig: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        self.signature(blob_ref, expires) == sig
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(path.to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;
        file.write_all(bytes)?;
        Ok(path.to_string())
    }

    fn get(&self, blob_ref: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(blob_ref)?;
        std::fs::read(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(blob_ref.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn delete(&self, blob_ref: &str) -> Result<(), StorageError> {
        let full = self.resolve(blob_ref)?;
        std::fs::remove_file(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(blob_ref.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn signed_url(&self, blob_ref: &str, ttl_secs: i64) -> Result<String, StorageError> {
        self.resolve(blob_ref)?;
        let expires = Utc::now().timestamp() + ttl_secs;
        let sig = self.signature(blob_ref, expires);
        Ok(format!("/blob/{blob_ref}?expires={expires}&sig={sig}"))
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn tracking_code() -> String {
    format!(
        "{}-{}-{}",
        TRACKING_PREFIX,
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().to_string()[..8]
    )
}

/// Fresh per-version blob path for a submission artifact.
pub fn blob_path(submission_id: &str, kind: &str, version: i32) -> String {
    format!(
        "submissions/{}/{}/v{}-{}.pdf",
        submission_id,
        kind,
        version,
        &Uuid::new_v4().to_string()[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "test-key".to_string());
        (dir, store)
    }

    #[test]
    fn put_get_round_trip() {
        let (_dir, store) = store();
        store.put("a/b/file.pdf", b"hello").unwrap();
        assert_eq!(store.get("a/b/file.pdf").unwrap(), b"hello");
    }

    #[test]
    fn put_never_overwrites() {
        let (_dir, store) = store();
        store.put("x.pdf", b"one").unwrap();
        let err = store.put("x.pdf", b"two").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(store.get("x.pdf").unwrap(), b"one");
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get("../etc/passwd").unwrap_err(),
            StorageError::InvalidPath(_)
        ));
        assert!(matches!(
            store.get("/etc/passwd").unwrap_err(),
            StorageError::InvalidPath(_)
        ));
    }

    #[test]
    fn signed_url_verifies_and_rejects_tampering() {
        let (_dir, store) = store();
        store.put("doc.pdf", b"data").unwrap();
        let url = store.signed_url("doc.pdf", SIGNED_URL_TTL_SECS).unwrap();

        let query = url.split_once('?').unwrap().1;
        let mut expires = 0i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }

        assert!(store.verify_signature("doc.pdf", expires, &sig));
        assert!(!store.verify_signature("other.pdf", expires, &sig));
        assert!(!store.verify_signature("doc.pdf", expires + 1, &sig));
    }

    #[test]
    fn expired_signature_is_rejected() {
        let (_dir, store) = store();
        let past = Utc::now().timestamp() - 10;
        let sig = store.signature("doc.pdf", past);
        assert!(!store.verify_signature("doc.pdf", past, &sig));
    }

    #[test]
    fn tracking_code_shape() {
        let code = tracking_code();
        assert!(code.starts_with("REC-"));
        assert_eq!(code.split('-').count(), 3);
    }
}
