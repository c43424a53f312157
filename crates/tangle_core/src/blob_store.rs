//! Content-addressed blob storage: the repository side of plan execution.

use crate::attrs::XattrSet;
use crate::error::{Result, TangleError};
use crate::ids::{canonical_bytes, Hid, HEADER_LEN, MAGIC};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum size for a single blob (100 MB).
const MAX_BLOB_SIZE: usize = 100 * 1024 * 1024;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Content-addressed blob storage.
///
/// Blobs are stored as zstd-compressed canonical envelopes. The file path is
/// derived from the blob's hash, which gives deduplication and corruption
/// detection on every read.
///
/// # Examples
///
/// ```
/// use tangle_core::BlobStore;
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let store = BlobStore::new(tmp.path().join("blobs"));
///
/// let hid = store.put_blob(b"hello world").unwrap();
/// assert_eq!(store.get_blob(hid).unwrap(), b"hello world");
/// ```
#[derive(Debug)]
pub struct BlobStore {
    root: PathBuf,
    compression_level: i32,
}

impl BlobStore {
    /// Creates a blob store rooted at the given directory.
    ///
    /// Shard directories are created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Overrides the zstd compression level used for new blobs.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Returns the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores raw bytes and returns their content hash.
    ///
    /// Storing content that already exists is a no-op.
    pub fn put_blob(&self, data: &[u8]) -> Result<Hid> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(TangleError::BlobTooLarge {
                size: data.len(),
                limit: MAX_BLOB_SIZE,
            });
        }

        let hid = Hid::for_content(data);
        if self.exists(hid) {
            return Ok(hid);
        }

        self.write_blob(hid, &canonical_bytes(data))?;
        Ok(hid)
    }

    /// Retrieves raw bytes by content hash, verifying integrity.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if the blob doesn't exist.
    /// Returns `HashMismatch` or `CorruptedObject` if verification fails.
    pub fn get_blob(&self, hid: Hid) -> Result<Vec<u8>> {
        let path = self.blob_path(hid);
        if !path.exists() {
            return Err(TangleError::ObjectNotFound(hid.as_hex()));
        }

        let compressed = fs::read(&path)?;
        let canonical = zstd::decode_all(compressed.as_slice())
            .map_err(|e| TangleError::Compression(e.to_string()))?;

        if canonical.len() < HEADER_LEN {
            return Err(TangleError::CorruptedObject {
                path,
                reason: "blob too small".to_string(),
            });
        }
        if &canonical[..MAGIC.len()] != MAGIC {
            return Err(TangleError::CorruptedObject {
                path,
                reason: "invalid magic bytes".to_string(),
            });
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&canonical[MAGIC.len()..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes) as usize;
        let payload = &canonical[HEADER_LEN..];
        if payload.len() != len {
            return Err(TangleError::CorruptedObject {
                path,
                reason: format!(
                    "length mismatch: header says {}, got {}",
                    len,
                    payload.len()
                ),
            });
        }

        let actual = Hid::for_content(payload);
        if actual != hid {
            return Err(TangleError::HashMismatch {
                expected: hid.as_hex(),
                actual: actual.as_hex(),
            });
        }

        Ok(payload.to_vec())
    }

    /// Writes a blob's content to `dest`, replacing any existing file.
    pub fn fetch_to_file(&self, hid: Hid, dest: &Path) -> Result<()> {
        let data = self.get_blob(hid)?;
        let mut file = File::create(dest)?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Stores an extended-attribute set and returns its reference.
    pub fn put_xattrs(&self, set: &XattrSet) -> Result<Hid> {
        let encoded =
            postcard::to_allocvec(set).map_err(|e| TangleError::Serialization(e.to_string()))?;
        self.put_blob(&encoded)
    }

    /// Loads an extended-attribute set by reference.
    pub fn get_xattrs(&self, hid: Hid) -> Result<XattrSet> {
        let encoded = self.get_blob(hid)?;
        postcard::from_bytes(&encoded).map_err(|e| TangleError::Deserialization(e.to_string()))
    }

    /// Checks if a blob exists in the store.
    pub fn exists(&self, hid: Hid) -> bool {
        self.blob_path(hid).exists()
    }

    fn blob_path(&self, hid: Hid) -> PathBuf {
        self.root.join(hid.shard()).join(hid.as_hex())
    }

    /// Writes compressed canonical bytes to disk atomically.
    fn write_blob(&self, hid: Hid, canonical: &[u8]) -> Result<()> {
        let path = self.blob_path(hid);
        let dir = self.root.join(hid.shard());
        fs::create_dir_all(&dir)?;

        let compressed = zstd::encode_all(canonical, self.compression_level)
            .map_err(|e| TangleError::Compression(e.to_string()))?;

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(&dir) {
                let _ = dir_file.sync_all();
            }
        }

        Ok(())
    }
}
