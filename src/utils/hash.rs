use md5::Md5;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read block size used when streaming a file through a digest
pub const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// Digest algorithms a catalog hash can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Pick the algorithm whose hex rendering has the width of `expected`
    pub fn for_hex_digest(expected: &str) -> Option<Self> {
        match expected.len() {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// Compute the lowercase hex digest of a file, reading it in fixed-size blocks
pub async fn compute_file_digest(
    path: &Path,
    algorithm: HashAlgorithm,
) -> Result<String, std::io::Error> {
    match algorithm {
        HashAlgorithm::Md5 => stream_digest::<Md5>(path).await,
        HashAlgorithm::Sha256 => stream_digest::<Sha256>(path).await,
    }
}

async fn stream_digest<D: Digest>(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path).await?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sha256_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, "hello world").await.unwrap();

        let digest = compute_file_digest(&path, HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_algorithm_from_width() {
        assert_eq!(
            HashAlgorithm::for_hex_digest("5eb63bbbe01eeed093cb22bb8f5acdc3"),
            Some(HashAlgorithm::Md5)
        );
        assert_eq!(
            HashAlgorithm::for_hex_digest(&"a".repeat(64)),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(HashAlgorithm::for_hex_digest("abc"), None);
    }

    #[tokio::test]
    async fn test_file_digest_spans_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        // Larger than one block so the loop runs more than once
        let content = "hello world".repeat(HASH_BLOCK_SIZE / 4);
        tokio::fs::write(&path, &content).await.unwrap();

        let streamed = compute_file_digest(&path, HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(streamed, hex::encode(Sha256::digest(content.as_bytes())));
    }

    #[tokio::test]
    async fn test_md5_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, "hello world").await.unwrap();

        let digest = compute_file_digest(&path, HashAlgorithm::Md5).await.unwrap();
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compute_file_digest(&dir.path().join("nope"), HashAlgorithm::Md5).await;
        assert!(result.is_err());
    }
}
