use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::core::error::{LauncherError, LauncherResult};

/// Hash algorithms used by the manifests and loader metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Md5,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Md5 => "MD5",
        }
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn hash_file_blocking(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let digest = match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<Sha1, _>(file),
        HashAlgorithm::Md5 => digest_reader::<Md5, _>(file),
    };
    digest.map_err(|e| LauncherError::io(path, e))
}

/// Streams the file through the hasher on the blocking pool.
pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file_blocking(&owned, algorithm))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
}

pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    hash_file(path, HashAlgorithm::Sha1).await
}

/// Compare a file against an expected digest. On mismatch the file is deleted
/// and `ChecksumMismatch` returned.
pub async fn verify_or_remove(
    path: &Path,
    algorithm: HashAlgorithm,
    expected: &str,
) -> LauncherResult<()> {
    let actual = hash_file(path, algorithm).await?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }

    let _ = tokio::fs::remove_file(path).await;
    Err(LauncherError::ChecksumMismatch {
        path: path.to_path_buf(),
        algorithm: algorithm.name(),
        expected: expected.trim().to_string(),
        actual,
    })
}
