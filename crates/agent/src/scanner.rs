use std::path::{Path, PathBuf};

use storage::ingest::sha256_hex;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub hash: String,
}

/// True when the file name ends with `extension`, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.to_ascii_lowercase()
                .ends_with(&extension.to_ascii_lowercase())
        })
}

/// Regular files directly inside `dir` carrying the results extension, with their digest.
/// Files that cannot be read are logged and left for the next scan.
pub async fn scan(dir: &Path, extension: &str) -> Result<Vec<ScannedFile>> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !has_extension(&path, extension) {
            continue;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => found.push(ScannedFile {
                hash: sha256_hex(&bytes),
                path,
            }),
            Err(e) => tracing::error!("Failed to hash {}: {}", path.display(), e),
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("/w/Results.RACECHECK"), ".racecheck"));
        assert!(!has_extension(Path::new("/w/results.txt"), ".racecheck"));
        assert!(!has_extension(Path::new("/"), ".racecheck"));
    }

    #[tokio::test]
    async fn finds_only_results_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.racecheck"), b"beta").await.unwrap();
        tokio::fs::write(dir.path().join("a.racecheck"), b"alpha").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"ignored").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub.racecheck")).await.unwrap();

        let files = scan(dir.path(), ".racecheck").await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, dir.path().join("a.racecheck"));
        assert_eq!(files[0].hash, sha256_hex(b"alpha"));
        assert_eq!(files[1].hash, sha256_hex(b"beta"));
    }
}
