use std::io;
use std::path::{Path, PathBuf};

/// Moves `source` into `dest_dir`, replacing a file of the same name already there.
pub async fn move_into(source: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dest_dir).await?;

    let file_name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
    let dest = dest_dir.join(file_name);

    if tokio::fs::try_exists(&dest).await? {
        tokio::fs::remove_file(&dest).await?;
    }

    if tokio::fs::rename(source, &dest).await.is_err() {
        // rename fails across file systems
        tokio::fs::copy(source, &dest).await?;
        tokio::fs::remove_file(source).await?;
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn moves_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("results.racecheck");
        let dest_dir = dir.path().join("completed");

        tokio::fs::create_dir_all(&dest_dir).await.unwrap();
        tokio::fs::write(dest_dir.join("results.racecheck"), b"old").await.unwrap();
        tokio::fs::write(&source, b"new").await.unwrap();

        let dest = move_into(&source, &dest_dir).await.unwrap();

        assert_eq!(dest, dest_dir.join("results.racecheck"));
        assert!(!source.exists());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn creates_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.racecheck");
        tokio::fs::write(&source, b"x").await.unwrap();

        let dest = move_into(&source, &dir.path().join("error").join("deep"))
            .await
            .unwrap();
        assert!(dest.exists());
    }
}
