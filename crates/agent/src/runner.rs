use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage::dto::participant::UploadResult;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::files;
use crate::scanner;
use crate::sender::Uploader;
use crate::state::{AgentState, FileStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub scanned: usize,
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct Agent<U> {
    config: AgentConfig,
    uploader: Arc<U>,
    state: Arc<Mutex<AgentState>>,
}

impl<U: Uploader + 'static> Agent<U> {
    pub async fn new(config: AgentConfig, uploader: U) -> Result<Self> {
        let mut state = AgentState::load(&config.state_file).await?;
        let requeued = state.requeue_interrupted();
        if requeued > 0 {
            tracing::info!("Re-queued {} files interrupted by the last shutdown", requeued);
        }
        tracing::info!(
            "Loaded state for {} files from {}",
            state.files.len(),
            config.state_file.display()
        );

        Ok(Self {
            config,
            uploader: Arc::new(uploader),
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Scan once, upload everything pending concurrently, then persist the state.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let scanned = scanner::scan(&self.config.watch_dir, &self.config.extension).await?;

        let pending = {
            let mut state = self.state.lock().await;
            for file in &scanned {
                let path = file.path.to_string_lossy();
                let known = state.files.contains_key(path.as_ref());
                if state.observe(&path, &file.hash) {
                    if known {
                        tracing::info!("File modified: {}", path);
                    } else {
                        tracing::info!("New file detected: {}", path);
                    }
                }
            }

            let pending = state.pending();
            for path in &pending {
                state.set_status(path, FileStatus::Processing, 0, None);
            }
            pending
        };

        let mut summary = CycleSummary {
            scanned: scanned.len(),
            queued: pending.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for path in pending {
            tasks.spawn(process_file(
                self.uploader.clone(),
                self.state.clone(),
                self.config.clone(),
                path,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FileStatus::Completed) => summary.completed += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    tracing::error!("Upload task panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }

        self.save_state().await?;

        if summary.queued > 0 {
            tracing::info!(
                "Cycle finished: {} scanned, {} uploaded, {} failed",
                summary.scanned,
                summary.completed,
                summary.failed
            );
        } else {
            tracing::debug!("Cycle finished: {} scanned, nothing to upload", summary.scanned);
        }

        Ok(summary)
    }

    pub async fn save_state(&self) -> Result<()> {
        let state = self.state.lock().await;
        state.save(&self.config.state_file).await
    }

    /// Runs cycles every check interval until Ctrl-C, or once with `--once`.
    pub async fn run(&self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::error!("Cycle failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }

            if self.config.once {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval()) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.save_state().await?;
        tracing::info!("State saved to {}", self.config.state_file.display());
        Ok(())
    }
}

async fn process_file<U: Uploader>(
    uploader: Arc<U>,
    state: Arc<Mutex<AgentState>>,
    config: AgentConfig,
    path: String,
) -> FileStatus {
    let source = PathBuf::from(&path);
    let (attempts, outcome) = upload_with_retries(uploader.as_ref(), &source, &config).await;

    let (status, error, dest_dir) = match outcome {
        Ok(result) => {
            tracing::info!(
                event_id = %result.event_id,
                records = result.records_inserted,
                reprocessed = result.reprocessed,
                "Uploaded {}",
                path
            );
            (FileStatus::Completed, None, &config.completed_dir)
        }
        Err(e) => {
            tracing::error!("Giving up on {} after {} attempts: {}", path, attempts, e);
            (FileStatus::Failed, Some(e.to_string()), &config.error_dir)
        }
    };

    match files::move_into(&source, dest_dir).await {
        Ok(dest) => tracing::debug!("Moved {} to {}", path, dest.display()),
        Err(e) => tracing::error!("Failed to move {}: {}", path, e),
    }

    state
        .lock()
        .await
        .set_status(&path, status, attempts.saturating_sub(1), error);

    status
}

async fn upload_with_retries<U: Uploader + ?Sized>(
    uploader: &U,
    path: &Path,
    config: &AgentConfig,
) -> (u32, std::result::Result<UploadResult, AgentError>) {
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match uploader.upload(path).await {
            Ok(result) => return (attempt, Ok(result)),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Upload of {} failed (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                );
                tokio::time::sleep(config.retry_delay()).await;
            }
            Err(e) => return (attempt, Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use clap::Parser;
    use serde_json::json;

    use super::*;

    /// Accepts files whose name contains "good", rejects everything else.
    #[derive(Default)]
    struct FakeUploader {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Uploader for FakeUploader {
        async fn upload(&self, path: &Path) -> Result<UploadResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::metadata(path).await?;

            if path.to_string_lossy().contains("good") {
                Ok(serde_json::from_value(json!({
                    "EventID": "00000000-0000-0000-0000-000000000000",
                    "RecordsInserted": 3,
                    "Reprocessed": false
                }))?)
            } else {
                Err(AgentError::Rejected {
                    status: 400,
                    message: "file hash mismatch".to_string(),
                })
            }
        }
    }

    fn config(root: &Path) -> AgentConfig {
        let dir = |name: &str| root.join(name).to_string_lossy().into_owned();
        AgentConfig::parse_from([
            "racecheck-agent".to_string(),
            "--watch-dir".to_string(),
            dir("watch"),
            "--completed-dir".to_string(),
            dir("completed"),
            "--error-dir".to_string(),
            dir("error"),
            "--state-file".to_string(),
            dir("state.json"),
            "--api-url".to_string(),
            "http://api.test/api".to_string(),
            "--api-key".to_string(),
            "key".to_string(),
            "--max-retries".to_string(),
            "2".to_string(),
            "--retry-delay-secs".to_string(),
            "0".to_string(),
        ])
    }

    #[tokio::test]
    async fn cycle_uploads_moves_and_records_files() {
        let root = tempfile::tempdir().unwrap();
        let watch = root.path().join("watch");
        tokio::fs::create_dir_all(&watch).await.unwrap();
        tokio::fs::write(watch.join("good.racecheck"), b"ok").await.unwrap();
        tokio::fs::write(watch.join("bad.racecheck"), b"nope").await.unwrap();
        tokio::fs::write(watch.join("readme.txt"), b"skip").await.unwrap();

        let agent = Agent::new(config(root.path()), FakeUploader::default())
            .await
            .unwrap();
        let summary = agent.run_cycle().await.unwrap();

        assert_eq!(
            summary,
            CycleSummary {
                scanned: 2,
                queued: 2,
                completed: 1,
                failed: 1
            }
        );
        // one call for the good file, two attempts for the bad one
        assert_eq!(agent.uploader.calls.load(Ordering::SeqCst), 3);

        assert!(root.path().join("completed/good.racecheck").exists());
        assert!(root.path().join("error/bad.racecheck").exists());
        assert!(watch.join("readme.txt").exists());

        let saved = AgentState::load(&root.path().join("state.json")).await.unwrap();
        let bad = &saved.files[&watch.join("bad.racecheck").to_string_lossy().into_owned()];
        assert_eq!(bad.status, FileStatus::Failed);
        assert_eq!(bad.retry_count, 1);
        assert_eq!(bad.error.as_deref(), Some("Upload rejected (400): file hash mismatch"));

        let summary = agent.run_cycle().await.unwrap();
        assert_eq!(summary.queued, 0);
        assert_eq!(agent.uploader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unchanged_file_dropped_again_is_not_resent() {
        let root = tempfile::tempdir().unwrap();
        let watch = root.path().join("watch");
        tokio::fs::create_dir_all(&watch).await.unwrap();
        tokio::fs::write(watch.join("good.racecheck"), b"v1").await.unwrap();

        let agent = Agent::new(config(root.path()), FakeUploader::default())
            .await
            .unwrap();
        agent.run_cycle().await.unwrap();

        tokio::fs::write(watch.join("good.racecheck"), b"v1").await.unwrap();
        assert_eq!(agent.run_cycle().await.unwrap().queued, 0);

        tokio::fs::write(watch.join("good.racecheck"), b"v2").await.unwrap();
        assert_eq!(agent.run_cycle().await.unwrap().completed, 1);
        assert_eq!(agent.uploader.calls.load(Ordering::SeqCst), 2);
    }
}
