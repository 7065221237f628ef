use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileState {
    pub hash: String,
    pub last_update: DateTime<Utc>,
    pub status: FileStatus,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the agent remembers about every file it has seen, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,
}

impl AgentState {
    /// A missing state file means a fresh start.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a sibling temp file, then renamed over `path`.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        Ok(())
    }

    /// Records the current digest of a file. Returns true when the file is new or its
    /// content changed, in which case it is queued for upload.
    pub fn observe(&mut self, path: &str, hash: &str) -> bool {
        if self.files.get(path).is_some_and(|state| state.hash == hash) {
            return false;
        }

        self.files.insert(
            path.to_string(),
            FileState {
                hash: hash.to_string(),
                last_update: Utc::now(),
                status: FileStatus::Pending,
                retry_count: 0,
                error: None,
            },
        );
        true
    }

    pub fn pending(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, state)| state.status == FileStatus::Pending)
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn set_status(&mut self, path: &str, status: FileStatus, retry_count: u32, error: Option<String>) {
        if let Some(state) = self.files.get_mut(path) {
            state.status = status;
            state.retry_count = retry_count;
            state.error = error;
            state.last_update = Utc::now();
        }
    }

    /// Files interrupted mid-upload by a previous shutdown are sent again.
    pub fn requeue_interrupted(&mut self) -> usize {
        let mut requeued = 0;
        for state in self.files.values_mut() {
            if state.status == FileStatus::Processing {
                state.status = FileStatus::Pending;
                requeued += 1;
            }
        }
        requeued
    }
}
