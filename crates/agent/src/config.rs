use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use storage::models::event::DEFAULT_FILE_EXTENSION;

/// Watches a drop directory and pushes new or changed results files to the API.
#[derive(Parser, Debug, Clone)]
#[command(name = "racecheck-agent")]
#[command(about = "RaceCheck results upload agent", long_about = None)]
#[command(version)]
pub struct AgentConfig {
    /// Directory the timing software exports results into
    #[arg(long, env = "WATCH_DIR", default_value = "./watch")]
    pub watch_dir: PathBuf,

    #[arg(long, env = "COMPLETED_DIR", default_value = "./completed")]
    pub completed_dir: PathBuf,

    #[arg(long, env = "ERROR_DIR", default_value = "./error")]
    pub error_dir: PathBuf,

    #[arg(long, env = "STATE_FILE", default_value = "./agent_state.json")]
    pub state_file: PathBuf,

    /// Base URL of the API, e.g. `http://localhost:8080/api`
    #[arg(long, env = "API_URL")]
    pub api_url: String,

    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "RACECHECK_EXTENSION", default_value = DEFAULT_FILE_EXTENSION)]
    pub extension: String,

    #[arg(long, env = "CHECK_INTERVAL_SECS", default_value_t = 30)]
    pub check_interval_secs: u64,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 60)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// Run a single scan and upload cycle, then exit
    #[arg(long)]
    pub once: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl AgentConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}
