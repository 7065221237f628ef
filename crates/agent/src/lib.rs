pub mod config;
pub mod error;
pub mod files;
pub mod runner;
pub mod scanner;
pub mod sender;
pub mod state;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use runner::Agent;
pub use sender::{ResultsClient, Uploader};
