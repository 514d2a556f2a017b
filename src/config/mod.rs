//! Command-line parsing and validation helpers.

mod defaults;
mod manager_conf;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_AMI_HOST, DEFAULT_AMI_PORT, DEFAULT_MANAGER_CONF,
    DIGIT_PAUSE_MS, MAX_ACTION_TIMEOUT_MS, MIN_ACTION_TIMEOUT_MS, SELECT_POLL_MS,
};
pub use manager_conf::{read_manager_secret, secret_for_user};

/// CLI options for TTYSpy. Values that end up in AMI headers are validated
/// before a connection is attempted.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "ttyspy",
    about = "TTYSpy: virtual TDD/TTY relay for an active Asterisk channel",
    author,
    version
)]
pub struct AppConfig {
    /// Target channel to converse with. Skips the initial channel selection.
    #[arg(short = 'c', long = "channel")]
    pub channel: Option<String>,

    /// AMI host name
    #[arg(short = 'l', long = "host", env = "TTYSPY_HOST", default_value = DEFAULT_AMI_HOST)]
    pub host: String,

    /// AMI port
    #[arg(long = "port", env = "TTYSPY_PORT", default_value_t = DEFAULT_AMI_PORT)]
    pub port: u16,

    /// AMI username
    #[arg(short = 'u', long = "username", env = "TTYSPY_USERNAME")]
    pub username: Option<String>,

    /// AMI password. Autodetected from the manager config for local connections.
    #[arg(short = 'p', long = "password", env = "TTYSPY_PASSWORD")]
    pub password: Option<String>,

    /// Always refresh the channel list during selection
    #[arg(short = 'r', long = "refresh", default_value_t = false)]
    pub always_refresh: bool,

    /// Manager config used for password autodetection
    #[arg(long = "manager-conf", default_value = DEFAULT_MANAGER_CONF)]
    pub manager_conf: PathBuf,

    /// How long to wait for an AMI action response (milliseconds)
    #[arg(long = "action-timeout-ms", default_value_t = DEFAULT_ACTION_TIMEOUT_MS)]
    pub action_timeout_ms: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "TTYSPY_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", env = "TTYSPY_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow relayed conversation text in the debug log
    #[arg(long = "log-content", env = "TTYSPY_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,
}

impl AppConfig {
    pub fn logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }
}
