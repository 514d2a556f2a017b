pub const DEFAULT_AMI_HOST: &str = "127.0.0.1";
pub const DEFAULT_AMI_PORT: u16 = 5038;
pub const DEFAULT_MANAGER_CONF: &str = "/etc/asterisk/manager.conf";

pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;
pub const MIN_ACTION_TIMEOUT_MS: u64 = 100;
pub const MAX_ACTION_TIMEOUT_MS: u64 = 60_000;

/// Leg listing poll interval while the selector waits for a choice.
pub const SELECT_POLL_MS: u64 = 1_000;

/// Pause between touch-tone digits sent from the dial prompt.
pub const DIGIT_PAUSE_MS: u64 = 100;

pub(super) const LOCAL_HOSTS: &[&str] = &["127.0.0.1", "localhost", "::1"];
pub(super) const MAX_FIELD_BYTES: usize = 256;
