pub mod ami;
pub mod app;
pub mod config;
pub mod input;
mod lock;
pub mod relay;
pub mod signals;
mod telemetry;
pub mod terminal_restore;

pub(crate) use lock::lock_or_recover;
pub use app::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use telemetry::{init_tracing, tracing_log_path};
