// Adapters - External system implementations

pub mod config_file;
pub mod exec_ffmpeg;
pub mod process_runner;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegExecutor;
pub use process_runner::ProcessRunner;
pub use tracing_log::init_tracing;
