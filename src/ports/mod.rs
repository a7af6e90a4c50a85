// Ports - Interface definitions (contracts)

use async_trait::async_trait;

use crate::domain::model::Verbosity;
use crate::error::ClipperResult;
use crate::planner::ProbeWindow;

/// Capability returning ascending keyframe timestamps near a window
///
/// An empty result means "nothing found here"; probe failures are reported
/// the same way so the resolver can widen the window and retry.
pub trait KeyframeProbe {
    fn keyframes(&self, window: ProbeWindow, path: &str) -> Vec<f64>;
}

impl<F> KeyframeProbe for F
where
    F: Fn(ProbeWindow, &str) -> Vec<f64>,
{
    fn keyframes(&self, window: ProbeWindow, path: &str) -> Vec<f64> {
        self(window, path)
    }
}

/// Output captured from a finished external tool
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Port for short, blocking external tool invocations (ffprobe, capability checks)
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` and capture its output
    ///
    /// A non-zero exit is reported through [`ToolOutput::success`]; only a
    /// failure to start the program is an error.
    fn run(&self, program: &str, args: &[String]) -> ClipperResult<ToolOutput>;
}

/// Port for long-running ffmpeg executions
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Run a full command line whose first token is the program
    async fn execute(&self, command: &[String], verbosity: Verbosity) -> ClipperResult<()>;
}
