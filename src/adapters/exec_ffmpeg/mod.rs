//! FFmpeg execution adapter
//!
//! Runs ffmpeg on tokio, streaming its stderr line by line and killing the
//! child when the user presses Ctrl-C.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::model::Verbosity;
use crate::error::{ClipperError, ClipperResult};
use crate::ports::ExecutePort;
use crate::probe::capabilities::locate_tool;
use crate::utils::path::join_command;

/// Lines of tool output kept for error reports
const TAIL_LINES: usize = 20;

enum Outcome {
    Exited(ExitStatus),
    Interrupted,
}

/// ffmpeg-backed execution adapter
#[derive(Debug, Default, Clone)]
pub struct FfmpegExecutor;

impl FfmpegExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutePort for FfmpegExecutor {
    async fn execute(&self, command: &[String], verbosity: Verbosity) -> ClipperResult<()> {
        let Some((program, args)) = command.split_first() else {
            return Err(ClipperError::ConversionFailed {
                message: "empty command".to_string(),
            });
        };
        let path = locate_tool(program)?;
        if verbosity >= Verbosity::Commands {
            info!("Running: {}", join_command(command));
        }

        let mut cmd = Command::new(path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(winapi::um::winbase::CREATE_NO_WINDOW);

        let mut child = cmd.spawn()?;
        let stderr = child.stderr.take();
        let echo = verbosity >= Verbosity::Output;
        let reader = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
            if let Some(stderr) = stderr {
                // Read raw bytes so metadata in other encodings cannot stall the pipe
                let mut stderr = BufReader::new(stderr);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match stderr.read_until(b'\n', &mut buf).await {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            debug!("Stopped reading tool output: {}", e);
                            break;
                        }
                    }
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if echo {
                        eprintln!("{}", line);
                    }
                    if tail.len() == TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            Vec::from(tail).join("\n")
        });

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status?),
            _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
        };

        match outcome {
            Outcome::Interrupted => {
                warn!("Interrupted, stopping {}", program);
                child.kill().await?;
                Err(ClipperError::ConversionFailed {
                    message: "interrupted".to_string(),
                })
            }
            Outcome::Exited(status) => {
                let tail = reader.await.unwrap_or_default();
                debug!(program, ?status, "Tool exited");
                if status.success() {
                    Ok(())
                } else {
                    Err(ClipperError::ToolFailed {
                        tool: program.clone(),
                        status: status
                            .code()
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "signal".to_string()),
                        output: tail,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn shell(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_drains_non_utf8_output() {
        let script = "printf 'title: caf\\351\\n' >&2; \
                      i=0; while [ $i -lt 2000 ]; do echo \"frame=$i\" >&2; i=$((i+1)); done; \
                      exit 0";
        let result = FfmpegExecutor::new()
            .execute(&shell(script), Verbosity::Quiet)
            .await;
        assert!(result.is_ok(), "{:?}", result);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_lossy_tail_on_failure() {
        let script = "printf 'title: caf\\351\\n' >&2; echo 'Conversion failed!' >&2; exit 3";
        let err = FfmpegExecutor::new()
            .execute(&shell(script), Verbosity::Quiet)
            .await
            .unwrap_err();
        match err {
            ClipperError::ToolFailed { tool, status, output } => {
                assert_eq!(tool, "sh");
                assert_eq!(status, "3");
                assert!(output.contains("caf\u{FFFD}"), "{}", output);
                assert!(output.ends_with("Conversion failed!"), "{}", output);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_command() {
        let err = FfmpegExecutor::new()
            .execute(&[], Verbosity::Quiet)
            .await
            .unwrap_err();
        assert!(matches!(err, ClipperError::ConversionFailed { .. }));
    }
}
