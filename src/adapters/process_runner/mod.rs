//! Blocking process adapter for short tool invocations

use std::process::{Command, Stdio};

use tracing::trace;

use crate::error::{ClipperError, ClipperResult};
use crate::ports::{ToolOutput, ToolRunner};
use crate::probe::capabilities::locate_tool;

/// Runs tools found on `PATH` with `std::process`
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> ClipperResult<ToolOutput> {
        let path = locate_tool(program)?;
        let mut cmd = Command::new(&path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_console_window(&mut cmd);

        let output = cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClipperError::ToolNotFound {
                tool: program.to_string(),
            },
            _ => ClipperError::IoError(e),
        })?;
        trace!(program, status = ?output.status.code(), "Tool finished");

        Ok(ToolOutput {
            success: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Keep child consoles from flashing up on Windows
#[cfg(windows)]
pub(crate) fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    cmd.creation_flags(winapi::um::winbase::CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub(crate) fn hide_console_window(_cmd: &mut Command) {}
