//! Conversion orchestration: subtitle staging, two-pass runs, cleanup

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::domain::model::{Encoder, SubtitleBurnMethod, Verbosity};
use crate::error::{ClipperError, ClipperResult};
use crate::planner::plan::ClipPlan;
use crate::ports::ExecutePort;
use crate::utils::path::join_command;

use super::{build_command, subs, CommandContext};

/// Stats files left behind by each two-pass encoder, appended to the stats id
pub fn stats_suffixes(encoder: Encoder) -> &'static [&'static str] {
    match encoder {
        Encoder::X264 => &[".x264-0.log", ".x264-0.log.mbtree"],
        Encoder::X265 => &[".x265", ".x265.cutree"],
        _ => &[],
    }
}

/// What a conversion ran, and how it ended
#[derive(Debug)]
pub struct ConversionReport {
    /// Every ffmpeg command, in execution order
    pub commands: Vec<Vec<String>>,
    /// Absolute output path on success
    pub outcome: ClipperResult<PathBuf>,
    pub elapsed: Duration,
}

impl ConversionReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Build every command for `plan` and run them through `executor`
///
/// In dry-run mode commands are only collected.
pub async fn run_conversion(plan: ClipPlan, executor: &dyn ExecutePort) -> ConversionReport {
    let started = Instant::now();
    let mut commands = Vec::new();
    let mut stats_id = None;
    let dry_run = plan.opts.runtime.dry_run;
    let encoder = plan.encoder();

    let outcome = convert(plan, executor, &mut commands, &mut stats_id).await;

    if let (Some(id), Some(encoder)) = (stats_id, encoder) {
        if !dry_run {
            cleanup_pass_stats(&id, encoder);
        }
    }
    let elapsed = started.elapsed();
    match &outcome {
        Ok(path) => info!(output = %path.display(), ?elapsed, "Conversion finished"),
        Err(e) => warn!(error = %e, "Conversion failed"),
    }
    ConversionReport {
        commands,
        outcome,
        elapsed,
    }
}

async fn convert(
    mut plan: ClipPlan,
    executor: &dyn ExecutePort,
    commands: &mut Vec<Vec<String>>,
    stats_id: &mut Option<String>,
) -> ClipperResult<PathBuf> {
    let verbosity = plan.opts.runtime.verbosity;
    let dry_run = plan.opts.runtime.dry_run;
    ensure_output_parent(&plan.output_path, verbosity)?;

    // Dropped on return, removing the extracted subtitles
    let burn_file: Option<TempPath> = prepare_burn(&mut plan, executor, commands).await?;

    let base = CommandContext::default().burn_file(burn_file.as_deref());
    let main = if plan.is_two_pass() {
        let id: &str = stats_id.insert(new_stats_id());
        let first = build_command(&plan, base.pass(1, id))?;
        run_command(first, executor, commands, verbosity, dry_run).await?;
        build_command(&plan, base.pass(2, id))?
    } else {
        build_command(&plan, base)?
    };
    run_command(main, executor, commands, verbosity, dry_run).await?;

    let output = std::path::absolute(&plan.output_path)?;
    if plan.opts.runtime.open_dir && !dry_run {
        open_directory(&output);
    }
    Ok(output)
}

/// Extract burn-in subtitles when the plan asks for it
///
/// An empty extraction disables burn-in and falls back to subtitle copy rules.
async fn prepare_burn(
    plan: &mut ClipPlan,
    executor: &dyn ExecutePort,
    commands: &mut Vec<Vec<String>>,
) -> ClipperResult<Option<TempPath>> {
    if plan.burn_subtitles.is_none()
        || plan.subtitle_burn_method != Some(SubtitleBurnMethod::Extract)
    {
        return Ok(None);
    }
    let temp = tempfile::Builder::new()
        .prefix("ffclipper-")
        .suffix(".srt")
        .tempfile()?
        .into_temp_path();
    let command = subs::extract_command(plan, &temp);
    let dry_run = plan.opts.runtime.dry_run;
    run_command(command, executor, commands, plan.opts.runtime.verbosity, dry_run).await?;

    if !dry_run && fs::metadata(&temp)?.len() == 0 {
        warn!("Subtitle track appears empty in this time range, skipping subtitle burn-in");
        plan.burn_subtitles = None;
        plan.copy_subtitles = plan.opts.should_copy_subtitles();
        return Ok(None);
    }
    debug!(path = %temp.display(), "Extracted subtitles");
    Ok(Some(temp))
}

async fn run_command(
    command: Vec<String>,
    executor: &dyn ExecutePort,
    commands: &mut Vec<Vec<String>>,
    verbosity: Verbosity,
    dry_run: bool,
) -> ClipperResult<()> {
    commands.push(command.clone());
    if dry_run {
        debug!("Dry run: {}", join_command(&command));
        return Ok(());
    }
    executor.execute(&command, verbosity).await
}

/// Create the output's parent directory when missing
pub fn ensure_output_parent(path: &Path, verbosity: Verbosity) -> ClipperResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.exists() {
        if !parent.is_dir() {
            return Err(ClipperError::OutputError {
                message: format!(
                    "Output directory parent is not a directory: {}",
                    parent.display()
                ),
            });
        }
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|e| ClipperError::OutputError {
        message: format!("Cannot create {}: {}", parent.display(), e),
    })?;
    if verbosity > Verbosity::Quiet {
        info!("Created output directory: {}", parent.display());
    } else {
        debug!("Created output directory: {}", parent.display());
    }
    Ok(())
}

/// Unique base name for two-pass statistics
pub fn new_stats_id() -> String {
    let name = format!(
        "ffclipper-{}-{}",
        chrono::Local::now().format("%Y%m%d%H%M%S%3f"),
        std::process::id()
    );
    // x265-params splits on ':', which a Windows drive prefix would contain
    if cfg!(windows) {
        name
    } else {
        std::env::temp_dir().join(name).to_string_lossy().into_owned()
    }
}

pub fn cleanup_pass_stats(stats_id: &str, encoder: Encoder) {
    for suffix in stats_suffixes(encoder) {
        let path = PathBuf::from(format!("{}{}", stats_id, suffix));
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed pass stats"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove pass stats"),
        }
    }
}

/// Reveal `output` in the platform file manager, ignoring failures
pub fn open_directory(output: &Path) {
    let (tool, args): (&str, Vec<String>) = if cfg!(windows) {
        ("explorer", vec!["/select,".into(), output.display().to_string()])
    } else if cfg!(target_os = "macos") {
        ("open", vec!["-R".into(), output.display().to_string()])
    } else {
        let dir = output.parent().unwrap_or(output);
        ("xdg-open", vec![dir.display().to_string()])
    };
    let Ok(program) = which::which(tool) else {
        debug!(tool, "File manager launcher not found");
        return;
    };
    if let Err(e) = std::process::Command::new(program).args(&args).status() {
        debug!(tool, error = %e, "Could not open file manager");
    }
}
