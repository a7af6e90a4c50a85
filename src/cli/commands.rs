//! Command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::{config_file, FfmpegExecutor, ProcessRunner};
use crate::cli::args::{BudgetArgs, ClipArgs, InspectArgs, KeyframesArgs};
use crate::config::ClipperConfig;
use crate::domain::model::Encoder;
use crate::domain::options::{is_url, DEFAULT_AUDIO_KBPS, DEFAULT_ENCODER};
use crate::engine::run_conversion;
use crate::planner::{reserve_factor, resolve_copy_bounds, BitrateBudget, ClipPlan};
use crate::probe::{ffprobe_keyframe_probe, Capabilities, FfprobeClient, MediaSummary, ProbeCache};
use crate::utils::path::join_command;
use crate::utils::time::{format_time, RoundMode};
use crate::utils::{format_duration, format_file_size};

/// ffprobe client and capability checker sharing one cache
struct Toolbox {
    probe: FfprobeClient,
    caps: Capabilities,
}

impl Toolbox {
    fn new(config: &ClipperConfig) -> Result<Self> {
        let cache = match &config.probe_cache {
            Some(path) => ProbeCache::load(path).unwrap_or_else(|e| {
                warn!("Ignoring probe cache: {}", e);
                ProbeCache::new()
            }),
            None => ProbeCache::new(),
        };
        let cache = Arc::new(cache);
        let runner = Arc::new(ProcessRunner::new());
        Ok(Self {
            probe: FfprobeClient::new(runner.clone())
                .with_cache(cache.clone())
                .with_verbosity(config.verbosity),
            caps: Capabilities::new(runner, cache),
        })
    }

    fn persist(&self, config: &ClipperConfig) {
        if let Some(path) = &config.probe_cache {
            if let Err(e) = self.probe.cache().save(path) {
                warn!("Could not save probe cache: {}", e);
            }
        }
    }
}

/// Execute the clip command
pub async fn clip(args: ClipArgs, config: &ClipperConfig) -> Result<()> {
    info!("Starting clip operation");
    let opts = args.into_options(config);
    info!("Source: {}", opts.source);

    let tools = Toolbox::new(config)?;
    let plan = ClipPlan::from_options(opts, &tools.probe, &tools.caps);
    tools.persist(config);
    let plan = plan.context("Failed to plan clip")?;

    info!(
        "Output: {} ({:.3}s of {:.3}s)",
        plan.output_path.display(),
        plan.effective_seconds,
        plan.source_duration_s
    );
    if let Some(budget) = plan.video_budget {
        info!(
            "Video bitrate {}k (maxrate {}k, bufsize {}k)",
            budget.kbps, budget.maxrate_kbps, budget.bufsize_kbps
        );
    }

    let dry_run = plan.opts.runtime.dry_run;
    let report = run_conversion(plan, &FfmpegExecutor::new()).await;
    if dry_run {
        for command in &report.commands {
            println!("Dry run: {}", join_command(command));
        }
    }
    let output = report.outcome?;

    println!("{}", output.display());
    if !dry_run {
        if let Ok(meta) = std::fs::metadata(&output) {
            info!(
                "Wrote {} in {}",
                format_file_size(meta.len()),
                format_duration(report.elapsed)
            );
        }
    }
    Ok(())
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs, config: &ClipperConfig) -> Result<()> {
    info!("Inspecting: {}", args.source);
    let tools = Toolbox::new(config)?;
    let summary = tools.probe.summarize(&args.source);
    tools.persist(config);
    let summary = summary.context("Failed to inspect source")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &MediaSummary) {
    println!("Source:   {}", summary.source);
    if !is_url(&summary.source) {
        if let Ok(meta) = std::fs::metadata(Path::new(&summary.source)) {
            println!("Size:     {}", format_file_size(meta.len()));
        }
    }
    println!(
        "Duration: {} ({:.3}s)",
        format_duration(Duration::from_secs_f64(summary.duration_s.max(0.0))),
        summary.duration_s
    );

    let video = summary.video_codec.as_deref().unwrap_or("none");
    let hdr = summary.color.as_ref().is_some_and(|c| c.is_hdr());
    println!("Video:    {}{}", video, if hdr { " (HDR)" } else { "" });

    match (&summary.audio_codec, summary.audio_kbps) {
        (Some(codec), Some(kbps)) => println!("Audio:    {} {} kbps", codec, kbps),
        (Some(codec), None) => println!("Audio:    {}", codec),
        _ => println!("Audio:    none"),
    }

    if summary.subtitles.is_empty() {
        println!("Subtitles: none");
    } else {
        println!("Subtitles:");
        for track in &summary.subtitles {
            println!("  {}", track.display);
        }
    }
}

/// Execute the keyframes command
pub fn keyframes(args: KeyframesArgs, config: &ClipperConfig) -> Result<()> {
    let (start_s, end_s) = (args.start.as_seconds(), args.end.as_seconds());
    if end_s <= start_s {
        anyhow::bail!("End time must be after start time");
    }

    let tools = Toolbox::new(config)?;
    tools
        .probe
        .version()
        .context("ffprobe is required to list keyframes")?;
    let probe = ffprobe_keyframe_probe(&tools.probe);
    let bounds = resolve_copy_bounds(&probe, &args.source, start_s, end_s);
    tools.persist(config);

    println!(
        "Requested: {} - {}",
        format_time(start_s, RoundMode::Round),
        format_time(end_s, RoundMode::Round)
    );
    println!(
        "Snapped:   {} - {} ({:.3}s)",
        format_time(bounds.start_s, RoundMode::Floor),
        format_time(bounds.end_s, RoundMode::Ceil),
        bounds.duration_s()
    );
    Ok(())
}

/// Execute the budget command
pub fn budget(args: BudgetArgs, config: &ClipperConfig) -> Result<()> {
    let encoder = args
        .encoder
        .or(config.encoder)
        .filter(|e| *e != Encoder::Auto)
        .unwrap_or(DEFAULT_ENCODER);
    let audio_kbps = args
        .audio_kbps
        .or(config.audio_kbps)
        .unwrap_or(DEFAULT_AUDIO_KBPS);
    let reserve = args.reserve.unwrap_or_else(|| reserve_factor(encoder));
    let target_bytes = args.target_size.saturating_mul(1024 * 1024);

    let budget = BitrateBudget::compute(
        target_bytes,
        args.duration.as_seconds(),
        audio_kbps,
        reserve,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&budget)?);
    } else {
        println!("Video bitrate: {}k", budget.kbps);
        println!("Maxrate:       {}k", budget.maxrate_kbps);
        println!("Bufsize:       {}k", budget.bufsize_kbps);
        println!(
            "Reserve:       {:.2} ({}), audio {} kbps",
            reserve, encoder, audio_kbps
        );
    }
    Ok(())
}

/// Execute the config command
pub fn show_config(config: &ClipperConfig) -> Result<()> {
    print!("{}", config_file::to_toml(config)?);
    Ok(())
}
