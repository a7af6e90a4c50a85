// Unit tests for command assembly and conversion orchestration

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::domain::model::*;
use crate::domain::options::ClipOptions;
use crate::error::ClipperError;
use crate::planner::{BitrateBudget, TrimBounds};
use crate::ports::ExecutePort;
use crate::utils::path::escape_filter_path;

const SOURCE: &str = "/videos/in.mkv";

fn encode_plan(encoder: Encoder) -> ClipPlan {
    let codec = encoder.codec().unwrap();
    let mut opts = ClipOptions::for_source(SOURCE);
    opts.container = Some(Container::Mp4);
    opts.video.encoder = Some(encoder);
    opts.video.codec = Some(codec);
    opts.video.resolution = Some(Resolution::Original);
    opts.target_size_mb = Some(10);
    opts.audio.kbps = Some(128);
    opts.audio.downmix_to_stereo = Some(true);
    ClipPlan {
        opts,
        output_path: PathBuf::from("/out/in_clip.mp4"),
        start_ms: 0,
        duration_ms: None,
        source_duration_s: 100.0,
        need_trim: false,
        effective_seconds: 100.0,
        burn_subtitles: None,
        copy_subtitles: false,
        subtitle_delay_ms: None,
        subtitle_burn_method: None,
        tonemap: None,
        video_codec: Some(codec),
        audio_codec: Some(AudioCodec::Aac),
        audio_budget_kbps: 128,
        video_budget: Some(BitrateBudget::from_kbps(686)),
        copy_bounds: None,
    }
}

fn copy_plan() -> ClipPlan {
    let mut plan = encode_plan(Encoder::X264);
    plan.opts.video.copy = true;
    plan.opts.video.encoder = None;
    plan.opts.video.codec = None;
    plan.opts.audio.copy = true;
    plan.opts.audio.kbps = None;
    plan.opts.audio.downmix_to_stereo = None;
    plan.video_budget = None;
    plan.audio_budget_kbps = 160;
    plan.need_trim = true;
    plan.start_ms = 10_000;
    plan.duration_ms = Some(10_000);
    plan.effective_seconds = 10.0;
    plan
}

fn output(plan: &ClipPlan) -> String {
    plan.output_path.to_string_lossy().into_owned()
}

fn window<'a>(args: &'a [String], flag: &str, len: usize) -> &'a [String] {
    let i = args
        .iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("{} missing from {:?}", flag, args));
    &args[i..i + len]
}

fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    &window(args, flag, 2)[1]
}

#[test]
fn test_x264_second_pass_command() {
    let plan = encode_plan(Encoder::X264);
    let args = build_command(&plan, CommandContext::default().pass(2, "stats")).unwrap();

    let expected = owned(&[
        "ffmpeg", "-y", "-hwaccel", "auto", "-i", SOURCE, "-map", "0:v:0", "-c:v", "libx264",
        "-b:v", "686k", "-maxrate", "686k", "-bufsize", "1372k", "-preset", "slow",
        "-profile:v", "high", "-pix_fmt", "yuv420p", "-pass", "2", "-passlogfile",
        "stats.x264", "-map", "0:a:0", "-c:a", "aac", "-ac", "2", "-b:a", "128k",
        "-movflags", "+faststart", "-tag:v", "avc1",
    ]);
    assert_eq!(&args[..args.len() - 1], expected.as_slice());
    assert_eq!(args.last().unwrap(), &output(&plan));
}

#[test]
fn test_first_pass_discards_output() {
    let plan = encode_plan(Encoder::X264);
    let args = build_command(&plan, CommandContext::default().pass(1, "stats")).unwrap();
    let tail: Vec<&str> = args[args.len() - 4..].iter().map(String::as_str).collect();
    assert_eq!(tail, ["-an", "-f", "mp4", null_device()]);
    assert_eq!(window(&args, "-pass", 2)[1], "1");
    assert!(!args.iter().any(|a| a == "-movflags"));
}

#[test]
fn test_x265_rate_control_goes_through_params() {
    let plan = encode_plan(Encoder::X265);
    let args = build_command(&plan, CommandContext::default().pass(2, "s")).unwrap();
    assert!(!args.iter().any(|a| a == "-maxrate" || a == "-bufsize"));
    assert_eq!(
        value_after(&args, "-x265-params"),
        "pass=2:stats=s.x265:vbv-maxrate=686:vbv-bufsize=1372"
    );
    assert_eq!(value_after(&args, "-tag:v"), "hvc1");
}

#[test]
fn test_nvenc_profiles() {
    let h264 = video::encoder_flags(Encoder::H264Nvenc);
    let hevc = video::encoder_flags(Encoder::HevcNvenc);
    assert_eq!(&h264[..2], ["-preset", "p6"]);
    assert_eq!(&h264[h264.len() - 2..], ["-profile:v", "high"]);
    assert_eq!(&hevc[hevc.len() - 2..], ["-profile:v", "main"]);
    assert!(video::encoder_flags(Encoder::SvtAv1).is_empty());

    let plan = encode_plan(Encoder::HevcNvenc);
    let args = build_command(&plan, CommandContext::default()).unwrap();
    assert!(!args.iter().any(|a| a == "-pass" || a == "-x265-params"));
    assert_eq!(value_after(&args, "-maxrate"), "686k");
}

#[test]
fn test_filter_chain_order() {
    let mut plan = encode_plan(Encoder::H264Nvenc);
    plan.tonemap = Some(Tonemapper::Libplacebo);
    plan.burn_subtitles = Some(1);
    plan.subtitle_burn_method = Some(SubtitleBurnMethod::Inline);
    plan.opts.video.resolution = Some(Resolution::P720);

    let args = build_command(&plan, CommandContext::default()).unwrap();
    assert_eq!(&args[1..7], ["-y", "-hwaccel", "auto", "-init_hw_device", "vulkan", "-i"]);
    assert_eq!(
        value_after(&args, "-vf"),
        format!(
            "{},subtitles='{}':si=1,scale=-2:720",
            video::TONEMAP_LIBPLACEBO,
            escape_filter_path(SOURCE)
        )
    );

    plan.tonemap = Some(Tonemapper::Zscale);
    let args = build_command(&plan, CommandContext::default()).unwrap();
    assert!(!args.iter().any(|a| a == "-init_hw_device"));
    assert!(value_after(&args, "-vf").starts_with("zscale=t=linear"));
}

#[test]
fn test_extract_burn_requires_file() {
    let mut plan = encode_plan(Encoder::X264);
    plan.burn_subtitles = Some(0);
    plan.subtitle_burn_method = Some(SubtitleBurnMethod::Extract);
    assert!(matches!(
        build_command(&plan, CommandContext::default()),
        Err(ClipperError::ConversionFailed { .. })
    ));

    let file = tempfile::Builder::new().suffix(".srt").tempfile().unwrap();
    let ctx = CommandContext::default().burn_file(Some(file.path()));
    let args = build_command(&plan, ctx).unwrap();
    assert_eq!(
        value_after(&args, "-vf"),
        format!("subtitles='{}'", escape_filter_path(&file.path().to_string_lossy()))
    );
}

#[test]
fn test_decode_trim() {
    let mut plan = encode_plan(Encoder::X264);
    plan.need_trim = true;
    plan.start_ms = 65_500;
    plan.duration_ms = Some(10_000);
    let args = build_command(&plan, CommandContext::default()).unwrap();
    assert_eq!(&args[4..9], ["-ss", "00:01:05.500", "-t", "00:00:10.000", "-i"]);
    assert_eq!(value_after(&args, "-map_chapters"), "-1");
}

#[test]
fn test_keyframe_copy_trim() {
    let mut plan = copy_plan();
    plan.copy_bounds = Some(TrimBounds::new(9.9994, 20.0004));
    let args = build_command(&plan, CommandContext::default()).unwrap();

    assert_eq!(
        &args[4..12],
        ["-seek2any", "0", "-ss", "00:00:09.999", "-to", "00:00:20.001", "-copyts", "-i"]
    );
    assert_eq!(window(&args, "-c:v", 2)[1], "copy");
    assert_eq!(window(&args, "-c:a", 2)[1], "copy");
    assert_eq!(value_after(&args, "-tag:v"), "avc1");
    assert_eq!(window(&args, "-avoid_negative_ts", 8), mux::PASSTHROUGH);
    assert!(is_passthrough(&plan));
}

#[test]
fn test_fast_copy_trim() {
    let mut plan = copy_plan();
    plan.opts.runtime.copy_trim = CopyTrim::Fast;
    plan.video_codec = None;
    let args = build_command(&plan, CommandContext::default()).unwrap();

    assert_eq!(&args[4..8], ["-noaccurate_seek", "-ss", "00:00:10.000", "-i"]);
    assert_eq!(&args[9..11], ["-t", "00:00:10.000"]);
    assert!(!is_passthrough(&plan));
    assert!(!args.iter().any(|a| a == "-avoid_negative_ts" || a == "-tag:v"));

    plan.need_trim = false;
    assert!(is_passthrough(&plan));
}

#[test]
fn test_audio_variants() {
    let mut plan = encode_plan(Encoder::X264);
    plan.opts.audio.downmix_to_stereo = Some(false);
    plan.opts.container = Some(Container::Webm);
    assert_eq!(audio::args(&plan, None), ["-map", "0:a:0", "-c:a", "libopus", "-b:a", "128k"]);
    assert_eq!(audio::args(&plan, Some(1)), ["-an"]);

    plan.opts.audio.include = false;
    assert_eq!(audio::args(&plan, None), ["-an"]);
    assert_eq!(audio::copy(), ["-map", "0:a:0", "-c:a", "copy"]);
}

#[test]
fn test_subtitle_copy_codec_follows_container() {
    let mut plan = encode_plan(Encoder::X264);
    assert!(subs::copy_args(&plan).is_empty());

    plan.copy_subtitles = true;
    assert_eq!(subs::copy_args(&plan), ["-map", "0:s?", "-c:s", "mov_text"]);
    plan.opts.container = Some(Container::Mkv);
    assert_eq!(subs::copy_args(&plan), ["-map", "0:s?", "-c:s", "copy"]);
}

#[test]
fn test_extract_command() {
    let mut plan = encode_plan(Encoder::X264);
    plan.burn_subtitles = Some(2);
    plan.subtitle_delay_ms = Some(-1500);
    plan.start_ms = 30_000;
    plan.duration_ms = Some(5_000);

    let cmd = subs::extract_command(&plan, std::path::Path::new("/tmp/cues.srt"));
    let expected = owned(&[
        "ffmpeg", "-y", "-itsoffset", "-1.500", "-ss", "00:00:30.000", "-i", SOURCE, "-ss",
        "0", "-t", "00:00:05.000", "-map", "0:s:2", "-c:s", "copy",
    ]);
    assert_eq!(&cmd[..cmd.len() - 1], expected.as_slice());

    plan.subtitle_delay_ms = Some(0);
    plan.start_ms = 0;
    let cmd = subs::extract_command(&plan, std::path::Path::new("/tmp/cues.srt"));
    assert_eq!(&cmd[..4], ["ffmpeg", "-y", "-i", SOURCE]);
}

/// Records commands; optionally fails a call or writes subtitle cues
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on_call: Option<usize>,
    cues: Option<&'static str>,
}

impl Recorder {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutePort for Recorder {
    async fn execute(&self, command: &[String], _verbosity: Verbosity) -> ClipperResult<()> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(command.to_vec());
            calls.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(ClipperError::ToolFailed {
                tool: "ffmpeg".into(),
                status: "1".into(),
                output: "boom".into(),
            });
        }
        if let (Some(cues), Some(dest)) = (self.cues, command.last()) {
            if dest.ends_with(".srt") {
                std::fs::write(dest, cues)?;
            }
        }
        Ok(())
    }
}

fn plan_in(dir: &tempfile::TempDir, encoder: Encoder) -> ClipPlan {
    let mut plan = encode_plan(encoder);
    plan.output_path = dir.path().join("nested").join("clip.mp4");
    plan
}

#[tokio::test]
async fn test_two_pass_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan_in(&dir, Encoder::X264);
    let recorder = Recorder::default();

    let report = run_conversion(plan, &recorder).await;
    let output = report.outcome.as_ref().unwrap();
    assert_eq!(output, &dir.path().join("nested").join("clip.mp4"));
    assert!(dir.path().join("nested").is_dir());

    assert_eq!(report.commands, recorder.calls());
    assert_eq!(report.commands.len(), 2);
    assert_eq!(report.commands[0].last().unwrap(), null_device());
    assert_eq!(value_after(&report.commands[0], "-pass"), "1");
    assert_eq!(value_after(&report.commands[1], "-pass"), "2");
    assert_eq!(
        value_after(&report.commands[0], "-passlogfile"),
        value_after(&report.commands[1], "-passlogfile")
    );
}

#[tokio::test]
async fn test_single_pass_and_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let report = run_conversion(plan_in(&dir, Encoder::H264Nvenc), &recorder).await;
    assert!(report.is_success());
    assert_eq!(report.commands.len(), 1);

    let recorder = Recorder::default();
    let mut plan = plan_in(&dir, Encoder::X265);
    plan.opts.runtime.dry_run = true;
    let report = run_conversion(plan, &recorder).await;
    assert!(report.is_success());
    assert_eq!(report.commands.len(), 2);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_failed_first_pass_stops() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder {
        fail_on_call: Some(1),
        ..Default::default()
    };
    let report = run_conversion(plan_in(&dir, Encoder::X264), &recorder).await;
    assert!(matches!(report.outcome, Err(ClipperError::ToolFailed { .. })));
    assert_eq!(report.commands.len(), 1);
}

#[tokio::test]
async fn test_output_parent_must_be_directory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let mut plan = encode_plan(Encoder::H264Nvenc);
    plan.output_path = blocker.join("clip.mp4");

    let recorder = Recorder::default();
    let report = run_conversion(plan, &recorder).await;
    assert!(matches!(report.outcome, Err(ClipperError::OutputError { .. })));
    assert!(report.commands.is_empty());
}

fn burn_plan(dir: &tempfile::TempDir) -> ClipPlan {
    let mut plan = plan_in(dir, Encoder::H264Nvenc);
    plan.opts.subtitles.include = true;
    plan.burn_subtitles = Some(1);
    plan.subtitle_burn_method = Some(SubtitleBurnMethod::Extract);
    plan.subtitle_delay_ms = Some(0);
    plan
}

#[tokio::test]
async fn test_extracted_subtitles_are_burned() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder {
        cues: Some("1\n00:00:00,000 --> 00:00:01,000\nhi\n"),
        ..Default::default()
    };
    let report = run_conversion(burn_plan(&dir), &recorder).await;
    assert!(report.is_success());
    assert_eq!(report.commands.len(), 2);

    let extracted = report.commands[0].last().unwrap().clone();
    assert!(extracted.ends_with(".srt"));
    assert_eq!(
        value_after(&report.commands[1], "-vf"),
        format!("subtitles='{}'", escape_filter_path(&extracted))
    );
    assert!(!std::path::Path::new(&extracted).exists());
}

#[tokio::test]
async fn test_empty_extraction_falls_back_to_copy() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let report = run_conversion(burn_plan(&dir), &recorder).await;
    assert!(report.is_success());

    let main = &report.commands[1];
    assert!(!main.iter().any(|a| a == "-vf"));
    assert_eq!(value_after(main, "-c:s"), "mov_text");
}
