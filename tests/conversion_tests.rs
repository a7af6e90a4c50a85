use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ffclipper::domain::model::{CopyTrim, Encoder, TimeSpec, Verbosity};
use ffclipper::ports::ToolOutput;
use ffclipper::probe::{Capabilities, FfprobeClient, ProbeCache};
use ffclipper::*;

/// A machine with software x264/x265 and an SDR h264 source
struct Workstation;

impl ToolRunner for Workstation {
    fn run(&self, program: &str, args: &[String]) -> ClipperResult<ToolOutput> {
        let has = |v: &str| args.iter().any(|a| a == v);
        let stdout = if has("-version") {
            Some(format!("{} version 6.1\n", program))
        } else if program == "ffmpeg" {
            (has("libx264") || has("libx265")).then(String::new)
        } else if has("format=duration") {
            Some("60.000000\n".to_string())
        } else if has("stream=codec_name") {
            Some("h264\n".to_string())
        } else if has("packet=pts_time,flags") {
            Some("0.000,K_\n4.000,K_\n8.000,K_\n12.000,K_\n".to_string())
        } else {
            None
        };
        Ok(match stdout {
            Some(stdout) => ToolOutput {
                success: true,
                status: Some(0),
                stdout,
                stderr: String::new(),
            },
            None => ToolOutput {
                success: false,
                status: Some(1),
                ..Default::default()
            },
        })
    }
}

#[derive(Default)]
struct Recorder {
    commands: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ExecutePort for Recorder {
    async fn execute(&self, command: &[String], _verbosity: Verbosity) -> ClipperResult<()> {
        self.commands.lock().unwrap().push(command.to_vec());
        Ok(())
    }
}

fn clients() -> (FfprobeClient, Capabilities) {
    let runner: Arc<dyn ToolRunner> = Arc::new(Workstation);
    let cache = Arc::new(ProbeCache::new());
    (
        FfprobeClient::new(runner.clone()).with_cache(cache.clone()),
        Capabilities::new(runner, cache),
    )
}

#[tokio::test]
async fn test_encode_clip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("match.mkv");
    std::fs::write(&source, b"not really video").unwrap();

    let mut opts = ClipOptions::for_source(source.to_string_lossy());
    opts.output = Some(dir.path().join("out").join("goal"));
    opts.time.start = Some(TimeSpec::from_seconds(30.0));
    opts.time.duration = Some(TimeSpec::from_seconds(10.0));
    opts.target_size_mb = Some(8);

    let (probe, caps) = clients();
    let plan = ClipPlan::from_options(opts, &probe, &caps).unwrap();
    assert_eq!(plan.encoder(), Some(Encoder::X264));
    assert!(plan.output_path.ends_with("out/goal.mp4"));

    let recorder = Recorder::default();
    let report = run_conversion(plan, &recorder).await;
    let output = report.outcome.unwrap();
    assert!(output.ends_with("out/goal.mp4"));

    let commands = recorder.commands.into_inner().unwrap();
    assert_eq!(commands.len(), 2);
    let second = commands[1].join(" ");
    assert!(second.contains("-ss 00:00:30.000 -t 00:00:10.000 -i"));
    assert!(second.contains("-c:v libx264"));
    assert!(second.contains("-pass 2"));
    assert!(second.contains("-map_chapters -1"));
    assert!(!second.contains("-avoid_negative_ts"));
}

#[tokio::test]
async fn test_stream_copy_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("match.mkv");
    std::fs::write(&source, b"not really video").unwrap();

    let mut opts = ClipOptions::for_source(source.to_string_lossy());
    opts.video.copy = true;
    opts.audio.copy = true;
    opts.time.start = Some(TimeSpec::from_seconds(5.0));
    opts.time.end = Some(TimeSpec::from_seconds(9.0));
    opts.runtime.dry_run = true;
    opts.runtime.copy_trim = CopyTrim::Keyframe;

    let (probe, caps) = clients();
    let plan = ClipPlan::from_options(opts, &probe, &caps).unwrap();
    assert_eq!(plan.copy_bounds, Some(TrimBounds::new(4.0, 12.0)));

    let recorder = Recorder::default();
    let report = run_conversion(plan, &recorder).await;
    assert!(report.is_success());
    assert!(recorder.commands.lock().unwrap().is_empty());

    let command = report.commands[0].join(" ");
    assert!(command.contains("-seek2any 0 -ss 00:00:04.000 -to 00:00:12.000 -copyts -i"));
    assert!(command.contains("-c:v copy"));
    assert!(command.contains("-tag:v avc1"));
    assert!(command.contains("-avoid_negative_ts make_zero"));
}
