use assert_cmd::Command;
use predicates::prelude::*;

fn ffclipper() -> Command {
    let mut cmd = Command::cargo_bin("ffclipper").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("FFCLIPPER_CONFIG")
        .env_remove("FFCLIPPER_ENCODER")
        .env_remove("FFCLIPPER_AUDIO_KBPS");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    ffclipper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clip"))
        .stdout(predicate::str::contains("budget"))
        .stdout(predicate::str::contains("keyframes"));
}

#[test]
fn test_budget_worked_example() {
    ffclipper()
        .args([
            "budget",
            "--target-size",
            "10",
            "--duration",
            "10",
            "--audio-kbps",
            "128",
            "--reserve",
            "0.95",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Video bitrate: 7841k"))
        .stdout(predicate::str::contains("Bufsize:       15682k"));
}

#[test]
fn test_budget_json_uses_encoder_reserve() {
    ffclipper()
        .args([
            "budget",
            "--target-size",
            "10",
            "-d",
            "10",
            "--audio-kbps",
            "128",
            "--encoder",
            "x264",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kbps\": 8009"));
}

#[test]
fn test_budget_without_room_for_video() {
    ffclipper()
        .args(["budget", "--target-size", "1", "--duration", "1h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("leaves no bitrate budget"));
}

#[test]
fn test_config_reads_file_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ffclipper.yaml");
    std::fs::write(&path, "target_size_mb: 42\ncontainer: webm\n").unwrap();

    ffclipper()
        .args(["--config", path.to_str().unwrap(), "config"])
        .env("FFCLIPPER_ENCODER", "svt-av1")
        .assert()
        .success()
        .stdout(predicate::str::contains("target_size_mb = 42"))
        .stdout(predicate::str::contains("container = \"webm\""))
        .stdout(predicate::str::contains("encoder = \"svt-av1\""));
}

#[test]
fn test_rejects_end_with_duration() {
    ffclipper()
        .args(["clip", "in.mkv", "-e", "10", "-d", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
