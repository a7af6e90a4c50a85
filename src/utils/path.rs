//! Path and command-line text helpers

use std::path::Path;

/// Normalize a path for use inside an ffmpeg filter argument
///
/// Backslashes become forward slashes, then `:` and `'` are escaped so the
/// filter parser reads the path as a single value.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "/")
        .replace(':', r"\:")
        .replace('\'', r"\\'")
}

/// Quote a single argument for display in a shell
pub fn quote_arg(arg: &str, force: bool) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+%,@".contains(c));
    if plain && !force {
        return arg.to_string();
    }
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Render a command for logs and dry runs
///
/// Filter graphs after `-vf` are always quoted.
pub fn join_command<S: AsRef<str>>(command: &[S]) -> String {
    command
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let force = i > 0 && command[i - 1].as_ref() == "-vf";
            quote_arg(part.as_ref(), force)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Null sink used as the output of analysis passes
pub fn null_device() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// File stem as an owned string, empty when the path has none
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
