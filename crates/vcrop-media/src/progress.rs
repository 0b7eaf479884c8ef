//! Parsing of ffmpeg `-progress pipe:2` output.
//!
//! Progress arrives as `key=value` lines, one block per update, each block
//! closed by `progress=continue` or `progress=end`.

/// Snapshot of an encode in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output timestamp reached, in milliseconds
    pub out_time_ms: i64,
    /// Multiple of realtime
    pub speed: f64,
    pub is_complete: bool,
}

/// Whether a stderr line is a progress key/value pair rather than a diagnostic.
pub(crate) fn is_progress_line(line: &str) -> bool {
    line.trim().split_once('=').is_some_and(|(key, _)| {
        !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    })
}

/// Fold one line into `current`; returns a snapshot at the end of each block.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    let value = value.trim();

    match key {
        // Both keys carry microseconds in current ffmpeg builds
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => current.frame = value.parse().unwrap_or(current.frame),
        "fps" => current.fps = value.parse().unwrap_or(current.fps),
        "speed" => {
            current.speed = value
                .strip_suffix('x')
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(current.speed)
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }
    None
}
