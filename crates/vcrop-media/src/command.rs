//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of diagnostic stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Log level passed to every invocation; progress is requested separately.
const LOG_LEVEL: &str = "error";

/// Builder for one ffmpeg invocation: `ffmpeg [input args] -i IN [output args] OUT`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Placed before `-i` (seeking, trimming)
    input_args: Vec<String>,
    /// Placed after `-i` (filters, codecs)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    fn input_pair(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.input_args.push(flag.to_string());
        self.input_args.push(value.into());
        self
    }

    fn output_pair(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.output_args.push(flag.to_string());
        self.output_args.push(value.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input-side seek, fast and keyframe-accurate after decoding.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_pair("-ss", format!("{:.3}", seconds))
    }

    /// Limit how much of the input is read.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_pair("-t", format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_pair("-vf", filter)
    }

    /// Write a single video frame.
    pub fn single_frame(self) -> Self {
        self.output_pair("-frames:v", "1")
    }

    /// Full argument list, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let head = ["-y", "-v", LOG_LEVEL, "-progress", "pipe:2", "-nostats"];

        head.iter()
            .map(|s| s.to_string())
            .chain(self.input_args.iter().cloned())
            .chain(["-i".to_string(), self.input.to_string_lossy().into_owned()])
            .chain(self.output_args.iter().cloned())
            .chain(std::iter::once(self.output.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Runner for FFmpeg commands with progress tracking and a timeout.
///
/// Child processes are killed when the run future is dropped, so an aborted
/// request never leaves ffmpeg running.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Kill ffmpeg and fail with [`MediaError::Timeout`] after `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run a command, feeding parsed progress snapshots to `progress_callback`.
    ///
    /// On failure the last non-progress stderr lines become the error diagnostic.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress lines go to the callback; everything else is kept as diagnostics
        let stderr_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                        progress_callback(progress);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let result = self.wait_for_completion(&mut child).await;

        let diagnostic = match stderr_handle.await {
            Ok(text) if !text.is_empty() => Some(text),
            _ => None,
        };

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                diagnostic,
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(timeout_secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout_secs))
            }
        }
    }
}

/// Resolve `ffmpeg` on PATH.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Resolve `ffprobe` on PATH.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_filter("crop=1080:1680:0:120");

        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        let vf = args.iter().position(|a| a == "-vf").unwrap();

        assert_eq!(args[ss + 1], "10.000");
        assert!(ss < input, "seek must precede the input");
        assert!(vf > input, "filters apply to the output");
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_single_frame_args() {
        let args = FfmpegCommand::new("in.mp4", "frame_000.png")
            .seek(1.5)
            .single_frame()
            .build_args();
        assert!(args.windows(2).any(|w| w[0] == "-frames:v" && w[1] == "1"));
        assert_eq!(args[0], "-y");
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg on PATH"]
    async fn test_missing_input_reports_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = FfmpegCommand::new(dir.path().join("missing.mp4"), dir.path().join("out.mp4"));
        let err = FfmpegRunner::new().with_timeout(30).run(&cmd).await.unwrap_err();
        assert!(err.diagnostic().is_some());
    }
}
