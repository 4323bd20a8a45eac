//! ffprobe/ffmpeg service: geometry probing and bounded encoder runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use vidbrand_core::{Config, JobError};

use crate::filtergraph::OUTPUT_LABEL;

/// Maximum stderr tail carried into an encode error message.
const STDERR_TAIL_BYTES: usize = 2048;

/// Probing and encoding capability the job pipeline depends on.
/// `FfmpegService` is the production implementation; tests substitute
/// in-memory stubs.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Pixel width/height of the first video stream.
    async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), JobError>;

    /// Run one encode to `request.output`.
    async fn encode(&self, request: &EncodeRequest) -> Result<(), JobError>;
}

/// One encoder invocation: ordered inputs, one filter-graph expression,
/// explicit codec/quality parameters and a hard deadline.
#[derive(Debug)]
pub struct EncodeRequest {
    pub inputs: Vec<PathBuf>,
    pub filter_graph: String,
    pub output: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u32,
    pub timeout: Duration,
}

impl EncodeRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inputs: Vec::new(),
            filter_graph: String::new(),
            output: PathBuf::new(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            preset: config.encode_preset.clone(),
            crf: config.encode_crf,
            timeout: Duration::from_secs(config.encode_timeout_secs),
        }
    }
}

/// Thin wrapper around the external ffmpeg/ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegService {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegService {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
        }
    }
}

#[async_trait]
impl MediaEncoder for FfmpegService {
    async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), JobError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| JobError::Probe(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(JobError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_dimensions(stdout.trim())
            .ok_or_else(|| JobError::Probe(format!("unparseable ffprobe output '{}'", stdout.trim())))
    }

    /// Run one encode under a deadline. Non-zero exit yields `Encode`
    /// with a stderr tail; exceeding the deadline kills the child and
    /// yields `EncodeTimeout`.
    async fn encode(&self, request: &EncodeRequest) -> Result<(), JobError> {
        let args = encode_args(request);
        tracing::debug!(ffmpeg = %self.ffmpeg_path, ?args, "invoking encoder");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| JobError::Encode(format!("failed to spawn ffmpeg: {e}")))?;

        let stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = match tokio::time::timeout(request.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(JobError::Encode(format!("failed to wait for ffmpeg: {e}")));
            }
            Err(_elapsed) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(JobError::EncodeTimeout {
                    timeout_secs: request.timeout.as_secs(),
                });
            }
        };

        if status.success() {
            Ok(())
        } else {
            let stderr = stderr_task.await.unwrap_or_default();
            Err(JobError::Encode(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr_tail(&stderr)
            )))
        }
    }
}

/// Parse a `WxH` token into two positive integers.
fn parse_dimensions(token: &str) -> Option<(u32, u32)> {
    let (w, h) = token.split_once('x')?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn encode_args(request: &EncodeRequest) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    for input in &request.inputs {
        args.push("-i".to_string());
        args.push(input.display().to_string());
    }
    args.extend([
        "-filter_complex".to_string(),
        request.filter_graph.clone(),
        "-map".to_string(),
        format!("[{OUTPUT_LABEL}]"),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        request.video_codec.clone(),
        "-c:a".to_string(),
        request.audio_codec.clone(),
        "-preset".to_string(),
        request.preset.clone(),
        "-crf".to_string(),
        request.crf.to_string(),
        request.output.display().to_string(),
    ]);
    args
}

/// Last portion of captured stderr, trimmed for error messages.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let start = text.len() - STDERR_TAIL_BYTES;
    // Stay on a char boundary.
    let start = (start..text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(start);
    format!("...{}", &text[start..])
}
