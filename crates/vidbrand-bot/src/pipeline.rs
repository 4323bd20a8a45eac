//! Media job pipeline: fetch → probe → prepare logo → encode → size
//! check → deliver, with guaranteed temp cleanup.
//!
//! Stages run strictly sequentially; each external call suspends the
//! job until it returns, bounded by its own timeout. Every failure is
//! a typed `JobError` caught at this boundary; the caller turns it into
//! exactly one user message and removes the session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tempfile::TempDir;
use uuid::Uuid;

use vidbrand_core::{Config, JobError, UserId};
use vidbrand_fetch::MediaFetcher;
use vidbrand_processing::{catalog::FilterSpec, filtergraph::FilterGraph, logo, placement};
use vidbrand_processing::{EncodeRequest, MediaEncoder};

use crate::session::JobInputs;
use crate::transport::Transport;

/// Per-job temporary namespace. The directory name carries the job id,
/// so concurrent jobs never touch each other's files. The pipeline holds
/// exclusive deletion rights: the whole tree is removed exactly once,
/// when this guard drops, on every exit path.
struct JobWorkspace {
    dir: TempDir,
    source: PathBuf,
    logo: PathBuf,
    output: PathBuf,
}

impl JobWorkspace {
    fn create(job_id: Uuid) -> Result<Self, JobError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("vidbrand-{job_id}-"))
            .tempdir()
            .map_err(|e| JobError::Internal(format!("failed to create job workspace: {e}")))?;
        let source = dir.path().join("source.mp4");
        let logo = dir.path().join("logo.png");
        let output = dir.path().join("output.mp4");
        Ok(Self {
            dir,
            source,
            logo,
            output,
        })
    }
}

/// One ephemeral job record, created when a session completes and
/// destroyed at any terminal state.
struct MediaJob {
    job_id: Uuid,
    user_id: UserId,
    started_at: Instant,
}

/// Orchestrates the job stages for one completed session.
pub struct MediaJobPipeline {
    config: Arc<Config>,
    encoder: Arc<dyn MediaEncoder>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl MediaJobPipeline {
    pub fn new(
        config: Arc<Config>,
        encoder: Arc<dyn MediaEncoder>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config,
            encoder,
            fetcher,
        }
    }

    /// Run one job to a terminal state. Returns `Ok` once the output was
    /// encoded and within the size cap; a delivery failure after that
    /// point is logged but does not fail the job.
    pub async fn run(
        &self,
        user_id: UserId,
        inputs: JobInputs,
        filter: &FilterSpec,
        transport: &dyn Transport,
    ) -> Result<(), JobError> {
        let job = MediaJob {
            job_id: Uuid::new_v4(),
            user_id,
            started_at: Instant::now(),
        };
        let workspace = JobWorkspace::create(job.job_id)?;

        let result = self.run_stages(&job, &inputs, filter, &workspace, transport).await;
        match &result {
            Ok(()) => tracing::info!(
                job_id = %job.job_id,
                user_id = job.user_id,
                elapsed_ms = job.started_at.elapsed().as_millis() as u64,
                "job completed"
            ),
            Err(e) => tracing::warn!(
                job_id = %job.job_id,
                user_id = job.user_id,
                error_code = e.error_code(),
                error = %e,
                elapsed_ms = job.started_at.elapsed().as_millis() as u64,
                "job failed"
            ),
        }
        // workspace drops here; all temporary files are removed.
        result
    }

    async fn run_stages(
        &self,
        job: &MediaJob,
        inputs: &JobInputs,
        filter: &FilterSpec,
        workspace: &JobWorkspace,
        transport: &dyn Transport,
    ) -> Result<(), JobError> {
        let job_id = job.job_id;

        tracing::info!(%job_id, source_ref = %inputs.source_ref, "fetching source media");
        self.fetcher
            .fetch(&inputs.source_ref, &workspace.source)
            .await?;

        tracing::info!(%job_id, "probing video geometry");
        let (width, height) = self.encoder.probe_dimensions(&workspace.source).await?;
        tracing::info!(%job_id, width, height, "video geometry probed");

        let prepared = logo::prepare(&inputs.logo, width, &self.config)?;
        tokio::fs::write(&workspace.logo, &prepared.png).await?;
        tracing::info!(
            %job_id,
            logo_width = prepared.width,
            logo_height = prepared.height,
            "logo prepared"
        );

        let graph = FilterGraph::new()
            .filter(&filter.graph)
            .overlay(placement::resolve(
                inputs.placement,
                self.config.overlay_margin_px,
            ))
            .watermark(
                &self.config.watermark_text,
                self.config.watermark_font_size,
                self.config.overlay_margin_px,
            )
            .serialize();

        tracing::info!(%job_id, filter = %filter.name, "encoding");
        let mut request = EncodeRequest::from_config(&self.config);
        request.inputs = vec![workspace.source.clone(), workspace.logo.clone()];
        request.filter_graph = graph;
        request.output = workspace.output.clone();
        self.encoder.encode(&request).await?;

        let size_bytes = tokio::fs::metadata(&workspace.output).await?.len();
        if size_bytes > self.config.max_output_size_bytes {
            return Err(JobError::OutputTooLarge {
                size_bytes,
                limit_bytes: self.config.max_output_size_bytes,
            });
        }

        // Delivery is the transport's responsibility: a failure here is
        // observable but the job itself is done.
        let video = Bytes::from(tokio::fs::read(&workspace.output).await?);
        tracing::info!(%job_id, size_bytes, "delivering output");
        if let Err(e) = transport.send_video(job.user_id, video).await {
            tracing::warn!(%job_id, user_id = job.user_id, error = %e, "delivery failed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use vidbrand_core::Placement;

    use crate::transport::{Choice, TransportError};

    /// Fetcher that materializes a small source file without any network.
    struct StubFetcher;

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn fetch(&self, _source_ref: &str, dest: &Path) -> Result<(), JobError> {
            tokio::fs::write(dest, b"source").await?;
            Ok(())
        }
    }

    /// Encoder that writes an output of a fixed size.
    struct SizedEncoder {
        output_len: usize,
    }

    #[async_trait]
    impl MediaEncoder for SizedEncoder {
        async fn probe_dimensions(&self, _path: &Path) -> Result<(u32, u32), JobError> {
            Ok((1280, 720))
        }

        async fn encode(&self, request: &EncodeRequest) -> Result<(), JobError> {
            tokio::fs::write(&request.output, vec![0u8; self.output_len]).await?;
            Ok(())
        }
    }

    /// Encoder that always exceeds its deadline.
    struct TimeoutEncoder;

    #[async_trait]
    impl MediaEncoder for TimeoutEncoder {
        async fn probe_dimensions(&self, _path: &Path) -> Result<(u32, u32), JobError> {
            Ok((1280, 720))
        }

        async fn encode(&self, _request: &EncodeRequest) -> Result<(), JobError> {
            Err(JobError::EncodeTimeout { timeout_secs: 600 })
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        videos: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_text(&self, _user_id: UserId, _text: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_video(&self, _user_id: UserId, video: Bytes) -> Result<(), TransportError> {
            self.videos.lock().unwrap().push(video.len());
            Ok(())
        }

        async fn send_choice_prompt(
            &self,
            _user_id: UserId,
            _text: &str,
            _choices: &[Choice],
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn job_inputs() -> JobInputs {
        let img = image::RgbaImage::from_pixel(40, 20, image::Rgba([0, 0, 0, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        JobInputs {
            source_ref: "https://example.com/clip".to_string(),
            logo: logo::normalize(&buf).unwrap(),
            placement: Placement::BottomRight,
            filter_name: "grayscale".to_string(),
        }
    }

    fn grayscale() -> FilterSpec {
        FilterSpec {
            name: "grayscale".to_string(),
            graph: "hue=s=0".to_string(),
        }
    }

    fn pipeline_with(encoder: Arc<dyn MediaEncoder>, cap_bytes: u64) -> MediaJobPipeline {
        let mut config = Config::default();
        config.max_output_size_bytes = cap_bytes;
        MediaJobPipeline::new(Arc::new(config), encoder, Arc::new(StubFetcher))
    }

    #[tokio::test]
    async fn test_oversized_output_fails_without_delivery() {
        let transport = RecordingTransport::default();
        let pipeline = pipeline_with(Arc::new(SizedEncoder { output_len: 4096 }), 1024);

        let err = pipeline
            .run(7, job_inputs(), &grayscale(), &transport)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::OutputTooLarge {
                size_bytes: 4096,
                limit_bytes: 1024
            }
        ));
        assert!(transport.videos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_output_within_cap_is_delivered() {
        let transport = RecordingTransport::default();
        let pipeline = pipeline_with(Arc::new(SizedEncoder { output_len: 512 }), 1024);

        pipeline
            .run(7, job_inputs(), &grayscale(), &transport)
            .await
            .unwrap();

        assert_eq!(*transport.videos.lock().unwrap(), vec![512]);
    }

    #[tokio::test]
    async fn test_encode_timeout_propagates_without_delivery() {
        let transport = RecordingTransport::default();
        let pipeline = pipeline_with(Arc::new(TimeoutEncoder), 1024);

        let err = pipeline
            .run(7, job_inputs(), &grayscale(), &transport)
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "ENCODE_TIMEOUT");
        assert!(transport.videos.lock().unwrap().is_empty());
    }

    #[test]
    fn test_workspace_paths_live_under_one_job_directory() {
        let workspace = JobWorkspace::create(Uuid::new_v4()).unwrap();
        assert!(workspace.source.starts_with(workspace.dir.path()));
        assert!(workspace.logo.starts_with(workspace.dir.path()));
        assert!(workspace.output.starts_with(workspace.dir.path()));
    }

    #[test]
    fn test_workspace_name_carries_job_id() {
        let job_id = Uuid::new_v4();
        let workspace = JobWorkspace::create(job_id).unwrap();
        let name = workspace
            .dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert!(name.contains(&job_id.to_string()));
    }

    #[test]
    fn test_workspace_drop_removes_all_files() {
        let workspace = JobWorkspace::create(Uuid::new_v4()).unwrap();
        std::fs::write(&workspace.source, b"video").unwrap();
        std::fs::write(&workspace.logo, b"logo").unwrap();
        std::fs::write(&workspace.output, b"output").unwrap();
        let root = workspace.dir.path().to_path_buf();
        assert!(root.exists());

        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn test_two_workspaces_never_collide() {
        let a = JobWorkspace::create(Uuid::new_v4()).unwrap();
        let b = JobWorkspace::create(Uuid::new_v4()).unwrap();
        assert_ne!(a.dir.path(), b.dir.path());
    }
}
