//! Conversation service: routes inbound transport events through the
//! session state machine and hands completed sessions to the pipeline.
//!
//! Every handler converts its errors into user messages; nothing
//! propagates past `handle_event`. The pipeline run is synchronous
//! within the user's conversation turn, and the session is removed
//! unconditionally once the job reaches any terminal state.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;

use vidbrand_core::{Config, FilterSelection, Placement, UserId};
use vidbrand_fetch::MediaFetcher;
use vidbrand_processing::{catalog::FilterSpec, logo, FfmpegService, FilterCatalog};

use crate::pipeline::MediaJobPipeline;
use crate::session::SessionStore;
use crate::transport::{Choice, InboundEvent, Transport, TransportError};

const GREETING: &str = "Hi! Send me a video link to get started.";
const ASK_LOGO: &str = "Got the link. Now send the logo as an image.";
const ASK_PLACEMENT: &str = "Where should the logo go?";
const PROCESSING: &str = "Processing your video, this can take a while...";
const UNKNOWN_CHOICE: &str = "Please pick one of the four corners.";

/// The branding bot: session store, pipeline and filter catalog behind
/// one event entry point. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct BrandBot {
    config: Arc<Config>,
    store: SessionStore,
    pipeline: Arc<MediaJobPipeline>,
    catalog: Arc<FilterCatalog>,
    transport: Arc<dyn Transport>,
}

impl BrandBot {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Result<Self> {
        let catalog = FilterCatalog::from_config(config.filter_overrides.as_deref());
        if catalog.is_empty() {
            anyhow::bail!("filter catalog is empty");
        }
        if let FilterSelection::Fixed(name) = &config.filter_selection {
            catalog
                .get(name)
                .with_context(|| format!("FILTER_SELECTION names unknown filter '{}'", name))?;
        }
        let encoder = Arc::new(FfmpegService::new(&config));
        let pipeline = Arc::new(MediaJobPipeline::new(config.clone(), encoder, fetcher));
        Ok(Self {
            config,
            store: SessionStore::new(),
            pipeline,
            catalog: Arc::new(catalog),
            transport,
        })
    }

    /// Handle one inbound event. Never fails: conversation errors become
    /// re-prompts, job errors become failure messages, and transport
    /// send failures are logged.
    pub async fn handle_event(&self, event: InboundEvent) {
        let outcome = match event {
            InboundEvent::Text { user_id, text } => self.on_text(user_id, &text).await,
            InboundEvent::Photo { user_id, bytes } => self.on_photo(user_id, bytes).await,
            InboundEvent::Choice { user_id, token } => self.on_choice(user_id, &token).await,
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "failed to reply to user");
        }
    }

    async fn on_text(&self, user_id: UserId, text: &str) -> Result<(), TransportError> {
        let text = text.trim();
        if text == "/start" {
            return self.transport.send_text(user_id, GREETING).await;
        }

        match self.store.submit_source(user_id, text.to_string()).await {
            Ok(()) => {
                tracing::info!(user_id, "source reference received");
                self.transport.send_text(user_id, ASK_LOGO).await
            }
            Err(e) => self.transport.send_text(user_id, &e.user_message()).await,
        }
    }

    async fn on_photo(&self, user_id: UserId, bytes: Bytes) -> Result<(), TransportError> {
        let raster = match logo::normalize(&bytes) {
            Ok(raster) => raster,
            Err(e) => {
                tracing::warn!(user_id, error_code = e.error_code(), error = %e, "logo rejected");
                return self.transport.send_text(user_id, &e.user_message()).await;
            }
        };

        match self.store.submit_logo(user_id, raster).await {
            Ok(()) => {
                tracing::info!(user_id, "logo received");
                let choices: Vec<Choice> = Placement::ALL
                    .iter()
                    .map(|p| Choice {
                        label: p.label().to_string(),
                        token: p.token().to_string(),
                    })
                    .collect();
                self.transport
                    .send_choice_prompt(user_id, ASK_PLACEMENT, &choices)
                    .await
            }
            Err(e) => self.transport.send_text(user_id, &e.user_message()).await,
        }
    }

    async fn on_choice(&self, user_id: UserId, token: &str) -> Result<(), TransportError> {
        let Some(placement) = Placement::from_token(token) else {
            return self.transport.send_text(user_id, UNKNOWN_CHOICE).await;
        };

        let filter = match self.choose_filter() {
            Ok(filter) => filter,
            Err(e) => {
                // Startup validation makes this unreachable in practice.
                tracing::error!(user_id, error = %e, "filter selection failed");
                self.store.remove(user_id).await;
                return self
                    .transport
                    .send_text(user_id, "Something went wrong on our side. Please try again.")
                    .await;
            }
        };

        let inputs = match self
            .store
            .begin_job(user_id, placement, filter.name.clone())
            .await
        {
            Ok(inputs) => inputs,
            Err(e) => return self.transport.send_text(user_id, &e.user_message()).await,
        };

        // The job proceeds even if the progress note cannot be delivered.
        if let Err(e) = self.transport.send_text(user_id, PROCESSING).await {
            tracing::warn!(user_id, error = %e, "progress message failed");
        }

        let result = self
            .pipeline
            .run(user_id, inputs, &filter, self.transport.as_ref())
            .await;

        // Terminal: the session goes away whatever happened.
        self.store.remove(user_id).await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.transport.send_text(user_id, &e.user_message()).await,
        }
    }

    fn choose_filter(&self) -> Result<FilterSpec> {
        let mut rng = rand::rng();
        self.catalog
            .select(&self.config.filter_selection, &mut rng)
            .cloned()
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }
}
