//! Transport boundary.
//!
//! Inbound user events and outbound replies are abstracted behind one
//! trait so the conversation service and pipeline never see a concrete
//! messaging API. The Telegram adapter lives in [`crate::telegram`];
//! tests use in-memory recorders.

use async_trait::async_trait;
use bytes::Bytes;

use vidbrand_core::UserId;

/// One inbound event from the messaging transport.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Text { user_id: UserId, text: String },
    Photo { user_id: UserId, bytes: Bytes },
    Choice { user_id: UserId, token: String },
}

/// A button in an interactive choice prompt.
#[derive(Debug, Clone)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

/// Delivery failure. Post-encode delivery failures are logged and do not
/// roll back job state.
#[derive(Debug, thiserror::Error)]
#[error("transport delivery failed: {0}")]
pub struct TransportError(pub String);

/// Outbound side of the messaging transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<(), TransportError>;

    async fn send_video(&self, user_id: UserId, video: Bytes) -> Result<(), TransportError>;

    async fn send_choice_prompt(
        &self,
        user_id: UserId,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), TransportError>;
}
