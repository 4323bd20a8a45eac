//! Conversation-driven video branding service: session store, state
//! machine, job pipeline and the Telegram transport adapter.

pub mod pipeline;
pub mod service;
pub mod session;
pub mod telegram;
pub mod telemetry;
pub mod transport;

pub use pipeline::MediaJobPipeline;
pub use service::BrandBot;
pub use session::SessionStore;
pub use transport::{Choice, InboundEvent, Transport, TransportError};
