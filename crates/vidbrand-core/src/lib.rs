//! Shared domain types, configuration and error taxonomy for vidbrand.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, FilterSelection};
pub use error::{JobError, SessionError};
pub use models::{Placement, RasterHandle, Session, SessionStage, UserId};
