//! In-memory session store and conversation ordering rules.
//!
//! One entry per user, keyed by the transport's stable user identity.
//! All transitions happen under the write lock, so each per-key update
//! is atomic; there is no cross-user locking. The store is volatile and
//! holds no state across process restart.
//!
//! Ordering is strict: source reference, then logo, then placement. A
//! new source reference restarts an unfinished session in place. While a
//! job is running, all new input for that user is rejected; the running
//! job is never cancelled or orphaned.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use vidbrand_core::error::MissingStep;
use vidbrand_core::{Placement, RasterHandle, Session, SessionError, SessionStage, UserId};

/// Inputs of a completed session, handed to the pipeline when the
/// session transitions to `Running`.
#[derive(Debug, Clone)]
pub struct JobInputs {
    pub source_ref: String,
    pub logo: RasterHandle,
    pub placement: Placement,
    pub filter_name: String,
}

/// Process-wide map from user identity to in-flight session state.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<UserId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source reference, creating the session or restarting an
    /// unfinished one with the new reference.
    pub async fn submit_source(
        &self,
        user_id: UserId,
        source_ref: String,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&user_id) {
            if session.stage == SessionStage::Running {
                return Err(SessionError::JobInProgress);
            }
        }
        sessions.insert(user_id, Session::new(source_ref));
        Ok(())
    }

    /// Attach the normalized logo. Requires an existing session holding
    /// a source reference.
    pub async fn submit_logo(
        &self,
        user_id: UserId,
        logo: RasterHandle,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            None => Err(SessionError::OutOfOrderInput {
                missing: MissingStep::SourceRef,
            }),
            Some(session) if session.stage == SessionStage::Running => {
                Err(SessionError::JobInProgress)
            }
            Some(session) => {
                session.logo = Some(logo);
                session.stage = SessionStage::HasLogo;
                Ok(())
            }
        }
    }

    /// Record placement and chosen filter, transition to `Running` and
    /// return the completed inputs for the pipeline. Requires a session
    /// holding both a source reference and a logo.
    pub async fn begin_job(
        &self,
        user_id: UserId,
        placement: Placement,
        filter_name: String,
    ) -> Result<JobInputs, SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            None => Err(SessionError::OutOfOrderInput {
                missing: MissingStep::SourceRef,
            }),
            Some(session) if session.stage == SessionStage::Running => {
                Err(SessionError::JobInProgress)
            }
            Some(session) if session.stage == SessionStage::HasSource => {
                Err(SessionError::OutOfOrderInput {
                    missing: MissingStep::Logo,
                })
            }
            Some(session) => match session.logo.clone() {
                None => Err(SessionError::OutOfOrderInput {
                    missing: MissingStep::Logo,
                }),
                Some(logo) => {
                    session.placement = Some(placement);
                    session.chosen_filter = Some(filter_name.clone());
                    session.stage = SessionStage::Running;
                    Ok(JobInputs {
                        source_ref: session.source_ref.clone(),
                        logo,
                        placement,
                        filter_name,
                    })
                }
            },
        }
    }

    /// Remove a session unconditionally. Called at every job terminal.
    pub async fn remove(&self, user_id: UserId) {
        self.sessions.write().await.remove(&user_id);
    }

    pub async fn stage_of(&self, user_id: UserId) -> Option<SessionStage> {
        self.sessions.read().await.get(&user_id).map(|s| s.stage)
    }

    pub async fn contains(&self, user_id: UserId) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }
}
