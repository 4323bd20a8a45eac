//! Domain models: user identity, placement choices, the per-user session
//! and the normalized logo raster handle.

use bytes::Bytes;

/// Opaque, stable user identity handed to us by the transport.
pub type UserId = i64;

/// One of the four corner positions for overlay composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Placement {
    pub const ALL: [Placement; 4] = [
        Placement::TopLeft,
        Placement::TopRight,
        Placement::BottomLeft,
        Placement::BottomRight,
    ];

    /// Stable token used in choice prompts and callback data.
    pub fn token(&self) -> &'static str {
        match self {
            Placement::TopLeft => "top_left",
            Placement::TopRight => "top_right",
            Placement::BottomLeft => "bottom_left",
            Placement::BottomRight => "bottom_right",
        }
    }

    /// Human-readable label for choice prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Placement::TopLeft => "Top left",
            Placement::TopRight => "Top right",
            Placement::BottomLeft => "Bottom left",
            Placement::BottomRight => "Bottom right",
        }
    }

    pub fn from_token(token: &str) -> Option<Placement> {
        Placement::ALL.iter().copied().find(|p| p.token() == token)
    }
}

/// A normalized, ready-to-overlay logo raster: RGBA pixels re-encoded as
/// PNG, with the pre-resize dimensions recorded. Produced by the logo
/// preparer at logo-submission time; resized against the probed video
/// width when the job runs.
#[derive(Debug, Clone)]
pub struct RasterHandle {
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Conversation stage for one user's pending job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    HasSource,
    HasLogo,
    Running,
}

/// Per-user accumulated conversation state for one pending video job.
///
/// Fields populate once per session in strict order: `source_ref`, then
/// `logo`, then `placement`/`chosen_filter`. The store enforces the
/// ordering; a session exists only between "source reference received"
/// and job termination, and is removed unconditionally at terminal.
#[derive(Debug, Clone)]
pub struct Session {
    pub source_ref: String,
    pub logo: Option<RasterHandle>,
    pub placement: Option<Placement>,
    pub chosen_filter: Option<String>,
    pub stage: SessionStage,
}

impl Session {
    pub fn new(source_ref: String) -> Self {
        Self {
            source_ref,
            logo: None,
            placement: None,
            chosen_filter: None,
            stage: SessionStage::HasSource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_tokens_round_trip() {
        for placement in Placement::ALL {
            assert_eq!(Placement::from_token(placement.token()), Some(placement));
        }
        assert_eq!(Placement::from_token("center"), None);
    }

    #[test]
    fn test_new_session_starts_at_has_source() {
        let session = Session::new("https://example.com/v".to_string());
        assert_eq!(session.stage, SessionStage::HasSource);
        assert!(session.logo.is_none());
        assert!(session.placement.is_none());
        assert!(session.chosen_filter.is_none());
    }
}
