//! Corner placement resolution.
//!
//! Maps a placement choice plus a margin to the coordinate expressions
//! ffmpeg's `overlay` filter evaluates at encode time. Expressions are
//! written in terms of `main_w`/`main_h` and `overlay_w`/`overlay_h`
//! because the overlay size is only resolved once both streams are open.

use vidbrand_core::Placement;

/// Coordinate expression pair for one overlay position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPosition {
    pub x: String,
    pub y: String,
}

/// Resolve a corner choice and margin to overlay coordinates.
pub fn resolve(placement: Placement, margin: u32) -> OverlayPosition {
    let near = margin.to_string();
    let far_x = format!("main_w-overlay_w-{margin}");
    let far_y = format!("main_h-overlay_h-{margin}");
    let (x, y) = match placement {
        Placement::TopLeft => (near.clone(), near),
        Placement::TopRight => (far_x, near),
        Placement::BottomLeft => (near, far_y),
        Placement::BottomRight => (far_x, far_y),
    };
    OverlayPosition { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_corners_are_distinct() {
        let positions: Vec<OverlayPosition> = Placement::ALL
            .iter()
            .map(|&p| resolve(p, 20))
            .collect();
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_expressions_reference_frame_dimensions() {
        let pos = resolve(Placement::BottomRight, 20);
        assert_eq!(pos.x, "main_w-overlay_w-20");
        assert_eq!(pos.y, "main_h-overlay_h-20");

        let pos = resolve(Placement::TopLeft, 20);
        assert_eq!(pos.x, "20");
        assert_eq!(pos.y, "20");
    }

    #[test]
    fn test_margin_flows_into_expressions() {
        let pos = resolve(Placement::TopRight, 8);
        assert_eq!(pos.x, "main_w-overlay_w-8");
        assert_eq!(pos.y, "8");
    }
}
