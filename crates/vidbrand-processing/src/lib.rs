//! Media transformation building blocks: the filter catalog, placement
//! resolution, filter-graph construction, logo preparation and the
//! ffmpeg/ffprobe service.

pub mod catalog;
pub mod ffmpeg;
pub mod filtergraph;
pub mod logo;
pub mod placement;

pub use catalog::{FilterCatalog, FilterSpec};
pub use ffmpeg::{EncodeRequest, FfmpegService, MediaEncoder};
pub use filtergraph::FilterGraph;
pub use logo::{normalize, prepare, PreparedLogo};
pub use placement::{resolve, OverlayPosition};
