//! Configuration module
//!
//! One configuration structure is built from the environment at startup
//! and passed by reference into the logo preparer, the filter-graph
//! builder inputs and the job pipeline. Defaults live here as constants
//! rather than scattered through the code.

use std::env;

// Defaults
const MAX_OUTPUT_SIZE_MB: u64 = 50;
const ENCODE_TIMEOUT_SECS: u64 = 600;
const FETCH_TIMEOUT_SECS: u64 = 300;
const LOGO_MIN_WIDTH_PX: u32 = 50;
const LOGO_WIDTH_FRACTION: f64 = 0.10;
const OVERLAY_MARGIN_PX: u32 = 20;
const WATERMARK_FONT_SIZE: u32 = 24;
const ENCODE_CRF: u32 = 28;
const DEFAULT_WATERMARK_TEXT: &str = "Power by BICP Team";
const DEFAULT_FETCH_FORMAT: &str = "mp4/best";

/// How the video filter is picked when a session reaches the placement
/// stage: uniformly at random from the catalog, or a fixed catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSelection {
    Random,
    Fixed(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Transport credential; only required when running the bot binary.
    pub bot_token: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub ytdlp_path: String,
    pub fetch_format: String,
    pub fetch_timeout_secs: u64,
    pub encode_timeout_secs: u64,
    pub max_output_size_bytes: u64,
    pub logo_min_width_px: u32,
    pub logo_width_fraction: f64,
    pub overlay_margin_px: u32,
    pub watermark_text: String,
    pub watermark_font_size: u32,
    pub filter_selection: FilterSelection,
    /// Optional catalog override parsed from `FILTERS` (`name:graph,...`).
    pub filter_overrides: Option<Vec<(String, String)>>,
    pub video_codec: String,
    pub audio_codec: String,
    pub encode_preset: String,
    pub encode_crf: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            fetch_format: DEFAULT_FETCH_FORMAT.to_string(),
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            encode_timeout_secs: ENCODE_TIMEOUT_SECS,
            max_output_size_bytes: MAX_OUTPUT_SIZE_MB * 1024 * 1024,
            logo_min_width_px: LOGO_MIN_WIDTH_PX,
            logo_width_fraction: LOGO_WIDTH_FRACTION,
            overlay_margin_px: OVERLAY_MARGIN_PX,
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
            watermark_font_size: WATERMARK_FONT_SIZE,
            filter_selection: FilterSelection::Random,
            filter_overrides: None,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            encode_preset: "veryfast".to_string(),
            encode_crf: ENCODE_CRF,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            bot_token: env::var("BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            ytdlp_path: env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            fetch_format: env::var("FETCH_FORMAT").unwrap_or(defaults.fetch_format),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fetch_timeout_secs),
            encode_timeout_secs: env::var("ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.encode_timeout_secs),
            max_output_size_bytes: env::var("MAX_OUTPUT_SIZE_MB")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(MAX_OUTPUT_SIZE_MB)
                * 1024
                * 1024,
            logo_min_width_px: env::var("LOGO_MIN_WIDTH_PX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.logo_min_width_px),
            logo_width_fraction: env::var("LOGO_WIDTH_FRACTION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.logo_width_fraction),
            overlay_margin_px: env::var("OVERLAY_MARGIN_PX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.overlay_margin_px),
            watermark_text: env::var("WATERMARK_TEXT").unwrap_or(defaults.watermark_text),
            watermark_font_size: env::var("WATERMARK_FONT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.watermark_font_size),
            filter_selection: match env::var("FILTER_SELECTION") {
                Ok(s) if s.eq_ignore_ascii_case("random") || s.is_empty() => {
                    FilterSelection::Random
                }
                Ok(name) => FilterSelection::Fixed(name),
                Err(_) => FilterSelection::Random,
            },
            filter_overrides: env::var("FILTERS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_filter_overrides(&s))
                .transpose()?,
            video_codec: env::var("VIDEO_CODEC").unwrap_or(defaults.video_codec),
            audio_codec: env::var("AUDIO_CODEC").unwrap_or(defaults.audio_codec),
            encode_preset: env::var("ENCODE_PRESET").unwrap_or(defaults.encode_preset),
            encode_crf: env::var("ENCODE_CRF")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.encode_crf),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.logo_width_fraction > 0.0 && self.logo_width_fraction <= 1.0) {
            return Err(anyhow::anyhow!(
                "LOGO_WIDTH_FRACTION must be in (0, 1], got {}",
                self.logo_width_fraction
            ));
        }
        if self.logo_min_width_px == 0 {
            return Err(anyhow::anyhow!("LOGO_MIN_WIDTH_PX must be positive"));
        }
        if self.max_output_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_OUTPUT_SIZE_MB must be positive"));
        }
        if self.encode_timeout_secs == 0 {
            return Err(anyhow::anyhow!("ENCODE_TIMEOUT_SECS must be positive"));
        }
        if self.encode_crf > 51 {
            return Err(anyhow::anyhow!(
                "ENCODE_CRF must be between 0 and 51, got {}",
                self.encode_crf
            ));
        }
        if self.watermark_text.trim().is_empty() {
            return Err(anyhow::anyhow!("WATERMARK_TEXT must not be empty"));
        }
        Ok(())
    }

    pub fn max_output_size_mb(&self) -> u64 {
        self.max_output_size_bytes / (1024 * 1024)
    }

    /// Width the logo is resized to for a given probed video width.
    pub fn logo_target_width(&self, video_width: u32) -> u32 {
        let scaled = (video_width as f64 * self.logo_width_fraction).round() as u32;
        scaled.max(self.logo_min_width_px)
    }
}

/// Parse a `name:graph,name:graph` catalog override string.
fn parse_filter_overrides(raw: &str) -> Result<Vec<(String, String)>, anyhow::Error> {
    let mut pairs = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, graph) = entry
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("FILTERS entry '{}' must be 'name:graph'", entry))?;
        let (name, graph) = (name.trim(), graph.trim());
        if name.is_empty() || graph.is_empty() {
            return Err(anyhow::anyhow!(
                "FILTERS entry '{}' has an empty name or graph",
                entry
            ));
        }
        pairs.push((name.to_string(), graph.to_string()));
    }
    if pairs.is_empty() {
        return Err(anyhow::anyhow!("FILTERS was set but contained no entries"));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_validation() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_logo_target_width_fraction_and_floor() {
        let config = Config::default();
        // 1000px * 0.10 = 100px, above the 50px floor
        assert_eq!(config.logo_target_width(1000), 100);
        // 300px * 0.10 = 30px, floor applies
        assert_eq!(config.logo_target_width(300), 50);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut config = Config::default();
        config.logo_width_fraction = 0.0;
        assert!(config.validate().is_err());
        config.logo_width_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_watermark() {
        let mut config = Config::default();
        config.watermark_text = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_filter_overrides() {
        let pairs = parse_filter_overrides("mono:hue=s=0, pop:eq=contrast=1.5").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("mono".to_string(), "hue=s=0".to_string()),
                ("pop".to_string(), "eq=contrast=1.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_filter_overrides_keeps_graph_colons() {
        let pairs = parse_filter_overrides("blur:boxblur=2:1").unwrap();
        assert_eq!(pairs, vec![("blur".to_string(), "boxblur=2:1".to_string())]);
    }

    #[test]
    fn test_parse_filter_overrides_rejects_malformed() {
        assert!(parse_filter_overrides("justaname").is_err());
        assert!(parse_filter_overrides(":nofilter").is_err());
        assert!(parse_filter_overrides("  ,  ").is_err());
    }
}
