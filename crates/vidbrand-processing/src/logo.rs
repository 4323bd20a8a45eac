//! Logo preparation.
//!
//! `normalize` runs at logo-submission time: decode whatever the user
//! sent, flatten to RGBA and re-encode as PNG so alpha survives into the
//! overlay. `prepare` runs inside the job once the video width is known:
//! scale the normalized raster to a fraction of the video width (with a
//! floor), preserving aspect ratio.
//!
//! A decode, zero-dimension or resize failure is a hard stage failure;
//! there is no silent fallback to the unprocessed image.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};

use vidbrand_core::{Config, JobError, RasterHandle};

/// Logo scaled for one specific video, PNG-encoded with alpha.
#[derive(Debug, Clone)]
pub struct PreparedLogo {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Decode raw image bytes into a normalized RGBA raster handle.
pub fn normalize(data: &[u8]) -> Result<RasterHandle, JobError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| JobError::ImageProcessing(format!("unrecognized image data: {e}")))?;
    let img = reader
        .decode()
        .map_err(|e| JobError::ImageProcessing(format!("decode failed: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(JobError::ImageProcessing(format!(
            "image has zero dimension ({width}x{height})"
        )));
    }

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| JobError::ImageProcessing(format!("PNG encode failed: {e}")))?;

    Ok(RasterHandle {
        png: Bytes::from(buf),
        width,
        height,
    })
}

/// Resize a normalized logo for a video of the probed width.
///
/// Target width is `max(floor, round(video_width * fraction))`; height
/// follows the original aspect ratio.
pub fn prepare(
    handle: &RasterHandle,
    video_width: u32,
    config: &Config,
) -> Result<PreparedLogo, JobError> {
    if handle.width == 0 || handle.height == 0 {
        return Err(JobError::ImageProcessing(
            "logo raster has zero dimension".to_string(),
        ));
    }

    let target_width = config.logo_target_width(video_width);
    let target_height =
        ((target_width as f64) * (handle.height as f64) / (handle.width as f64)).round() as u32;
    let target_height = target_height.max(1);

    let img = ImageReader::with_format(Cursor::new(handle.png.as_ref()), ImageFormat::Png)
        .decode()
        .map_err(|e| JobError::ImageProcessing(format!("raster decode failed: {e}")))?;

    let resized = img.resize_exact(
        target_width,
        target_height,
        image::imageops::FilterType::Lanczos3,
    );

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(resized.to_rgba8())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| JobError::ImageProcessing(format!("PNG encode failed: {e}")))?;

    Ok(PreparedLogo {
        width: target_width,
        height: target_height,
        png: buf,
    })
}
