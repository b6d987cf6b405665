//! Aspect-fit scaling of embedded photo payloads.
//!
//! Photos arrive as raw uploaded bytes in whatever format the alumnus chose.
//! The fitter decodes them, scales them to the largest size that fits a
//! bounding box without distorting the aspect ratio, and re-encodes an RGB
//! JPEG ready for embedding. Decode problems never surface as errors: call
//! sites decide between placeholder and abort from the returned variant.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Maximum width and height (in points) a fitted image may occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A decoded photo scaled to fit its box, re-encoded for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedImage {
    /// RGB JPEG payload for the page XObject.
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Rendered width in points; never exceeds the box width.
    pub width: f32,
    /// Rendered height in points; never exceeds the box height.
    pub height: f32,
}

/// Outcome of preparing one photo cell.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoCell {
    Image(FittedImage),
    /// No payload stored for this record.
    Absent,
    /// A payload exists but does not decode as an image.
    Malformed,
}

impl PhotoCell {
    /// Placeholder text for cells without a renderable image.
    #[must_use]
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Image(_) => None,
            Self::Absent | Self::Malformed => Some("No Image"),
        }
    }
}

/// Decode an optional photo payload and scale it into `bbox`.
///
/// The tentative size fixes the width to the box width with the height
/// following the source aspect ratio; if that overshoots the box height, the
/// height is fixed instead and the width derived. The source payload is
/// never modified.
#[must_use]
pub fn fit_photo(payload: Option<&[u8]>, bbox: BoundingBox) -> PhotoCell {
    let Some(bytes) = payload.filter(|b| !b.is_empty()) else {
        return PhotoCell::Absent;
    };

    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(err) => {
            debug!(error = %err, "photo payload failed to decode");
            return PhotoCell::Malformed;
        }
    };

    let rgb = decoded.to_rgb8();
    let (pixel_width, pixel_height) = rgb.dimensions();
    if pixel_width == 0 || pixel_height == 0 {
        return PhotoCell::Malformed;
    }

    #[allow(clippy::cast_precision_loss)]
    let aspect = pixel_height as f32 / pixel_width as f32;
    let mut width = bbox.width;
    let mut height = width * aspect;
    if height > bbox.height {
        height = bbox.height;
        width = height / aspect;
    }

    let mut jpeg = Cursor::new(Vec::new());
    if let Err(err) = DynamicImage::ImageRgb8(rgb).write_to(&mut jpeg, ImageFormat::Jpeg) {
        debug!(error = %err, "photo payload failed to re-encode");
        return PhotoCell::Malformed;
    }

    PhotoCell::Image(FittedImage {
        jpeg: jpeg.into_inner(),
        pixel_width,
        pixel_height,
        width,
        height,
    })
}
