use std::io::Cursor;

use image::{imageops, ImageFormat, RgbaImage};

use crate::compositor::RenderError;

/// Asynchronous decode seam of the render pipeline.
///
/// Decoding image bytes into a drawable raster is the pipeline's only
/// I/O-shaped work, so it is the only part expressed as a future; the
/// compositor awaits it once for the base raster and once for the
/// overlay. A loader that never resolves stalls that render
/// indefinitely; there is no internal timeout.
#[allow(async_fn_in_trait)]
pub trait ImageLoader {
    async fn load(&self, bytes: &[u8]) -> Result<RgbaImage, RenderError>;
}

/// Built-in loader: decodes in-memory bytes with the `image` crate.
/// Accepts any format the crate recognizes, at any dimensions or
/// aspect ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesLoader;

impl ImageLoader for BytesLoader {
    async fn load(&self, bytes: &[u8]) -> Result<RgbaImage, RenderError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(decoded.to_rgba8())
    }
}

/// Stretch to exactly `width` x `height`, ignoring the source aspect
/// ratio (non-square overlays are stretched into the square box).
pub(crate) fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, imageops::FilterType::Triangle)
}

/// The flattened result raster of one render: suitable for direct
/// display or PNG export. Nothing is written to disk here.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    image: RgbaImage,
}

impl RenderOutput {
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// PNG-encode the raster for export.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}
