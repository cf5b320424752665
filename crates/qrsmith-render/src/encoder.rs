use thiserror::Error;

use qrsmith_core::{CodeParams, EcLevel};

/// Failures surfaced from the symbol-encoder collaborator. The
/// compositor forwards these to its caller unmodified; it never
/// retries or substitutes output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("input of {len} bytes does not fit at correction level {}", .level.tag())]
    DataTooLong { len: usize, level: EcLevel },

    #[error("encoder backend failed: {0}")]
    Backend(String),
}

/// External collaborator that turns text into a scannable base raster.
///
/// Implementations return bytes decodable into a square drawable image
/// (PNG, or anything the pipeline's [`ImageLoader`] understands),
/// rendered with the requested module colors and error-correction
/// level at `target_size` pixels per side.
///
/// [`ImageLoader`]: crate::raster::ImageLoader
pub trait CodeEncoder {
    fn encode(&self, params: &CodeParams, target_size: u32) -> Result<Vec<u8>, EncodeError>;
}
