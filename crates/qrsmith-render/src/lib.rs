//! # qrsmith Render
//!
//! The raster compositor: decodes the encoder-produced base raster,
//! overlays a user image inside a clipped geometric region, applies a
//! full-canvas effect, and emits one flattened RGBA raster.
//!
//! Pipeline stages run strictly in order (base, then overlay, then
//! effect) with the two image decodes as the only suspension points.
//! Each render owns a fresh canvas; superseded renders still complete,
//! and keeping only the newest output is the caller's concern.

pub mod canvas;
pub mod compositor;
pub mod effects;
pub mod encoder;
pub mod raster;

pub use canvas::{Canvas, ClipScope};
pub use compositor::{Compositor, RenderError};
pub use encoder::{CodeEncoder, EncodeError};
pub use raster::{BytesLoader, ImageLoader, RenderOutput};
