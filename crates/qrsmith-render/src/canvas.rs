use image::RgbaImage;
use tiny_skia::{FillRule, Mask, Path, PathBuilder, Pixmap, PixmapPaint, Transform};

use qrsmith_core::{ClipPath, PathSegment};

use crate::compositor::RenderError;

/// The single mutable raster for one render.
///
/// Freshly allocated per request and owned exclusively by that render;
/// it is never reused or shared across in-flight renders.
pub struct Canvas {
    pixmap: Pixmap,
    clip: Option<Mask>,
}

impl Canvas {
    /// Allocate a transparent square canvas of `size` x `size` pixels.
    pub fn new(size: u32) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(size, size).ok_or(RenderError::Canvas(size))?;
        Ok(Self { pixmap, clip: None })
    }

    pub fn size(&self) -> u32 {
        self.pixmap.width()
    }

    /// Draw a decoded raster with its top-left corner at (`x`, `y`),
    /// source-over, confined to the active clip region if one is set.
    pub fn draw_raster(&mut self, image: &RgbaImage, x: i32, y: i32) -> Result<(), RenderError> {
        let source = to_pixmap(image)?;
        self.pixmap.draw_pixmap(
            x,
            y,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            self.clip.as_ref(),
        );
        Ok(())
    }

    /// Activate `path` as the clip region for the returned scope.
    ///
    /// The clip is released when the scope drops, so the canvas can
    /// never be left permanently clipped, including on error returns
    /// out of the drawing code.
    pub fn clip(&mut self, path: &ClipPath) -> Result<ClipScope<'_>, RenderError> {
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())
            .ok_or(RenderError::Canvas(self.pixmap.width()))?;
        mask.fill_path(
            &to_skia_path(path)?,
            FillRule::Winding,
            true,
            Transform::identity(),
        );
        self.clip = Some(mask);
        Ok(ClipScope { canvas: self })
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Flatten to a straight-alpha RGBA image.
    pub fn into_image(self) -> RgbaImage {
        from_pixmap(&self.pixmap)
    }
}

/// Drop guard holding the canvas clip; drawing through the scope is
/// confined to the clip region.
pub struct ClipScope<'a> {
    canvas: &'a mut Canvas,
}

impl ClipScope<'_> {
    pub fn draw_raster(&mut self, image: &RgbaImage, x: i32, y: i32) -> Result<(), RenderError> {
        self.canvas.draw_raster(image, x, y)
    }
}

impl Drop for ClipScope<'_> {
    fn drop(&mut self) {
        self.canvas.clip = None;
    }
}

/// Lower a clip contour to a tiny-skia path.
fn to_skia_path(path: &ClipPath) -> Result<Path, RenderError> {
    let mut builder = PathBuilder::new();
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => builder.move_to(p.x, p.y),
            PathSegment::LineTo(p) => builder.line_to(p.x, p.y),
            PathSegment::QuadTo(c, p) => builder.quad_to(c.x, c.y, p.x, p.y),
            PathSegment::CubicTo(c1, c2, p) => {
                builder.cubic_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y)
            }
            PathSegment::Close => builder.close(),
        }
    }
    builder.finish().ok_or(RenderError::Raster("empty clip path"))
}

/// Convert a straight-alpha RGBA image into a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> Result<Pixmap, RenderError> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas(width.max(height)))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Convert a premultiplied pixmap back to straight alpha.
fn from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}
