use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Point};

/// Control-point offset ratio for approximating a quarter circle with
/// one cubic Bézier segment.
const KAPPA: f32 = 0.552_284_8;

/// Shape of the clipped region the overlay image is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipShape {
    Circle,
    Square,
    Rounded,
    Diamond,
    Heart,
}

impl Default for ClipShape {
    fn default() -> Self {
        Self::Circle
    }
}

impl ClipShape {
    /// Resolve a selector tag coming from a UI shape picker.
    /// Unrecognized tags fall back to `Circle` rather than erroring.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "circle" => Self::Circle,
            "square" => Self::Square,
            "rounded" => Self::Rounded,
            "diamond" => Self::Diamond,
            "heart" => Self::Heart,
            _ => Self::Circle,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Rounded => "rounded",
            Self::Diamond => "diamond",
            Self::Heart => "heart",
        }
    }
}

/// One segment of a clip contour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic Bézier: control point, then end point.
    QuadTo(Point, Point),
    /// Cubic Bézier: two control points, then end point.
    CubicTo(Point, Point, Point),
    Close,
}

/// A single closed vector contour constraining where overlay drawing is
/// visible.
///
/// Built relative to a bounding box centered in the canvas. With an
/// overlay area fraction of at most 0.5 the contour (including all
/// Bézier control points) lies entirely inside the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPath {
    segments: Vec<PathSegment>,
}

impl ClipPath {
    /// Build the clip contour for `shape` inside a `box_width` x
    /// `box_height` box centered at (`center_x`, `center_y`).
    ///
    /// # Panics
    ///
    /// Panics when either box dimension is non-positive. Upstream
    /// parameter validation makes that unreachable; hitting it is a
    /// caller bug, not a recoverable condition.
    pub fn build(
        shape: ClipShape,
        box_width: f32,
        box_height: f32,
        center_x: f32,
        center_y: f32,
    ) -> Self {
        assert!(
            box_width > 0.0 && box_height > 0.0,
            "clip box must have positive dimensions, got {box_width}x{box_height}"
        );

        let x = center_x - box_width / 2.0;
        let y = center_y - box_height / 2.0;
        let segments = match shape {
            ClipShape::Circle => circle(center_x, center_y, box_width / 2.0),
            ClipShape::Square => square(x, y, box_width, box_height),
            ClipShape::Rounded => rounded(x, y, box_width, box_height, box_width * 0.10),
            ClipShape::Diamond => diamond(x, y, box_width, box_height, center_x, center_y),
            ClipShape::Heart => heart(center_x, center_y, box_width / 2.0),
        };
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// A valid clip region is one contour: a leading `MoveTo`, a
    /// trailing `Close`, and no other `MoveTo` in between.
    pub fn is_closed(&self) -> bool {
        let starts_once = matches!(self.segments.first(), Some(PathSegment::MoveTo(_)))
            && self
                .segments
                .iter()
                .filter(|s| matches!(s, PathSegment::MoveTo(_)))
                .count()
                == 1;
        starts_once && matches!(self.segments.last(), Some(PathSegment::Close))
    }

    /// Bounding box of every on-curve and control point. Since Bézier
    /// curves stay inside their control hull, the contour itself is
    /// contained in this box.
    pub fn bounds(&self) -> BBox {
        let mut points = Vec::new();
        for seg in &self.segments {
            match seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => points.push(*p),
                PathSegment::QuadTo(c, p) => points.extend([*c, *p]),
                PathSegment::CubicTo(c1, c2, p) => points.extend([*c1, *c2, *p]),
                PathSegment::Close => {}
            }
        }
        // A built path always has at least one on-curve point.
        BBox::from_points(&points).unwrap_or(BBox::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0)))
    }
}

// ── Per-shape contour construction ───────────────────────────────────

/// Circle of radius `r`, expressed as four cubic quarter arcs starting
/// at the 3 o'clock position.
fn circle(cx: f32, cy: f32, r: f32) -> Vec<PathSegment> {
    let k = KAPPA * r;
    vec![
        PathSegment::MoveTo(Point::new(cx + r, cy)),
        PathSegment::CubicTo(
            Point::new(cx + r, cy + k),
            Point::new(cx + k, cy + r),
            Point::new(cx, cy + r),
        ),
        PathSegment::CubicTo(
            Point::new(cx - k, cy + r),
            Point::new(cx - r, cy + k),
            Point::new(cx - r, cy),
        ),
        PathSegment::CubicTo(
            Point::new(cx - r, cy - k),
            Point::new(cx - k, cy - r),
            Point::new(cx, cy - r),
        ),
        PathSegment::CubicTo(
            Point::new(cx + k, cy - r),
            Point::new(cx + r, cy - k),
            Point::new(cx + r, cy),
        ),
        PathSegment::Close,
    ]
}

fn square(x: f32, y: f32, w: f32, h: f32) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(Point::new(x, y)),
        PathSegment::LineTo(Point::new(x + w, y)),
        PathSegment::LineTo(Point::new(x + w, y + h)),
        PathSegment::LineTo(Point::new(x, y + h)),
        PathSegment::Close,
    ]
}

/// Rectangle with quadratic corner curves: straight edges joined by one
/// quadratic Bézier per corner, control point at the square corner.
fn rounded(x: f32, y: f32, w: f32, h: f32, r: f32) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(Point::new(x + r, y)),
        PathSegment::LineTo(Point::new(x + w - r, y)),
        PathSegment::QuadTo(Point::new(x + w, y), Point::new(x + w, y + r)),
        PathSegment::LineTo(Point::new(x + w, y + h - r)),
        PathSegment::QuadTo(Point::new(x + w, y + h), Point::new(x + w - r, y + h)),
        PathSegment::LineTo(Point::new(x + r, y + h)),
        PathSegment::QuadTo(Point::new(x, y + h), Point::new(x, y + h - r)),
        PathSegment::LineTo(Point::new(x, y + r)),
        PathSegment::QuadTo(Point::new(x, y), Point::new(x + r, y)),
        PathSegment::Close,
    ]
}

/// Quadrilateral connecting the box edge midpoints: top, right, bottom,
/// left.
fn diamond(x: f32, y: f32, w: f32, h: f32, cx: f32, cy: f32) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(Point::new(cx, y)),
        PathSegment::LineTo(Point::new(x + w, cy)),
        PathSegment::LineTo(Point::new(cx, y + h)),
        PathSegment::LineTo(Point::new(x, cy)),
        PathSegment::Close,
    ]
}

/// Two symmetric cubic lobes meeting at a bottom cusp and a top indent.
/// `s` is half the box width; the 0.3 / 0.5 / 0.1 / 0.7 / 1.0 ratios
/// define the silhouette and must not be changed independently.
fn heart(cx: f32, cy: f32, s: f32) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(Point::new(cx, cy + s * 0.3)),
        PathSegment::CubicTo(
            Point::new(cx + s * 0.5, cy - s * 0.3),
            Point::new(cx + s, cy + s * 0.1),
            Point::new(cx, cy + s * 0.7),
        ),
        PathSegment::CubicTo(
            Point::new(cx - s, cy + s * 0.1),
            Point::new(cx - s * 0.5, cy - s * 0.3),
            Point::new(cx, cy + s * 0.3),
        ),
        PathSegment::Close,
    ]
}
