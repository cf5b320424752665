//! # qrsmith Core
//!
//! Parameter model and clip-region geometry for the qrsmith compositor:
//! render requests, shape selectors, closed clip contours, and colors.
//!
//! This crate is pure data and geometry; rasterization lives in
//! `qrsmith-render`.

pub mod color;
pub mod geometry;
pub mod request;
pub mod shape;

pub use color::Rgb;
pub use geometry::{BBox, Point};
pub use request::{CodeParams, EcLevel, EffectKind, RenderRequest, RequestError};
pub use shape::{ClipPath, ClipShape, PathSegment};
