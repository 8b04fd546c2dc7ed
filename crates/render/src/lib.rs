//! Pageview Render Library
//!
//! Quality tiers, the document-engine interface and the per-page render
//! algorithm used by the page cache.

pub mod page;
pub mod text;
pub mod tier;

pub use page::{
    PageBitmap, PageRenderer, PageSize, PageSource, PageTransform, PixelSize, RenderError,
    RenderResult, RenderedPage, DEFAULT_BASELINE_WIDTH, MAX_PIXEL_DIMENSION,
};
pub use text::{clip_preview, PREVIEW_MAX_CHARS};
pub use tier::RenderQualityTier;
