//! Page rendering against an opaque document engine
//!
//! The document engine is an external collaborator. It is described here by
//! the [`PageSource`] trait: page count, page bounds, a draw primitive, an
//! optional fast thumbnail path and raw page text. [`PageRenderer`] turns a
//! (page, tier) pair into a [`RenderedPage`] using only that interface.

use crate::tier::RenderQualityTier;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Default baseline pixel width that tier scales are applied to
pub const DEFAULT_BASELINE_WIDTH: u32 = 1024;

/// Largest pixel dimension a render buffer may have on either axis
pub const MAX_PIXEL_DIMENSION: u32 = 16_384;

/// Errors produced while rendering a single page
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("page {0} has no bounds")]
    MissingBounds(usize),
    #[error("page {page} has zero-area bounds ({width}x{height})")]
    EmptyBounds { page: usize, width: f32, height: f32 },
    #[error("target size {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("draw failed: {0}")]
    Draw(String),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Logical page size in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A page with no drawable area (zero, negative or NaN on either axis)
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Height divided by width
    pub fn aspect_ratio(&self) -> f32 {
        self.height / self.width
    }
}

/// Pixel dimensions of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Affine transform from page space (points, origin bottom-left) into
/// pixel space (origin top-left).
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl PageTransform {
    pub const IDENTITY: PageTransform = PageTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Scale page space onto `target` and flip the vertical axis so the page
    /// comes out upright regardless of its native origin.
    pub fn flip_and_scale(page: PageSize, target: PixelSize) -> Self {
        let sx = target.width as f32 / page.width;
        let sy = target.height as f32 / page.height;
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: -sy,
            e: 0.0,
            f: target.height as f32,
        }
    }

    /// Apply the transform to a point
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// The document engine consumed by the renderer.
///
/// Implementations must be shareable across render worker threads.
pub trait PageSource: Send + Sync {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Page bounds in points, or `None` if the index is invalid
    fn page_bounds(&self, index: usize) -> Option<PageSize>;

    /// Draw a page into `target` using `transform` (page space to pixels)
    fn draw_page(
        &self,
        index: usize,
        target: &mut RgbaImage,
        transform: &PageTransform,
    ) -> RenderResult<()>;

    /// Optional fast path for small renders
    fn fast_thumbnail(&self, _index: usize, _target: PixelSize) -> Option<RgbaImage> {
        None
    }

    /// Raw page text, or `None` if the page has none or extraction failed
    fn page_text(&self, index: usize) -> Option<String>;
}

/// Immutable, cheaply clonable page bitmap (RGBA, 4 bytes per pixel)
#[derive(Debug, Clone)]
pub struct PageBitmap {
    image: Arc<RgbaImage>,
}

impl PageBitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width(), self.height())
    }

    /// Size of the pixel data in bytes
    pub fn byte_size(&self) -> usize {
        self.image.as_raw().len()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Whether two bitmaps share the same pixel allocation
    pub fn ptr_eq(&self, other: &PageBitmap) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

/// Output of a successful render job
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub bitmap: PageBitmap,

    /// Page size in points
    pub logical_size: PageSize,

    /// Whether the collaborator's fast thumbnail path produced the bitmap
    pub used_fast_path: bool,
}

/// Renders single pages at a quality tier
#[derive(Debug, Clone, Copy)]
pub struct PageRenderer {
    baseline_width: u32,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_WIDTH)
    }
}

impl PageRenderer {
    pub fn new(baseline_width: u32) -> Self {
        Self {
            baseline_width: baseline_width.max(1),
        }
    }

    pub fn baseline_width(&self) -> u32 {
        self.baseline_width
    }

    /// Target pixel size for a page at a tier, preserving aspect ratio
    pub fn target_size(&self, bounds: PageSize, tier: RenderQualityTier) -> PixelSize {
        let width = (self.baseline_width as f32 * tier.scale()).round().max(1.0);
        let height = (width * bounds.aspect_ratio()).round().max(1.0);
        PixelSize::new(width as u32, height as u32)
    }

    /// Render a page.
    ///
    /// Zero-area bounds fail. `Thumbnail` and `Medium` try the fast
    /// thumbnail path first and fall back to a full draw.
    pub fn render(
        &self,
        source: &dyn PageSource,
        index: usize,
        tier: RenderQualityTier,
    ) -> RenderResult<RenderedPage> {
        let page_count = source.page_count();
        if index >= page_count {
            return Err(RenderError::PageOutOfRange {
                page: index,
                page_count,
            });
        }

        let bounds = source
            .page_bounds(index)
            .ok_or(RenderError::MissingBounds(index))?;
        if bounds.is_empty() {
            return Err(RenderError::EmptyBounds {
                page: index,
                width: bounds.width,
                height: bounds.height,
            });
        }

        let target = self.target_size(bounds, tier);
        if target.width > MAX_PIXEL_DIMENSION || target.height > MAX_PIXEL_DIMENSION {
            return Err(RenderError::TooLarge {
                width: target.width,
                height: target.height,
                max: MAX_PIXEL_DIMENSION,
            });
        }

        if tier.allows_fast_path() {
            if let Some(image) = source.fast_thumbnail(index, target) {
                tracing::trace!(page = index, %tier, "fast thumbnail path");
                return Ok(RenderedPage {
                    bitmap: PageBitmap::new(image),
                    logical_size: bounds,
                    used_fast_path: true,
                });
            }
        }

        let mut buffer = RgbaImage::from_pixel(target.width, target.height, Rgba([255, 255, 255, 255]));
        let transform = PageTransform::flip_and_scale(bounds, target);
        source.draw_page(index, &mut buffer, &transform)?;

        Ok(RenderedPage {
            bitmap: PageBitmap::new(buffer),
            logical_size: bounds,
            used_fast_path: false,
        })
    }
}
