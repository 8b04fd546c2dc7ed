//! Cache identity and cached artifacts

use pageview_render::{PageBitmap, PageSize, RenderQualityTier, RenderedPage};

/// Identity of a cached page bitmap: page index plus quality tier.
///
/// Keys are only meaningful for the document they were computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub page_index: usize,
    pub tier: RenderQualityTier,
}

impl CacheKey {
    pub fn new(page_index: usize, tier: RenderQualityTier) -> Self {
        Self { page_index, tier }
    }

    pub fn thumbnail(page_index: usize) -> Self {
        Self::new(page_index, RenderQualityTier::Thumbnail)
    }
}

/// A cached page bitmap.
///
/// Entries are immutable; storing a new entry under an existing key replaces
/// the old one wholesale.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bitmap: PageBitmap,

    /// Page size in points
    pub logical_size: PageSize,
}

impl CacheEntry {
    pub fn new(bitmap: PageBitmap, logical_size: PageSize) -> Self {
        Self {
            bitmap,
            logical_size,
        }
    }

    /// Memory held by the bitmap in bytes
    pub fn memory_size(&self) -> usize {
        self.bitmap.byte_size()
    }

    /// Whether both entries share the same bitmap allocation
    pub fn same_bitmap(&self, other: &CacheEntry) -> bool {
        self.bitmap.ptr_eq(&other.bitmap)
    }
}

impl From<RenderedPage> for CacheEntry {
    fn from(page: RenderedPage) -> Self {
        Self::new(page.bitmap, page.logical_size)
    }
}

/// Clipped, whitespace-collapsed text of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    pub page_index: usize,
    pub text: String,
}

impl TextPreview {
    pub fn new(page_index: usize, text: impl Into<String>) -> Self {
        Self {
            page_index,
            text: text.into(),
        }
    }
}
