//! Render quality tiers
//!
//! A page can be rendered at one of a small, closed set of quality levels.
//! Each tier maps to a scale multiplier applied to the baseline pixel width.

use std::fmt;

/// Quality level for a rendered page bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderQualityTier {
    /// Small, fast bitmap used for page lists and prefetching
    Thumbnail,

    /// Bitmap at the baseline width, used for the page being displayed
    Medium,

    /// Oversampled bitmap for zoomed-in or high-density display
    High,
}

impl RenderQualityTier {
    /// All tiers, smallest first
    pub const ALL: [RenderQualityTier; 3] = [
        RenderQualityTier::Thumbnail,
        RenderQualityTier::Medium,
        RenderQualityTier::High,
    ];

    /// Scale multiplier relative to the baseline pixel width
    pub fn scale(&self) -> f32 {
        match self {
            RenderQualityTier::Thumbnail => 0.3,
            RenderQualityTier::Medium => 1.0,
            RenderQualityTier::High => 2.0,
        }
    }

    /// Whether this tier may use the collaborator's fast thumbnail path
    pub fn allows_fast_path(&self) -> bool {
        !matches!(self, RenderQualityTier::High)
    }

    /// Short lowercase name, used in log fields
    pub fn name(&self) -> &'static str {
        match self {
            RenderQualityTier::Thumbnail => "thumbnail",
            RenderQualityTier::Medium => "medium",
            RenderQualityTier::High => "high",
        }
    }
}

impl fmt::Display for RenderQualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
