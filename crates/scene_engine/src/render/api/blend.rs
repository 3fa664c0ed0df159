//! Blend configuration for render units

use crate::foundation::math::Vec4;

/// Weighting applied to a blend operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SourceAlpha,
    /// 1 - source alpha
    OneMinusSourceAlpha,
}

impl BlendFactor {
    fn weight(self, source_alpha: f32) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::One => 1.0,
            Self::SourceAlpha => source_alpha,
            Self::OneMinusSourceAlpha => 1.0 - source_alpha,
        }
    }
}

/// Additive blend equation `src * source + dst * destination`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Factor applied to the incoming fragment
    pub source: BlendFactor,
    /// Factor applied to the framebuffer contents
    pub destination: BlendFactor,
}

impl BlendState {
    /// Create a blend state from its two factors
    pub fn new(source: BlendFactor, destination: BlendFactor) -> Self {
        Self { source, destination }
    }

    /// Standard "source-over" alpha blending
    pub fn source_over() -> Self {
        Self::new(BlendFactor::SourceAlpha, BlendFactor::OneMinusSourceAlpha)
    }

    /// Additive blending for glow-like effects
    pub fn additive() -> Self {
        Self::new(BlendFactor::One, BlendFactor::One)
    }

    /// Blend a fragment over the current framebuffer color
    pub fn apply(&self, source: Vec4, destination: Vec4) -> Vec4 {
        let source_alpha = source.w;
        source * self.source.weight(source_alpha)
            + destination * self.destination.weight(source_alpha)
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::source_over()
    }
}
