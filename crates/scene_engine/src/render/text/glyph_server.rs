//! Glyph services for text rendering
//!
//! A glyph service owns a single-channel atlas and per-character metrics.
//! Glyphs are rasterized from TrueType/OpenType data with `fontdue`, or come
//! from a small builtin face when no font is available. Text billboards share
//! one service by reference; when none is supplied they fall back to
//! [`default_glyph_server`].

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use fontdue::{Font, FontSettings};

use crate::foundation::math::Vec2;
use crate::render::api::{BackendResult, RenderBackend, TextureDescriptor, TextureHandle};

/// Result type for glyph operations
pub type GlyphResult<T> = Result<T, GlyphError>;

/// Errors that can occur while building or exporting a glyph atlas
#[derive(Debug, thiserror::Error)]
pub enum GlyphError {
    /// Font data could not be parsed
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    /// Rasterization size must be positive
    #[error("Invalid font size {0}px")]
    FontSize(f32),

    /// No glyphs were supplied
    #[error("Glyph face is empty")]
    EmptyFace,

    /// Bitmap length does not match its declared size
    #[error("Bitmap for '{ch}' has {actual} bytes, expected {expected}")]
    BitmapSize {
        /// Offending character
        ch: char,
        /// `width * height`
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// The same character was supplied twice
    #[error("Glyph '{0}' supplied more than once")]
    DuplicateGlyph(char),

    /// Writing the atlas image failed
    #[error("Failed to export atlas: {0}")]
    Export(#[from] image::ImageError),

    /// Atlas pixels do not form a valid image
    #[error("Atlas pixel buffer does not match {width}x{height}")]
    AtlasSize {
        /// Atlas width
        width: u32,
        /// Atlas height
        height: u32,
    },
}

/// Information about a single glyph in the atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    /// UV coordinates in atlas texture (normalized 0.0-1.0) - top-left corner
    pub uv_min: Vec2,
    /// UV coordinates in atlas texture (normalized 0.0-1.0) - bottom-right corner
    pub uv_max: Vec2,
    /// Glyph size in pixels
    pub size: Vec2,
    /// Horizontal advance for cursor positioning
    pub advance: f32,
    /// Bearing offset from baseline (x = left, y = bottom)
    pub bearing: Vec2,
}

/// Single-channel coverage image holding every glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphAtlas {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major coverage, one byte per pixel
    pub pixels: Vec<u8>,
}

impl GlyphAtlas {
    /// Coverage at a pixel, zero outside the atlas
    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Rasterized glyph handed to [`GlyphServer::from_bitmaps`]
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    /// Character this bitmap draws
    pub ch: char,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Row-major coverage, top row first
    pub pixels: Vec<u8>,
    /// Horizontal advance in pixels
    pub advance: f32,
    /// Offset of the bitmap's bottom-left corner from the pen position
    pub bearing: Vec2,
}

/// Read-only provider of a glyph atlas and glyph metrics
///
/// Implementations are shared between nodes and, for the default service,
/// between threads, hence the `Send + Sync` bound.
pub trait GlyphService: Send + Sync + fmt::Debug {
    /// Key identifying the atlas contents
    fn atlas_key(&self) -> u64;

    /// Texture holding the atlas on `backend`; bound to the `glyphTexture` uniform
    ///
    /// Every node sharing a service gets the same texture from a backend.
    ///
    /// # Errors
    /// The backend's error when the upload fails.
    fn acquire_texture(&self, backend: &mut dyn RenderBackend) -> BackendResult<TextureHandle> {
        let atlas = self.atlas();
        backend.acquire_texture(&TextureDescriptor {
            label: "glyph_atlas",
            key: self.atlas_key(),
            width: atlas.width,
            height: atlas.height,
            pixels: &atlas.pixels,
        })
    }

    /// Metrics for a character, `None` when the face does not cover it
    fn glyph(&self, ch: char) -> Option<&GlyphInfo>;

    /// Atlas pixels backing the texture
    fn atlas(&self) -> &GlyphAtlas;

    /// Distance between baselines in pixels
    fn line_height(&self) -> f32;
}

/// Whether two service references point at the same instance
pub fn same_service(a: &Arc<dyn GlyphService>, b: &Arc<dyn GlyphService>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

const GLYPHS_PER_ROW: u32 = 16;
const CELL_PADDING: u32 = 1;

const ASCII_FIRST: u32 = 32; // Space character
const ASCII_LAST: u32 = 126; // Tilde character
const BUILTIN_WIDTH: u32 = 6;
const BUILTIN_HEIGHT: u32 = 10;
const BUILTIN_ADVANCE: f32 = 8.0;
const BUILTIN_LINE_HEIGHT: f32 = 12.0;

/// Glyph atlas packed on a fixed grid
pub struct GlyphServer {
    key: u64,
    atlas: GlyphAtlas,
    glyphs: HashMap<char, GlyphInfo>,
    line_height: f32,
}

impl fmt::Debug for GlyphServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphServer")
            .field("key", &format_args!("{:016x}", self.key))
            .field("atlas", &(self.atlas.width, self.atlas.height))
            .field("glyphs", &self.glyphs.len())
            .field("line_height", &self.line_height)
            .finish()
    }
}

impl GlyphServer {
    /// Pack rasterized glyphs into a new atlas
    ///
    /// Glyphs are laid out on a grid of 16 cells per row, each cell as large
    /// as the largest bitmap plus one pixel of padding.
    ///
    /// # Errors
    /// [`GlyphError::EmptyFace`] for an empty list, [`GlyphError::BitmapSize`]
    /// when a bitmap length is inconsistent, [`GlyphError::DuplicateGlyph`]
    /// when a character repeats.
    pub fn from_bitmaps(bitmaps: Vec<GlyphBitmap>, line_height: f32) -> GlyphResult<Self> {
        if bitmaps.is_empty() {
            return Err(GlyphError::EmptyFace);
        }

        let mut seen = std::collections::HashSet::with_capacity(bitmaps.len());
        for bitmap in &bitmaps {
            let expected = (bitmap.width * bitmap.height) as usize;
            if bitmap.pixels.len() != expected {
                return Err(GlyphError::BitmapSize {
                    ch: bitmap.ch,
                    expected,
                    actual: bitmap.pixels.len(),
                });
            }
            if !seen.insert(bitmap.ch) {
                return Err(GlyphError::DuplicateGlyph(bitmap.ch));
            }
        }

        Ok(Self::pack(&bitmaps, line_height))
    }

    /// Rasterize printable ASCII from TrueType/OpenType font data
    ///
    /// # Arguments
    ///
    /// * `font_data` - Raw font file bytes (TTF or OTF format)
    /// * `px_size` - Size in pixels to rasterize glyphs
    ///
    /// # Errors
    /// [`GlyphError::FontSize`] for a non-positive size,
    /// [`GlyphError::FontLoad`] when `fontdue` rejects the data.
    pub fn from_font_bytes(font_data: &[u8], px_size: f32) -> GlyphResult<Self> {
        if !(px_size > 0.0 && px_size.is_finite()) {
            return Err(GlyphError::FontSize(px_size));
        }
        let font = Font::from_bytes(font_data, FontSettings { scale: px_size, ..FontSettings::default() })
            .map_err(|e| GlyphError::FontLoad(format!("fontdue error: {e}")))?;

        let bitmaps: Vec<GlyphBitmap> = (ASCII_FIRST..=ASCII_LAST)
            .filter_map(char::from_u32)
            .map(|ch| {
                let (metrics, pixels) = font.rasterize(ch, px_size);
                GlyphBitmap {
                    ch,
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    pixels,
                    advance: metrics.advance_width,
                    bearing: Vec2::new(metrics.xmin as f32, metrics.ymin as f32),
                }
            })
            .collect();

        let line_height = font
            .horizontal_line_metrics(px_size)
            .map_or(px_size * 1.2, |metrics| metrics.new_line_size);
        log::info!("Rasterized {} glyphs at {}px", bitmaps.len(), px_size);
        Self::from_bitmaps(bitmaps, line_height)
    }

    /// Load a font file and rasterize it, see [`from_font_bytes`](Self::from_font_bytes)
    ///
    /// # Errors
    /// [`GlyphError::FontLoad`] when the file cannot be read or parsed.
    pub fn from_font_file(path: impl AsRef<Path>, px_size: f32) -> GlyphResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| GlyphError::FontLoad(format!("{}: {e}", path.display())))?;
        Self::from_font_bytes(&bytes, px_size)
    }

    /// Fallback monospace block face covering printable ASCII
    ///
    /// Each glyph is a framed 6x10 block with a per-character interior
    /// pattern. Used by the default service when no font was installed.
    pub fn builtin() -> Self {
        let bitmaps: Vec<GlyphBitmap> = (ASCII_FIRST..=ASCII_LAST)
            .filter_map(char::from_u32)
            .map(builtin_glyph)
            .collect();
        Self::pack(&bitmaps, BUILTIN_LINE_HEIGHT)
    }

    fn pack(bitmaps: &[GlyphBitmap], line_height: f32) -> Self {
        let max_width = bitmaps.iter().map(|b| b.width).max().unwrap_or(0);
        let max_height = bitmaps.iter().map(|b| b.height).max().unwrap_or(0);
        let cell_width = max_width + CELL_PADDING;
        let cell_height = max_height + CELL_PADDING;

        let count = bitmaps.len() as u32;
        let rows = count.div_ceil(GLYPHS_PER_ROW).max(1);
        let atlas_width = (cell_width * GLYPHS_PER_ROW.min(count.max(1))).max(1);
        let atlas_height = (cell_height * rows).max(1);

        let mut pixels = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::with_capacity(bitmaps.len());

        for (index, bitmap) in bitmaps.iter().enumerate() {
            let index = index as u32;
            let cell_x = (index % GLYPHS_PER_ROW) * cell_width;
            let cell_y = (index / GLYPHS_PER_ROW) * cell_height;

            for y in 0..bitmap.height {
                let src = (y * bitmap.width) as usize;
                let dst = ((cell_y + y) * atlas_width + cell_x) as usize;
                let row = &bitmap.pixels[src..src + bitmap.width as usize];
                pixels[dst..dst + row.len()].copy_from_slice(row);
            }

            let uv_min = Vec2::new(
                cell_x as f32 / atlas_width as f32,
                cell_y as f32 / atlas_height as f32,
            );
            let uv_max = Vec2::new(
                (cell_x + bitmap.width) as f32 / atlas_width as f32,
                (cell_y + bitmap.height) as f32 / atlas_height as f32,
            );

            glyphs.insert(bitmap.ch, GlyphInfo {
                uv_min,
                uv_max,
                size: Vec2::new(bitmap.width as f32, bitmap.height as f32),
                advance: bitmap.advance,
                bearing: bitmap.bearing,
            });
        }

        let mut hasher = DefaultHasher::new();
        (atlas_width, atlas_height).hash(&mut hasher);
        pixels.hash(&mut hasher);
        let key = hasher.finish();
        log::info!(
            "Glyph atlas packed: {}x{}, {} glyphs, key {:016x}",
            atlas_width,
            atlas_height,
            glyphs.len(),
            key
        );

        Self {
            key,
            atlas: GlyphAtlas { width: atlas_width, height: atlas_height, pixels },
            glyphs,
            line_height,
        }
    }

    /// Number of glyphs in the face
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Save atlas texture to a PNG file for debugging
    ///
    /// # Errors
    /// [`GlyphError::Export`] when the file cannot be written.
    pub fn save_atlas_png(&self, path: impl AsRef<Path>) -> GlyphResult<()> {
        let GlyphAtlas { width, height, pixels } = &self.atlas;
        let image = image::GrayImage::from_raw(*width, *height, pixels.clone())
            .ok_or(GlyphError::AtlasSize { width: *width, height: *height })?;
        image.save(path.as_ref())?;
        log::debug!("Glyph atlas written to {}", path.as_ref().display());
        Ok(())
    }
}

impl GlyphService for GlyphServer {
    fn atlas_key(&self) -> u64 {
        self.key
    }

    fn glyph(&self, ch: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&ch)
    }

    fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

fn builtin_glyph(ch: char) -> GlyphBitmap {
    // Whitespace only advances the pen
    let (width, height) = if ch.is_whitespace() { (0, 0) } else { (BUILTIN_WIDTH, BUILTIN_HEIGHT) };
    let code = ch as u32;
    let mut pixels = vec![0u8; (width * height) as usize];

    for y in 0..height {
        for x in 0..width {
            let frame = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            let pattern = (code >> ((x + y) % 7)) & 1 == 1;
            if frame || pattern {
                pixels[(y * width + x) as usize] = 255;
            }
        }
    }

    GlyphBitmap {
        ch,
        width,
        height,
        pixels,
        advance: BUILTIN_ADVANCE,
        bearing: Vec2::new(1.0, 0.0),
    }
}

static DEFAULT_GLYPH_SERVER: OnceLock<Arc<GlyphServer>> = OnceLock::new();

/// Process-wide glyph server shared by nodes created without one
///
/// The server installed with [`install_default_glyph_server`], or the
/// [`GlyphServer::builtin`] face when nothing was installed before first use.
/// Never torn down.
pub fn default_glyph_server() -> Arc<GlyphServer> {
    DEFAULT_GLYPH_SERVER
        .get_or_init(|| {
            log::debug!("No default glyph server installed, using the builtin face");
            Arc::new(GlyphServer::builtin())
        })
        .clone()
}

/// Make `server` the process-wide default
///
/// Only possible before the default is first used. On failure the rejected
/// server is handed back.
///
/// # Errors
/// The server passed in, when a default already exists.
pub fn install_default_glyph_server(server: Arc<GlyphServer>) -> Result<(), Arc<GlyphServer>> {
    DEFAULT_GLYPH_SERVER.set(server)?;
    log::info!("Default glyph server installed");
    Ok(())
}

/// [`default_glyph_server`] as a trait object
pub fn default_glyph_service() -> Arc<dyn GlyphService> {
    default_glyph_server()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingBackend;

    fn bitmap(ch: char, width: u32, height: u32) -> GlyphBitmap {
        GlyphBitmap {
            ch,
            width,
            height,
            pixels: vec![200; (width * height) as usize],
            advance: width as f32 + 1.0,
            bearing: Vec2::zeros(),
        }
    }

    #[test]
    fn test_builtin_covers_printable_ascii() {
        let server = GlyphServer::builtin();
        assert_eq!(server.glyph_count(), 95);
        assert!(server.glyph('A').is_some());
        assert!(server.glyph('~').is_some());
        assert!(server.glyph('\n').is_none());
    }

    #[test]
    fn test_packed_glyph_pixels_land_at_uv_rect() {
        let server = GlyphServer::from_bitmaps(vec![bitmap('a', 3, 4), bitmap('b', 2, 2)], 6.0)
            .expect("valid face");
        let atlas = server.atlas();

        let info = server.glyph('b').copied().expect("glyph b");
        let x = (info.uv_min.x * atlas.width as f32).round() as u32;
        let y = (info.uv_min.y * atlas.height as f32).round() as u32;
        assert_eq!(atlas.coverage(x, y), 200);
        assert_eq!(atlas.coverage(x + 2, y), 0);
        assert_eq!(info.size, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_bad_bitmaps_are_rejected() {
        let mut short = bitmap('x', 2, 2);
        short.pixels.pop();
        assert!(matches!(
            GlyphServer::from_bitmaps(vec![short], 4.0),
            Err(GlyphError::BitmapSize { ch: 'x', expected: 4, actual: 3 })
        ));
        assert!(matches!(GlyphServer::from_bitmaps(Vec::new(), 4.0), Err(GlyphError::EmptyFace)));
        assert!(matches!(
            GlyphServer::from_bitmaps(vec![bitmap('y', 1, 1), bitmap('y', 1, 1)], 4.0),
            Err(GlyphError::DuplicateGlyph('y'))
        ));
    }

    #[test]
    fn test_default_server_is_shared() {
        let a = default_glyph_service();
        let b = default_glyph_service();
        assert!(same_service(&a, &b));
        assert_eq!(a.atlas_key(), b.atlas_key());

        let other: Arc<dyn GlyphService> = Arc::new(GlyphServer::builtin());
        assert!(!same_service(&a, &other));
    }

    #[test]
    fn test_atlas_png_export() {
        let path = std::env::temp_dir().join(format!("glyph_atlas_{}.png", std::process::id()));
        GlyphServer::builtin().save_atlas_png(&path).expect("export");
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_atlas_key_follows_contents() {
        let a = GlyphServer::from_bitmaps(vec![bitmap('a', 3, 4)], 6.0).expect("face a");
        let same = GlyphServer::from_bitmaps(vec![bitmap('a', 3, 4)], 6.0).expect("same face");
        let other = GlyphServer::from_bitmaps(vec![bitmap('a', 4, 4)], 6.0).expect("other face");

        assert_eq!(a.atlas_key(), same.atlas_key());
        assert_ne!(a.atlas_key(), other.atlas_key());
    }

    #[test]
    fn test_acquire_texture_uploads_atlas_once() {
        let mut backend = RecordingBackend::default();
        let server = GlyphServer::builtin();

        let first = server.acquire_texture(&mut backend).expect("upload");
        let second = server.acquire_texture(&mut backend).expect("reuse");
        assert_eq!(first, second);
        assert_eq!(backend.texture_count(), 1);
        assert_eq!(
            backend.texture_info(first),
            Some(("glyph_atlas", server.atlas().width, server.atlas().height))
        );
    }

    #[test]
    fn test_font_bytes_are_validated() {
        assert!(matches!(
            GlyphServer::from_font_bytes(b"definitely not a font", 24.0),
            Err(GlyphError::FontLoad(_))
        ));
        assert!(matches!(GlyphServer::from_font_bytes(&[], 0.0), Err(GlyphError::FontSize(_))));
        assert!(matches!(
            GlyphServer::from_font_file("/nonexistent/font.ttf", 24.0),
            Err(GlyphError::FontLoad(_))
        ));
    }
}
