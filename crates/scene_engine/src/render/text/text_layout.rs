//! Text layout
//!
//! Converts a string into glyph quads fitted into a pixel-sized box. The
//! result is a [`GeometryModel`] with a `position` buffer (pixels, centered
//! on the box) and a `str` buffer (atlas uvs), drawn without an index buffer.

use crate::foundation::math::Vec2;
use crate::render::api::{GeometryModel, IndexSource, VertexAttribute};
use super::glyph_server::{GlyphInfo, GlyphService};

/// Semantic of the glyph quad corner positions
pub const POSITION: &str = "position";
/// Semantic of the atlas coordinates
pub const STR: &str = "str";

const VERTICES_PER_GLYPH: usize = 6;

/// Glyph quads for one string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextModel {
    positions: Vec<f32>,
    uvs: Vec<f32>,
    glyph_count: usize,
    extent: Vec2,
}

impl TextModel {
    /// Lay out `text` on one line and fit it into `width` x `height` pixels
    ///
    /// The text keeps its aspect ratio and is centered in the box. Characters
    /// the service does not cover advance the pen like a space.
    pub fn layout(text: &str, service: &dyn GlyphService, width: f32, height: f32) -> Self {
        let fallback_advance = service.glyph(' ').map_or(0.0, |g| g.advance);

        let mut quads: Vec<([f32; 4], &GlyphInfo)> = Vec::new();
        let mut cursor_x = 0.0f32;
        for ch in text.chars() {
            let Some(glyph) = service.glyph(ch) else {
                cursor_x += fallback_advance;
                continue;
            };
            if glyph.size.x > 0.0 && glyph.size.y > 0.0 {
                let x_min = cursor_x + glyph.bearing.x;
                let y_min = glyph.bearing.y;
                quads.push(([x_min, y_min, x_min + glyph.size.x, y_min + glyph.size.y], glyph));
            }
            cursor_x += glyph.advance;
        }

        let line_width = cursor_x.max(f32::EPSILON);
        let line_height = service.line_height().max(f32::EPSILON);
        let scale = (width / line_width).min(height / line_height).max(0.0);
        let offset = Vec2::new(-line_width * 0.5, -line_height * 0.5);

        let mut model = Self {
            positions: Vec::with_capacity(quads.len() * VERTICES_PER_GLYPH * 3),
            uvs: Vec::with_capacity(quads.len() * VERTICES_PER_GLYPH * 2),
            glyph_count: quads.len(),
            extent: Vec2::new(cursor_x * scale, line_height * scale),
        };

        for ([x0, y0, x1, y1], glyph) in quads {
            let to_box = |x: f32, y: f32| [(x + offset.x) * scale, (y + offset.y) * scale];
            let corners = [
                (to_box(x0, y0), [glyph.uv_min.x, glyph.uv_max.y]),
                (to_box(x1, y0), [glyph.uv_max.x, glyph.uv_max.y]),
                (to_box(x1, y1), [glyph.uv_max.x, glyph.uv_min.y]),
                (to_box(x0, y1), [glyph.uv_min.x, glyph.uv_min.y]),
            ];
            // Two counter-clockwise triangles per glyph
            for corner in [0, 1, 2, 0, 2, 3] {
                let ([x, y], [u, v]) = corners[corner];
                model.positions.extend_from_slice(&[x, y, 0.0]);
                model.uvs.extend_from_slice(&[u, v]);
            }
        }

        model
    }

    /// Number of visible glyph quads
    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Vertices emitted by a draw of this model
    pub fn vertex_count(&self) -> u32 {
        (self.glyph_count * VERTICES_PER_GLYPH) as u32
    }

    /// Size of the laid out line after fitting, in pixels
    pub fn extent(&self) -> Vec2 {
        self.extent
    }
}

impl GeometryModel for TextModel {
    fn vertex_attribute(&self, semantic: &str) -> Option<VertexAttribute<'_>> {
        match semantic {
            POSITION => Some(VertexAttribute { components: 3, data: &self.positions }),
            STR => Some(VertexAttribute { components: 2, data: &self.uvs }),
            _ => None,
        }
    }

    fn index_source(&self) -> IndexSource<'_> {
        IndexSource::Zero { count: self.vertex_count() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::GlyphServer;
    use approx::assert_relative_eq;

    #[test]
    fn test_six_vertices_per_visible_glyph() {
        let server = GlyphServer::builtin();
        let model = TextModel::layout("ab c", &server, 200.0, 50.0);

        // The space advances without a quad
        assert_eq!(model.glyph_count(), 3);
        assert_eq!(model.vertex_count(), 18);
        assert!(matches!(model.index_source(), IndexSource::Zero { count: 18 }));
        assert_eq!(model.vertex_attribute(STR).map(|a| a.vertex_count()), Some(18));
    }

    #[test]
    fn test_text_fits_inside_box() {
        let server = GlyphServer::builtin();
        let model = TextModel::layout("Hello, billboard", &server, 200.0, 50.0);

        assert!(model.extent().x <= 200.0 + 1e-3);
        assert!(model.extent().y <= 50.0 + 1e-3);

        let positions = model.vertex_attribute(POSITION).map(|a| a.data.to_vec()).unwrap_or_default();
        for xyz in positions.chunks(3) {
            assert!(xyz[0].abs() <= 100.0 + 1e-3);
            assert!(xyz[1].abs() <= 25.0 + 1e-3);
        }
    }

    #[test]
    fn test_unknown_characters_advance_like_space() {
        let server = GlyphServer::builtin();
        let known = TextModel::layout("a a", &server, 240.0, 12.0);
        let unknown = TextModel::layout("a\u{263a}a", &server, 240.0, 12.0);

        assert_eq!(known.glyph_count(), unknown.glyph_count());
        assert_relative_eq!(known.extent().x, unknown.extent().x);
    }

    #[test]
    fn test_empty_text_has_no_vertices() {
        let model = TextModel::layout("", &GlyphServer::builtin(), 200.0, 50.0);
        assert_eq!(model.vertex_count(), 0);
    }
}
