//! Text rendering support
//!
//! Glyph services supply the atlas texture and metrics; text layout turns a
//! string into glyph quads for a billboard.

pub mod glyph_server;
pub mod text_layout;

pub use glyph_server::{
    default_glyph_server, default_glyph_service, same_service, GlyphAtlas, GlyphBitmap,
    install_default_glyph_server, GlyphError, GlyphInfo, GlyphResult, GlyphServer, GlyphService,
};
pub use text_layout::TextModel;
