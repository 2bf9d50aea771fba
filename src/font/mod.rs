//! Font capability abstraction: a tagged variant over the handful of
//! rasterisable-face kinds the shaping pipeline needs, plus the family and
//! collection types that group and fall back between them.

pub mod collection;
pub mod emoji;
pub mod family;
pub mod outline;

pub use collection::{FontCollection, FontRun};
pub use emoji::EmojiFont;
pub use family::FontFamily;
pub use outline::OutlineFont;

use std::sync::Arc;

use crate::paint::{FontMetricsInt, FontPaint, FontStyle};

/// Accumulates the output of one `Font::complex_layout` call. Field
/// semantics mirror the `LayoutPiece` invariants: `advances`, when
/// present, carries a non-zero value only at cluster-leading code unit
/// offsets; `bounds`, when present, is unioned (not replaced) with the
/// glyphs produced by this call.
pub struct LayoutSink<'a> {
    pub glyphs: &'a mut Vec<u16>,
    pub positions: &'a mut Vec<(f32, f32)>,
    /// Per-code-unit advances, indexed relative to the *word* start
    /// (`layout_start`), i.e. `advances[k]` describes `buf[layout_start + k]`.
    pub advances: Option<&'a mut [f32]>,
    pub bounds: Option<&'a mut PixelBounds>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelBounds {
    pub fn union(&mut self, other: &PixelBounds) {
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
    }
}

/// Result of `calc_glyph_score`: how much of `buf[start..limit)` this font
/// can render, and a relative quality penalty used to prefer "real" fonts
/// over logical/fallback ones when scores tie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphScore {
    /// Length, in code units, of the longest renderable prefix.
    pub covered_units: usize,
    /// Lower is better; fallback/logical fonts carry a small penalty.
    pub penalty: u8,
}

/// Capability set implemented by every font kind participating in
/// shaping. Implementations must be internally thread-safe: the engine
/// calls these from many threads concurrently and performs no locking of
/// its own around a `Font`.
pub trait Font: Send + Sync + std::fmt::Debug {
    fn style(&self) -> FontStyle;

    fn family_name(&self, locale: &str) -> &str;
    fn full_name(&self, locale: &str) -> &str;

    /// Whether this font can render `cp` under the given (optional)
    /// variation selector.
    fn has_glyph(&self, cp: char, variation_selector: Option<char>) -> bool;

    fn metrics(&self, paint: &FontPaint) -> FontMetricsInt;

    /// Shapes `buf[layout_start..layout_limit)` in the context of
    /// `buf[context_start..context_limit)`, appending visual-left-to-right
    /// glyphs to `sink`. Contextual shaping must not look outside the
    /// context range. `is_rtl` affects only how context is interpreted —
    /// output is always left-to-right.
    fn complex_layout(
        &self,
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        layout_start: usize,
        layout_limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        sink: &mut LayoutSink<'_>,
    );

    /// Longest-prefix coverage score used by the itemizer to penalise
    /// logical/fallback fonts relative to a "real" one at equal coverage.
    fn calc_glyph_score(&self, buf: &[u16], start: usize, limit: usize) -> GlyphScore {
        let mut i = start;
        while i < limit {
            let (c, n) = crate::codepoint::CodePointUtils::decode_at(buf, i);
            if !self.has_glyph(c, None) {
                break;
            }
            i += n;
        }
        GlyphScore {
            covered_units: i - start,
            penalty: 0,
        }
    }
}

/// Tagged dispatch over the font kinds the engine ships with. Avoids an
/// inheritance chain: families and collections hold `FontVariant` values
/// directly rather than `Box<dyn Font>` trait objects, since there are
/// only ever two concrete shapes.
#[derive(Clone, Debug)]
pub enum FontVariant {
    Outline(Arc<OutlineFont>),
    Emoji(Arc<EmojiFont>),
}

impl FontVariant {
    pub fn is_color_emoji(&self) -> bool {
        matches!(self, FontVariant::Emoji(f) if f.is_color_emoji())
    }
}

/// Identity comparison for interning: two variants are the same font iff
/// they point at the same underlying `Arc`.
pub fn variant_ptr_eq(a: &FontVariant, b: &FontVariant) -> bool {
    match (a, b) {
        (FontVariant::Outline(x), FontVariant::Outline(y)) => Arc::ptr_eq(x, y),
        (FontVariant::Emoji(x), FontVariant::Emoji(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

impl Font for FontVariant {
    fn style(&self) -> FontStyle {
        match self {
            FontVariant::Outline(f) => f.style(),
            FontVariant::Emoji(f) => f.style(),
        }
    }

    fn family_name(&self, locale: &str) -> &str {
        match self {
            FontVariant::Outline(f) => f.family_name(locale),
            FontVariant::Emoji(f) => f.family_name(locale),
        }
    }

    fn full_name(&self, locale: &str) -> &str {
        match self {
            FontVariant::Outline(f) => f.full_name(locale),
            FontVariant::Emoji(f) => f.full_name(locale),
        }
    }

    fn has_glyph(&self, cp: char, variation_selector: Option<char>) -> bool {
        match self {
            FontVariant::Outline(f) => f.has_glyph(cp, variation_selector),
            FontVariant::Emoji(f) => f.has_glyph(cp, variation_selector),
        }
    }

    fn metrics(&self, paint: &FontPaint) -> FontMetricsInt {
        match self {
            FontVariant::Outline(f) => f.metrics(paint),
            FontVariant::Emoji(f) => f.metrics(paint),
        }
    }

    fn complex_layout(
        &self,
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        layout_start: usize,
        layout_limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        sink: &mut LayoutSink<'_>,
    ) {
        match self {
            FontVariant::Outline(f) => f.complex_layout(
                buf,
                context_start,
                context_limit,
                layout_start,
                layout_limit,
                is_rtl,
                paint,
                sink,
            ),
            FontVariant::Emoji(f) => f.complex_layout(
                buf,
                context_start,
                context_limit,
                layout_start,
                layout_limit,
                is_rtl,
                paint,
                sink,
            ),
        }
    }

    fn calc_glyph_score(&self, buf: &[u16], start: usize, limit: usize) -> GlyphScore {
        match self {
            FontVariant::Outline(f) => f.calc_glyph_score(buf, start, limit),
            FontVariant::Emoji(f) => f.calc_glyph_score(buf, start, limit),
        }
    }
}
