//! Style annotations that drive itemization and shaping, and the metrics
//! container fonts report back.

use std::sync::Arc;

use crate::font::FontCollection;
use crate::{FONT_SIZE_QUANTUM, FONT_SIZE_RANGE};

bitflags::bitflags! {
    /// Rendering hints that affect glyph placement and participate in
    /// cache keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        const ANTI_ALIAS    = 0b0000_0001;
        const LINEAR_METRICS = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }

    pub fn from_bits(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Normal,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (true, true) => FontStyle::BoldItalic,
        }
    }
}

/// Style and rendering parameters applied to one run of text, and the
/// cache key ingredient shared by every shaping entry point.
///
/// By convention treated as immutable once handed to a
/// [`crate::cache::LayoutCache`] key, a [`crate::measured_text::MeasuredTextBuilder`],
/// or a [`crate::shaped_text::ShapedText`] call — mutating it afterwards is
/// undefined per the shared-key contract.
#[derive(Clone)]
pub struct FontPaint {
    pub font_collection: Arc<FontCollection>,
    pub locale: &'static str,
    pub style: FontStyle,
    pub render_flags: RenderFlags,
    size: f32,
}

impl FontPaint {
    pub fn new(font_collection: Arc<FontCollection>) -> Self {
        Self {
            font_collection,
            locale: "",
            style: FontStyle::Normal,
            render_flags: RenderFlags::ANTI_ALIAS,
            size: 16.0,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Self::canonicalize_size(size);
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_locale(mut self, locale: &'static str) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_render_flags(mut self, flags: RenderFlags) -> Self {
        self.render_flags = flags;
        self
    }

    /// Font size, always already clamped to `[1, 2184]` and quantised to a
    /// multiple of [`FONT_SIZE_QUANTUM`].
    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = Self::canonicalize_size(size);
    }

    /// Clamps to the valid range and rounds to the quantisation grid so
    /// the size is stable as a cache-key ingredient.
    pub fn canonicalize_size(size: f32) -> f32 {
        let clamped = size.clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end());
        (clamped / FONT_SIZE_QUANTUM).round() * FONT_SIZE_QUANTUM
    }

    /// True iff hinting (non-linear metrics) is requested, i.e. positions
    /// should be rounded to integer pixels.
    #[inline]
    pub fn is_hinted(&self) -> bool {
        !self.render_flags.contains(RenderFlags::LINEAR_METRICS)
    }

    #[inline]
    pub fn is_anti_aliased(&self) -> bool {
        self.render_flags.contains(RenderFlags::ANTI_ALIAS)
    }

    /// Whether two paints differ in any field that changes metrics or
    /// glyph selection — i.e. every field. Distinguished from a plain
    /// `==` so callers that only hold a `&FontPaint` reference can name
    /// the comparison's intent.
    pub fn is_metric_affecting(&self, other: &FontPaint) -> bool {
        Arc::ptr_eq(&self.font_collection, &other.font_collection)
            && self.locale == other.locale
            && self.style == other.style
            && self.render_flags == other.render_flags
            && self.size == other.size
    }
}

impl std::fmt::Debug for FontPaint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontPaint")
            .field("locale", &self.locale)
            .field("style", &self.style)
            .field("render_flags", &self.render_flags)
            .field("size", &self.size)
            .finish()
    }
}

/// Ascent/descent/leading envelope, all non-negative; ascent is the
/// distance *above* the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FontMetricsInt {
    pub ascent: i32,
    pub descent: i32,
    pub leading: i32,
}

impl FontMetricsInt {
    pub fn new(ascent: i32, descent: i32, leading: i32) -> Self {
        debug_assert!(ascent >= 0 && descent >= 0 && leading >= 0);
        Self {
            ascent,
            descent,
            leading,
        }
    }

    /// Extends `self` to the envelope (max) of `self` and `other`.
    pub fn extend_by(&mut self, ascent: i32, descent: i32, leading: i32) {
        self.ascent = self.ascent.max(ascent);
        self.descent = self.descent.max(descent);
        self.leading = self.leading.max(leading);
    }

    pub fn extend(&mut self, other: &FontMetricsInt) {
        self.extend_by(other.ascent, other.descent, other.leading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_clamped_and_quantised() {
        assert_eq!(FontPaint::canonicalize_size(0.1), 1.0);
        assert_eq!(FontPaint::canonicalize_size(5000.0), 2184.0);
        assert_eq!(FontPaint::canonicalize_size(12.1), 12.0);
        assert_eq!(FontPaint::canonicalize_size(12.13), 12.25);
    }

    #[test]
    fn metrics_extend_takes_max() {
        let mut m = FontMetricsInt::new(10, 2, 0);
        m.extend_by(5, 8, 1);
        assert_eq!(m, FontMetricsInt::new(10, 8, 1));
    }
}
