//! A logical face bundled as up to four styled variants, plus the tags the
//! itemizer consults (east-asian-exclusive, colour-emoji).

use crate::font::FontVariant;
use crate::paint::FontStyle;

/// Up to four styled variants (normal/bold/italic/bold-italic) of one
/// logical face, plus the two tags the itemizer reads.
#[derive(Clone, Debug, Default)]
pub struct FontFamily {
    normal: Option<FontVariant>,
    bold: Option<FontVariant>,
    italic: Option<FontVariant>,
    bold_italic: Option<FontVariant>,
    pub is_east_asian: bool,
    pub is_color_emoji: bool,
}

impl FontFamily {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, style: FontStyle, font: FontVariant) -> Self {
        self.set_variant(style, font);
        self
    }

    pub fn set_variant(&mut self, style: FontStyle, font: FontVariant) {
        match style {
            FontStyle::Normal => self.normal = Some(font),
            FontStyle::Bold => self.bold = Some(font),
            FontStyle::Italic => self.italic = Some(font),
            FontStyle::BoldItalic => self.bold_italic = Some(font),
        }
    }

    pub fn variant(&self, style: FontStyle) -> Option<&FontVariant> {
        match style {
            FontStyle::Normal => self.normal.as_ref(),
            FontStyle::Bold => self.bold.as_ref(),
            FontStyle::Italic => self.italic.as_ref(),
            FontStyle::BoldItalic => self.bold_italic.as_ref(),
        }
    }

    /// The requested variant, or the default (normal) variant if the
    /// requested one is absent, or any present variant as a last resort.
    pub fn closest_match(&self, style: FontStyle) -> Option<&FontVariant> {
        self.variant(style)
            .or(self.normal.as_ref())
            .or(self.bold.as_ref())
            .or(self.italic.as_ref())
            .or(self.bold_italic.as_ref())
    }

    pub fn variants(&self) -> impl Iterator<Item = &FontVariant> {
        [&self.normal, &self.bold, &self.italic, &self.bold_italic]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.normal.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.bold_italic.is_none()
    }
}
