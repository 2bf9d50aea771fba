//! Unicode-aware text shaping and measurement engine.
//!
//! Turns a buffer of UTF-16 code units plus style annotations into a
//! sequence of positioned glyphs, together with per-cluster advances and
//! font metrics, suitable for downstream rendering, line breaking, cursor
//! navigation and hit testing.
//!
//! The pipeline: `char[] + runs of FontPaint` are itemized per BiDi run by
//! a [`font::FontCollection`], sliced into word-aligned context windows,
//! shaped through the [`cache::LayoutCache`] into [`layout_piece::LayoutPiece`]
//! values, and assembled into [`shaped_text::ShapedText`] or
//! [`measured_text::MeasuredText`].

#![allow(dead_code)]

pub mod bidi;
pub mod cache;
pub mod char_sequence;
pub mod codepoint;
pub mod error;
pub mod font;
pub mod grapheme;
pub mod layout_piece;
pub mod measured_text;
pub mod paint;
pub mod shaped_text;

pub use bidi::{BidiAnalyzer, BidiFlags, UnicodeBidiAnalyzer, VisualRun};
pub use cache::{global as global_layout_cache, reset_global as reset_global_layout_cache, LayoutCache, LayoutCacheKey};
pub use char_sequence::CharSequenceBuilder;
pub use codepoint::CodePointUtils;
pub use error::{ShapeError, ShapeResult};
pub use font::{outline::OutlineFont, EmojiFont, Font, FontCollection, FontFamily, FontRun, FontVariant};
pub use grapheme::GraphemeBreak;
pub use layout_piece::{ComputeFlags, LayoutPiece};
pub use measured_text::{MeasuredText, MeasuredTextBuilder, Run};
pub use paint::{FontMetricsInt, FontPaint, FontStyle, RenderFlags};
pub use shaped_text::ShapedText;

/// Maximum code unit span handed to [`cache::LayoutCache`]; longer windows bypass the cache.
pub const MAX_PIECE_LENGTH: usize = 128;

/// Bound on the number of entries retained by [`cache::LayoutCache`].
pub const LAYOUT_CACHE_CAPACITY: usize = 2_000;

/// Font size quantisation grid, in pixels. Sizes passed into cache keys are
/// rounded to the nearest multiple of this quantum.
pub const FONT_SIZE_QUANTUM: f32 = 0.25;

/// Inclusive clamp range for font sizes, in pixels.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<f32> = 1.0..=2184.0;
