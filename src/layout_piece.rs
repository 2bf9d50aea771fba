//! Immutable shaping result for one bidi-homogeneous, word-bounded window.

use crate::font::{variant_ptr_eq, Font, FontVariant, LayoutSink, PixelBounds};
use crate::paint::{FontMetricsInt, FontPaint};

bitflags::bitflags! {
    /// Which optional fields of a [`LayoutPiece`] have been computed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComputeFlags: u8 {
        const ADVANCES = 0b0000_0001;
        const BOUNDS   = 0b0000_0010;
    }
}

/// Immutable result of shaping one word-bounded, direction-homogeneous
/// window of text through the font collection.
#[derive(Clone)]
pub struct LayoutPiece {
    pub glyphs: Vec<u16>,
    /// `(x, y)` per glyph, visual left-to-right.
    pub positions: Vec<(f32, f32)>,
    /// One entry per glyph into `fonts`, absent when every glyph used
    /// `fonts[0]`.
    pub font_indices: Option<Vec<u8>>,
    pub fonts: Vec<FontVariant>,
    /// Per-code-unit advances relative to the word start; only
    /// cluster-leading offsets are non-zero. Present iff
    /// `computed.contains(ComputeFlags::ADVANCES)`.
    pub advances: Option<Vec<f32>>,
    pub advance: f32,
    pub ascent: i32,
    pub descent: i32,
    pub bounds: Option<PixelBounds>,
    pub computed: ComputeFlags,
}

impl LayoutPiece {
    /// Shapes `buf[start..limit)` (the word) in the context of
    /// `buf[context_start..context_limit)`, optionally reusing `hint` — a
    /// previous piece built from the same key — to avoid recomputing
    /// fields it already carries.
    pub fn build(
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        start: usize,
        limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        hint: Option<&LayoutPiece>,
        new_flags: ComputeFlags,
    ) -> LayoutPiece {
        if let Some(hint) = hint {
            let missing = new_flags.difference(hint.computed);
            if missing.is_empty() {
                return hint.clone();
            }
            return Self::splice_missing(
                buf,
                context_start,
                context_limit,
                start,
                limit,
                is_rtl,
                paint,
                hint,
                missing,
            );
        }

        Self::build_fresh(
            buf,
            context_start,
            context_limit,
            start,
            limit,
            is_rtl,
            paint,
            new_flags,
        )
    }

    fn build_fresh(
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        start: usize,
        limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        flags: ComputeFlags,
    ) -> LayoutPiece {
        let sub_runs = paint.font_collection.itemize(buf, start, limit, usize::MAX);

        let mut glyphs = Vec::new();
        let mut positions = Vec::new();
        let mut font_order: Vec<FontVariant> = Vec::new();
        let mut font_index_per_glyph: Vec<u8> = Vec::new();
        let mut advances = if flags.contains(ComputeFlags::ADVANCES) {
            Some(vec![0.0f32; limit - start])
        } else {
            None
        };
        let mut bounds = if flags.contains(ComputeFlags::BOUNDS) {
            Some(PixelBounds::default())
        } else {
            None
        };

        let mut metrics = FontMetricsInt::default();
        let mut running_advance = 0.0f32;

        let ordered: Vec<&crate::font::FontRun> = if is_rtl {
            sub_runs.iter().rev().collect()
        } else {
            sub_runs.iter().collect()
        };

        for run in ordered {
            let family = paint.font_collection.family(run.primary());
            let Some(font) = family.closest_match(paint.style).cloned() else {
                continue;
            };

            metrics.extend(&font.metrics(paint));

            let font_idx = match font_order.iter().position(|f| variant_ptr_eq(f, &font)) {
                Some(idx) => idx,
                None => {
                    font_order.push(font.clone());
                    font_order.len() - 1
                }
            };

            let glyph_count_before = glyphs.len();
            let position_count_before = positions.len();

            let local_advances_start = run.start - start;
            let local_advances_end = run.limit - start;
            let mut sink = LayoutSink {
                glyphs: &mut glyphs,
                positions: &mut positions,
                advances: advances
                    .as_mut()
                    .map(|a| &mut a[local_advances_start..local_advances_end]),
                bounds: bounds.as_mut(),
            };
            font.complex_layout(
                buf,
                context_start,
                context_limit,
                run.start,
                run.limit,
                is_rtl,
                paint,
                &mut sink,
            );

            let new_glyph_count = glyphs.len() - glyph_count_before;
            font_index_per_glyph.resize(font_index_per_glyph.len() + new_glyph_count, font_idx as u8);

            // translate this sub-run's positions by the running advance so
            // sub-runs concatenate left to right in visual order.
            for p in positions.iter_mut().skip(position_count_before) {
                p.0 += running_advance;
            }
            if let Some(&(last_x, _)) = positions.last() {
                running_advance = running_advance.max(last_x);
            }
            if let Some(adv) = advances.as_ref() {
                running_advance = start_to_total_advance(adv, local_advances_end);
            }
        }

        let font_indices = if font_order.len() <= 1 {
            None
        } else {
            Some(font_index_per_glyph)
        };

        LayoutPiece {
            glyphs,
            positions,
            font_indices,
            fonts: font_order,
            advances,
            advance: running_advance,
            ascent: metrics.ascent,
            descent: metrics.descent,
            bounds,
            computed: flags,
        }
    }

    /// Recomputes only `missing` fields (advances and/or bounds), keeping
    /// the hint's glyph stream, positions and font attribution untouched.
    fn splice_missing(
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        start: usize,
        limit: usize,
        is_rtl: bool,
        paint: &FontPaint,
        hint: &LayoutPiece,
        missing: ComputeFlags,
    ) -> LayoutPiece {
        let rebuilt = Self::build_fresh(
            buf,
            context_start,
            context_limit,
            start,
            limit,
            is_rtl,
            paint,
            hint.computed | missing,
        );
        LayoutPiece {
            glyphs: hint.glyphs.clone(),
            positions: hint.positions.clone(),
            font_indices: hint.font_indices.clone(),
            fonts: hint.fonts.clone(),
            advances: if missing.contains(ComputeFlags::ADVANCES) {
                rebuilt.advances
            } else {
                hint.advances.clone()
            },
            advance: hint.advance,
            ascent: hint.ascent,
            descent: hint.descent,
            bounds: if missing.contains(ComputeFlags::BOUNDS) {
                rebuilt.bounds
            } else {
                hint.bounds
            },
            computed: hint.computed | missing,
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

fn start_to_total_advance(advances: &[f32], upto: usize) -> f32 {
    advances[..upto].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{EmojiFont, FontFamily};
    use crate::paint::FontPaint;
    use std::sync::Arc;

    fn collection_with_emoji() -> Arc<crate::font::FontCollection> {
        let mut emoji = EmojiFont::new("emoji", true);
        let seq: Vec<u16> = "\u{1F600}".encode_utf16().collect();
        emoji.insert_sequence(&seq, 42);
        let mut family = FontFamily::new();
        family.is_color_emoji = true;
        family.set_variant(
            crate::paint::FontStyle::Normal,
            FontVariant::Emoji(Arc::new(emoji)),
        );
        Arc::new(crate::font::FontCollection::new(vec![Arc::new(family)]).unwrap())
    }

    #[test]
    fn single_font_optimisation_skips_font_indices() {
        let collection = collection_with_emoji();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "\u{1F600}".encode_utf16().collect();
        let piece = LayoutPiece::build(
            &buf,
            0,
            buf.len(),
            0,
            buf.len(),
            false,
            &paint,
            None,
            ComputeFlags::ADVANCES,
        );
        assert_eq!(piece.glyphs.len(), 1);
        assert!(piece.font_indices.is_none());
        assert!(piece.advances.as_ref().unwrap()[0] > 0.0);
    }

    #[test]
    fn hint_is_not_perturbed_by_added_flags() {
        let collection = collection_with_emoji();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "\u{1F600}".encode_utf16().collect();
        let base = LayoutPiece::build(&buf, 0, buf.len(), 0, buf.len(), false, &paint, None, ComputeFlags::empty());
        let extended = LayoutPiece::build(
            &buf,
            0,
            buf.len(),
            0,
            buf.len(),
            false,
            &paint,
            Some(&base),
            ComputeFlags::ADVANCES,
        );
        assert_eq!(base.glyphs, extended.glyphs);
        assert_eq!(base.positions, extended.positions);
        assert_eq!(base.advance, extended.advance);
        assert!(extended.advances.is_some());
    }

    fn collection_with_outline() -> Arc<crate::font::FontCollection> {
        let font = crate::font::outline::OutlineFont::from_bytes(
            crate::font::outline::minimal_ttf(),
            0,
            crate::paint::FontStyle::Normal,
        )
        .unwrap();
        let mut family = FontFamily::new();
        family.set_variant(crate::paint::FontStyle::Normal, FontVariant::Outline(Arc::new(font)));
        Arc::new(crate::font::FontCollection::new(vec![Arc::new(family)]).unwrap())
    }

    /// A fresh build and a hint-spliced rebuild of the same word, given the
    /// same (wider-than-the-word) context bounds, must agree: `splice_missing`
    /// has to forward the caller's real context instead of narrowing it to
    /// the word bounds.
    #[test]
    fn splice_missing_forwards_the_callers_context_bounds() {
        let collection = collection_with_outline();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "AA".encode_utf16().collect();

        let base = LayoutPiece::build(
            &buf,
            0,
            buf.len(),
            1,
            buf.len(),
            false,
            &paint,
            None,
            ComputeFlags::empty(),
        );
        let spliced = LayoutPiece::build(
            &buf,
            0,
            buf.len(),
            1,
            buf.len(),
            false,
            &paint,
            Some(&base),
            ComputeFlags::ADVANCES,
        );
        let direct = LayoutPiece::build(
            &buf,
            0,
            buf.len(),
            1,
            buf.len(),
            false,
            &paint,
            None,
            ComputeFlags::ADVANCES,
        );

        assert_eq!(spliced.glyphs, direct.glyphs);
        assert_eq!(spliced.advances, direct.advances);
    }
}
