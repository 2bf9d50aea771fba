//! Assembles bidi runs and word-bounded [`LayoutPiece`]s into one
//! contiguous, visually-ordered shaping result for a single-style range.

use crate::bidi::{BidiAnalyzer, BidiFlags};
use crate::cache::LayoutCache;
use crate::codepoint::CodePointUtils;
use crate::error::{ShapeError, ShapeResult};
use crate::font::{variant_ptr_eq, FontVariant};
use crate::layout_piece::{ComputeFlags, LayoutPiece};
use crate::paint::{FontMetricsInt, FontPaint};

/// Visually left-to-right shaping result for `buf[start..limit)` under one
/// [`FontPaint`].
#[derive(Clone)]
pub struct ShapedText {
    pub glyphs: Vec<u16>,
    pub positions: Vec<(f32, f32)>,
    /// One entry per glyph into `fonts`; absent when every glyph used
    /// `fonts[0]`.
    pub font_indices: Option<Vec<u8>>,
    pub fonts: Vec<FontVariant>,
    /// Per-code-unit advances relative to `start`, present iff requested
    /// via [`ComputeFlags::ADVANCES`].
    pub advances: Option<Vec<f32>>,
    pub advance: f32,
    pub ascent: i32,
    pub descent: i32,
}

impl ShapedText {
    /// Shapes `buf[start..limit)`: splits it into bidi runs, each run into
    /// word-bounded windows, shapes each window through `cache` (which
    /// itself calls [`LayoutPiece::build`]), then concatenates the
    /// results left to right, reversing word order within right-to-left
    /// runs (each word's own glyph stream is always left-to-right; only
    /// the order of words within an RTL run is reversed).
    pub fn shape(
        buf: &[u16],
        start: usize,
        limit: usize,
        paint: &FontPaint,
        bidi_flags: BidiFlags,
        analyzer: &dyn BidiAnalyzer,
        cache: &LayoutCache,
        flags: ComputeFlags,
    ) -> ShapeResult<ShapedText> {
        if start > limit || limit > buf.len() {
            return Err(ShapeError::InvalidRange {
                start,
                limit,
                len: buf.len(),
            });
        }

        let mut glyphs = Vec::new();
        let mut positions = Vec::new();
        let mut fonts: Vec<FontVariant> = Vec::new();
        let mut font_indices: Vec<u8> = Vec::new();
        let mut advances = flags
            .contains(ComputeFlags::ADVANCES)
            .then(|| vec![0.0f32; limit - start]);
        let mut metrics = FontMetricsInt::default();
        let mut running_advance = 0.0f32;

        if start == limit {
            return Ok(ShapedText {
                glyphs,
                positions,
                font_indices: None,
                fonts,
                advances,
                advance: 0.0,
                ascent: 0,
                descent: 0,
            });
        }

        let bidi_runs = analyzer.analyze(buf, start, limit, bidi_flags);

        for run in &bidi_runs {
            let mut words = word_windows(buf, run.start, run.limit);
            if run.is_rtl {
                words.reverse();
            }

            for (w_start, w_limit) in words {
                let piece = cache.get_or_shape(buf, w_start, w_limit, run.is_rtl, paint, flags, |hint| {
                    LayoutPiece::build(
                        buf, run.start, run.limit, w_start, w_limit, run.is_rtl, paint, hint, flags,
                    )
                });

                metrics.extend_by(piece.ascent, piece.descent, 0);

                let glyph_base = glyphs.len();
                glyphs.extend_from_slice(&piece.glyphs);
                for &(x, y) in &piece.positions {
                    positions.push((x + running_advance, y));
                }

                if piece.fonts.is_empty() {
                    // no font covered this window; nothing to attribute.
                } else if let Some(local_indices) = &piece.font_indices {
                    let mapped: Vec<u8> = piece
                        .fonts
                        .iter()
                        .map(|f| intern(&mut fonts, f))
                        .collect();
                    for &local in local_indices {
                        font_indices.push(mapped[local as usize]);
                    }
                } else {
                    let idx = intern(&mut fonts, &piece.fonts[0]);
                    font_indices.resize(glyph_base + piece.glyphs.len(), idx);
                }

                if let (Some(dst), Some(src)) = (advances.as_mut(), piece.advances.as_ref()) {
                    let rel = w_start - start;
                    for (i, &a) in src.iter().enumerate() {
                        dst[rel + i] += a;
                    }
                }

                running_advance += piece.advance;
            }
        }

        Ok(ShapedText {
            glyphs,
            positions,
            font_indices: if fonts.len() <= 1 { None } else { Some(font_indices) },
            fonts,
            advances,
            advance: running_advance,
            ascent: metrics.ascent,
            descent: metrics.descent,
        })
    }
}

/// Splits `buf[start..limit)` into consecutive word-bounded windows using
/// [`CodePointUtils::next_word_break`].
fn word_windows(buf: &[u16], start: usize, limit: usize) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < limit {
        let next = CodePointUtils::next_word_break(buf, cursor, limit)
            .max(cursor + 1)
            .min(limit);
        windows.push((cursor, next));
        cursor = next;
    }
    windows
}

fn intern(fonts: &mut Vec<FontVariant>, font: &FontVariant) -> u8 {
    if let Some(pos) = fonts.iter().position(|f| variant_ptr_eq(f, font)) {
        pos as u8
    } else {
        fonts.push(font.clone());
        (fonts.len() - 1) as u8
    }
}
