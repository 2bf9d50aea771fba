//! Multi-style measurement: a flat, queryable advance table and per-run
//! extent built incrementally from style and replacement runs.

use crate::bidi::{BidiAnalyzer, BidiFlags};
use crate::cache::LayoutCache;
use crate::error::{ShapeError, ShapeResult};
use crate::layout_piece::ComputeFlags;
use crate::paint::FontPaint;
use crate::shaped_text::ShapedText;

/// Above this many runs, [`MeasuredText::get_extent`] binary-searches by
/// run boundary instead of scanning linearly; below it the scan is cheaper
/// than the search overhead (most measured ranges carry only one or two
/// style runs).
const EXTENT_BINARY_SEARCH_THRESHOLD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    pub start: usize,
    pub limit: usize,
    pub ascent: i32,
    pub descent: i32,
    pub is_replacement: bool,
}

/// Dense per-code-unit advances plus the run table they were built from,
/// covering a fixed `[start, limit)` range of one buffer.
#[derive(Clone)]
pub struct MeasuredText {
    base_start: usize,
    advances: Vec<f32>,
    runs: Vec<Run>,
}

impl MeasuredText {
    pub fn start(&self) -> usize {
        self.base_start
    }

    pub fn limit(&self) -> usize {
        self.base_start + self.advances.len()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Advance of the single code unit at `pos`.
    pub fn get_advance(&self, pos: usize) -> f32 {
        self.advances[pos - self.base_start]
    }

    /// Sum of advances over `[start, end)`.
    pub fn get_advance_range(&self, start: usize, end: usize) -> f32 {
        self.advances[start - self.base_start..end - self.base_start]
            .iter()
            .sum()
    }

    /// Max ascent/descent over every run overlapping `[start, end)`.
    pub fn get_extent(&self, start: usize, end: usize) -> (i32, i32) {
        let mut ascent = 0;
        let mut descent = 0;
        if self.runs.len() > EXTENT_BINARY_SEARCH_THRESHOLD {
            let first = self.runs.partition_point(|r| r.limit <= start);
            for run in &self.runs[first..] {
                if run.start >= end {
                    break;
                }
                ascent = ascent.max(run.ascent);
                descent = descent.max(run.descent);
            }
        } else {
            for run in &self.runs {
                if run.start < end && run.limit > start {
                    ascent = ascent.max(run.ascent);
                    descent = descent.max(run.descent);
                }
            }
        }
        (ascent, descent)
    }
}

/// Incrementally accumulates style and replacement runs into a
/// [`MeasuredText`]. Runs must be added in non-decreasing, non-overlapping
/// order covering every code unit of `[start, limit)` exactly once;
/// [`MeasuredTextBuilder::build`] rejects an incomplete cursor.
pub struct MeasuredTextBuilder<'a> {
    buf: &'a [u16],
    start: usize,
    limit: usize,
    cursor: usize,
    advances: Vec<f32>,
    runs: Vec<Run>,
    cache: &'a LayoutCache,
    analyzer: &'a dyn BidiAnalyzer,
    built: bool,
}

impl<'a> MeasuredTextBuilder<'a> {
    pub fn new(
        buf: &'a [u16],
        start: usize,
        limit: usize,
        cache: &'a LayoutCache,
        analyzer: &'a dyn BidiAnalyzer,
    ) -> Self {
        Self {
            buf,
            start,
            limit,
            cursor: start,
            advances: Vec::with_capacity(limit - start),
            runs: Vec::new(),
            cache,
            analyzer,
            built: false,
        }
    }

    /// Shapes `[cursor, run_limit)` under `paint`/`bidi_flags` and appends
    /// its per-code-unit advances and one [`Run`] covering it.
    pub fn add_style_run(
        &mut self,
        run_limit: usize,
        paint: &FontPaint,
        bidi_flags: BidiFlags,
    ) -> ShapeResult<()> {
        if self.built {
            return Err(ShapeError::BuilderAlreadyBuilt);
        }
        if run_limit <= self.cursor || run_limit > self.limit {
            return Err(ShapeError::InvalidRange {
                start: self.cursor,
                limit: run_limit,
                len: self.buf.len(),
            });
        }

        let shaped = ShapedText::shape(
            self.buf,
            self.cursor,
            run_limit,
            paint,
            bidi_flags,
            self.analyzer,
            self.cache,
            ComputeFlags::ADVANCES,
        )?;

        match shaped.advances {
            Some(advances) => self.advances.extend(advances),
            None => self.advances.extend(std::iter::repeat(0.0).take(run_limit - self.cursor)),
        }

        self.runs.push(Run {
            start: self.cursor,
            limit: run_limit,
            ascent: shaped.ascent,
            descent: shaped.descent,
            is_replacement: false,
        });
        self.cursor = run_limit;
        Ok(())
    }

    /// Adds a replacement run (e.g. an inline image or embedded object)
    /// spanning `[cursor, run_limit)` with an externally supplied
    /// advance/metrics triple instead of shaped glyphs.
    ///
    /// Open question resolved here: a multi-unit replacement has no
    /// natural per-code-unit advance breakdown. The full `advance` is
    /// assigned to the run's first code unit and the rest get zero, so
    /// [`MeasuredText::get_advance_range`] over the whole run still
    /// returns `advance` while [`MeasuredText::get_advance`] at a
    /// non-leading offset inside the run reads zero rather than splitting
    /// the advance arbitrarily.
    pub fn add_replacement_run(
        &mut self,
        run_limit: usize,
        advance: f32,
        ascent: i32,
        descent: i32,
    ) -> ShapeResult<()> {
        if self.built {
            return Err(ShapeError::BuilderAlreadyBuilt);
        }
        if run_limit <= self.cursor || run_limit > self.limit {
            return Err(ShapeError::InvalidRange {
                start: self.cursor,
                limit: run_limit,
                len: self.buf.len(),
            });
        }

        let width = run_limit - self.cursor;
        self.advances.push(advance);
        self.advances.extend(std::iter::repeat(0.0).take(width - 1));

        self.runs.push(Run {
            start: self.cursor,
            limit: run_limit,
            ascent,
            descent,
            is_replacement: true,
        });
        self.cursor = run_limit;
        Ok(())
    }

    /// Finalises the builder. Fails if runs don't yet cover the whole
    /// `[start, limit)` range, or if already called once.
    pub fn build(&mut self) -> ShapeResult<MeasuredText> {
        if self.built {
            return Err(ShapeError::BuilderAlreadyBuilt);
        }
        if self.cursor != self.limit {
            return Err(ShapeError::BuilderIncomplete {
                cursor: self.cursor,
                len: self.limit,
            });
        }
        self.built = true;
        Ok(MeasuredText {
            base_start: self.start,
            advances: self.advances.clone(),
            runs: self.runs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::UnicodeBidiAnalyzer;
    use crate::font::{EmojiFont, FontCollection, FontFamily, FontVariant};
    use crate::paint::FontStyle;
    use std::sync::Arc;

    fn collection() -> Arc<FontCollection> {
        let mut emoji = EmojiFont::new("emoji", true);
        for ch in ['a', 'b', 'c'] {
            let seq: Vec<u16> = ch.encode_utf16(&mut [0u16; 2]).to_vec();
            emoji.insert_sequence(&seq, ch as u16);
        }
        let mut family = FontFamily::new();
        family.set_variant(FontStyle::Normal, FontVariant::Emoji(Arc::new(emoji)));
        Arc::new(FontCollection::new(vec![Arc::new(family)]).unwrap())
    }

    #[test]
    fn incomplete_coverage_is_rejected() {
        let collection = collection();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "abc".encode_utf16().collect();
        let cache = LayoutCache::new(64);
        let mut builder = MeasuredTextBuilder::new(&buf, 0, 3, &cache, &UnicodeBidiAnalyzer);
        builder.add_style_run(2, &paint, BidiFlags::DefaultLtr).unwrap();
        let err = builder.build().unwrap_err();
        assert_eq!(err, ShapeError::BuilderIncomplete { cursor: 2, len: 3 });
    }

    #[test]
    fn full_coverage_builds_and_measures() {
        let collection = collection();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "abc".encode_utf16().collect();
        let cache = LayoutCache::new(64);
        let mut builder = MeasuredTextBuilder::new(&buf, 0, 3, &cache, &UnicodeBidiAnalyzer);
        builder.add_style_run(3, &paint, BidiFlags::DefaultLtr).unwrap();
        let measured = builder.build().unwrap();
        assert_eq!(measured.get_advance_range(0, 3), measured.get_advance(0) + measured.get_advance(1) + measured.get_advance(2));
    }

    #[test]
    fn second_build_call_is_rejected() {
        let collection = collection();
        let paint = FontPaint::new(collection);
        let buf: Vec<u16> = "abc".encode_utf16().collect();
        let cache = LayoutCache::new(64);
        let mut builder = MeasuredTextBuilder::new(&buf, 0, 3, &cache, &UnicodeBidiAnalyzer);
        builder.add_style_run(3, &paint, BidiFlags::DefaultLtr).unwrap();
        builder.build().unwrap();
        assert_eq!(builder.build().unwrap_err(), ShapeError::BuilderAlreadyBuilt);
    }

    #[test]
    fn replacement_run_advance_is_on_leading_unit() {
        let collection = collection();
        let paint = FontPaint::new(collection.clone());
        let buf: Vec<u16> = "a\u{FFFC}b".encode_utf16().collect();
        let cache = LayoutCache::new(64);
        let mut builder = MeasuredTextBuilder::new(&buf, 0, 3, &cache, &UnicodeBidiAnalyzer);
        builder.add_style_run(1, &paint, BidiFlags::DefaultLtr).unwrap();
        builder.add_replacement_run(2, 12.0, 10, 2).unwrap();
        builder.add_style_run(3, &paint, BidiFlags::DefaultLtr).unwrap();
        let measured = builder.build().unwrap();
        assert_eq!(measured.get_advance(1), 12.0);
        assert_eq!(measured.get_extent(1, 2), (10, 2));
    }
}
