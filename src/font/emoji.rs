//! A pseudo-font matching emoji sequences against a fixed multi-codepoint
//! table rather than rasterising outlines.

use std::cell::RefCell;
use std::collections::HashMap;

use parking_lot::Mutex;
use thread_local::ThreadLocal;

use crate::char_sequence::CharSequenceBuilder;
use crate::codepoint::CodePointUtils;
use crate::font::{Font, GlyphScore, LayoutSink};
use crate::grapheme::GraphemeBreak;
use crate::paint::{FontMetricsInt, FontPaint, FontStyle};

/// Which lookup scratch buffer an [`EmojiFont`] uses. Both give identical
/// results; the choice is a concurrency tradeoff between one lock shared by
/// every thread and one buffer per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScratchMode {
    /// One `CharSequenceBuilder` behind a mutex, shared by every thread.
    #[default]
    SharedMutex,
    /// One `CharSequenceBuilder` per thread, no locking on the hot path.
    ThreadLocal,
}

/// Relative advance contributed per emoji cluster: `(base_size + 2 *
/// base_spacing) * font_size`, before optional integer rounding.
#[derive(Debug, Clone, Copy)]
pub struct EmojiAdvanceModel {
    pub base_size: f32,
    pub base_spacing: f32,
}

impl Default for EmojiAdvanceModel {
    fn default() -> Self {
        Self {
            base_size: 1.0,
            base_spacing: 0.0,
        }
    }
}

impl EmojiAdvanceModel {
    pub fn advance_for(&self, font_size: f32) -> f32 {
        (self.base_size + 2.0 * self.base_spacing) * font_size
    }
}

pub struct EmojiFont {
    family: String,
    /// Sequence -> glyph id. Keys are the UTF-16 code units of the emoji
    /// sequence exactly as it must appear (including any VS16/VS15).
    table: HashMap<Vec<u16>, u16>,
    advance_model: EmojiAdvanceModel,
    is_color: bool,
    /// Shared lookup scratch buffer guarded by a mutex covering the whole
    /// lookup sequence, used when `scratch_mode` is `SharedMutex`.
    scratch: Mutex<CharSequenceBuilder>,
    /// Per-thread lookup scratch buffer, used when `scratch_mode` is
    /// `ThreadLocal`.
    thread_scratch: ThreadLocal<RefCell<CharSequenceBuilder>>,
    scratch_mode: ScratchMode,
}

impl std::fmt::Debug for EmojiFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmojiFont")
            .field("family", &self.family)
            .field("entries", &self.table.len())
            .field("is_color", &self.is_color)
            .finish()
    }
}

impl EmojiFont {
    pub fn new(family: impl Into<String>, is_color: bool) -> Self {
        Self {
            family: family.into(),
            table: HashMap::new(),
            advance_model: EmojiAdvanceModel::default(),
            is_color,
            scratch: Mutex::new(CharSequenceBuilder::new()),
            thread_scratch: ThreadLocal::new(),
            scratch_mode: ScratchMode::default(),
        }
    }

    pub fn with_advance_model(mut self, model: EmojiAdvanceModel) -> Self {
        self.advance_model = model;
        self
    }

    /// Switches lookup to a per-thread scratch buffer instead of the
    /// shared, mutex-guarded one.
    pub fn with_thread_local_scratch(mut self) -> Self {
        self.scratch_mode = ScratchMode::ThreadLocal;
        self
    }

    pub fn scratch_mode(&self) -> ScratchMode {
        self.scratch_mode
    }

    pub fn insert_sequence(&mut self, units: &[u16], glyph_id: u16) {
        self.table.insert(units.to_vec(), glyph_id);
    }

    pub fn is_color_emoji(&self) -> bool {
        self.is_color
    }

    fn lookup(&self, units: &[u16]) -> Option<u16> {
        match self.scratch_mode {
            ScratchMode::SharedMutex => {
                let mut scratch = self.scratch.lock();
                scratch.clear();
                scratch.push_units(units);
                self.table.get(scratch.as_units()).copied()
            }
            ScratchMode::ThreadLocal => {
                let cell = self
                    .thread_scratch
                    .get_or(|| RefCell::new(CharSequenceBuilder::new()));
                let mut scratch = cell.borrow_mut();
                scratch.clear();
                scratch.push_units(units);
                self.table.get(scratch.as_units()).copied()
            }
        }
    }

    /// Looks up `units`, falling back per the VS16/VS15 retry rule: on a
    /// miss ending in VS16 retry without it; on a miss not ending in
    /// VS15, retry with an appended VS16.
    fn lookup_with_variation_fallback(&self, units: &[u16]) -> Option<u16> {
        if let Some(id) = self.lookup(units) {
            return Some(id);
        }
        if units.last() == Some(&0xFE0F) {
            return self.lookup(&units[..units.len() - 1]);
        }
        if units.last() != Some(&0xFE0E) {
            let mut extended = units.to_vec();
            extended.push(0xFE0F);
            return self.lookup(&extended);
        }
        None
    }
}

impl Font for EmojiFont {
    fn style(&self) -> FontStyle {
        FontStyle::Normal
    }

    fn family_name(&self, _locale: &str) -> &str {
        &self.family
    }

    fn full_name(&self, _locale: &str) -> &str {
        &self.family
    }

    fn has_glyph(&self, cp: char, variation_selector: Option<char>) -> bool {
        let mut units = CharSequenceBuilder::new();
        units.add_code_point(cp);
        if let Some(vs) = variation_selector {
            units.add_code_point(vs);
        }
        self.lookup_with_variation_fallback(units.as_units())
            .is_some()
    }

    fn metrics(&self, paint: &FontPaint) -> FontMetricsInt {
        let advance = self.advance_model.advance_for(paint.size());
        let ascent = (advance * 0.8).round().max(0.0) as i32;
        let descent = (advance * 0.2).round().max(0.0) as i32;
        FontMetricsInt::new(ascent, descent, 0)
    }

    /// Layout is cluster-driven by the grapheme breaker: each cluster is
    /// looked up as a unit; a miss contributes neither glyphs nor advance,
    /// leaving that cluster for the next itemization pass to cover.
    fn complex_layout(
        &self,
        buf: &[u16],
        _context_start: usize,
        _context_limit: usize,
        layout_start: usize,
        layout_limit: usize,
        _is_rtl: bool,
        paint: &FontPaint,
        sink: &mut LayoutSink<'_>,
    ) {
        let hinted = paint.is_hinted();
        let mut pen_x = 0.0f32;
        let mut cluster_start = layout_start;

        GraphemeBreak::for_text_run(buf, layout_start, layout_limit, |boundary| {
            if boundary == layout_start {
                return;
            }
            let units = &buf[cluster_start..boundary];
            if let Some(glyph_id) = self.lookup_with_variation_fallback(units) {
                let mut advance = self.advance_model.advance_for(paint.size());
                if hinted {
                    advance = advance.ceil();
                }
                sink.glyphs.push(glyph_id);
                sink.positions.push((pen_x, 0.0));
                if let Some(ref mut advances) = sink.advances {
                    let rel = cluster_start - layout_start;
                    if rel < advances.len() {
                        advances[rel] += advance;
                    }
                }
                pen_x += advance;
            }
            cluster_start = boundary;
        });
    }

    /// Longest-prefix coverage measured in whole grapheme clusters: a
    /// cluster counts only if it is both contiguous with the start of the
    /// range and present in the sequence table.
    fn calc_glyph_score(&self, buf: &[u16], start: usize, limit: usize) -> GlyphScore {
        let mut covered = start;
        let mut cluster_start = start;
        GraphemeBreak::for_text_run(buf, start, limit, |boundary| {
            if boundary == start {
                return;
            }
            let units = &buf[cluster_start..boundary];
            if covered == cluster_start && self.lookup_with_variation_fallback(units).is_some() {
                covered = boundary;
            }
            cluster_start = boundary;
        });
        GlyphScore {
            covered_units: covered - start,
            penalty: 0,
        }
    }
}

/// Predicate governing whether `(prev, cur)` must start a new emoji run
/// even though both are covered by the same colour-emoji family.
pub fn is_emoji_break(prev: char, cur: char) -> bool {
    let cur_cp = cur as u32;
    if CodePointUtils::is_emoji_modifier(cur) {
        return false;
    }
    if CodePointUtils::is_regional_indicator(prev as u32)
        && CodePointUtils::is_regional_indicator(cur_cp)
    {
        return false;
    }
    if CodePointUtils::is_combining_enclosing_keycap(cur_cp) {
        return false;
    }
    if CodePointUtils::is_tag_spec(cur_cp) {
        return false;
    }
    if CodePointUtils::is_zwj(prev as u32) || CodePointUtils::is_zwj(cur_cp) {
        return false;
    }
    true
}
