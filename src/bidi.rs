//! BiDi run analysis: wraps the Unicode Bidirectional Algorithm to split a
//! window into direction-homogeneous [`VisualRun`]s in left-to-right visual
//! order.

use std::ops::Range;

use unicode_bidi::{bidi_class, BidiClass, BidiInfo, Level};

use crate::codepoint::CodePointUtils;

/// Direction handling requested for a shaping call, mirroring the six
/// paragraph-direction modes common to text layout APIs.
///
/// `Ltr`/`Rtl` and `DefaultLtr`/`DefaultRtl` all run the full algorithm —
/// they only differ in how the paragraph's base level is chosen — and so
/// can still yield multiple visual runs when the window mixes directions.
/// `OverrideLtr`/`OverrideRtl` skip the algorithm outright: they exist so a
/// caller can hand in a window that has already been sliced to a single
/// direction by its own surrounding context and have that direction
/// honoured verbatim, rather than re-derived from a non-override mode that
/// would require the buffer to be the entire context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BidiFlags {
    /// Run the algorithm with the base level forced to left-to-right.
    Ltr,
    /// Run the algorithm with the base level forced to right-to-left.
    Rtl,
    /// Run the algorithm with the base level auto-detected from the first
    /// strong directional character, defaulting to left-to-right when none
    /// is found.
    DefaultLtr,
    /// As [`BidiFlags::DefaultLtr`], but defaults to right-to-left when no
    /// strong directional character is found.
    DefaultRtl,
    /// Skip the algorithm; treat the whole window as one left-to-right run.
    OverrideLtr,
    /// Skip the algorithm; treat the whole window as one right-to-left run.
    OverrideRtl,
}

impl BidiFlags {
    /// `Some` only for the two modes that bypass the algorithm entirely.
    fn forced_single_run_direction(self) -> Option<bool> {
        match self {
            BidiFlags::OverrideLtr => Some(false),
            BidiFlags::OverrideRtl => Some(true),
            _ => None,
        }
    }

    /// Base paragraph level to hand to `unicode_bidi::BidiInfo::new`.
    /// `None` means "auto-detect", which is exactly `DefaultLtr`'s
    /// semantics per UAX #9 rule P3 (defaults to LTR when no strong
    /// character is found). `DefaultRtl` only needs an explicit level when
    /// auto-detection would otherwise fall back to the wrong default.
    fn base_level(self, text: &str) -> Option<Level> {
        match self {
            BidiFlags::Ltr => Some(Level::ltr()),
            BidiFlags::Rtl => Some(Level::rtl()),
            BidiFlags::DefaultLtr => None,
            BidiFlags::DefaultRtl => {
                if has_strong_directional_char(text) {
                    None
                } else {
                    Some(Level::rtl())
                }
            }
            BidiFlags::OverrideLtr | BidiFlags::OverrideRtl => {
                unreachable!("override modes never reach base_level")
            }
        }
    }
}

/// Whether `text` contains a character the UBA classifies as strongly
/// directional (L, R or AL) — used to decide whether `DefaultRtl`'s
/// fallback-to-RTL should apply, since the algorithm itself only has a
/// built-in default toward LTR.
fn has_strong_directional_char(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(bidi_class(c), BidiClass::L | BidiClass::R | BidiClass::AL))
}

/// One maximal direction-homogeneous span, in the order the runs should be
/// concatenated left to right on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRun {
    pub start: usize,
    pub limit: usize,
    pub is_rtl: bool,
}

/// Splits `buf[start..limit)` into visual runs per `flags`.
pub trait BidiAnalyzer: Send + Sync {
    fn analyze(&self, buf: &[u16], start: usize, limit: usize, flags: BidiFlags) -> Vec<VisualRun>;
}

/// [`BidiAnalyzer`] backed by the `unicode-bidi` crate's implementation of
/// UAX #9.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeBidiAnalyzer;

impl BidiAnalyzer for UnicodeBidiAnalyzer {
    fn analyze(&self, buf: &[u16], start: usize, limit: usize, flags: BidiFlags) -> Vec<VisualRun> {
        if start >= limit {
            return Vec::new();
        }

        if let Some(is_rtl) = flags.forced_single_run_direction() {
            return vec![VisualRun { start, limit, is_rtl }];
        }

        let text = CodePointUtils::to_string_lossy(&buf[start..limit]);
        if text.is_empty() {
            return vec![VisualRun {
                start,
                limit,
                is_rtl: matches!(flags, BidiFlags::Rtl | BidiFlags::DefaultRtl),
            }];
        }

        let unit16_of = byte_to_unit16_table(&text);
        let base_level = flags.base_level(&text);
        let bidi_info = BidiInfo::new(&text, base_level);

        let Some(para) = bidi_info.paragraphs.first() else {
            return vec![VisualRun {
                start,
                limit,
                is_rtl: base_level.is_some_and(|l| l.is_rtl()),
            }];
        };

        let line: Range<usize> = para.range.clone();
        let (run_levels, level_runs) = bidi_info.visual_runs(para, line);

        level_runs
            .into_iter()
            .zip(run_levels)
            .map(|(byte_range, level)| VisualRun {
                start: start + unit16_of[byte_range.start],
                limit: start + unit16_of[byte_range.end],
                is_rtl: level.is_rtl(),
            })
            .collect()
    }
}

/// Maps each UTF-8 byte offset in `text` (plus the end-of-string offset) to
/// the matching UTF-16 code unit offset, so byte ranges from `unicode-bidi`
/// can be translated back into the caller's UTF-16 buffer coordinates.
fn byte_to_unit16_table(text: &str) -> Vec<usize> {
    let mut table = vec![0usize; text.len() + 1];
    let mut unit = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        table[byte_idx] = unit;
        unit += ch.len_utf16();
    }
    table[text.len()] = unit;
    table
}
