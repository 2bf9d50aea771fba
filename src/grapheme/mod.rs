//! Tailored UAX #29 grapheme cluster boundary detection.
//!
//! [`GraphemeBreak`] decides whether a given offset into a UTF-16 buffer is
//! a cursor-stop boundary. Two implementations exist: the tailored
//! pairwise state machine (`classify`-driven, the default) and a reference
//! path that delegates to [`unicode_segmentation`]'s grapheme cursor. The
//! process-wide [`use_reference_segmenter`] switch lets tests cross-check
//! one against the other.

mod properties;

use std::sync::atomic::{AtomicBool, Ordering};

use properties::GraphemeClass;
pub use properties::is_tailored_virama;

use crate::codepoint::CodePointUtils;

static USE_REFERENCE_SEGMENTER: AtomicBool = AtomicBool::new(false);

/// Switches every subsequent [`GraphemeBreak`] call (process-wide) between
/// the tailored state machine and the reference `unicode-segmentation`
/// path. Intended for test cross-checking, not production use.
pub fn set_use_reference_segmenter(enabled: bool) {
    USE_REFERENCE_SEGMENTER.store(enabled, Ordering::Relaxed);
}

pub fn use_reference_segmenter() -> bool {
    USE_REFERENCE_SEGMENTER.load(Ordering::Relaxed)
}

/// Lookback cap, in code units, for the Regional_Indicator even/odd pairing
/// scan (GB12/GB13). Bounds worst-case cost on pathological flag-emoji runs.
const RI_LOOKBACK_CAP: usize = 1_000;

pub struct GraphemeBreak;

impl GraphemeBreak {
    /// Decides whether `offset` is a grapheme cluster boundary within
    /// `buf[start..limit)`. `advances`, if given, is a dense per-code-unit
    /// advance array aligned to `buf`; a non-zero advance at `offset`
    /// font-confirms a break and overrides the advance-dependent rules
    /// (GB11, GB12/13) in favour of breaking.
    pub fn is_boundary(buf: &[u16], start: usize, limit: usize, offset: usize) -> bool {
        Self::is_boundary_with_hints(buf, start, limit, offset, None)
    }

    pub fn is_boundary_with_hints(
        buf: &[u16],
        start: usize,
        limit: usize,
        offset: usize,
        advances: Option<&[u32]>,
    ) -> bool {
        debug_assert!(start <= offset && offset <= limit && limit <= buf.len());

        if use_reference_segmenter() {
            return reference_is_boundary(buf, start, limit, offset);
        }

        if offset == start || offset == limit {
            return true;
        }

        // Never break inside a surrogate pair.
        if is_high_surrogate(buf[offset - 1]) && is_low_surrogate(buf[offset]) {
            return false;
        }

        if let Some(adv) = advances {
            if offset < adv.len() && adv[offset] != 0 {
                return true;
            }
        }

        let (prev, _) = CodePointUtils::decode_before(buf, offset);
        let (next, _) = CodePointUtils::decode_at(buf, offset);
        let prev_class = properties::classify(prev);
        let next_class = properties::classify(next);

        use GraphemeClass::*;

        // GB3
        if prev_class == Cr && next_class == Lf {
            return false;
        }
        // GB4
        if matches!(prev_class, Control | Cr | Lf) {
            return true;
        }
        // GB5
        if matches!(next_class, Control | Cr | Lf) {
            return true;
        }
        // GB6
        if prev_class == L && matches!(next_class, L | V | Lv | Lvt) {
            return false;
        }
        // GB7
        if matches!(prev_class, Lv | V) && matches!(next_class, V | T) {
            return false;
        }
        // GB8
        if matches!(prev_class, Lvt | T) && next_class == T {
            return false;
        }
        // GB9
        if matches!(next_class, Extend | ZwJoiner) {
            return false;
        }
        // GB9a
        if next_class == SpacingMark {
            return false;
        }
        // GB9b
        if prev_class == Prepend {
            return false;
        }

        // Indic tailoring: virama (ccc==9, not a pure killer) followed by a
        // letter does not break.
        if properties::is_tailored_virama(prev) && next.is_alphabetic() {
            return false;
        }

        // GB11 tailored: Extended_Pictographic Extend* ZWJ x Extended_Pictographic.
        if prev_class == ZwJoiner && CodePointUtils::is_extended_pictographic(next) {
            if walks_back_to_extended_pictographic(buf, start, offset - 1) {
                return false;
            }
        }

        // GB12/13: pair Regional_Indicator code points in even/odd count.
        if prev_class == RegionalIndicator && next_class == RegionalIndicator {
            let count = count_preceding_regional_indicators(buf, start, offset);
            return count % 2 == 0;
        }

        // GB999
        true
    }

    /// Finds the boundary following `from` (exclusive), i.e. the smallest
    /// boundary strictly greater than `from`, capped at `limit`.
    pub fn following(buf: &[u16], start: usize, limit: usize, from: usize) -> usize {
        let mut pos = from;
        while pos < limit {
            let (_, n) = CodePointUtils::decode_at(buf, pos);
            pos += n;
            if Self::is_boundary(buf, start, limit, pos) {
                return pos;
            }
        }
        limit
    }

    /// Finds the boundary preceding `from` (exclusive), i.e. the largest
    /// boundary strictly less than `from`, capped below at `start`.
    pub fn preceding(buf: &[u16], start: usize, limit: usize, from: usize) -> usize {
        let mut pos = from;
        while pos > start {
            let (_, n) = CodePointUtils::decode_before(buf, pos);
            pos -= n;
            if Self::is_boundary(buf, start, limit, pos) {
                return pos;
            }
        }
        start
    }

    /// Streams every boundary in `[start, limit]` to `callback`, in order.
    pub fn for_text_run(buf: &[u16], start: usize, limit: usize, mut callback: impl FnMut(usize)) {
        let mut pos = start;
        callback(pos);
        while pos < limit {
            pos = Self::following(buf, start, limit, pos);
            callback(pos);
        }
    }
}

#[inline]
fn is_high_surrogate(u: u16) -> bool {
    (0xD800..=0xDBFF).contains(&u)
}

#[inline]
fn is_low_surrogate(u: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&u)
}

/// Walks backwards from `zwj_pos` (inclusive) through a run of `Extend`
/// characters, returning true if the character immediately preceding that
/// run is Extended_Pictographic.
fn walks_back_to_extended_pictographic(buf: &[u16], start: usize, zwj_pos: usize) -> bool {
    let mut pos = zwj_pos;
    loop {
        if pos <= start {
            return false;
        }
        let (c, n) = CodePointUtils::decode_before(buf, pos);
        pos -= n;
        if properties::classify(c) == GraphemeClass::Extend {
            continue;
        }
        return CodePointUtils::is_extended_pictographic(c);
    }
}

/// Counts consecutive Regional_Indicator code points immediately before
/// `offset`, capped at [`RI_LOOKBACK_CAP`].
fn count_preceding_regional_indicators(buf: &[u16], start: usize, offset: usize) -> usize {
    let mut pos = offset;
    let mut count = 0usize;
    while pos > start && count < RI_LOOKBACK_CAP {
        let (c, n) = CodePointUtils::decode_before(buf, pos);
        if !CodePointUtils::is_regional_indicator(c as u32) {
            break;
        }
        pos -= n;
        count += 1;
    }
    count
}

fn reference_is_boundary(buf: &[u16], start: usize, limit: usize, offset: usize) -> bool {
    use unicode_segmentation::UnicodeSegmentation;
    if offset == start || offset == limit {
        return true;
    }
    let text = CodePointUtils::to_string_lossy(&buf[start..limit]);
    let target = offset - start;
    let mut unit = 0usize;
    for g in text.graphemes(true) {
        if unit == target {
            return true;
        }
        if unit > target {
            return false;
        }
        unit += g.encode_utf16().count();
    }
    unit == target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn ascii_breaks_everywhere() {
        let buf = units("abc");
        for i in 0..=3 {
            assert!(GraphemeBreak::is_boundary(&buf, 0, 3, i));
        }
    }

    #[test]
    fn crlf_does_not_break() {
        let buf = units("a\r\nb");
        assert!(!GraphemeBreak::is_boundary(&buf, 0, 4, 2));
        assert!(GraphemeBreak::is_boundary(&buf, 0, 4, 1));
        assert!(GraphemeBreak::is_boundary(&buf, 0, 4, 3));
    }

    #[test]
    fn surrogate_pair_is_one_cluster() {
        let buf: Vec<u16> = vec![0xD83D, 0xDE00]; // U+1F600
        assert!(GraphemeBreak::is_boundary(&buf, 0, 2, 0));
        assert!(!GraphemeBreak::is_boundary(&buf, 0, 2, 1));
        assert!(GraphemeBreak::is_boundary(&buf, 0, 2, 2));
    }

    #[test]
    fn regional_indicator_pair_is_one_cluster() {
        // U+1F1FA U+1F1F8 (US flag)
        let buf: Vec<u16> = "\u{1F1FA}\u{1F1F8}".encode_utf16().collect();
        assert_eq!(buf.len(), 4);
        assert!(GraphemeBreak::is_boundary(&buf, 0, 4, 0));
        assert!(!GraphemeBreak::is_boundary(&buf, 0, 4, 2));
        assert!(GraphemeBreak::is_boundary(&buf, 0, 4, 4));
    }

    #[test]
    fn following_and_preceding_agree_with_is_boundary() {
        let buf = units("a\u{0301}b"); // a + combining acute + b
        for k in 1..buf.len() {
            let is_b = GraphemeBreak::is_boundary(&buf, 0, buf.len(), k);
            let follow_prev = GraphemeBreak::following(&buf, 0, buf.len(), k - 1) == k;
            assert_eq!(is_b, follow_prev, "offset {k}");
        }
    }
}
