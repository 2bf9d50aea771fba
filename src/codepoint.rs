//! UTF-16 decoding, word-break heuristics and the small set of character
//! predicates the itemizer and grapheme breaker both need.

use swash::text::Codepoint;
use unicode_properties::{UnicodeEmoji, UnicodeGeneralCategory};
use unicode_segmentation::UnicodeSegmentation;

/// Replacement used for unpaired surrogates, per the Unicode recommendation.
pub const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

pub const ZERO_WIDTH_JOINER: u32 = 0x200D;
pub const COMBINING_ENCLOSING_KEYCAP: u32 = 0x20E3;
pub const VARIATION_SELECTOR_TEXT: u32 = 0xFE0E;
pub const VARIATION_SELECTOR_EMOJI: u32 = 0xFE0F;

/// Stateless helpers over a UTF-16 code unit buffer.
pub struct CodePointUtils;

impl CodePointUtils {
    /// Decodes the code point starting at `index`, returning the decoded
    /// character (with unpaired surrogates replaced by U+FFFD) and the
    /// number of code units consumed (1 or 2).
    #[inline]
    pub fn decode_at(buf: &[u16], index: usize) -> (char, usize) {
        debug_assert!(index < buf.len());
        let unit = buf[index];
        if let Some(c) = char::from_u32(unit as u32) {
            if !(0xD800..=0xDFFF).contains(&unit) {
                return (c, 1);
            }
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            if let Some(&low) = buf.get(index + 1) {
                if (0xDC00..=0xDFFF).contains(&low) {
                    let cp =
                        0x10000 + ((unit as u32 - 0xD800) << 10) + (low as u32 - 0xDC00);
                    if let Some(c) = char::from_u32(cp) {
                        return (c, 2);
                    }
                }
            }
        }
        (REPLACEMENT_CHARACTER, 1)
    }

    /// Decodes the code point ending at `index` (exclusive), i.e. the one
    /// whose last code unit is `buf[index - 1]`. Used when scanning
    /// backwards across a boundary.
    #[inline]
    pub fn decode_before(buf: &[u16], index: usize) -> (char, usize) {
        debug_assert!(index > 0 && index <= buf.len());
        let unit = buf[index - 1];
        if (0xDC00..=0xDFFF).contains(&unit) && index >= 2 {
            let high = buf[index - 2];
            if (0xD800..=0xDBFF).contains(&high) {
                let cp = 0x10000 + ((high as u32 - 0xD800) << 10) + (unit as u32 - 0xDC00);
                if let Some(c) = char::from_u32(cp) {
                    return (c, 2);
                }
            }
        }
        match char::from_u32(unit as u32) {
            Some(c) if !(0xD800..=0xDFFF).contains(&unit) => (c, 1),
            _ => (REPLACEMENT_CHARACTER, 1),
        }
    }

    /// Number of UTF-16 code units required to encode `cp`.
    #[inline]
    pub fn utf16_len(cp: char) -> usize {
        if (cp as u32) > 0xFFFF {
            2
        } else {
            1
        }
    }

    /// Decodes an entire UTF-16 buffer into a `String`, substituting
    /// U+FFFD for unpaired surrogates. Used by callers that need a `str`
    /// view (e.g. to key a [`crate::char_sequence::CharSequenceBuilder`]
    /// lookup or feed the reference grapheme segmenter).
    pub fn to_string_lossy(buf: &[u16]) -> String {
        let mut out = String::with_capacity(buf.len());
        let mut i = 0;
        while i < buf.len() {
            let (c, consumed) = Self::decode_at(buf, i);
            out.push(c);
            i += consumed;
        }
        out
    }

    #[inline]
    pub fn is_variation_selector(cp: u32) -> bool {
        (0xFE00..=0xFE0F).contains(&cp) || (0xE0100..=0xE01EF).contains(&cp)
    }

    #[inline]
    pub fn is_emoji_variation_selector(cp: u32) -> bool {
        cp == VARIATION_SELECTOR_EMOJI
    }

    #[inline]
    pub fn is_text_variation_selector(cp: u32) -> bool {
        cp == VARIATION_SELECTOR_TEXT
    }

    #[inline]
    pub fn is_zwj(cp: u32) -> bool {
        cp == ZERO_WIDTH_JOINER
    }

    #[inline]
    pub fn is_regional_indicator(cp: u32) -> bool {
        (0x1F1E6..=0x1F1FF).contains(&cp)
    }

    #[inline]
    pub fn is_combining_enclosing_keycap(cp: u32) -> bool {
        cp == COMBINING_ENCLOSING_KEYCAP
    }

    /// Tag-spec characters, U+E0020..U+E007F, used by flag-sequence
    /// (subdivision) emoji.
    #[inline]
    pub fn is_tag_spec(cp: u32) -> bool {
        (0xE0020..=0xE007F).contains(&cp)
    }

    #[inline]
    pub fn is_emoji_modifier(c: char) -> bool {
        c.is_emoji_modifier()
    }

    #[inline]
    pub fn is_emoji_modifier_base(c: char) -> bool {
        c.is_emoji_modifier_base()
    }

    #[inline]
    pub fn is_extended_pictographic(c: char) -> bool {
        c.is_extended_pictographic()
    }

    #[inline]
    pub fn is_default_ignorable(c: char) -> bool {
        matches!(c.general_category(), unicode_properties::GeneralCategory::Format)
            || Self::is_variation_selector(c as u32)
    }

    /// Characters which never need a font (bidi controls, BOM, variation
    /// selectors, soft hyphen...) and simply extend whatever run is open.
    pub fn is_no_font_needed(c: char) -> bool {
        let cp = c as u32;
        matches!(cp, 0x00AD /* SOFT HYPHEN */ | 0x061C /* ALM */ | 0xFEFF /* BOM */)
            || (0x200C..=0x200F).contains(&cp)
            || (0x202A..=0x202E).contains(&cp)
            || (0x2066..=0x2069).contains(&cp)
            || Self::is_variation_selector(cp)
    }

    /// Punctuation and spacing code points that "stick" to whatever font
    /// family is already active in a run rather than forcing a rescan.
    pub fn is_sticky_whitelisted(c: char) -> bool {
        matches!(
            c,
            '!' | ',' | '-' | '.' | ':' | ';' | '?'
                | '\u{00A0}' // NBSP
                | '\u{2010}' // HYPHEN
                | '\u{2011}' // NB_HYPHEN
                | '\u{202F}' // NNBSP
                | '\u{2640}' // FEMALE SIGN
                | '\u{2642}' // MALE SIGN
                | '\u{2695}' // STAFF OF AESCULAPIUS
        )
    }

    /// Combining mark (general category Mn/Mc/Me) — tailoring for run
    /// continuation and lookback transfer during itemization.
    pub fn is_combining_mark(c: char) -> bool {
        use unicode_properties::GeneralCategory::*;
        matches!(
            c.general_category(),
            NonspacingMark | SpacingMark | EnclosingMark
        )
    }

    /// Finds the next word-break position at or after `from`, bounded by
    /// `limit`. Used to align cache probe windows to word granularity
    /// rather than shaping arbitrary sub-cluster ranges.
    pub fn next_word_break(buf: &[u16], from: usize, limit: usize) -> usize {
        if from >= limit {
            return limit;
        }
        let text = Self::to_string_lossy(&buf[..limit]);
        let mut units = 0usize;
        for word in text.unicode_word_indices() {
            let start_units = utf8_byte_to_unit16(&text, word.0);
            if start_units > from {
                return start_units.min(limit);
            }
            units = start_units + utf16_units(word.1);
            if units > from {
                return units.min(limit);
            }
        }
        limit
    }

    /// Finds the previous word-break position at or before `from`, bounded
    /// below by `start`.
    pub fn prev_word_break(buf: &[u16], start: usize, from: usize) -> usize {
        if from <= start {
            return start;
        }
        let text = Self::to_string_lossy(&buf[..from]);
        let mut last = start;
        for word in text.unicode_word_indices() {
            let start_units = utf8_byte_to_unit16(&text, word.0);
            if start_units >= start && start_units < from {
                last = start_units;
            }
            let end_units = start_units + utf16_units(word.1);
            if end_units <= from && end_units > last {
                last = end_units;
            }
        }
        last.max(start)
    }
}

fn utf8_byte_to_unit16(s: &str, byte_offset: usize) -> usize {
    s[..byte_offset].encode_utf16().count()
}

fn utf16_units(s: &str) -> usize {
    s.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_surrogate_pair() {
        let buf = [0xD83D, 0xDE00];
        let (c, n) = CodePointUtils::decode_at(&buf, 0);
        assert_eq!(c, '\u{1F600}');
        assert_eq!(n, 2);
    }

    #[test]
    fn replaces_unpaired_high_surrogate() {
        let buf = [0xD83D, 0x0041];
        let (c, n) = CodePointUtils::decode_at(&buf, 0);
        assert_eq!(c, REPLACEMENT_CHARACTER);
        assert_eq!(n, 1);
        let (c2, n2) = CodePointUtils::decode_at(&buf, 1);
        assert_eq!(c2, 'A');
        assert_eq!(n2, 1);
    }

    #[test]
    fn replaces_unpaired_low_surrogate() {
        let buf = [0xDE00];
        let (c, n) = CodePointUtils::decode_at(&buf, 0);
        assert_eq!(c, REPLACEMENT_CHARACTER);
        assert_eq!(n, 1);
    }

    #[test]
    fn word_break_splits_on_punctuation() {
        let text: Vec<u16> = "Hello, world!".encode_utf16().collect();
        let first = CodePointUtils::next_word_break(&text, 0, text.len());
        assert_eq!(first, 5); // end of "Hello"
    }
}
