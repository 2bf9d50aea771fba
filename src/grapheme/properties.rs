//! Grapheme_Cluster_Break classification, tailored per the curated override
//! tables: a handful of format controls are forced to `Extend`, and THAI
//! SARA AM is forced to `Other` so the Indic virama tailoring in
//! [`super::GraphemeBreak`] does not misfire on it.

use unicode_normalization::char::canonical_combining_class;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphemeClass {
    Cr,
    Lf,
    Control,
    Extend,
    ZwJoiner,
    RegionalIndicator,
    Prepend,
    SpacingMark,
    L,
    V,
    T,
    Lv,
    Lvt,
    Other,
}

const THAI_SARA_AM: u32 = 0x0E33;

/// Format controls and variation selectors forced to `Extend` regardless of
/// their raw general category, matching the reference engine's tailoring.
fn is_forced_extend(cp: u32) -> bool {
    matches!(
        cp,
        0x00AD   // SOFT HYPHEN
        | 0x061C // ARABIC LETTER MARK
        | 0xFEFF // BOM / ZERO WIDTH NO-BREAK SPACE
    ) || (0x200B..=0x200F).contains(&cp) // ZWSP, bidi marks (ZWJ handled separately)
        || (0x202A..=0x202E).contains(&cp) // bidi embedding/override controls
        || (0x2066..=0x2069).contains(&cp) // bidi isolate controls
        || (0xFE00..=0xFE0F).contains(&cp) // VS1-16
        || (0xE0020..=0xE007F).contains(&cp) // tag characters
}

/// A curated subset of Indic "pure killer" viramas that, despite having
/// canonical combining class 9, do not trigger the no-break tailoring
/// (they behave as ordinary Extend characters instead).
const PURE_KILLERS: [u32; 17] = [
    0x0D4D, 0x0DCA, 0x0E3A, 0x0F84, 0x1039, 0x103A, 0x1714, 0x1734, 0x17D2, 0x1A60, 0x1B44,
    0x1BAA, 0x1BF2, 0x1BF3, 0xA82C, 0x110B9, 0x11133,
];

pub fn is_pure_killer(cp: u32) -> bool {
    PURE_KILLERS.contains(&cp)
}

/// Canonical_Combining_Class == 9 (Virama) and not a pure killer.
pub fn is_tailored_virama(c: char) -> bool {
    canonical_combining_class(c) == 9 && !is_pure_killer(c as u32)
}

pub fn classify(c: char) -> GraphemeClass {
    let cp = c as u32;

    if cp == THAI_SARA_AM {
        return GraphemeClass::Other;
    }
    if c == '\r' {
        return GraphemeClass::Cr;
    }
    if c == '\n' {
        return GraphemeClass::Lf;
    }
    if cp == 0x200D {
        return GraphemeClass::ZwJoiner;
    }
    if is_forced_extend(cp) {
        return GraphemeClass::Extend;
    }
    if (0x1F1E6..=0x1F1FF).contains(&cp) {
        return GraphemeClass::RegionalIndicator;
    }
    if let Some(class) = hangul_class(cp) {
        return class;
    }
    if is_prepend(cp) {
        return GraphemeClass::Prepend;
    }

    match c.general_category() {
        GeneralCategory::Control | GeneralCategory::Format | GeneralCategory::Surrogate
        | GeneralCategory::Unassigned => GraphemeClass::Control,
        GeneralCategory::NonspacingMark | GeneralCategory::EnclosingMark => GraphemeClass::Extend,
        GeneralCategory::SpacingMark => GraphemeClass::SpacingMark,
        _ => GraphemeClass::Other,
    }
}

/// Hangul Jamo / syllable classification (GB6-GB8 inputs), computed
/// directly from the documented Unicode block ranges and the Hangul
/// Syllable decomposition formula rather than a generated table.
fn hangul_class(cp: u32) -> Option<GraphemeClass> {
    match cp {
        0x1100..=0x115F | 0xA960..=0xA97C => Some(GraphemeClass::L),
        0x1160..=0x11A7 | 0xD7B0..=0xD7C6 => Some(GraphemeClass::V),
        0x11A8..=0x11FF | 0xD7CB..=0xD7FB => Some(GraphemeClass::T),
        0xAC00..=0xD7A3 => {
            let s_index = cp - 0xAC00;
            if s_index % 28 == 0 {
                Some(GraphemeClass::Lv)
            } else {
                Some(GraphemeClass::Lvt)
            }
        }
        _ => None,
    }
}

/// A representative set of `Prepend`-class characters (Indic "reph"
/// prefixes and a few other prepended marks).
fn is_prepend(cp: u32) -> bool {
    matches!(
        cp,
        0x0600..=0x0605
            | 0x06DD
            | 0x070F
            | 0x0890..=0x0891
            | 0x08E2
            | 0x0D4E
            | 0x110BD
            | 0x110CD
            | 0x111C2..=0x111C3
            | 0x1193F
            | 0x11941
            | 0x11A3A
            | 0x11A84..=0x11A89
            | 0x11D46
    )
}
