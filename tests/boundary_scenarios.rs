//! Literal-input boundary scenarios and the universal invariants from the
//! shaping/measurement contract. A real outline font isn't available in a
//! unit-test sandbox, so every scenario here builds its `FontCollection`
//! from an [`EmojiFont`] whose sequence table covers exactly the code
//! points the scenario exercises — this stands in for the shaping
//! primitive without depending on font file bytes.

use std::sync::Arc;

use glyphrun::{
    BidiFlags, ComputeFlags, EmojiFont, FontCollection, FontFamily, FontPaint, FontStyle,
    FontVariant, GraphemeBreak, LayoutCache, ShapedText, UnicodeBidiAnalyzer,
};

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn collection_covering(chars: &[&str]) -> Arc<FontCollection> {
    let mut emoji = EmojiFont::new("stand-in", true);
    for &s in chars {
        let seq = units(s);
        let glyph_id = seq.iter().fold(0u16, |acc, &u| acc.wrapping_add(u).wrapping_add(1));
        emoji.insert_sequence(&seq, glyph_id.max(1));
    }
    let mut family = FontFamily::new();
    family.set_variant(FontStyle::Normal, FontVariant::Emoji(Arc::new(emoji)));
    Arc::new(FontCollection::new(vec![Arc::new(family)]).unwrap())
}

fn shape(
    buf: &[u16],
    paint: &FontPaint,
    bidi_flags: BidiFlags,
    flags: ComputeFlags,
) -> ShapedText {
    ShapedText::shape(
        buf,
        0,
        buf.len(),
        paint,
        bidi_flags,
        &UnicodeBidiAnalyzer,
        &LayoutCache::new(64),
        flags,
    )
    .unwrap()
}

/// S1 — ASCII: every code unit is its own cluster, each one covered and
/// carrying a positive advance, summing to the reported total.
#[test]
fn s1_ascii_every_unit_breaks_and_advances() {
    let text = "Hello, world!";
    let buf = units(text);
    let chars: Vec<String> = text.chars().map(String::from).collect();
    let char_refs: Vec<&str> = chars.iter().map(String::as_str).collect();
    let collection = collection_covering(&char_refs);
    let paint = FontPaint::new(collection);

    let shaped = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::ADVANCES);

    assert_eq!(shaped.glyphs.len(), buf.len());
    assert!(shaped.font_indices.is_none());
    let advances = shaped.advances.as_ref().unwrap();
    assert!(advances[0] > 0.0);
    for &a in advances {
        assert!(a > 0.0);
    }
    let total: f32 = advances.iter().sum();
    assert!((total - shaped.advance).abs() < 1e-3);
}

/// S2 — surrogate pair (U+1F600): one glyph from the covering family, the
/// advance sits on the leading code unit, and the cluster break pattern is
/// `{0, 2}` only.
#[test]
fn s2_surrogate_pair_is_one_glyph_one_cluster() {
    let buf: Vec<u16> = vec![0xD83D, 0xDE00];
    let collection = collection_covering(&["\u{1F600}"]);
    let paint = FontPaint::new(collection);

    let shaped = shape(&buf, &paint, BidiFlags::OverrideLtr, ComputeFlags::ADVANCES);
    assert_eq!(shaped.glyphs.len(), 1);
    let advances = shaped.advances.unwrap();
    assert!(advances[0] > 0.0);
    assert_eq!(advances[1], 0.0);

    for k in 0..=2 {
        let is_b = GraphemeBreak::is_boundary(&buf, 0, 2, k);
        assert_eq!(is_b, k == 0 || k == 2, "offset {k}");
    }
}

/// S3 — ZWJ family sequence: a 20-code-unit cluster present verbatim in
/// the emoji table shapes to exactly one glyph with the fixed advance on
/// its leading unit, and the only cluster breaks are `{0, 20}`.
#[test]
fn s3_zwj_family_sequence_is_one_cluster_one_glyph() {
    let sequence = "\u{1F469}\u{1F3FC}\u{200D}\u{2764}\u{FE0F}\u{200D}\u{1F48B}\u{200D}\u{1F469}\u{1F3FD}";
    let buf = units(sequence);
    assert_eq!(buf.len(), 20);

    let collection = collection_covering(&[sequence]);
    let paint = FontPaint::new(collection);

    let shaped = shape(&buf, &paint, BidiFlags::OverrideLtr, ComputeFlags::ADVANCES);
    assert_eq!(shaped.glyphs.len(), 1);
    let advances = shaped.advances.unwrap();
    assert!(advances[0] > 0.0);
    assert!(advances[1..].iter().all(|&a| a == 0.0));

    let mut breaks = Vec::new();
    GraphemeBreak::for_text_run(&buf, 0, buf.len(), |b| breaks.push(b));
    assert_eq!(breaks, vec![0, 20]);
}

/// S4 — mixed BiDi: `"abc" + hebrew + "def"` under DEFAULT_LTR splits into
/// three visual runs, the middle one RTL, advances summing to the total,
/// and the ascent/descent envelope covering every run's font.
#[test]
fn s4_mixed_bidi_three_runs_middle_is_rtl() {
    let buf = units("abc\u{05D0}\u{05D1}\u{05D2}def");
    assert_eq!(buf.len(), 9);

    let collection = collection_covering(&["a", "b", "c", "\u{05D0}", "\u{05D1}", "\u{05D2}", "d", "e", "f"]);
    let paint = FontPaint::new(collection);

    let runs = UnicodeBidiAnalyzer.analyze(&buf, 0, buf.len(), BidiFlags::DefaultLtr);
    assert_eq!(runs.len(), 3);
    assert!(!runs[0].is_rtl);
    assert!(runs[1].is_rtl);
    assert!(!runs[2].is_rtl);

    let shaped = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::ADVANCES);
    let total: f32 = shaped.advances.as_ref().unwrap().iter().sum();
    assert!((total - shaped.advance).abs() < 1e-3);
    assert!(shaped.ascent > 0);
}

/// S5 — unpaired surrogate: a lone high surrogate followed by `'A'` still
/// produces two grapheme clusters with breaks at `{0,1,2}`, and shaping
/// does not panic even though the surrogate has no covering glyph.
#[test]
fn s5_unpaired_surrogate_breaks_and_does_not_panic() {
    let buf: Vec<u16> = vec![0xD83D, b'A' as u16];
    let mut breaks = Vec::new();
    GraphemeBreak::for_text_run(&buf, 0, buf.len(), |b| breaks.push(b));
    assert_eq!(breaks, vec![0, 1, 2]);

    let collection = collection_covering(&["A"]);
    let paint = FontPaint::new(collection);
    let shaped = shape(&buf, &paint, BidiFlags::OverrideLtr, ComputeFlags::ADVANCES);
    // The surrogate contributes no glyph (no family covers it); 'A' still does.
    assert_eq!(shaped.glyphs.len(), 1);
}

/// S6 — regional indicator flag pair: always one grapheme cluster
/// (`{0, 4}`); with a family that has no combined-flag entry, itemization
/// still covers the whole range and no panic occurs.
#[test]
fn s6_regional_indicator_pair_is_one_cluster() {
    let buf = units("\u{1F1FA}\u{1F1F8}");
    assert_eq!(buf.len(), 4);

    let mut breaks = Vec::new();
    GraphemeBreak::for_text_run(&buf, 0, buf.len(), |b| breaks.push(b));
    assert_eq!(breaks, vec![0, 4]);

    let collection = collection_covering(&["\u{1F1FA}\u{1F1F8}"]);
    let paint = FontPaint::new(collection);
    let shaped = shape(&buf, &paint, BidiFlags::OverrideLtr, ComputeFlags::ADVANCES);
    assert_eq!(shaped.glyphs.len(), 1);
}

// --- Universal invariants (§8) ---

/// Invariant 1: `glyphs.len() * 2 == positions.len() * 2` (one position
/// per glyph) and positions are non-decreasing in x.
#[test]
fn invariant_positions_match_glyphs_and_are_monotonic() {
    let buf = units("abc def");
    let collection = collection_covering(&["a", "b", "c", " ", "d", "e", "f"]);
    let paint = FontPaint::new(collection);
    let shaped = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::empty());

    assert_eq!(shaped.glyphs.len(), shaped.positions.len());
    for w in shaped.positions.windows(2) {
        assert!(w[1].0 >= w[0].0);
    }
}

/// Invariant 2: summed advances equal the total, within a small epsilon.
#[test]
fn invariant_summed_advances_equal_total() {
    let buf = units("abc def");
    let collection = collection_covering(&["a", "b", "c", " ", "d", "e", "f"]);
    let paint = FontPaint::new(collection);
    let shaped = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::ADVANCES);
    let total: f32 = shaped.advances.unwrap().iter().sum();
    assert!((total - shaped.advance).abs() < 1e-3);
}

/// Invariant 3: every code unit with a non-zero advance is a grapheme
/// cluster start.
#[test]
fn invariant_nonzero_advance_implies_cluster_start() {
    let text = "\u{1F469}\u{1F3FC}\u{200D}\u{2764}\u{FE0F}\u{200D}\u{1F48B}\u{200D}\u{1F469}\u{1F3FD}abc";
    let buf = units(text);
    let collection = collection_covering(&[
        "\u{1F469}\u{1F3FC}\u{200D}\u{2764}\u{FE0F}\u{200D}\u{1F48B}\u{200D}\u{1F469}\u{1F3FD}",
        "a",
        "b",
        "c",
    ]);
    let paint = FontPaint::new(collection);
    let shaped = shape(&buf, &paint, BidiFlags::OverrideLtr, ComputeFlags::ADVANCES);
    let advances = shaped.advances.unwrap();

    for (k, &a) in advances.iter().enumerate() {
        if a != 0.0 {
            assert!(GraphemeBreak::is_boundary(&buf, 0, buf.len(), k), "offset {k} not a cluster start");
        }
    }
}

/// Invariant 4: `is_boundary(k) == (following(k - 1) == k)` for every `k`
/// strictly inside the range.
#[test]
fn invariant_is_boundary_matches_following() {
    let buf = units("a\u{0301}b\u{05D0}\u{05D1}c");
    for k in 1..buf.len() {
        let is_b = GraphemeBreak::is_boundary(&buf, 0, buf.len(), k);
        let follow_prev = GraphemeBreak::following(&buf, 0, buf.len(), k - 1) == k;
        assert_eq!(is_b, follow_prev, "offset {k}");
    }
}

/// Invariant 5: idempotence — shaping the same input twice (even through
/// separate cache instances) produces byte-identical glyph/position output.
#[test]
fn invariant_shaping_is_idempotent() {
    let buf = units("abc def");
    let collection = collection_covering(&["a", "b", "c", " ", "d", "e", "f"]);
    let paint = FontPaint::new(collection);

    let first = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::ADVANCES);
    let second = shape(&buf, &paint, BidiFlags::DefaultLtr, ComputeFlags::ADVANCES);

    assert_eq!(first.glyphs, second.glyphs);
    assert_eq!(first.positions, second.positions);
    assert_eq!(first.advances, second.advances);
    assert_eq!(first.advance, second.advance);
}

/// Invariant 6: cache determinism — a cached lookup's observable output
/// equals a fresh construction with the same arguments.
#[test]
fn invariant_cache_determinism() {
    let buf = units("abc");
    let collection = collection_covering(&["a", "b", "c"]);
    let paint = FontPaint::new(collection);
    let cache = LayoutCache::new(64);

    let first = ShapedText::shape(
        &buf,
        0,
        buf.len(),
        &paint,
        BidiFlags::DefaultLtr,
        &UnicodeBidiAnalyzer,
        &cache,
        ComputeFlags::ADVANCES,
    )
    .unwrap();
    let second = ShapedText::shape(
        &buf,
        0,
        buf.len(),
        &paint,
        BidiFlags::DefaultLtr,
        &UnicodeBidiAnalyzer,
        &cache,
        ComputeFlags::ADVANCES,
    )
    .unwrap();

    assert_eq!(first.glyphs, second.glyphs);
    assert_eq!(first.advances, second.advances);
}

/// Invariant 7: itemiser coverage — the union of returned runs over
/// `[offset, limit)` equals `[offset, limit)` exactly, contiguous and
/// non-overlapping.
#[test]
fn invariant_itemizer_covers_input_contiguously() {
    let text = "abc\u{05D0}\u{05D1}def\u{1F600}ghi";
    let buf = units(text);
    let collection = collection_covering(&["a", "b", "c", "\u{05D0}", "\u{05D1}", "d", "e", "f", "\u{1F600}", "g", "h", "i"]);

    let runs = collection.itemize(&buf, 0, buf.len(), 64);

    assert!(!runs.is_empty());
    assert_eq!(runs[0].start, 0);
    assert_eq!(runs.last().unwrap().limit, buf.len());
    for w in runs.windows(2) {
        assert_eq!(w[0].limit, w[1].start, "gap or overlap between runs");
    }
}

/// Invariant 8: single-style path equivalence — `MeasuredText`'s advance
/// over the whole buffer matches `ShapedText::advance` computed directly
/// under `OVERRIDE_LTR` with the same paint.
#[test]
fn invariant_single_style_path_equivalence() {
    use glyphrun::{BidiAnalyzer, MeasuredTextBuilder};

    let buf = units("abc def");
    let collection = collection_covering(&["a", "b", "c", " ", "d", "e", "f"]);
    let paint = FontPaint::new(collection);
    let cache = LayoutCache::new(64);
    let analyzer: &dyn BidiAnalyzer = &UnicodeBidiAnalyzer;

    let mut builder = MeasuredTextBuilder::new(&buf, 0, buf.len(), &cache, analyzer);
    builder.add_style_run(buf.len(), &paint, BidiFlags::OverrideLtr).unwrap();
    let measured = builder.build().unwrap();

    let shaped = ShapedText::shape(
        &buf,
        0,
        buf.len(),
        &paint,
        BidiFlags::OverrideLtr,
        analyzer,
        &cache,
        ComputeFlags::ADVANCES,
    )
    .unwrap();

    assert!((measured.get_advance_range(0, buf.len()) - shaped.advance).abs() < 1e-3);
}
