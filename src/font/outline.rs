//! A single rasterisable outline face, backed by `ttf-parser` for glyph
//! coverage and metrics lookup and by `swash` for the complex shaping
//! pass — the "platform shaping primitive" the design leaves pluggable.

use swash::shape::ShapeContext;
use swash::text::Script as SwashScript;
use swash::FontRef;

use parking_lot::Mutex;
use unicode_script::{Script as UniScript, UnicodeScript};

use crate::font::{Font, GlyphScore, LayoutSink, PixelBounds};
use crate::grapheme::GraphemeBreak;
use crate::paint::{FontMetricsInt, FontPaint, FontStyle};

/// An owned sfnt blob, reparsed into a borrowed `ttf-parser::Face` on each
/// lookup (parsing a table directory is cheap relative to a shaping call).
pub struct OutlineFont {
    data: Box<[u8]>,
    face_index: u32,
    style: FontStyle,
    family: String,
    full_name: String,
    is_fallback: bool,
    /// `swash`'s shape context is not `Sync`-friendly to share without
    /// synchronization; the reference engine shares one context behind a
    /// mutex because call paths are short.
    shape_context: Mutex<ShapeContext>,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.family)
            .field("style", &self.style)
            .field("is_fallback", &self.is_fallback)
            .finish()
    }
}

impl OutlineFont {
    pub fn from_bytes(data: Vec<u8>, face_index: u32, style: FontStyle) -> Option<Self> {
        let face = ttf_parser::Face::parse(&data, face_index).ok()?;
        let family = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::FAMILY)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let full_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::FULL_NAME)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| family.clone());

        Some(Self {
            data: data.into_boxed_slice(),
            face_index,
            style,
            family,
            full_name,
            is_fallback: false,
            shape_context: Mutex::new(ShapeContext::new()),
        })
    }

    pub fn with_fallback_flag(mut self, is_fallback: bool) -> Self {
        self.is_fallback = is_fallback;
        self
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.face_index).ok()
    }

    fn swash_font(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.face_index as usize)
    }
}

impl Font for OutlineFont {
    fn style(&self) -> FontStyle {
        self.style
    }

    fn family_name(&self, _locale: &str) -> &str {
        &self.family
    }

    fn full_name(&self, _locale: &str) -> &str {
        &self.full_name
    }

    fn has_glyph(&self, cp: char, variation_selector: Option<char>) -> bool {
        let Some(face) = self.face() else {
            return false;
        };
        if let Some(vs) = variation_selector {
            if let Some(id) = face.glyph_variation_index(cp, vs) {
                return id.0 != 0;
            }
        }
        face.glyph_index(cp).is_some()
    }

    fn metrics(&self, paint: &FontPaint) -> FontMetricsInt {
        let Some(face) = self.face() else {
            return FontMetricsInt::default();
        };
        let upm = face.units_per_em().max(1) as f32;
        let scale = paint.size() / upm;
        let ascent = (face.ascender() as f32 * scale).round().max(0.0) as i32;
        let descent = (-(face.descender() as f32) * scale).round().max(0.0) as i32;
        let leading = (face.line_gap() as f32 * scale).round().max(0.0) as i32;
        FontMetricsInt::new(ascent, descent, leading)
    }

    fn complex_layout(
        &self,
        buf: &[u16],
        context_start: usize,
        context_limit: usize,
        layout_start: usize,
        layout_limit: usize,
        _is_rtl: bool,
        paint: &FontPaint,
        sink: &mut LayoutSink<'_>,
    ) {
        if layout_start >= layout_limit {
            return;
        }
        let Some(font) = self.swash_font() else {
            return;
        };
        // Shape the whole analysed context, not just the word: cursive
        // joining and reordering need to see neighbouring text even though
        // only `[layout_start, layout_limit)`'s glyphs are emitted here.
        let context_text = crate::codepoint::CodePointUtils::to_string_lossy(
            &buf[context_start..context_limit],
        );
        let script = primary_script(buf, layout_start, layout_limit);

        let mut ctx = self.shape_context.lock();
        let mut shaper = ctx
            .builder(font)
            .script(script)
            .size(paint.size())
            .build();
        shaper.add_str(&context_text);

        let hinted = paint.is_hinted();
        let mut pen_x = 0.0f32;
        let mut base_pen_x: Option<f32> = None;
        let mut advances_acc: Vec<(usize, f32)> = Vec::new();

        shaper.shape_with(|cluster| {
            let cluster_unit_start =
                context_start + utf8_to_unit16_offset(&context_text, cluster.source.start as usize);
            let in_range = cluster_unit_start >= layout_start && cluster_unit_start < layout_limit;
            if in_range && base_pen_x.is_none() {
                base_pen_x = Some(pen_x);
            }
            let mut cluster_advance = 0.0f32;
            for glyph in cluster.glyphs {
                let advance = glyph.advance;
                if in_range {
                    let mut x = pen_x - base_pen_x.unwrap_or(pen_x) + glyph.x;
                    let mut y = glyph.y;
                    if hinted {
                        x = (x + 0.95).ceil();
                        y = (y + 0.95).ceil();
                    }
                    sink.glyphs.push(glyph.id);
                    sink.positions.push((x, y));
                    if let Some(ref mut bounds) = sink.bounds {
                        let glyph_bounds = PixelBounds {
                            left: x,
                            top: y,
                            right: x + advance,
                            bottom: y,
                        };
                        bounds.union(&glyph_bounds);
                    }
                }
                pen_x += advance;
                cluster_advance += advance;
            }
            if in_range {
                advances_acc.push((cluster_unit_start - layout_start, cluster_advance));
            }
        });

        if let Some(ref mut advances) = sink.advances {
            for (offset, advance) in advances_acc {
                if offset < advances.len() {
                    advances[offset] += advance;
                }
            }
        }
    }

    fn calc_glyph_score(&self, buf: &[u16], start: usize, limit: usize) -> GlyphScore {
        let mut i = start;
        while i < limit {
            let (c, n) = crate::codepoint::CodePointUtils::decode_at(buf, i);
            if !self.has_glyph(c, None) {
                break;
            }
            i += n;
        }
        GlyphScore {
            covered_units: i - start,
            penalty: if self.is_fallback { 1 } else { 0 },
        }
    }
}

/// Scans `buf[start..limit)` for the first codepoint whose Unicode script
/// maps onto a distinct `swash` shaping script, falling back to `Latin`
/// (swash's default) for script-neutral or unmapped runs.
fn primary_script(buf: &[u16], start: usize, limit: usize) -> SwashScript {
    let mut i = start;
    while i < limit {
        let (ch, advance) = crate::codepoint::CodePointUtils::decode_at(buf, i);
        if let Some(mapped) = to_swash_script(ch.script()) {
            return mapped;
        }
        i += advance;
    }
    SwashScript::Latin
}

fn to_swash_script(script: UniScript) -> Option<SwashScript> {
    Some(match script {
        UniScript::Arabic => SwashScript::Arabic,
        UniScript::Hebrew => SwashScript::Hebrew,
        UniScript::Syriac => SwashScript::Syriac,
        UniScript::Thaana => SwashScript::Thaana,
        UniScript::Devanagari => SwashScript::Devanagari,
        UniScript::Bengali => SwashScript::Bengali,
        UniScript::Gurmukhi => SwashScript::Gurmukhi,
        UniScript::Gujarati => SwashScript::Gujarati,
        UniScript::Oriya => SwashScript::Oriya,
        UniScript::Tamil => SwashScript::Tamil,
        UniScript::Telugu => SwashScript::Telugu,
        UniScript::Kannada => SwashScript::Kannada,
        UniScript::Malayalam => SwashScript::Malayalam,
        UniScript::Sinhala => SwashScript::Sinhala,
        UniScript::Thai => SwashScript::Thai,
        UniScript::Lao => SwashScript::Lao,
        UniScript::Khmer => SwashScript::Khmer,
        UniScript::Myanmar => SwashScript::Myanmar,
        UniScript::Tibetan => SwashScript::Tibetan,
        UniScript::Mongolian => SwashScript::Mongolian,
        UniScript::Ethiopic => SwashScript::Ethiopic,
        UniScript::Cherokee => SwashScript::Cherokee,
        UniScript::Han => SwashScript::Han,
        UniScript::Hiragana => SwashScript::Hiragana,
        UniScript::Katakana => SwashScript::Katakana,
        UniScript::Hangul => SwashScript::Hangul,
        UniScript::Bopomofo => SwashScript::Bopomofo,
        UniScript::Yi => SwashScript::Yi,
        UniScript::Armenian => SwashScript::Armenian,
        UniScript::Georgian => SwashScript::Georgian,
        UniScript::Cyrillic => SwashScript::Cyrillic,
        UniScript::Greek => SwashScript::Greek,
        UniScript::Latin => SwashScript::Latin,
        _ => return None,
    })
}

fn utf8_to_unit16_offset(s: &str, byte_offset: usize) -> usize {
    s.get(..byte_offset)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or_else(|| s.encode_utf16().count())
}

/// Cluster-start offsets, used by callers assembling `advances` from a
/// `LayoutSink` in terms of grapheme clusters rather than shaper clusters.
pub fn cluster_starts(buf: &[u16], start: usize, limit: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    GraphemeBreak::for_text_run(buf, start, limit, |pos| {
        if pos < limit {
            starts.push(pos);
        }
    });
    starts
}

/// Hand-assembled minimal valid TrueType font: a `.notdef` glyph and one
/// glyph mapped from `'A'`, both zero-contour. Checksums are left at zero —
/// neither `ttf-parser` nor `swash` validates them, only the table
/// directory's tags/offsets/lengths matter for parsing. Exposed at
/// module scope (not inside `mod tests`) so other modules' tests needing a
/// real `OutlineFont` can build one too.
#[cfg(test)]
pub(crate) fn minimal_ttf() -> Vec<u8> {
    fn be16(v: u16) -> [u8; 2] {
        v.to_be_bytes()
    }
    fn be32(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }
    fn pad_to_4(mut data: Vec<u8>) -> Vec<u8> {
        while data.len() % 4 != 0 {
            data.push(0);
        }
        data
    }

    let mut cmap = Vec::new();
    cmap.extend(be16(0)); // version
    cmap.extend(be16(1)); // numTables
    cmap.extend(be16(3)); // platformID: Windows
    cmap.extend(be16(1)); // encodingID: Unicode BMP
    cmap.extend(be32(12)); // subtable offset
    cmap.extend(be16(4)); // format
    cmap.extend(be16(32)); // length
    cmap.extend(be16(0)); // language
    cmap.extend(be16(4)); // segCountX2 (2 segments)
    cmap.extend(be16(4)); // searchRange
    cmap.extend(be16(1)); // entrySelector
    cmap.extend(be16(0)); // rangeShift
    cmap.extend(be16(0x0041)); // endCode[0]: 'A'
    cmap.extend(be16(0xFFFF)); // endCode[1]: terminator
    cmap.extend(be16(0)); // reservedPad
    cmap.extend(be16(0x0041)); // startCode[0]
    cmap.extend(be16(0xFFFF)); // startCode[1]
    cmap.extend(be16((1i32 - 0x41i32) as u16)); // idDelta[0]: 'A' -> glyph 1
    cmap.extend(be16(1)); // idDelta[1]: terminator -> glyph 0
    cmap.extend(be16(0)); // idRangeOffset[0]
    cmap.extend(be16(0)); // idRangeOffset[1]

    let glyf: Vec<u8> = Vec::new(); // both glyphs are zero-contour
    let loca: Vec<u8> = vec![0u8; 6]; // 3 short offsets (numGlyphs + 1), all zero

    let mut head = Vec::new();
    head.extend(be16(1)); // majorVersion
    head.extend(be16(0)); // minorVersion
    head.extend(be32(0x0001_0000)); // fontRevision
    head.extend(be32(0)); // checkSumAdjustment
    head.extend(be32(0x5F0F_3CF5)); // magicNumber
    head.extend(be16(0)); // flags
    head.extend(be16(1000)); // unitsPerEm
    head.extend([0u8; 8]); // created
    head.extend([0u8; 8]); // modified
    head.extend(be16(0)); // xMin
    head.extend(be16(0)); // yMin
    head.extend(be16(0)); // xMax
    head.extend(be16(0)); // yMax
    head.extend(be16(0)); // macStyle
    head.extend(be16(8)); // lowestRecPPEM
    head.extend(be16(2)); // fontDirectionHint
    head.extend(be16(0)); // indexToLocFormat: short
    head.extend(be16(0)); // glyphDataFormat

    let mut hhea = Vec::new();
    hhea.extend(be16(1)); // majorVersion
    hhea.extend(be16(0)); // minorVersion
    hhea.extend(be16(800)); // ascender
    hhea.extend(be16((-200i16) as u16)); // descender
    hhea.extend(be16(0)); // lineGap
    hhea.extend(be16(500)); // advanceWidthMax
    hhea.extend(be16(0)); // minLeftSideBearing
    hhea.extend(be16(0)); // minRightSideBearing
    hhea.extend(be16(0)); // xMaxExtent
    hhea.extend(be16(1)); // caretSlopeRise
    hhea.extend(be16(0)); // caretSlopeRun
    hhea.extend(be16(0)); // caretOffset
    hhea.extend(be16(0)); // reserved
    hhea.extend(be16(0)); // reserved
    hhea.extend(be16(0)); // reserved
    hhea.extend(be16(0)); // reserved
    hhea.extend(be16(0)); // metricDataFormat
    hhea.extend(be16(2)); // numberOfHMetrics

    let mut maxp = Vec::new();
    maxp.extend(be32(0x0001_0000)); // version 1.0
    maxp.extend(be16(2)); // numGlyphs
    maxp.extend(be16(0)); // maxPoints
    maxp.extend(be16(0)); // maxContours
    maxp.extend(be16(0)); // maxCompositePoints
    maxp.extend(be16(0)); // maxCompositeContours
    maxp.extend(be16(1)); // maxZones
    maxp.extend(be16(0)); // maxTwilightPoints
    maxp.extend(be16(0)); // maxStorage
    maxp.extend(be16(0)); // maxFunctionDefs
    maxp.extend(be16(0)); // maxInstructionDefs
    maxp.extend(be16(0)); // maxStackElements
    maxp.extend(be16(0)); // maxSizeOfInstructions
    maxp.extend(be16(0)); // maxComponentElements
    maxp.extend(be16(0)); // maxComponentDepth

    let mut hmtx = Vec::new();
    hmtx.extend(be16(0)); // glyph 0 advanceWidth
    hmtx.extend(be16(0)); // glyph 0 lsb
    hmtx.extend(be16(500)); // glyph 1 advanceWidth
    hmtx.extend(be16(0)); // glyph 1 lsb

    let tables: [(&[u8; 4], Vec<u8>); 7] = [
        (b"cmap", cmap),
        (b"glyf", glyf),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"loca", loca),
        (b"maxp", maxp),
    ];

    let num_tables = tables.len() as u16;
    let mut search_range: u16 = 1;
    let mut entry_selector: u16 = 0;
    while (search_range as u32) * 2 <= num_tables as u32 {
        search_range *= 2;
        entry_selector += 1;
    }
    search_range *= 16;
    let range_shift = num_tables * 16 - search_range;

    let header_len = 12 + 16 * tables.len();
    let padded_tables: Vec<Vec<u8>> = tables.iter().map(|(_, raw)| pad_to_4(raw.clone())).collect();
    let mut cursor = header_len as u32;
    let mut offsets = Vec::with_capacity(tables.len());
    for padded in &padded_tables {
        offsets.push(cursor);
        cursor += padded.len() as u32;
    }

    let mut out = Vec::new();
    out.extend(be32(0x0001_0000)); // sfnt version: TrueType
    out.extend(be16(num_tables));
    out.extend(be16(search_range));
    out.extend(be16(entry_selector));
    out.extend(be16(range_shift));
    for (i, (tag, raw)) in tables.iter().enumerate() {
        out.extend(tag.iter().copied());
        out.extend(be32(0)); // checkSum: unchecked by ttf-parser/swash
        out.extend(be32(offsets[i]));
        out.extend(be32(raw.len() as u32));
    }
    for padded in &padded_tables {
        out.extend(padded);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontFamily;
    use std::sync::Arc;

    fn single_outline_collection(font: Arc<OutlineFont>) -> Arc<crate::font::FontCollection> {
        let mut family = FontFamily::new();
        family.set_variant(FontStyle::Normal, crate::font::FontVariant::Outline(font));
        Arc::new(crate::font::FontCollection::new(vec![Arc::new(family)]).unwrap())
    }

    #[test]
    fn from_bytes_parses_a_minimal_sfnt() {
        let font = OutlineFont::from_bytes(minimal_ttf(), 0, FontStyle::Normal).unwrap();
        assert!(font.has_glyph('A', None));
        assert!(!font.has_glyph('Z', None));
    }

    #[test]
    fn complex_layout_shapes_a_covered_codepoint() {
        let font = OutlineFont::from_bytes(minimal_ttf(), 0, FontStyle::Normal).unwrap();
        let collection = single_outline_collection(Arc::new(
            OutlineFont::from_bytes(minimal_ttf(), 0, FontStyle::Normal).unwrap(),
        ));
        let paint = FontPaint::new(collection);

        let buf: Vec<u16> = "A".encode_utf16().collect();
        let mut glyphs = Vec::new();
        let mut positions = Vec::new();
        let mut advances = vec![0.0f32; buf.len()];
        let mut sink = LayoutSink {
            glyphs: &mut glyphs,
            positions: &mut positions,
            advances: Some(&mut advances),
            bounds: None,
        };

        font.complex_layout(&buf, 0, buf.len(), 0, buf.len(), false, &paint, &mut sink);

        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs[0], 1);
        assert!(advances[0] > 0.0);
    }

    #[test]
    fn complex_layout_only_emits_glyphs_within_the_layout_range() {
        let font = OutlineFont::from_bytes(minimal_ttf(), 0, FontStyle::Normal).unwrap();
        let collection = single_outline_collection(Arc::new(
            OutlineFont::from_bytes(minimal_ttf(), 0, FontStyle::Normal).unwrap(),
        ));
        let paint = FontPaint::new(collection);

        // A two-character context; only the second 'A' is the word being
        // laid out, but the whole buffer is passed as shaping context.
        let buf: Vec<u16> = "AA".encode_utf16().collect();
        let mut glyphs = Vec::new();
        let mut positions = Vec::new();
        let mut sink = LayoutSink {
            glyphs: &mut glyphs,
            positions: &mut positions,
            advances: None,
            bounds: None,
        };

        font.complex_layout(&buf, 0, buf.len(), 1, buf.len(), false, &paint, &mut sink);

        assert_eq!(glyphs.len(), 1);
        // the emitted position stays relative to layout_start even though
        // shaping ran over the wider context.
        assert_eq!(positions[0].0, 0.0);
    }

    #[test]
    fn primary_script_maps_arabic_text_and_falls_back_to_latin() {
        let arabic: Vec<u16> = "\u{0627}".encode_utf16().collect(); // ALEF
        assert_eq!(primary_script(&arabic, 0, arabic.len()), SwashScript::Arabic);

        let latin: Vec<u16> = "abc".encode_utf16().collect();
        assert_eq!(primary_script(&latin, 0, latin.len()), SwashScript::Latin);

        let digits: Vec<u16> = "123".encode_utf16().collect();
        assert_eq!(primary_script(&digits, 0, digits.len()), SwashScript::Latin);
    }
}
