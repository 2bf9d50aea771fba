//! Font itemization: partitioning a buffer into font-homogeneous runs.

use std::sync::Arc;

use unicode_script::{Script, UnicodeScript};

use crate::codepoint::CodePointUtils;
use crate::error::{ShapeError, ShapeResult};
use crate::font::emoji::is_emoji_break;
use crate::font::{Font, FontFamily, FontVariant};

/// A maximal contiguous range of code units covered by a common, ordered
/// list of candidate families (best match first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRun {
    pub families: Vec<usize>,
    pub start: usize,
    pub limit: usize,
}

impl FontRun {
    pub fn primary(&self) -> usize {
        self.families[0]
    }
}

/// A non-empty, ordered fallback list of font families.
pub struct FontCollection {
    families: Vec<Arc<FontFamily>>,
}

const MAX_SCORE_CANDIDATES: usize = 2;
const MAX_EMOJI_FALLBACKS: usize = 8;

impl FontCollection {
    pub fn new(families: Vec<Arc<FontFamily>>) -> ShapeResult<Self> {
        if families.is_empty() {
            return Err(ShapeError::EmptyFontCollection);
        }
        Ok(Self { families })
    }

    pub fn families(&self) -> &[Arc<FontFamily>] {
        &self.families
    }

    pub fn family(&self, index: usize) -> &Arc<FontFamily> {
        &self.families[index]
    }

    /// Partitions `buf[start..limit)` into at most `run_limit` font runs.
    pub fn itemize(&self, buf: &[u16], start: usize, limit: usize, run_limit: usize) -> Vec<FontRun> {
        let mut runs: Vec<FontRun> = Vec::new();
        let mut current: Option<FontRun> = None;
        let mut pending_start: Option<usize> = None;
        let mut prev_ch: Option<char> = None;

        let mut i = start;
        while i < limit {
            let (ch, n) = CodePointUtils::decode_at(buf, i);

            if CodePointUtils::is_no_font_needed(ch) {
                if let Some(cur) = current.as_mut() {
                    cur.limit = i + n;
                } else {
                    pending_start.get_or_insert(i);
                }
                prev_ch = Some(ch);
                i += n;
                continue;
            }

            let keep_current = current.as_ref().is_some_and(|cur| {
                (CodePointUtils::is_sticky_whitelisted(ch) || CodePointUtils::is_combining_mark(ch))
                    && self.any_family_covers(&cur.families, ch, cur.families[0])
            });
            if keep_current {
                let cur = current.as_mut().unwrap();
                cur.limit = i + n;
                prev_ch = Some(ch);
                i += n;
                continue;
            }

            let candidates = self.score_candidates(ch, None);

            let continued = if let (Some(cur), Some(prev)) = (current.as_ref(), prev_ch) {
                let prev_is_color_emoji = self.families[cur.families[0]].is_color_emoji;
                if prev_is_color_emoji && !candidates.is_empty() {
                    let intersection: Vec<usize> = cur
                        .families
                        .iter()
                        .copied()
                        .filter(|f| candidates.contains(f))
                        .collect();
                    if !intersection.is_empty() && !is_emoji_break(prev, ch) {
                        Some(intersection)
                    } else {
                        None
                    }
                } else {
                    None
                }
            } else {
                None
            };

            if let Some(families) = continued {
                let cur = current.as_mut().unwrap();
                cur.families = families;
                cur.limit = i + n;
            } else {
                if let Some(finished) = current.take() {
                    runs.push(finished);
                }
                let families = if candidates.is_empty() {
                    log::trace!("no family covers {:?} at unit {}, falling back to family 0", ch, i);
                    vec![0]
                } else {
                    candidates
                };
                let run_start = pending_start.take().unwrap_or(i);
                let mut new_run = FontRun {
                    families,
                    start: run_start,
                    limit: i + n,
                };

                let transfer_eligible = prev_ch.is_some_and(|p| {
                    CodePointUtils::is_combining_mark(ch) || CodePointUtils::is_emoji_modifier(ch)
                });
                if transfer_eligible {
                    if let (Some(prev), Some(last_run)) = (prev_ch, runs.last_mut()) {
                        if last_run.limit > last_run.start
                            && self.any_family_covers(&new_run.families, prev, new_run.families[0])
                        {
                            let prev_units = CodePointUtils::utf16_len(prev);
                            if last_run.limit - prev_units >= last_run.start {
                                last_run.limit -= prev_units;
                                new_run.start -= prev_units;
                                if last_run.start == last_run.limit {
                                    runs.pop();
                                }
                            }
                        }
                    }
                }

                current = Some(new_run);
            }

            prev_ch = Some(ch);
            i += n;
        }

        if let Some(cur) = current.take() {
            runs.push(cur);
        }

        if runs.is_empty() {
            return vec![FontRun {
                families: vec![0],
                start,
                limit,
            }];
        }

        if runs.len() > run_limit && run_limit > 0 {
            runs.truncate(run_limit);
            if let Some(last) = runs.last_mut() {
                last.limit = limit;
            }
        }

        runs
    }

    fn any_family_covers(&self, family_indices: &[usize], ch: char, default_idx: usize) -> bool {
        let is_color_emoji_run = family_indices
            .first()
            .is_some_and(|&idx| self.families[idx].is_color_emoji);
        if is_color_emoji_run {
            family_indices
                .iter()
                .any(|&idx| self.families[idx].variants().any(|v| v.has_glyph(ch, None)))
        } else {
            self.families[default_idx]
                .variants()
                .any(|v| v.has_glyph(ch, None))
        }
    }

    /// Scores every family for coverage of `(ch, variation_selector)`,
    /// returning up to two tied best-scoring candidates, with up to eight
    /// additional colour-emoji fallbacks unioned in when the winner is
    /// itself colour-emoji.
    fn score_candidates(&self, ch: char, variation_selector: Option<char>) -> Vec<usize> {
        let mut best_score = 0u8;
        let mut scored: Vec<(usize, u8)> = Vec::new();

        for (idx, family) in self.families.iter().enumerate() {
            let score = self.coverage_score(ch, variation_selector, family);
            if score == 0 {
                continue;
            }
            scored.push((idx, score));
            if score > best_score {
                best_score = score;
            }
        }

        let mut winners: Vec<usize> = scored
            .iter()
            .filter(|(_, s)| *s == best_score)
            .map(|(idx, _)| *idx)
            .take(MAX_SCORE_CANDIDATES)
            .collect();

        if let Some(&first) = winners.first() {
            if self.families[first].is_color_emoji {
                for (idx, score) in &scored {
                    if winners.len() >= MAX_EMOJI_FALLBACKS {
                        break;
                    }
                    if *score == best_score
                        && self.families[*idx].is_color_emoji
                        && !winners.contains(idx)
                    {
                        winners.push(*idx);
                    }
                }
            }
        }

        winners
    }

    fn coverage_score(&self, ch: char, variation_selector: Option<char>, family: &FontFamily) -> u8 {
        if family.is_east_asian && !is_east_asian_script(ch) {
            return 0;
        }
        if !family.variants().any(|v| v.has_glyph(ch, variation_selector)) {
            return 0;
        }
        let vs_matches = match variation_selector {
            Some(vs) if CodePointUtils::is_emoji_variation_selector(vs as u32) => {
                family.is_color_emoji
            }
            Some(vs) if CodePointUtils::is_text_variation_selector(vs as u32) => {
                !family.is_color_emoji
            }
            _ => false,
        };
        if vs_matches {
            2
        } else {
            1
        }
    }
}

/// Scripts an east-asian-exclusive family is still allowed to cover.
fn is_east_asian_script(ch: char) -> bool {
    matches!(
        ch.script(),
        Script::Han
            | Script::Bopomofo
            | Script::Hiragana
            | Script::Katakana
            | Script::Hangul
            | Script::Yi
            | Script::Nushu
            | Script::Lisu
            | Script::Miao
            | Script::Tangut
            | Script::Khitan_Small_Script
            | Script::Inherited
            | Script::Common
    )
}
