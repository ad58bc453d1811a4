//! Single-pass reconstruction of page structure from grouped items.
//!
//! The `Reconstructor` walks the item list once, in source order, carrying
//! all accumulator state: pending staff lines, pending bar-line candidates,
//! and buffered clef/time-signature glyphs. Every fifth staff line closes a
//! stave, which immediately resolves pending bar candidates and buffered
//! annotators against the new bounds. Ordering guarantees come entirely
//! from processing items in their original source order.

use crate::geometry::{self, LineClass};
use crate::glyphs::{self, GlyphClass, NoteGlyph, TextGlyph};
use crate::model::{TimeSignature, VoiceElement};
use crate::stave::{find_stave, BarLineCandidate, PianoPair, Stave, Symbol, SymbolKind, System};
use crate::tokens::Item;
use crate::voice::build_voice;

/// Horizontal inset applied to a flag marker's trailing edge when recording
/// its symbol position.
const FLAG_BAR_INSET: f64 = 22.0;

// ── Overlay colors per classification ───────────────────────────────
const HL_BAR_CANDIDATE: [&str; 3] = ["0", "0.5", "1"];
const HL_SHORT_LINE: [&str; 3] = ["0.5", "1", "0.5"];
const HL_STAFF_LINE: [&str; 3] = ["0.2", "0.2", "0.2"];
const HL_STAVE_CLOSE: [&str; 3] = ["0.5", "0", "1"];
const HL_NOTE: [&str; 3] = ["0.5", "0", "0"];
const HL_NOTE_LOST: [&str; 3] = ["1", "0", "0"];
const HL_CLEF: [&str; 3] = ["0.8", "0", "0"];
const HL_TIME_SIG: [&str; 3] = ["0.6", "0", "0"];
const HL_FLAG_MARKER: [&str; 3] = ["0", "0.6", "0"];

/// A buffered clef glyph awaiting a stave whose bounds contain it.
#[derive(Debug, Clone, Copy)]
struct PendingClef {
    clef: crate::model::Clef,
    y: f64,
}

/// A buffered time-signature digit; assigned in (denominator, numerator)
/// pairs.
#[derive(Debug, Clone, Copy)]
struct PendingTimeSigDigit {
    value: i32,
    y: f64,
}

/// Everything reconstructed from one page's item list.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStructure {
    pub staves: Vec<Stave>,
    pub systems: Vec<System>,
    pub piano_pairs: Vec<PianoPair>,
    /// Canonical staff-line length (informational only).
    pub staff_length: Option<f64>,
}

/// The pipeline-state object for one page scan.
#[derive(Debug, Default)]
pub struct Reconstructor {
    staff_lines: Vec<f64>,
    staff_length: Option<f64>,
    bar_candidates: Vec<BarLineCandidate>,
    staves: Vec<Stave>,
    systems: Vec<System>,
    piano_pairs: Vec<PianoPair>,
    system_start: usize,
    clefs: Vec<PendingClef>,
    time_signatures: Vec<PendingTimeSigDigit>,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one item, annotating it with its overlay color.
    ///
    /// Unrecognized shapes are no-ops; a note, rest, or flag marker that no
    /// stave can own is fatal for the page.
    pub fn process_item(&mut self, item: &mut Item) -> Result<(), String> {
        if item.commands.len() < 2 {
            return Ok(());
        }

        if item.op(1) == "m" {
            self.process_line(item);
            return Ok(());
        }
        if let Some(glyph) = glyphs::decode_text_item(item) {
            return self.process_glyph(item, glyph);
        }
        if let Some(marker) = geometry::classify_filled_marker(item) {
            let index = find_stave(&self.staves, marker.y1).ok_or_else(|| {
                format!("no stave within range of flag marker at y={}", marker.y1)
            })?;
            item.set_fill_highlight(HL_FLAG_MARKER);
            self.staves[index].symbols.push(Symbol {
                kind: SymbolKind::FlagBar { limit: marker.x1 },
                x: marker.x2 - FLAG_BAR_INSET,
            });
        }
        Ok(())
    }

    fn process_line(&mut self, item: &mut Item) {
        match geometry::classify_line(item) {
            Some(LineClass::Vertical { x, y_top, y_bottom }) => {
                self.bar_candidates.push(BarLineCandidate { x, y_top, y_bottom });
                item.set_stroke_highlight(HL_BAR_CANDIDATE);
            }
            Some(LineClass::ShortHorizontal) => {
                item.set_stroke_highlight(HL_SHORT_LINE);
            }
            Some(LineClass::StaffLine { y, length }) => {
                if self.staff_lines.is_empty() {
                    self.staff_length = Some(length);
                }
                self.staff_lines.push(y);
                if self.staff_lines.len() == 5 {
                    item.set_stroke_highlight(HL_STAVE_CLOSE);
                    self.close_stave();
                } else {
                    item.set_stroke_highlight(HL_STAFF_LINE);
                }
            }
            None => {}
        }
    }

    fn process_glyph(&mut self, item: &mut Item, glyph: TextGlyph) -> Result<(), String> {
        match glyphs::classify_glyph(&glyph.code) {
            Some(GlyphClass::Note(note)) => {
                // Pending vertical lines were note stems, not bar lines.
                self.bar_candidates.clear();

                let index = match find_stave(&self.staves, glyph.y) {
                    Some(i) => {
                        item.set_fill_highlight(HL_NOTE);
                        i
                    }
                    None => {
                        item.set_fill_highlight(HL_NOTE_LOST);
                        return Err(format!(
                            "no stave within range of glyph {} at y={}",
                            glyph.code, glyph.y
                        ));
                    }
                };
                let x = if glyphs::is_nudged_code(&glyph.code) {
                    glyph.x + 0.1
                } else {
                    glyph.x
                };
                let kind = match note {
                    NoteGlyph::Head => SymbolKind::NoteHead { y: glyph.y },
                    NoteGlyph::Dot => SymbolKind::Dot,
                    NoteGlyph::EighthFlag => SymbolKind::EighthFlag,
                    NoteGlyph::Rest(quarter_length) => SymbolKind::Rest { quarter_length },
                };
                self.staves[index].symbols.push(Symbol { kind, x });
            }
            Some(GlyphClass::Clef(clef)) => {
                self.clefs.push(PendingClef { clef, y: glyph.y });
                item.set_fill_highlight(HL_CLEF);
            }
            Some(GlyphClass::TimeSignatureDigit(value)) => {
                self.time_signatures.push(PendingTimeSigDigit { value, y: glyph.y });
                item.set_fill_highlight(HL_TIME_SIG);
            }
            None => {
                log::debug!(
                    "unclassified glyph code {} at ({}, {})",
                    glyph.code,
                    glyph.x,
                    glyph.y
                );
            }
        }
        Ok(())
    }

    // ── Stave closure ───────────────────────────────────────────────

    /// Close a stave over the five accumulated staff lines, then resolve
    /// every pending bar candidate and the buffered annotators against it.
    fn close_stave(&mut self) {
        let mut stave = Stave::close(std::mem::take(&mut self.staff_lines));
        let (min_y, max_y) = stave.bounds;
        let new_index = self.staves.len();

        // Drain the pending candidates by partitioning: each is consumed by
        // the first matching rule or re-queued for a later stave.
        for bar in std::mem::take(&mut self.bar_candidates) {
            if bar.y_top == max_y && bar.y_bottom == min_y {
                // Internal bar line of the new stave.
                stave.symbols.push(Symbol {
                    kind: SymbolKind::BarSeparator,
                    x: bar.x,
                });
            } else if self.staves.len() > self.system_start
                && self.staves[self.system_start].bounds.1 == bar.y_top
                && bar.y_bottom == min_y
            {
                // Spans from the system's first stave down to the new one:
                // the system closes with the new stave as its last member.
                self.systems.push(System {
                    first: self.system_start,
                    last: new_index,
                });
                self.system_start = new_index + 1;
            } else if self
                .staves
                .last()
                .is_some_and(|p| p.bounds.1 == bar.y_top && bar.y_bottom == min_y)
            {
                // Brace connector joining the previous stave to the new one.
                if let Some(previous) = self.staves.last_mut() {
                    previous.symbols.push(Symbol {
                        kind: SymbolKind::BarSeparator,
                        x: bar.x,
                    });
                }
                stave.symbols.push(Symbol {
                    kind: SymbolKind::BarSeparator,
                    x: bar.x,
                });
                let pair = PianoPair {
                    upper: new_index - 1,
                    lower: new_index,
                };
                if !self.piano_pairs.contains(&pair) {
                    self.piano_pairs.push(pair);
                }
            } else {
                self.bar_candidates.push(bar);
            }
        }

        self.staves.push(stave);
        self.assign_annotators(new_index);
    }

    /// Assign buffered clef and time-signature glyphs whose y falls within
    /// the newly closed stave's bounds.
    fn assign_annotators(&mut self, index: usize) {
        let stave = &mut self.staves[index];
        let (min_y, max_y) = stave.bounds;

        if let Some(pos) = self
            .clefs
            .iter()
            .position(|c| min_y <= c.y && c.y <= max_y)
        {
            let pending = self.clefs.remove(pos);
            stave.clef = Some(pending.clef);
            stave.voice.elements.push(VoiceElement::Clef(pending.clef));
        }

        let mut i = 0;
        while i + 1 < self.time_signatures.len() {
            let denominator = self.time_signatures[i];
            let numerator = self.time_signatures[i + 1];
            let within =
                |y: f64| min_y <= y && y <= max_y;
            if within(denominator.y) && within(numerator.y) {
                stave
                    .voice
                    .elements
                    .push(VoiceElement::TimeSignature(TimeSignature {
                        beats: numerator.value,
                        beat_type: denominator.value,
                    }));
                self.time_signatures.drain(i..=i + 1);
            } else {
                i += 2;
            }
        }
    }

    /// Finish the scan: close the trailing system and discard dangling
    /// buffers (well-formed pages leave none worth keeping).
    pub fn finish(mut self) -> PageStructure {
        if self.system_start < self.staves.len() {
            self.systems.push(System {
                first: self.system_start,
                last: self.staves.len() - 1,
            });
        }
        if !self.staff_lines.is_empty() {
            log::warn!(
                "{} staff lines left without a fifth companion",
                self.staff_lines.len()
            );
        }
        if !self.bar_candidates.is_empty() {
            log::warn!(
                "{} unresolved bar-line candidates discarded",
                self.bar_candidates.len()
            );
        }
        if !self.clefs.is_empty() || !self.time_signatures.is_empty() {
            log::warn!(
                "{} clef and {} time-signature glyphs never matched a stave",
                self.clefs.len(),
                self.time_signatures.len()
            );
        }
        PageStructure {
            staves: self.staves,
            systems: self.systems,
            piano_pairs: self.piano_pairs,
            staff_length: self.staff_length,
        }
    }
}

/// Run the full reconstruction over a grouped item list: scan, close, and
/// build every stave's voice. Items are annotated with overlay colors as a
/// side effect. No partial result is returned for a page that fails.
pub fn reconstruct_items(items: &mut [Item]) -> Result<PageStructure, String> {
    let mut reconstructor = Reconstructor::new();
    for item in items.iter_mut() {
        reconstructor.process_item(item)?;
    }
    let mut page = reconstructor.finish();
    for stave in &mut page.staves {
        build_voice(stave)?;
    }
    Ok(page)
}
