//! Per-stave voice building.
//!
//! Walks the stave's symbols in x order, accumulating chords and measures.
//! Chords close when the sweep reaches a new x; flag bars halve the chords
//! they cover retroactively, at close time. The symbol list is consumed;
//! a stave's voice is never recomputed.

use std::cmp::Ordering;

use crate::model::{ChordEvent, Measure, VoiceElement};
use crate::stave::{Stave, SymbolKind};

/// A flag bar waiting to halve the chords it covers.
#[derive(Debug, Clone, Copy)]
struct PendingFlagBar {
    /// Where the bar's halving starts applying.
    x: f64,
    /// The sweep position past which the bar stops applying.
    limit: f64,
}

/// Close the open chord at sweep position `cx`: drop exhausted flag bars,
/// halve once per covering bar that has started, and move the chord into
/// the measure. An empty chord contributes nothing and leaves the pending
/// bars untouched.
fn close_into_measure(
    chord: &mut ChordEvent,
    measure: &mut Measure,
    flag_bars: &mut Vec<PendingFlagBar>,
    cx: f64,
) {
    if chord.is_empty() {
        return;
    }
    flag_bars.retain(|f| f.limit > cx);
    for flag_bar in flag_bars.iter() {
        if flag_bar.x > cx {
            // This bar starts ahead of the closing chord.
            continue;
        }
        chord.quarter_length /= 2.0;
    }
    measure.events.push(std::mem::take(chord));
}

/// Build the stave's voice from its collected symbols.
///
/// Fatal conditions: a note-head on a stave with no clef, or degenerate
/// staff-line spacing that leaves no pitch scale.
pub fn build_voice(stave: &mut Stave) -> Result<(), String> {
    let mut symbols = std::mem::take(&mut stave.symbols);
    // Stable sort: symbols at equal x keep their encounter order.
    symbols.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

    let n = stave.lines.len();
    if n < 2 {
        return Err(format!(
            "stave at y={}..{} closed with fewer than two staff lines",
            stave.bounds.0, stave.bounds.1
        ));
    }
    // The last line drawn is the staff's bottom line; the pitch scale hangs
    // off it and half the spacing to its neighbor.
    let baseline = stave.lines[n - 1] - 1.0;
    let gap = (stave.lines[n - 2] - stave.lines[n - 1]) / 2.0;

    let mut measure = Measure::new();
    let mut chord = ChordEvent::new();
    let mut current_x: Option<f64> = None;
    let mut flag_bars: Vec<PendingFlagBar> = Vec::new();

    for symbol in symbols {
        let cx = *current_x.get_or_insert(symbol.x);
        match symbol.kind {
            SymbolKind::EighthFlag => {
                chord.quarter_length /= 2.0;
            }
            SymbolKind::Dot => {
                chord.dotted = true;
            }
            SymbolKind::Rest { quarter_length } => {
                if symbol.x != cx {
                    close_into_measure(&mut chord, &mut measure, &mut flag_bars, cx);
                    current_x = Some(symbol.x);
                }
                chord = ChordEvent::rest(quarter_length);
            }
            SymbolKind::NoteHead { y } => {
                if symbol.x != cx {
                    close_into_measure(&mut chord, &mut measure, &mut flag_bars, cx);
                    current_x = Some(symbol.x);
                }
                let clef = stave.clef.ok_or_else(|| {
                    format!(
                        "note head at x={} on a stave with no clef (y={}..{})",
                        symbol.x, stave.bounds.0, stave.bounds.1
                    )
                })?;
                if gap == 0.0 {
                    return Err(format!(
                        "coincident bottom staff lines on stave at y={}..{}",
                        stave.bounds.0, stave.bounds.1
                    ));
                }
                let index = ((y - baseline) / gap).round() as i32 + clef.diatonic_offset();
                chord.pitches.push(index);
            }
            SymbolKind::BarSeparator => {
                flag_bars.retain(|f| f.limit > cx);
                for _ in flag_bars.iter() {
                    chord.quarter_length /= 2.0;
                }
                if !chord.is_empty() {
                    measure.events.push(std::mem::take(&mut chord));
                } else {
                    chord = ChordEvent::new();
                }
                stave
                    .voice
                    .elements
                    .push(VoiceElement::Measure(std::mem::take(&mut measure)));
                current_x = Some(symbol.x);
            }
            SymbolKind::FlagBar { limit } => {
                flag_bars.push(PendingFlagBar { x: symbol.x, limit });
            }
        }
    }

    // Close trailing content so a stave whose last measure has no closing
    // bar line still emits it.
    if let Some(cx) = current_x {
        close_into_measure(&mut chord, &mut measure, &mut flag_bars, cx);
        if !measure.events.is_empty() {
            stave.voice.elements.push(VoiceElement::Measure(measure));
        }
    }

    Ok(())
}
