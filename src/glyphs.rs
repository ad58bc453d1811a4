//! Fixed glyph-code tables and text-item decoding.
//!
//! The notation font addresses its symbols through short show-text codes;
//! the tables below are the only glyph knowledge the pipeline has. Codes
//! outside the tables produce no symbol and are logged at debug level.

use crate::model::Clef;
use crate::tokens::Item;

/// Classification of a known glyph code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlyphClass {
    Clef(Clef),
    /// A time-signature digit (value with glyph decoration stripped).
    TimeSignatureDigit(i32),
    Note(NoteGlyph),
}

/// The note/rest symbol family. All of these mark musical content on a
/// stave, so any of them also proves that pending vertical lines were note
/// stems rather than bar lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteGlyph {
    /// Filled note-head.
    Head,
    /// Dotted-duration modifier.
    Dot,
    /// Eighth-flag modifier (halves the chord it follows).
    EighthFlag,
    /// Rest with its duration in quarter-lengths.
    Rest(f64),
}

/// Classify a glyph code against the fixed tables.
pub fn classify_glyph(code: &str) -> Option<GlyphClass> {
    match code {
        "(&)" => Some(GlyphClass::Clef(Clef::Treble)),
        "(V)" => Some(GlyphClass::Clef(Clef::TrebleOttavaBassa)),
        "(?)" => Some(GlyphClass::Clef(Clef::Bass)),
        "(8)" | "(12)" => strip_decoration(code)
            .parse()
            .ok()
            .map(GlyphClass::TimeSignatureDigit),
        "<cf>" => Some(GlyphClass::Note(NoteGlyph::Head)),
        "(.)" => Some(GlyphClass::Note(NoteGlyph::Dot)),
        "(J)" | "(j)" => Some(GlyphClass::Note(NoteGlyph::EighthFlag)),
        "(!)" => Some(GlyphClass::Note(NoteGlyph::Rest(6.0))),
        "<e4>" => Some(GlyphClass::Note(NoteGlyph::Rest(0.5))),
        _ => None,
    }
}

/// Whether the eighth-flag code is recorded with a small x nudge so it
/// sorts after the note-head it modifies.
pub fn is_nudged_code(code: &str) -> bool {
    matches!(code, "(J)" | "(j)")
}

/// Strip the surrounding glyph decoration from a code: `(12)` becomes `12`.
pub fn strip_decoration(code: &str) -> &str {
    code.trim_matches(|c| matches!(c, '(' | ')' | '<' | '>'))
}

/// A decoded text placement: the glyph code and its page-space position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGlyph {
    pub code: String,
    pub x: f64,
    pub y: f64,
}

/// Decode a text-object item into its glyph code and page-space position.
///
/// A text item is a 6-command chain with `BT` at index 1 and the show-text
/// command at index 4. The placement command at index 0 carries an affine
/// matrix `a b c d e f`; the page-space position is the translation divided
/// by the axis scales: `(e / a, f / d)`. Returns `None` for anything else
/// (malformed text items classify as no-ops).
pub fn decode_text_item(item: &Item) -> Option<TextGlyph> {
    if item.commands.len() < 5 || item.op(1) != "BT" || item.op(4) != "Tj" {
        return None;
    }
    let placement = &item.commands[0];
    let n = placement.operands.len();
    if n < 6 {
        return None;
    }
    let x_scale = placement.number(0)?;
    let y_scale = placement.number(n - 3)?;
    let x = placement.number(n - 2)?;
    let y = placement.number(n - 1)?;
    let code = item.commands[4].operands.first()?.clone();

    Some(TextGlyph {
        code,
        x: x / x_scale,
        y: y / y_scale,
    })
}
