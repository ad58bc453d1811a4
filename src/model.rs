//! Data model for the reconstructed score.
//!
//! These structures are the notation-model-agnostic output of the pipeline:
//! pitches are diatonic indices, durations are quarter-lengths, and voices
//! are ordered element sequences. Mapping them into a concrete notation
//! model's object types is a thin adapter on the consumer side.

use serde::{Deserialize, Serialize};

/// A clef reconstructed from its glyph code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    /// Treble clef sounding an octave lower (e.g. tenor voice, guitar).
    TrebleOttavaBassa,
    Bass,
}

impl Clef {
    /// Diatonic offset added to a note-head's staff position to obtain
    /// its diatonic index.
    pub fn diatonic_offset(&self) -> i32 {
        match self {
            Clef::Treble | Clef::TrebleOttavaBassa => -5,
            Clef::Bass => -3,
        }
    }
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 12 in 12/8)
    pub beats: i32,
    /// Denominator (e.g., 8 in 12/8)
    pub beat_type: i32,
}

/// A chord, single note, or rest occupying one time slot.
///
/// A fresh chord starts as a quarter (quarter_length 1.0) and is halved once
/// per eighth-flag modifier or covering flag bar applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Diatonic indices of the pitches in this chord (empty for rests).
    pub pitches: Vec<i32>,
    /// Duration in quarter-note units, with all halvings already applied.
    pub quarter_length: f64,
    /// Whether the duration carries a dot.
    pub dotted: bool,
    /// Whether this event is a rest.
    pub rest: bool,
}

impl ChordEvent {
    /// A fresh, empty chord awaiting pitches.
    pub fn new() -> Self {
        Self {
            pitches: Vec::new(),
            quarter_length: 1.0,
            dotted: false,
            rest: false,
        }
    }

    /// A rest of the given quarter-length.
    pub fn rest(quarter_length: f64) -> Self {
        Self {
            pitches: Vec::new(),
            quarter_length,
            dotted: false,
            rest: true,
        }
    }

    /// A chord with no pitches that is not a rest carries no content.
    pub fn is_empty(&self) -> bool {
        !self.rest && self.pitches.is_empty()
    }
}

impl Default for ChordEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number (1-based; 0 until numbered by the combiner).
    pub number: i32,
    /// Chord and rest events in x order.
    pub events: Vec<ChordEvent>,
}

impl Measure {
    pub fn new() -> Self {
        Self {
            number: 0,
            events: Vec::new(),
        }
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new()
    }
}

/// One element of a voice's ordered content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoiceElement {
    Clef(Clef),
    TimeSignature(TimeSignature),
    Measure(Measure),
}

/// The ordered musical content of one stave: an optional clef and time
/// signature prefix followed by measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub elements: Vec<VoiceElement>,
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over the measures in this voice, skipping clef/time elements.
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.elements.iter().filter_map(|e| match e {
            VoiceElement::Measure(m) => Some(m),
            _ => None,
        })
    }

    pub fn measure_count(&self) -> usize {
        self.measures().count()
    }
}

/// A named part of the combined score.
///
/// Single-stave parts hold one voice; the piano part holds two (slot 0 is
/// the pair member encountered first on the page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part name (e.g., "soprano", "piano")
    pub name: String,
    /// One voice normally, two for a piano grand staff.
    pub voices: Vec<Voice>,
}

/// The complete reconstructed score for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Parts in assignment order (insertion order is deterministic).
    pub parts: Vec<Part>,
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of measures in the first part's first voice.
    pub fn measure_count(&self) -> usize {
        self.parts
            .first()
            .and_then(|p| p.voices.first())
            .map_or(0, |v| v.measure_count())
    }

    /// Look up a part by name.
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }
}
