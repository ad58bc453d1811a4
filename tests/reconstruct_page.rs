//! Integration tests — reconstruct complete synthetic pages end to end,
//! from content-stream text to the combined score.

use pretty_assertions::assert_eq;
use stavelib::{
    reconstruct_stream, reconstruct_with_overlay, score_to_json, Clef, Score, TimeSignature,
    VoiceElement,
};

// ─── Stream builders ────────────────────────────────────────────────

/// Five staff lines at the given y values, 200 units long from x=50.
fn staff_lines(ys: &[f64]) -> String {
    ys.iter()
        .map(|y| format!("q 1.3 w 50 {y} m 250 {y} l S Q"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn vertical(x: f64, y_top: f64, y_bottom: f64) -> String {
    format!("q 1.3 w {x} {y_top} m {x} {y_bottom} l S Q")
}

/// A text glyph placed at page-space (x, y) through a 0.24 scale matrix.
fn glyph(code: &str, x: f64, y: f64) -> String {
    format!(
        "q 0.24 0 0 0.24 {} {} cm BT /F2 1 Tf 1 0 0 1 0 0 Tm {code} Tj ET Q",
        x * 0.24,
        y * 0.24
    )
}

fn page(parts: &[String]) -> String {
    parts.join(" ")
}

/// A single treble stave in 12/8 at y=100..132 with an internal bar line at
/// x=250 and the given extra content after the stave closes.
fn single_stave_page(content: &str) -> String {
    page(&[
        glyph("(&)", 60.0, 116.0),
        glyph("(8)", 70.0, 110.0),
        glyph("(12)", 70.0, 122.0),
        vertical(250.0, 132.0, 100.0),
        staff_lines(&[100.0, 108.0, 116.0, 124.0, 132.0]),
        content.to_string(),
    ])
}

fn soprano_voice(score: &Score) -> &stavelib::Voice {
    &score.part("soprano").expect("soprano part").voices[0]
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn single_stave_with_clef_time_and_note() {
    let score = reconstruct_stream(&single_stave_page(&glyph("<cf>", 80.0, 132.0)))
        .expect("page should reconstruct");

    assert_eq!(score.parts.len(), 1);
    assert_eq!(score.parts[0].name, "soprano");

    let voice = soprano_voice(&score);
    assert_eq!(voice.elements.len(), 3);
    assert_eq!(voice.elements[0], VoiceElement::Clef(Clef::Treble));
    assert_eq!(
        voice.elements[1],
        VoiceElement::TimeSignature(TimeSignature {
            beats: 12,
            beat_type: 8
        })
    );

    let measure = voice.measures().next().expect("one measure");
    assert_eq!(measure.number, 1);
    assert_eq!(measure.events.len(), 1);
    // round((132 - 131) / -4) + treble offset = -5
    assert_eq!(measure.events[0].pitches, vec![-5]);
    assert_eq!(measure.events[0].quarter_length, 1.0);
    assert!(!measure.events[0].rest);
}

#[test]
fn eighth_flag_glyph_halves_its_note() {
    let content = format!(
        "{} {}",
        glyph("<cf>", 80.0, 132.0),
        glyph("(J)", 80.0, 140.0)
    );
    let score = reconstruct_stream(&single_stave_page(&content)).unwrap();
    let measure = soprano_voice(&score).measures().next().unwrap();
    assert_eq!(measure.events.len(), 1);
    assert_eq!(measure.events[0].quarter_length, 0.5);
}

#[test]
fn dotted_glyph_marks_the_note() {
    let content = format!(
        "{} {}",
        glyph("<cf>", 80.0, 132.0),
        glyph("(.)", 80.0, 140.0)
    );
    let score = reconstruct_stream(&single_stave_page(&content)).unwrap();
    let measure = soprano_voice(&score).measures().next().unwrap();
    assert!(measure.events[0].dotted);
}

#[test]
fn rest_glyph_closes_to_a_rest_event() {
    let score = reconstruct_stream(&single_stave_page(&glyph("(!)", 80.0, 116.0))).unwrap();
    let measure = soprano_voice(&score).measures().next().unwrap();
    assert_eq!(measure.events.len(), 1);
    assert!(measure.events[0].rest);
    assert_eq!(measure.events[0].quarter_length, 6.0);
}

#[test]
fn two_notes_at_one_x_form_a_chord() {
    let content = format!(
        "{} {}",
        glyph("<cf>", 80.0, 132.0),
        glyph("<cf>", 80.0, 116.0)
    );
    let score = reconstruct_stream(&single_stave_page(&content)).unwrap();
    let measure = soprano_voice(&score).measures().next().unwrap();
    assert_eq!(measure.events.len(), 1);
    assert_eq!(measure.events[0].pitches, vec![-5, -1]);
}

#[test]
fn unknown_glyph_codes_contribute_nothing() {
    let content = format!(
        "{} {} {}",
        glyph("(f)", 75.0, 140.0),
        glyph("<cf>", 80.0, 132.0),
        glyph("(,)", 85.0, 140.0)
    );
    let score = reconstruct_stream(&single_stave_page(&content)).unwrap();
    let measure = soprano_voice(&score).measures().next().unwrap();
    assert_eq!(measure.events.len(), 1);
}

#[test]
fn note_far_from_every_stave_aborts_the_page() {
    let result = reconstruct_stream(&single_stave_page(&glyph("<cf>", 80.0, 7200.0)));
    let err = result.expect_err("lookup failure must abort");
    assert!(err.contains("no stave"), "unexpected error: {err}");
}

#[test]
fn malformed_geometry_is_ignored() {
    // A diagonal line, a stray text object, and an incomplete path mixed
    // into an otherwise valid page change nothing.
    let noise = format!(
        "q 1.3 w 10 10 m 90 70 l S Q q BT ET Q q 10 10 m S Q {}",
        glyph("<cf>", 80.0, 132.0)
    );
    let score = reconstruct_stream(&single_stave_page(&noise)).unwrap();
    assert_eq!(score.measure_count(), 1);
}

#[test]
fn reconstruction_is_deterministic() {
    let stream = single_stave_page(&format!(
        "{} {} {}",
        glyph("<cf>", 80.0, 132.0),
        glyph("(J)", 80.0, 140.0),
        glyph("<e4>", 120.0, 116.0)
    ));
    let first = reconstruct_stream(&stream).unwrap();
    let second = reconstruct_stream(&stream).unwrap();
    assert_eq!(first, second);
}

#[test]
fn overlay_stream_colors_classified_items() {
    let (score, overlay) =
        reconstruct_with_overlay(&single_stave_page(&glyph("<cf>", 80.0, 132.0))).unwrap();
    assert_eq!(score.measure_count(), 1);
    // Staff lines stroke dark gray, the bar candidate blue, the note red.
    assert!(overlay.contains("0.2 0.2 0.2 RG"));
    assert!(overlay.contains("0 0.5 1 RG"));
    assert!(overlay.contains("0.5 0 0 rg"));
    // The overlay is a balanced, reassembled instruction stream.
    let tokens: Vec<&str> = overlay.split_whitespace().collect();
    assert_eq!(
        tokens.iter().filter(|t| **t == "q").count(),
        tokens.iter().filter(|t| **t == "Q").count()
    );
}

#[test]
fn score_serializes_for_the_adapter() {
    let score = reconstruct_stream(&single_stave_page(&glyph("<cf>", 80.0, 132.0))).unwrap();
    let json = score_to_json(&score).expect("score should serialize");
    assert!(json.contains("\"soprano\""));
    assert!(json.contains("\"Treble\""));
}
