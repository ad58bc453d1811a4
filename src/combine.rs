//! Voice combining: merge staves into named parts and a piano grand staff,
//! concatenating successive systems into continuous voices.

use std::collections::VecDeque;

use crate::model::{Part, Score, Voice, VoiceElement};
use crate::reconstruct::PageStructure;
use crate::stave::Stave;

/// Named roles for the first system's non-piano staves, by stave index.
/// Staves beyond the four named roles continue as "voice5", "voice6", …
const VOICE_NAMES: [&str; 4] = ["soprano", "alto", "tenor", "bass"];

fn role_name(index: usize) -> String {
    VOICE_NAMES
        .get(index)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("voice{}", index + 1))
}

/// Number the measures of a first-system stave, 1-based.
fn number_measures(stave: &mut Stave) {
    for element in &mut stave.voice.elements {
        if let VoiceElement::Measure(measure) = element {
            stave.measure_count += 1;
            measure.number = stave.measure_count;
        }
    }
}

/// Combine a reconstructed page into a score.
///
/// The first system establishes the parts: braced staves open/complete the
/// two-voice "piano" part (slot 0 is the pair member drawn first), all
/// others become named parts. Every later system appends its staves onto
/// those parts, braced staves via the piano-pair queue and the rest by
/// positional correspondence within the system.
pub fn combine_page(page: PageStructure) -> Score {
    let PageStructure {
        mut staves,
        systems,
        piano_pairs,
        ..
    } = page;

    let mut score = Score::new();
    let first_system = match systems.first() {
        Some(system) => *system,
        None => return score,
    };
    let mut pairs: VecDeque<_> = piano_pairs.into_iter().collect();
    // (part index, voice index) per first-system stave offset.
    let mut slot_by_offset: Vec<(usize, usize)> = Vec::new();
    let mut piano_part: Option<usize> = None;

    for i in first_system.first..=first_system.last {
        let stave = match staves.get_mut(i) {
            Some(stave) => stave,
            None => break,
        };
        number_measures(stave);
        let voice = std::mem::take(&mut stave.voice);

        match pairs.front().copied() {
            Some(pair) if pair.contains(i) => {
                if i == pair.upper {
                    score.parts.push(Part {
                        name: "piano".to_string(),
                        voices: vec![voice, Voice::new()],
                    });
                    piano_part = Some(score.parts.len() - 1);
                    slot_by_offset.push((score.parts.len() - 1, 0));
                } else {
                    match piano_part {
                        Some(part) => {
                            score.parts[part].voices[1] = voice;
                            slot_by_offset.push((part, 1));
                        }
                        None => {
                            // Lower pair member with no upper seen: open the
                            // part with an empty first slot.
                            log::warn!("piano pair completed at stave {i} before it was opened");
                            score.parts.push(Part {
                                name: "piano".to_string(),
                                voices: vec![Voice::new(), voice],
                            });
                            piano_part = Some(score.parts.len() - 1);
                            slot_by_offset.push((score.parts.len() - 1, 1));
                        }
                    }
                    pairs.pop_front();
                }
            }
            _ => {
                score.parts.push(Part {
                    name: role_name(i),
                    voices: vec![voice],
                });
                slot_by_offset.push((score.parts.len() - 1, 0));
            }
        }
    }

    // Later systems extend the ongoing voices instead of starting new ones.
    for system in systems.iter().skip(1) {
        for i in system.first..=system.last {
            let stave = match staves.get_mut(i) {
                Some(stave) => stave,
                None => break,
            };
            let voice = std::mem::take(&mut stave.voice);

            match pairs.front().copied().filter(|pair| pair.contains(i)) {
                Some(pair) => {
                    let slot = if i == pair.upper { 0 } else { 1 };
                    match piano_part {
                        Some(part) => {
                            score.parts[part].voices[slot].elements.extend(voice.elements);
                        }
                        None => {
                            log::warn!(
                                "braced stave {i} has no piano part from the first system"
                            );
                        }
                    }
                    if slot == 1 {
                        pairs.pop_front();
                    }
                }
                None => {
                    let offset = i - system.first;
                    match slot_by_offset.get(offset) {
                        Some(&(part, voice_index)) => {
                            score.parts[part].voices[voice_index]
                                .elements
                                .extend(voice.elements);
                        }
                        None => {
                            log::warn!(
                                "stave {i} has no positional counterpart in the first system"
                            );
                        }
                    }
                }
            }
        }
    }

    score
}
