//! Scale & chord resolution
//!
//! Maps scale degrees to MIDI notes and frequencies, spells MIDI notes back
//! into degrees, parses roman numerals and builds chords on a degree.
//!
//! A degree resolves as
//! `root + sum(steps[..pc]) + octave * sum(steps) + modifier`;
//! degrees past either end of the scale fold into the octave.

use crate::defaults::{
    accidental_value, CHORDS, CIRCLE_OF_FIFTHS, DEFAULT_OCTAVE, DEFAULT_SCALE, FLAT_DEGREES,
    INTERVALS_TO_NOTES, NOTES_TO_INTERVALS, ROMANS, SCALES, SHARP_DEGREES,
};
use crate::error::{Result, ZiffersError};
use crate::options::{Key, Scale};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

/// MIDI note of an unrecognised note name (middle C)
pub const FALLBACK_NOTE: i32 = 60;

/// Semitones covered by a full pitch-bend swing in either direction
pub const PITCH_BEND_SEMITONES: f64 = 1.0;

pub const PITCH_BEND_CENTER: u16 = 8192;

lazy_static! {
    static ref NOTE_NAME: Regex = Regex::new(r"^([a-gA-G])([#bs])?(-?[0-9])?$").unwrap();
}

/// Convert a note name like `C4`, `Bb3` or `F#` to a MIDI number
///
/// `12 + 12 * octave + interval + accidental`, octave 4 when omitted.
/// Unknown names resolve to middle C.
pub fn note_name_to_midi(name: &str) -> i32 {
    let Some(caps) = NOTE_NAME.captures(name.trim()) else {
        warn!("Unknown note name '{}', using {}", name, FALLBACK_NOTE);
        return FALLBACK_NOTE;
    };

    let letter = caps[1]
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('C');
    let interval = NOTES_TO_INTERVALS.get(&letter).copied().unwrap_or(0);
    let accidental = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(accidental_value)
        .unwrap_or(0);
    let octave = caps
        .get(3)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(DEFAULT_OCTAVE);

    12 + 12 * octave + interval + accidental
}

/// Semitone step intervals of a scale
///
/// Named scales are looked up case-insensitively ignoring spaces,
/// underscores and dashes; unknown names fall back to Ionian.
pub fn get_scale(scale: &Scale) -> Vec<f64> {
    let steps = match scale {
        Scale::Name(name) => match scale_steps(name) {
            Some(steps) => steps,
            None => {
                warn!("Unknown scale '{}', using {}", name, DEFAULT_SCALE);
                scale_steps(DEFAULT_SCALE).unwrap_or_default()
            }
        },
        Scale::Steps(steps) => steps.clone(),
        Scale::Cents { cents } => cents.iter().map(|c| c / 100.0).collect(),
    };

    if steps.is_empty() {
        warn!("Scale without steps, using chromatic");
        return vec![1.0; 12];
    }
    steps
}

fn scale_steps(name: &str) -> Option<Vec<f64>> {
    let normalized: String = name
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(|c| c.to_lowercase())
        .collect();
    SCALES.get(normalized.as_str()).map(|steps| {
        steps
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| d as f64)
            .collect()
    })
}

/// Unfloored note for a scale degree
pub fn note_from_pc(root: i32, pitch_class: i32, scale: &Scale, octave: i32, modifier: i32) -> f64 {
    let intervals = get_scale(scale);
    let len = intervals.len() as i32;

    let octave = octave + pitch_class.div_euclid(len);
    let degree = pitch_class.rem_euclid(len) as usize;

    let span: f64 = intervals.iter().sum();
    let within: f64 = intervals[..degree].iter().sum();

    root as f64 + within + octave as f64 * span + modifier as f64
}

/// MIDI note and pitch bend for a scale degree
///
/// Fractional results (microtonal scales) are floored, the remainder goes
/// to the pitch bend.
pub fn resolve_note(
    root: i32,
    pitch_class: i32,
    scale: &Scale,
    octave: i32,
    modifier: i32,
) -> (i32, Option<u16>) {
    let note = note_from_pc(root, pitch_class, scale, octave, modifier);
    (note.floor() as i32, pitch_bend(note))
}

pub fn midi_to_freq(note: f64) -> f64 {
    440.0 * 2f64.powf((note - 69.0) / 12.0)
}

/// 14-bit pitch bend lifting the floored note up to `note`
///
/// `None` for whole notes.
pub fn pitch_bend(note: f64) -> Option<u16> {
    let base = note.floor();
    if (note - base).abs() < 1e-9 {
        return None;
    }

    let cents = 1200.0 * (midi_to_freq(note) / midi_to_freq(base)).log2();
    let offset = cents / (100.0 * PITCH_BEND_SEMITONES) * (PITCH_BEND_CENTER as f64 - 1.0);
    let bend = (PITCH_BEND_CENTER as f64 + offset).round().clamp(0.0, 16383.0);
    Some(bend as u16)
}

/// Circle-of-fifths position of a key name relative to C (-6..=6)
pub fn accidentals_from_note_name(name: &str) -> i32 {
    let mut chars = name.trim().chars();
    let Some(letter) = chars.next().map(|c| c.to_ascii_uppercase()) else {
        return 0;
    };
    let Some(&interval) = NOTES_TO_INTERVALS.get(&letter) else {
        return 0;
    };
    let accidental = chars.next().and_then(accidental_value).unwrap_or(0);
    accidentals_from_midi_note(interval + accidental)
}

/// Circle-of-fifths position of the pitch class of a MIDI note
pub fn accidentals_from_midi_note(note: i32) -> i32 {
    let name = INTERVALS_TO_NOTES[note.rem_euclid(12) as usize];
    CIRCLE_OF_FIFTHS
        .iter()
        .position(|n| *n == name)
        .map(|idx| idx as i32 - 6)
        .unwrap_or(0)
}

/// Tonal pitch class of a MIDI note in a key (C = 14, G = 15, F = 13)
pub fn midi_to_tpc(note: i32, key: &Key) -> i32 {
    let acc = match key {
        Key::Name(name) => accidentals_from_note_name(name),
        Key::Midi(midi) => accidentals_from_midi_note(*midi),
    };
    let lowest = 11 + acc;
    (note * 7 + 26 - lowest).rem_euclid(12) + lowest
}

/// A MIDI note spelled as a scale degree
#[derive(Clone, Debug, PartialEq)]
pub struct SpelledPitch {
    /// Degree with accidental and octave marks, e.g. `^b6`
    pub text: String,
    pub pitch_class: i32,
    pub octave: i32,
    pub modifier: i32,
}

/// Spell a MIDI note as a degree, choosing flats or sharps from the key
///
/// The octave counts from MIDI octave 5 (notes 60..72 are octave 0).
pub fn midi_to_pitch_class(note: i32, key: &Key, scale: &Scale) -> SpelledPitch {
    let chromatic = note.rem_euclid(12) as usize;
    let octave = note.div_euclid(12) - 5;

    let (degree, modifier) = if scale.is_chromatic() {
        (chromatic.to_string(), 0)
    } else {
        let tpc = midi_to_tpc(note, key);
        let spelled = if (6..=12).contains(&tpc) && FLAT_DEGREES[chromatic].len() == 2 {
            FLAT_DEGREES[chromatic]
        } else {
            SHARP_DEGREES[chromatic]
        };
        let modifier = spelled.chars().next().and_then(accidental_value).unwrap_or(0);
        (spelled.to_string(), modifier)
    };

    let pitch_class = degree
        .trim_start_matches(['#', 'b'])
        .parse::<i32>()
        .unwrap_or(0);

    let marks = if octave > 0 {
        "^".repeat(octave as usize)
    } else {
        "_".repeat(octave.unsigned_abs() as usize)
    };

    SpelledPitch {
        text: format!("{}{}", marks, degree),
        pitch_class,
        octave,
        modifier,
    }
}

/// Value of a roman numeral (subtractive: `iv` is 4)
pub fn parse_roman(numeral: &str) -> Result<i32> {
    let values: Vec<i32> = numeral
        .chars()
        .map(|c| {
            ROMANS
                .get(&c.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| ZiffersError::InvalidRomanNumeral(numeral.to_string()))
        })
        .collect::<Result<_>>()?;

    if values.is_empty() {
        return Err(ZiffersError::InvalidRomanNumeral(numeral.to_string()));
    }

    let mut total = 0;
    for (i, value) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if next > value => total -= value,
            _ => total += value,
        }
    }
    Ok(total)
}

/// Semitone template of a named chord, major when unknown
pub fn chord_intervals(name: &str) -> Vec<i32> {
    match CHORDS.get(name) {
        Some(intervals) => intervals.clone(),
        None => {
            warn!("Unknown chord '{}', using major", name);
            CHORDS.get("major").cloned().unwrap_or_else(|| vec![0, 4, 7])
        }
    }
}

/// MIDI notes of the chord built on a 1-based scale degree
///
/// Without a chord name the chord stacks every other scale degree (a triad
/// of the scale); a chromatic scale uses the major template instead.
pub fn chord_from_degree(
    degree: i32,
    chord_type: Option<&str>,
    scale: &Scale,
    root: i32,
    num_octaves: usize,
) -> Vec<i32> {
    let chord_type = match chord_type {
        None if scale.is_chromatic() => Some("major"),
        other => other,
    };

    match chord_type {
        Some(name) => {
            let base = note_from_pc(root, degree - 1, scale, 0, 0).floor() as i32;
            let intervals = chord_intervals(name);
            (0..num_octaves.max(1) as i32)
                .flat_map(|octave| intervals.iter().map(move |i| base + i + 12 * octave))
                .collect()
        }
        None => [degree - 1, degree + 1, degree + 3]
            .iter()
            .map(|pc| resolve_note(root, *pc, scale, 0, 0).0)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ionian() -> Scale {
        Scale::from("Ionian")
    }

    #[test]
    fn test_note_name_to_midi() {
        assert_eq!(note_name_to_midi("C4"), 60);
        assert_eq!(note_name_to_midi("A1"), 33);
        assert_eq!(note_name_to_midi("Bb3"), 58);
        assert_eq!(note_name_to_midi("C#1"), 25);
        assert_eq!(note_name_to_midi("d"), 62);
        assert_eq!(note_name_to_midi("foo"), 60);
    }

    #[test]
    fn test_note_from_pc_folds_octaves() {
        let notes: Vec<i32> = (-9..=9)
            .map(|pc| resolve_note(60, pc, &ionian(), 0, 0).0)
            .collect();
        assert_eq!(
            notes,
            vec![45, 47, 48, 50, 52, 53, 55, 57, 59, 60, 62, 64, 65, 67, 69, 71, 72, 74, 76]
        );
    }

    #[test]
    fn test_note_from_pc_octave_and_modifier() {
        assert_eq!(resolve_note(60, 0, &ionian(), 1, 0).0, 72);
        assert_eq!(resolve_note(60, 3, &ionian(), -1, 1).0, 54);
        assert_eq!(resolve_note(62, 2, &Scale::from("dorian"), 0, 0).0, 65);
    }

    #[test]
    fn test_unknown_scale_is_ionian() {
        assert_eq!(get_scale(&Scale::from("nope")), get_scale(&ionian()));
        assert_eq!(get_scale(&Scale::from("Harmonic Minor")).len(), 7);
    }

    #[test]
    fn test_microtonal_pitch_bend() {
        let quarter_tones = Scale::Cents {
            cents: vec![150.0, 150.0, 200.0],
        };
        let (note, bend) = resolve_note(60, 1, &quarter_tones, 0, 0);
        assert_eq!(note, 61);
        // half a semitone up
        let bend = bend.unwrap() as i32;
        assert!((bend - (8192 + 4096)).abs() <= 1, "bend {}", bend);
        assert_eq!(resolve_note(60, 2, &quarter_tones, 0, 0), (63, None));
    }

    #[test]
    fn test_midi_to_freq() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_freq(60.0) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_tonal_pitch_class() {
        assert_eq!(midi_to_tpc(60, &Key::from("C4")), 14);
        assert_eq!(midi_to_tpc(67, &Key::from("C4")), 15);
        assert_eq!(midi_to_tpc(61, &Key::from("C4")), 21);
        assert_eq!(midi_to_tpc(70, &Key::from("F4")), 12);
    }

    #[test]
    fn test_spelling_follows_key() {
        let sharp = midi_to_pitch_class(61, &Key::from("C4"), &ionian());
        assert_eq!(sharp.text, "#0");
        assert_eq!((sharp.pitch_class, sharp.modifier, sharp.octave), (0, 1, 0));

        let flat = midi_to_pitch_class(70, &Key::from("F4"), &ionian());
        assert_eq!(flat.text, "b6");
        assert_eq!((flat.pitch_class, flat.modifier), (6, -1));

        let high = midi_to_pitch_class(76, &Key::from("C4"), &ionian());
        assert_eq!(high.text, "^2");
        assert_eq!(high.octave, 1);
    }

    #[test]
    fn test_parse_roman() {
        assert_eq!(parse_roman("i").unwrap(), 1);
        assert_eq!(parse_roman("iv").unwrap(), 4);
        assert_eq!(parse_roman("vii").unwrap(), 7);
        assert_eq!(parse_roman("ix").unwrap(), 9);
        assert!(matches!(
            parse_roman("iq"),
            Err(ZiffersError::InvalidRomanNumeral(_))
        ));
        assert!(parse_roman("").is_err());
    }

    #[test]
    fn test_chord_from_degree() {
        assert_eq!(chord_from_degree(1, None, &ionian(), 60, 1), vec![60, 64, 67]);
        assert_eq!(chord_from_degree(2, None, &ionian(), 60, 1), vec![62, 65, 69]);
        assert_eq!(
            chord_from_degree(5, Some("7"), &ionian(), 60, 1),
            vec![67, 71, 74, 77]
        );
        assert_eq!(
            chord_from_degree(1, None, &Scale::from("chromatic"), 60, 2),
            vec![60, 64, 67, 72, 76, 79]
        );
    }
}
