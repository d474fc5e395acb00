//! Constant tables for the notation
//!
//! Duration characters, scales (as step intervals), chord templates
//! (as semitone offsets from the chord root), roman numerals and note names.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Duration used when nothing else sets one (a quarter note)
pub const DEFAULT_DURATION: f64 = 0.25;

/// Octave of the default key and of note names written without one
pub const DEFAULT_OCTAVE: i32 = 4;

pub const DEFAULT_KEY: &str = "C4";
pub const DEFAULT_SCALE: &str = "Ionian";

/// Characters that may appear as a duration prefix
pub const DURATION_CHARS: &str = "mklpdcwyhnqaefsxtgujoz";

/// Key spellings from six flats to six sharps; C sits at index 6
pub const CIRCLE_OF_FIFTHS: [&str; 13] = [
    "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#",
];

/// Spelling of each chromatic step relative to C, as a circle-of-fifths name
pub const INTERVALS_TO_NOTES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Chromatic steps spelled as degrees of C major with sharps
pub const SHARP_DEGREES: [&str; 12] = [
    "0", "#0", "1", "#1", "2", "3", "#3", "4", "#4", "5", "#5", "6",
];

/// Chromatic steps spelled as degrees of C major with flats
pub const FLAT_DEGREES: [&str; 12] = [
    "0", "b1", "1", "b2", "2", "3", "b4", "4", "b5", "5", "b6", "6",
];

lazy_static! {
    /// Whole-note fractions for each duration character (w = 1.0)
    pub static ref DURATIONS: HashMap<char, f64> = {
        let mut m = HashMap::new();
        m.insert('m', 8.0);
        m.insert('k', 10240.0 / 1920.0);
        m.insert('l', 4.0);
        m.insert('p', 5120.0 / 1920.0);
        m.insert('d', 2.0);
        m.insert('c', 2560.0 / 1920.0);
        m.insert('w', 1.0);
        m.insert('y', 1280.0 / 1920.0);
        m.insert('h', 0.5);
        m.insert('n', 640.0 / 1920.0);
        m.insert('q', 0.25);
        m.insert('a', 320.0 / 1920.0);
        m.insert('e', 0.125);
        m.insert('f', 160.0 / 1920.0);
        m.insert('s', 0.0625);
        m.insert('x', 80.0 / 1920.0);
        m.insert('t', 60.0 / 1920.0);
        m.insert('g', 40.0 / 1920.0);
        m.insert('u', 30.0 / 1920.0);
        m.insert('j', 15.0 / 1920.0);
        m.insert('o', 8.0 / 1920.0);
        m.insert('z', 0.0);
        m
    };

    /// Scales as step intervals between consecutive degrees, keyed by
    /// lowercase name with separators removed
    pub static ref SCALES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("chromatic", "111111111111");

        // Church modes
        m.insert("ionian", "2212221");
        m.insert("major", "2212221");
        m.insert("dorian", "2122212");
        m.insert("phrygian", "1222122");
        m.insert("lydian", "2221221");
        m.insert("mixolydian", "2212212");
        m.insert("aeolian", "2122122");
        m.insert("minor", "2122122");
        m.insert("locrian", "1221222");

        // Minor variants
        m.insert("harmonicminor", "2122131");
        m.insert("melodicminor", "2122221");
        m.insert("harmonicmajor", "2212131");

        // Pentatonic and blues
        m.insert("majorpentatonic", "22323");
        m.insert("pentatonic", "22323");
        m.insert("minorpentatonic", "32232");
        m.insert("blues", "321132");

        // Symmetric
        m.insert("wholetone", "222222");
        m.insert("diminished", "21212121");
        m.insert("augmented", "313131");

        // Exotic
        m.insert("hirajoshi", "21414");
        m.insert("kumoi", "21423");
        m.insert("iwato", "14142");
        m.insert("pelog", "12414");
        m.insert("egyptian", "23232");
        m.insert("spanish", "1312122");
        m.insert("phrygiandominant", "1312122");
        m.insert("bartok", "2212122");
        m.insert("romanian", "2131212");
        m.insert("enigmatic", "1322211");
        m.insert("hungarianminor", "2131131");
        m.insert("neapolitanmajor", "1222221");
        m.insert("neapolitanminor", "1222131");
        m.insert("persian", "1311231");
        m.insert("prometheus", "222312");
        m
    };

    /// Chord templates as semitone offsets from the chord root
    pub static ref CHORDS: HashMap<&'static str, Vec<i32>> = {
        let mut m = HashMap::new();
        // Triads
        m.insert("major", vec![0, 4, 7]);
        m.insert("maj", vec![0, 4, 7]);
        m.insert("M", vec![0, 4, 7]);
        m.insert("minor", vec![0, 3, 7]);
        m.insert("min", vec![0, 3, 7]);
        m.insert("m", vec![0, 3, 7]);
        m.insert("diminished", vec![0, 3, 6]);
        m.insert("dim", vec![0, 3, 6]);
        m.insert("augmented", vec![0, 4, 8]);
        m.insert("aug", vec![0, 4, 8]);
        m.insert("sus2", vec![0, 2, 7]);
        m.insert("sus4", vec![0, 5, 7]);

        // Sevenths
        m.insert("maj7", vec![0, 4, 7, 11]);
        m.insert("M7", vec![0, 4, 7, 11]);
        m.insert("min7", vec![0, 3, 7, 10]);
        m.insert("m7", vec![0, 3, 7, 10]);
        m.insert("dom7", vec![0, 4, 7, 10]);
        m.insert("7", vec![0, 4, 7, 10]);
        m.insert("dim7", vec![0, 3, 6, 9]);
        m.insert("hdim7", vec![0, 3, 6, 10]);
        m.insert("m7b5", vec![0, 3, 6, 10]);
        m.insert("aug7", vec![0, 4, 8, 10]);
        m.insert("mM7", vec![0, 3, 7, 11]);

        // Extended
        m.insert("maj9", vec![0, 4, 7, 11, 14]);
        m.insert("min9", vec![0, 3, 7, 10, 14]);
        m.insert("dom9", vec![0, 4, 7, 10, 14]);
        m.insert("9", vec![0, 4, 7, 10, 14]);
        m.insert("maj11", vec![0, 4, 7, 11, 14, 17]);
        m.insert("min11", vec![0, 3, 7, 10, 14, 17]);
        m.insert("11", vec![0, 4, 7, 10, 14, 17]);
        m.insert("maj13", vec![0, 4, 7, 11, 14, 17, 21]);
        m.insert("min13", vec![0, 3, 7, 10, 14, 17, 21]);
        m.insert("13", vec![0, 4, 7, 10, 14, 17, 21]);

        // Other
        m.insert("6", vec![0, 4, 7, 9]);
        m.insert("m6", vec![0, 3, 7, 9]);
        m.insert("5", vec![0, 7]);
        m.insert("power", vec![0, 7]);
        m
    };

    /// Values of the roman numeral symbols
    pub static ref ROMANS: HashMap<char, i32> = {
        let mut m = HashMap::new();
        m.insert('i', 1);
        m.insert('v', 5);
        m.insert('x', 10);
        m
    };

    /// Semitones above C for each natural note letter
    pub static ref NOTES_TO_INTERVALS: HashMap<char, i32> = {
        let mut m = HashMap::new();
        m.insert('C', 0);
        m.insert('D', 2);
        m.insert('E', 4);
        m.insert('F', 5);
        m.insert('G', 7);
        m.insert('A', 9);
        m.insert('B', 11);
        m
    };
}

/// Semitone shift of an accidental character
pub fn accidental_value(c: char) -> Option<i32> {
    match c {
        '#' | 's' => Some(1),
        'b' => Some(-1),
        _ => None,
    }
}

/// Value of a duration prefix like `q`, `e.` or `h..`
pub fn duration_for(c: char, dots: usize) -> Option<f64> {
    let base = *DURATIONS.get(&c)?;
    Some(base * (2.0 - 0.5f64.powi(dots as i32)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_chars() {
        assert_eq!(duration_for('q', 0), Some(0.25));
        assert_eq!(duration_for('w', 0), Some(1.0));
        assert_eq!(duration_for('e', 1), Some(0.1875));
        assert_eq!(duration_for('h', 2), Some(0.875));
        assert_eq!(duration_for('b', 0), None);
    }

    #[test]
    fn test_every_duration_char_has_value() {
        for c in DURATION_CHARS.chars() {
            assert!(DURATIONS.contains_key(&c), "missing duration for {}", c);
        }
    }

    #[test]
    fn test_scales_span_an_octave() {
        for (name, steps) in SCALES.iter() {
            let total: u32 = steps.chars().filter_map(|c| c.to_digit(10)).sum();
            assert_eq!(total, 12, "scale {} spans {}", name, total);
        }
    }
}
