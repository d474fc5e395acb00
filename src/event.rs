//! Resolved events
//!
//! `Pitch`, `Chord` and `Rest` are both leaves of the parse tree and the
//! values the evaluator hands out. A parsed pitch carries only its degree
//! and prefixes; resolving it against the ambient options fills in octave,
//! duration, note, frequency and pitch bend.

use crate::error::{Result, ZiffersError};
use crate::options::{Key, LocalOptions, Options, Scale};
use crate::scale::{midi_to_freq, note_from_pc, pitch_bend};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A scale degree, possibly resolved to a MIDI note
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Pitch {
    pub text: String,
    #[serde(skip)]
    pub local: LocalOptions,
    pub pitch_class: i32,
    pub octave: Option<i32>,
    pub modifier: Option<i32>,
    pub duration: Option<f64>,
    pub note: Option<i32>,
    pub freq: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_bend: Option<u16>,
    #[serde(skip)]
    pub key: Option<Key>,
    #[serde(skip)]
    pub scale: Option<Scale>,
}

impl Pitch {
    pub fn new(pitch_class: i32) -> Self {
        Self {
            text: pitch_class.to_string(),
            local: LocalOptions::default(),
            pitch_class,
            octave: None,
            modifier: None,
            duration: None,
            note: None,
            freq: None,
            pitch_bend: None,
            key: None,
            scale: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_local(mut self, local: LocalOptions) -> Self {
        self.local = local;
        self
    }

    /// Fill every unset field from the node's own overrides merged over
    /// `ambient`. Fields already set are left alone.
    pub fn update_options(&mut self, ambient: &Options) {
        let merged = self.local.apply(ambient);
        if self.key.is_none() {
            self.key = merged.key;
        }
        if self.scale.is_none() {
            self.scale = merged.scale;
        }
        if self.duration.is_none() {
            self.duration = Some(merged.duration);
        }
        if self.octave.is_none() {
            self.octave = Some(merged.octave);
        }
        if self.modifier.is_none() {
            self.modifier = Some(merged.modifier);
        }
    }

    /// Compute note, frequency and pitch bend once key and scale are known
    ///
    /// Only recomputes an already resolved note when `force` is set.
    pub fn update_note(&mut self, force: bool) {
        if self.note.is_some() && !force {
            return;
        }
        let (Some(key), Some(scale)) = (&self.key, &self.scale) else {
            return;
        };

        let note = note_from_pc(
            key.to_midi(),
            self.pitch_class,
            scale,
            self.octave.unwrap_or(0),
            self.modifier.unwrap_or(0),
        );
        self.note = Some(note.floor() as i32);
        self.freq = Some(midi_to_freq(note));
        self.pitch_bend = pitch_bend(note);
    }

    /// Resolve against `ambient`, keeping anything already resolved
    pub fn resolve(&mut self, ambient: &Options) {
        self.update_options(ambient);
        self.update_note(false);
    }

    pub fn is_resolved(&self) -> bool {
        self.note.is_some()
    }

    /// The MIDI note, or an error if key or scale never reached this pitch
    pub fn try_note(&self) -> Result<i32> {
        self.note
            .ok_or_else(|| ZiffersError::Unresolved(format!("pitch '{}'", self.text)))
    }

    /// Move by whole octaves of the pitch's scale
    pub fn shift_octave(&mut self, octaves: i32) {
        self.octave = Some(self.octave.unwrap_or(0) + octaves);
        if let Some(note) = self.note {
            let span = self.scale.as_ref().map(|s| s.span()).unwrap_or(12.0);
            let shift = span * octaves as f64;
            self.note = Some(note + shift.round() as i32);
            self.freq = self.freq.map(|f| f * 2f64.powf(shift / 12.0));
        }
    }

    /// Beats in 4/4 (a quarter note is one beat)
    pub fn beat(&self) -> Option<f64> {
        self.duration.map(|d| d * 4.0)
    }
}

/// Simultaneous pitches, kept sorted by note once resolved
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chord {
    pub text: String,
    #[serde(skip)]
    pub local: LocalOptions,
    pub pitch_classes: Vec<Pitch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inversions: Option<i32>,
    pub duration: Option<f64>,
}

impl Chord {
    pub fn new(text: &str, pitch_classes: Vec<Pitch>) -> Self {
        Self {
            text: text.to_string(),
            local: LocalOptions::default(),
            pitch_classes,
            inversions: None,
            duration: None,
        }
    }

    pub fn with_inversions(mut self, inversions: Option<i32>) -> Self {
        self.inversions = inversions;
        self
    }

    /// Resolve every tone, apply inversions and sort by note
    pub fn resolve(&mut self, ambient: &Options) {
        let merged = self.local.apply(ambient);
        for pitch in &mut self.pitch_classes {
            pitch.resolve(&merged);
        }
        if let Some(inversions) = self.inversions.take() {
            self.invert(inversions);
        }
        self.sort();
        self.duration = self.pitch_classes.first().and_then(|p| p.duration);
    }

    /// Raise the lowest tones (positive) or lower the highest (negative)
    /// by an octave, one tone per inversion
    pub fn invert(&mut self, inversions: i32) {
        if self.pitch_classes.is_empty() || inversions == 0 {
            return;
        }
        self.sort();

        let len = self.pitch_classes.len();
        let direction = inversions.signum();
        for i in 0..inversions.unsigned_abs() as usize {
            let index = if direction > 0 {
                i % len
            } else {
                len - 1 - (i % len)
            };
            self.pitch_classes[index].shift_octave(direction);
        }
        self.sort();
    }

    pub fn sort(&mut self) {
        self.pitch_classes.sort_by_key(|p| p.note);
    }

    /// Set the chord's and every tone's duration
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = Some(duration);
        for pitch in &mut self.pitch_classes {
            pitch.duration = Some(duration);
        }
    }

    pub fn notes(&self) -> Vec<Option<i32>> {
        self.pitch_classes.iter().map(|p| p.note).collect()
    }

    pub fn freqs(&self) -> Vec<Option<f64>> {
        self.pitch_classes.iter().map(|p| p.freq).collect()
    }

    pub fn octaves(&self) -> Vec<Option<i32>> {
        self.pitch_classes.iter().map(|p| p.octave).collect()
    }

    pub fn durations(&self) -> Vec<Option<f64>> {
        self.pitch_classes.iter().map(|p| p.duration).collect()
    }

    pub fn pitch_bends(&self) -> Vec<Option<u16>> {
        self.pitch_classes.iter().map(|p| p.pitch_bend).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rest {
    pub text: String,
    #[serde(skip)]
    pub local: LocalOptions,
    pub duration: Option<f64>,
}

impl Rest {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            local: LocalOptions::default(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Deferred sample playback, opaque to the evaluator
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub text: String,
    pub name: String,
    pub duration: Option<f64>,
}

/// Deferred callback invocation, opaque to the evaluator
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Function {
    pub text: String,
    pub run: String,
    pub duration: Option<f64>,
}

/// Variables sounding together (`AB`), one layer per variable
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polyphony {
    pub text: String,
    pub layers: Vec<Vec<Event>>,
}

impl Polyphony {
    /// Duration of the longest layer
    pub fn duration(&self) -> f64 {
        self.layers
            .iter()
            .map(|layer| layer.iter().filter_map(Event::duration).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// Stretch every layer so the longest one lasts `duration`
    pub fn set_duration(&mut self, duration: f64) {
        let current = self.duration();
        if current <= 0.0 {
            return;
        }
        let factor = duration / current;
        for event in self.layers.iter_mut().flatten() {
            if let Some(d) = event.duration() {
                event.set_duration(d * factor);
            }
        }
    }
}

/// A fully evaluated item of a sequence
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Pitch(Pitch),
    Chord(Chord),
    Rest(Rest),
    Sample(Sample),
    Function(Function),
    Polyphony(Polyphony),
}

impl Event {
    pub fn text(&self) -> &str {
        match self {
            Event::Pitch(p) => &p.text,
            Event::Chord(c) => &c.text,
            Event::Rest(r) => &r.text,
            Event::Sample(s) => &s.text,
            Event::Function(f) => &f.text,
            Event::Polyphony(p) => &p.text,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Event::Pitch(p) => p.duration,
            Event::Chord(c) => c.duration,
            Event::Rest(r) => r.duration,
            Event::Sample(s) => s.duration,
            Event::Function(f) => f.duration,
            Event::Polyphony(p) => Some(p.duration()),
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        match self {
            Event::Pitch(p) => p.duration = Some(duration),
            Event::Chord(c) => c.set_duration(duration),
            Event::Rest(r) => r.duration = Some(duration),
            Event::Sample(s) => s.duration = Some(duration),
            Event::Function(f) => f.duration = Some(duration),
            Event::Polyphony(p) => p.set_duration(duration),
        }
    }

    pub fn beat(&self) -> Option<f64> {
        self.duration().map(|d| d * 4.0)
    }

    pub fn as_pitch(&self) -> Option<&Pitch> {
        match self {
            Event::Pitch(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        match self {
            Event::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_polyphony(&self) -> Option<&Polyphony> {
        match self {
            Event::Polyphony(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Event::Rest(_))
    }

    /// Extract one field; chords give one value per tone, events without
    /// the field give `Value::None`
    pub fn field(&self, field: Field) -> Value {
        match (field, self) {
            (Field::Event, event) => Value::Event(Box::new(event.clone())),
            (Field::Duration, event) => Value::from(event.duration()),
            (Field::Beat, event) => Value::from(event.beat()),
            (Field::PitchClass, Event::Pitch(p)) => Value::Int(p.pitch_class as i64),
            (Field::Note, Event::Pitch(p)) => Value::from(p.note),
            (Field::Octave, Event::Pitch(p)) => Value::from(p.octave),
            (Field::Freq, Event::Pitch(p)) => Value::from(p.freq),
            (Field::PitchBend, Event::Pitch(p)) => Value::from(p.pitch_bend.map(i32::from)),
            (field, Event::Chord(c)) => {
                Value::List(c.pitch_classes.iter().map(|p| Event::Pitch(p.clone()).field(field)).collect())
            }
            (field, Event::Polyphony(p)) => Value::List(
                p.layers
                    .iter()
                    .map(|layer| Value::List(layer.iter().map(|e| e.field(field)).collect()))
                    .collect(),
            ),
            _ => Value::None,
        }
    }
}

/// Fields that can be collected from events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    PitchClass,
    Note,
    Duration,
    Beat,
    Octave,
    Freq,
    PitchBend,
    Event,
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "pitch_class" | "pc" => Ok(Field::PitchClass),
            "note" => Ok(Field::Note),
            "duration" => Ok(Field::Duration),
            "beat" => Ok(Field::Beat),
            "octave" => Ok(Field::Octave),
            "freq" => Ok(Field::Freq),
            "pitch_bend" => Ok(Field::PitchBend),
            "event" => Ok(Field::Event),
            other => Err(format!("Unknown field: {}", other)),
        }
    }
}

/// A collected field value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    List(Vec<Value>),
    Event(Box<Event>),
    None,
}

impl From<Option<i32>> for Value {
    fn from(value: Option<i32>) -> Self {
        value.map(|v| Value::Int(v as i64)).unwrap_or(Value::None)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map(Value::Float).unwrap_or(Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Event(event) => write!(f, "{}", event.text()),
            Value::None => write!(f, "-"),
        }
    }
}
