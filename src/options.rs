//! Ambient options and per-node overrides
//!
//! `Options` is the context every node resolves against: key, scale,
//! octave, duration, modifier. It doubles as the configuration format:
//! a partial TOML or JSON document is merged over the defaults.
//!
//! ```toml
//! key = "D4"
//! scale = "Dorian"
//! octave = -1
//! seed = 42
//!
//! [bindings.B]
//! type = "sample"
//! name = "bd"
//! ```

use crate::defaults::{DEFAULT_DURATION, DEFAULT_KEY, DEFAULT_SCALE};
use crate::error::{Result, ZiffersError};
use crate::scale::{get_scale, note_name_to_midi};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Tonic of the scale, as a note name ("C4", "Bb3") or a MIDI number
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Midi(i32),
    Name(String),
}

impl Key {
    pub fn to_midi(&self) -> i32 {
        match self {
            Key::Midi(note) => *note,
            Key::Name(name) => note_name_to_midi(name),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<i32> for Key {
    fn from(note: i32) -> Self {
        Key::Midi(note)
    }
}

/// A scale: a named one, explicit semitone steps, or steps in cents
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Name(String),
    Steps(Vec<f64>),
    Cents { cents: Vec<f64> },
}

impl Scale {
    /// Semitone step intervals between consecutive degrees
    pub fn intervals(&self) -> Vec<f64> {
        get_scale(self)
    }

    /// Number of degrees per octave
    pub fn len(&self) -> usize {
        self.intervals().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Semitones covered by one octave of the scale
    pub fn span(&self) -> f64 {
        self.intervals().iter().sum()
    }

    pub fn is_chromatic(&self) -> bool {
        match self {
            Scale::Name(name) => name.eq_ignore_ascii_case("chromatic"),
            _ => false,
        }
    }
}

impl From<&str> for Scale {
    fn from(name: &str) -> Self {
        Scale::Name(name.to_string())
    }
}

impl From<Vec<f64>> for Scale {
    fn from(steps: Vec<f64>) -> Self {
        Scale::Steps(steps)
    }
}

/// External payload a variable can stand for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Binding {
    Sample { name: String },
    Function { run: String },
}

/// Ambient options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    pub octave: i32,
    /// Whole-note fraction (0.25 is a quarter note)
    pub duration: f64,
    /// Semitone offset applied to every resolved pitch
    pub modifier: i32,
    pub bpm: f64,
    /// Seed for random pitches and integers; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub bindings: HashMap<String, Binding>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            key: Some(Key::from(DEFAULT_KEY)),
            scale: Some(Scale::from(DEFAULT_SCALE)),
            octave: 0,
            duration: DEFAULT_DURATION,
            modifier: 0,
            bpm: 120.0,
            seed: None,
            bindings: HashMap::new(),
        }
    }
}

impl Options {
    /// Options without key or scale; pitches stay unresolved
    pub fn bare() -> Self {
        Self {
            key: None,
            scale: None,
            ..Self::default()
        }
    }

    /// Load options from a TOML or JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse options from TOML, falling back to JSON
    pub fn parse(content: &str) -> Result<Self> {
        let toml_error = match toml::from_str(content) {
            Ok(options) => return Ok(options),
            Err(e) => e,
        };

        serde_json::from_str(content).map_err(|json_error| {
            ZiffersError::Config(format!(
                "not valid TOML ({}) or JSON ({})",
                toml_error.to_string().trim(),
                json_error
            ))
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ZiffersError::Config(e.to_string()))
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_scale(mut self, scale: impl Into<Scale>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_binding(mut self, name: &str, binding: Binding) -> Self {
        self.bindings.insert(name.to_string(), binding);
        self
    }
}

/// Overrides attached to a single node, usually from its prefixes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalOptions {
    pub key: Option<Key>,
    pub scale: Option<Scale>,
    pub duration: Option<f64>,
    /// Added to the ambient octave
    pub octave: Option<i32>,
    /// Replaces the ambient octave
    pub octave_change: Option<i32>,
    /// Added to the ambient modifier
    pub modifier: Option<i32>,
}

impl LocalOptions {
    pub fn is_empty(&self) -> bool {
        *self == LocalOptions::default()
    }

    /// Options as seen by this node: absent fields come from `ambient`,
    /// octave and modifier add onto it, `octave_change` replaces the octave
    pub fn apply(&self, ambient: &Options) -> Options {
        let mut merged = ambient.clone();
        if let Some(key) = &self.key {
            merged.key = Some(key.clone());
        }
        if let Some(scale) = &self.scale {
            merged.scale = Some(scale.clone());
        }
        if let Some(duration) = self.duration {
            merged.duration = duration;
        }
        merged.octave =
            self.octave_change.unwrap_or(ambient.octave) + self.octave.unwrap_or(0);
        merged.modifier = ambient.modifier + self.modifier.unwrap_or(0);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_octave_adds() {
        let ambient = Options::default().with_octave(1);
        let local = LocalOptions {
            octave: Some(-2),
            ..Default::default()
        };
        assert_eq!(local.apply(&ambient).octave, -1);
    }

    #[test]
    fn test_octave_change_replaces() {
        let ambient = Options::default().with_octave(1);
        let local = LocalOptions {
            octave_change: Some(3),
            ..Default::default()
        };
        assert_eq!(local.apply(&ambient).octave, 3);
    }

    #[test]
    fn test_absent_fields_keep_ambient() {
        let ambient = Options::default().with_duration(0.5).with_key("D4");
        let local = LocalOptions {
            scale: Some(Scale::from("Dorian")),
            ..Default::default()
        };
        let merged = local.apply(&ambient);
        assert_eq!(merged.duration, 0.5);
        assert_eq!(merged.key, Some(Key::from("D4")));
        assert_eq!(merged.scale, Some(Scale::from("Dorian")));
    }

    #[test]
    fn test_parse_partial_toml() {
        let options = Options::parse("key = \"E3\"\noctave = 2\n").unwrap();
        assert_eq!(options.key, Some(Key::from("E3")));
        assert_eq!(options.octave, 2);
        assert_eq!(options.duration, DEFAULT_DURATION);
        assert_eq!(options.scale, Some(Scale::from(DEFAULT_SCALE)));
    }

    #[test]
    fn test_parse_json_with_steps_and_bindings() {
        let json = r#"{
            "key": 62,
            "scale": [2, 1, 2, 2, 1, 2, 2],
            "bindings": { "B": { "type": "sample", "name": "bd" } }
        }"#;
        let options = Options::parse(json).unwrap();
        assert_eq!(options.key, Some(Key::Midi(62)));
        assert_eq!(
            options.scale,
            Some(Scale::Steps(vec![2.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0]))
        );
        assert_eq!(
            options.bindings.get("B"),
            Some(&Binding::Sample {
                name: "bd".to_string()
            })
        );
    }

    #[test]
    fn test_parse_cents_scale() {
        let options = Options::parse("scale = { cents = [200.0, 200.0, 100.0] }").unwrap();
        assert_eq!(
            options.scale,
            Some(Scale::Cents {
                cents: vec![200.0, 200.0, 100.0]
            })
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Options::parse("octave = [1"),
            Err(ZiffersError::Config(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let options = Options::default().with_key("A3").with_seed(7);
        let text = options.to_toml().unwrap();
        assert_eq!(Options::parse(&text).unwrap(), options);
    }
}
