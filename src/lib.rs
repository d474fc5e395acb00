//! # Ziffers - Numeric Music Notation
//!
//! Ziffers writes melodies as scale degrees instead of note names. A pattern
//! such as `q 0 2 e 4 5 [6 7]` is parsed into a tree, then evaluated against a
//! key and scale into a flat list of events carrying MIDI notes, frequencies
//! and durations.
//!
//! ## Core Features
//!
//! - **Scale degrees**: `0`-`9`, `T`, `E` relative to any key and scale,
//!   including microtonal scales given in cents
//! - **Durations**: duration characters (`w h q e s ...`), dots and decimals
//! - **Structure**: lists, subdivisions, cycles, repeats, measures
//! - **Generators**: random degrees, random integers, ranges, expressions
//! - **Harmony**: chords, inversions, roman numerals with named chord types
//! - **List arithmetic**: `(0 1 2)+(0 3)`, arpeggios, zips and mapped expressions
//! - **Euclidean rhythms**: `(0 2)<3,8>(r)`
//!
//! ## Quick Start
//!
//! ```rust
//! use ziffers::{zparse, Options};
//!
//! let melody = zparse("q 0 2 e 4 5", Options::default()).unwrap();
//! let notes: Vec<i32> = melody
//!     .evaluated_values()
//!     .iter()
//!     .filter_map(|e| e.as_pitch().and_then(|p| p.note))
//!     .collect();
//! assert_eq!(notes, vec![60, 64, 67, 69]);
//! assert_eq!(melody.total_duration(), 0.75);
//! ```
//!
//! ### Looping across cycles
//!
//! ```rust
//! use ziffers::{zparse, Options};
//!
//! // Each cycle picks the next value of <1 3>
//! let mut melody = zparse("0 <1 3>", Options::default().with_seed(1)).unwrap();
//! let degrees: Vec<i32> = melody
//!     .take(4)
//!     .unwrap()
//!     .iter()
//!     .filter_map(|e| e.as_pitch().map(|p| p.pitch_class))
//!     .collect();
//! assert_eq!(degrees, vec![0, 1, 0, 3]);
//! ```

pub mod ast;
pub mod defaults;
pub mod error;
pub mod error_diagnostics;
pub mod euclid;
pub mod evaluator;
pub mod event;
pub mod expression;
mod list_ops;
pub mod options;
pub mod parser;
pub mod random;
pub mod runtime;
pub mod scale;

pub use ast::{Item, Node};
pub use error::{Result, ZiffersError};
pub use evaluator::{Context, Evaluator};
pub use event::{Chord, Event, Field, Pitch, Polyphony, Rest, Value};
pub use options::{Binding, Key, Options, Scale};
pub use parser::parse_expression;
pub use runtime::Ziffers;

/// Parse `text` and evaluate its first cycle with `options`
pub fn zparse(text: &str, options: Options) -> Result<Ziffers> {
    parse_expression(text)?.with_options(options)
}
