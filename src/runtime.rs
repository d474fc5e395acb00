//! The `Ziffers` root
//!
//! Owns the parse tree, the options it starts every cycle from and the
//! events of the current cycle. Indexed access past the end of a cycle
//! re-evaluates the tree, so random values redraw and `< >` cycles advance.

use crate::ast::Node;
use crate::error::{Result, ZiffersError};
use crate::evaluator::{Context, Evaluator};
use crate::event::{Event, Field, Value};
use crate::options::Options;
use crate::random::RandomSource;
use tracing::debug;

#[derive(Debug)]
pub struct Ziffers {
    text: String,
    values: Vec<Node>,
    start_options: Options,
    evaluator: Evaluator,
    evaluated: Vec<Event>,
    cycle: usize,
    cursor: usize,
    initialized: bool,
}

impl Ziffers {
    /// Root over already parsed nodes; call `init` before reading events
    pub fn new(text: &str, values: Vec<Node>) -> Self {
        Self {
            text: text.to_string(),
            values,
            start_options: Options::default(),
            evaluator: Evaluator::new(RandomSource::from_entropy()),
            evaluated: Vec::new(),
            cycle: 0,
            cursor: 0,
            initialized: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        crate::parser::parse_expression(text)
    }

    /// Evaluate the first cycle with `options`
    pub fn init(&mut self, options: Options) -> Result<()> {
        self.evaluator = Evaluator::new(RandomSource::from_seed(options.seed));
        self.start_options = options;
        self.cycle = 0;
        self.cursor = 0;
        self.re_eval()?;
        self.initialized = true;
        Ok(())
    }

    pub fn with_options(mut self, options: Options) -> Result<Self> {
        self.init(options)?;
        Ok(self)
    }

    /// Evaluate the tree again from the start options
    pub fn re_eval(&mut self) -> Result<()> {
        let mut ctx = Context::new(self.start_options.clone());
        self.evaluated = self.evaluator.evaluate(&mut self.values, &mut ctx)?;
        self.cursor = 0;
        debug!(
            "Evaluated '{}' for cycle {}: {} events",
            self.text,
            self.cycle,
            self.evaluated.len()
        );
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn values(&self) -> &[Node] {
        &self.values
    }

    pub fn start_options(&self) -> &Options {
        &self.start_options
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Events of the current cycle
    pub fn evaluated_values(&self) -> &[Event] {
        &self.evaluated
    }

    pub fn len(&self) -> usize {
        self.evaluated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluated.is_empty()
    }

    /// Event at `index`, counting across cycles
    ///
    /// Moving into a different cycle re-evaluates the tree first.
    pub fn get(&mut self, index: usize) -> Result<Event> {
        if !self.is_initialized() {
            return Err(ZiffersError::Uninitialized);
        }
        let length = self.cycle_length()?;

        let cycle = index / length;
        if cycle != self.cycle {
            self.cycle = cycle;
            self.re_eval()?;
        }

        let length = self.cycle_length()?;
        Ok(self.evaluated[index % length].clone())
    }

    fn cycle_length(&self) -> Result<usize> {
        match self.evaluated.len() {
            0 => Err(ZiffersError::EmptySequence(format!("pattern '{}'", self.text))),
            n => Ok(n),
        }
    }

    /// First `n` events of an endless loop over the pattern
    pub fn take(&mut self, n: usize) -> Result<Vec<Event>> {
        self.loop_events().take(n).collect()
    }

    /// Endless events, re-evaluating at every cycle boundary
    pub fn loop_events(&mut self) -> Cycles<'_> {
        Cycles {
            root: self,
            index: 0,
        }
    }

    /// The first `n` indexed events, one row per field
    pub fn collect(&mut self, n: usize, fields: &[Field]) -> Result<Vec<Vec<Value>>> {
        let events = self.take(n)?;
        Ok(fields
            .iter()
            .map(|field| events.iter().map(|event| event.field(*field)).collect())
            .collect())
    }

    /// Walks the rest of the current cycle without re-evaluating
    pub fn iter(&mut self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || {
            let event = self.evaluated.get(self.cursor).cloned()?;
            self.cursor += 1;
            Some(event)
        })
    }

    fn tonal_field(&self, field: Field) -> Vec<Value> {
        self.evaluated
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Event::Pitch(_) | Event::Chord(_) | Event::Rest(_) | Event::Polyphony(_)
                )
            })
            .map(|e| e.field(field))
            .collect()
    }

    pub fn pitch_classes(&self) -> Vec<Value> {
        self.tonal_field(Field::PitchClass)
    }

    pub fn notes(&self) -> Vec<Value> {
        self.tonal_field(Field::Note)
    }

    pub fn octaves(&self) -> Vec<Value> {
        self.tonal_field(Field::Octave)
    }

    pub fn freqs(&self) -> Vec<Value> {
        self.tonal_field(Field::Freq)
    }

    pub fn pitch_bends(&self) -> Vec<Value> {
        self.tonal_field(Field::PitchBend)
    }

    pub fn durations(&self) -> Vec<f64> {
        self.evaluated.iter().filter_map(Event::duration).collect()
    }

    pub fn beats(&self) -> Vec<f64> {
        self.evaluated.iter().filter_map(Event::beat).collect()
    }

    /// (pitch class, duration) of every single pitch
    pub fn pairs(&self) -> Vec<(i32, f64)> {
        self.evaluated
            .iter()
            .filter_map(Event::as_pitch)
            .map(|p| (p.pitch_class, p.duration.unwrap_or(0.0)))
            .collect()
    }

    pub fn total_duration(&self) -> f64 {
        self.durations().iter().sum()
    }

    pub fn total_beats(&self) -> f64 {
        self.beats().iter().sum()
    }
}

/// Iterator returned by `Ziffers::loop_events`
pub struct Cycles<'a> {
    root: &'a mut Ziffers,
    index: usize,
}

impl Iterator for Cycles<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.root.get(self.index);
        self.index += 1;
        Some(event)
    }
}
