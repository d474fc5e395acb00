//! Tree evaluation
//!
//! Walks the parse tree depth-first, left to right, threading a `Context`
//! of ambient options through it and emitting resolved events.
//!
//! Evaluation runs in two phases. The walk produces `Step`s: either a
//! ready event, or a subdivision whose children still wait for their share
//! of the subdivision's duration. `assign_durations` then divides each
//! subdivision's budget among its children, recursively.
//!
//! Scoping:
//! - `( )`, `[ ]`, `[: :]`, `(: :)` and each variable of `AB` run in a copy
//!   of the context, so changes inside them stay inside
//! - a value picked from `< >` and euclid steps run in the current context
//! - `|` restores the options the sequence started with

use crate::ast::{
    Change, Euclid, Item, Node, Repeated, RomanNumeral, Sequence, VariableAssignment,
};
use crate::defaults::DEFAULT_SCALE;
use crate::error::{Result, ZiffersError};
use crate::euclid::euclidean_rhythm;
use crate::event::{Chord, Event, Function, Pitch, Polyphony, Rest, Sample};
use crate::options::{Binding, LocalOptions, Options, Scale};
use crate::random::RandomSource;
use crate::scale::{chord_from_degree, midi_to_freq, midi_to_pitch_class, parse_roman};
use std::collections::HashMap;
use tracing::trace;

/// Ambient state for one evaluation pass
#[derive(Clone, Debug)]
pub struct Context {
    pub options: Options,
    start: Options,
    pub measure: usize,
    variables: HashMap<String, Node>,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Self {
            start: options.clone(),
            options,
            measure: 0,
            variables: HashMap::new(),
        }
    }

    fn scoped(&self, local: &LocalOptions) -> Context {
        let mut scope = self.clone();
        if !local.is_empty() {
            scope.options = local.apply(&self.options);
        }
        scope
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::Duration(duration) => self.options.duration = duration,
            Change::Octave(octave) => self.options.octave = octave,
            Change::OctaveAdd(octave) => self.options.octave += octave,
        }
    }

    fn reset_measure(&mut self) {
        self.options = self.start.clone();
        self.measure += 1;
    }
}

/// Output of the first phase
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Ready(Event),
    /// Children waiting for their share of `budget`
    Subdivided { budget: f64, steps: Vec<Step> },
}

/// Second phase: give every subdivided child its share of the duration
pub fn assign_durations(steps: Vec<Step>) -> Result<Vec<Event>> {
    let mut events = Vec::with_capacity(steps.len());
    for step in steps {
        match step {
            Step::Ready(event) => events.push(event),
            Step::Subdivided { budget, steps } => divide(budget, steps, &mut events)?,
        }
    }
    Ok(events)
}

fn divide(budget: f64, steps: Vec<Step>, out: &mut Vec<Event>) -> Result<()> {
    if steps.is_empty() {
        return Err(ZiffersError::EmptySequence("subdivision".to_string()));
    }

    let share = budget / steps.len() as f64;
    for step in steps {
        match step {
            Step::Ready(mut event) => {
                event.set_duration(share);
                out.push(event);
            }
            Step::Subdivided { steps, .. } => divide(share, steps, out)?,
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct Evaluator {
    pub(crate) random: RandomSource,
}

impl Evaluator {
    pub fn new(random: RandomSource) -> Self {
        Self { random }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomSource::seeded(seed))
    }

    /// Evaluate `nodes` in order, sharing `ctx` between them
    pub fn evaluate(&mut self, nodes: &mut [Node], ctx: &mut Context) -> Result<Vec<Event>> {
        let mut steps = Vec::new();
        self.realize_all(nodes, ctx, &mut steps)?;
        assign_durations(steps)
    }

    /// Evaluate one node in a copy of `ctx`
    pub fn evaluate_scoped(&mut self, node: &mut Node, ctx: &Context) -> Result<Vec<Event>> {
        let mut scope = ctx.clone();
        let mut steps = Vec::new();
        self.realize(node, &mut scope, &mut steps)?;
        assign_durations(steps)
    }

    pub(crate) fn realize_all(
        &mut self,
        nodes: &mut [Node],
        ctx: &mut Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        for node in nodes.iter_mut() {
            self.realize(node, ctx, out)?;
        }
        Ok(())
    }

    pub(crate) fn realize(
        &mut self,
        node: &mut Node,
        ctx: &mut Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        match node {
            Node::Whitespace(_) => {}
            Node::Measure(_) => ctx.reset_measure(),
            Node::Modification(modification) => ctx.apply(modification.change),
            Node::Pitch(pitch) => {
                let mut pitch = pitch.clone();
                pitch.resolve(&ctx.options);
                out.push(Step::Ready(Event::Pitch(pitch)));
            }
            Node::Chord(chord) => {
                let mut chord = chord.clone();
                chord.resolve(&ctx.options);
                out.push(Step::Ready(Event::Chord(chord)));
            }
            Node::Rest(rest) => {
                let mut rest = rest.clone();
                if rest.duration.is_none() {
                    rest.duration = Some(rest.local.apply(&ctx.options).duration);
                }
                out.push(Step::Ready(Event::Rest(rest)));
            }
            Node::RomanNumeral(roman) => {
                let chord = self.roman_chord(roman, ctx)?;
                out.push(Step::Ready(Event::Chord(chord)));
            }
            Node::RandomPitch(random) => {
                let options = random.local.apply(&ctx.options);
                let degrees = options
                    .scale
                    .unwrap_or_else(|| Scale::from(DEFAULT_SCALE))
                    .len();
                let pitch_class = self.random.index(degrees) as i32;
                let pitch = create_pitch(pitch_class, &random.text, &random.local, ctx);
                out.push(Step::Ready(Event::Pitch(pitch)));
            }
            Node::RandomInteger(random) => {
                let value = self.random.integer(random.min, random.max);
                let pitch = create_pitch(value, &random.text, &random.local, ctx);
                out.push(Step::Ready(Event::Pitch(pitch)));
            }
            Node::Integer(integer) => {
                let pitch = create_pitch(integer.value, &integer.text, &LocalOptions::default(), ctx);
                out.push(Step::Ready(Event::Pitch(pitch)));
            }
            Node::Range(range) => {
                // the ambient octave counts twice: once carried on the
                // range's pitches, once again when they resolve
                let local = LocalOptions {
                    octave: Some(range.local.octave.unwrap_or(ctx.options.octave)),
                    ..range.local.clone()
                };
                for value in range.values() {
                    let pitch = create_pitch(value, &value.to_string(), &local, ctx);
                    out.push(Step::Ready(Event::Pitch(pitch)));
                }
            }
            Node::Expression(expression) => {
                let value = expression.expr.eval(None)?.floor() as i32;
                let pitch = create_pitch(value, &expression.text, &expression.local, ctx);
                out.push(Step::Ready(Event::Pitch(pitch)));
            }
            Node::Sample(sample) => {
                let mut sample = sample.clone();
                sample.duration.get_or_insert(ctx.options.duration);
                out.push(Step::Ready(Event::Sample(sample)));
            }
            Node::Function(function) => {
                let mut function = function.clone();
                function.duration.get_or_insert(ctx.options.duration);
                out.push(Step::Ready(Event::Function(function)));
            }
            Node::Polyphony(polyphony) => {
                out.push(Step::Ready(Event::Polyphony(polyphony.clone())));
            }
            Node::Sequence(sequence) => {
                let mut scope = ctx.scoped(&sequence.local);
                self.realize_all(&mut sequence.values, &mut scope, out)?;
            }
            Node::Cyclic(cyclic) => {
                if let Some(value) = cyclic.get_value() {
                    self.realize(value, ctx, out)?;
                }
            }
            Node::Subdivision(subdivision) => {
                let mut scope = ctx.scoped(&subdivision.local);
                let budget = scope.options.duration;
                let mut steps = Vec::new();
                self.realize_all(&mut subdivision.values, &mut scope, &mut steps)?;
                out.push(Step::Subdivided { budget, steps });
            }
            Node::RepeatedSequence(repeated) => self.realize_repeat(repeated, ctx, out)?,
            Node::RepeatedListSequence(repeated) => {
                let times = self.resolve_integer(&mut repeated.repeats, ctx)?;
                for _ in 0..times.max(0) {
                    let mut scope = ctx.clone();
                    self.realize_all(&mut repeated.values, &mut scope, out)?;
                }
            }
            Node::ListOperation(operation) => self.realize_list_operation(operation, ctx, out)?,
            Node::Euclid(euclid) => self.realize_euclid(euclid, ctx, out)?,
            Node::VariableAssignment(assignment) => self.assign(assignment, ctx)?,
            Node::Variable(variable) => {
                self.realize_variable(&variable.name, &variable.text, ctx, out)?
            }
            Node::VariableList(list) => {
                let mut layers = Vec::with_capacity(list.values.len());
                for variable in &list.values {
                    let mut scope = ctx.clone();
                    let mut steps = Vec::new();
                    self.realize_variable(&variable.name, &variable.text, &mut scope, &mut steps)?;
                    layers.push(assign_durations(steps)?);
                }
                out.push(Step::Ready(Event::Polyphony(Polyphony {
                    text: list.text.clone(),
                    layers,
                })));
            }
        }
        Ok(())
    }

    /// Realize the body once per repeat; every pass replays the random
    /// draws of the first
    fn realize_repeat(
        &mut self,
        repeated: &mut Repeated,
        ctx: &Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        let times = self.resolve_integer(&mut repeated.repeats, ctx)?;
        if times <= 0 {
            return Ok(());
        }

        self.random.record();
        let result = self.replay(&mut repeated.values, times as usize, ctx, out);
        self.random.finish();
        result
    }

    fn replay(
        &mut self,
        values: &mut [Node],
        times: usize,
        ctx: &Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        for pass in 0..times {
            if pass > 0 {
                self.random.rewind();
            }
            let mut scope = ctx.clone();
            self.realize_all(values, &mut scope, out)?;
        }
        Ok(())
    }

    /// Numeric value of a repeat count or similar operand
    pub(crate) fn resolve_integer(&mut self, node: &mut Node, ctx: &Context) -> Result<i32> {
        if let Node::Integer(integer) = node {
            return Ok(integer.value);
        }

        let mut scope = ctx.clone();
        let mut steps = Vec::new();
        self.realize(node, &mut scope, &mut steps)?;
        steps
            .iter()
            .find_map(|step| match step {
                Step::Ready(Event::Pitch(pitch)) => Some(pitch.pitch_class),
                _ => None,
            })
            .ok_or_else(|| ZiffersError::EmptySequence(format!("number '{}'", node.text())))
    }

    fn realize_euclid(
        &mut self,
        euclid: &mut Euclid,
        ctx: &Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        let pattern = euclidean_rhythm(euclid.pulses, euclid.length, euclid.rotate);
        trace!("euclid {} -> {:?}", euclid.text, pattern);

        let (onset_local, mut onsets) = elements_mut(&mut euclid.onset);
        if onsets.is_empty() {
            return Err(ZiffersError::EmptySequence(format!("euclid onset '{}'", euclid.text)));
        }
        let (offset_local, mut offsets) = match euclid.offset.as_deref_mut() {
            Some(node) => elements_mut(node),
            None => (LocalOptions::default(), Vec::new()),
        };

        let mut onset_scope = ctx.scoped(&onset_local);
        let mut offset_scope = ctx.scoped(&offset_local);
        let (mut on, mut off) = (0, 0);

        for hit in pattern {
            if hit {
                let index = on % onsets.len();
                self.realize(&mut *onsets[index], &mut onset_scope, out)?;
                on += 1;
            } else {
                if offsets.is_empty() {
                    let rest = Rest::new("r").with_duration(ctx.options.duration);
                    out.push(Step::Ready(Event::Rest(rest)));
                } else {
                    let index = off % offsets.len();
                    self.realize(&mut *offsets[index], &mut offset_scope, out)?;
                }
                off += 1;
            }
        }
        Ok(())
    }

    fn assign(&mut self, assignment: &mut VariableAssignment, ctx: &mut Context) -> Result<()> {
        let value = if assignment.pre_eval {
            let events = self.evaluate_scoped(&mut assignment.value, ctx)?;
            let nodes = events.into_iter().map(Node::from).collect();
            Node::Sequence(Sequence::list(assignment.value.text(), nodes))
        } else {
            (*assignment.value).clone()
        };
        ctx.variables.insert(assignment.name.clone(), value);
        Ok(())
    }

    /// A use of a variable evaluates its own copy of the stored tree
    fn realize_variable(
        &mut self,
        name: &str,
        text: &str,
        ctx: &mut Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        if let Some(stored) = ctx.variables.get(name) {
            let mut copy = stored.clone();
            return self.realize(&mut copy, ctx, out);
        }

        let duration = Some(ctx.options.duration);
        let event = match ctx.options.bindings.get(name) {
            Some(Binding::Sample { name }) => Event::Sample(Sample {
                text: text.to_string(),
                name: name.clone(),
                duration,
            }),
            Some(Binding::Function { run }) => Event::Function(Function {
                text: text.to_string(),
                run: run.clone(),
                duration,
            }),
            None => return Err(ZiffersError::UnknownVariable(name.to_string())),
        };
        out.push(Step::Ready(event));
        Ok(())
    }

    /// Chord for a roman numeral, rebuilt only when the options change
    fn roman_chord(&mut self, roman: &mut RomanNumeral, ctx: &Context) -> Result<Chord> {
        let options = roman.local.apply(&ctx.options);
        if let Some((built_for, chord)) = &roman.evaluated {
            if *built_for == options {
                return Ok(chord.clone());
            }
        }

        let (Some(key), Some(scale)) = (options.key.clone(), options.scale.clone()) else {
            return Err(ZiffersError::Unresolved(format!("roman numeral '{}'", roman.text)));
        };

        let degree = parse_roman(&roman.numeral)?;
        let shift = options.octave * scale.span().round() as i32 + options.modifier;
        let notes = chord_from_degree(degree, roman.chord_type.as_deref(), &scale, key.to_midi(), 1);

        let pitches = notes
            .into_iter()
            .map(|note| note + shift)
            .map(|note| {
                let spelled = midi_to_pitch_class(note, &key, &scale);
                Pitch {
                    text: spelled.text,
                    local: LocalOptions::default(),
                    pitch_class: spelled.pitch_class,
                    octave: Some(spelled.octave),
                    modifier: Some(spelled.modifier),
                    duration: Some(options.duration),
                    note: Some(note),
                    freq: Some(midi_to_freq(note as f64)),
                    pitch_bend: None,
                    key: Some(key.clone()),
                    scale: Some(scale.clone()),
                }
            })
            .collect();

        let mut chord = Chord::new(&roman.text, pitches).with_inversions(roman.inversions);
        chord.resolve(&options);
        roman.evaluated = Some((options, chord.clone()));
        Ok(chord)
    }
}

/// A pitch for a generated degree, with the node's overrides merged over
/// the ambient options
fn create_pitch(pitch_class: i32, text: &str, local: &LocalOptions, ctx: &Context) -> Pitch {
    let mut pitch = Pitch::new(pitch_class)
        .with_text(text)
        .with_local(local.clone());
    pitch.resolve(&ctx.options);
    pitch
}

/// Non-whitespace elements of a list node and the list's overrides
fn elements_mut(node: &mut Node) -> (LocalOptions, Vec<&mut Node>) {
    match node {
        Node::Sequence(sequence) => (
            sequence.local.clone(),
            sequence
                .values
                .iter_mut()
                .filter(|n| !n.is_whitespace())
                .collect(),
        ),
        other => (LocalOptions::default(), vec![other]),
    }
}
