//! Parse tree
//!
//! A pattern parses into a list of `Node`s. Leaves that can be played
//! directly (`Pitch`, `Chord`, `Rest`) share their types with the resolved
//! events; everything else is structure the evaluator expands.
//!
//! Nodes keep the exact source slice they were parsed from in `text`, so
//! joining the texts of the top-level nodes gives back the input.

use crate::event::{Chord, Event, Function, Pitch, Polyphony, Rest, Sample};
use crate::expression::Expr;
use crate::options::{LocalOptions, Options};

/// Shared view of every node
pub trait Item {
    /// Source text of the node
    fn text(&self) -> &str;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Whitespace(String),
    /// `|`: restores the options the sequence started with
    Measure(String),
    Modification(Modification),
    Pitch(Pitch),
    Chord(Chord),
    Rest(Rest),
    RomanNumeral(RomanNumeral),
    RandomPitch(RandomPitch),
    RandomInteger(RandomInteger),
    Integer(Integer),
    Range(Range),
    Expression(Expression),
    Sample(Sample),
    Function(Function),
    /// Already layered variables, as stored by `~`
    Polyphony(Polyphony),
    Sequence(Sequence),
    Cyclic(Cyclic),
    Subdivision(Subdivision),
    RepeatedSequence(Repeated),
    RepeatedListSequence(Repeated),
    ListOperation(ListOperation),
    Euclid(Euclid),
    VariableAssignment(VariableAssignment),
    Variable(Variable),
    VariableList(VariableList),
}

impl Node {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Whitespace(_))
    }

    /// The node as an event, if it already is one
    pub fn as_event(&self) -> Option<Event> {
        match self {
            Node::Pitch(p) => Some(Event::Pitch(p.clone())),
            Node::Chord(c) => Some(Event::Chord(c.clone())),
            Node::Rest(r) => Some(Event::Rest(r.clone())),
            Node::Sample(s) => Some(Event::Sample(s.clone())),
            Node::Function(f) => Some(Event::Function(f.clone())),
            Node::Polyphony(p) => Some(Event::Polyphony(p.clone())),
            _ => None,
        }
    }

    /// Elements of a list, or the node itself
    pub fn elements(&self) -> Vec<Node> {
        match self {
            Node::Sequence(seq) => seq.values.iter().filter(|n| !n.is_whitespace()).cloned().collect(),
            other => vec![other.clone()],
        }
    }
}

impl From<Event> for Node {
    fn from(event: Event) -> Self {
        match event {
            Event::Pitch(p) => Node::Pitch(p),
            Event::Chord(c) => Node::Chord(c),
            Event::Rest(r) => Node::Rest(r),
            Event::Sample(s) => Node::Sample(s),
            Event::Function(f) => Node::Function(f),
            Event::Polyphony(p) => Node::Polyphony(p),
        }
    }
}

impl Item for Node {
    fn text(&self) -> &str {
        match self {
            Node::Whitespace(text) | Node::Measure(text) => text,
            Node::Modification(m) => &m.text,
            Node::Pitch(p) => &p.text,
            Node::Chord(c) => &c.text,
            Node::Rest(r) => &r.text,
            Node::RomanNumeral(r) => &r.text,
            Node::RandomPitch(r) => &r.text,
            Node::RandomInteger(r) => &r.text,
            Node::Integer(i) => &i.text,
            Node::Range(r) => &r.text,
            Node::Expression(e) => &e.text,
            Node::Sample(s) => &s.text,
            Node::Function(f) => &f.text,
            Node::Polyphony(p) => &p.text,
            Node::Sequence(s) => &s.text,
            Node::Cyclic(c) => &c.text,
            Node::Subdivision(s) => &s.text,
            Node::RepeatedSequence(r) | Node::RepeatedListSequence(r) => &r.text,
            Node::ListOperation(l) => &l.text,
            Node::Euclid(e) => &e.text,
            Node::VariableAssignment(a) => &a.text,
            Node::Variable(v) => &v.text,
            Node::VariableList(v) => &v.text,
        }
    }
}

/// Control item changing the options for everything after it
#[derive(Clone, Debug, PartialEq)]
pub struct Modification {
    pub text: String,
    pub change: Change,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Change {
    /// Replace the ambient duration
    Duration(f64),
    /// Replace the ambient octave
    Octave(i32),
    /// Add to the ambient octave
    OctaveAdd(i32),
}

/// `i`..`vii`, optionally with a chord name and inversions
#[derive(Clone, Debug, PartialEq)]
pub struct RomanNumeral {
    pub text: String,
    pub local: LocalOptions,
    pub numeral: String,
    pub chord_type: Option<String>,
    pub inversions: Option<i32>,
    /// Last chord built and the options it was built from
    pub evaluated: Option<(Options, Chord)>,
}

impl RomanNumeral {
    pub fn new(text: &str, numeral: &str) -> Self {
        Self {
            text: text.to_string(),
            local: LocalOptions::default(),
            numeral: numeral.to_string(),
            chord_type: None,
            inversions: None,
            evaluated: None,
        }
    }
}

/// `?`: a degree drawn from the current scale
#[derive(Clone, Debug, PartialEq)]
pub struct RandomPitch {
    pub text: String,
    pub local: LocalOptions,
}

/// `(min,max)`: an inclusive random integer
#[derive(Clone, Debug, PartialEq)]
pub struct RandomInteger {
    pub text: String,
    pub local: LocalOptions,
    pub min: i32,
    pub max: i32,
}

impl RandomInteger {
    /// Bounds are swapped when given the wrong way round
    pub fn new(text: &str, a: i32, b: i32) -> Self {
        Self {
            text: text.to_string(),
            local: LocalOptions::default(),
            min: a.min(b),
            max: a.max(b),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Integer {
    pub text: String,
    pub value: i32,
}

/// `start..end`, inclusive in either direction
#[derive(Clone, Debug, PartialEq)]
pub struct Range {
    pub text: String,
    pub local: LocalOptions,
    pub start: i32,
    pub end: i32,
}

impl Range {
    pub fn values(&self) -> Vec<i32> {
        if self.start <= self.end {
            (self.start..=self.end).collect()
        } else {
            (self.end..=self.start).rev().collect()
        }
    }
}

/// `{3+1*2}` inside an expression block
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub text: String,
    pub local: LocalOptions,
    pub expr: Expr,
}

/// Plain grouping, or a `( )` list when `list` is set
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub text: String,
    pub local: LocalOptions,
    pub values: Vec<Node>,
    pub list: bool,
}

impl Sequence {
    pub fn list(text: &str, values: Vec<Node>) -> Self {
        Self {
            text: text.to_string(),
            local: LocalOptions::default(),
            values,
            list: true,
        }
    }

    pub fn plain(text: &str, values: Vec<Node>) -> Self {
        Self {
            list: false,
            ..Self::list(text, values)
        }
    }
}

/// `< >`: one value per visit, advancing across cycles
#[derive(Clone, Debug, PartialEq)]
pub struct Cyclic {
    pub text: String,
    pub values: Vec<Node>,
    pub cycle: usize,
}

impl Cyclic {
    pub fn new(text: &str, values: Vec<Node>) -> Self {
        Self {
            text: text.to_string(),
            values: values.into_iter().filter(|n| !n.is_whitespace()).collect(),
            cycle: 0,
        }
    }

    /// The value for this visit; advances the counter
    pub fn get_value(&mut self) -> Option<&mut Node> {
        if self.values.is_empty() {
            return None;
        }
        let index = self.cycle % self.values.len();
        self.cycle += 1;
        self.values.get_mut(index)
    }
}

/// `[ ]`: children share the duration the subdivision itself would take
#[derive(Clone, Debug, PartialEq)]
pub struct Subdivision {
    pub text: String,
    pub local: LocalOptions,
    pub values: Vec<Node>,
}

/// `[: :n]` and `(: :n)` bodies
#[derive(Clone, Debug, PartialEq)]
pub struct Repeated {
    pub text: String,
    pub values: Vec<Node>,
    pub repeats: Box<Node>,
}

/// Operators between lists
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    /// `@`: pick chord tones by index
    VerticalArpeggio,
    /// `#`: pick list elements by index
    HorizontalArpeggio,
    /// `<>`: interleave, cycling the shorter side
    CyclicZip,
    /// `{expr}`: map every degree through an expression over `x`
    Map(Expr),
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Subtract),
            "*" => Some(Operator::Multiply),
            "/" => Some(Operator::Divide),
            "%" => Some(Operator::Modulo),
            "@" => Some(Operator::VerticalArpeggio),
            "#" => Some(Operator::HorizontalArpeggio),
            "<>" => Some(Operator::CyclicZip),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub operator: Operator,
    /// Right operand; `Map` has none
    pub right: Option<Node>,
}

/// `left op right op right ...`, folded left to right
#[derive(Clone, Debug, PartialEq)]
pub struct ListOperation {
    pub text: String,
    pub left: Box<Node>,
    pub operations: Vec<Operation>,
}

/// `(onset)<pulses,length,rotate>(offset)`
#[derive(Clone, Debug, PartialEq)]
pub struct Euclid {
    pub text: String,
    pub pulses: usize,
    pub length: usize,
    pub rotate: i32,
    pub onset: Box<Node>,
    /// Values for the empty steps; rests when absent
    pub offset: Option<Box<Node>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableAssignment {
    pub text: String,
    pub name: String,
    pub value: Box<Node>,
    /// Evaluate once at assignment instead of at every use
    pub pre_eval: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub text: String,
    pub name: String,
}

/// Adjacent variables such as `AB`
#[derive(Clone, Debug, PartialEq)]
pub struct VariableList {
    pub text: String,
    pub values: Vec<Variable>,
}
