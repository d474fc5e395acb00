//! Operations between lists
//!
//! `(1 2)+(10 20)` and friends. The left operand of a chain starts out as
//! an unevaluated node; each operation turns it into events, which feed the
//! next operation.

use crate::ast::{ListOperation, Node, Operator, Sequence};
use crate::error::{Result, ZiffersError};
use crate::evaluator::{Context, Evaluator, Step};
use crate::event::{Chord, Event, Pitch};
use crate::expression::Expr;
use crate::options::{LocalOptions, Options};
use tracing::trace;

enum Operand<'a> {
    Pending(&'a mut Node),
    Events(Vec<Event>),
}

impl Evaluator {
    pub(crate) fn realize_list_operation(
        &mut self,
        operation: &mut ListOperation,
        ctx: &Context,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        trace!("list operation {}", operation.text);

        let mut left = Operand::Pending(&mut *operation.left);
        for step in operation.operations.iter_mut() {
            let result = match &step.operator {
                Operator::CyclicZip => {
                    let left_nodes = match left {
                        Operand::Pending(node) => node.elements(),
                        Operand::Events(events) => events.into_iter().map(Node::from).collect(),
                    };
                    let right_nodes = step.right.as_ref().map(Node::elements).unwrap_or_default();
                    let mut zipped = Node::Sequence(Sequence::plain("", cyclic_zip(left_nodes, right_nodes)));
                    self.evaluate_scoped(&mut zipped, ctx)?
                }
                Operator::Map(expr) => {
                    let events = self.operand_events(left, ctx)?;
                    map_events(expr, events, &ctx.options)?
                }
                operator => {
                    let events = self.operand_events(left, ctx)?;
                    let right = match step.right.as_mut() {
                        Some(node) => self.evaluate_scoped(node, ctx)?,
                        None => Vec::new(),
                    };
                    match operator {
                        Operator::VerticalArpeggio => vertical_arpeggio(&events, &right),
                        Operator::HorizontalArpeggio => horizontal_arpeggio(&events, &right),
                        arithmetic => combine(arithmetic, &events, &right, &ctx.options)?,
                    }
                }
            };
            left = Operand::Events(result);
        }

        let events = self.operand_events(left, ctx)?;
        out.extend(events.into_iter().map(Step::Ready));
        Ok(())
    }

    fn operand_events(&mut self, operand: Operand<'_>, ctx: &Context) -> Result<Vec<Event>> {
        match operand {
            Operand::Pending(node) => self.evaluate_scoped(node, ctx),
            Operand::Events(events) => Ok(events),
        }
    }
}

/// Interleave two node lists, cycling the shorter one
fn cyclic_zip(left: Vec<Node>, right: Vec<Node>) -> Vec<Node> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }

    let len = left.len().max(right.len());
    (0..len)
        .flat_map(|i| [left[i % left.len()].clone(), right[i % right.len()].clone()])
        .collect()
}

fn is_pitched(event: &&Event) -> bool {
    matches!(event, Event::Pitch(_) | Event::Chord(_))
}

/// Cartesian product of `left` and `right` under an arithmetic operator;
/// the right side is the outer loop
fn combine(operator: &Operator, left: &[Event], right: &[Event], options: &Options) -> Result<Vec<Event>> {
    let lefts: Vec<&Event> = left.iter().filter(is_pitched).collect();
    let mut result = Vec::with_capacity(lefts.len() * right.len());

    for r in right.iter().filter(is_pitched) {
        for l in &lefts {
            result.push(combine_pair(operator, l, r, options)?);
        }
    }
    Ok(result)
}

fn combine_pair(operator: &Operator, left: &Event, right: &Event, options: &Options) -> Result<Event> {
    let event = match (left, right) {
        (Event::Pitch(a), Event::Pitch(b)) => {
            Event::Pitch(derive_pitch(a, arithmetic(operator, a.pitch_class, b.pitch_class)?, options))
        }
        (Event::Chord(chord), Event::Pitch(b)) => {
            let tones = chord
                .pitch_classes
                .iter()
                .map(|tone| Ok(derive_pitch(tone, arithmetic(operator, tone.pitch_class, b.pitch_class)?, options)))
                .collect::<Result<Vec<_>>>()?;
            Event::Chord(derive_chord(tones, options))
        }
        (Event::Pitch(a), Event::Chord(chord)) => {
            let tones = chord
                .pitch_classes
                .iter()
                .map(|tone| Ok(derive_pitch(a, arithmetic(operator, a.pitch_class, tone.pitch_class)?, options)))
                .collect::<Result<Vec<_>>>()?;
            Event::Chord(derive_chord(tones, options))
        }
        (Event::Chord(x), Event::Chord(y)) => {
            let mut tones = Vec::with_capacity(x.pitch_classes.len() * y.pitch_classes.len());
            for a in &x.pitch_classes {
                for b in &y.pitch_classes {
                    tones.push(derive_pitch(a, arithmetic(operator, a.pitch_class, b.pitch_class)?, options));
                }
            }
            Event::Chord(derive_chord(tones, options))
        }
        _ => left.clone(),
    };
    Ok(event)
}

/// Floor division and floor modulo, as degrees never go fractional
fn arithmetic(operator: &Operator, a: i32, b: i32) -> Result<i32> {
    let result = match operator {
        Operator::Add => a.checked_add(b),
        Operator::Subtract => a.checked_sub(b),
        Operator::Multiply => a.checked_mul(b),
        Operator::Divide | Operator::Modulo if b == 0 => {
            return Err(ZiffersError::DivisionByZero)
        }
        // euclidean division only matches floor division for positive divisors
        Operator::Divide => a
            .checked_div_euclid(b)
            .zip(a.checked_rem_euclid(b))
            .map(|(q, r)| if b < 0 && r != 0 { q - 1 } else { q }),
        Operator::Modulo => a
            .checked_rem_euclid(b)
            .map(|r| if b < 0 && r != 0 { r + b } else { r }),
        _ => Some(a),
    };
    result.ok_or_else(|| ZiffersError::ArithmeticOverflow(format!("{} {:?} {}", a, operator, b)))
}

/// New degree carrying over duration, octave, modifier, key and scale of
/// `template`, with the note recomputed
fn derive_pitch(template: &Pitch, pitch_class: i32, options: &Options) -> Pitch {
    let mut pitch = Pitch {
        text: pitch_class.to_string(),
        local: LocalOptions::default(),
        pitch_class,
        note: None,
        freq: None,
        pitch_bend: None,
        ..template.clone()
    };
    pitch.update_options(options);
    pitch.update_note(true);
    pitch
}

fn derive_chord(tones: Vec<Pitch>, options: &Options) -> Chord {
    let text = tones
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("");
    let mut chord = Chord::new(&text, tones);
    chord.resolve(options);
    chord
}

/// `@`: for every chord (or single pitch) on the left, pick its tones by
/// the indices on the right
fn vertical_arpeggio(left: &[Event], indices: &[Event]) -> Vec<Event> {
    let chords: Vec<Vec<Pitch>> = left
        .iter()
        .filter_map(|event| match event {
            Event::Pitch(p) => Some(vec![p.clone()]),
            Event::Chord(c) => Some(c.pitch_classes.clone()),
            _ => None,
        })
        .filter(|tones| !tones.is_empty())
        .collect();

    let pick = |tones: &[Pitch], index: &Pitch| {
        let mut tone = tones[index.pitch_class.rem_euclid(tones.len() as i32) as usize].clone();
        if index.duration.is_some() {
            tone.duration = index.duration;
        }
        tone
    };

    let mut result = Vec::new();
    for tones in &chords {
        for index in indices {
            match index {
                Event::Pitch(i) => result.push(Event::Pitch(pick(tones, i))),
                Event::Chord(ic) => {
                    let picked = ic.pitch_classes.iter().map(|i| pick(tones, i)).collect();
                    let mut chord = Chord::new(&ic.text, picked);
                    chord.sort();
                    chord.duration = ic.duration;
                    result.push(Event::Chord(chord));
                }
                other => result.push(other.clone()),
            }
        }
    }
    result
}

/// `#`: pick elements of the left list by the indices on the right
fn horizontal_arpeggio(pool: &[Event], indices: &[Event]) -> Vec<Event> {
    if pool.is_empty() {
        return Vec::new();
    }
    indices
        .iter()
        .map(|index| match index {
            Event::Pitch(i) => at(pool, i.pitch_class).clone(),
            Event::Chord(ic) => {
                let tones = ic
                    .pitch_classes
                    .iter()
                    .flat_map(|i| match at(pool, i.pitch_class) {
                        Event::Pitch(p) => vec![p.clone()],
                        Event::Chord(c) => c.pitch_classes.clone(),
                        _ => Vec::new(),
                    })
                    .collect();
                let mut chord = Chord::new(&ic.text, tones);
                chord.sort();
                chord.duration = chord.pitch_classes.first().and_then(|p| p.duration);
                Event::Chord(chord)
            }
            other => other.clone(),
        })
        .collect()
}

fn at(pool: &[Event], index: i32) -> &Event {
    &pool[index.rem_euclid(pool.len() as i32) as usize]
}

/// `{expr}`: map every degree through `expr` with `x` bound to it
fn map_events(expr: &Expr, events: Vec<Event>, options: &Options) -> Result<Vec<Event>> {
    let map_pitch = |pitch: &Pitch| -> Result<Pitch> {
        let value = expr.eval(Some(pitch.pitch_class as f64))?;
        Ok(derive_pitch(pitch, value.floor() as i32, options))
    };

    events
        .into_iter()
        .map(|event| {
            Ok(match event {
                Event::Pitch(p) => Event::Pitch(map_pitch(&p)?),
                Event::Chord(c) => {
                    let tones = c.pitch_classes.iter().map(map_pitch).collect::<Result<Vec<_>>>()?;
                    Event::Chord(derive_chord(tones, options))
                }
                other => other,
            })
        })
        .collect()
}
