//! nom parser for Ziffers notation
//!
//! Turns pattern text into a list of `Node`s. Whitespace is kept as
//! `Node::Whitespace` and every node records the slice it was parsed from,
//! so the node texts concatenate back to the input.

use crate::ast::{
    Change, Cyclic, Euclid, Expression, Integer, ListOperation, Modification, Node, Operation,
    Operator, RandomInteger, RandomPitch, Range, Repeated, RomanNumeral, Sequence, Subdivision,
    Variable, VariableAssignment, VariableList,
};
use crate::defaults::{accidental_value, duration_for, DURATION_CHARS};
use crate::error::Result;
use crate::error_diagnostics::diagnose_parse_failure;
use crate::event::{Chord, Pitch, Rest};
use crate::expression::parse_expr;
use crate::options::LocalOptions;
use crate::runtime::Ziffers;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace1, one_of, satisfy},
    combinator::{consumed, eof, map, map_opt, map_res, opt, peek, recognize, value, verify},
    multi::{many0, many1, many_m_n},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

/// Parse a pattern into an uninitialized `Ziffers` root
pub fn parse_expression(input: &str) -> Result<Ziffers> {
    Ok(Ziffers::new(input, parse_nodes(input)?))
}

/// Parse a pattern into its top-level nodes
pub fn parse_nodes(input: &str) -> Result<Vec<Node>> {
    match sequence(input) {
        Ok(("", nodes)) => Ok(nodes),
        Ok((remaining, _)) => Err(diagnose_parse_failure(input, remaining).into()),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(diagnose_parse_failure(input, e.input).into())
        }
        Err(nom::Err::Incomplete(_)) => Err(diagnose_parse_failure(input, "").into()),
    }
}

fn sequence(input: &str) -> IResult<&str, Vec<Node>> {
    many0(item)(input)
}

fn item(input: &str) -> IResult<&str, Node> {
    alt((
        whitespace,
        map(recognize(char('|')), |s: &str| Node::Measure(s.to_string())),
        assignment,
        variable_list,
        variable,
        repeated_sequence,
        repeated_list,
        random_integer,
        list_like,
        subdivision,
        modification,
        eval_block,
        range,
        roman_numeral,
        rest,
        random_pitch,
        chord_or_pitch,
        cycle,
    ))(input)
}

fn whitespace(input: &str) -> IResult<&str, Node> {
    map(multispace1, |s: &str| Node::Whitespace(s.to_string()))(input)
}

// Numbers

fn signed_int(input: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i32>())(input)
}

fn unsigned(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn decimal(input: &str) -> IResult<&str, f64> {
    map_res(recognize(tuple((digit1, char('.'), digit1))), |s: &str| {
        s.parse::<f64>()
    })(input)
}

// Prefixes

#[derive(Clone, Copy, Debug)]
enum Prefix {
    Octave(i32),
    OctaveChange(i32),
    Accidental(i32),
    Duration(f64),
}

fn octave_marks(input: &str) -> IResult<&str, i32> {
    map(many1(one_of("^_")), |marks: Vec<char>| {
        marks.iter().map(|c| if *c == '^' { 1 } else { -1 }).sum()
    })(input)
}

fn escaped_octave(input: &str) -> IResult<&str, i32> {
    delimited(char('<'), signed_int, char('>'))(input)
}

fn escaped_decimal(input: &str) -> IResult<&str, f64> {
    delimited(char('<'), decimal, char('>'))(input)
}

/// `q`, `e.`, `qe` (summed)
fn duration_chars(input: &str) -> IResult<&str, f64> {
    map(
        many1(pair(one_of(DURATION_CHARS), many0(char('.')))),
        |chars: Vec<(char, Vec<char>)>| {
            chars
                .iter()
                .filter_map(|(c, dots)| duration_for(*c, dots.len()))
                .sum()
        },
    )(input)
}

fn duration_prefix(input: &str) -> IResult<&str, f64> {
    alt((escaped_decimal, duration_chars))(input)
}

fn accidentals(input: &str) -> IResult<&str, i32> {
    map(many1(one_of("#b")), |marks: Vec<char>| {
        marks.iter().filter_map(|c| accidental_value(*c)).sum()
    })(input)
}

fn prefix(input: &str) -> IResult<&str, Prefix> {
    alt((
        map(octave_marks, Prefix::Octave),
        map(escaped_decimal, Prefix::Duration),
        map(escaped_octave, Prefix::OctaveChange),
        map(accidentals, Prefix::Accidental),
        map(duration_chars, Prefix::Duration),
    ))(input)
}

fn prefixes(input: &str) -> IResult<&str, LocalOptions> {
    map(many0(prefix), |prefixes| {
        let mut local = LocalOptions::default();
        for prefix in prefixes {
            match prefix {
                Prefix::Octave(o) => local.octave = Some(local.octave.unwrap_or(0) + o),
                Prefix::OctaveChange(o) => local.octave_change = Some(o),
                Prefix::Accidental(m) => local.modifier = Some(local.modifier.unwrap_or(0) + m),
                Prefix::Duration(d) => local.duration = Some(local.duration.unwrap_or(0.0) + d),
            }
        }
        local
    })(input)
}

fn with_duration(duration: Option<f64>) -> LocalOptions {
    LocalOptions {
        duration,
        ..LocalOptions::default()
    }
}

// Control items

/// Lookahead: a control item stands alone
fn boundary(input: &str) -> IResult<&str, ()> {
    peek(alt((
        value((), multispace1),
        value((), eof),
        value((), one_of(")]>|:")),
    )))(input)
}

fn modification(input: &str) -> IResult<&str, Node> {
    map(
        consumed(terminated(
            alt((
                map(duration_chars, Change::Duration),
                map(decimal, Change::Duration),
                map(escaped_decimal, Change::Duration),
                map(octave_marks, Change::OctaveAdd),
                map(escaped_octave, Change::Octave),
            )),
            boundary,
        )),
        |(text, change)| {
            Node::Modification(Modification {
                text: text.to_string(),
                change,
            })
        },
    )(input)
}

// Pitches and chords

fn degree(input: &str) -> IResult<&str, i32> {
    alt((
        map_res(
            recognize(pair(opt(char('-')), satisfy(|c| c.is_ascii_digit()))),
            |s: &str| s.parse::<i32>(),
        ),
        value(10, char('T')),
        value(11, char('E')),
    ))(input)
}

fn tone(input: &str) -> IResult<&str, Pitch> {
    map(consumed(pair(prefixes, degree)), |(text, (local, pc))| {
        Pitch::new(pc).with_text(text).with_local(local)
    })(input)
}

fn inversion(input: &str) -> IResult<&str, i32> {
    preceded(char('%'), signed_int)(input)
}

fn chord(input: &str) -> IResult<&str, Node> {
    map(
        consumed(tuple((opt(duration_prefix), tone, many1(tone), opt(inversion)))),
        |(text, (duration, first, others, inversions))| {
            let mut tones = vec![first];
            tones.extend(others);
            let mut chord = Chord::new(text, tones).with_inversions(inversions);
            chord.local = with_duration(duration);
            Node::Chord(chord)
        },
    )(input)
}

fn pitch(input: &str) -> IResult<&str, Node> {
    map(
        consumed(pair(opt(duration_prefix), tone)),
        |(text, (duration, mut pitch))| {
            if let Some(d) = duration {
                pitch.local.duration = Some(pitch.local.duration.unwrap_or(0.0) + d);
            }
            pitch.text = text.to_string();
            Node::Pitch(pitch)
        },
    )(input)
}

fn chord_or_pitch(input: &str) -> IResult<&str, Node> {
    alt((chord, pitch))(input)
}

fn rest(input: &str) -> IResult<&str, Node> {
    map(consumed(pair(opt(duration_prefix), char('r'))), |(text, (duration, _))| {
        let mut rest = Rest::new(text);
        rest.local = with_duration(duration);
        Node::Rest(rest)
    })(input)
}

fn random_pitch(input: &str) -> IResult<&str, Node> {
    map(consumed(terminated(prefixes, char('?'))), |(text, local)| {
        Node::RandomPitch(RandomPitch {
            text: text.to_string(),
            local,
        })
    })(input)
}

fn random_integer(input: &str) -> IResult<&str, Node> {
    map(
        consumed(pair(
            prefixes,
            delimited(
                char('('),
                separated_pair(signed_int, char(','), signed_int),
                char(')'),
            ),
        )),
        |(text, (local, (a, b)))| {
            let mut random = RandomInteger::new(text, a, b);
            random.local = local;
            Node::RandomInteger(random)
        },
    )(input)
}

fn range(input: &str) -> IResult<&str, Node> {
    map(
        consumed(tuple((prefixes, signed_int, tag(".."), signed_int))),
        |(text, (local, start, _, end))| {
            Node::Range(Range {
                text: text.to_string(),
                local,
                start,
                end,
            })
        },
    )(input)
}

fn roman_numeral(input: &str) -> IResult<&str, Node> {
    map(
        consumed(tuple((
            opt(duration_prefix),
            recognize(many1(one_of("iv"))),
            opt(preceded(char('^'), take_while1(|c: char| c.is_ascii_alphanumeric()))),
            opt(inversion),
        ))),
        |(text, (duration, numeral, chord_type, inversions))| {
            let mut roman = RomanNumeral::new(text, numeral);
            roman.local = with_duration(duration);
            roman.chord_type = chord_type.map(str::to_string);
            roman.inversions = inversions;
            Node::RomanNumeral(roman)
        },
    )(input)
}

// Expression blocks

fn expression_item(input: &str) -> IResult<&str, Node> {
    map(
        consumed(alt((
            map(pair(duration_prefix, parse_expr), |(d, e)| (Some(d), e)),
            map(parse_expr, |e| (None, e)),
        ))),
        |(text, (duration, expr))| {
            Node::Expression(Expression {
                text: text.to_string(),
                local: with_duration(duration),
                expr,
            })
        },
    )(input)
}

fn eval_block(input: &str) -> IResult<&str, Node> {
    map(
        consumed(delimited(
            char('{'),
            many0(alt((whitespace, expression_item))),
            char('}'),
        )),
        |(text, values)| Node::Sequence(Sequence::plain(text, values)),
    )(input)
}

// Lists and their operations

fn list(input: &str) -> IResult<&str, Sequence> {
    map(
        consumed(pair(prefixes, delimited(char('('), sequence, char(')')))),
        |(text, (local, values))| Sequence {
            local,
            ..Sequence::list(text, values)
        },
    )(input)
}

fn subdivision(input: &str) -> IResult<&str, Node> {
    map(
        consumed(pair(prefixes, delimited(char('['), sequence, char(']')))),
        |(text, (local, values))| {
            Node::Subdivision(Subdivision {
                text: text.to_string(),
                local,
                values,
            })
        },
    )(input)
}

fn cycle(input: &str) -> IResult<&str, Node> {
    map(
        consumed(delimited(char('<'), sequence, char('>'))),
        |(text, values)| Node::Cyclic(Cyclic::new(text, values)),
    )(input)
}

/// `<pulses,length[,rotate]>` followed by an optional offset list
fn euclid_tail(input: &str) -> IResult<&str, ((usize, usize, Option<i32>), Option<Sequence>)> {
    pair(
        delimited(
            char('<'),
            tuple((
                unsigned,
                preceded(char(','), unsigned),
                opt(preceded(char(','), signed_int)),
            )),
            char('>'),
        ),
        opt(list),
    )(input)
}

fn operand(input: &str) -> IResult<&str, Node> {
    alt((
        random_integer,
        map(list, Node::Sequence),
        subdivision,
        cycle,
        range,
        random_pitch,
        chord_or_pitch,
    ))(input)
}

fn operation(input: &str) -> IResult<&str, Operation> {
    alt((
        map(preceded(tag("<>"), operand), |right| Operation {
            operator: Operator::CyclicZip,
            right: Some(right),
        }),
        map(delimited(char('{'), parse_expr, char('}')), |expr| Operation {
            operator: Operator::Map(expr),
            right: None,
        }),
        map(
            pair(
                map_opt(recognize(one_of("+-*/%@#")), Operator::from_symbol),
                operand,
            ),
            |(operator, right)| Operation {
                operator,
                right: Some(right),
            },
        ),
    ))(input)
}

/// A list, a list with a euclidean rhythm, or a chain of list operations
fn list_like(input: &str) -> IResult<&str, Node> {
    let (rest, left) = list(input)?;
    let consumed_text = |remaining: &str| input[..input.len() - remaining.len()].to_string();

    let (after, tail) = opt(euclid_tail)(rest)?;
    if let Some(((pulses, length, rotate), offset)) = tail {
        let euclid = Euclid {
            text: consumed_text(after),
            pulses,
            length,
            rotate: rotate.unwrap_or(0),
            onset: Box::new(Node::Sequence(left)),
            offset: offset.map(|list| Box::new(Node::Sequence(list))),
        };
        return Ok((after, Node::Euclid(euclid)));
    }

    let (after, operations) = many0(operation)(rest)?;
    if operations.is_empty() {
        return Ok((rest, Node::Sequence(left)));
    }
    Ok((
        after,
        Node::ListOperation(ListOperation {
            text: consumed_text(after),
            left: Box::new(Node::Sequence(left)),
            operations,
        }),
    ))
}

// Repeats

fn repeat_count(input: &str) -> IResult<&str, Node> {
    alt((
        random_integer,
        cycle,
        map(consumed(signed_int), |(text, value)| {
            Node::Integer(Integer {
                text: text.to_string(),
                value,
            })
        }),
    ))(input)
}

fn default_repeats() -> Node {
    Node::Integer(Integer {
        text: String::new(),
        value: 2,
    })
}

fn repeat_body<'a>(
    open: &'static str,
    close: char,
) -> impl FnMut(&'a str) -> IResult<&'a str, (&'a str, (Vec<Node>, Option<Node>))> {
    consumed(delimited(
        tag(open),
        pair(sequence, preceded(char(':'), opt(repeat_count))),
        char(close),
    ))
}

fn repeated(text: &str, values: Vec<Node>, repeats: Option<Node>) -> Repeated {
    Repeated {
        text: text.to_string(),
        values,
        repeats: Box::new(repeats.unwrap_or_else(default_repeats)),
    }
}

fn repeated_sequence(input: &str) -> IResult<&str, Node> {
    map(repeat_body("[:", ']'), |(text, (values, repeats))| {
        Node::RepeatedSequence(repeated(text, values, repeats))
    })(input)
}

fn repeated_list(input: &str) -> IResult<&str, Node> {
    map(repeat_body("(:", ')'), |(text, (values, repeats))| {
        Node::RepeatedListSequence(repeated(text, values, repeats))
    })(input)
}

// Variables

fn variable_name(input: &str) -> IResult<&str, char> {
    satisfy(|c| c.is_ascii_uppercase() && c != 'T' && c != 'E')(input)
}

fn assignment(input: &str) -> IResult<&str, Node> {
    map(
        consumed(tuple((
            variable_name,
            one_of("=~"),
            verify(item, |node: &Node| {
                !matches!(node, Node::Whitespace(_) | Node::Measure(_))
            }),
        ))),
        |(text, (name, op, value))| {
            Node::VariableAssignment(VariableAssignment {
                text: text.to_string(),
                name: name.to_string(),
                value: Box::new(value),
                pre_eval: op == '~',
            })
        },
    )(input)
}

fn to_variable(name: char) -> Variable {
    Variable {
        text: name.to_string(),
        name: name.to_string(),
    }
}

fn variable_list(input: &str) -> IResult<&str, Node> {
    map(
        consumed(many_m_n(2, usize::MAX, variable_name)),
        |(text, names)| {
            Node::VariableList(VariableList {
                text: text.to_string(),
                values: names.into_iter().map(to_variable).collect(),
            })
        },
    )(input)
}

fn variable(input: &str) -> IResult<&str, Node> {
    map(variable_name, |name| Node::Variable(to_variable(name)))(input)
}
