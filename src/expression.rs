//! Arithmetic expressions for `{...}` blocks
//!
//! A small, closed language: numbers, the bound variable `x`, parentheses,
//! unary minus, `**`, `* / %`, `+ -`, comparisons and `cond ? a : b`.
//! Expressions contain no whitespace; inside a block, whitespace separates
//! items.

use crate::error::{Result, ZiffersError};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map, map_res, not, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    /// The value the expression is applied to
    X,
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expr {
    /// Evaluate with `x` bound to `x` (if given)
    pub fn eval(&self, x: Option<f64>) -> Result<f64> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::X => x.ok_or(ZiffersError::UnboundExpressionVariable),
            Expr::Neg(inner) => Ok(-inner.eval(x)?),
            Expr::Conditional(cond, then, otherwise) => {
                if cond.eval(x)? != 0.0 {
                    then.eval(x)
                } else {
                    otherwise.eval(x)
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(x)?;
                let b = rhs.eval(x)?;
                apply(*op, a, b)
            }
        }
    }
}

fn apply(op: BinaryOp, a: f64, b: f64) -> Result<f64> {
    let truth = |v: bool| if v { 1.0 } else { 0.0 };
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ZiffersError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(ZiffersError::DivisionByZero);
            }
            a - b * (a / b).floor()
        }
        BinaryOp::Pow => a.powf(b),
        BinaryOp::Eq => truth(a == b),
        BinaryOp::Ne => truth(a != b),
        BinaryOp::Lt => truth(a < b),
        BinaryOp::Le => truth(a <= b),
        BinaryOp::Gt => truth(a > b),
        BinaryOp::Ge => truth(a >= b),
    })
}

/// Parse an unsigned decimal number
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(recognize(pair(digit1, opt(pair(char('.'), digit1)))), |s: &str| {
        s.parse::<f64>()
    })(input)
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(parse_number, Expr::Number),
        map(char('x'), |_| Expr::X),
        delimited(char('('), parse_expr, char(')')),
    ))(input)
}

/// Right-associative `**`
fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_primary(input)?;
    let (input, exponent) = opt(preceded(tag("**"), parse_unary))(input)?;
    Ok((
        input,
        match exponent {
            Some(e) => Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(e)),
            None => base,
        },
    ))
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(char('-'), parse_unary), |e| Expr::Neg(Box::new(e))),
        parse_power,
    ))(input)
}

fn parse_mul_div(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary(input)?;

    let (input, operations) = many0(tuple((
        alt((
            map(terminated(char('*'), not(char('*'))), |_| BinaryOp::Mul),
            map(char('/'), |_| BinaryOp::Div),
            map(char('%'), |_| BinaryOp::Mod),
        )),
        parse_unary,
    )))(input)?;

    Ok((input, fold(first, operations)))
}

fn parse_add_sub(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_mul_div(input)?;

    let (input, operations) = many0(tuple((
        alt((
            map(char('+'), |_| BinaryOp::Add),
            map(char('-'), |_| BinaryOp::Sub),
        )),
        parse_mul_div,
    )))(input)?;

    Ok((input, fold(first, operations)))
}

fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_add_sub(input)?;

    let (input, rest) = opt(tuple((
        alt((
            map(tag("=="), |_| BinaryOp::Eq),
            map(tag("!="), |_| BinaryOp::Ne),
            map(tag("<="), |_| BinaryOp::Le),
            map(tag(">="), |_| BinaryOp::Ge),
            map(char('<'), |_| BinaryOp::Lt),
            map(char('>'), |_| BinaryOp::Gt),
        )),
        parse_add_sub,
    )))(input)?;

    Ok((input, fold(first, rest.into_iter().collect())))
}

/// Parse a full expression (`cond ? a : b` binds loosest)
pub fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, cond) = parse_comparison(input)?;
    let (input, branches) = opt(tuple((
        preceded(char('?'), parse_expr),
        preceded(char(':'), parse_expr),
    )))(input)?;

    Ok((
        input,
        match branches {
            Some((then, otherwise)) => {
                Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
            }
            None => cond,
        },
    ))
}

fn fold(first: Expr, operations: Vec<(BinaryOp, Expr)>) -> Expr {
    operations.into_iter().fold(first, |acc, (op, expr)| {
        Expr::Binary(op, Box::new(acc), Box::new(expr))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, x: Option<f64>) -> Result<f64> {
        let (rest, expr) = parse_expr(text).expect("parse");
        assert_eq!(rest, "", "unparsed input in {}", text);
        expr.eval(x)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("3+1*2", None).unwrap(), 5.0);
        assert_eq!(eval("(3+1)*2", None).unwrap(), 8.0);
        assert_eq!(eval("2**3**2", None).unwrap(), 512.0);
        assert_eq!(eval("-2**2", None).unwrap(), -4.0);
        assert_eq!(eval("10-4-3", None).unwrap(), 3.0);
    }

    #[test]
    fn test_floor_modulo() {
        assert_eq!(eval("-7%3", None).unwrap(), 2.0);
        assert_eq!(eval("7%3", None).unwrap(), 1.0);
    }

    #[test]
    fn test_conditional_over_x() {
        assert_eq!(eval("x%3==0?x-2:x+2", Some(3.0)).unwrap(), 1.0);
        assert_eq!(eval("x%3==0?x-2:x+2", Some(4.0)).unwrap(), 6.0);
        assert_eq!(eval("(x**3)*(x+1)%12", Some(2.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("2<=2", None).unwrap(), 1.0);
        assert_eq!(eval("2>3", None).unwrap(), 0.0);
        assert_eq!(eval("1!=2", None).unwrap(), 1.0);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("1/0", None), Err(ZiffersError::DivisionByZero)));
        assert!(matches!(eval("4%0", None), Err(ZiffersError::DivisionByZero)));
        assert!(matches!(
            eval("x+1", None),
            Err(ZiffersError::UnboundExpressionVariable)
        ));
    }

    #[test]
    fn test_stops_at_whitespace() {
        let (rest, expr) = parse_expr("10 11").unwrap();
        assert_eq!(rest, " 11");
        assert_eq!(expr, Expr::Number(10.0));
    }
}
