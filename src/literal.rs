//! # Python-literal reader
//!
//! Minimal reader for the Python-literal subset written by the efficiency-map bakery
//! ("embaked" files) and used in signal-region selections:
//!
//! ```text
//! { (500., 100.): { 'SR1': 0.01, 'SR2_MET100': 0.02, '__nevents__': 10000 },
//!   (600., 100.): { ... } }
//! ```
//!
//! Supported: dicts, lists, tuples (including `(a,)`), single/double quoted strings,
//! numbers (exponents, `inf`, `nan`), `None`, `True`, `False`, trailing commas and `#`
//! comments. Bare words (`SR1`) are read as strings.
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending, one_of},
    combinator::{all_consuming, map, opt, peek, value},
    error::Error,
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};

use crate::massplane_errors::MassPlaneError;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Parse a complete literal.
    ///
    /// Return
    /// ----------
    /// * The literal, or [`MassPlaneError::LiteralParse`] carrying the start of the offending input.
    pub fn parse(input: &str) -> Result<Self, MassPlaneError> {
        all_consuming(delimited(skip, literal, skip))
            .parse(input)
            .map(|(_, lit)| lit)
            .map_err(|e| {
                let context = match e {
                    nom::Err::Error(err) | nom::Err::Failure(err) => err.input,
                    nom::Err::Incomplete(_) => input,
                };
                MassPlaneError::LiteralParse(context.chars().take(40).collect())
            })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(v) => Some(*v),
            Literal::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Literal, Literal)]> {
        match self {
            Literal::Dict(items) => Some(items),
            _ => None,
        }
    }

    /// `true` if this is a sequence containing at least one sequence.
    pub fn is_nested(&self) -> bool {
        self.as_sequence()
            .is_some_and(|items| items.iter().any(|i| i.as_sequence().is_some()))
    }

    /// All numbers of a (possibly nested) sequence, depth first; `None` on non-numeric leaves.
    pub fn flatten_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Literal::Number(v) => Some(vec![*v]),
            Literal::List(items) | Literal::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(item.flatten_numbers()?);
                }
                Some(out)
            }
            _ => None,
        }
    }
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), not_line_ending).parse(input)
}

fn skip(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, comment)))).parse(input)
}

fn token<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(skip, inner, skip)
}

fn number(input: &str) -> IResult<&str, Literal> {
    map(
        preceded(peek(one_of("+-0123456789.")), double),
        Literal::Number,
    )
    .parse(input)
}

fn quoted(input: &str) -> IResult<&str, Literal> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| Literal::Str(s.to_string()),
    )
    .parse(input)
}

fn word(input: &str) -> IResult<&str, Literal> {
    let (rest, w) =
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
            .parse(input)?;
    let lit = match w {
        "None" => Literal::None,
        "True" => Literal::Bool(true),
        "False" => Literal::Bool(false),
        "inf" => Literal::Number(f64::INFINITY),
        "nan" => Literal::Number(f64::NAN),
        other => Literal::Str(other.to_string()),
    };
    Ok((rest, lit))
}

fn items(input: &str) -> IResult<&str, (Vec<Literal>, bool)> {
    let (rest, items) = separated_list0(token(char(',')), literal).parse(input)?;
    let (rest, trailing) = opt(token(char(','))).parse(rest)?;
    Ok((rest, (items, trailing.is_some())))
}

fn list(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(token(char('[')), items, token(char(']'))),
        |(items, _)| Literal::List(items),
    )
    .parse(input)
}

fn tuple(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(token(char('(')), items, token(char(')'))),
        |(mut items, trailing)| {
            if items.len() == 1 && !trailing {
                items.remove(0)
            } else {
                Literal::Tuple(items)
            }
        },
    )
    .parse(input)
}

fn dict(input: &str) -> IResult<&str, Literal> {
    let entries = separated_list0(
        token(char(',')),
        separated_pair(literal, token(char(':')), literal),
    );
    map(
        delimited(
            token(char('{')),
            (entries, opt(token(char(',')))),
            token(char('}')),
        ),
        |(entries, _)| Literal::Dict(entries),
    )
    .parse(input)
}

pub(crate) fn literal(input: &str) -> IResult<&str, Literal> {
    token(alt((number, quoted, dict, list, tuple, word))).parse(input)
}

#[cfg(test)]
mod literal_test {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(Literal::parse("1.5e3"), Ok(Literal::Number(1500.0)));
        assert_eq!(Literal::parse("-2"), Ok(Literal::Number(-2.0)));
        assert_eq!(Literal::parse("'SR1'"), Ok(Literal::Str("SR1".into())));
        assert_eq!(Literal::parse("\"a b\""), Ok(Literal::Str("a b".into())));
        assert_eq!(Literal::parse("None"), Ok(Literal::None));
        assert_eq!(Literal::parse("True"), Ok(Literal::Bool(true)));
        assert_eq!(Literal::parse("SR_2j"), Ok(Literal::Str("SR_2j".into())));
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            Literal::parse("(500., 100.)"),
            Ok(Literal::Tuple(vec![
                Literal::Number(500.0),
                Literal::Number(100.0)
            ]))
        );
        assert_eq!(Literal::parse("(1)"), Ok(Literal::Number(1.0)));
        assert_eq!(
            Literal::parse("(1,)"),
            Ok(Literal::Tuple(vec![Literal::Number(1.0)]))
        );
        let nested = Literal::parse("[(1, 2), [3, 4,],]").unwrap();
        assert!(nested.is_nested());
        assert_eq!(nested.flatten_numbers(), Some(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_dict_with_comments() {
        let text = "# baked\n{ (500, 100): {'SR1': 0.1, '__t0__': 'x'},\n (600, 100) : {'SR1': 0.2}, }\n";
        let lit = Literal::parse(text).unwrap();
        let entries = lit.as_dict().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0.flatten_numbers(), Some(vec![600.0, 100.0]));
        let inner = entries[0].1.as_dict().unwrap();
        assert_eq!(inner[0].0.as_str(), Some("SR1"));
        assert_eq!(inner[0].1.as_f64(), Some(0.1));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Literal::parse("{1: 2"),
            Err(MassPlaneError::LiteralParse(_))
        ));
        assert!(Literal::parse("[1, 2] 3").is_err());
    }
}
