//! # Coordinate expressions
//!
//! Arithmetic expressions over the axis variables `x, y, z, w`, as they appear on the right-hand
//! side of mass-plane equations (`[[x, 0.5*x + 0.5*y, y]]`).
//!
//! ## Grammar
//! -----------------
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | '+' unary | power
//! power  := atom (('**' | '^') unary)?
//! atom   := number | func '(' expr ')' | variable | '(' expr ')'
//! func   := sqrt | exp | log | abs
//! ```
//!
//! Any other identifier is rejected with [`MassPlaneError::UnknownSymbol`].
//!
//! ## Symbolic operations
//! -----------------
//! * [`Expression::eval`] evaluates a point.
//! * [`Expression::rounded`] rounds every numeric literal to a number of significant figures.
//! * [`Expression::affine`] decomposes an expression affine in the axis variables into
//!   coefficients and a constant, folding constant sub-expressions. This is what the inverse
//!   transform of [`crate::axes`] is built on.
//! * `Display` renders a canonical form with minimal parentheses.
use std::{collections::BTreeSet, fmt};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{all_consuming, map, opt, peek, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use crate::{
    coordinates::{format_number, AxisVariable, Coordinates},
    massplane_errors::MassPlaneError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sqrt,
    Exp,
    Log,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Func> {
        match name {
            "sqrt" => Some(Func::Sqrt),
            "exp" => Some(Func::Exp),
            "log" => Some(Func::Log),
            "abs" => Some(Func::Abs),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Abs => "abs",
        }
    }

    fn apply(&self, v: f64) -> f64 {
        match self {
            Func::Sqrt => v.sqrt(),
            Func::Exp => v.exp(),
            Func::Log => v.ln(),
            Func::Abs => v.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Var(AxisVariable),
    Neg(Box<Expression>),
    BinOp(BinOp, Box<Expression>, Box<Expression>),
    Call(Func, Box<Expression>),
}

/// Affine decomposition `c_x·x + c_y·y + c_z·z + c_w·w + constant`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AffineForm {
    pub coefficients: [f64; 4],
    pub constant: f64,
}

impl AffineForm {
    fn constant(value: f64) -> Self {
        AffineForm {
            coefficients: [0.0; 4],
            constant: value,
        }
    }

    fn variable(var: AxisVariable) -> Self {
        let mut form = AffineForm::default();
        form.coefficients[var.index()] = 1.0;
        form
    }

    pub fn is_constant(&self) -> bool {
        self.coefficients.iter().all(|c| *c == 0.0)
    }

    pub fn coefficient(&self, var: AxisVariable) -> f64 {
        self.coefficients[var.index()]
    }

    fn scale(self, factor: f64) -> Self {
        AffineForm {
            coefficients: self.coefficients.map(|c| c * factor),
            constant: self.constant * factor,
        }
    }

    fn combine(self, other: Self, sign: f64) -> Self {
        let mut coefficients = self.coefficients;
        for (c, o) in coefficients.iter_mut().zip(other.coefficients) {
            *c += sign * o;
        }
        AffineForm {
            coefficients,
            constant: self.constant + sign * other.constant,
        }
    }
}

/// Round `value` to `digits` significant figures.
pub fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits as i32 - 1 - magnitude);
    (value * factor).round() / factor
}

// -------------------------------------------------------------------------------------------------
// Parser
// -------------------------------------------------------------------------------------------------

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Expression> {
    map(
        preceded(peek(one_of("0123456789.")), double),
        Expression::Number,
    )
    .parse(input)
}

fn call(input: &str) -> IResult<&str, Expression> {
    let (rest, name) = identifier(input)?;
    let Some(func) = Func::from_name(name) else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    };
    let (rest, arg) = delimited(ws(char('(')), expression, char(')')).parse(rest)?;
    Ok((rest, Expression::Call(func, Box::new(arg))))
}

fn variable(input: &str) -> IResult<&str, Expression> {
    let (rest, name) = identifier(input)?;
    match name.parse::<AxisVariable>() {
        Ok(var) => Ok((rest, Expression::Var(var))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    }
}

fn atom(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        number,
        call,
        variable,
        delimited(char('('), expression, char(')')),
    )))
    .parse(input)
}

fn power(input: &str) -> IResult<&str, Expression> {
    let (rest, base) = atom(input)?;
    let (rest, exponent) = opt(preceded(ws(alt((tag("**"), tag("^")))), unary)).parse(rest)?;
    Ok(match exponent {
        Some(exponent) => (
            rest,
            Expression::BinOp(BinOp::Pow, Box::new(base), Box::new(exponent)),
        ),
        None => (rest, base),
    })
}

fn unary(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(char('-')), unary), |e| {
            Expression::Neg(Box::new(e))
        }),
        preceded(ws(char('+')), unary),
        power,
    ))
    .parse(input)
}

fn term(input: &str) -> IResult<&str, Expression> {
    let (rest, first) = unary(input)?;
    let (rest, others) = many0(pair(ws(one_of("*/")), unary)).parse(rest)?;
    let folded = others.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '*' { BinOp::Mul } else { BinOp::Div };
        Expression::BinOp(op, Box::new(acc), Box::new(rhs))
    });
    Ok((rest, folded))
}

/// nom parser for one expression, surrounding whitespace included.
pub(crate) fn expression(input: &str) -> IResult<&str, Expression> {
    let (rest, first) = term(input)?;
    let (rest, others) = many0(pair(ws(one_of("+-")), term)).parse(rest)?;
    let folded = others.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
        Expression::BinOp(op, Box::new(acc), Box::new(rhs))
    });
    Ok((rest, folded))
}

/// Reject identifiers that are neither axis variables nor known functions.
///
/// Numbers (including exponents such as `1e-10`) and quoted strings are skipped; `allowed`
/// lists extra identifiers accepted by the caller.
pub(crate) fn check_symbols(input: &str, allowed: &[&str]) -> Result<(), MassPlaneError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || c == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let known = name.parse::<AxisVariable>().is_ok()
                || Func::from_name(&name).is_some()
                || allowed.contains(&name.as_str());
            if !known {
                return Err(MassPlaneError::UnknownSymbol(name));
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}

impl Expression {
    /// Parse a full expression string.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: the expression, e.g. `"0.5*x + 0.5*y"`
    ///
    /// Return
    /// ----------
    /// * The parsed expression, [`MassPlaneError::UnknownSymbol`] for identifiers other than
    ///   `x, y, z, w` and the known functions, or [`MassPlaneError::ExpressionParse`].
    pub fn parse(input: &str) -> Result<Self, MassPlaneError> {
        check_symbols(input, &[])?;
        all_consuming(expression)
            .parse(input)
            .map(|(_, expr)| expr)
            .map_err(|_| MassPlaneError::ExpressionParse(input.to_string()))
    }

    pub fn number(value: f64) -> Self {
        Expression::Number(value)
    }

    pub fn var(var: AxisVariable) -> Self {
        Expression::Var(var)
    }

    /// Evaluate at `coordinates`; `None` if a variable is missing or the result is not finite.
    pub fn eval(&self, coordinates: &Coordinates) -> Option<f64> {
        let value = match self {
            Expression::Number(v) => *v,
            Expression::Var(var) => coordinates.get(*var)?,
            Expression::Neg(e) => -e.eval(coordinates)?,
            Expression::Call(func, arg) => func.apply(arg.eval(coordinates)?),
            Expression::BinOp(op, lhs, rhs) => {
                let l = lhs.eval(coordinates)?;
                let r = rhs.eval(coordinates)?;
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                }
            }
        };
        value.is_finite().then_some(value)
    }

    /// Axis variables referenced by the expression.
    pub fn variables(&self) -> BTreeSet<AxisVariable> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<AxisVariable>) {
        match self {
            Expression::Number(_) => {}
            Expression::Var(var) => {
                vars.insert(*var);
            }
            Expression::Neg(e) | Expression::Call(_, e) => e.collect_variables(vars),
            Expression::BinOp(_, lhs, rhs) => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
        }
    }

    /// Copy of the expression with every numeric literal rounded to `digits` significant figures.
    pub fn rounded(&self, digits: u32) -> Self {
        match self {
            Expression::Number(v) => Expression::Number(round_significant(*v, digits)),
            Expression::Var(var) => Expression::Var(*var),
            Expression::Neg(e) => Expression::Neg(Box::new(e.rounded(digits))),
            Expression::Call(func, e) => Expression::Call(*func, Box::new(e.rounded(digits))),
            Expression::BinOp(op, lhs, rhs) => Expression::BinOp(
                *op,
                Box::new(lhs.rounded(digits)),
                Box::new(rhs.rounded(digits)),
            ),
        }
    }

    /// Decompose into an [`AffineForm`], or `None` if the expression is not affine in the
    /// axis variables.
    pub fn affine(&self) -> Option<AffineForm> {
        match self {
            Expression::Number(v) => Some(AffineForm::constant(*v)),
            Expression::Var(var) => Some(AffineForm::variable(*var)),
            Expression::Neg(e) => Some(e.affine()?.scale(-1.0)),
            Expression::Call(func, arg) => {
                let arg = arg.affine()?;
                arg.is_constant()
                    .then(|| AffineForm::constant(func.apply(arg.constant)))
            }
            Expression::BinOp(op, lhs, rhs) => {
                let l = lhs.affine()?;
                let r = rhs.affine()?;
                match op {
                    BinOp::Add => Some(l.combine(r, 1.0)),
                    BinOp::Sub => Some(l.combine(r, -1.0)),
                    BinOp::Mul if l.is_constant() => Some(r.scale(l.constant)),
                    BinOp::Mul if r.is_constant() => Some(l.scale(r.constant)),
                    BinOp::Div if r.is_constant() && r.constant != 0.0 => {
                        Some(l.scale(1.0 / r.constant))
                    }
                    BinOp::Pow if l.is_constant() && r.is_constant() => {
                        Some(AffineForm::constant(l.constant.powf(r.constant)))
                    }
                    BinOp::Pow if r.is_constant() && r.constant == 1.0 => Some(l),
                    _ => None,
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Number(v) if *v < 0.0 => 3,
            Expression::Number(_) | Expression::Var(_) | Expression::Call(..) => 5,
            Expression::Neg(_) => 3,
            Expression::BinOp(BinOp::Add | BinOp::Sub, ..) => 1,
            Expression::BinOp(BinOp::Mul | BinOp::Div, ..) => 2,
            Expression::BinOp(BinOp::Pow, ..) => 4,
        }
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "(")?;
            self.fmt_inner(f)?;
            write!(f, ")")
        } else {
            self.fmt_inner(f)
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(v) => write!(f, "{}", format_number(*v)),
            Expression::Var(var) => write!(f, "{var}"),
            Expression::Neg(e) => {
                write!(f, "-")?;
                e.fmt_with(f, 3)
            }
            Expression::Call(func, arg) => {
                write!(f, "{}(", func.name())?;
                arg.fmt_with(f, 0)?;
                write!(f, ")")
            }
            Expression::BinOp(op, lhs, rhs) => {
                let (symbol, left, right) = match op {
                    BinOp::Add => (" + ", 1, 1),
                    BinOp::Sub => (" - ", 1, 2),
                    BinOp::Mul => ("*", 2, 3),
                    BinOp::Div => ("/", 2, 3),
                    BinOp::Pow => ("**", 5, 3),
                };
                lhs.fmt_with(f, left)?;
                write!(f, "{symbol}")?;
                rhs.fmt_with(f, right)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, 0)
    }
}
