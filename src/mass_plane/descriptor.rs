//! nom grammar of mass plane descriptors.
//!
//! ```text
//! [[x, y], [x, y]]            two branches
//! 2*[[x, 0.5*x + 0.5*y, y]]   repetition of the branch list
//! [['x', 'y'], '*']           quoted expressions, wildcard branch
//! [[(x, 1e-10), y], *]        (mass, width) vertex
//! {0: 'x', 1: ('y', 1e-10)}   graph form, vertex index → expression
//! ```
use std::collections::BTreeMap;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, value},
    error::Error,
    multi::separated_list0,
    sequence::{delimited, separated_pair, terminated},
    IResult, Parser,
};

use crate::{
    axes::VertexExpression,
    expression::{check_symbols, expression, Expression},
    massplane_errors::MassPlaneError,
};

/// One parsed branch.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchDescriptor {
    Wild,
    Vertices(Vec<VertexExpression>),
}

/// A parsed descriptor: branch lists, or the vertex map of a graph plane.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaneDescriptor {
    Branches(Vec<BranchDescriptor>),
    Graph(BTreeMap<usize, VertexExpression>),
}

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn unsigned(input: &str) -> IResult<&str, usize> {
    ws(map_res(digit1, |s: &str| s.parse::<usize>())).parse(input)
}

fn quoted_expression(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        delimited(char('\''), expression, char('\'')),
        delimited(char('"'), expression, char('"')),
        expression,
    )))
    .parse(input)
}

fn vertex(input: &str) -> IResult<&str, VertexExpression> {
    alt((
        map(
            delimited(
                ws(char('(')),
                separated_pair(quoted_expression, char(','), quoted_expression),
                ws(char(')')),
            ),
            |(m, w)| VertexExpression::MassWidth(m, w),
        ),
        map(quoted_expression, VertexExpression::Mass),
    ))
    .parse(input)
}

fn sequence<'a, O, P>(
    open: char,
    item: P,
    close: char,
) -> impl Parser<&'a str, Output = Vec<O>, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(
        ws(char(open)),
        terminated(separated_list0(char(','), item), opt(ws(char(',')))),
        ws(char(close)),
    )
}

fn branch(input: &str) -> IResult<&str, BranchDescriptor> {
    alt((
        value(
            BranchDescriptor::Wild,
            ws(alt((tag("'*'"), tag("\"*\""), tag("*")))),
        ),
        map(sequence('[', vertex, ']'), BranchDescriptor::Vertices),
    ))
    .parse(input)
}

fn branches(input: &str) -> IResult<&str, Vec<BranchDescriptor>> {
    sequence('[', branch, ']').parse(input)
}

fn repeated(input: &str) -> IResult<&str, Vec<BranchDescriptor>> {
    let (rest, (n, _, list)) = (unsigned, char('*'), branches).parse(input)?;
    let repeated = list.iter().cycle().take(n * list.len()).cloned().collect();
    Ok((rest, repeated))
}

fn graph(input: &str) -> IResult<&str, BTreeMap<usize, VertexExpression>> {
    map(
        sequence('{', separated_pair(unsigned, char(':'), vertex), '}'),
        |entries| entries.into_iter().collect(),
    )
    .parse(input)
}

impl PlaneDescriptor {
    /// Parse a descriptor string.
    ///
    /// Return
    /// ----------
    /// * [`MassPlaneError::UnknownSymbol`] for identifiers other than `x, y, z, w` and the
    ///   supported functions, [`MassPlaneError::DescriptorParse`] for malformed input.
    pub fn parse(input: &str) -> Result<Self, MassPlaneError> {
        check_symbols(input, &[])?;
        let parsed = alt((
            map(repeated, PlaneDescriptor::Branches),
            map(branches, PlaneDescriptor::Branches),
            map(graph, PlaneDescriptor::Graph),
        ));
        all_consuming(parsed)
            .parse(input)
            .map(|(_, descriptor)| descriptor)
            .map_err(|e| {
                let context = match e {
                    nom::Err::Error(err) | nom::Err::Failure(err) => err.input,
                    nom::Err::Incomplete(_) => input,
                };
                MassPlaneError::DescriptorParse(format!(
                    "{input} (at '{}')",
                    context.chars().take(30).collect::<String>()
                ))
            })
    }
}

#[cfg(test)]
mod descriptor_test {
    use super::*;

    fn vertices(branch: &BranchDescriptor) -> Vec<String> {
        match branch {
            BranchDescriptor::Wild => vec!["*".into()],
            BranchDescriptor::Vertices(v) => v.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_branch_lists() {
        let PlaneDescriptor::Branches(b) = PlaneDescriptor::parse("[[x, y], [x, y]]").unwrap()
        else {
            panic!("expected branches");
        };
        assert_eq!(b.len(), 2);
        assert_eq!(vertices(&b[1]), vec!["x", "y"]);

        let PlaneDescriptor::Branches(b) =
            PlaneDescriptor::parse(" 2*[[x, 0.5*x + 0.5*y, y]] ").unwrap()
        else {
            panic!("expected branches");
        };
        assert_eq!(b.len(), 2);
        assert_eq!(b[0], b[1]);

        let PlaneDescriptor::Branches(b) =
            PlaneDescriptor::parse("[['x', 'y'], '*']").unwrap()
        else {
            panic!("expected branches");
        };
        assert_eq!(b[1], BranchDescriptor::Wild);
        assert_eq!(vertices(&b[0]), vec!["x", "y"]);
    }

    #[test]
    fn test_widths_and_graph() {
        let PlaneDescriptor::Branches(b) =
            PlaneDescriptor::parse("[[(x, 1e-10), y], *]").unwrap()
        else {
            panic!("expected branches");
        };
        assert_eq!(vertices(&b[0]), vec!["(x, 1e-10)", "y"]);

        let PlaneDescriptor::Graph(g) = PlaneDescriptor::parse("{0: 'x', 2: ('y', 1e-10)}").unwrap()
        else {
            panic!("expected a graph");
        };
        assert_eq!(g.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(g[&2].to_string(), "(y, 1e-10)");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            PlaneDescriptor::parse("[[x, q]]"),
            Err(MassPlaneError::UnknownSymbol("q".into()))
        );
        assert!(matches!(
            PlaneDescriptor::parse("[[x, y]"),
            Err(MassPlaneError::DescriptorParse(_))
        ));
        assert!(PlaneDescriptor::parse("[[x, y]] extra").is_err());
    }
}
