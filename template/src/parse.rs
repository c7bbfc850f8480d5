//! Markup parser with position tracking
//!
//! Parses the component markup language into [`Node`] trees. Parse problems
//! become `Error`-severity diagnostics with the position where parsing
//! stopped; an unclosed element is reported against its opening tag, which
//! is the mistake template authors actually make.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, multispace0, multispace1},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Input, Parser,
};
use nom_locate::LocatedSpan;

use diagnostics::{Diagnostic, Diagnostics, Position};

use crate::ast::{Attribute, Node};

pub type Span<'a> = LocatedSpan<&'a str>;

/// Parser result type carrying message-bearing errors.
type PResult<'a, T> = IResult<Span<'a>, T, MarkupError<'a>>;

/// Parse error with the position it occurred at and a displayable message.
#[derive(Debug)]
pub struct MarkupError<'a> {
    pub span: Span<'a>,
    pub message: String,
}

impl<'a> MarkupError<'a> {
    fn unclosed(span: Span<'a>, name: &str) -> Self {
        Self {
            span,
            message: format!("unclosed element <{}>", name),
        }
    }
}

impl<'a> ParseError<Span<'a>> for MarkupError<'a> {
    fn from_error_kind(input: Span<'a>, _kind: ErrorKind) -> Self {
        Self {
            span: input,
            message: "unexpected or malformed markup".to_string(),
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn position(span: Span<'_>) -> Position {
    Position::new(span.location_line() as usize, span.get_utf8_column())
}

fn ident(input: Span) -> PResult<Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"), tag("-")))),
    ))
    .parse(input)
}

fn attribute(input: Span) -> PResult<Attribute> {
    let (input, name) = ident(input)?;
    let (input, _) = tag("=").parse(input)?;
    let (input, attr_value) = delimited(tag("\""), opt(is_not("\"")), tag("\"")).parse(input)?;
    Ok((
        input,
        Attribute {
            name: name.fragment().to_string(),
            value: attr_value
                .map(|v: Span| v.fragment().to_string())
                .unwrap_or_default(),
        },
    ))
}

fn open_tag(input: Span) -> PResult<(Span, Vec<Attribute>, bool)> {
    let (input, _) = tag("<").parse(input)?;
    let (input, name) = ident(input)?;
    let (input, attributes) = many0(preceded(multispace1, attribute)).parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, self_closing) =
        alt((value(true, tag("/>")), value(false, tag(">")))).parse(input)?;
    Ok((input, (name, attributes, self_closing)))
}

fn element(input: Span) -> PResult<Node> {
    let start = input;
    let (input, (name, attributes, self_closing)) = open_tag(input)?;
    let tag_name = name.fragment().to_string();

    if self_closing {
        return Ok((
            input,
            Node::Element {
                name: tag_name,
                attributes,
                children: Vec::new(),
                self_closing: true,
            },
        ));
    }

    let (input, children) = many0(node).parse(input)?;

    let closing = format!("</{}>", tag_name);
    let close: PResult<Span> = tag(closing.as_str()).parse(input);
    match close {
        Ok((input, _)) => Ok((
            input,
            Node::Element {
                name: tag_name,
                attributes,
                children,
                self_closing: false,
            },
        )),
        Err(_) => Err(nom::Err::Failure(MarkupError::unclosed(start, &tag_name))),
    }
}

/// Take everything up to the `)` that closes the current hole, tracking
/// nested parentheses inside the embedded expression.
fn balanced(input: Span) -> PResult<Span> {
    let mut depth = 0usize;
    for (offset, c) in input.fragment().char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                let (rest, inner) = input.take_split(offset);
                return Ok((rest, inner));
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    Err(nom::Err::Error(MarkupError::from_error_kind(
        input,
        ErrorKind::TakeUntil,
    )))
}

fn interpolation(input: Span) -> PResult<Node> {
    let (input, _) = tag("@").parse(input)?;
    alt((
        map(delimited(tag("("), balanced, tag(")")), |e: Span| {
            Node::Expression(e.fragment().to_string())
        }),
        map(ident, |i: Span| Node::Interpolation(i.fragment().to_string())),
    ))
    .parse(input)
}

fn text(input: Span) -> PResult<Node> {
    map(is_not("<@"), |t: Span| Node::Text(t.fragment().to_string())).parse(input)
}

fn node(input: Span) -> PResult<Node> {
    alt((element, interpolation, text)).parse(input)
}

/// Result of parsing one markup item.
#[derive(Debug)]
pub struct MarkupParse {
    pub nodes: Option<Vec<Node>>,
    pub diagnostics: Diagnostics,
}

/// Parse a complete markup source item.
pub fn parse_markup(source: &str) -> MarkupParse {
    let mut diagnostics = Diagnostics::new();
    match all_consuming(many0(node)).parse(Span::new(source)) {
        Ok((_, nodes)) => MarkupParse {
            nodes: Some(nodes),
            diagnostics,
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            diagnostics.push(Diagnostic::error(e.message).at(position(e.span)));
            MarkupParse {
                nodes: None,
                diagnostics,
            }
        }
        Err(nom::Err::Incomplete(_)) => {
            diagnostics.push(Diagnostic::error("truncated markup input"));
            MarkupParse {
                nodes: None,
                diagnostics,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_interpolation() {
        let parsed = parse_markup("hello @name!");
        let nodes = parsed.nodes.unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("hello ".into()),
                Node::Interpolation("name".into()),
                Node::Text("!".into()),
            ]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_nested_elements() {
        let parsed = parse_markup("<div><b>hi</b><br/></div>");
        let nodes = parsed.nodes.unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Element { name, children, .. } = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(name, "div");
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_attributes() {
        let parsed = parse_markup("<span class=\"big\" id=\"x\">a</span>");
        let Node::Element { attributes, .. } = &parsed.nodes.unwrap()[0] else {
            panic!("expected element");
        };
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].name, "class");
        assert_eq!(attributes[0].value, "big");
    }

    #[test]
    fn test_expression_hole() {
        let parsed = parse_markup("total: @(count + 1)");
        let nodes = parsed.nodes.unwrap();
        assert_eq!(nodes[1], Node::Expression("count + 1".into()));
    }

    #[test]
    fn test_expression_hole_with_nested_parens() {
        let parsed = parse_markup("total: @((count + 1) * 2) items");
        let nodes = parsed.nodes.unwrap();
        assert_eq!(nodes[1], Node::Expression("(count + 1) * 2".into()));
        assert_eq!(nodes[2], Node::Text(" items".into()));
    }

    #[test]
    fn test_unclosed_element_reports_open_tag() {
        let parsed = parse_markup("before\n<h1>oops");
        assert!(parsed.nodes.is_none());
        assert!(parsed.diagnostics.has_errors());
        let diag = parsed.diagnostics.errors().next().unwrap();
        assert_eq!(diag.message, "unclosed element <h1>");
        assert_eq!(diag.position, Some(Position::new(2, 1)));
    }

    #[test]
    fn test_mismatched_close_tag() {
        let parsed = parse_markup("<h1>hi</h2>");
        assert!(parsed.nodes.is_none());
        assert!(parsed.diagnostics.has_errors());
    }
}
