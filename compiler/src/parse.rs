//! Syntactic phase: source text to syntax tree
//!
//! Parses intermediate-language source into a [`Unit`]. This phase is purely
//! syntactic; identifier resolution and type checks happen in the emit
//! phase. Parse failures become `Error`-severity diagnostics with the
//! position where parsing stopped.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, multispace1, none_of},
    combinator::{all_consuming, cut, map_res, opt, recognize, value, verify},
    error::{ErrorKind, FromExternalError, ParseError},
    multi::{many0, many1, separated_list0},
    sequence::{pair, preceded, terminated},
    IResult, Parser,
};
use nom_locate::LocatedSpan;

use diagnostics::{Diagnostic, Diagnostics, Position};

use crate::ast::{BinKind, ClassDecl, ExprAst, MethodDecl, Param, TypeName, Unit};

pub type Span<'a> = LocatedSpan<&'a str>;

type PResult<'a, T> = IResult<Span<'a>, T, SyntaxError<'a>>;

/// Parse error carrying the position it occurred at.
#[derive(Debug)]
pub struct SyntaxError<'a> {
    pub span: Span<'a>,
    pub message: String,
}

impl<'a> ParseError<Span<'a>> for SyntaxError<'a> {
    fn from_error_kind(input: Span<'a>, _kind: ErrorKind) -> Self {
        Self {
            span: input,
            message: "syntax error".to_string(),
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> FromExternalError<Span<'a>, std::num::ParseIntError> for SyntaxError<'a> {
    fn from_external_error(input: Span<'a>, _kind: ErrorKind, _e: std::num::ParseIntError) -> Self {
        Self {
            span: input,
            message: "integer literal out of range".to_string(),
        }
    }
}

fn position(span: Span<'_>) -> Position {
    Position::new(span.location_line() as usize, span.get_utf8_column())
}

fn sp(input: Span) -> PResult<Span> {
    multispace0(input)
}

fn ident(input: Span) -> PResult<Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    move |input| verify(ident, |s: &Span| *s.fragment() == word).parse(input)
}

fn type_name(input: Span) -> PResult<TypeName> {
    alt((
        value(TypeName::Str, keyword("string")),
        value(TypeName::Int, keyword("int")),
    ))
    .parse(input)
}

fn escaped_char(input: Span) -> PResult<char> {
    alt((
        value('"', char('"')),
        value('\\', char('\\')),
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
    ))
    .parse(input)
}

fn string_literal(input: Span) -> PResult<ExprAst> {
    let (input, _) = tag("\"").parse(input)?;
    let (input, chars) =
        many0(alt((preceded(char('\\'), escaped_char), none_of("\"\\")))).parse(input)?;
    let (input, _) = cut(tag("\"")).parse(input)?;
    Ok((input, ExprAst::Str(chars.into_iter().collect())))
}

fn int_literal(input: Span) -> PResult<ExprAst> {
    map_res(digit1, |digits: Span| {
        digits.fragment().parse::<i64>().map(ExprAst::Int)
    })
    .parse(input)
}

fn ident_expr(input: Span) -> PResult<ExprAst> {
    let start = input;
    let (input, name) = ident(input)?;
    Ok((
        input,
        ExprAst::Ident {
            name: name.fragment().to_string(),
            position: position(start),
        },
    ))
}

fn paren_expr(input: Span) -> PResult<ExprAst> {
    let (input, _) = tag("(").parse(input)?;
    let (input, inner) = cut(expr).parse(input)?;
    let (input, _) = preceded(sp, cut(tag(")"))).parse(input)?;
    Ok((input, inner))
}

fn factor(input: Span) -> PResult<ExprAst> {
    let (input, _) = sp(input)?;
    alt((string_literal, int_literal, paren_expr, ident_expr)).parse(input)
}

fn op_symbol<'a>(symbol: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    move |input| tag(symbol).parse(input)
}

fn binary_chain<'a>(
    input: Span<'a>,
    mut operand: impl FnMut(Span<'a>) -> PResult<'a, ExprAst>,
    ops: &[(&'static str, BinKind)],
) -> PResult<'a, ExprAst> {
    let (mut input, mut lhs) = operand(input)?;
    loop {
        let (after_ws, _) = sp(input)?;
        let op_pos = position(after_ws);
        let mut matched = None;
        for (symbol, kind) in ops {
            if let Ok((rest, _)) = op_symbol(symbol)(after_ws) {
                matched = Some((rest, *kind));
                break;
            }
        }
        let Some((rest, op)) = matched else {
            return Ok((input, lhs));
        };
        // An operator commits us to a right operand.
        let (rest, rhs) = match operand(rest) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) => return Err(nom::Err::Failure(e)),
            Err(other) => return Err(other),
        };
        lhs = ExprAst::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            position: op_pos,
        };
        input = rest;
    }
}

fn mul_expr(input: Span) -> PResult<ExprAst> {
    binary_chain(input, factor, &[("*", BinKind::Mul), ("/", BinKind::Div)])
}

fn expr(input: Span) -> PResult<ExprAst> {
    binary_chain(input, mul_expr, &[("+", BinKind::Add), ("-", BinKind::Sub)])
}

fn param(input: Span) -> PResult<Param> {
    let (input, _) = sp(input)?;
    let start = input;
    let (input, ty) = type_name(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = cut(ident).parse(input)?;
    Ok((
        input,
        Param {
            name: name.fragment().to_string(),
            ty,
            position: position(start),
        },
    ))
}

fn method_decl(input: Span) -> PResult<MethodDecl> {
    let (input, _) = sp(input)?;
    let start = input;
    let (input, _) = keyword("public")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, return_type) = type_name(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = tag("(").parse(input)?;
    let (input, params) =
        separated_list0(preceded(sp, tag(",")), param).parse(input)?;
    let (input, _) = preceded(sp, cut(tag(")"))).parse(input)?;
    let (input, _) = preceded(sp, cut(tag("{"))).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = cut(keyword("return")).parse(input)?;
    let (input, body) = cut(expr).parse(input)?;
    let (input, _) = preceded(sp, cut(tag(";"))).parse(input)?;
    let (input, _) = preceded(sp, cut(tag("}"))).parse(input)?;
    Ok((
        input,
        MethodDecl {
            name: name.fragment().to_string(),
            return_type,
            params,
            body,
            position: position(start),
        },
    ))
}

fn class_decl(input: Span) -> PResult<ClassDecl> {
    let (input, _) = sp(input)?;
    let start = input;
    let (input, _) = keyword("public")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = keyword("class")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = cut(ident).parse(input)?;
    let (input, base) =
        opt(preceded((sp, tag(":"), sp), ident)).parse(input)?;
    let (input, _) = preceded(sp, cut(tag("{"))).parse(input)?;
    let (input, methods) = many0(method_decl).parse(input)?;
    let (input, _) = preceded(sp, cut(tag("}"))).parse(input)?;
    Ok((
        input,
        ClassDecl {
            name: name.fragment().to_string(),
            base: base.map(|b| b.fragment().to_string()),
            methods,
            position: position(start),
        },
    ))
}

/// Result of the syntactic phase.
#[derive(Debug)]
pub struct UnitParse {
    pub unit: Option<Unit>,
    pub diagnostics: Diagnostics,
}

/// Parse a complete compilation unit.
pub fn parse_source(source: &str) -> UnitParse {
    let mut diagnostics = Diagnostics::new();
    match all_consuming(terminated(many1(class_decl), sp)).parse(Span::new(source)) {
        Ok((_, classes)) => UnitParse {
            unit: Some(Unit { classes }),
            diagnostics,
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            diagnostics.push(Diagnostic::error(e.message).at(position(e.span)));
            UnitParse {
                unit: None,
                diagnostics,
            }
        }
        Err(nom::Err::Incomplete(_)) => {
            diagnostics.push(Diagnostic::error("truncated source input"));
            UnitParse {
                unit: None,
                diagnostics,
            }
        }
    }
}
