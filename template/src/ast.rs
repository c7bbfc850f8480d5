//! Markup AST produced by the template parser

/// A single `name="value"` attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One node of parsed markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, reproduced verbatim in the rendered output.
    Text(String),
    /// `@ident` — substitutes one of the entry-point parameters.
    Interpolation(String),
    /// `@(expr)` — embeds an intermediate-language expression.
    Expression(String),
    Element {
        name: String,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
        self_closing: bool,
    },
}
