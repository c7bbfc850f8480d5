//! Syntax tree for the intermediate language
//!
//! Produced by the syntactic phase, consumed by the semantic/emit phase.
//! Declaration order is preserved everywhere; the loader's
//! first-exported-type convention depends on it.

use diagnostics::Position;

/// A complete compilation unit: classes in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub base: Option<String>,
    pub methods: Vec<MethodDecl>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: TypeName,
    pub params: Vec<Param>,
    pub body: ExprAst,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Str,
    Int,
}

impl TypeName {
    pub fn display_name(self) -> &'static str {
        match self {
            TypeName::Str => "string",
            TypeName::Int => "int",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinKind {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BinKind::Add => "+",
            BinKind::Sub => "-",
            BinKind::Mul => "*",
            BinKind::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
    Str(String),
    Int(i64),
    Ident {
        name: String,
        position: Position,
    },
    Binary {
        op: BinKind,
        lhs: Box<ExprAst>,
        rhs: Box<ExprAst>,
        position: Position,
    },
}
