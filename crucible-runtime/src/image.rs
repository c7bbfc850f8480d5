//! Serialized module image format
//!
//! A module image is the unit the language compiler emits and the loader
//! consumes: the module name plus its exported classes in declaration order.
//! Method bodies are stored as expression trees that the evaluator walks at
//! invocation time. Images travel as postcard bytes, both for compiled
//! output and for reference modules fetched from the content source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value types understood by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Int,
    Str,
}

/// Binary operators in lowered method bodies.
///
/// `Concat` is distinct from `Add`: the compiler resolves string-flavoured
/// `+` during emission so the evaluator never re-derives operand intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

/// An evaluable expression tree. Parameters are referenced by index into
/// the invocation argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Str(String),
    Int(i64),
    Param(u32),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamImage {
    pub name: String,
    pub ty: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodImage {
    pub name: String,
    pub params: Vec<ParamImage>,
    pub ret: TypeTag,
    pub body: Expr,
}

/// An exported class: name, optional base type, methods in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassImage {
    pub name: String,
    pub base: Option<String>,
    pub methods: Vec<MethodImage>,
}

impl ClassImage {
    pub fn method(&self, name: &str) -> Option<&MethodImage> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A complete loadable module: exported classes in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: String,
    pub classes: Vec<ClassImage>,
}

impl ModuleImage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        postcard::to_allocvec(self).map_err(ImageError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        postcard::from_bytes(bytes).map_err(ImageError::Decode)
    }

    pub fn exports_type(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c.name == name)
    }

    pub fn exported_type(&self, name: &str) -> Option<&ClassImage> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to encode module image: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode module image: {0}")]
    Decode(#[source] postcard::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ModuleImage {
        ModuleImage {
            name: "demo".into(),
            classes: vec![ClassImage {
                name: "Greeter".into(),
                base: None,
                methods: vec![MethodImage {
                    name: "Run".into(),
                    params: vec![
                        ParamImage {
                            name: "name".into(),
                            ty: TypeTag::Str,
                        },
                        ParamImage {
                            name: "count".into(),
                            ty: TypeTag::Int,
                        },
                    ],
                    ret: TypeTag::Str,
                    body: Expr::Binary {
                        op: BinOp::Concat,
                        lhs: Box::new(Expr::Str("hi ".into())),
                        rhs: Box::new(Expr::Param(0)),
                    },
                }],
            }],
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let image = sample_image();
        let bytes = image.to_bytes().unwrap();
        let decoded = ModuleImage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        assert!(matches!(
            ModuleImage::from_bytes(&[0xff, 0xff, 0xff, 0xff]),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_export_lookup() {
        let image = sample_image();
        assert!(image.exports_type("Greeter"));
        assert!(!image.exports_type("Component"));
        assert!(image.exported_type("Greeter").unwrap().method("Run").is_some());
    }
}
