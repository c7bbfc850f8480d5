//! Semantic and emit phase: syntax tree to module bytes
//!
//! Resolves identifiers against method parameters, checks base types against
//! the reference set, types every expression, and serializes the resulting
//! module image. All diagnostics for the unit are collected in one pass; any
//! `Error` severity leaves the byte output absent.
//!
//! Typing of `+` happens here: when either operand is a string the operator
//! lowers to concatenation (int operands are formatted to decimal at
//! invocation time), otherwise it is integer addition.

use log::debug;

use diagnostics::{Diagnostic, Diagnostics};
use crucible_runtime::{BinOp, ClassImage, Expr, MethodImage, ModuleImage, ParamImage, TypeTag};

use crate::ast::{BinKind, ClassDecl, ExprAst, MethodDecl, Param, TypeName, Unit};
use crate::references::ReferenceSet;
use crate::CompileOptions;

/// Result of the semantic/emit phase.
#[derive(Debug)]
pub struct EmitOutput {
    /// Serialized module image, absent when any error was recorded.
    pub bytes: Option<Vec<u8>>,
    pub diagnostics: Diagnostics,
}

/// Compile a parsed unit against the reference set into module bytes.
pub fn emit_unit(unit: &Unit, references: &ReferenceSet, options: &CompileOptions) -> EmitOutput {
    let mut diagnostics = Diagnostics::new();
    let classes: Vec<ClassImage> = unit
        .classes
        .iter()
        .map(|class| lower_class(class, references, &mut diagnostics))
        .collect();

    if diagnostics.has_errors() {
        return EmitOutput {
            bytes: None,
            diagnostics,
        };
    }

    let image = ModuleImage {
        name: options.module_name.clone(),
        classes,
    };
    match image.to_bytes() {
        Ok(bytes) => {
            debug!(
                "emitted module '{}': {} classes, {} bytes",
                image.name,
                image.classes.len(),
                bytes.len()
            );
            EmitOutput {
                bytes: Some(bytes),
                diagnostics,
            }
        }
        Err(e) => {
            diagnostics.push(Diagnostic::error(format!("module emission failed: {}", e)));
            EmitOutput {
                bytes: None,
                diagnostics,
            }
        }
    }
}

fn lower_class(
    class: &ClassDecl,
    references: &ReferenceSet,
    diagnostics: &mut Diagnostics,
) -> ClassImage {
    if let Some(base) = &class.base {
        if !references.exports_type(base) {
            diagnostics.push(
                Diagnostic::error(format!("unknown base type '{}'", base)).at(class.position),
            );
        }
    }
    let methods = class
        .methods
        .iter()
        .filter_map(|method| lower_method(method, diagnostics))
        .collect();
    ClassImage {
        name: class.name.clone(),
        base: class.base.clone(),
        methods,
    }
}

fn lower_method(method: &MethodDecl, diagnostics: &mut Diagnostics) -> Option<MethodImage> {
    for (index, param) in method.params.iter().enumerate() {
        if method.params[..index].iter().any(|p| p.name == param.name) {
            diagnostics.push(
                Diagnostic::error(format!("duplicate parameter '{}'", param.name))
                    .at(param.position),
            );
        }
    }

    let mut used = vec![false; method.params.len()];
    let (body, body_type) = lower_expr(&method.body, &method.params, &mut used, diagnostics)?;

    if body_type != method.return_type {
        diagnostics.push(
            Diagnostic::error(format!(
                "method '{}' is declared to return {} but its body has type {}",
                method.name,
                method.return_type.display_name(),
                body_type.display_name()
            ))
            .at(method.position),
        );
        return None;
    }

    for (param, was_used) in method.params.iter().zip(&used) {
        if !*was_used {
            diagnostics.push(
                Diagnostic::warning(format!("parameter '{}' is never used", param.name))
                    .at(param.position),
            );
        }
    }

    Some(MethodImage {
        name: method.name.clone(),
        params: method
            .params
            .iter()
            .map(|p| ParamImage {
                name: p.name.clone(),
                ty: type_tag(p.ty),
            })
            .collect(),
        ret: type_tag(method.return_type),
        body,
    })
}

fn type_tag(ty: TypeName) -> TypeTag {
    match ty {
        TypeName::Str => TypeTag::Str,
        TypeName::Int => TypeTag::Int,
    }
}

fn lower_expr(
    expr: &ExprAst,
    params: &[Param],
    used: &mut [bool],
    diagnostics: &mut Diagnostics,
) -> Option<(Expr, TypeName)> {
    match expr {
        ExprAst::Str(s) => Some((Expr::Str(s.clone()), TypeName::Str)),
        ExprAst::Int(n) => Some((Expr::Int(*n), TypeName::Int)),
        ExprAst::Ident { name, position } => {
            match params.iter().position(|p| p.name == *name) {
                Some(index) => {
                    used[index] = true;
                    Some((Expr::Param(index as u32), params[index].ty))
                }
                None => {
                    diagnostics.push(
                        Diagnostic::error(format!("undefined identifier '{}'", name))
                            .at(*position),
                    );
                    None
                }
            }
        }
        ExprAst::Binary {
            op,
            lhs,
            rhs,
            position,
        } => {
            // Lower both sides before bailing so every problem in the
            // expression is reported, not just the first.
            let lhs = lower_expr(lhs, params, used, diagnostics);
            let rhs = lower_expr(rhs, params, used, diagnostics);
            let ((lhs, lhs_ty), (rhs, rhs_ty)) = (lhs?, rhs?);

            if *op == BinKind::Add && (lhs_ty == TypeName::Str || rhs_ty == TypeName::Str) {
                return Some((
                    Expr::Binary {
                        op: BinOp::Concat,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    TypeName::Str,
                ));
            }
            if lhs_ty == TypeName::Int && rhs_ty == TypeName::Int {
                let op = match op {
                    BinKind::Add => BinOp::Add,
                    BinKind::Sub => BinOp::Sub,
                    BinKind::Mul => BinOp::Mul,
                    BinKind::Div => BinOp::Div,
                };
                return Some((
                    Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    TypeName::Int,
                ));
            }

            diagnostics.push(
                Diagnostic::error(format!(
                    "operator '{}' cannot be applied to string operands",
                    op.symbol()
                ))
                .at(*position),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;
    use crucible_runtime::{evaluate, Value};

    fn component_references() -> ReferenceSet {
        let mut set = ReferenceSet::new();
        set.insert(ModuleImage {
            name: "framework".into(),
            classes: vec![ClassImage {
                name: "Component".into(),
                base: None,
                methods: vec![],
            }],
        });
        set
    }

    fn emit(source: &str) -> EmitOutput {
        let parsed = parse_source(source);
        emit_unit(
            &parsed.unit.expect("source should parse"),
            &component_references(),
            &CompileOptions::default(),
        )
    }

    #[test]
    fn test_emit_and_evaluate() {
        let output = emit(
            r#"public class Greeter {
                public string Run(string name, int count) {
                    return "hi " + name;
                }
            }"#,
        );
        let bytes = output.bytes.expect("emission should succeed");
        let image = ModuleImage::from_bytes(&bytes).unwrap();
        let method = image.classes[0].method("Run").unwrap();
        let args = [Value::Str("my UserName".into()), Value::Int(12)];
        assert_eq!(
            evaluate(&method.body, &args),
            Ok(Value::Str("hi my UserName".into()))
        );
    }

    #[test]
    fn test_undefined_identifier() {
        let output = emit(
            r#"public class Greeter {
                public string Run(string name, int count) {
                    return "hi " + username;
                }
            }"#,
        );
        assert!(output.bytes.is_none());
        let diag = output.diagnostics.errors().next().unwrap();
        assert_eq!(diag.message, "undefined identifier 'username'");
    }

    #[test]
    fn test_unused_parameter_warns_but_emits() {
        let output = emit(
            r#"public class Greeter {
                public string Run(string name, int count) {
                    return name;
                }
            }"#,
        );
        assert!(output.bytes.is_some());
        let warning = output.diagnostics.warnings().next().unwrap();
        assert_eq!(warning.message, "parameter 'count' is never used");
    }

    #[test]
    fn test_unknown_base_type() {
        let output = emit(
            r#"public class View : Widget {
                public string Run(string name, int count) {
                    return name + count;
                }
            }"#,
        );
        assert!(output.bytes.is_none());
        let diag = output.diagnostics.errors().next().unwrap();
        assert_eq!(diag.message, "unknown base type 'Widget'");
    }

    #[test]
    fn test_known_base_type_accepted() {
        let output = emit(
            r#"public class View : Component {
                public string Run(string name, int count) {
                    return name + count;
                }
            }"#,
        );
        assert!(output.bytes.is_some());
    }

    #[test]
    fn test_return_type_mismatch() {
        let output = emit(
            r#"public class M {
                public string Run(string name, int count) {
                    return count + 1;
                }
            }"#,
        );
        assert!(output.bytes.is_none());
        assert!(output
            .diagnostics
            .errors()
            .any(|d| d.message.contains("declared to return string")));
    }

    #[test]
    fn test_string_subtraction_rejected() {
        let output = emit(
            r#"public class M {
                public string Run(string name, int count) {
                    return name - "x";
                }
            }"#,
        );
        assert!(output.bytes.is_none());
        assert!(output
            .diagnostics
            .errors()
            .any(|d| d.message.contains("operator '-'")));
    }

    #[test]
    fn test_string_plus_int_concatenates() {
        let output = emit(
            r#"public class M {
                public string Run(string name, int count) {
                    return name + ": " + count * 2;
                }
            }"#,
        );
        let bytes = output.bytes.unwrap();
        let image = ModuleImage::from_bytes(&bytes).unwrap();
        let method = image.classes[0].method("Run").unwrap();
        let args = [Value::Str("n".into()), Value::Int(4)];
        assert_eq!(evaluate(&method.body, &args), Ok(Value::Str("n: 8".into())));
    }
}
