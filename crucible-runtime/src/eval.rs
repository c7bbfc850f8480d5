//! Expression evaluation for invoked method bodies
//!
//! The evaluator walks the expression tree stored in a method image against
//! the positional argument list. The compiler's semantic phase guarantees
//! well-typed trees for code it emitted, so type mismatches here indicate a
//! hand-built or corrupted image; they surface as faults rather than being
//! silently coerced.

use std::fmt;

use thiserror::Error;

use crate::image::{BinOp, Expr};

/// A runtime value passed to or produced by an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Faults raised while resolving or executing an entry invocation.
///
/// These are the one failure category that escapes the pipeline as a real
/// error instead of an absent result plus log entries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("method '{method}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("parameter '{name}' does not accept the supplied argument type")]
    ArgumentType { name: String },
    #[error("parameter index {0} is out of range")]
    ParamOutOfRange(u32),
    #[error("operands have incompatible types")]
    TypeMismatch,
    #[error("division by zero")]
    DivideByZero,
    #[error("entry method did not produce a string result")]
    ReturnType,
}

/// Evaluate an expression tree against positional arguments.
pub fn evaluate(expr: &Expr, args: &[Value]) -> Result<Value, InvokeError> {
    match expr {
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Param(index) => args
            .get(*index as usize)
            .cloned()
            .ok_or(InvokeError::ParamOutOfRange(*index)),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, args)?;
            let rhs = evaluate(rhs, args)?;
            apply(*op, lhs, rhs)
        }
    }
}

fn apply(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, InvokeError> {
    if op == BinOp::Concat {
        return Ok(Value::Str(format!("{}{}", lhs, rhs)));
    }

    let (Value::Int(a), Value::Int(b)) = (lhs, rhs) else {
        return Err(InvokeError::TypeMismatch);
    };

    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(InvokeError::DivideByZero);
            }
            a.wrapping_div(b)
        }
        BinOp::Concat => unreachable!("handled above"),
    };
    Ok(Value::Int(result))
}
