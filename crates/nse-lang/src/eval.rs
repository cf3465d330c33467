//! Evaluates a parsed [`Expr`] against a host/port record, producing a
//! [`Value`]. Used both by the Task Factory (C4) to evaluate
//! `hostrule`/`portrule` and by task completion to evaluate `action`
//! templates (`spec.md` §4.3, §4.1a in `SPEC_FULL.md`).

use nse_core::{HostSnapshot, PortSnapshot, Value};

use crate::ast::{CmpOp, Expr, FieldPath};

/// Read-only context an expression is evaluated against. `port` is `None`
/// for `hostrule` evaluation on a host-kind task.
pub struct EvalContext<'a> {
    pub host: &'a HostSnapshot,
    pub port: Option<&'a PortSnapshot>,
}

impl<'a> EvalContext<'a> {
    pub fn host_only(host: &'a HostSnapshot) -> Self {
        Self { host, port: None }
    }

    pub fn host_and_port(host: &'a HostSnapshot, port: &'a PortSnapshot) -> Self {
        Self {
            host,
            port: Some(port),
        }
    }

    fn field(&self, fp: FieldPath) -> Value {
        match fp {
            FieldPath::HostAddress => Value::Str(self.host.address.clone()),
            FieldPath::HostOsFamily => {
                Value::Str(self.host.os_family.clone().unwrap_or_default())
            }
            FieldPath::PortNumber => Value::Num(
                self.port
                    .map(|p| p.number as f64)
                    .expect("port field referenced without a port in context"),
            ),
            FieldPath::PortProtocol => Value::Str(
                self.port
                    .map(|p| p.protocol.to_string())
                    .expect("port field referenced without a port in context"),
            ),
            FieldPath::PortState => Value::Str(
                self.port
                    .map(|p| p.state.to_string())
                    .expect("port field referenced without a port in context"),
            ),
            FieldPath::PortService => Value::Str(
                self.port
                    .and_then(|p| p.service.clone())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Evaluate an expression to a [`Value`].
///
/// Panics only on a malformed `Expr` that the loader should have rejected
/// (a `port.*` reference with no port in context) — see
/// `Expr::references_port`, checked at load time so this never fires on
/// an accepted script.
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Value {
    match expr {
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Num(n) => Value::Num(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Field(fp) => ctx.field(*fp),
        Expr::Not(inner) => Value::Bool(!eval(inner, ctx).is_truthy()),
        Expr::And(a, b) => Value::Bool(eval(a, ctx).is_truthy() && eval(b, ctx).is_truthy()),
        Expr::Or(a, b) => Value::Bool(eval(a, ctx).is_truthy() || eval(b, ctx).is_truthy()),
        Expr::Cmp(op, a, b) => Value::Bool(eval_cmp(*op, &eval(a, ctx), &eval(b, ctx))),
        Expr::Concat(a, b) => Value::Str(format!("{}{}", eval(a, ctx), eval(b, ctx))),
        Expr::Str_(inner) => Value::Str(eval(inner, ctx).to_string()),
    }
}

fn eval_cmp(op: CmpOp, a: &Value, b: &Value) -> bool {
    use std::cmp::Ordering;
    let ord = match (a, b) {
        (Value::Num(x), Value::Num(y)) => x.partial_cmp(y),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        // Mismatched types: only equality/inequality are meaningful.
        _ => {
            return match op {
                CmpOp::Eq => false,
                CmpOp::Ne => true,
                _ => false,
            };
        }
    };
    match (op, ord) {
        (CmpOp::Eq, Some(Ordering::Equal)) => true,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Lt, Some(Ordering::Less)) => true,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Gt, Some(Ordering::Greater)) => true,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
        _ => false,
    }
}
