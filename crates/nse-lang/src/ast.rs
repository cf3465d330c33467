//! Abstract syntax for the predicate/action expression language described
//! in `SPEC_FULL.md` §4.1a. Deliberately small: enough to express an
//! applicability predicate over a host/port record and a textual action
//! template, not a general-purpose language (the spec's Non-goals exclude
//! sandboxing a Turing-complete guest language).

/// A field reference into the read-only `host`/`port` record a predicate
/// or action expression is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    HostAddress,
    HostOsFamily,
    PortNumber,
    PortProtocol,
    PortState,
    PortService,
}

impl FieldPath {
    pub fn resolve(dotted: &str) -> Option<Self> {
        Some(match dotted {
            "host.address" => Self::HostAddress,
            "host.os_family" => Self::HostOsFamily,
            "port.number" => Self::PortNumber,
            "port.protocol" => Self::PortProtocol,
            "port.state" => Self::PortState,
            "port.service" => Self::PortService,
            _ => return None,
        })
    }

    /// Whether this field is only meaningful on a `portrule`/port-kind
    /// task. `hostrule` expressions referencing a `port.*` field are a
    /// load-time error (there is no port record yet).
    pub fn requires_port(&self) -> bool {
        matches!(
            self,
            Self::PortNumber | Self::PortProtocol | Self::PortState | Self::PortService
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    Field(FieldPath),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    /// `++` string concatenation, used in `action` templates.
    Concat(Box<Expr>, Box<Expr>),
    /// `str(expr)` — stringify a field/number for concatenation.
    Str_(Box<Expr>),
}

impl Expr {
    /// Walk the expression tree looking for a `port.*` field reference,
    /// used by the loader to reject `port.*` fields inside a `hostrule`.
    pub fn references_port(&self) -> bool {
        match self {
            Expr::Field(f) => f.requires_port(),
            Expr::Not(e) | Expr::Str_(e) => e.references_port(),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Concat(a, b) => {
                a.references_port() || b.references_port()
            }
            Expr::Cmp(_, a, b) => a.references_port() || b.references_port(),
            Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) => false,
        }
    }
}

/// One `key = value` top-level declaration parsed from a script file,
/// before validation (`spec.md` §4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Description(String),
    Author(String),
    License(String),
    Categories(Vec<String>),
    Runlevel(f64),
    HostRule(Expr),
    PortRule(Expr),
    Action(Expr),
}
