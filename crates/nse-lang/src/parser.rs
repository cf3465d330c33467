//! Recursive-descent parser for the predicate/action expression language
//! (`ast::Expr`) and the `.nse` script file format that embeds it
//! (`SPEC_FULL.md` §4.1a).
//!
//! Precedence, loosest to tightest binding: `or` < `and` < `not` <
//! comparison (`==` `!=` `<` `<=` `>` `>=`, non-chaining) < `++`
//! (concatenation) < primary.

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, opt, repeat};
use winnow::error::{AddContext, ContextError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::literal;

use crate::ast::{CmpOp, Expr, Field, FieldPath};
use crate::parse_utils::{bool_literal, dotted_ident, ident, kw, number_literal, quoted_string, ws_skip};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse the body of a `.nse` script file into an ordered list of raw
/// fields (duplicates and unknown keys are a parse error; validating that
/// *required* fields are present happens later, in `loader`).
pub fn parse_script_fields(input: &str) -> anyhow::Result<Vec<Field>> {
    script_file
        .parse(input)
        .map_err(|e| anyhow::anyhow!("script parse error: {e}"))
}

fn script_file(input: &mut &str) -> ModalResult<Vec<Field>> {
    ws_skip.parse_next(input)?;
    let fields: Vec<Field> = repeat(0.., field_decl).parse_next(input)?;
    ws_skip.parse_next(input)?;
    Ok(fields)
}

// ---------------------------------------------------------------------------
// Top-level field declarations
// ---------------------------------------------------------------------------

fn field_decl(input: &mut &str) -> ModalResult<Field> {
    ws_skip.parse_next(input)?;
    let key = ident
        .context(StrContext::Label("field name"))
        .parse_next(input)?;
    ws_skip.parse_next(input)?;
    literal("=")
        .context(StrContext::Expected(StrContextValue::CharLiteral('=')))
        .parse_next(input)?;
    ws_skip.parse_next(input)?;

    let field = match key {
        "description" => Field::Description(cut_err(quoted_string).parse_next(input)?),
        "author" => Field::Author(cut_err(quoted_string).parse_next(input)?),
        "license" => Field::License(cut_err(quoted_string).parse_next(input)?),
        "categories" => Field::Categories(cut_err(string_array).parse_next(input)?),
        "runlevel" => Field::Runlevel(cut_err(number_literal).parse_next(input)?),
        "hostrule" => Field::HostRule(cut_err(expr).parse_next(input)?),
        "portrule" => Field::PortRule(cut_err(expr).parse_next(input)?),
        "action" => Field::Action(cut_err(expr).parse_next(input)?),
        _other => {
            return Err(winnow::error::ErrMode::Cut(ContextError::new().add_context(
                input,
                &input.checkpoint(),
                StrContext::Expected(StrContextValue::Description(
                    "a known script field (description, author, license, categories, \
                     runlevel, hostrule, portrule, action)",
                )),
            )));
        }
    };
    ws_skip.parse_next(input)?;
    Ok(field)
}

fn string_array(input: &mut &str) -> ModalResult<Vec<String>> {
    literal("[").parse_next(input)?;
    ws_skip.parse_next(input)?;
    let items: Vec<String> = winnow::combinator::separated(0.., string_array_item, comma_sep)
        .parse_next(input)?;
    ws_skip.parse_next(input)?;
    opt(literal(",")).parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal("]"))
        .context(StrContext::Expected(StrContextValue::CharLiteral(']')))
        .parse_next(input)?;
    Ok(items)
}

fn string_array_item(input: &mut &str) -> ModalResult<String> {
    ws_skip.parse_next(input)?;
    let s = quoted_string.parse_next(input)?;
    ws_skip.parse_next(input)?;
    Ok(s)
}

fn comma_sep(input: &mut &str) -> ModalResult<()> {
    ws_skip.parse_next(input)?;
    literal(",").parse_next(input)?;
    ws_skip.parse_next(input)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Expression grammar
// ---------------------------------------------------------------------------

pub fn expr(input: &mut &str) -> ModalResult<Expr> {
    or_expr(input)
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut lhs = and_expr.parse_next(input)?;
    loop {
        let _ = multispace0.parse_next(input)?;
        if opt(kw("or")).parse_next(input)?.is_none() {
            break;
        }
        ws_skip.parse_next(input)?;
        let rhs = cut_err(and_expr).parse_next(input)?;
        lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        ws_skip.parse_next(input)?;
    }
    Ok(lhs)
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut lhs = not_expr.parse_next(input)?;
    loop {
        let _ = multispace0.parse_next(input)?;
        if opt(kw("and")).parse_next(input)?.is_none() {
            break;
        }
        ws_skip.parse_next(input)?;
        let rhs = cut_err(not_expr).parse_next(input)?;
        lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        ws_skip.parse_next(input)?;
    }
    Ok(lhs)
}

fn not_expr(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    if opt(kw("not")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        let inner = cut_err(not_expr).parse_next(input)?;
        return Ok(Expr::Not(Box::new(inner)));
    }
    cmp_expr(input)
}

fn cmp_expr(input: &mut &str) -> ModalResult<Expr> {
    let lhs = concat_expr.parse_next(input)?;
    ws_skip.parse_next(input)?;
    let op = opt(alt((
        literal("==").value(CmpOp::Eq),
        literal("!=").value(CmpOp::Ne),
        literal("<=").value(CmpOp::Le),
        literal(">=").value(CmpOp::Ge),
        literal("<").value(CmpOp::Lt),
        literal(">").value(CmpOp::Gt),
    )))
    .parse_next(input)?;
    match op {
        Some(op) => {
            ws_skip.parse_next(input)?;
            let rhs = cut_err(concat_expr).parse_next(input)?;
            Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
        }
        None => Ok(lhs),
    }
}

fn concat_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut lhs = primary.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(literal("++")).parse_next(input)?.is_none() {
            break;
        }
        ws_skip.parse_next(input)?;
        let rhs = cut_err(primary).parse_next(input)?;
        lhs = Expr::Concat(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    alt((
        str_call,
        paren_expr,
        quoted_string.map(Expr::Str),
        bool_literal.map(Expr::Bool),
        number_literal.map(Expr::Num),
        field_ref,
    ))
    .parse_next(input)
}

fn str_call(input: &mut &str) -> ModalResult<Expr> {
    kw("str").parse_next(input)?;
    ws_skip.parse_next(input)?;
    delimited(
        literal("("),
        delimited(ws_skip, expr, ws_skip),
        cut_err(literal(")")).context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .map(|inner| Expr::Str_(Box::new(inner)))
    .parse_next(input)
}

fn paren_expr(input: &mut &str) -> ModalResult<Expr> {
    delimited(
        literal("("),
        delimited(ws_skip, expr, ws_skip),
        cut_err(literal(")")).context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .parse_next(input)
}

fn field_ref(input: &mut &str) -> ModalResult<Expr> {
    let saved = *input;
    let dotted = dotted_ident
        .context(StrContext::Label("field reference"))
        .parse_next(input)?;
    match FieldPath::resolve(&dotted) {
        Some(fp) => Ok(Expr::Field(fp)),
        None => {
            *input = saved;
            Err(winnow::error::ErrMode::Cut(ContextError::new().add_context(
                input,
                &input.checkpoint(),
                StrContext::Expected(StrContextValue::Description(
                    "a known field reference (host.address, host.os_family, port.number, \
                     port.protocol, port.state, port.service)",
                )),
            )))
        }
    }
}
