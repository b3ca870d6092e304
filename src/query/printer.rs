//! PromQL text rendering
//!
//! `Display` for [`Expr`] emits text the standard PromQL parser reads back
//! into the same tree (modulo explicit parens).

use std::fmt;
use std::time::Duration;

use super::ast::{AtModifier, Cardinality, Expr, Offset, VectorMatching, VectorSelector};
use crate::types::{is_valid_metric_name, quote, MatchOp, Matcher, METRIC_NAME};

/// Words the lexer reserves; a metric with one of these names must be
/// written as a `__name__` matcher.
const KEYWORDS: &[&str] = &[
    "and",
    "or",
    "unless",
    "atan2",
    "by",
    "without",
    "on",
    "ignoring",
    "group_left",
    "group_right",
    "bool",
    "offset",
    "start",
    "end",
    "step",
    "inf",
    "nan",
    "sum",
    "avg",
    "count",
    "min",
    "max",
    "group",
    "stddev",
    "stdvar",
    "topk",
    "bottomk",
    "quantile",
    "count_values",
    "limitk",
    "limit_ratio",
];

const DURATION_UNITS: &[(&str, u128)] = &[
    ("y", 365 * 24 * 60 * 60 * 1000),
    ("w", 7 * 24 * 60 * 60 * 1000),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
    ("ms", 1),
];

/// Render a duration in the largest unit that divides it exactly
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    for (unit, size) in DURATION_UNITS {
        if ms % size == 0 {
            return format!("{}{}", ms / size, unit);
        }
    }
    format!("{}ms", ms)
}

/// Render a millisecond timestamp as seconds with millisecond precision
pub fn format_timestamp(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let abs = ms.unsigned_abs();
    format!("{}{}.{:03}", sign, abs / 1000, abs % 1000)
}

fn is_keyword(name: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    write!(f, "({})", items.join(", "))
}

fn write_selector(f: &mut fmt::Formatter<'_>, vs: &VectorSelector) -> fmt::Result {
    let mut names = vs.matchers.iter().filter(|m| m.name() == METRIC_NAME);
    let metric = match (names.next(), names.next()) {
        (Some(m), None)
            if m.op() == MatchOp::Equal && is_valid_metric_name(m.value()) && !is_keyword(m.value()) =>
        {
            Some(m.value())
        },
        _ => None,
    };

    let rest: Vec<&Matcher> = vs
        .matchers
        .iter()
        .filter(|m| metric.is_none() || m.name() != METRIC_NAME)
        .collect();

    if let Some(name) = metric {
        write!(f, "{}", name)?;
        if rest.is_empty() {
            return Ok(());
        }
    }

    write!(f, "{{")?;
    for (i, m) in rest.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", m)?;
    }
    write!(f, "}}")
}

fn write_modifiers(
    f: &mut fmt::Formatter<'_>,
    at: Option<AtModifier>,
    offset: Option<Offset>,
) -> fmt::Result {
    match at {
        Some(AtModifier::Start) => write!(f, " @ start()")?,
        Some(AtModifier::End) => write!(f, " @ end()")?,
        Some(AtModifier::At(ms)) => write!(f, " @ {}", format_timestamp(ms))?,
        None => {},
    }
    match offset {
        Some(Offset::Pos(d)) if !d.is_zero() => write!(f, " offset {}", format_duration(d)),
        Some(Offset::Neg(d)) if !d.is_zero() => write!(f, " offset -{}", format_duration(d)),
        _ => Ok(()),
    }
}

fn write_matching(f: &mut fmt::Formatter<'_>, matching: &VectorMatching) -> fmt::Result {
    if !matching.is_explicit() {
        return Ok(());
    }
    write!(f, " {} ", if matching.on { "on" } else { "ignoring" })?;
    write_list(f, &matching.matching_labels)?;

    let group = match matching.card {
        Cardinality::ManyToOne => "group_left",
        Cardinality::OneToMany => "group_right",
        Cardinality::OneToOne | Cardinality::ManyToMany => return Ok(()),
    };
    // An empty list is still written: a bare group modifier would swallow a
    // parenthesized right operand as its label list
    write!(f, " {} ", group)?;
    write_list(f, &matching.include)
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        write!(f, "{}Inf", if value < 0.0 { "-" } else { "" })
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::VectorSelector(vs) => {
                write_selector(f, vs)?;
                write_modifiers(f, vs.at, vs.offset)
            },
            Expr::MatrixSelector(ms) => {
                write_selector(f, &ms.selector)?;
                write!(f, "[{}]", format_duration(ms.range))?;
                write_modifiers(f, ms.selector.at, ms.selector.offset)
            },
            Expr::Aggregate(agg) => {
                write!(f, "{}", agg.op.as_str())?;
                if agg.without {
                    write!(f, " without ")?;
                    write_list(f, &agg.grouping)?;
                } else if !agg.grouping.is_empty() {
                    write!(f, " by ")?;
                    write_list(f, &agg.grouping)?;
                }
                write!(f, " (")?;
                if let Some(param) = &agg.param {
                    write!(f, "{}, ", param)?;
                }
                write!(f, "{})", agg.expr)
            },
            Expr::Binary(bin) => {
                write_operand(f, &bin.lhs)?;
                write!(f, " {}", bin.op.as_str())?;
                if bin.return_bool {
                    write!(f, " bool")?;
                }
                write_matching(f, &bin.matching)?;
                write!(f, " ")?;
                write_operand(f, &bin.rhs)
            },
            Expr::Unary(unary) => match unary.expr.as_ref() {
                inner @ (Expr::Binary(_) | Expr::Unary(_)) => write!(f, "-({})", inner),
                inner => write!(f, "-{}", inner),
            },
            Expr::Call(call) => {
                write!(f, "{}(", call.func.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            },
            Expr::Subquery(sq) => {
                match sq.expr.as_ref() {
                    Expr::VectorSelector(vs) if vs.offset.is_some() || vs.at.is_some() => {
                        write!(f, "({})", sq.expr)?
                    },
                    inner => write!(f, "{}", inner)?,
                }
                write!(
                    f,
                    "[{}:{}]",
                    format_duration(sq.range),
                    format_duration(sq.step)
                )?;
                write_modifiers(f, sq.at, sq.offset)
            },
            Expr::NumberLiteral(value) => write_number(f, *value),
            Expr::StringLiteral(value) => write!(f, "{}", quote(value)),
            Expr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

// Unary operands of a binary expression bind looser than `^`, so they get parens.
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr) -> fmt::Result {
    match operand {
        Expr::Unary(_) | Expr::Binary(_) => write!(f, "({})", operand),
        other => write!(f, "{}", other),
    }
}
