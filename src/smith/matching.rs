//! Output series tracking and vector matching resolution
//!
//! To pick sensible `on`/`ignoring` labels and group modifiers for a binary
//! operation between two vectors, the generator needs to know which series
//! each operand would return. [`output_series`] answers that statically from
//! the catalog; `None` means the answer is unknown and matching is skipped.

use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, trace};

use super::{PromQLSmith, SeriesCatalog, IGNORING_PROBABILITY};
use crate::query::ast::{AggregateOp, BinaryExpr, BinaryOp, Cardinality, Expr, VectorMatching};
use crate::types::{LabelSet, ValueType, METRIC_NAME};

// ============================================================================
// Output series
// ============================================================================

/// Label sets an expression would return when evaluated against the catalog
///
/// Returns `None` when the output cannot be resolved: binary operations,
/// `count_values`, functions that synthesize or rewrite labels, and selectors
/// that match nothing.
pub fn output_series(expr: &Expr, catalog: &SeriesCatalog) -> Option<Vec<LabelSet>> {
    match expr {
        Expr::VectorSelector(vs) => non_empty(catalog.matching(&vs.matchers)),
        Expr::MatrixSelector(ms) => non_empty(catalog.matching(&ms.selector.matchers)),
        Expr::Subquery(sq) => output_series(&sq.expr, catalog),
        Expr::Paren(inner) => output_series(inner, catalog),
        Expr::Unary(unary) => output_series(&unary.expr, catalog),
        Expr::Aggregate(agg) => {
            if agg.op == AggregateOp::CountValues {
                return None;
            }
            let input = output_series(&agg.expr, catalog)?;
            if agg.op.keeps_input_labels() {
                return Some(input);
            }
            let grouped: BTreeSet<LabelSet> = input
                .iter()
                .map(|series| {
                    if agg.without {
                        series.without(&agg.grouping)
                    } else {
                        series.project(&agg.grouping)
                    }
                })
                .collect();
            Some(grouped.into_iter().collect())
        },
        Expr::Binary(_) => None,
        Expr::Call(call) => match call.func.name {
            "absent" | "absent_over_time" | "label_join" | "label_replace" | "info" => None,
            "vector" => Some(vec![LabelSet::new()]),
            _ => match call
                .args
                .iter()
                .find(|arg| matches!(arg.value_type(), ValueType::Vector | ValueType::Matrix))
            {
                Some(arg) => output_series(arg, catalog),
                None => Some(Vec::new()),
            },
        },
        Expr::NumberLiteral(_) | Expr::StringLiteral(_) => Some(Vec::new()),
    }
}

fn non_empty(series: Vec<LabelSet>) -> Option<Vec<LabelSet>> {
    if series.is_empty() {
        None
    } else {
        Some(series)
    }
}

// ============================================================================
// Matching resolution
// ============================================================================

/// How the match set is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingStyle {
    /// `on (shared labels)`
    On,
    /// `ignoring (labels present on only one side)`
    Ignoring,
}

/// Derive a matching descriptor for `left op right`
///
/// Both sides match on the label names they share. A side whose series
/// collapse under that projection is the "many" side. Returns `None` when
/// either side is empty or both sides are "many", which no group modifier
/// can express.
pub fn resolve_vector_matching(
    op: BinaryOp,
    left: &[LabelSet],
    right: &[LabelSet],
    style: MatchingStyle,
) -> Option<VectorMatching> {
    if left.is_empty() || right.is_empty() {
        return None;
    }

    let left_names = label_names(left);
    let right_names = label_names(right);
    let shared: Vec<String> = left_names.intersection(&right_names).cloned().collect();

    let on = style == MatchingStyle::On;
    let matching_labels = if on {
        shared.clone()
    } else {
        left_names
            .symmetric_difference(&right_names)
            .cloned()
            .collect()
    };

    if op.is_set_operator() {
        return Some(VectorMatching {
            card: Cardinality::ManyToMany,
            on,
            matching_labels,
            include: Vec::new(),
        });
    }

    let (card, include) = match (has_duplicates(left, &shared), has_duplicates(right, &shared)) {
        (false, false) => (Cardinality::OneToOne, Vec::new()),
        (true, false) => (Cardinality::ManyToOne, include_labels(&right_names, &shared)),
        (false, true) => (Cardinality::OneToMany, include_labels(&left_names, &shared)),
        (true, true) => return None,
    };

    Some(VectorMatching {
        card,
        on,
        matching_labels,
        include,
    })
}

/// Labels of the "one" side that are not matched on, sorted
pub fn include_labels(set: &BTreeSet<String>, matched: &[String]) -> Vec<String> {
    set.iter()
        .filter(|name| !matched.contains(name))
        .cloned()
        .collect()
}

/// Every label name across the series, minus the metric name
fn label_names(series: &[LabelSet]) -> BTreeSet<String> {
    series
        .iter()
        .flat_map(|s| s.names())
        .filter(|name| *name != METRIC_NAME)
        .map(String::from)
        .collect()
}

/// Whether two series share the same values for `names`
fn has_duplicates(series: &[LabelSet], names: &[String]) -> bool {
    let distinct: BTreeSet<LabelSet> = series.iter().map(|s| s.project(names)).collect();
    distinct.len() < series.len()
}

impl<R: Rng> PromQLSmith<R> {
    /// Resolve `on`/`ignoring` and group modifiers for a vector/vector operation
    ///
    /// Leaves the descriptor untouched when either side's output is unknown.
    pub(crate) fn walk_vector_matching(&mut self, expr: &mut BinaryExpr) {
        let Some(left) = output_series(&expr.lhs, &self.catalog) else {
            trace!("left operand output unknown, skipping vector matching");
            return;
        };
        let Some(right) = output_series(&expr.rhs, &self.catalog) else {
            trace!("right operand output unknown, skipping vector matching");
            return;
        };

        let style = if self.rng.gen_bool(IGNORING_PROBABILITY) {
            MatchingStyle::Ignoring
        } else {
            MatchingStyle::On
        };

        match resolve_vector_matching(expr.op, &left, &right, style) {
            Some(matching) => {
                debug!(
                    op = expr.op.as_str(),
                    card = ?matching.card,
                    labels = ?matching.matching_labels,
                    "resolved vector matching"
                );
                expr.matching = matching;
            },
            None => trace!("both operands are many-sided, keeping default matching"),
        }
    }
}
