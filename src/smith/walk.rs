//! Random walk engine and the binary, aggregate, unary and literal handlers

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use super::tables::{exprs_from_value_types, keep_value_types, VECTOR_AND_SCALAR};
use super::{
    PromQLSmith, BOOL_MODIFIER_PROBABILITY, COUNT_VALUES_LABEL, MAX_RANK_PARAM,
    VECTOR_MATCHING_PROBABILITY, WITHOUT_PROBABILITY,
};
use crate::query::ast::{
    wrap_paren_expr, AggregateExpr, AggregateOp, BinaryExpr, BinaryOp, Cardinality, Expr,
    ExprType, UnaryExpr, VectorMatching,
};
use crate::types::{LabelSet, ValueType};

impl<R: Rng> PromQLSmith<R> {
    /// Walk at a given tree level (the root is level 1)
    pub(crate) fn walk_at(&mut self, depth: usize, value_types: &[ValueType]) -> Option<Expr> {
        let candidates = self.candidate_exprs(depth, value_types);
        let Some(&kind) = candidates.choose(&mut self.rng) else {
            debug!(depth, ?value_types, "no enabled construct produces the requested types");
            return None;
        };
        trace!(depth, ?kind, "walking expression");
        self.walk_expr(kind, depth, value_types)
    }

    /// Enabled constructs for the requested types; leaves only at max depth
    pub(crate) fn candidate_exprs(&self, depth: usize, value_types: &[ValueType]) -> Vec<ExprType> {
        let at_limit = depth >= self.config.max_depth;
        exprs_from_value_types(value_types)
            .into_iter()
            .filter(|e| self.config.exprs.contains(e))
            .filter(|e| !at_limit || e.is_leaf())
            .collect()
    }

    fn walk_expr(&mut self, kind: ExprType, depth: usize, value_types: &[ValueType]) -> Option<Expr> {
        match kind {
            ExprType::VectorSelector => {
                let (selector, _) = self.walk_vector_selector();
                Some(Expr::VectorSelector(selector))
            },
            ExprType::MatrixSelector => Some(self.walk_matrix_selector()),
            ExprType::AggregateExpr => self.walk_aggregate_expr(),
            ExprType::BinaryExpr => self
                .walk_binary_expr(depth, value_types)
                .map(wrap_paren_expr),
            ExprType::SubQueryExpr => Some(self.walk_subquery_expr()),
            ExprType::CallExpr => self.walk_call(depth, value_types),
            ExprType::NumberLiteral => Some(self.walk_number_literal()),
            ExprType::UnaryExpr => self.walk_unary_expr(depth, value_types),
        }
    }

    // ========================================================================
    // Binary expressions
    // ========================================================================

    pub(crate) fn walk_binary_expr(
        &mut self,
        depth: usize,
        value_types: &[ValueType],
    ) -> Option<Expr> {
        let mut operand_types = keep_value_types(value_types, VECTOR_AND_SCALAR);
        if operand_types.is_empty() {
            operand_types = VECTOR_AND_SCALAR.to_vec();
        }

        let op = self.walk_binary_op(!operand_types.contains(&ValueType::Vector))?;
        let mut matching = VectorMatching::default();
        if op.is_set_operator() {
            operand_types = vec![ValueType::Vector];
            matching.card = Cardinality::ManyToMany;
        }

        let lhs = wrap_paren_expr(self.walk_at(depth + 1, &operand_types)?);
        let rhs = wrap_paren_expr(self.walk_at(depth + 1, &operand_types)?);
        let lhs_type = lhs.value_type();
        let rhs_type = rhs.value_type();

        // Scalar-to-scalar comparisons must return a value, not filter
        let return_bool = op.is_comparison()
            && ((lhs_type == ValueType::Scalar && rhs_type == ValueType::Scalar)
                || self.rng.gen_bool(BOOL_MODIFIER_PROBABILITY));

        let mut expr = BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            return_bool,
            matching,
        };

        if self.config.enable_vector_matching
            && lhs_type == ValueType::Vector
            && rhs_type == ValueType::Vector
            && self.rng.gen_bool(VECTOR_MATCHING_PROBABILITY)
        {
            self.walk_vector_matching(&mut expr);
        }

        Some(Expr::Binary(expr))
    }

    /// Pick an enabled operator; set operators are skipped when only scalars fit
    pub(crate) fn walk_binary_op(&mut self, disallow_set_ops: bool) -> Option<BinaryOp> {
        let ops: Vec<BinaryOp> = self
            .config
            .binops
            .iter()
            .copied()
            .filter(|op| !(disallow_set_ops && op.is_set_operator()))
            .collect();
        let op = ops.choose(&mut self.rng).copied();
        if op.is_none() {
            debug!(disallow_set_ops, "no enabled binary operator fits");
        }
        op
    }

    // ========================================================================
    // Aggregations
    // ========================================================================

    /// Aggregate over a freshly walked vector selector
    pub(crate) fn walk_aggregate_expr(&mut self) -> Option<Expr> {
        let op = *self.config.aggregators.choose(&mut self.rng)?;
        let without = self.rng.gen_bool(WITHOUT_PROBABILITY);
        let (selector, series) = self.walk_vector_selector();
        let grouping = self.walk_grouping(&series);
        let param = self.walk_aggregate_param(op).map(Box::new);

        Some(Expr::Aggregate(AggregateExpr {
            op,
            expr: Box::new(Expr::VectorSelector(selector)),
            param,
            grouping,
            without,
        }))
    }

    /// Synthesize the leading parameter an aggregator requires
    pub(crate) fn walk_aggregate_param(&mut self, op: AggregateOp) -> Option<Expr> {
        match op {
            AggregateOp::Topk | AggregateOp::Bottomk | AggregateOp::Limitk => Some(
                Expr::NumberLiteral(f64::from(self.rng.gen_range(1..=MAX_RANK_PARAM))),
            ),
            AggregateOp::Quantile | AggregateOp::LimitRatio => {
                Some(Expr::NumberLiteral(self.open_unit_interval()))
            },
            AggregateOp::CountValues => Some(Expr::StringLiteral(COUNT_VALUES_LABEL.to_string())),
            AggregateOp::Sum
            | AggregateOp::Avg
            | AggregateOp::Count
            | AggregateOp::Min
            | AggregateOp::Max
            | AggregateOp::Group
            | AggregateOp::Stddev
            | AggregateOp::Stdvar => None,
        }
    }

    /// Random subset of the series' label names, capped by config
    pub(crate) fn walk_grouping(&mut self, series: &LabelSet) -> Vec<String> {
        let mut names: Vec<String> = series.names().map(String::from).collect();
        names.shuffle(&mut self.rng);
        let items = self
            .rng
            .gen_range(0..=names.len())
            .min(self.config.max_grouping_labels);
        names.truncate(items);
        names
    }

    // ========================================================================
    // Unary and literals
    // ========================================================================

    pub(crate) fn walk_unary_expr(&mut self, depth: usize, value_types: &[ValueType]) -> Option<Expr> {
        let mut operand_types = keep_value_types(value_types, VECTOR_AND_SCALAR);
        if operand_types.is_empty() {
            operand_types = VECTOR_AND_SCALAR.to_vec();
        }
        let expr = self.walk_at(depth + 1, &operand_types)?;
        Some(Expr::Unary(UnaryExpr {
            expr: Box::new(expr),
        }))
    }

    pub(crate) fn walk_number_literal(&mut self) -> Expr {
        Expr::NumberLiteral(self.rng.gen::<f64>())
    }

    /// Sample from the open interval (0, 1)
    pub(crate) fn open_unit_interval(&mut self) -> f64 {
        loop {
            let value: f64 = self.rng.gen();
            if value > 0.0 {
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Options;
    use super::*;
    use crate::types::METRIC_NAME;

    #[test]
    fn test_candidates_respect_depth() {
        let smith = smith_with(Options::default().with_max_depth(2), 1);
        let root = smith.candidate_exprs(1, &[ValueType::Vector]);
        assert!(root.contains(&ExprType::AggregateExpr));
        assert!(root.contains(&ExprType::BinaryExpr));

        let limit = smith.candidate_exprs(2, &[ValueType::Vector]);
        assert_eq!(limit, vec![ExprType::VectorSelector]);

        let limit_scalar = smith.candidate_exprs(2, &[ValueType::Scalar]);
        assert_eq!(limit_scalar, vec![ExprType::NumberLiteral]);
    }

    #[test]
    fn test_candidates_respect_enabled_exprs() {
        let smith = smith_with(
            Options::default().with_enabled_exprs(vec![ExprType::NumberLiteral]),
            1,
        );
        assert!(smith.candidate_exprs(1, &[ValueType::Vector]).is_empty());
        assert_eq!(
            smith.candidate_exprs(1, &[ValueType::Vector, ValueType::Scalar]),
            vec![ExprType::NumberLiteral]
        );
    }

    #[test]
    fn test_empty_intersection_returns_none() {
        let mut smith = smith_with(
            Options::default().with_enabled_exprs(vec![ExprType::NumberLiteral]),
            11,
        );
        for _ in 0..20 {
            assert!(smith.walk(&[ValueType::Vector]).is_none());
            assert!(smith.walk(&[ValueType::Matrix]).is_none());
            assert!(smith.walk(&[ValueType::String]).is_none());
        }
    }

    #[test]
    fn test_incompletable_binary_returns_none() {
        // Only binary expressions enabled: leaves are never available
        let mut smith = smith_with(
            Options::default()
                .with_enabled_exprs(vec![ExprType::BinaryExpr])
                .with_max_depth(3),
            2,
        );
        assert!(smith.walk(&[ValueType::Scalar]).is_none());
    }

    #[test]
    fn test_binary_expr_wrapped_in_parens() {
        let mut smith = smith_with(
            Options::default().with_enabled_exprs(vec![
                ExprType::BinaryExpr,
                ExprType::NumberLiteral,
                ExprType::VectorSelector,
            ]),
            4,
        );
        for _ in 0..50 {
            let expr = smith.walk(&[ValueType::Scalar]).unwrap();
            match expr {
                Expr::Paren(inner) => assert!(matches!(*inner, Expr::Binary(_))),
                Expr::NumberLiteral(_) => {},
                other => panic!("unexpected scalar root {:?}", other),
            }
        }
    }

    #[test]
    fn test_scalar_comparisons_use_bool() {
        let mut smith = smith_with(
            Options::default()
                .with_enabled_binops(vec![BinaryOp::Gtr, BinaryOp::Eql, BinaryOp::And])
                .with_max_depth(2),
            5,
        );
        for _ in 0..100 {
            let expr = smith.walk_binary_expr(1, &[ValueType::Scalar]).unwrap();
            let Expr::Binary(bin) = expr else {
                panic!("expected binary expression");
            };
            assert!(!bin.op.is_set_operator());
            assert!(bin.return_bool);
            assert_eq!(bin.lhs.value_type(), ValueType::Scalar);
        }
    }

    #[test]
    fn test_set_operators_force_vectors() {
        let mut smith = smith_with(
            Options::default()
                .with_enabled_binops(vec![BinaryOp::And, BinaryOp::Or, BinaryOp::Unless])
                .with_max_depth(2),
            6,
        );
        for _ in 0..50 {
            let Some(Expr::Binary(bin)) = smith.walk_binary_expr(1, &[]) else {
                panic!("expected binary expression");
            };
            assert_eq!(bin.matching.card, Cardinality::ManyToMany);
            assert_eq!(bin.lhs.value_type(), ValueType::Vector);
            assert_eq!(bin.rhs.value_type(), ValueType::Vector);
        }
        assert!(smith.walk_binary_op(true).is_none());
    }

    #[test]
    fn test_aggregate_params() {
        let mut smith = smith_with(Options::default(), 8);
        for _ in 0..50 {
            match smith.walk_aggregate_param(AggregateOp::Topk) {
                Some(Expr::NumberLiteral(v)) => {
                    assert!((1.0..=100.0).contains(&v));
                    assert_eq!(v.fract(), 0.0);
                },
                other => panic!("unexpected topk param {:?}", other),
            }
            match smith.walk_aggregate_param(AggregateOp::Quantile) {
                Some(Expr::NumberLiteral(v)) => assert!(v > 0.0 && v < 1.0),
                other => panic!("unexpected quantile param {:?}", other),
            }
        }
        assert_eq!(
            smith.walk_aggregate_param(AggregateOp::CountValues),
            Some(Expr::StringLiteral("value".to_string()))
        );
        assert_eq!(smith.walk_aggregate_param(AggregateOp::Sum), None);
    }

    #[test]
    fn test_aggregate_expr_shape() {
        let mut smith = smith_with(Options::default(), 12);
        for _ in 0..100 {
            let Some(Expr::Aggregate(agg)) = smith.walk_aggregate_expr() else {
                panic!("expected aggregation");
            };
            assert!(matches!(*agg.expr, Expr::VectorSelector(_)));
            assert_eq!(agg.param.is_some(), agg.op.param_type().is_some());
            assert!(agg.grouping.len() <= 5);
        }
    }

    #[test]
    fn test_walk_grouping() {
        let mut smith = smith_with(Options::default(), 13);
        let series = ls(&[
            (METRIC_NAME, "m"),
            ("a", "1"),
            ("b", "1"),
            ("c", "1"),
            ("d", "1"),
            ("e", "1"),
            ("f", "1"),
        ]);
        for _ in 0..100 {
            let grouping = smith.walk_grouping(&series);
            assert!(grouping.len() <= 5);
            for name in &grouping {
                assert!(series.get(name).is_some());
            }
        }

        let mut capped = smith_with(Options::default().with_max_grouping_labels(2), 13);
        for _ in 0..50 {
            assert!(capped.walk_grouping(&series).len() <= 2);
        }
    }

    #[test]
    fn test_unary_operand_types() {
        let mut smith = smith_with(Options::default().with_max_depth(2), 14);
        for _ in 0..50 {
            let Some(Expr::Unary(unary)) = smith.walk_unary_expr(1, &[ValueType::Matrix]) else {
                panic!("expected unary expression");
            };
            assert!(VECTOR_AND_SCALAR.contains(&unary.expr.value_type()));
        }
    }

    #[test]
    fn test_open_unit_interval() {
        let mut smith = smith_with(Options::default(), 15);
        for _ in 0..1000 {
            let v = smith.open_unit_interval();
            assert!(v > 0.0 && v < 1.0);
        }
    }
}
