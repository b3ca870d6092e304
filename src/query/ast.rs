//! PromQL expression tree
//!
//! One variant per construct the generator emits, plus the paren and string
//! literal nodes it needs around them. Each node owns its children; the root
//! is owned by the caller. Rendering lives in [`super::printer`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::functions::Function;
use crate::types::{Matcher, ValueType};

// ============================================================================
// Expression kinds
// ============================================================================

/// Syntactic construct the walk engine can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprType {
    /// Instant vector selector
    VectorSelector,
    /// Range vector selector
    MatrixSelector,
    /// Aggregation
    AggregateExpr,
    /// Binary operation
    BinaryExpr,
    /// Subquery
    SubQueryExpr,
    /// Function call
    CallExpr,
    /// Number literal
    NumberLiteral,
    /// Unary negation
    UnaryExpr,
}

impl ExprType {
    /// Every expression kind, in dispatch order
    pub const ALL: [ExprType; 8] = [
        ExprType::VectorSelector,
        ExprType::MatrixSelector,
        ExprType::AggregateExpr,
        ExprType::BinaryExpr,
        ExprType::SubQueryExpr,
        ExprType::CallExpr,
        ExprType::NumberLiteral,
        ExprType::UnaryExpr,
    ];

    /// Constructs without recursively walked children
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            ExprType::VectorSelector | ExprType::MatrixSelector | ExprType::NumberLiteral
        )
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `atan2`
    Atan2,
    /// `==`
    Eql,
    /// `!=`
    Neq,
    /// `>`
    Gtr,
    /// `<`
    Lss,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// `and`
    And,
    /// `or`
    Or,
    /// `unless`
    Unless,
}

impl BinaryOp {
    /// Operators enabled by default
    pub const DEFAULTS: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Pow,
        BinaryOp::Atan2,
        BinaryOp::Eql,
        BinaryOp::Neq,
        BinaryOp::Gtr,
        BinaryOp::Lss,
        BinaryOp::Gte,
        BinaryOp::Lte,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Unless,
    ];

    /// Set operators only combine instant vectors
    pub fn is_set_operator(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Unless)
    }

    /// Comparison operators filter unless `bool` is given
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eql
                | BinaryOp::Neq
                | BinaryOp::Gtr
                | BinaryOp::Lss
                | BinaryOp::Gte
                | BinaryOp::Lte
        )
    }

    /// PromQL token
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Gtr => ">",
            BinaryOp::Lss => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Unless => "unless",
        }
    }
}

/// Aggregation operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    /// `sum`
    Sum,
    /// `avg`
    Avg,
    /// `count`
    Count,
    /// `min`
    Min,
    /// `max`
    Max,
    /// `group`
    Group,
    /// `stddev`
    Stddev,
    /// `stdvar`
    Stdvar,
    /// `topk`
    Topk,
    /// `bottomk`
    Bottomk,
    /// `quantile`
    Quantile,
    /// `count_values`
    CountValues,
    /// `limitk` (experimental)
    Limitk,
    /// `limit_ratio` (experimental)
    LimitRatio,
}

impl AggregateOp {
    /// Aggregators enabled by default
    pub const DEFAULTS: [AggregateOp; 12] = [
        AggregateOp::Sum,
        AggregateOp::Avg,
        AggregateOp::Count,
        AggregateOp::Min,
        AggregateOp::Max,
        AggregateOp::Group,
        AggregateOp::Stddev,
        AggregateOp::Stdvar,
        AggregateOp::Topk,
        AggregateOp::Bottomk,
        AggregateOp::Quantile,
        AggregateOp::CountValues,
    ];

    /// Aggregators gated behind the experimental flag
    pub const EXPERIMENTAL: [AggregateOp; 2] = [AggregateOp::Limitk, AggregateOp::LimitRatio];

    /// Type of the leading parameter, for aggregators that take one
    pub fn param_type(self) -> Option<ValueType> {
        match self {
            AggregateOp::Topk
            | AggregateOp::Bottomk
            | AggregateOp::Quantile
            | AggregateOp::Limitk
            | AggregateOp::LimitRatio => Some(ValueType::Scalar),
            AggregateOp::CountValues => Some(ValueType::String),
            _ => None,
        }
    }

    /// Aggregators that return a subset of their input series unchanged
    pub fn keeps_input_labels(self) -> bool {
        matches!(
            self,
            AggregateOp::Topk | AggregateOp::Bottomk | AggregateOp::Limitk | AggregateOp::LimitRatio
        )
    }

    /// PromQL keyword
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Group => "group",
            AggregateOp::Stddev => "stddev",
            AggregateOp::Stdvar => "stdvar",
            AggregateOp::Topk => "topk",
            AggregateOp::Bottomk => "bottomk",
            AggregateOp::Quantile => "quantile",
            AggregateOp::CountValues => "count_values",
            AggregateOp::Limitk => "limitk",
            AggregateOp::LimitRatio => "limit_ratio",
        }
    }
}

// ============================================================================
// Modifiers
// ============================================================================

/// Offset modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// `offset 5m`
    Pos(Duration),
    /// `offset -5m`
    Neg(Duration),
}

/// `@` modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtModifier {
    /// `@ start()`
    Start,
    /// `@ end()`
    End,
    /// `@ <timestamp>`, in milliseconds since the epoch
    At(i64),
}

/// Vector matching cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// Default pairing
    #[default]
    OneToOne,
    /// `group_left`
    ManyToOne,
    /// `group_right`
    OneToMany,
    /// Set operators
    ManyToMany,
}

/// How two vectors pair up in a binary operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VectorMatching {
    /// Matching cardinality
    pub card: Cardinality,
    /// `on` when true, `ignoring` otherwise
    pub on: bool,
    /// Labels listed in `on(...)` / `ignoring(...)`
    pub matching_labels: Vec<String>,
    /// Labels listed in `group_left(...)` / `group_right(...)`
    pub include: Vec<String>,
}

impl VectorMatching {
    /// Whether any matching clause needs to be rendered
    pub fn is_explicit(&self) -> bool {
        self.on
            || !self.matching_labels.is_empty()
            || matches!(self.card, Cardinality::ManyToOne | Cardinality::OneToMany)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Instant vector selector
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    /// Label matchers, including the metric name matcher
    pub matchers: Vec<Matcher>,
    /// Offset modifier
    pub offset: Option<Offset>,
    /// `@` modifier
    pub at: Option<AtModifier>,
}

/// Range vector selector
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    /// Selector; its modifiers render after the range
    pub selector: VectorSelector,
    /// Range, never zero
    pub range: Duration,
}

/// Aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    /// Aggregator
    pub op: AggregateOp,
    /// Aggregated expression
    pub expr: Box<Expr>,
    /// Leading parameter for topk, quantile, count_values and friends
    pub param: Option<Box<Expr>>,
    /// Grouping labels
    pub grouping: Vec<String>,
    /// `without` when true, `by` otherwise
    pub without: bool,
}

/// Binary operation
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    /// Operator
    pub op: BinaryOp,
    /// Left operand
    pub lhs: Box<Expr>,
    /// Right operand
    pub rhs: Box<Expr>,
    /// `bool` modifier on comparisons
    pub return_bool: bool,
    /// Vector matching descriptor
    pub matching: VectorMatching,
}

/// Unary negation
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    /// Negated expression
    pub expr: Box<Expr>,
}

/// Function call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Called function
    pub func: &'static Function,
    /// Arguments
    pub args: Vec<Expr>,
}

/// Subquery
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    /// Inner expression
    pub expr: Box<Expr>,
    /// Range
    pub range: Duration,
    /// Resolution step
    pub step: Duration,
    /// Offset modifier
    pub offset: Option<Offset>,
    /// `@` modifier
    pub at: Option<AtModifier>,
}

/// A PromQL expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Instant vector selector
    VectorSelector(VectorSelector),
    /// Range vector selector
    MatrixSelector(MatrixSelector),
    /// Aggregation
    Aggregate(AggregateExpr),
    /// Binary operation
    Binary(BinaryExpr),
    /// Unary negation
    Unary(UnaryExpr),
    /// Function call
    Call(Call),
    /// Subquery
    Subquery(SubqueryExpr),
    /// Number literal
    NumberLiteral(f64),
    /// String literal
    StringLiteral(String),
    /// Parenthesized expression
    Paren(Box<Expr>),
}

impl Expr {
    /// Static value type of the expression
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::VectorSelector(_) | Expr::Aggregate(_) => ValueType::Vector,
            Expr::MatrixSelector(_) | Expr::Subquery(_) => ValueType::Matrix,
            Expr::NumberLiteral(_) => ValueType::Scalar,
            Expr::StringLiteral(_) => ValueType::String,
            Expr::Call(call) => call.func.return_type,
            Expr::Unary(unary) => unary.expr.value_type(),
            Expr::Paren(inner) => inner.value_type(),
            Expr::Binary(bin) => {
                if bin.lhs.value_type() == ValueType::Scalar
                    && bin.rhs.value_type() == ValueType::Scalar
                {
                    ValueType::Scalar
                } else {
                    ValueType::Vector
                }
            },
        }
    }

    /// Construct this node was dispatched as; None for string literals and parens
    pub fn kind(&self) -> Option<ExprType> {
        match self {
            Expr::VectorSelector(_) => Some(ExprType::VectorSelector),
            Expr::MatrixSelector(_) => Some(ExprType::MatrixSelector),
            Expr::Aggregate(_) => Some(ExprType::AggregateExpr),
            Expr::Binary(_) => Some(ExprType::BinaryExpr),
            Expr::Unary(_) => Some(ExprType::UnaryExpr),
            Expr::Call(_) => Some(ExprType::CallExpr),
            Expr::Subquery(_) => Some(ExprType::SubQueryExpr),
            Expr::NumberLiteral(_) => Some(ExprType::NumberLiteral),
            Expr::StringLiteral(_) | Expr::Paren(_) => None,
        }
    }

    /// Direct sub-expressions, left to right
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::VectorSelector(_)
            | Expr::MatrixSelector(_)
            | Expr::NumberLiteral(_)
            | Expr::StringLiteral(_) => Vec::new(),
            Expr::Aggregate(agg) => agg
                .param
                .iter()
                .map(|p| p.as_ref())
                .chain(std::iter::once(agg.expr.as_ref()))
                .collect(),
            Expr::Binary(bin) => vec![bin.lhs.as_ref(), bin.rhs.as_ref()],
            Expr::Unary(unary) => vec![unary.expr.as_ref()],
            Expr::Call(call) => call.args.iter().collect(),
            Expr::Subquery(sq) => vec![sq.expr.as_ref()],
            Expr::Paren(inner) => vec![inner.as_ref()],
        }
    }

    /// Longest root-to-leaf path; parens do not add a level
    pub fn depth(&self) -> usize {
        match self {
            Expr::Paren(inner) => inner.depth(),
            _ => 1 + self.children().into_iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    /// Visit this node and all descendants, parents first
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Strip any number of enclosing parens
    pub fn unparen(&self) -> &Expr {
        match self {
            Expr::Paren(inner) => inner.unparen(),
            other => other,
        }
    }
}

/// Wrap binary expressions in parens; other nodes pass through
pub fn wrap_paren_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Binary(_) => Expr::Paren(Box::new(expr)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::functions::lookup;

    fn selector(name: &str) -> Expr {
        Expr::VectorSelector(VectorSelector {
            matchers: vec![Matcher::equal("__name__", name)],
            offset: None,
            at: None,
        })
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            return_bool: false,
            matching: VectorMatching::default(),
        })
    }

    #[test]
    fn test_operator_classes() {
        assert!(BinaryOp::And.is_set_operator());
        assert!(!BinaryOp::Add.is_set_operator());
        assert!(BinaryOp::Gte.is_comparison());
        assert!(!BinaryOp::Atan2.is_comparison());
        assert_eq!(AggregateOp::CountValues.param_type(), Some(ValueType::String));
        assert_eq!(AggregateOp::Topk.param_type(), Some(ValueType::Scalar));
        assert_eq!(AggregateOp::Sum.param_type(), None);
    }

    #[test]
    fn test_value_type_resolution() {
        let scalar_bin = binary(BinaryOp::Add, Expr::NumberLiteral(1.0), Expr::NumberLiteral(2.0));
        assert_eq!(scalar_bin.value_type(), ValueType::Scalar);

        let mixed = binary(BinaryOp::Mul, selector("up"), Expr::NumberLiteral(2.0));
        assert_eq!(mixed.value_type(), ValueType::Vector);

        let call = Expr::Call(Call {
            func: lookup("scalar").unwrap(),
            args: vec![selector("up")],
        });
        assert_eq!(call.value_type(), ValueType::Scalar);
        assert_eq!(
            Expr::Paren(Box::new(call)).value_type(),
            ValueType::Scalar
        );
    }

    #[test]
    fn test_depth_ignores_parens() {
        let leaf = selector("up");
        assert_eq!(leaf.depth(), 1);

        let inner = wrap_paren_expr(binary(BinaryOp::Add, selector("a"), selector("b")));
        assert!(matches!(inner, Expr::Paren(_)));
        assert_eq!(inner.depth(), 2);

        let outer = Expr::Unary(UnaryExpr {
            expr: Box::new(inner),
        });
        assert_eq!(outer.depth(), 3);
    }

    #[test]
    fn test_aggregate_children_include_param() {
        let agg = Expr::Aggregate(AggregateExpr {
            op: AggregateOp::Topk,
            expr: Box::new(selector("up")),
            param: Some(Box::new(Expr::NumberLiteral(3.0))),
            grouping: vec![],
            without: false,
        });
        let children = agg.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], &Expr::NumberLiteral(3.0));
        assert_eq!(agg.depth(), 2);
    }

    #[test]
    fn test_visit_counts_nodes() {
        let expr = binary(BinaryOp::Sub, selector("a"), Expr::NumberLiteral(1.0));
        let mut count = 0;
        expr.visit(&mut |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_explicit_matching() {
        assert!(!VectorMatching::default().is_explicit());
        let group = VectorMatching {
            card: Cardinality::ManyToOne,
            ..Default::default()
        };
        assert!(group.is_explicit());
    }
}
