//! Type system tables
//!
//! Static lookups between value types and the constructs that can produce
//! them. The walk engine consults these before dispatching.

use crate::query::ast::ExprType;
use crate::types::ValueType;

/// Operand types for binary and unary expressions
pub const VECTOR_AND_SCALAR: &[ValueType] = &[ValueType::Vector, ValueType::Scalar];

/// Constructs able to produce a value of the given type
pub fn exprs_for_value_type(vt: ValueType) -> &'static [ExprType] {
    match vt {
        ValueType::Vector => &[
            ExprType::VectorSelector,
            ExprType::AggregateExpr,
            ExprType::BinaryExpr,
            ExprType::CallExpr,
            ExprType::UnaryExpr,
        ],
        ValueType::Scalar => &[
            ExprType::BinaryExpr,
            ExprType::CallExpr,
            ExprType::NumberLiteral,
            ExprType::UnaryExpr,
        ],
        ValueType::Matrix => &[ExprType::MatrixSelector, ExprType::SubQueryExpr],
        // String literals only appear as synthesized arguments
        ValueType::String => &[],
    }
}

/// Value types a construct can produce
pub fn expr_value_types(expr: ExprType) -> &'static [ValueType] {
    match expr {
        ExprType::VectorSelector | ExprType::AggregateExpr => &[ValueType::Vector],
        ExprType::MatrixSelector | ExprType::SubQueryExpr => &[ValueType::Matrix],
        ExprType::NumberLiteral => &[ValueType::Scalar],
        ExprType::BinaryExpr | ExprType::CallExpr | ExprType::UnaryExpr => VECTOR_AND_SCALAR,
    }
}

/// Union of constructs for a set of value types, in dispatch order
///
/// An empty request means any value type.
pub fn exprs_from_value_types(value_types: &[ValueType]) -> Vec<ExprType> {
    if value_types.is_empty() {
        return ExprType::ALL.to_vec();
    }
    ExprType::ALL
        .into_iter()
        .filter(|e| value_types.iter().any(|vt| exprs_for_value_type(*vt).contains(e)))
        .collect()
}

/// Keep the requested types that also appear in `keep`
pub fn keep_value_types(input: &[ValueType], keep: &[ValueType]) -> Vec<ValueType> {
    input.iter().copied().filter(|vt| keep.contains(vt)).collect()
}
