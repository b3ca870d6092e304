//! PromQL expression model
//!
//! The generator builds [`ast::Expr`] trees and renders them with `Display`:
//!
//! ```text
//! ┌─────────────┐
//! │  functions  │  Function signatures (argument / return types)
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │    ast      │  Expression tree, value-type resolution, depth
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  printer    │  PromQL text
//! └─────────────┘
//! ```

pub mod ast;
pub mod functions;
pub mod printer;

pub use ast::{
    AggregateExpr, AggregateOp, AtModifier, BinaryExpr, BinaryOp, Call, Cardinality, Expr,
    ExprType, MatrixSelector, Offset, SubqueryExpr, UnaryExpr, VectorMatching, VectorSelector,
};
pub use functions::{Function, FUNCTIONS};
