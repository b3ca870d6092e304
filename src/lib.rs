//! promql-smith - randomized, type-correct PromQL expression generator
//!
//! This library generates syntactically valid, semantically plausible PromQL
//! expressions for differential testing of query engines:
//! - Grammar-directed random walk bounded by depth and value type
//! - Selectors sampled from a catalog of known series
//! - Function calls checked against a signature table
//! - Vector matching resolved from the series each operand would return
//! - Deterministic output for a given seed
//!
//! # Example
//!
//! ```rust
//! use promql_smith::{LabelSet, Options, PromQLSmith};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let series = vec![LabelSet::from_pairs([("__name__", "up"), ("job", "node")])];
//! let options = Options::default().with_enable_offset(true).with_max_depth(3);
//! let mut smith = PromQLSmith::new(StdRng::seed_from_u64(7), series, options).unwrap();
//! if let Some(expr) = smith.walk_instant_query() {
//!     println!("{}", expr);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// PromQL expression tree, function table and printer
pub mod query;

/// The random expression generator
pub mod smith;

// Re-export main types
pub use error::{Error, Result};
pub use query::{Expr, ExprType};
pub use smith::{Options, PromQLSmith, SeriesCatalog};
pub use types::{LabelSet, Matcher, ValueType};
