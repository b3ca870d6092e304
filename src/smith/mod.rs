//! Grammar-directed random PromQL generator
//!
//! [`PromQLSmith`] walks the PromQL grammar under a value-type constraint and
//! a depth budget, sampling concrete selectors from a [`SeriesCatalog`].
//!
//! ```text
//! walk(types) ──► tables: types → candidate constructs
//!      │                │
//!      │                ▼
//!      │          pick one uniformly (leaves only at max depth)
//!      │                │
//!      ▼                ▼
//!   handler ──► recurse into walk(arg types, depth + 1)
//!      │
//!      └─► binary: output series tracker → vector matching
//! ```
//!
//! # Example
//!
//! ```rust
//! use promql_smith::smith::{Options, PromQLSmith};
//! use promql_smith::types::LabelSet;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let series = vec![
//!     LabelSet::from_pairs([("__name__", "http_requests_total"), ("job", "api")]),
//!     LabelSet::from_pairs([("__name__", "http_requests_total"), ("job", "web")]),
//! ];
//! let mut smith = PromQLSmith::new(StdRng::seed_from_u64(42), series, Options::default()).unwrap();
//! let expr = smith.walk_instant_query().unwrap();
//! assert!(expr.depth() <= 5);
//! println!("{}", expr);
//! ```

mod call;
pub mod catalog;
pub mod matching;
pub mod options;
mod selector;
pub mod tables;
mod walk;

pub use catalog::{filter_empty_series, SeriesCatalog};
pub use matching::{include_labels, output_series, resolve_vector_matching, MatchingStyle};
pub use options::{GenerationConfig, Options};

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::ast::Expr;
use crate::types::{LabelSet, ValueType};
use tables::VECTOR_AND_SCALAR;

// ============================================================================
// Tunables
// ============================================================================

/// Chance of an offset when offsets are enabled
pub const OFFSET_PROBABILITY: f64 = 0.5;

/// Largest offset, in seconds
pub const MAX_OFFSET_SECS: u64 = 300;

/// Chance of an `@` modifier when enabled
pub const AT_MODIFIER_PROBABILITY: f64 = 0.3;

/// Chance of `bool` on a comparison that does not require it
pub const BOOL_MODIFIER_PROBABILITY: f64 = 0.5;

/// Chance of resolving vector matching for a vector/vector operation
pub const VECTOR_MATCHING_PROBABILITY: f64 = 0.5;

/// Chance of expressing the match as `ignoring` rather than `on`
pub const IGNORING_PROBABILITY: f64 = 0.3;

/// Chance of `without` rather than `by`
pub const WITHOUT_PROBABILITY: f64 = 0.5;

/// Chance of including an optional trailing function argument
pub const OPTIONAL_ARG_PROBABILITY: f64 = 0.5;

/// Upper bound for topk/bottomk/limitk parameters
pub const MAX_RANK_PARAM: u32 = 100;

/// Upper bound for matrix selector ranges, in minutes
pub const MAX_MATRIX_RANGE_MINUTES: u64 = 5;

/// Subquery range
pub const SUBQUERY_RANGE: Duration = Duration::from_secs(3600);

/// Subquery resolution step
pub const SUBQUERY_STEP: Duration = Duration::from_secs(60);

/// Label name passed to count_values
pub const COUNT_VALUES_LABEL: &str = "value";

/// Destination label for label_join and label_replace
pub const DST_LABEL: &str = "dst_label";

/// Most label-name arguments given to label_join and sort_by_label
pub const MAX_LABEL_ARGS: usize = 3;

// ============================================================================
// Generator
// ============================================================================

/// Random PromQL expression generator
///
/// Owns its random source; the catalog and config are shared read-only, so
/// several generators (one per thread, each with its own rng) can use the
/// same `Arc`s.
pub struct PromQLSmith<R> {
    pub(crate) rng: R,
    pub(crate) catalog: Arc<SeriesCatalog>,
    pub(crate) config: Arc<GenerationConfig>,
}

impl<R: Rng> PromQLSmith<R> {
    /// Build a generator from a random source, known series and options
    ///
    /// Fails when the options are invalid or the catalog has no non-empty
    /// series with valid label names.
    pub fn new(rng: R, series: Vec<LabelSet>, options: Options) -> Result<Self> {
        let config = options.resolve()?;
        Self::from_parts(rng, Arc::new(SeriesCatalog::new(series)), Arc::new(config))
    }

    /// Build a generator around a shared catalog and config
    pub fn from_parts(
        rng: R,
        catalog: Arc<SeriesCatalog>,
        config: Arc<GenerationConfig>,
    ) -> Result<Self> {
        catalog.validate()?;
        if config.max_depth == 0 {
            return Err(Error::Configuration("max_depth must be at least 1".to_string()));
        }

        debug!(
            series = catalog.len(),
            label_names = catalog.label_names().len(),
            max_depth = config.max_depth,
            "created generator"
        );

        Ok(Self {
            rng,
            catalog,
            config,
        })
    }

    /// The series catalog
    pub fn catalog(&self) -> &SeriesCatalog {
        &self.catalog
    }

    /// The resolved generation config
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate an expression producing one of `value_types` (any type when empty)
    ///
    /// Returns `None` when no enabled construct can produce the requested
    /// types within the depth budget.
    pub fn walk(&mut self, value_types: &[ValueType]) -> Option<Expr> {
        self.walk_at(1, value_types)
    }

    /// Generate a root expression for an instant query
    pub fn walk_instant_query(&mut self) -> Option<Expr> {
        self.walk(VECTOR_AND_SCALAR)
    }

    /// Generate a root expression for a range query
    ///
    /// Range evaluation turns an instant vector or scalar root into a matrix
    /// result; a range-vector root is rejected by range queries.
    pub fn walk_range_query(&mut self) -> Option<Expr> {
        self.walk(VECTOR_AND_SCALAR)
    }
}
