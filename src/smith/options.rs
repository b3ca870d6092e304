//! Generator options
//!
//! [`Options`] is what callers (and the TOML config) set: toggles plus
//! optional allow-lists, where an empty list means "use the defaults".
//! [`Options::resolve`] fills in the defaults and produces the read-only
//! [`GenerationConfig`] a generator consults during walks.
//!
//! # Example
//!
//! ```rust
//! use promql_smith::smith::Options;
//! use promql_smith::query::BinaryOp;
//!
//! let config = Options::default()
//!     .with_enable_offset(true)
//!     .with_max_depth(3)
//!     .with_enabled_binops(vec![BinaryOp::Add, BinaryOp::And])
//!     .resolve()
//!     .unwrap();
//! assert_eq!(config.binops, vec![BinaryOp::Add, BinaryOp::And]);
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::ast::{AggregateOp, BinaryOp, ExprType};
use crate::query::functions::{self, Function};
use crate::types::Matcher;

/// Default maximum expression depth
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default cap on aggregation grouping labels
pub const DEFAULT_MAX_GROUPING_LABELS: usize = 5;

/// User-facing generator options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Attach random offsets to selectors and subqueries
    pub enable_offset: bool,

    /// Attach random `@` modifiers to selectors and subqueries
    pub enable_at_modifier: bool,

    /// Resolve `on`/`ignoring` and group modifiers for vector/vector operations
    pub enable_vector_matching: bool,

    /// Add experimental functions and aggregators to the default lists
    pub enable_experimental_functions: bool,

    /// Upper bound (exclusive, ms) for `@` timestamps; defaults to now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_modifier_max_timestamp: Option<i64>,

    /// Maximum expression depth
    pub max_depth: usize,

    /// Maximum number of aggregation grouping labels
    pub max_grouping_labels: usize,

    /// Binary operators to use (empty: defaults)
    pub enabled_binops: Vec<BinaryOp>,

    /// Aggregators to use (empty: defaults)
    pub enabled_aggregators: Vec<AggregateOp>,

    /// Function names to use (empty: defaults)
    pub enabled_functions: Vec<String>,

    /// Expression kinds to use (empty: all)
    pub enabled_exprs: Vec<ExprType>,

    /// Matchers added to every generated selector
    pub enforced_matchers: Vec<Matcher>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enable_offset: false,
            enable_at_modifier: false,
            enable_vector_matching: false,
            enable_experimental_functions: false,
            at_modifier_max_timestamp: None,
            max_depth: DEFAULT_MAX_DEPTH,
            max_grouping_labels: DEFAULT_MAX_GROUPING_LABELS,
            enabled_binops: Vec::new(),
            enabled_aggregators: Vec::new(),
            enabled_functions: Vec::new(),
            enabled_exprs: Vec::new(),
            enforced_matchers: Vec::new(),
        }
    }
}

impl Options {
    /// Toggle offset modifiers
    pub fn with_enable_offset(mut self, enabled: bool) -> Self {
        self.enable_offset = enabled;
        self
    }

    /// Toggle `@` modifiers
    pub fn with_enable_at_modifier(mut self, enabled: bool) -> Self {
        self.enable_at_modifier = enabled;
        self
    }

    /// Set the exclusive upper bound for `@` timestamps, in milliseconds
    pub fn with_at_modifier_max_timestamp(mut self, max_ms: i64) -> Self {
        self.at_modifier_max_timestamp = Some(max_ms);
        self
    }

    /// Toggle vector matching resolution
    pub fn with_enable_vector_matching(mut self, enabled: bool) -> Self {
        self.enable_vector_matching = enabled;
        self
    }

    /// Toggle experimental functions and aggregators
    pub fn with_enable_experimental_functions(mut self, enabled: bool) -> Self {
        self.enable_experimental_functions = enabled;
        self
    }

    /// Set the maximum expression depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum number of grouping labels
    pub fn with_max_grouping_labels(mut self, max: usize) -> Self {
        self.max_grouping_labels = max;
        self
    }

    /// Restrict binary operators
    pub fn with_enabled_binops(mut self, ops: Vec<BinaryOp>) -> Self {
        self.enabled_binops = ops;
        self
    }

    /// Restrict aggregators
    pub fn with_enabled_aggregators(mut self, ops: Vec<AggregateOp>) -> Self {
        self.enabled_aggregators = ops;
        self
    }

    /// Restrict functions by name
    pub fn with_enabled_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_functions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict expression kinds
    pub fn with_enabled_exprs(mut self, exprs: Vec<ExprType>) -> Self {
        self.enabled_exprs = exprs;
        self
    }

    /// Matchers every selector must carry
    pub fn with_enforced_matchers(mut self, matchers: Vec<Matcher>) -> Self {
        self.enforced_matchers = matchers;
        self
    }

    /// Validate option values
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Configuration("max_depth must be at least 1".to_string()));
        }

        if let Some(ts) = self.at_modifier_max_timestamp {
            if ts <= 0 {
                return Err(Error::Configuration(format!(
                    "at_modifier_max_timestamp must be positive, got {}",
                    ts
                )));
            }
        }

        for name in &self.enabled_functions {
            if functions::lookup(name).is_none() {
                return Err(Error::Configuration(format!("unknown function '{}'", name)));
            }
        }

        Ok(())
    }

    /// Apply defaults and produce the generation snapshot
    pub fn resolve(&self) -> Result<GenerationConfig> {
        self.validate()?;

        let binops = if self.enabled_binops.is_empty() {
            BinaryOp::DEFAULTS.to_vec()
        } else {
            dedup(&self.enabled_binops)
        };

        let aggregators = if self.enabled_aggregators.is_empty() {
            let mut ops = AggregateOp::DEFAULTS.to_vec();
            if self.enable_experimental_functions {
                ops.extend(AggregateOp::EXPERIMENTAL);
            }
            ops
        } else {
            dedup(&self.enabled_aggregators)
        };

        let functions: Vec<&'static Function> = if self.enabled_functions.is_empty() {
            let mut funcs: Vec<&'static Function> = functions::stable_functions().collect();
            if self.enable_experimental_functions {
                funcs.extend(functions::experimental_functions());
            }
            funcs
        } else {
            let mut funcs = Vec::with_capacity(self.enabled_functions.len());
            for name in &self.enabled_functions {
                let func = functions::lookup(name)
                    .ok_or_else(|| Error::Configuration(format!("unknown function '{}'", name)))?;
                if !funcs.contains(&func) {
                    funcs.push(func);
                }
            }
            funcs
        };

        let exprs = if self.enabled_exprs.is_empty() {
            ExprType::ALL.to_vec()
        } else {
            dedup(&self.enabled_exprs)
        };

        let at_modifier_max_timestamp = self
            .at_modifier_max_timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        debug!(
            max_depth = self.max_depth,
            binops = binops.len(),
            aggregators = aggregators.len(),
            functions = functions.len(),
            exprs = exprs.len(),
            "resolved generation config"
        );

        Ok(GenerationConfig {
            enable_offset: self.enable_offset,
            enable_at_modifier: self.enable_at_modifier,
            enable_vector_matching: self.enable_vector_matching,
            enable_experimental_functions: self.enable_experimental_functions,
            at_modifier_max_timestamp,
            max_depth: self.max_depth,
            max_grouping_labels: self.max_grouping_labels,
            binops,
            aggregators,
            functions,
            exprs,
            enforced_matchers: self.enforced_matchers.clone(),
        })
    }
}

fn dedup<T: Copy + PartialEq>(items: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(*item);
        }
    }
    out
}

/// Resolved, read-only generation settings
///
/// Built once per generator (or shared behind an `Arc` by several) and
/// never mutated during a walk.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Offsets enabled
    pub enable_offset: bool,
    /// `@` modifiers enabled
    pub enable_at_modifier: bool,
    /// Vector matching enabled
    pub enable_vector_matching: bool,
    /// Experimental functions were added to the defaults
    pub enable_experimental_functions: bool,
    /// Exclusive upper bound for `@` timestamps (ms)
    pub at_modifier_max_timestamp: i64,
    /// Maximum expression depth, at least 1
    pub max_depth: usize,
    /// Maximum number of grouping labels
    pub max_grouping_labels: usize,
    /// Enabled binary operators
    pub binops: Vec<BinaryOp>,
    /// Enabled aggregators
    pub aggregators: Vec<AggregateOp>,
    /// Enabled functions
    pub functions: Vec<&'static Function>,
    /// Enabled expression kinds
    pub exprs: Vec<ExprType>,
    /// Matchers added to every selector
    pub enforced_matchers: Vec<Matcher>,
}
