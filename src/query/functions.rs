//! PromQL function table
//!
//! Every function the generator can call, with its declared argument types,
//! arity, return type and whether it sits behind the experimental flag.

use std::fmt;

use crate::types::ValueType;

use ValueType::{Matrix as M, Scalar as S, String as Str, Vector as V};

/// Trailing-argument arity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variadic {
    /// Exactly the declared arguments
    None,
    /// The last declared argument may be omitted
    Optional,
    /// The last declared argument may repeat any number of times (at least once)
    Unbounded,
}

/// Which production rule builds the arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// One walked sub-expression per declared argument type
    Positional,
    /// `label_join(v, dst, separator, src...)`
    LabelJoin,
    /// `label_replace(v, dst, replacement, src, regex)`
    LabelReplace,
    /// `sort_by_label(v, label...)`
    SortByLabel,
    /// `double_exponential_smoothing(m, smoothing_factor, trend_factor)`
    Smoothing,
    /// `info(v [, data_label_selector])`
    Info,
}

/// A PromQL function signature
#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: &'static str,
    /// Declared argument types
    pub arg_types: &'static [ValueType],
    /// Trailing-argument arity
    pub variadic: Variadic,
    /// Return type
    pub return_type: ValueType,
    /// Only generated when experimental functions are enabled
    pub experimental: bool,
    /// Argument production rule
    pub shape: ArgShape,
}

impl Function {
    const fn new(name: &'static str, arg_types: &'static [ValueType], return_type: ValueType) -> Self {
        Self {
            name,
            arg_types,
            variadic: Variadic::None,
            return_type,
            experimental: false,
            shape: ArgShape::Positional,
        }
    }

    const fn variadic(mut self, variadic: Variadic) -> Self {
        self.variadic = variadic;
        self
    }

    const fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    const fn shape(mut self, shape: ArgShape) -> Self {
        self.shape = shape;
        self
    }

    /// Expected type of the argument at `index`, following the variadic tail
    pub fn arg_type(&self, index: usize) -> Option<ValueType> {
        match self.arg_types.get(index) {
            Some(vt) => Some(*vt),
            None if self.variadic == Variadic::Unbounded => self.arg_types.last().copied(),
            None => None,
        }
    }

    /// Smallest accepted argument count
    pub fn min_args(&self) -> usize {
        match self.variadic {
            Variadic::Optional => self.arg_types.len().saturating_sub(1),
            Variadic::None | Variadic::Unbounded => self.arg_types.len(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// All known functions, sorted by name
pub static FUNCTIONS: &[Function] = &[
    Function::new("abs", &[V], V),
    Function::new("absent", &[V], V),
    Function::new("absent_over_time", &[M], V),
    Function::new("acos", &[V], V),
    Function::new("acosh", &[V], V),
    Function::new("asin", &[V], V),
    Function::new("asinh", &[V], V),
    Function::new("atan", &[V], V),
    Function::new("atanh", &[V], V),
    Function::new("avg_over_time", &[M], V),
    Function::new("ceil", &[V], V),
    Function::new("changes", &[M], V),
    Function::new("clamp", &[V, S, S], V),
    Function::new("clamp_max", &[V, S], V),
    Function::new("clamp_min", &[V, S], V),
    Function::new("cos", &[V], V),
    Function::new("cosh", &[V], V),
    Function::new("count_over_time", &[M], V),
    Function::new("day_of_month", &[V], V).variadic(Variadic::Optional),
    Function::new("day_of_week", &[V], V).variadic(Variadic::Optional),
    Function::new("day_of_year", &[V], V).variadic(Variadic::Optional),
    Function::new("days_in_month", &[V], V).variadic(Variadic::Optional),
    Function::new("deg", &[V], V),
    Function::new("delta", &[M], V),
    Function::new("deriv", &[M], V),
    Function::new("double_exponential_smoothing", &[M, S, S], V)
        .experimental()
        .shape(ArgShape::Smoothing),
    Function::new("exp", &[V], V),
    Function::new("floor", &[V], V),
    Function::new("histogram_avg", &[V], V),
    Function::new("histogram_count", &[V], V),
    Function::new("histogram_fraction", &[S, S, V], V),
    Function::new("histogram_quantile", &[S, V], V),
    Function::new("histogram_stddev", &[V], V),
    Function::new("histogram_stdvar", &[V], V),
    Function::new("histogram_sum", &[V], V),
    Function::new("hour", &[V], V).variadic(Variadic::Optional),
    Function::new("idelta", &[M], V),
    Function::new("increase", &[M], V),
    Function::new("info", &[V, V], V)
        .variadic(Variadic::Optional)
        .experimental()
        .shape(ArgShape::Info),
    Function::new("irate", &[M], V),
    Function::new("label_join", &[V, Str, Str, Str], V)
        .variadic(Variadic::Unbounded)
        .shape(ArgShape::LabelJoin),
    Function::new("label_replace", &[V, Str, Str, Str, Str], V).shape(ArgShape::LabelReplace),
    Function::new("last_over_time", &[M], V),
    Function::new("ln", &[V], V),
    Function::new("log10", &[V], V),
    Function::new("log2", &[V], V),
    Function::new("mad_over_time", &[M], V).experimental(),
    Function::new("max_over_time", &[M], V),
    Function::new("min_over_time", &[M], V),
    Function::new("minute", &[V], V).variadic(Variadic::Optional),
    Function::new("month", &[V], V).variadic(Variadic::Optional),
    Function::new("pi", &[], S),
    Function::new("predict_linear", &[M, S], V),
    Function::new("present_over_time", &[M], V),
    Function::new("quantile_over_time", &[S, M], V),
    Function::new("rad", &[V], V),
    Function::new("rate", &[M], V),
    Function::new("resets", &[M], V),
    Function::new("round", &[V, S], V).variadic(Variadic::Optional),
    Function::new("scalar", &[V], S),
    Function::new("sgn", &[V], V),
    Function::new("sin", &[V], V),
    Function::new("sinh", &[V], V),
    Function::new("sort", &[V], V),
    Function::new("sort_by_label", &[V, Str], V)
        .variadic(Variadic::Unbounded)
        .experimental()
        .shape(ArgShape::SortByLabel),
    Function::new("sort_by_label_desc", &[V, Str], V)
        .variadic(Variadic::Unbounded)
        .experimental()
        .shape(ArgShape::SortByLabel),
    Function::new("sort_desc", &[V], V),
    Function::new("sqrt", &[V], V),
    Function::new("stddev_over_time", &[M], V),
    Function::new("stdvar_over_time", &[M], V),
    Function::new("sum_over_time", &[M], V),
    Function::new("tan", &[V], V),
    Function::new("tanh", &[V], V),
    Function::new("time", &[], S),
    Function::new("timestamp", &[V], V),
    Function::new("vector", &[S], V),
    Function::new("year", &[V], V).variadic(Variadic::Optional),
];

/// Look up a function by name
pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS
        .binary_search_by(|f| f.name.cmp(name))
        .ok()
        .map(|idx| &FUNCTIONS[idx])
}

/// Functions enabled by default
pub fn stable_functions() -> impl Iterator<Item = &'static Function> {
    FUNCTIONS.iter().filter(|f| !f.experimental)
}

/// Functions gated behind the experimental flag
pub fn experimental_functions() -> impl Iterator<Item = &'static Function> {
    FUNCTIONS.iter().filter(|f| f.experimental)
}
