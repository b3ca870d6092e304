//! Core data types shared by the generator and the expression tree
//!
//! # Key Types
//!
//! - **`LabelSet`**: the identity of one time series, sorted by label name
//! - **`Matcher`**: a label matcher (`=`, `!=`, `=~`, `!~`) as used in selectors
//! - **`ValueType`**: the four PromQL value types
//!
//! # Example
//!
//! ```rust
//! use promql_smith::types::{LabelSet, Matcher, MatchOp};
//!
//! let series = LabelSet::from_pairs([("__name__", "http_requests_total"), ("job", "api")]);
//! assert_eq!(series.get("job"), Some("api"));
//!
//! let matcher = Matcher::new(MatchOp::Regex, "job", "a.*").unwrap();
//! assert!(series.matches(&[matcher]));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Reserved label carrying the metric name
pub const METRIC_NAME: &str = "__name__";

// ============================================================================
// Labels
// ============================================================================

/// A single label pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value, never empty
    pub value: String,
}

/// The label set identifying one time series
///
/// Labels are kept sorted by name with unique names. Empty values are
/// dropped on construction since an empty value means the label is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    /// Create an empty label set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a label set from name/value pairs
    ///
    /// A name given twice keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from(map)
    }

    /// Value of a label, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.labels[idx].value.as_str())
    }

    /// Label with the given name, if present
    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.labels[idx])
    }

    /// Iterate labels in name order
    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    /// Iterate label names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the set has no labels
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keep only the listed labels (the `by` projection of an aggregation)
    pub fn project(&self, names: &[String]) -> LabelSet {
        LabelSet {
            labels: self
                .labels
                .iter()
                .filter(|l| names.iter().any(|n| *n == l.name))
                .cloned()
                .collect(),
        }
    }

    /// Drop the listed labels and the metric name (the `without` projection)
    pub fn without(&self, names: &[String]) -> LabelSet {
        LabelSet {
            labels: self
                .labels
                .iter()
                .filter(|l| l.name != METRIC_NAME && !names.iter().any(|n| *n == l.name))
                .cloned()
                .collect(),
        }
    }

    /// Check whether every matcher accepts this series
    ///
    /// An absent label is seen by matchers as the empty string.
    pub fn matches(&self, matchers: &[Matcher]) -> bool {
        matchers
            .iter()
            .all(|m| m.matches(self.get(m.name()).unwrap_or("")))
    }
}

impl From<BTreeMap<String, String>> for LabelSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        // BTreeMap iteration is already sorted and unique by name
        Self {
            labels: map
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(name, value)| Label { name, value })
                .collect(),
        }
    }
}

impl From<LabelSet> for BTreeMap<String, String> {
    fn from(set: LabelSet) -> Self {
        set.labels.into_iter().map(|l| (l.name, l.value)).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", label.name, quote(&label.value))?;
        }
        write!(f, "}}")
    }
}

/// Check a label name against `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Render a double-quoted PromQL string literal
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// Matchers
// ============================================================================

/// Label matching operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOp {
    /// `=`
    #[serde(rename = "=")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
    /// `=~`
    #[serde(rename = "=~")]
    Regex,
    /// `!~`
    #[serde(rename = "!~")]
    NotRegex,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
            MatchOp::Regex => "=~",
            MatchOp::NotRegex => "!~",
        };
        write!(f, "{}", s)
    }
}

/// A label matcher
///
/// Regex matchers are compiled once at construction and match the whole
/// value, as PromQL anchors them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MatcherSpec", into = "MatcherSpec")]
pub struct Matcher {
    name: String,
    op: MatchOp,
    value: String,
    regex: Option<Regex>,
}

/// Serialized shape of a matcher: `{ name = "job", op = "=", value = "api" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatcherSpec {
    name: String,
    #[serde(default = "default_match_op")]
    op: MatchOp,
    value: String,
}

fn default_match_op() -> MatchOp {
    MatchOp::Equal
}

impl Matcher {
    /// Create a matcher, compiling the pattern for regex operators
    pub fn new(op: MatchOp, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();

        if !is_valid_label_name(&name) {
            return Err(Error::InvalidMatcher {
                name,
                reason: "label name must match [a-zA-Z_][a-zA-Z0-9_]*".to_string(),
            });
        }

        let regex = match op {
            MatchOp::Regex | MatchOp::NotRegex => {
                let anchored = format!("^(?:{})$", value);
                Some(Regex::new(&anchored).map_err(|e| Error::InvalidMatcher {
                    name: name.clone(),
                    reason: e.to_string(),
                })?)
            },
            MatchOp::Equal | MatchOp::NotEqual => None,
        };

        Ok(Self {
            name,
            op,
            value,
            regex,
        })
    }

    /// Equality matcher, infallible for names taken from a validated catalog
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MatchOp::Equal,
            value: value.into(),
            regex: None,
        }
    }

    /// Label name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matching operator
    pub fn op(&self) -> MatchOp {
        self.op
    }

    /// Value or pattern
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Test a label value (absent labels are the empty string)
    pub fn matches(&self, value: &str) -> bool {
        match self.op {
            MatchOp::Equal => self.value == value,
            MatchOp::NotEqual => self.value != value,
            MatchOp::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(value)),
            MatchOp::NotRegex => !self.regex.as_ref().is_some_and(|re| re.is_match(value)),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.op == other.op && self.value == other.value
    }
}

impl Eq for Matcher {}

impl Hash for Matcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.op.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.op, quote(&self.value))
    }
}

impl TryFrom<MatcherSpec> for Matcher {
    type Error = Error;

    fn try_from(spec: MatcherSpec) -> Result<Self> {
        Matcher::new(spec.op, spec.name, spec.value)
    }
}

impl From<Matcher> for MatcherSpec {
    fn from(m: Matcher) -> Self {
        MatcherSpec {
            name: m.name,
            op: m.op,
            value: m.value,
        }
    }
}

// ============================================================================
// Value types
// ============================================================================

/// PromQL value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Instant vector
    Vector,
    /// Scalar
    Scalar,
    /// Range vector
    Matrix,
    /// String
    String,
}

impl ValueType {
    /// All value types, in table order
    pub const ALL: [ValueType; 4] = [
        ValueType::Vector,
        ValueType::Scalar,
        ValueType::Matrix,
        ValueType::String,
    ];
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Vector => "vector",
            ValueType::Scalar => "scalar",
            ValueType::Matrix => "matrix",
            ValueType::String => "string",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_set_sorted_and_unique() {
        let set = LabelSet::from_pairs([("b", "2"), ("a", "1"), ("b", "3")]);
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(set.get("b"), Some("3"));
    }

    #[test]
    fn test_label_set_drops_empty_values() {
        let set = LabelSet::from_pairs([("a", ""), ("b", "x")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a"), None);
    }

    #[test]
    fn test_label_set_projections() {
        let set = LabelSet::from_pairs([(METRIC_NAME, "up"), ("job", "api"), ("instance", "a")]);

        let by = set.project(&["job".to_string(), "missing".to_string()]);
        assert_eq!(by, LabelSet::from_pairs([("job", "api")]));

        let without = set.without(&["instance".to_string()]);
        assert_eq!(without, LabelSet::from_pairs([("job", "api")]));
    }

    #[test]
    fn test_label_set_display() {
        let set = LabelSet::from_pairs([("job", "a\"b"), ("env", "prod")]);
        assert_eq!(set.to_string(), r#"{env="prod", job="a\"b"}"#);
    }

    #[test]
    fn test_label_set_json() {
        let set: LabelSet = serde_json::from_str(r#"{"job": "api", "__name__": "up"}"#).unwrap();
        assert_eq!(set.get(METRIC_NAME), Some("up"));
        let back = serde_json::to_string(&set).unwrap();
        assert_eq!(back, r#"{"__name__":"up","job":"api"}"#);
    }

    #[test]
    fn test_label_name_validation() {
        assert!(is_valid_label_name("job"));
        assert!(is_valid_label_name("__name__"));
        assert!(is_valid_label_name("_a1"));
        assert!(!is_valid_label_name(""));
        assert!(!is_valid_label_name("1abc"));
        assert!(!is_valid_label_name("a-b"));
        assert!(!is_valid_label_name("a:b"));

        assert!(is_valid_metric_name("ns:metric_total"));
        assert!(!is_valid_metric_name("metric.total"));
    }

    #[test]
    fn test_matcher_semantics() {
        let eq = Matcher::equal("job", "api");
        assert!(eq.matches("api"));
        assert!(!eq.matches("web"));

        let ne = Matcher::new(MatchOp::NotEqual, "job", "api").unwrap();
        assert!(ne.matches(""));

        let re = Matcher::new(MatchOp::Regex, "job", "ap.").unwrap();
        assert!(re.matches("api"));
        assert!(!re.matches("xapi"));
        assert!(!re.matches(""));

        let nre = Matcher::new(MatchOp::NotRegex, "job", "ap.").unwrap();
        assert!(!nre.matches("api"));
        assert!(nre.matches(""));
    }

    #[test]
    fn test_invalid_matchers() {
        assert!(Matcher::new(MatchOp::Regex, "job", "(").is_err());
        assert!(Matcher::new(MatchOp::Equal, "bad-name", "x").is_err());
    }

    #[test]
    fn test_matcher_display_and_serde() {
        let m = Matcher::new(MatchOp::NotRegex, "path", "/api/.*").unwrap();
        assert_eq!(m.to_string(), r#"path!~"/api/.*""#);

        let parsed: Matcher =
            serde_json::from_str(r#"{"name": "job", "op": "=~", "value": "a|b"}"#).unwrap();
        assert_eq!(parsed.op(), MatchOp::Regex);
        assert!(parsed.matches("b"));

        let defaulted: Matcher = serde_json::from_str(r#"{"name": "job", "value": "a"}"#).unwrap();
        assert_eq!(defaulted, Matcher::equal("job", "a"));
    }

    #[test]
    fn test_label_set_matches() {
        let set = LabelSet::from_pairs([("job", "api"), ("env", "prod")]);
        assert!(set.matches(&[Matcher::equal("job", "api")]));
        assert!(!set.matches(&[Matcher::equal("job", "api"), Matcher::equal("env", "dev")]));
        assert!(set.matches(&[Matcher::equal("missing", "")]));
    }
}
