//! Series catalog
//!
//! The known series the generator samples selectors and grouping labels
//! from. Empty label sets are dropped on construction since they cannot
//! yield a selector.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{is_valid_label_name, LabelSet, Matcher};

/// Drop series without labels
pub fn filter_empty_series(series: Vec<LabelSet>) -> Vec<LabelSet> {
    series.into_iter().filter(|s| !s.is_empty()).collect()
}

/// A set of known series, read-only after construction
#[derive(Debug, Clone, Default)]
pub struct SeriesCatalog {
    series: Vec<LabelSet>,
    label_names: Vec<String>,
}

impl SeriesCatalog {
    /// Build a catalog, dropping empty and repeated series
    pub fn new(series: Vec<LabelSet>) -> Self {
        let total = series.len();
        let mut seen = HashSet::new();
        let series: Vec<LabelSet> = filter_empty_series(series)
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();

        let label_names: Vec<String> = series
            .iter()
            .flat_map(|s| s.names())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();

        if series.len() != total {
            debug!(
                kept = series.len(),
                dropped = total - series.len(),
                "filtered empty or repeated series"
            );
        }

        Self {
            series,
            label_names,
        }
    }

    /// Parse a JSON array of label maps
    pub fn from_json_str(json: &str) -> Result<Self> {
        let series: Vec<LabelSet> = serde_json::from_str(json)?;
        Ok(Self::new(series))
    }

    /// Load a JSON array of label maps from a file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), series = catalog.len(), "loaded series catalog");
        Ok(catalog)
    }

    /// Check the catalog can back selector generation
    pub fn validate(&self) -> Result<()> {
        if self.series.is_empty() {
            return Err(Error::Catalog(
                "catalog has no non-empty series; selectors need at least one matcher".to_string(),
            ));
        }
        if let Some(bad) = self.label_names.iter().find(|n| !is_valid_label_name(n)) {
            return Err(Error::Catalog(format!("invalid label name '{}'", bad)));
        }
        Ok(())
    }

    /// All series
    pub fn series(&self) -> &[LabelSet] {
        &self.series
    }

    /// Distinct label names across all series, sorted
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when there are no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Pick one series uniformly
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&LabelSet> {
        self.series.choose(rng)
    }

    /// Series accepted by every matcher, in catalog order
    pub fn matching(&self, matchers: &[Matcher]) -> Vec<LabelSet> {
        self.series
            .iter()
            .filter(|s| s.matches(matchers))
            .cloned()
            .collect()
    }
}

impl From<Vec<LabelSet>> for SeriesCatalog {
    fn from(series: Vec<LabelSet>) -> Self {
        Self::new(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn ls(pairs: &[(&str, &str)]) -> LabelSet {
        LabelSet::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_filter_empty_series() {
        let filtered = filter_empty_series(vec![
            LabelSet::new(),
            ls(&[("foo", "bar")]),
            LabelSet::new(),
        ]);
        assert_eq!(filtered, vec![ls(&[("foo", "bar")])]);
        assert!(filter_empty_series(vec![LabelSet::new()]).is_empty());
    }

    #[test]
    fn test_catalog_construction() {
        let catalog = SeriesCatalog::new(vec![
            ls(&[("__name__", "up"), ("job", "api")]),
            LabelSet::new(),
            ls(&[("__name__", "up"), ("job", "api")]),
            ls(&[("__name__", "up"), ("instance", "a")]),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label_names(), &["__name__", "instance", "job"]);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_catalog_validation() {
        assert!(SeriesCatalog::new(vec![]).validate().is_err());
        assert!(SeriesCatalog::new(vec![LabelSet::new()]).validate().is_err());
        let bad = SeriesCatalog::new(vec![ls(&[("bad-name", "x")])]);
        assert!(matches!(bad.validate(), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_matching() {
        let catalog = SeriesCatalog::new(vec![
            ls(&[("__name__", "m"), ("a", "1")]),
            ls(&[("__name__", "m"), ("a", "2")]),
            ls(&[("__name__", "n"), ("a", "1")]),
        ]);
        let matched = catalog.matching(&[Matcher::equal("a", "1")]);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].get("__name__"), Some("m"));

        let none = catalog.matching(&[Matcher::equal("a", "3")]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty = SeriesCatalog::default();
        assert!(empty.sample(&mut rng).is_none());

        let catalog = SeriesCatalog::new(vec![ls(&[("a", "1")]), ls(&[("a", "2")])]);
        for _ in 0..20 {
            let s = catalog.sample(&mut rng).unwrap();
            assert!(catalog.series().contains(s));
        }
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"__name__": "up", "job": "api"}}, {{}}, {{"__name__": "up", "job": "web"}}]"#
        )
        .unwrap();

        let catalog = SeriesCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label_names(), &["__name__", "job"]);

        assert!(SeriesCatalog::from_json_str("{").is_err());
    }
}
