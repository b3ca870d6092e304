//! Selector, subquery and modifier handlers

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

use super::{
    PromQLSmith, AT_MODIFIER_PROBABILITY, MAX_MATRIX_RANGE_MINUTES, MAX_OFFSET_SECS,
    OFFSET_PROBABILITY, SUBQUERY_RANGE, SUBQUERY_STEP,
};
use crate::query::ast::{AtModifier, Expr, MatrixSelector, Offset, SubqueryExpr, VectorSelector};
use crate::types::{Label, LabelSet, MatchOp, Matcher, METRIC_NAME};

impl<R: Rng> PromQLSmith<R> {
    /// Generate a label matcher list for a series selector
    ///
    /// The list holds between ceil(n/2) and n matchers, n being the number of
    /// distinct label names in the catalog, plus any enforced matchers. The
    /// first matcher is an equality on a label the sampled series carries, so
    /// the list never matches every series.
    pub fn walk_selectors(&mut self) -> Vec<Matcher> {
        let series = self.sample_series();
        let anchor = match series.iter().collect::<Vec<&Label>>().choose(&mut self.rng) {
            Some(label) => (*label).clone(),
            None => return self.with_enforced_matchers(Vec::new()),
        };

        let names = self.catalog.label_names().to_vec();
        let min = (names.len() + 1) / 2;
        let count = self.rng.gen_range(min..=names.len()).max(1);

        let mut others: Vec<String> = names.into_iter().filter(|n| *n != anchor.name).collect();
        others.shuffle(&mut self.rng);

        let mut matchers = Vec::with_capacity(count);
        matchers.push(Matcher::equal(anchor.name, anchor.value));
        for name in others.into_iter().take(count - 1) {
            let value = series.get(&name).unwrap_or("").to_string();
            matchers.push(self.walk_matcher(name, &value));
        }
        self.with_enforced_matchers(matchers)
    }

    /// A matcher of random type derived from one label value
    fn walk_matcher(&mut self, name: String, value: &str) -> Matcher {
        let (op, pattern) = match self.rng.gen_range(0..4) {
            0 => (MatchOp::Equal, value.to_string()),
            1 => (MatchOp::NotEqual, value.to_string()),
            2 => (MatchOp::Regex, format!("{}.*", regex::escape(value))),
            _ => (MatchOp::NotRegex, format!("{}.+", regex::escape(value))),
        };
        Matcher::new(op, name.clone(), pattern).unwrap_or_else(|_| Matcher::equal(name, value))
    }

    /// Vector selector over one sampled series, plus that series
    pub(crate) fn walk_vector_selector(&mut self) -> (VectorSelector, LabelSet) {
        let (matchers, series) = self.walk_label_matchers();
        let offset = self.walk_offset();
        let at = self.walk_at_modifier();
        (
            VectorSelector {
                matchers,
                offset,
                at,
            },
            series,
        )
    }

    /// Equality matchers on a random subset of one series' labels
    ///
    /// Between 1 and half the label count matchers, always starting with the
    /// metric name when the series has one. Enforced matchers are appended.
    pub(crate) fn walk_label_matchers(&mut self) -> (Vec<Matcher>, LabelSet) {
        let series = self.sample_series();
        let max_items = (series.len() / 2).max(1);
        let items = self.rng.gen_range(1..=max_items);

        let mut others: Vec<&Label> = series.iter().filter(|l| l.name != METRIC_NAME).collect();
        others.shuffle(&mut self.rng);

        let matchers: Vec<Matcher> = series
            .label(METRIC_NAME)
            .into_iter()
            .chain(others)
            .take(items)
            .map(|l| Matcher::equal(l.name.clone(), l.value.clone()))
            .collect();

        (self.with_enforced_matchers(matchers), series)
    }

    pub(crate) fn walk_matrix_selector(&mut self) -> Expr {
        let (selector, _) = self.walk_vector_selector();
        let minutes = self.rng.gen_range(1..=MAX_MATRIX_RANGE_MINUTES);
        Expr::MatrixSelector(MatrixSelector {
            selector,
            range: Duration::from_secs(minutes * 60),
        })
    }

    pub(crate) fn walk_subquery_expr(&mut self) -> Expr {
        let (selector, _) = self.walk_vector_selector();
        let offset = self.walk_offset();
        let at = self.walk_at_modifier();
        Expr::Subquery(SubqueryExpr {
            expr: Box::new(Expr::VectorSelector(selector)),
            range: SUBQUERY_RANGE,
            step: SUBQUERY_STEP,
            offset,
            at,
        })
    }

    pub(crate) fn walk_offset(&mut self) -> Option<Offset> {
        if !self.config.enable_offset || !self.rng.gen_bool(OFFSET_PROBABILITY) {
            return None;
        }
        let offset = Duration::from_secs(self.rng.gen_range(1..=MAX_OFFSET_SECS));
        if self.rng.gen_bool(0.5) {
            Some(Offset::Neg(offset))
        } else {
            Some(Offset::Pos(offset))
        }
    }

    pub(crate) fn walk_at_modifier(&mut self) -> Option<AtModifier> {
        if !self.config.enable_at_modifier || !self.rng.gen_bool(AT_MODIFIER_PROBABILITY) {
            return None;
        }
        let at = match self.rng.gen_range(0..3) {
            0 => AtModifier::Start,
            1 => AtModifier::End,
            _ => AtModifier::At(self.rng.gen_range(0..self.config.at_modifier_max_timestamp.max(1))),
        };
        Some(at)
    }

    /// Append the enforced matchers; generated matchers are kept as they are
    fn with_enforced_matchers(&self, mut matchers: Vec<Matcher>) -> Vec<Matcher> {
        matchers.extend(self.config.enforced_matchers.iter().cloned());
        matchers
    }

    fn sample_series(&mut self) -> LabelSet {
        self.catalog
            .sample(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }
}
