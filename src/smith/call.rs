//! Function call handler
//!
//! Most functions take one walked sub-expression per declared argument.
//! Functions with string arguments, or with constraints across arguments,
//! get a dedicated rule selected by [`ArgShape`].

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::{PromQLSmith, DST_LABEL, MAX_LABEL_ARGS, OPTIONAL_ARG_PROBABILITY};
use crate::query::ast::{Call, Expr, VectorSelector};
use crate::query::functions::{ArgShape, Function, Variadic};
use crate::types::{ValueType, METRIC_NAME};

const SEPARATORS: &[&str] = &[",", "-", "_", ":", ""];

impl<R: Rng> PromQLSmith<R> {
    pub(crate) fn walk_call(&mut self, depth: usize, value_types: &[ValueType]) -> Option<Expr> {
        let candidates: Vec<&'static Function> = self
            .config
            .functions
            .iter()
            .copied()
            .filter(|f| value_types.is_empty() || value_types.contains(&f.return_type))
            .collect();

        let Some(&func) = candidates.choose(&mut self.rng) else {
            debug!(?value_types, "no enabled function returns the requested types");
            return None;
        };

        let args = self.walk_function_args(depth, func)?;
        Some(Expr::Call(Call { func, args }))
    }

    pub(crate) fn walk_function_args(
        &mut self,
        depth: usize,
        func: &'static Function,
    ) -> Option<Vec<Expr>> {
        match func.shape {
            ArgShape::Positional => {
                let mut count = func.arg_types.len();
                if func.variadic == Variadic::Optional && self.rng.gen_bool(OPTIONAL_ARG_PROBABILITY) {
                    count -= 1;
                }
                func.arg_types[..count]
                    .iter()
                    .map(|vt| self.walk_at(depth + 1, &[*vt]))
                    .collect()
            },
            ArgShape::LabelJoin => self.walk_label_join(depth),
            ArgShape::LabelReplace => self.walk_label_replace(depth),
            ArgShape::SortByLabel => self.walk_sort_by_label(depth),
            ArgShape::Smoothing => self.walk_smoothing(depth),
            ArgShape::Info => self.walk_info(depth),
        }
    }

    /// `label_join(v, "dst_label", separator, src...)`
    fn walk_label_join(&mut self, depth: usize) -> Option<Vec<Expr>> {
        let vector = self.walk_at(depth + 1, &[ValueType::Vector])?;
        let separator = SEPARATORS[self.rng.gen_range(0..SEPARATORS.len())];
        let mut args = vec![
            vector,
            Expr::StringLiteral(DST_LABEL.to_string()),
            Expr::StringLiteral(separator.to_string()),
        ];
        args.extend(self.walk_label_name_args(MAX_LABEL_ARGS));
        Some(args)
    }

    /// `label_replace(v, "dst_label", "$1", src, "(.*)")`
    fn walk_label_replace(&mut self, depth: usize) -> Option<Vec<Expr>> {
        let vector = self.walk_at(depth + 1, &[ValueType::Vector])?;
        let src = self
            .catalog
            .label_names()
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| METRIC_NAME.to_string());
        Some(vec![
            vector,
            Expr::StringLiteral(DST_LABEL.to_string()),
            Expr::StringLiteral("$1".to_string()),
            Expr::StringLiteral(src),
            Expr::StringLiteral("(.*)".to_string()),
        ])
    }

    /// `sort_by_label(v, label...)`
    fn walk_sort_by_label(&mut self, depth: usize) -> Option<Vec<Expr>> {
        let vector = self.walk_at(depth + 1, &[ValueType::Vector])?;
        let mut args = vec![vector];
        args.extend(self.walk_label_name_args(MAX_LABEL_ARGS));
        Some(args)
    }

    /// `double_exponential_smoothing(m, sf, tf)` with both factors in (0, 1)
    fn walk_smoothing(&mut self, depth: usize) -> Option<Vec<Expr>> {
        let matrix = self.walk_at(depth + 1, &[ValueType::Matrix])?;
        Some(vec![
            matrix,
            Expr::NumberLiteral(self.open_unit_interval()),
            Expr::NumberLiteral(self.open_unit_interval()),
        ])
    }

    /// `info(v [, data_label_selector])`
    fn walk_info(&mut self, depth: usize) -> Option<Vec<Expr>> {
        let vector = self.walk_at(depth + 1, &[ValueType::Vector])?;
        let mut args = vec![vector];
        if self.rng.gen_bool(0.5) {
            // The data label selector takes no modifiers
            let (matchers, _) = self.walk_label_matchers();
            args.push(Expr::VectorSelector(VectorSelector {
                matchers,
                offset: None,
                at: None,
            }));
        }
        Some(args)
    }

    /// Between 1 and `max` distinct catalog label names as string literals
    fn walk_label_name_args(&mut self, max: usize) -> Vec<Expr> {
        let mut names = self.catalog.label_names().to_vec();
        names.shuffle(&mut self.rng);
        let count = self.rng.gen_range(1..=max.min(names.len()).max(1));
        names
            .into_iter()
            .take(count)
            .map(Expr::StringLiteral)
            .collect()
    }
}
