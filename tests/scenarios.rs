//! End-to-end generation scenarios
//!
//! Small catalogs with fixed options where the expected output shape is
//! fully determined.

use promql_smith::query::{BinaryExpr, BinaryOp, Cardinality, Expr, ExprType, VectorMatching, VectorSelector};
use promql_smith::smith::{output_series, resolve_vector_matching, MatchingStyle};
use promql_smith::{LabelSet, Matcher, Options, PromQLSmith, SeriesCatalog, ValueType};
use rand::rngs::StdRng;
use rand::SeedableRng;

// =============================================================================
// Helpers
// =============================================================================

fn two_series() -> Vec<LabelSet> {
    vec![
        LabelSet::from_pairs([("__name__", "m"), ("a", "1")]),
        LabelSet::from_pairs([("__name__", "m"), ("a", "2")]),
    ]
}

fn method_code_catalog() -> Vec<LabelSet> {
    let errors = "method_code:http_errors:rate5m";
    let requests = "method:http_requests:rate5m";
    let mut series: Vec<LabelSet> = [("get", "500"), ("get", "404"), ("put", "501"), ("post", "500"), ("post", "404")]
        .into_iter()
        .map(|(method, code)| LabelSet::from_pairs([("__name__", errors), ("method", method), ("code", code)]))
        .collect();
    series.extend(
        ["get", "del", "post"]
            .into_iter()
            .map(|method| LabelSet::from_pairs([("__name__", requests), ("method", method)])),
    );
    series
}

fn selector(name: &str) -> Expr {
    Expr::VectorSelector(VectorSelector {
        matchers: vec![Matcher::equal("__name__", name)],
        offset: None,
        at: None,
    })
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_depth_one_yields_leaves() {
    let options = Options::default().with_max_depth(1);
    let mut smith = PromQLSmith::new(StdRng::seed_from_u64(1), two_series(), options).unwrap();

    for _ in 0..200 {
        let vector = smith.walk(&[ValueType::Vector]).unwrap();
        let Expr::VectorSelector(vs) = &vector else {
            panic!("expected a vector selector, got {}", vector);
        };
        assert!(vs.matchers.iter().any(|m| m.name() == "__name__" && m.value() == "m"));

        let scalar = smith.walk(&[ValueType::Scalar]).unwrap();
        assert!(matches!(scalar, Expr::NumberLiteral(_)), "got {}", scalar);
    }
}

#[test]
fn test_empty_intersection_yields_none() {
    let options = Options::default().with_enabled_exprs(vec![ExprType::NumberLiteral]);
    let mut smith = PromQLSmith::new(StdRng::seed_from_u64(2), two_series(), options).unwrap();

    assert!(smith.walk(&[ValueType::Vector]).is_none());
    assert!(smith.walk(&[ValueType::Matrix]).is_none());
    assert!(matches!(smith.walk(&[ValueType::Scalar]), Some(Expr::NumberLiteral(_))));
}

#[test]
fn test_many_to_one_resolution() {
    let catalog = SeriesCatalog::new(method_code_catalog());
    let lhs = selector("method_code:http_errors:rate5m");
    let rhs = selector("method:http_requests:rate5m");

    let left = output_series(&lhs, &catalog).unwrap();
    let right = output_series(&rhs, &catalog).unwrap();
    assert_eq!(left.len(), 5);
    assert_eq!(right.len(), 3);

    let matching = resolve_vector_matching(BinaryOp::Add, &left, &right, MatchingStyle::On).unwrap();
    assert_eq!(
        matching,
        VectorMatching {
            card: Cardinality::ManyToOne,
            on: true,
            matching_labels: vec!["method".to_string()],
            include: vec![],
        }
    );

    let expr = Expr::Binary(BinaryExpr {
        op: BinaryOp::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        return_bool: false,
        matching,
    });
    assert_eq!(
        expr.to_string(),
        "method_code:http_errors:rate5m + on (method) group_left () method:http_requests:rate5m"
    );
}

#[test]
fn test_generated_matching_is_consistent() {
    let options = Options::default()
        .with_enable_vector_matching(true)
        .with_enabled_exprs(vec![ExprType::BinaryExpr, ExprType::VectorSelector])
        .with_enabled_binops(vec![BinaryOp::Add, BinaryOp::Mul, BinaryOp::And])
        .with_max_depth(2);
    let mut smith = PromQLSmith::new(StdRng::seed_from_u64(3), method_code_catalog(), options).unwrap();

    let mut explicit = 0;
    for _ in 0..500 {
        let Some(expr) = smith.walk(&[ValueType::Vector]) else {
            continue;
        };
        if let Expr::Binary(bin) = expr.unparen() {
            let m = &bin.matching;
            if bin.op == BinaryOp::And {
                assert_eq!(m.card, Cardinality::ManyToMany);
            }
            if m.on {
                assert!(m.include.iter().all(|l| !m.matching_labels.contains(l)));
            }
            if m.is_explicit() {
                explicit += 1;
            }
        }
    }
    assert!(explicit > 0);
}

#[test]
fn test_same_seed_same_output() {
    let options = Options::default()
        .with_enable_offset(true)
        .with_enable_at_modifier(true)
        .with_at_modifier_max_timestamp(1_700_000_000_000)
        .with_enable_vector_matching(true);

    let render = |seed: u64| -> Vec<String> {
        let mut smith = PromQLSmith::new(StdRng::seed_from_u64(seed), method_code_catalog(), options.clone()).unwrap();
        (0..50)
            .map(|_| smith.walk_instant_query().map(|e| e.to_string()).unwrap_or_default())
            .collect()
    };

    assert_eq!(render(9), render(9));
    assert_ne!(render(9), render(10));
}

#[test]
fn test_catalog_from_json() {
    let json = r#"[
        {"__name__": "up", "job": "node", "instance": "a:9100"},
        {"__name__": "up", "job": "node", "instance": "b:9100"},
        {}
    ]"#;
    let catalog = SeriesCatalog::from_json_str(json).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.label_names(), ["__name__", "instance", "job"]);
}
